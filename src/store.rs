//! Parameter store: a fixed-capacity, typed registry of PIDs with backing
//! storage (static, dynamic, or non-volatile), a queue of pending change
//! notifications, and per-PID definition metadata.
//!
//! A fixed `[Option<_>; N]` table walked with `iter().filter_map`, one entry
//! per `(sub_device, pid)`.

use crate::hal::{Nvs, NvsKey};
use crate::rdm::header::RDM_MAX_PDL;
use crate::rdm::pid::{AllowedCommandClass, CommandClass};

/// Pre-reserved parameter table capacity. Chosen generously above the
/// mandatory built-in PID count plus headroom for a handful of
/// device-specific PIDs; all storage is allocated at compile time — no
/// dynamic allocation after driver installation.
pub const MAX_PARAMETERS: usize = 40;

/// Pre-reserved change-notification queue depth.
pub const MAX_QUEUE: usize = 32;

/// Largest value a single parameter entry can hold (the maximum RDM PDL).
pub const MAX_PARAMETER_VALUE: usize = RDM_MAX_PDL;

/// Backing storage class for a parameter entry.
///
/// `Static` carries the caller's `'static` buffer directly rather than a raw
/// pointer: the caller's buffer must outlive the driver, which Rust's
/// `'static` bound enforces at compile time instead of at a runtime
/// lifetime contract.
#[derive(Clone, Copy)]
pub enum StorageClass {
    Static(&'static [u8]),
    Dynamic,
    NonVolatile,
}

impl StorageClass {
    const fn tag(&self) -> StorageTag {
        match self {
            StorageClass::Static(_) => StorageTag::Static,
            StorageClass::Dynamic => StorageTag::Dynamic,
            StorageClass::NonVolatile => StorageTag::NonVolatile,
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum StorageTag {
    Static,
    Dynamic,
    NonVolatile,
}

enum Storage {
    Static(&'static [u8]),
    Owned([u8; MAX_PARAMETER_VALUE], usize),
}

/// Callback fired after every successful GET/SET against a parameter,
/// carrying its own opaque context via closure capture.
pub type ParamCallback = &'static (dyn Fn(u16, u16) + Sync);

/// A GET/SET handler's outcome for one request, consumed by the responder
/// runtime to compose the wire response.
#[derive(Debug, Clone, Copy)]
pub enum HandlerOutcome {
    /// Request succeeded; the PDL response already written into
    /// `HandlerCtx::response_pdl` is `len` bytes long.
    Ack(usize),
    /// Request failed; respond with `NACK` carrying this reason.
    Nack(crate::error::NackReason),
    /// Request accepted but the real answer needs more time than the
    /// immediate response window allows.
    AckTimer(u16),
    /// `len` raw bytes already written into `response_pdl` are the complete
    /// wire response (the non-standard `DISC_UNIQUE_BRANCH` reply has no
    /// header or the usual checksum, see `rdm::disc`) — the responder copies
    /// them out verbatim instead of wrapping them with `rdm::header::format`.
    DiscResponse(usize),
    /// No response should be sent at all (muted or out-of-range discovery
    /// probe, or the queue being empty when draining it).
    Silent,
    /// Like `Ack`, but the response header's PID must be `pid` rather than
    /// the request's own PID — used by `QUEUED_MESSAGE` to answer as if the
    /// popped parameter had been GET'd directly.
    AckSubstitutePid(usize, u16),
}

/// Everything a [`ParamHandler`] needs to answer one request: the addressed
/// PID/sub-device/command class, the request's PDL bytes, a scratch buffer
/// to write the response PDL into, and mutable access to device-wide state,
/// the parameter store, and (for `NonVolatile` writes) persistent storage.
pub struct HandlerCtx<'a> {
    pub sub_device: u16,
    pub pid: u16,
    pub command_class: CommandClass,
    pub request_pdl: &'a [u8],
    pub response_pdl: &'a mut [u8; MAX_PARAMETER_VALUE],
    pub device: &'a mut crate::responder::DeviceState,
    pub store: &'a mut ParameterStore,
    pub nvs: Option<&'a mut dyn crate::hal::Nvs>,
}

/// Behavior bridged to a PID, as a single trait object rather than a
/// function-pointer-plus-context pair.
pub trait ParamHandler: Sync {
    fn get(&self, ctx: &mut HandlerCtx) -> HandlerOutcome {
        let _ = ctx;
        HandlerOutcome::Nack(crate::error::NackReason::UnsupportedCommandClass)
    }

    fn set(&self, ctx: &mut HandlerCtx) -> HandlerOutcome {
        let _ = ctx;
        HandlerOutcome::Nack(crate::error::NackReason::UnsupportedCommandClass)
    }
}

/// RDM `DATA_TYPE` tag, used by `PARAMETER_DESCRIPTION` responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum DataType {
    NotDefined = 0x00,
    Bool = 0x01,
    U8 = 0x02,
    U16 = 0x03,
    U32 = 0x08,
    Ascii = 0x09,
}

/// Declares everything the codec/responder need to serve a PID without
/// hand-written marshalling for that PID: allowed command classes, the
/// handler, request/response format strings, and bounds/metadata used by
/// `PARAMETER_DESCRIPTION`.
pub struct ParameterDefinition {
    pub pid_cc: AllowedCommandClass,
    pub handler: &'static dyn ParamHandler,
    pub request_format: &'static str,
    pub response_format: &'static str,
    pub data_type: DataType,
    pub units: u8,
    pub prefix: u8,
    pub min: u32,
    pub max: u32,
    pub description: Option<&'static str>,
}

/// A registered `(sub_device, pid)` entry: storage, definition, and callback.
pub struct ParameterEntry {
    pub sub_device: u16,
    pub pid: u16,
    class: StorageTag,
    storage: Storage,
    capacity: usize,
    pub definition: Option<&'static ParameterDefinition>,
    pub callback: Option<ParamCallback>,
}

impl ParameterEntry {
    /// Current value bytes.
    pub fn value(&self) -> &[u8] {
        match &self.storage {
            Storage::Static(bytes) => bytes,
            Storage::Owned(buf, len) => &buf[..*len],
        }
    }

    pub const fn storage_class(&self) -> StorageTagPublic {
        match self.class {
            StorageTag::Static => StorageTagPublic::Static,
            StorageTag::Dynamic => StorageTagPublic::Dynamic,
            StorageTag::NonVolatile => StorageTagPublic::NonVolatile,
        }
    }

    fn write(&mut self, bytes: &[u8]) -> bool {
        if self.class == StorageTag::Static {
            return false;
        }
        let Storage::Owned(buf, len) = &mut self.storage else {
            return false;
        };
        let n = bytes.len().min(self.capacity);
        buf[..n].copy_from_slice(&bytes[..n]);
        *len = n;
        true
    }
}

/// Public mirror of the internal storage tag, returned from
/// [`ParameterEntry::storage_class`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageTagPublic {
    Static,
    Dynamic,
    NonVolatile,
}

/// Fixed-capacity, oldest-drop ring buffer backing `QUEUED_MESSAGE`.
struct Queue {
    buf: [u16; MAX_QUEUE],
    head: usize,
    len: usize,
}

impl Queue {
    const fn new() -> Self {
        Self {
            buf: [0; MAX_QUEUE],
            head: 0,
            len: 0,
        }
    }

    fn push(&mut self, pid: u16) {
        if self.len == MAX_QUEUE {
            // Drop the oldest entry to make room.
            self.head = (self.head + 1) % MAX_QUEUE;
            self.len -= 1;
        }
        let tail = (self.head + self.len) % MAX_QUEUE;
        self.buf[tail] = pid;
        self.len += 1;
    }

    fn pop(&mut self) -> Option<u16> {
        if self.len == 0 {
            return None;
        }
        let pid = self.buf[self.head];
        self.head = (self.head + 1) % MAX_QUEUE;
        self.len -= 1;
        Some(pid)
    }

    const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// The parameter store itself: a fixed `[Option<ParameterEntry>; MAX_PARAMETERS]`
/// table plus the change-notification queue.
pub struct ParameterStore {
    entries: [Option<ParameterEntry>; MAX_PARAMETERS],
    queue: Queue,
}

impl ParameterStore {
    pub const fn new() -> Self {
        const NONE: Option<ParameterEntry> = None;
        Self {
            entries: [NONE; MAX_PARAMETERS],
            queue: Queue::new(),
        }
    }

    fn find_index(&self, sub_device: u16, pid: u16) -> Option<usize> {
        self.entries.iter().position(|e| {
            e.as_ref()
                .is_some_and(|e| e.sub_device == sub_device && e.pid == pid)
        })
    }

    pub fn parameter_exists(&self, sub_device: u16, pid: u16) -> bool {
        self.find_index(sub_device, pid).is_some()
    }

    pub fn get_entry(&self, sub_device: u16, pid: u16) -> Option<&ParameterEntry> {
        self.find_index(sub_device, pid)
            .and_then(|i| self.entries[i].as_ref())
    }

    fn get_entry_mut(&mut self, sub_device: u16, pid: u16) -> Option<&mut ParameterEntry> {
        let idx = self.find_index(sub_device, pid)?;
        self.entries[idx].as_mut()
    }

    /// Registers a new parameter. Fails on a duplicate key or if the table
    /// is full. For `NonVolatile`, attempts to load the persisted value
    /// first and falls back to `init_value` if absent. For `Static`,
    /// `init_value`/`capacity`/`nvs` are ignored; the definition's own
    /// `'static` slice is both the value and the capacity.
    pub fn add_parameter(
        &mut self,
        sub_device: u16,
        pid: u16,
        class: StorageClass,
        init_value: &[u8],
        capacity: usize,
        nvs: Option<&mut dyn Nvs>,
    ) -> bool {
        if self.parameter_exists(sub_device, pid) {
            return false;
        }
        let Some(slot) = self.entries.iter_mut().find(|e| e.is_none()) else {
            return false;
        };

        let entry = match class {
            StorageClass::Static(bytes) => ParameterEntry {
                sub_device,
                pid,
                class: StorageTag::Static,
                storage: Storage::Static(bytes),
                capacity: bytes.len(),
                definition: None,
                callback: None,
            },
            StorageClass::Dynamic => {
                let capacity = capacity.min(MAX_PARAMETER_VALUE);
                let mut buf = [0u8; MAX_PARAMETER_VALUE];
                let n = init_value.len().min(capacity);
                buf[..n].copy_from_slice(&init_value[..n]);
                ParameterEntry {
                    sub_device,
                    pid,
                    class: StorageTag::Dynamic,
                    storage: Storage::Owned(buf, n),
                    capacity,
                    definition: None,
                    callback: None,
                }
            }
            StorageClass::NonVolatile => {
                let capacity = capacity.min(MAX_PARAMETER_VALUE);
                let mut buf = [0u8; MAX_PARAMETER_VALUE];
                let loaded_len = nvs.and_then(|nvs| {
                    nvs.load(NvsKey { sub_device, pid }, &mut buf[..capacity])
                });
                let n = match loaded_len {
                    Some(n) => n,
                    None => {
                        let n = init_value.len().min(capacity);
                        buf[..n].copy_from_slice(&init_value[..n]);
                        n
                    }
                };
                ParameterEntry {
                    sub_device,
                    pid,
                    class: StorageTag::NonVolatile,
                    storage: Storage::Owned(buf, n),
                    capacity,
                    definition: None,
                    callback: None,
                }
            }
        };

        *slot = Some(entry);
        true
    }

    /// Reads the current value. Valid until the next write to this entry.
    pub fn parameter_get(&self, sub_device: u16, pid: u16) -> Option<&[u8]> {
        self.get_entry(sub_device, pid).map(|e| e.value())
    }

    /// Copies the current value into `out`, returning the number of bytes
    /// copied (clamped to `out.len()`).
    pub fn parameter_copy(&self, sub_device: u16, pid: u16, out: &mut [u8]) -> usize {
        match self.parameter_get(sub_device, pid) {
            Some(value) => {
                let n = value.len().min(out.len());
                out[..n].copy_from_slice(&value[..n]);
                n
            }
            None => 0,
        }
    }

    /// Writes a new value. Rejects `Static` entries, clamps `bytes` to the
    /// entry's registered capacity, write-through persists `NonVolatile`
    /// entries, and pushes a change notification.
    pub fn parameter_set(
        &mut self,
        sub_device: u16,
        pid: u16,
        bytes: &[u8],
        nvs: Option<&mut dyn Nvs>,
    ) -> bool {
        let non_volatile_capacity = self.get_entry(sub_device, pid).and_then(|e| {
            matches!(e.class, StorageTag::NonVolatile).then_some(e.capacity)
        });
        if let Some(capacity) = non_volatile_capacity {
            if let Some(nvs) = nvs {
                let n = bytes.len().min(capacity);
                if !nvs.store(NvsKey { sub_device, pid }, &bytes[..n]) {
                    return false;
                }
            }
        }

        let Some(entry) = self.get_entry_mut(sub_device, pid) else {
            return false;
        };
        if !entry.write(bytes) {
            return false;
        }

        self.queue.push(pid);
        true
    }

    /// Associates metadata with an entry. The definition is borrowed for the
    /// driver's lifetime; the entry's stored value is untouched.
    pub fn definition_set(&mut self, sub_device: u16, pid: u16, def: &'static ParameterDefinition) -> bool {
        match self.get_entry_mut(sub_device, pid) {
            Some(entry) => {
                entry.definition = Some(def);
                true
            }
            None => false,
        }
    }

    /// Installs a user callback invoked after every successful GET/SET.
    pub fn callback_set(&mut self, sub_device: u16, pid: u16, cb: ParamCallback) -> bool {
        match self.get_entry_mut(sub_device, pid) {
            Some(entry) => {
                entry.callback = Some(cb);
                true
            }
            None => false,
        }
    }

    pub fn queue_push(&mut self, pid: u16) {
        self.queue.push(pid);
    }

    pub fn queue_pop(&mut self) -> Option<u16> {
        self.queue.pop()
    }

    pub fn queue_is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Iterates over every registered `(sub_device, pid)` pair, used by
    /// `SUPPORTED_PARAMETERS`.
    pub fn iter(&self) -> impl Iterator<Item = &ParameterEntry> {
        self.entries.iter().filter_map(|e| e.as_ref())
    }
}

impl Default for ParameterStore {
    fn default() -> Self {
        Self::new()
    }
}
