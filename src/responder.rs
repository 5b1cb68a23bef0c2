//! Responder runtime: dispatches a parsed RDM request against the parameter
//! store and composes the wire response.
//!
//! Everything here runs in task context, never from
//! `Framer::on_uart_interrupt`.

use bitflags::bitflags;

use crate::error::NackReason;
use crate::rdm::disc;
use crate::rdm::header::{self, RdmHeader};
use crate::rdm::pdl::{self, Value};
use crate::rdm::pid::{self, pids, AllowedCommandClass, CommandClass, ResponseType};
use crate::store::{
    DataType, HandlerCtx, HandlerOutcome, ParamHandler, ParameterDefinition, ParameterStore,
    StorageClass, MAX_PARAMETER_VALUE,
};
use crate::uid::Uid;

/// Device-wide fields the built-in PID handlers read and write, grouped on
/// one struct rather than scattered as free globals.
pub struct DeviceState {
    pub uid: Uid,
    pub muted: bool,
    pub model_id: u16,
    pub product_category: u16,
    pub software_version_id: u32,
    pub dmx_footprint: u16,
    pub personality_current: u8,
    pub personality_count: u8,
    pub sub_device_count: u16,
    pub sensor_count: u8,
}

impl DeviceState {
    pub const fn new(uid: Uid) -> Self {
        Self {
            uid,
            muted: false,
            model_id: 0,
            product_category: 0,
            software_version_id: 0,
            dmx_footprint: 0,
            personality_current: 1,
            personality_count: 1,
            sub_device_count: 0,
            sensor_count: 0,
        }
    }
}

bitflags! {
    /// RDM `DISC_MUTE`/`DISC_UN_MUTE` control field. Only the bits this
    /// crate's Non-goals leave in scope are populated; the rest of the real
    /// 16-bit field stays reserved-zero.
    pub struct MuteControlFlags: u16 {
        const MANAGED_PROXY  = 0x0001;
        const SUB_DEVICE     = 0x0002;
        const BOOT_SOFTWARE  = 0x0004;
        const PROXIED_DEVICE = 0x0008;
    }
}

const PARAMETER_DESCRIPTION_FORMAT: &str = "wbbbbbbdddda";
const DEVICE_INFO_FORMAT: &str = "wwwdwbbwwb";

/// Top-level entry point: dispatch one parsed RDM request. Returns the
/// number of bytes written into `out`, or `None` if nothing should be
/// transmitted (not addressed to us, a broadcast GET/SET, a silent
/// discovery miss, ...).
pub fn dispatch(
    device: &mut DeviceState,
    store: &mut ParameterStore,
    nvs: Option<&mut dyn crate::hal::Nvs>,
    header: &RdmHeader,
    pdl_bytes: &[u8],
    out: &mut [u8],
) -> Option<usize> {
    let cc = CommandClass::try_from(header.command_class).ok()?;
    let broadcast_dest = header.destination.is_broadcast();
    if header.destination != device.uid && !broadcast_dest {
        return None;
    }

    if header.sub_device == pid::ALL_SUB_DEVICES {
        if cc.is_get() {
            return None;
        }
        let mut scratch = [0u8; 64];
        dispatch_one(device, store, nvs, pid::ROOT_SUB_DEVICE, cc, header, pdl_bytes, &mut scratch);
        return None;
    }

    let response_len = dispatch_one(device, store, nvs, header.sub_device, cc, header, pdl_bytes, out)?;

    if broadcast_dest && !cc.is_discovery() {
        return None;
    }
    Some(response_len)
}

fn dispatch_one(
    device: &mut DeviceState,
    store: &mut ParameterStore,
    nvs: Option<&mut dyn crate::hal::Nvs>,
    sub_device: u16,
    cc: CommandClass,
    header: &RdmHeader,
    request_pdl: &[u8],
    out: &mut [u8],
) -> Option<usize> {
    if sub_device != pid::ROOT_SUB_DEVICE {
        return silent_or_nack(cc, header, device.uid, NackReason::SubDeviceOutOfRange, out);
    }

    let Some(def) = store.get_entry(sub_device, header.pid).and_then(|e| e.definition) else {
        return silent_or_nack(cc, header, device.uid, NackReason::UnknownPid, out);
    };
    if !def.pid_cc.accepts(cc) {
        return silent_or_nack(cc, header, device.uid, NackReason::UnsupportedCommandClass, out);
    }

    let mut response_pdl = [0u8; MAX_PARAMETER_VALUE];
    let outcome = {
        let mut ctx = HandlerCtx {
            sub_device,
            pid: header.pid,
            command_class: cc,
            request_pdl,
            response_pdl: &mut response_pdl,
            device,
            store,
            nvs,
        };
        match cc {
            CommandClass::SetCommand => def.handler.set(&mut ctx),
            _ => def.handler.get(&mut ctx),
        }
    };

    let message_pending = !store.queue_is_empty();
    match outcome {
        HandlerOutcome::Ack(len) => {
            let resp = response_header(header, device.uid, ResponseType::Ack.as_u8(), message_pending, None);
            header::format(&resp, &response_pdl[..len], out)
        }
        HandlerOutcome::Nack(reason) => nack_response(header, device.uid, cc, reason, out),
        HandlerOutcome::AckTimer(estimate_ms) => {
            let resp = response_header(header, device.uid, ResponseType::AckTimer.as_u8(), message_pending, None);
            let pdl = estimate_ms.to_be_bytes();
            header::format(&resp, &pdl, out)
        }
        HandlerOutcome::DiscResponse(len) => {
            out.get_mut(..len)?.copy_from_slice(&response_pdl[..len]);
            Some(len)
        }
        HandlerOutcome::Silent => None,
        HandlerOutcome::AckSubstitutePid(len, substituted_pid) => {
            let resp = response_header(header, device.uid, ResponseType::Ack.as_u8(), message_pending, Some(substituted_pid));
            header::format(&resp, &response_pdl[..len], out)
        }
    }
}

fn silent_or_nack(
    cc: CommandClass,
    header: &RdmHeader,
    source: Uid,
    reason: NackReason,
    out: &mut [u8],
) -> Option<usize> {
    if cc.is_discovery() {
        return None;
    }
    nack_response(header, source, cc, reason, out)
}

fn nack_response(
    header: &RdmHeader,
    source: Uid,
    cc: CommandClass,
    reason: NackReason,
    out: &mut [u8],
) -> Option<usize> {
    let _ = cc;
    let resp = response_header(header, source, ResponseType::NackReason.as_u8(), false, None);
    let pdl = reason.as_u16().to_be_bytes();
    header::format(&resp, &pdl, out)
}

/// Builds the response header for `request`. `pid_override` lets
/// `QUEUED_MESSAGE` answer with the PID of the popped parameter instead of
/// its own, as if that parameter had been GET'd directly.
fn response_header(
    request: &RdmHeader,
    source: Uid,
    response_type: u8,
    message_pending: bool,
    pid_override: Option<u16>,
) -> RdmHeader {
    let command_class = match CommandClass::try_from(request.command_class) {
        Ok(CommandClass::SetCommand) => CommandClass::SetCommandResponse,
        Ok(CommandClass::DiscoveryCommand) => CommandClass::DiscoveryCommandResponse,
        _ => CommandClass::GetCommandResponse,
    };
    RdmHeader {
        message_len: 0,
        destination: request.source,
        source,
        transaction_number: request.transaction_number,
        port_or_response_type: response_type,
        message_count: u8::from(message_pending),
        sub_device: request.sub_device,
        command_class: command_class.as_u8(),
        pid: pid_override.unwrap_or(request.pid),
        pdl: 0,
    }
}

/// `GET`/`SET` a parameter by copying its raw stored bytes through verbatim
/// (`SOFTWARE_VERSION_LABEL`, `DEVICE_LABEL`, ...). `set` rejects `Static`
/// entries the same way `ParameterStore::parameter_set` always does.
struct PassthroughHandler;

impl ParamHandler for PassthroughHandler {
    fn get(&self, ctx: &mut HandlerCtx) -> HandlerOutcome {
        let len = ctx.store.parameter_copy(ctx.sub_device, ctx.pid, ctx.response_pdl);
        HandlerOutcome::Ack(len)
    }

    fn set(&self, ctx: &mut HandlerCtx) -> HandlerOutcome {
        if ctx.store.parameter_set(ctx.sub_device, ctx.pid, ctx.request_pdl, ctx.nvs.as_deref_mut()) {
            HandlerOutcome::Ack(0)
        } else {
            HandlerOutcome::Nack(NackReason::UnsupportedCommandClass)
        }
    }
}

static PASSTHROUGH: PassthroughHandler = PassthroughHandler;

struct DeviceInfoHandler;

impl ParamHandler for DeviceInfoHandler {
    fn get(&self, ctx: &mut HandlerCtx) -> HandlerOutcome {
        let mut start_address = [0u8; 2];
        ctx.store.parameter_copy(ctx.sub_device, pids::DMX_START_ADDRESS, &mut start_address);
        let dmx_start_address = u16::from_be_bytes(start_address);

        let values = [
            Value::U16(0x0100),
            Value::U16(ctx.device.model_id),
            Value::U16(ctx.device.product_category),
            Value::U32(ctx.device.software_version_id),
            Value::U16(ctx.device.dmx_footprint),
            Value::U8(ctx.device.personality_current),
            Value::U8(ctx.device.personality_count),
            Value::U16(dmx_start_address),
            Value::U16(ctx.device.sub_device_count),
            Value::U8(ctx.device.sensor_count),
        ];
        match pdl::encode(DEVICE_INFO_FORMAT, &values, ctx.response_pdl) {
            Some(len) => HandlerOutcome::Ack(len),
            None => HandlerOutcome::Nack(NackReason::HardwareFault),
        }
    }
}

static DEVICE_INFO_HANDLER: DeviceInfoHandler = DeviceInfoHandler;

struct DmxStartAddressHandler;

impl ParamHandler for DmxStartAddressHandler {
    fn get(&self, ctx: &mut HandlerCtx) -> HandlerOutcome {
        let len = ctx.store.parameter_copy(ctx.sub_device, ctx.pid, ctx.response_pdl);
        HandlerOutcome::Ack(len)
    }

    fn set(&self, ctx: &mut HandlerCtx) -> HandlerOutcome {
        let Some(bytes) = ctx.request_pdl.get(0..2) else {
            return HandlerOutcome::Nack(NackReason::FormatError);
        };
        let address = u16::from_be_bytes([bytes[0], bytes[1]]);
        if address == 0 || address > 512 {
            return HandlerOutcome::Nack(NackReason::DataOutOfRange);
        }
        if ctx.store.parameter_set(ctx.sub_device, ctx.pid, bytes, ctx.nvs.as_deref_mut()) {
            HandlerOutcome::Ack(0)
        } else {
            HandlerOutcome::Nack(NackReason::HardwareFault)
        }
    }
}

static DMX_START_ADDRESS_HANDLER: DmxStartAddressHandler = DmxStartAddressHandler;

struct IdentifyDeviceHandler;

impl ParamHandler for IdentifyDeviceHandler {
    fn get(&self, ctx: &mut HandlerCtx) -> HandlerOutcome {
        let len = ctx.store.parameter_copy(ctx.sub_device, ctx.pid, ctx.response_pdl);
        HandlerOutcome::Ack(len)
    }

    fn set(&self, ctx: &mut HandlerCtx) -> HandlerOutcome {
        match ctx.request_pdl.first() {
            Some(0) | Some(1) => {
                if ctx.store.parameter_set(ctx.sub_device, ctx.pid, &ctx.request_pdl[..1], ctx.nvs.as_deref_mut()) {
                    HandlerOutcome::Ack(0)
                } else {
                    HandlerOutcome::Nack(NackReason::HardwareFault)
                }
            }
            Some(_) => HandlerOutcome::Nack(NackReason::DataOutOfRange),
            None => HandlerOutcome::Nack(NackReason::FormatError),
        }
    }
}

static IDENTIFY_DEVICE_HANDLER: IdentifyDeviceHandler = IdentifyDeviceHandler;

struct SupportedParametersHandler;

/// Mandatory PIDs never appear in `SUPPORTED_PARAMETERS`'s list, per RDM.
fn is_mandatory(pid: u16) -> bool {
    matches!(
        pid,
        pids::DISC_UNIQUE_BRANCH
            | pids::DISC_MUTE
            | pids::DISC_UN_MUTE
            | pids::SUPPORTED_PARAMETERS
            | pids::PARAMETER_DESCRIPTION
            | pids::DEVICE_INFO
            | pids::SOFTWARE_VERSION_LABEL
            | pids::DMX_START_ADDRESS
            | pids::IDENTIFY_DEVICE
            | pids::QUEUED_MESSAGE
            | pids::STATUS_MESSAGE
    )
}

impl ParamHandler for SupportedParametersHandler {
    fn get(&self, ctx: &mut HandlerCtx) -> HandlerOutcome {
        let mut len = 0;
        for entry in ctx.store.iter() {
            if is_mandatory(entry.pid) {
                continue;
            }
            if len + 2 > ctx.response_pdl.len() {
                break;
            }
            ctx.response_pdl[len..len + 2].copy_from_slice(&entry.pid.to_be_bytes());
            len += 2;
        }
        HandlerOutcome::Ack(len)
    }
}

static SUPPORTED_PARAMETERS_HANDLER: SupportedParametersHandler = SupportedParametersHandler;

struct ParameterDescriptionHandler;

impl ParamHandler for ParameterDescriptionHandler {
    fn get(&self, ctx: &mut HandlerCtx) -> HandlerOutcome {
        let Some(bytes) = ctx.request_pdl.get(0..2) else {
            return HandlerOutcome::Nack(NackReason::FormatError);
        };
        let target_pid = u16::from_be_bytes([bytes[0], bytes[1]]);

        let Some(def) = ctx.store.get_entry(ctx.sub_device, target_pid).and_then(|e| e.definition) else {
            return HandlerOutcome::Nack(NackReason::DataOutOfRange);
        };

        let description = def.description.unwrap_or("");
        let values = [
            Value::U16(target_pid),
            Value::U8(0), // PDL_SIZE: informational only, not enforced by this crate.
            Value::U8(def.data_type as u8),
            Value::U8(command_class_byte(def.pid_cc)),
            Value::U8(0), // TYPE: reserved.
            Value::U8(def.units),
            Value::U8(def.prefix),
            Value::U32(def.min),
            Value::U32(def.max),
            Value::U32(0), // DEFAULT_VALUE: not tracked separately from the live value.
            Value::Ascii(pdl::AsciiBuf::from_bytes(description.as_bytes())),
        ];
        match pdl::encode(PARAMETER_DESCRIPTION_FORMAT, &values, ctx.response_pdl) {
            Some(len) => HandlerOutcome::Ack(len),
            None => HandlerOutcome::Nack(NackReason::HardwareFault),
        }
    }
}

fn command_class_byte(cc: AllowedCommandClass) -> u8 {
    match cc {
        AllowedCommandClass::Get => 0x01,
        AllowedCommandClass::Set => 0x02,
        AllowedCommandClass::GetSet => 0x03,
        AllowedCommandClass::Disc => 0x00,
    }
}

static PARAMETER_DESCRIPTION_HANDLER: ParameterDescriptionHandler = ParameterDescriptionHandler;

struct DiscUniqueBranchHandler;

impl ParamHandler for DiscUniqueBranchHandler {
    fn get(&self, ctx: &mut HandlerCtx) -> HandlerOutcome {
        if ctx.device.muted {
            return HandlerOutcome::Silent;
        }
        let Some(lower_bytes) = ctx.request_pdl.get(0..6) else {
            return HandlerOutcome::Silent;
        };
        let Some(upper_bytes) = ctx.request_pdl.get(6..12) else {
            return HandlerOutcome::Silent;
        };
        let lower = Uid::from_be_bytes(lower_bytes.try_into().unwrap());
        let upper = Uid::from_be_bytes(upper_bytes.try_into().unwrap());
        if !ctx.device.uid.in_range(lower, upper) {
            return HandlerOutcome::Silent;
        }
        match disc::encode(ctx.device.uid, ctx.response_pdl) {
            Some(len) => HandlerOutcome::DiscResponse(len),
            None => HandlerOutcome::Silent,
        }
    }
}

static DISC_UNIQUE_BRANCH_HANDLER: DiscUniqueBranchHandler = DiscUniqueBranchHandler;

struct DiscMuteHandler {
    mute: bool,
}

impl ParamHandler for DiscMuteHandler {
    fn get(&self, ctx: &mut HandlerCtx) -> HandlerOutcome {
        ctx.device.muted = self.mute;
        let flags = MuteControlFlags::empty();
        let pdl = flags.bits().to_be_bytes();
        ctx.response_pdl[..2].copy_from_slice(&pdl);
        HandlerOutcome::Ack(2)
    }
}

static DISC_MUTE_HANDLER: DiscMuteHandler = DiscMuteHandler { mute: true };
static DISC_UN_MUTE_HANDLER: DiscMuteHandler = DiscMuteHandler { mute: false };

struct QueuedMessageHandler;

impl ParamHandler for QueuedMessageHandler {
    fn get(&self, ctx: &mut HandlerCtx) -> HandlerOutcome {
        // Drains one pending change notification per request, answering as
        // if the changed PID had been GET'd directly (its value, under its
        // own PID in the response header). An empty queue, or a PID that
        // changed and was since unregistered, both answer with an empty ACK
        // rather than a NACK (see the queued-message open question in
        // DESIGN.md) — the controller keeps polling until the queue drains.
        loop {
            let Some(pid) = ctx.store.queue_pop() else {
                return HandlerOutcome::Ack(0);
            };
            if let Some(value) = ctx.store.parameter_get(ctx.sub_device, pid) {
                let n = value.len().min(ctx.response_pdl.len());
                ctx.response_pdl[..n].copy_from_slice(&value[..n]);
                return HandlerOutcome::AckSubstitutePid(n, pid);
            }
        }
    }
}

static QUEUED_MESSAGE_HANDLER: QueuedMessageHandler = QueuedMessageHandler;

struct StatusMessageHandler;

impl ParamHandler for StatusMessageHandler {
    fn get(&self, _ctx: &mut HandlerCtx) -> HandlerOutcome {
        HandlerOutcome::Ack(0)
    }
}

static STATUS_MESSAGE_HANDLER: StatusMessageHandler = StatusMessageHandler;

static DISC_UNIQUE_BRANCH_DEF: ParameterDefinition = ParameterDefinition {
    pid_cc: AllowedCommandClass::Disc,
    handler: &DISC_UNIQUE_BRANCH_HANDLER,
    request_format: "uu",
    response_format: "",
    data_type: DataType::NotDefined,
    units: 0,
    prefix: 0,
    min: 0,
    max: 0,
    description: None,
};

static DISC_MUTE_DEF: ParameterDefinition = ParameterDefinition {
    pid_cc: AllowedCommandClass::Disc,
    handler: &DISC_MUTE_HANDLER,
    request_format: "",
    response_format: "w",
    data_type: DataType::NotDefined,
    units: 0,
    prefix: 0,
    min: 0,
    max: 0,
    description: None,
};

static DISC_UN_MUTE_DEF: ParameterDefinition = ParameterDefinition {
    pid_cc: AllowedCommandClass::Disc,
    handler: &DISC_UN_MUTE_HANDLER,
    request_format: "",
    response_format: "w",
    data_type: DataType::NotDefined,
    units: 0,
    prefix: 0,
    min: 0,
    max: 0,
    description: None,
};

static SUPPORTED_PARAMETERS_DEF: ParameterDefinition = ParameterDefinition {
    pid_cc: AllowedCommandClass::Get,
    handler: &SUPPORTED_PARAMETERS_HANDLER,
    request_format: "",
    response_format: "",
    data_type: DataType::NotDefined,
    units: 0,
    prefix: 0,
    min: 0,
    max: 0,
    description: None,
};

static PARAMETER_DESCRIPTION_DEF: ParameterDefinition = ParameterDefinition {
    pid_cc: AllowedCommandClass::Get,
    handler: &PARAMETER_DESCRIPTION_HANDLER,
    request_format: "w",
    response_format: PARAMETER_DESCRIPTION_FORMAT,
    data_type: DataType::NotDefined,
    units: 0,
    prefix: 0,
    min: 0,
    max: 0,
    description: None,
};

static DEVICE_INFO_DEF: ParameterDefinition = ParameterDefinition {
    pid_cc: AllowedCommandClass::Get,
    handler: &DEVICE_INFO_HANDLER,
    request_format: "",
    response_format: DEVICE_INFO_FORMAT,
    data_type: DataType::NotDefined,
    units: 0,
    prefix: 0,
    min: 0,
    max: 0,
    description: None,
};

static SOFTWARE_VERSION_LABEL_DEF: ParameterDefinition = ParameterDefinition {
    pid_cc: AllowedCommandClass::Get,
    handler: &PASSTHROUGH,
    request_format: "",
    response_format: "a",
    data_type: DataType::Ascii,
    units: 0,
    prefix: 0,
    min: 0,
    max: 32,
    description: Some("Software Version Label"),
};

static DMX_START_ADDRESS_DEF: ParameterDefinition = ParameterDefinition {
    pid_cc: AllowedCommandClass::GetSet,
    handler: &DMX_START_ADDRESS_HANDLER,
    request_format: "w",
    response_format: "w",
    data_type: DataType::U16,
    units: 0,
    prefix: 0,
    min: 1,
    max: 512,
    description: Some("DMX Start Address"),
};

static IDENTIFY_DEVICE_DEF: ParameterDefinition = ParameterDefinition {
    pid_cc: AllowedCommandClass::GetSet,
    handler: &IDENTIFY_DEVICE_HANDLER,
    request_format: "b",
    response_format: "b",
    data_type: DataType::Bool,
    units: 0,
    prefix: 0,
    min: 0,
    max: 1,
    description: Some("Identify Device"),
};

static QUEUED_MESSAGE_DEF: ParameterDefinition = ParameterDefinition {
    pid_cc: AllowedCommandClass::Get,
    handler: &QUEUED_MESSAGE_HANDLER,
    request_format: "b",
    response_format: "",
    data_type: DataType::NotDefined,
    units: 0,
    prefix: 0,
    min: 0,
    max: 0,
    description: None,
};

static STATUS_MESSAGE_DEF: ParameterDefinition = ParameterDefinition {
    pid_cc: AllowedCommandClass::Get,
    handler: &STATUS_MESSAGE_HANDLER,
    request_format: "b",
    response_format: "",
    data_type: DataType::NotDefined,
    units: 0,
    prefix: 0,
    min: 0,
    max: 0,
    description: None,
};

static DEVICE_LABEL_DEF: ParameterDefinition = ParameterDefinition {
    pid_cc: AllowedCommandClass::GetSet,
    handler: &PASSTHROUGH,
    request_format: "a",
    response_format: "a",
    data_type: DataType::Ascii,
    units: 0,
    prefix: 0,
    min: 0,
    max: 32,
    description: Some("Device Label"),
};

/// Registers every mandatory built-in PID, plus the optional
/// `DEVICE_LABEL`, against `store`. Called once from `Driver::install`.
pub fn register_builtins(store: &mut ParameterStore) -> bool {
    let mut ok = true;
    ok &= store.add_parameter(pid::ROOT_SUB_DEVICE, pids::DISC_UNIQUE_BRANCH, StorageClass::Static(&[]), &[], 0, None);
    ok &= store.add_parameter(pid::ROOT_SUB_DEVICE, pids::DISC_MUTE, StorageClass::Static(&[]), &[], 0, None);
    ok &= store.add_parameter(pid::ROOT_SUB_DEVICE, pids::DISC_UN_MUTE, StorageClass::Static(&[]), &[], 0, None);
    ok &= store.add_parameter(pid::ROOT_SUB_DEVICE, pids::SUPPORTED_PARAMETERS, StorageClass::Static(&[]), &[], 0, None);
    ok &= store.add_parameter(pid::ROOT_SUB_DEVICE, pids::PARAMETER_DESCRIPTION, StorageClass::Static(&[]), &[], 0, None);
    ok &= store.add_parameter(pid::ROOT_SUB_DEVICE, pids::DEVICE_INFO, StorageClass::Static(&[]), &[], 0, None);
    ok &= store.add_parameter(pid::ROOT_SUB_DEVICE, pids::SOFTWARE_VERSION_LABEL, StorageClass::Static(b"1.0.0"), &[], 0, None);
    ok &= store.add_parameter(pid::ROOT_SUB_DEVICE, pids::DMX_START_ADDRESS, StorageClass::Dynamic, &[0, 1], 2, None);
    ok &= store.add_parameter(pid::ROOT_SUB_DEVICE, pids::IDENTIFY_DEVICE, StorageClass::Dynamic, &[0], 1, None);
    ok &= store.add_parameter(pid::ROOT_SUB_DEVICE, pids::QUEUED_MESSAGE, StorageClass::Static(&[]), &[], 0, None);
    ok &= store.add_parameter(pid::ROOT_SUB_DEVICE, pids::STATUS_MESSAGE, StorageClass::Static(&[]), &[], 0, None);
    ok &= store.add_parameter(pid::ROOT_SUB_DEVICE, pids::DEVICE_LABEL, StorageClass::Dynamic, b"", 32, None);

    ok &= store.definition_set(pid::ROOT_SUB_DEVICE, pids::DISC_UNIQUE_BRANCH, &DISC_UNIQUE_BRANCH_DEF);
    ok &= store.definition_set(pid::ROOT_SUB_DEVICE, pids::DISC_MUTE, &DISC_MUTE_DEF);
    ok &= store.definition_set(pid::ROOT_SUB_DEVICE, pids::DISC_UN_MUTE, &DISC_UN_MUTE_DEF);
    ok &= store.definition_set(pid::ROOT_SUB_DEVICE, pids::SUPPORTED_PARAMETERS, &SUPPORTED_PARAMETERS_DEF);
    ok &= store.definition_set(pid::ROOT_SUB_DEVICE, pids::PARAMETER_DESCRIPTION, &PARAMETER_DESCRIPTION_DEF);
    ok &= store.definition_set(pid::ROOT_SUB_DEVICE, pids::DEVICE_INFO, &DEVICE_INFO_DEF);
    ok &= store.definition_set(pid::ROOT_SUB_DEVICE, pids::SOFTWARE_VERSION_LABEL, &SOFTWARE_VERSION_LABEL_DEF);
    ok &= store.definition_set(pid::ROOT_SUB_DEVICE, pids::DMX_START_ADDRESS, &DMX_START_ADDRESS_DEF);
    ok &= store.definition_set(pid::ROOT_SUB_DEVICE, pids::IDENTIFY_DEVICE, &IDENTIFY_DEVICE_DEF);
    ok &= store.definition_set(pid::ROOT_SUB_DEVICE, pids::QUEUED_MESSAGE, &QUEUED_MESSAGE_DEF);
    ok &= store.definition_set(pid::ROOT_SUB_DEVICE, pids::STATUS_MESSAGE, &STATUS_MESSAGE_DEF);
    ok &= store.definition_set(pid::ROOT_SUB_DEVICE, pids::DEVICE_LABEL, &DEVICE_LABEL_DEF);

    ok
}
