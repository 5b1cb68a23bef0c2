//! Error taxonomy surfaced by the driver API and by RDM NACK responses.
//!
//! Argument-validation failures on public APIs never panic; they return one
//! of these variants. NACKs (`NackReason`) are a normal protocol outcome, not
//! an error at the driver API level, and are kept in a separate type so the
//! two can never be conflated at a call site.

use snafu::Snafu;

/// Errors returned by blocking and non-blocking driver operations.
#[derive(Debug, Snafu, Clone, Copy, PartialEq, Eq)]
#[snafu(visibility(pub(crate)))]
pub enum DriverError {
    /// A blocking call (`receive`, `send_and_wait`, ...) exceeded its caller-supplied timeout.
    #[snafu(display("operation timed out"))]
    Timeout,

    /// The RX FIFO overran before a waiting task could drain it.
    #[snafu(display("RX FIFO overflow"))]
    Overflow,

    /// A framing, parity, or RS-485 line error was reported by the UART.
    #[snafu(display("improper slot (framing/parity error)"))]
    ImproperSlot,

    /// The port was used before `install` or after `uninstall`.
    #[snafu(display("port is not installed"))]
    NotInstalled,

    /// A caller-supplied argument failed validation.
    #[snafu(display("invalid argument"))]
    InvalidArg,

    /// A fixed-capacity registry (parameters, queue, ports) is full.
    #[snafu(display("no capacity remaining"))]
    NoCapacity,
}

pub type Result<T, E = DriverError> = core::result::Result<T, E>;

/// Fatal conditions raised only from [`crate::driver::Driver::install`].
///
/// Per spec, only out-of-memory during install and double-install on the
/// same port are fatal; nothing else in the public API panics or aborts.
#[derive(Debug, Snafu, Clone, Copy, PartialEq, Eq)]
pub enum InstallError {
    /// `install` was called twice for the same port without an intervening `uninstall`.
    #[snafu(display("port is already installed"))]
    AlreadyInstalled,

    /// The fixed parameter/port storage reserved at compile time is too small for
    /// this configuration (there is no dynamic allocation to fall back to).
    #[snafu(display("insufficient pre-reserved capacity to install this port"))]
    OutOfMemory,
}

/// RDM NACK reason codes (RDM `NACK_REASON` wire values), carried in the
/// 2-byte PDL of a `NACK` response. Distinct from [`DriverError`]: a NACK is
/// a successful protocol exchange with a negative outcome, never a driver
/// API error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum NackReason {
    /// The PID is not supported by this device/sub-device.
    UnknownPid = 0x0000,
    /// The PDL or its parameter data failed a format/size check.
    FormatError = 0x0001,
    /// An internal hardware fault prevented answering the request.
    HardwareFault = 0x0002,
    /// The PID does not support the command class used (GET on a SET-only PID, etc).
    UnsupportedCommandClass = 0x0005,
    /// A GET/SET parameter value is outside the PID's declared bounds.
    DataOutOfRange = 0x0006,
    /// The device's internal buffer for this operation is full.
    BufferFull = 0x0007,
    /// The request's packet size is larger than this device supports.
    PacketSizeUnsupported = 0x0008,
    /// The addressed sub-device number does not exist.
    SubDeviceOutOfRange = 0x0009,
    /// A proxy's buffer for queued messages is full.
    ProxyBufferFull = 0x000A,
}

impl NackReason {
    pub const fn as_u16(self) -> u16 {
        self as u16
    }
}
