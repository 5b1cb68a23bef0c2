//! RDM command classes, response types, and the PID constants this crate's
//! responder runtime is required to auto-register.

/// RDM command class (`CC` byte of the header).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum CommandClass {
    DiscoveryCommand = 0x10,
    DiscoveryCommandResponse = 0x11,
    GetCommand = 0x20,
    GetCommandResponse = 0x21,
    SetCommand = 0x30,
    SetCommandResponse = 0x31,
}

impl TryFrom<u8> for CommandClass {
    type Error = ();

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0x10 => Ok(CommandClass::DiscoveryCommand),
            0x11 => Ok(CommandClass::DiscoveryCommandResponse),
            0x20 => Ok(CommandClass::GetCommand),
            0x21 => Ok(CommandClass::GetCommandResponse),
            0x30 => Ok(CommandClass::SetCommand),
            0x31 => Ok(CommandClass::SetCommandResponse),
            _ => Err(()),
        }
    }
}

impl CommandClass {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    pub const fn is_get(self) -> bool {
        matches!(self, CommandClass::GetCommand)
    }

    pub const fn is_set(self) -> bool {
        matches!(self, CommandClass::SetCommand)
    }

    pub const fn is_discovery(self) -> bool {
        matches!(self, CommandClass::DiscoveryCommand)
    }
}

/// RDM response type (`PORT_ID / RESPONSE_TYPE` byte of a response header).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ResponseType {
    Ack = 0x00,
    AckTimer = 0x01,
    NackReason = 0x02,
    AckOverflow = 0x03,
}

impl ResponseType {
    pub const fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Which command classes a PID accepts, carried on `ParameterDefinition::pid_cc`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AllowedCommandClass {
    Get,
    Set,
    GetSet,
    Disc,
}

impl AllowedCommandClass {
    /// True if `cc` is one this PID accepts.
    pub const fn accepts(self, cc: CommandClass) -> bool {
        match (self, cc) {
            (AllowedCommandClass::Get, CommandClass::GetCommand) => true,
            (AllowedCommandClass::Set, CommandClass::SetCommand) => true,
            (AllowedCommandClass::GetSet, CommandClass::GetCommand)
            | (AllowedCommandClass::GetSet, CommandClass::SetCommand) => true,
            (AllowedCommandClass::Disc, CommandClass::DiscoveryCommand) => true,
            _ => false,
        }
    }
}

/// Mandatory and well-known PIDs this crate's responder runtime knows about.
pub mod pids {
    pub const DISC_UNIQUE_BRANCH: u16 = 0x0001;
    pub const DISC_MUTE: u16 = 0x0002;
    pub const DISC_UN_MUTE: u16 = 0x0003;
    pub const PROXIED_DEVICES: u16 = 0x0010;
    pub const PROXIED_DEVICE_COUNT: u16 = 0x0011;
    pub const QUEUED_MESSAGE: u16 = 0x0020;
    pub const STATUS_MESSAGE: u16 = 0x0030;
    pub const SUPPORTED_PARAMETERS: u16 = 0x0050;
    pub const PARAMETER_DESCRIPTION: u16 = 0x0051;
    pub const DEVICE_INFO: u16 = 0x0060;
    pub const SOFTWARE_VERSION_LABEL: u16 = 0x00C0;
    pub const DMX_START_ADDRESS: u16 = 0x00F0;
    pub const IDENTIFY_DEVICE: u16 = 0x1000;
    pub const DEVICE_LABEL: u16 = 0x0082;
}

/// Root sub-device address.
pub const ROOT_SUB_DEVICE: u16 = 0x0000;
/// Sub-device wildcard used in broadcast-style requests.
pub const ALL_SUB_DEVICES: u16 = 0xFFFF;
