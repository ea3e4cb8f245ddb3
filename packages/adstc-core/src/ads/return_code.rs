/// Result codes returned by ADS devices and routers.
///
/// Every response payload starts with one of these, and the AMS header
/// carries one for routing-level failures. The set below names the codes a
/// client commonly meets; everything else is preserved in `Other`.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReturnCode {
    #[error("no error (0x0)")]
    Ok,

    #[error("internal error (0x1)")]
    InternalError,
    #[error("target port not found - ADS server not started or not reachable (0x6)")]
    TargetPortNotFound,
    #[error("target machine not found - AMS route missing (0x7)")]
    TargetMachineNotFound,
    #[error("unknown command id (0x8)")]
    UnknownCommandId,
    #[error("invalid AMS length (0xE)")]
    InvalidAmsLength,
    #[error("invalid AMS Net ID (0xF)")]
    InvalidAmsNetId,
    #[error("port disabled - system service not started (0x12)")]
    PortDisabled,
    #[error("host unreachable (0x1B)")]
    HostUnreachable,

    #[error("device error (0x700)")]
    DeviceError,
    #[error("service is not supported by the device (0x701)")]
    ServiceNotSupported,
    #[error("invalid index group (0x702)")]
    InvalidIndexGroup,
    #[error("invalid index offset (0x703)")]
    InvalidIndexOffset,
    #[error("reading or writing not permitted (0x704)")]
    AccessDenied,
    #[error("parameter size not correct (0x705)")]
    InvalidParameterSize,
    #[error("invalid parameter values (0x706)")]
    InvalidParameterValues,
    #[error("device is not in a ready state (0x707)")]
    DeviceNotReady,
    #[error("device is busy (0x708)")]
    DeviceBusy,
    #[error("out of memory (0x70A)")]
    OutOfMemory,
    #[error("not found - files, symbols, etc. (0x70C)")]
    NotFound,
    #[error("symbol not found (0x710)")]
    SymbolNotFound,
    #[error("symbol version invalid - online change may have occurred (0x711)")]
    SymbolVersionInvalid,
    #[error("server is in an invalid state (0x712)")]
    InvalidServerState,
    #[error("transmission mode not supported (0x713)")]
    TransModeNotSupported,
    #[error("notification handle is invalid (0x714)")]
    InvalidNotificationHandle,
    #[error("no more notification handles (0x716)")]
    NoMoreNotificationHandles,
    #[error("size for watch too large (0x717)")]
    SizeTooLarge,
    #[error("device not initialized (0x718)")]
    DeviceNotInitialized,
    #[error("timeout elapsed on the device (0x745)")]
    DeviceTimeout,

    #[error("ADS error code {0:#x}")]
    Other(u32),
}

impl ReturnCode {
    /// Length of a return code on the wire.
    pub const LENGTH: usize = 4;

    /// True for the success code.
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok)
    }

    /// True for the two routing errors a client may retry after the route
    /// comes back (a PLC leaving Config mode, a router restart).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::TargetPortNotFound | Self::TargetMachineNotFound)
    }

    /// Serializes as little-endian.
    pub fn to_bytes(&self) -> [u8; Self::LENGTH] {
        u32::from(*self).to_le_bytes()
    }

    /// Deserializes from little-endian.
    pub fn from_bytes(bytes: [u8; Self::LENGTH]) -> Self {
        Self::from(u32::from_le_bytes(bytes))
    }

    /// Turns a non-`Ok` code into `Err(self)`, passing `value` through otherwise.
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_ok() { Ok(value) } else { Err(self) }
    }
}

impl From<u32> for ReturnCode {
    fn from(value: u32) -> Self {
        match value {
            0x0 => Self::Ok,
            0x1 => Self::InternalError,
            0x6 => Self::TargetPortNotFound,
            0x7 => Self::TargetMachineNotFound,
            0x8 => Self::UnknownCommandId,
            0xE => Self::InvalidAmsLength,
            0xF => Self::InvalidAmsNetId,
            0x12 => Self::PortDisabled,
            0x1B => Self::HostUnreachable,
            0x700 => Self::DeviceError,
            0x701 => Self::ServiceNotSupported,
            0x702 => Self::InvalidIndexGroup,
            0x703 => Self::InvalidIndexOffset,
            0x704 => Self::AccessDenied,
            0x705 => Self::InvalidParameterSize,
            0x706 => Self::InvalidParameterValues,
            0x707 => Self::DeviceNotReady,
            0x708 => Self::DeviceBusy,
            0x70A => Self::OutOfMemory,
            0x70C => Self::NotFound,
            0x710 => Self::SymbolNotFound,
            0x711 => Self::SymbolVersionInvalid,
            0x712 => Self::InvalidServerState,
            0x713 => Self::TransModeNotSupported,
            0x714 => Self::InvalidNotificationHandle,
            0x716 => Self::NoMoreNotificationHandles,
            0x717 => Self::SizeTooLarge,
            0x718 => Self::DeviceNotInitialized,
            0x745 => Self::DeviceTimeout,
            n => Self::Other(n),
        }
    }
}

impl From<ReturnCode> for u32 {
    fn from(value: ReturnCode) -> Self {
        match value {
            ReturnCode::Ok => 0x0,
            ReturnCode::InternalError => 0x1,
            ReturnCode::TargetPortNotFound => 0x6,
            ReturnCode::TargetMachineNotFound => 0x7,
            ReturnCode::UnknownCommandId => 0x8,
            ReturnCode::InvalidAmsLength => 0xE,
            ReturnCode::InvalidAmsNetId => 0xF,
            ReturnCode::PortDisabled => 0x12,
            ReturnCode::HostUnreachable => 0x1B,
            ReturnCode::DeviceError => 0x700,
            ReturnCode::ServiceNotSupported => 0x701,
            ReturnCode::InvalidIndexGroup => 0x702,
            ReturnCode::InvalidIndexOffset => 0x703,
            ReturnCode::AccessDenied => 0x704,
            ReturnCode::InvalidParameterSize => 0x705,
            ReturnCode::InvalidParameterValues => 0x706,
            ReturnCode::DeviceNotReady => 0x707,
            ReturnCode::DeviceBusy => 0x708,
            ReturnCode::OutOfMemory => 0x70A,
            ReturnCode::NotFound => 0x70C,
            ReturnCode::SymbolNotFound => 0x710,
            ReturnCode::SymbolVersionInvalid => 0x711,
            ReturnCode::InvalidServerState => 0x712,
            ReturnCode::TransModeNotSupported => 0x713,
            ReturnCode::InvalidNotificationHandle => 0x714,
            ReturnCode::NoMoreNotificationHandles => 0x716,
            ReturnCode::SizeTooLarge => 0x717,
            ReturnCode::DeviceNotInitialized => 0x718,
            ReturnCode::DeviceTimeout => 0x745,
            ReturnCode::Other(n) => n,
        }
    }
}
