/// Transmission mode of a device notification: when the server pushes
/// samples for a watched variable.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TransMode {
    /// No transmission.
    None,
    /// The client polls; kept for completeness.
    ClientCycle,
    /// The client polls on change; kept for completeness.
    ClientOnChange,
    /// The server samples the variable every cycle time and always sends.
    ServerCycle,
    /// The server samples every cycle time and sends only on change.
    ServerOnChange,
    /// A mode not defined by this library.
    Unknown(u32),
}

impl TransMode {
    /// Length of the transmission mode on the wire.
    pub const LENGTH: usize = 4;

    /// Serializes as little-endian.
    pub fn to_bytes(&self) -> [u8; Self::LENGTH] {
        u32::from(*self).to_le_bytes()
    }

    /// Deserializes from little-endian.
    pub fn from_bytes(bytes: [u8; Self::LENGTH]) -> Self {
        Self::from(u32::from_le_bytes(bytes))
    }
}

impl From<u32> for TransMode {
    fn from(value: u32) -> Self {
        match value {
            0 => Self::None,
            1 => Self::ClientCycle,
            2 => Self::ClientOnChange,
            3 => Self::ServerCycle,
            4 => Self::ServerOnChange,
            n => Self::Unknown(n),
        }
    }
}

impl From<TransMode> for u32 {
    fn from(value: TransMode) -> Self {
        match value {
            TransMode::None => 0,
            TransMode::ClientCycle => 1,
            TransMode::ClientOnChange => 2,
            TransMode::ServerCycle => 3,
            TransMode::ServerOnChange => 4,
            TransMode::Unknown(n) => n,
        }
    }
}
