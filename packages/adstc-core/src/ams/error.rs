use crate::ads::CommandId;

/// Errors produced while parsing AMS addressing primitives.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum NetIdError {
    #[error("expected 6 dot-separated octets, found {found}")]
    WrongOctetCount { found: usize },

    #[error("octet {position} is not a valid u8: {value:?}")]
    InvalidOctet { position: usize, value: String },

    #[error("buffer too small for AMS Net ID: expected {expected} bytes, found {found}")]
    BufferTooSmall { expected: usize, found: usize },
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum AddrError {
    #[error("buffer too small for AMS address: expected {expected} bytes, found {found}")]
    BufferTooSmall { expected: usize, found: usize },

    #[error("invalid AMS address {input:?}: expected `net_id:port`")]
    InvalidFormat { input: String },

    #[error(transparent)]
    NetId(#[from] NetIdError),
}

/// Errors produced while parsing the 6-byte AMS/TCP envelope.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("buffer too small for AMS/TCP envelope: expected {expected} bytes, found {found}")]
    BufferTooSmall { expected: usize, found: usize },

    #[error("reserved envelope prefix must be zero, found {found:#06x}")]
    ReservedNotZero { found: u16 },
}

/// Errors produced while parsing the 32-byte AMS header.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum AmsHeaderError {
    #[error("buffer too small for AMS header: expected {expected} bytes, found {found}")]
    BufferTooSmall { expected: usize, found: usize },

    #[error("AMS header declares {declared} data bytes but frame carries {carried}")]
    LengthMismatch { declared: u32, carried: usize },

    #[error("unexpected command id: expected {expected:?}, got {got:?}")]
    UnexpectedCommand { expected: CommandId, got: CommandId },
}
