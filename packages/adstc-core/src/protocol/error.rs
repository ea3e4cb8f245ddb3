/// Errors raised while decoding ADS command payloads.
#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("{command} payload truncated: needed {needed} more bytes at offset {offset}")]
    Truncated {
        command: &'static str,
        offset: usize,
        needed: usize,
    },

    #[error("{command} payload carries {extra} bytes past the end of its fields")]
    TrailingBytes { command: &'static str, extra: usize },

    #[error("{command} length field declares {declared} bytes but {carried} are present")]
    LengthMismatch {
        command: &'static str,
        declared: usize,
        carried: usize,
    },
}
