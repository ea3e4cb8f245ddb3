#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum FileTimeError {
    #[error("buffer too small for FILETIME: expected {expected} bytes, found {found}")]
    BufferTooSmall { expected: usize, found: usize },
}

#[derive(Debug, Clone, thiserror::Error, PartialEq, Eq)]
pub enum StringError {
    #[error("string of {got} encoded bytes does not fit a {capacity}-byte PLC buffer")]
    TooLong { capacity: usize, got: usize },

    #[error("string contains characters not representable in Windows-1252")]
    Encoding,

    #[error("WSTRING buffer length {0} is not a multiple of two")]
    OddWideBuffer(usize),
}
