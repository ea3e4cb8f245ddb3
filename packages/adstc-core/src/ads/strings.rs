//! Codecs for the PLC string types.
//!
//! `STRING` is byte-oriented Windows-1252 in a fixed buffer with a NUL
//! terminator; `WSTRING` is UTF-16LE with a two-byte NUL terminator. Readers
//! stop at the first terminator; writers terminate and zero-pad the rest of
//! the buffer. Buffer sizes come from the symbol's declared size, so the
//! codecs here take them as values.

use super::error::StringError;
use encoding_rs::{UTF_16LE, WINDOWS_1252};

/// Decodes a `STRING` buffer, stopping at the first NUL.
pub fn decode_string(buf: &[u8]) -> String {
    let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
    let (cow, _, _) = WINDOWS_1252.decode(&buf[..end]);
    cow.into_owned()
}

/// Encodes `s` into a `STRING` buffer of `capacity` bytes.
///
/// The encoded text must leave room for the terminator; the remainder of
/// the buffer is zeroed.
pub fn encode_string(s: &str, capacity: usize) -> Result<Vec<u8>, StringError> {
    let (encoded, _, had_errors) = WINDOWS_1252.encode(s);
    if had_errors {
        return Err(StringError::Encoding);
    }
    if capacity == 0 || encoded.len() > capacity - 1 {
        return Err(StringError::TooLong {
            capacity,
            got: encoded.len(),
        });
    }

    let mut buf = vec![0u8; capacity];
    buf[..encoded.len()].copy_from_slice(&encoded);
    Ok(buf)
}

/// Decodes a `WSTRING` buffer, stopping at the first two-byte NUL.
pub fn decode_wstring(buf: &[u8]) -> Result<String, StringError> {
    if buf.len() % 2 != 0 {
        return Err(StringError::OddWideBuffer(buf.len()));
    }

    let end = buf
        .chunks_exact(2)
        .position(|unit| unit == [0, 0])
        .map(|units| units * 2)
        .unwrap_or(buf.len());

    let (cow, _, _) = UTF_16LE.decode(&buf[..end]);
    Ok(cow.into_owned())
}

/// Encodes `s` into a `WSTRING` buffer of `capacity` bytes.
pub fn encode_wstring(s: &str, capacity: usize) -> Result<Vec<u8>, StringError> {
    if capacity % 2 != 0 {
        return Err(StringError::OddWideBuffer(capacity));
    }

    let units: Vec<u16> = s.encode_utf16().collect();
    let encoded_len = units.len() * 2;
    if capacity < 2 || encoded_len > capacity - 2 {
        return Err(StringError::TooLong {
            capacity,
            got: encoded_len,
        });
    }

    let mut buf = vec![0u8; capacity];
    for (i, unit) in units.iter().enumerate() {
        buf[i * 2..i * 2 + 2].copy_from_slice(&unit.to_le_bytes());
    }
    Ok(buf)
}
