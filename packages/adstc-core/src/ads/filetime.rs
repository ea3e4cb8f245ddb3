use super::error::FileTimeError;
use chrono::{DateTime, TimeZone, Utc};

/// A timestamp in the Windows FILETIME format: 100-nanosecond intervals
/// since `1601-01-01 00:00:00 UTC`.
///
/// Device notifications stamp every sample group with one of these. The
/// portable conversion is `unix_nanos = (filetime - 116444736000000000) * 100`.
///
/// # Wire Format
/// 8 bytes, little-endian `u64`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FileTime(u64);

impl FileTime {
    /// Length of a FILETIME on the wire.
    pub const LENGTH: usize = 8;

    /// 100-ns ticks between `1601-01-01` and the Unix epoch.
    pub const UNIX_EPOCH_TICKS: u64 = 116_444_736_000_000_000;

    /// 100-ns ticks per second.
    pub const TICKS_PER_SEC: u64 = 10_000_000;

    /// Wraps a raw tick count.
    pub const fn from_raw(ticks: u64) -> Self {
        Self(ticks)
    }

    /// Returns the raw tick count.
    pub const fn as_raw(self) -> u64 {
        self.0
    }

    /// Nanoseconds since the Unix epoch. Saturates at zero for values
    /// before 1970, which no running PLC produces.
    pub fn unix_nanos(self) -> u64 {
        self.0.saturating_sub(Self::UNIX_EPOCH_TICKS) * 100
    }

    /// Converts to a [`DateTime<Utc>`].
    pub fn to_datetime(self) -> DateTime<Utc> {
        let nanos = self.unix_nanos();
        let secs = (nanos / 1_000_000_000) as i64;
        let sub_nanos = (nanos % 1_000_000_000) as u32;

        Utc.timestamp_opt(secs, sub_nanos)
            .single()
            .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
    }

    /// Converts from a [`DateTime<Utc>`]. Saturates at the FILETIME epoch
    /// for datetimes before 1970.
    pub fn from_datetime(dt: DateTime<Utc>) -> Self {
        let nanos = dt.timestamp_nanos_opt().unwrap_or(0).max(0) as u64;
        Self(Self::UNIX_EPOCH_TICKS + nanos / 100)
    }

    /// Serializes as little-endian.
    pub fn to_bytes(self) -> [u8; Self::LENGTH] {
        self.0.to_le_bytes()
    }

    /// Deserializes from little-endian.
    pub fn from_bytes(bytes: [u8; Self::LENGTH]) -> Self {
        Self(u64::from_le_bytes(bytes))
    }

    /// Deserializes from the leading 8 bytes of a slice.
    pub fn try_from_slice(bytes: &[u8]) -> Result<Self, FileTimeError> {
        if bytes.len() < Self::LENGTH {
            return Err(FileTimeError::BufferTooSmall {
                expected: Self::LENGTH,
                found: bytes.len(),
            });
        }
        Ok(Self::from_bytes(bytes[..Self::LENGTH].try_into().unwrap()))
    }
}

impl From<u64> for FileTime {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

impl From<FileTime> for u64 {
    fn from(value: FileTime) -> Self {
        value.0
    }
}

impl From<FileTime> for DateTime<Utc> {
    fn from(value: FileTime) -> Self {
        value.to_datetime()
    }
}

impl From<DateTime<Utc>> for FileTime {
    fn from(value: DateTime<Utc>) -> Self {
        Self::from_datetime(value)
    }
}
