use super::error::NetIdError;
use std::fmt;
use std::str::FromStr;

/// Length of an AMS Net ID on the wire (6 bytes).
pub const NETID_LEN: usize = 6;

/// The 6-octet identifier of an ADS endpoint (e.g. `172.16.17.10.1.1`).
///
/// # Notes
///
/// The AMS Net ID is purely logical and usually has no relation to the IP
/// address of the target. It is configured on the target system itself.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AmsNetId([u8; NETID_LEN]);

impl AmsNetId {
    /// Creates a Net ID from its six octets.
    pub const fn new(a: u8, b: u8, c: u8, d: u8, e: u8, f: u8) -> Self {
        Self([a, b, c, d, e, f])
    }

    /// The all-zero Net ID. Sent as the source when the target assigns one.
    pub const fn zero() -> Self {
        Self([0; NETID_LEN])
    }

    /// Returns `true` if every octet is zero.
    pub fn is_zero(&self) -> bool {
        self.0 == [0; NETID_LEN]
    }

    /// Returns the octets as a slice.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Returns the octets as an array.
    pub fn to_bytes(&self) -> [u8; NETID_LEN] {
        self.0
    }

    /// Builds a Net ID from a 6-byte array.
    pub const fn from_bytes(bytes: [u8; NETID_LEN]) -> Self {
        Self(bytes)
    }

    /// Builds a Net ID from the leading 6 bytes of a slice.
    pub fn try_from_slice(bytes: &[u8]) -> Result<Self, NetIdError> {
        Self::try_from(bytes)
    }
}

impl From<[u8; NETID_LEN]> for AmsNetId {
    fn from(value: [u8; NETID_LEN]) -> Self {
        Self(value)
    }
}

impl From<AmsNetId> for [u8; NETID_LEN] {
    fn from(value: AmsNetId) -> Self {
        value.0
    }
}

impl TryFrom<&[u8]> for AmsNetId {
    type Error = NetIdError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        if bytes.len() < NETID_LEN {
            return Err(NetIdError::BufferTooSmall {
                expected: NETID_LEN,
                found: bytes.len(),
            });
        }

        let mut arr = [0u8; NETID_LEN];
        arr.copy_from_slice(&bytes[..NETID_LEN]);
        Ok(Self(arr))
    }
}

impl FromStr for AmsNetId {
    type Err = NetIdError;

    /// Parses the textual form `a.b.c.d.e.f`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('.').collect();

        if parts.len() != NETID_LEN {
            return Err(NetIdError::WrongOctetCount { found: parts.len() });
        }

        let mut bytes = [0u8; NETID_LEN];
        for (i, part) in parts.iter().enumerate() {
            bytes[i] = part.parse::<u8>().map_err(|_| NetIdError::InvalidOctet {
                position: i,
                value: part.to_string(),
            })?;
        }

        Ok(Self(bytes))
    }
}

impl fmt::Display for AmsNetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}.{}.{}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl fmt::Debug for AmsNetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}
