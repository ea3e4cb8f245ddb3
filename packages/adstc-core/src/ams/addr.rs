use super::error::AddrError;
use super::net_id::{AmsNetId, NETID_LEN};
use std::fmt;
use std::str::FromStr;

/// An AMS port number.
pub type AmsPort = u16;

/// Length of an AMS address on the wire (6-byte Net ID + 2-byte port).
pub const AMS_ADDR_LEN: usize = 8;

/// A full AMS endpoint address: Net ID plus port.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AmsAddr {
    net_id: AmsNetId,
    port: AmsPort,
}

impl AmsAddr {
    /// Creates a new AMS address.
    pub const fn new(net_id: AmsNetId, port: AmsPort) -> Self {
        Self { net_id, port }
    }

    /// Returns the Net ID.
    pub fn net_id(&self) -> AmsNetId {
        self.net_id
    }

    /// Returns the port.
    pub fn port(&self) -> AmsPort {
        self.port
    }

    /// Serializes to the 8-byte wire form (Net ID, then little-endian port).
    pub fn to_bytes(&self) -> [u8; AMS_ADDR_LEN] {
        let mut buf = [0u8; AMS_ADDR_LEN];
        buf[..NETID_LEN].copy_from_slice(self.net_id.as_bytes());
        buf[NETID_LEN..].copy_from_slice(&self.port.to_le_bytes());
        buf
    }

    /// Deserializes from the 8-byte wire form.
    pub fn from_bytes(bytes: [u8; AMS_ADDR_LEN]) -> Self {
        Self {
            net_id: AmsNetId::from_bytes(bytes[..NETID_LEN].try_into().unwrap()),
            port: u16::from_le_bytes(bytes[NETID_LEN..].try_into().unwrap()),
        }
    }

    /// Deserializes from the leading 8 bytes of a slice.
    pub fn try_from_slice(bytes: &[u8]) -> Result<Self, AddrError> {
        if bytes.len() < AMS_ADDR_LEN {
            return Err(AddrError::BufferTooSmall {
                expected: AMS_ADDR_LEN,
                found: bytes.len(),
            });
        }
        Ok(Self::from_bytes(bytes[..AMS_ADDR_LEN].try_into().unwrap()))
    }
}

impl From<(AmsNetId, AmsPort)> for AmsAddr {
    fn from((net_id, port): (AmsNetId, AmsPort)) -> Self {
        Self::new(net_id, port)
    }
}

impl FromStr for AmsAddr {
    type Err = AddrError;

    /// Parses the textual form `a.b.c.d.e.f:port`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (net_id, port) = s.split_once(':').ok_or_else(|| AddrError::InvalidFormat {
            input: s.to_string(),
        })?;

        let net_id: AmsNetId = net_id.parse()?;
        let port: AmsPort = port.parse().map_err(|_| AddrError::InvalidFormat {
            input: s.to_string(),
        })?;

        Ok(Self::new(net_id, port))
    }
}

impl fmt::Display for AmsAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.net_id, self.port)
    }
}
