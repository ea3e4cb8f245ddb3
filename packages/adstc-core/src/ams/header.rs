use super::addr::{AMS_ADDR_LEN, AmsAddr};
use super::error::AmsHeaderError;
use crate::ads::{CommandId, ReturnCode, StateFlags};

/// Length of the AMS header (32 bytes).
pub const AMS_HEADER_LEN: usize = 32;

/// The 32-byte AMS header carried by every ADS request, response, and
/// notification.
///
/// Layout: target address (8), source address (8), command id (2), state
/// flags (2), data length (4), error code (4), invoke id (4). All
/// multi-byte fields are little-endian.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AmsHeader {
    target: AmsAddr,
    source: AmsAddr,
    command_id: CommandId,
    state_flags: StateFlags,
    length: u32,
    error_code: ReturnCode,
    invoke_id: u32,
}

impl AmsHeader {
    /// Length of the AMS header in bytes.
    pub const LENGTH: usize = AMS_HEADER_LEN;

    /// Creates a request header for `command_id` announcing `length` data bytes.
    pub fn request(
        target: AmsAddr,
        source: AmsAddr,
        command_id: CommandId,
        length: u32,
        invoke_id: u32,
    ) -> Self {
        Self {
            target,
            source,
            command_id,
            state_flags: StateFlags::request(),
            length,
            error_code: ReturnCode::Ok,
            invoke_id,
        }
    }

    /// Creates a response header, mirroring `request`'s addressing swapped.
    pub fn response(
        target: AmsAddr,
        source: AmsAddr,
        command_id: CommandId,
        length: u32,
        error_code: ReturnCode,
        invoke_id: u32,
    ) -> Self {
        Self {
            target,
            source,
            command_id,
            state_flags: StateFlags::response(),
            length,
            error_code,
            invoke_id,
        }
    }

    /// The AMS address the packet is destined for.
    pub fn target(&self) -> &AmsAddr {
        &self.target
    }

    /// The AMS address the packet was sent from.
    pub fn source(&self) -> &AmsAddr {
        &self.source
    }

    /// The ADS command this packet carries.
    pub fn command_id(&self) -> CommandId {
        self.command_id
    }

    /// Request/response and transport flags.
    pub fn state_flags(&self) -> StateFlags {
        self.state_flags
    }

    /// Byte count of the ADS data following the header.
    pub fn length(&self) -> u32 {
        self.length
    }

    /// AMS-level error code (routing failures and the like).
    pub fn error_code(&self) -> ReturnCode {
        self.error_code
    }

    /// Correlation token matching a response to its request.
    pub fn invoke_id(&self) -> u32 {
        self.invoke_id
    }

    /// Serializes the header.
    pub fn to_bytes(&self) -> [u8; AMS_HEADER_LEN] {
        let mut buf = [0u8; AMS_HEADER_LEN];
        buf[0..8].copy_from_slice(&self.target.to_bytes());
        buf[8..16].copy_from_slice(&self.source.to_bytes());
        buf[16..18].copy_from_slice(&u16::from(self.command_id).to_le_bytes());
        buf[18..20].copy_from_slice(&self.state_flags.to_bytes());
        buf[20..24].copy_from_slice(&self.length.to_le_bytes());
        buf[24..28].copy_from_slice(&u32::from(self.error_code).to_le_bytes());
        buf[28..32].copy_from_slice(&self.invoke_id.to_le_bytes());
        buf
    }

    /// Deserializes a header from a 32-byte array.
    pub fn from_bytes(bytes: [u8; AMS_HEADER_LEN]) -> Self {
        Self {
            target: AmsAddr::from_bytes(bytes[0..AMS_ADDR_LEN].try_into().unwrap()),
            source: AmsAddr::from_bytes(bytes[8..16].try_into().unwrap()),
            command_id: CommandId::from(u16::from_le_bytes(bytes[16..18].try_into().unwrap())),
            state_flags: StateFlags::new(u16::from_le_bytes(bytes[18..20].try_into().unwrap())),
            length: u32::from_le_bytes(bytes[20..24].try_into().unwrap()),
            error_code: ReturnCode::from(u32::from_le_bytes(bytes[24..28].try_into().unwrap())),
            invoke_id: u32::from_le_bytes(bytes[28..32].try_into().unwrap()),
        }
    }

    /// Splits a packet body into header and ADS data, validating that the
    /// header's declared data length matches what the packet carries.
    pub fn parse_prefix(packet: &[u8]) -> Result<(Self, &[u8]), AmsHeaderError> {
        if packet.len() < AMS_HEADER_LEN {
            return Err(AmsHeaderError::BufferTooSmall {
                expected: AMS_HEADER_LEN,
                found: packet.len(),
            });
        }

        let header = Self::from_bytes(packet[..AMS_HEADER_LEN].try_into().unwrap());
        let data = &packet[AMS_HEADER_LEN..];

        if header.length as usize != data.len() {
            return Err(AmsHeaderError::LengthMismatch {
                declared: header.length,
                carried: data.len(),
            });
        }

        Ok((header, data))
    }
}
