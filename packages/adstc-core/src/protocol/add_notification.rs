use super::{Cursor, PayloadError};
use crate::ads::{CommandId, IndexGroup, IndexOffset, NotificationHandle, ReturnCode, TransMode};

/// Request body of AddDeviceNotification (0x0006):
/// ig(4) + io(4) + len(4) + mode(4) + max_delay_ms(4) + cycle_ms(4) + reserved(16).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddNotificationRequest {
    pub index_group: IndexGroup,
    pub index_offset: IndexOffset,
    /// Byte count the server sends per sample.
    pub length: u32,
    pub trans_mode: TransMode,
    /// Longest time in milliseconds the server may buffer a sample.
    pub max_delay_ms: u32,
    /// How often in milliseconds the server inspects the variable.
    pub cycle_time_ms: u32,
}

impl AddNotificationRequest {
    pub const COMMAND: CommandId = CommandId::AddDeviceNotification;

    /// Size of the trailing reserved block, always zero on the wire.
    pub const RESERVED_LEN: usize = 16;

    /// Total encoded size.
    pub const SIZE: usize = 24 + Self::RESERVED_LEN;

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::SIZE);
        buf.extend_from_slice(&self.index_group.to_le_bytes());
        buf.extend_from_slice(&self.index_offset.to_le_bytes());
        buf.extend_from_slice(&self.length.to_le_bytes());
        buf.extend_from_slice(&self.trans_mode.to_bytes());
        buf.extend_from_slice(&self.max_delay_ms.to_le_bytes());
        buf.extend_from_slice(&self.cycle_time_ms.to_le_bytes());
        buf.extend_from_slice(&[0u8; Self::RESERVED_LEN]);
        buf
    }

    pub fn decode(payload: &[u8]) -> Result<Self, PayloadError> {
        let mut cur = Cursor::new("AddDeviceNotification request", payload);
        let out = Self {
            index_group: cur.u32()?,
            index_offset: cur.u32()?,
            length: cur.u32()?,
            trans_mode: TransMode::from(cur.u32()?),
            max_delay_ms: cur.u32()?,
            cycle_time_ms: cur.u32()?,
        };
        cur.bytes(Self::RESERVED_LEN)?;
        cur.finish()?;
        Ok(out)
    }
}

/// Response body of AddDeviceNotification (0x0006): result(4) + handle(4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AddNotificationResponse {
    pub result: ReturnCode,
    pub handle: NotificationHandle,
}

impl AddNotificationResponse {
    pub const COMMAND: CommandId = CommandId::AddDeviceNotification;

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(8);
        buf.extend_from_slice(&self.result.to_bytes());
        buf.extend_from_slice(&self.handle.to_bytes());
        buf
    }

    pub fn decode(payload: &[u8]) -> Result<Self, PayloadError> {
        let mut cur = Cursor::new("AddDeviceNotification response", payload);
        let result = cur.result_code()?;

        if cur.remaining() == 0 && !result.is_ok() {
            return Ok(Self {
                result,
                handle: NotificationHandle::new(0),
            });
        }

        let handle = NotificationHandle::new(cur.u32()?);
        cur.finish()?;
        Ok(Self { result, handle })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_roundtrip_and_size() {
        let req = AddNotificationRequest {
            index_group: 0x4020,
            index_offset: 16,
            length: 2,
            trans_mode: TransMode::ServerOnChange,
            max_delay_ms: 0,
            cycle_time_ms: 100,
        };
        let bytes = req.encode();
        assert_eq!(bytes.len(), AddNotificationRequest::SIZE);
        assert!(bytes[24..].iter().all(|&b| b == 0));
        assert_eq!(AddNotificationRequest::decode(&bytes).unwrap(), req);
    }

    #[test]
    fn response_roundtrip() {
        let resp = AddNotificationResponse {
            result: ReturnCode::Ok,
            handle: NotificationHandle::new(7),
        };
        assert_eq!(
            AddNotificationResponse::decode(&resp.encode()).unwrap(),
            resp
        );
    }

    #[test]
    fn missing_reserved_block_is_rejected() {
        let req = AddNotificationRequest {
            index_group: 1,
            index_offset: 2,
            length: 4,
            trans_mode: TransMode::ServerCycle,
            max_delay_ms: 0,
            cycle_time_ms: 10,
        };
        let bytes = &req.encode()[..24];
        assert!(matches!(
            AddNotificationRequest::decode(bytes).unwrap_err(),
            PayloadError::Truncated { .. }
        ));
    }
}
