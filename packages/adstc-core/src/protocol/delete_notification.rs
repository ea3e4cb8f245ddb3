use super::{Cursor, PayloadError};
use crate::ads::{CommandId, NotificationHandle, ReturnCode};

/// Request body of DeleteDeviceNotification (0x0007): handle(4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeleteNotificationRequest {
    pub handle: NotificationHandle,
}

impl DeleteNotificationRequest {
    pub const COMMAND: CommandId = CommandId::DeleteDeviceNotification;

    pub fn encode(&self) -> Vec<u8> {
        self.handle.to_bytes().to_vec()
    }

    pub fn decode(payload: &[u8]) -> Result<Self, PayloadError> {
        let mut cur = Cursor::new("DeleteDeviceNotification request", payload);
        let handle = NotificationHandle::new(cur.u32()?);
        cur.finish()?;
        Ok(Self { handle })
    }
}

/// Response body of DeleteDeviceNotification (0x0007): result(4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DeleteNotificationResponse {
    pub result: ReturnCode,
}

impl DeleteNotificationResponse {
    pub const COMMAND: CommandId = CommandId::DeleteDeviceNotification;

    pub fn encode(&self) -> Vec<u8> {
        self.result.to_bytes().to_vec()
    }

    pub fn decode(payload: &[u8]) -> Result<Self, PayloadError> {
        let mut cur = Cursor::new("DeleteDeviceNotification response", payload);
        let result = cur.result_code()?;
        cur.finish()?;
        Ok(Self { result })
    }
}
