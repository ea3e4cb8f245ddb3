use super::{Cursor, PayloadError};
use crate::ads::{AdsState, CommandId, DeviceState, ReturnCode};

/// Request body of ReadState (0x0004). Empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ReadStateRequest;

impl ReadStateRequest {
    pub const COMMAND: CommandId = CommandId::ReadState;

    pub fn encode(&self) -> Vec<u8> {
        Vec::new()
    }

    pub fn decode(payload: &[u8]) -> Result<Self, PayloadError> {
        Cursor::new("ReadState request", payload).finish()?;
        Ok(Self)
    }
}

/// Response body of ReadState (0x0004): result(4) + ads_state(2) + dev_state(2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReadStateResponse {
    pub result: ReturnCode,
    pub ads_state: AdsState,
    pub device_state: DeviceState,
}

impl ReadStateResponse {
    pub const COMMAND: CommandId = CommandId::ReadState;

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(8);
        buf.extend_from_slice(&self.result.to_bytes());
        buf.extend_from_slice(&self.ads_state.to_bytes());
        buf.extend_from_slice(&self.device_state.to_le_bytes());
        buf
    }

    pub fn decode(payload: &[u8]) -> Result<Self, PayloadError> {
        let mut cur = Cursor::new("ReadState response", payload);
        let result = cur.result_code()?;

        if cur.remaining() == 0 && !result.is_ok() {
            return Ok(Self {
                result,
                ads_state: AdsState::Invalid,
                device_state: 0,
            });
        }

        let ads_state = AdsState::from(cur.u16()?);
        let device_state = cur.u16()?;
        cur.finish()?;

        Ok(Self {
            result,
            ads_state,
            device_state,
        })
    }
}
