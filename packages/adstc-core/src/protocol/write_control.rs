use super::{Cursor, PayloadError};
use crate::ads::{AdsState, CommandId, DeviceState, ReturnCode};

/// Request body of WriteControl (0x0005):
/// ads_state(2) + dev_state(2) + len(4) + data(len).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WriteControlRequest {
    pub ads_state: AdsState,
    pub device_state: DeviceState,
    pub data: Vec<u8>,
}

impl WriteControlRequest {
    pub const COMMAND: CommandId = CommandId::WriteControl;

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(8 + self.data.len());
        buf.extend_from_slice(&self.ads_state.to_bytes());
        buf.extend_from_slice(&self.device_state.to_le_bytes());
        buf.extend_from_slice(&(self.data.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.data);
        buf
    }

    pub fn decode(payload: &[u8]) -> Result<Self, PayloadError> {
        let mut cur = Cursor::new("WriteControl request", payload);
        let ads_state = AdsState::from(cur.u16()?);
        let device_state = cur.u16()?;
        let length = cur.u32()? as usize;
        let data = cur.bytes(length)?.to_vec();
        cur.finish()?;

        Ok(Self {
            ads_state,
            device_state,
            data,
        })
    }
}

/// Response body of WriteControl (0x0005): result(4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WriteControlResponse {
    pub result: ReturnCode,
}

impl WriteControlResponse {
    pub const COMMAND: CommandId = CommandId::WriteControl;

    pub fn encode(&self) -> Vec<u8> {
        self.result.to_bytes().to_vec()
    }

    pub fn decode(payload: &[u8]) -> Result<Self, PayloadError> {
        let mut cur = Cursor::new("WriteControl response", payload);
        let result = cur.result_code()?;
        cur.finish()?;
        Ok(Self { result })
    }
}
