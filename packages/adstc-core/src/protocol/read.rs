use super::{Cursor, PayloadError};
use crate::ads::{CommandId, IndexGroup, IndexOffset, ReturnCode};

/// Request body of Read (0x0002): ig(4) + io(4) + len(4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReadRequest {
    pub index_group: IndexGroup,
    pub index_offset: IndexOffset,
    pub length: u32,
}

impl ReadRequest {
    pub const COMMAND: CommandId = CommandId::Read;

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(12);
        buf.extend_from_slice(&self.index_group.to_le_bytes());
        buf.extend_from_slice(&self.index_offset.to_le_bytes());
        buf.extend_from_slice(&self.length.to_le_bytes());
        buf
    }

    pub fn decode(payload: &[u8]) -> Result<Self, PayloadError> {
        let mut cur = Cursor::new("Read request", payload);
        let out = Self {
            index_group: cur.u32()?,
            index_offset: cur.u32()?,
            length: cur.u32()?,
        };
        cur.finish()?;
        Ok(out)
    }
}

/// Response body of Read (0x0002): result(4) + len(4) + data(len).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReadResponse {
    pub result: ReturnCode,
    pub data: Vec<u8>,
}

impl ReadResponse {
    pub const COMMAND: CommandId = CommandId::Read;

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(8 + self.data.len());
        buf.extend_from_slice(&self.result.to_bytes());
        buf.extend_from_slice(&(self.data.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.data);
        buf
    }

    pub fn decode(payload: &[u8]) -> Result<Self, PayloadError> {
        let mut cur = Cursor::new("Read response", payload);
        let result = cur.result_code()?;

        if cur.remaining() == 0 && !result.is_ok() {
            return Ok(Self {
                result,
                data: Vec::new(),
            });
        }

        let length = cur.u32()? as usize;
        let data = cur.bytes(length)?.to_vec();
        cur.finish()?;

        Ok(Self { result, data })
    }
}
