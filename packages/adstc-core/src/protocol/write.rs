use super::{Cursor, PayloadError};
use crate::ads::{CommandId, IndexGroup, IndexOffset, ReturnCode};

/// Request body of Write (0x0003): ig(4) + io(4) + len(4) + data(len).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WriteRequest {
    pub index_group: IndexGroup,
    pub index_offset: IndexOffset,
    pub data: Vec<u8>,
}

impl WriteRequest {
    pub const COMMAND: CommandId = CommandId::Write;

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(12 + self.data.len());
        buf.extend_from_slice(&self.index_group.to_le_bytes());
        buf.extend_from_slice(&self.index_offset.to_le_bytes());
        buf.extend_from_slice(&(self.data.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.data);
        buf
    }

    pub fn decode(payload: &[u8]) -> Result<Self, PayloadError> {
        let mut cur = Cursor::new("Write request", payload);
        let index_group = cur.u32()?;
        let index_offset = cur.u32()?;
        let length = cur.u32()? as usize;
        let data = cur.bytes(length)?.to_vec();
        cur.finish()?;

        Ok(Self {
            index_group,
            index_offset,
            data,
        })
    }
}

/// Response body of Write (0x0003): result(4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WriteResponse {
    pub result: ReturnCode,
}

impl WriteResponse {
    pub const COMMAND: CommandId = CommandId::Write;

    pub fn encode(&self) -> Vec<u8> {
        self.result.to_bytes().to_vec()
    }

    pub fn decode(payload: &[u8]) -> Result<Self, PayloadError> {
        let mut cur = Cursor::new("Write response", payload);
        let result = cur.result_code()?;
        cur.finish()?;
        Ok(Self { result })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_roundtrip() {
        let req = WriteRequest {
            index_group: 0xF020,
            index_offset: 8,
            data: vec![0xDE, 0xAD],
        };
        assert_eq!(WriteRequest::decode(&req.encode()).unwrap(), req);
    }

    #[test]
    fn empty_write_is_legal() {
        let req = WriteRequest {
            index_group: 0x4020,
            index_offset: 0,
            data: Vec::new(),
        };
        let bytes = req.encode();
        assert_eq!(bytes.len(), 12);
        assert_eq!(WriteRequest::decode(&bytes).unwrap(), req);
    }

    #[test]
    fn response_roundtrip() {
        let resp = WriteResponse {
            result: ReturnCode::AccessDenied,
        };
        assert_eq!(WriteResponse::decode(&resp.encode()).unwrap(), resp);
    }
}
