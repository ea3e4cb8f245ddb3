use super::{Cursor, PayloadError};
use crate::ads::{CommandId, IndexGroup, IndexOffset, ReturnCode};

/// Request body of ReadWrite (0x0009):
/// ig(4) + io(4) + read_len(4) + write_len(4) + data(write_len).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReadWriteRequest {
    pub index_group: IndexGroup,
    pub index_offset: IndexOffset,
    /// Byte count the caller wants back.
    pub read_length: u32,
    /// Bytes written to the device before the read.
    pub data: Vec<u8>,
}

impl ReadWriteRequest {
    pub const COMMAND: CommandId = CommandId::ReadWrite;

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(16 + self.data.len());
        buf.extend_from_slice(&self.index_group.to_le_bytes());
        buf.extend_from_slice(&self.index_offset.to_le_bytes());
        buf.extend_from_slice(&self.read_length.to_le_bytes());
        buf.extend_from_slice(&(self.data.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.data);
        buf
    }

    pub fn decode(payload: &[u8]) -> Result<Self, PayloadError> {
        let mut cur = Cursor::new("ReadWrite request", payload);
        let index_group = cur.u32()?;
        let index_offset = cur.u32()?;
        let read_length = cur.u32()?;
        let write_length = cur.u32()? as usize;
        let data = cur.bytes(write_length)?.to_vec();
        cur.finish()?;

        Ok(Self {
            index_group,
            index_offset,
            read_length,
            data,
        })
    }
}

/// Response body of ReadWrite (0x0009): result(4) + len(4) + data(len).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReadWriteResponse {
    pub result: ReturnCode,
    pub data: Vec<u8>,
}

impl ReadWriteResponse {
    pub const COMMAND: CommandId = CommandId::ReadWrite;

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(8 + self.data.len());
        buf.extend_from_slice(&self.result.to_bytes());
        buf.extend_from_slice(&(self.data.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.data);
        buf
    }

    pub fn decode(payload: &[u8]) -> Result<Self, PayloadError> {
        let mut cur = Cursor::new("ReadWrite response", payload);
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_roundtrip() {
        let req = ReadWriteRequest {
            index_group: 0xF003,
            index_offset: 0,
            read_length: 4,
            data: b"MAIN.counter\0".to_vec(),
        };
        let bytes = req.encode();
        assert_eq!(&bytes[8..12], &4u32.to_le_bytes());
        assert_eq!(&bytes[12..16], &13u32.to_le_bytes());
        assert_eq!(ReadWriteRequest::decode(&bytes).unwrap(), req);
    }

    #[test]
    fn response_roundtrip() {
        let resp = ReadWriteResponse {
            result: ReturnCode::Ok,
            data: vec![1, 2, 3],
        };
        assert_eq!(ReadWriteResponse::decode(&resp.encode()).unwrap(), resp);
    }
}
