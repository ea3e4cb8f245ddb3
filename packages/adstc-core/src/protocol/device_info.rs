use super::{Cursor, PayloadError};
use crate::ads::{CommandId, ReturnCode, strings};

/// Request body of ReadDeviceInfo (0x0001). Empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct DeviceInfoRequest;

impl DeviceInfoRequest {
    pub const COMMAND: CommandId = CommandId::ReadDeviceInfo;

    pub fn encode(&self) -> Vec<u8> {
        Vec::new()
    }

    pub fn decode(payload: &[u8]) -> Result<Self, PayloadError> {
        Cursor::new("ReadDeviceInfo request", payload).finish()?;
        Ok(Self)
    }
}

/// Response body of ReadDeviceInfo (0x0001).
///
/// Layout: result(4) + major(1) + minor(1) + build(2) + name(16, NUL-padded).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceInfoResponse {
    pub result: ReturnCode,
    pub major: u8,
    pub minor: u8,
    pub build: u16,
    pub name: String,
}

impl DeviceInfoResponse {
    pub const COMMAND: CommandId = CommandId::ReadDeviceInfo;

    /// Size of the fixed device-name buffer.
    pub const NAME_LEN: usize = 16;

    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(8 + Self::NAME_LEN);
        buf.extend_from_slice(&self.result.to_bytes());
        buf.push(self.major);
        buf.push(self.minor);
        buf.extend_from_slice(&self.build.to_le_bytes());

        let mut name = [0u8; Self::NAME_LEN];
        let encoded = strings::encode_string(&self.name, Self::NAME_LEN)
            .unwrap_or_else(|_| vec![0; Self::NAME_LEN]);
        name.copy_from_slice(&encoded);
        buf.extend_from_slice(&name);
        buf
    }

    pub fn decode(payload: &[u8]) -> Result<Self, PayloadError> {
        let mut cur = Cursor::new("ReadDeviceInfo response", payload);
        let result = cur.result_code()?;

        if cur.remaining() == 0 && !result.is_ok() {
            return Ok(Self {
                result,
                major: 0,
                minor: 0,
                build: 0,
                name: String::new(),
            });
        }

        let major = cur.u8()?;
        let minor = cur.u8()?;
        let build = cur.u16()?;
        let name = strings::decode_string(cur.bytes(Self::NAME_LEN)?);
        cur.finish()?;

        Ok(Self {
            result,
            major,
            minor,
            build,
            name,
        })
    }
}
