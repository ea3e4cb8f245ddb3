//! Typed request and response payloads for every ADS command.
//!
//! Each type maps field-for-field onto the Beckhoff wire contract: fixed
//! widths, little-endian, no padding or alignment beyond what the protocol
//! prescribes. `encode` produces exactly the ADS data that follows the AMS
//! header; `decode` is its inverse and never panics on truncated input.
//!
//! Responses all begin with a 4-byte result code. A non-zero result still
//! decodes whatever fields the device sent, because several commands embed
//! useful data alongside an error; a device that truncates an error
//! response down to the bare result code is tolerated, with the remaining
//! fields taking their zero values.

pub mod add_notification;
pub mod delete_notification;
pub mod device_info;
pub mod error;
pub mod index_group;
pub mod notification;
pub mod read;
pub mod read_state;
pub mod read_write;
pub mod write;
pub mod write_control;

pub use add_notification::{AddNotificationRequest, AddNotificationResponse};
pub use delete_notification::{DeleteNotificationRequest, DeleteNotificationResponse};
pub use device_info::{DeviceInfoRequest, DeviceInfoResponse};
pub use error::PayloadError;
pub use index_group::index_groups;
pub use notification::{Notification, Sample, Stamp};
pub use read::{ReadRequest, ReadResponse};
pub use read_state::{ReadStateRequest, ReadStateResponse};
pub use read_write::{ReadWriteRequest, ReadWriteResponse};
pub use write::{WriteRequest, WriteResponse};
pub use write_control::{WriteControlRequest, WriteControlResponse};

use crate::ads::ReturnCode;
use error::PayloadError as PE;

/// A little cursor over a payload slice. Every read names the command so
/// truncation errors point at the offending layout.
pub(crate) struct Cursor<'a> {
    buf: &'a [u8],
    pos: usize,
    command: &'static str,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(command: &'static str, buf: &'a [u8]) -> Self {
        Self { buf, pos: 0, command }
    }

    pub(crate) fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }

    pub(crate) fn bytes(&mut self, n: usize) -> Result<&'a [u8], PE> {
        if self.remaining() < n {
            return Err(PE::Truncated {
                command: self.command,
                offset: self.pos,
                needed: n - self.remaining(),
            });
        }
        let out = &self.buf[self.pos..self.pos + n];
        self.pos += n;
        Ok(out)
    }

    pub(crate) fn u8(&mut self) -> Result<u8, PE> {
        Ok(self.bytes(1)?[0])
    }

    pub(crate) fn u16(&mut self) -> Result<u16, PE> {
        Ok(u16::from_le_bytes(self.bytes(2)?.try_into().unwrap()))
    }

    pub(crate) fn u32(&mut self) -> Result<u32, PE> {
        Ok(u32::from_le_bytes(self.bytes(4)?.try_into().unwrap()))
    }

    pub(crate) fn u64(&mut self) -> Result<u64, PE> {
        Ok(u64::from_le_bytes(self.bytes(8)?.try_into().unwrap()))
    }

    pub(crate) fn result_code(&mut self) -> Result<ReturnCode, PE> {
        Ok(ReturnCode::from(self.u32()?))
    }

    /// Decoding is done; anything left over is a layout violation.
    pub(crate) fn finish(self) -> Result<(), PE> {
        if self.remaining() != 0 {
            return Err(PE::TrailingBytes {
                command: self.command,
                extra: self.remaining(),
            });
        }
        Ok(())
    }
}
