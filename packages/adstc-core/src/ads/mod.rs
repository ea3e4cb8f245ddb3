//! ADS protocol primitives: command ids, state flags, return codes, PLC
//! string and time encodings, and notification bookkeeping types.

pub mod command;
pub mod error;
pub mod filetime;
pub mod handle;
pub mod return_code;
pub mod state;
pub mod state_flags;
pub mod strings;
pub mod trans_mode;

pub use command::CommandId;
pub use error::{FileTimeError, StringError};
pub use filetime::FileTime;
pub use handle::NotificationHandle;
pub use return_code::ReturnCode;
pub use state::{AdsState, DeviceState};
pub use state_flags::StateFlags;
pub use trans_mode::TransMode;

/// A 32-bit index group naming a semantic address region on the device.
pub type IndexGroup = u32;
/// A 32-bit byte offset within an index group.
pub type IndexOffset = u32;
/// The 32-bit token correlating a response with its request.
pub type InvokeId = u32;
