//! Wire-format primitives and frame I/O for Beckhoff's ADS/AMS protocol.
//!
//! Everything in this crate is connection-free: addressing types, the exact
//! little-endian layouts of the AMS/TCP envelope, the 32-byte AMS header
//! and every ADS command payload, and async readers/writers that move
//! whole frames over a byte stream. Connection management, request
//! correlation, and symbol resolution live in `adstc-client`.

/// ADS protocol primitives - command ids, return codes, state flags, PLC
/// string and time encodings.
pub mod ads;

/// AMS addressing and header layouts - [`AmsNetId`], [`AmsAddr`], the TCP
/// envelope, and the AMS header.
pub mod ams;

/// Frame I/O - [`AmsFrame`] and the async stream types that read and write
/// frames over TCP.
pub mod io;

/// Typed request and response payloads for every ADS command.
pub mod protocol;

pub use ads::{
    AdsState, CommandId, DeviceState, FileTime, IndexGroup, IndexOffset, InvokeId,
    NotificationHandle, ReturnCode, StateFlags, TransMode,
};
pub use ams::{AmsAddr, AmsHeader, AmsNetId, AmsPort, AmsTcpHeader};
pub use io::{AmsFrame, AmsStream, FrameReader, FrameWriter};
