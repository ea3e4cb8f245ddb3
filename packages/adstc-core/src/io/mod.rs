//! Frame I/O: assembling [`AmsFrame`]s and moving them over async byte
//! streams.

pub mod frame;
pub mod reader;
pub mod stream;
pub mod writer;

pub use frame::{AmsFrame, MAX_PACKET_LEN};
pub use reader::FrameReader;
pub use stream::{AmsStream, KEEPALIVE_PERIOD};
pub use writer::FrameWriter;
