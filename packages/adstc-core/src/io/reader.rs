use super::frame::{AmsFrame, MAX_PACKET_LEN};
use crate::ams::{AMS_HEADER_LEN, AmsHeader, AmsTcpHeader, ENVELOPE_LEN};
use tokio::io::{self, AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};

/// A buffered reader that pulls complete AMS frames off an async byte
/// stream.
///
/// Every frame is validated before it is surfaced: the envelope's reserved
/// prefix must be zero, the announced packet must fit an AMS header and stay
/// under [`MAX_PACKET_LEN`], and the header's declared data length must
/// match the envelope. A violation renders the remaining byte stream
/// untrustworthy, so it is reported as `InvalidData` and the connection is
/// expected to be torn down.
pub struct FrameReader<R: AsyncRead> {
    reader: BufReader<R>,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    /// Wraps a stream with default buffering.
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::new(reader),
        }
    }

    /// Wraps a stream with a specific buffer capacity.
    pub fn with_capacity(reader: R, capacity: usize) -> Self {
        Self {
            reader: BufReader::with_capacity(capacity, reader),
        }
    }

    /// Reads one complete frame.
    ///
    /// Returns `UnexpectedEof` when the peer closes the stream cleanly
    /// between frames, and `InvalidData` on any framing violation.
    pub async fn read_frame(&mut self) -> io::Result<AmsFrame> {
        if self.reader.fill_buf().await?.is_empty() {
            return Err(io::Error::from(io::ErrorKind::UnexpectedEof));
        }

        let mut envelope = [0u8; ENVELOPE_LEN];
        self.reader.read_exact(&mut envelope).await?;
        let envelope = AmsTcpHeader::from_bytes(envelope)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

        let packet_len = envelope.length() as usize;
        if packet_len < AMS_HEADER_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("packet of {packet_len} bytes cannot hold an AMS header"),
            ));
        }
        if packet_len > MAX_PACKET_LEN {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("packet of {packet_len} bytes exceeds the {MAX_PACKET_LEN}-byte cap"),
            ));
        }

        let mut packet = vec![0u8; packet_len];
        self.reader.read_exact(&mut packet).await?;

        let (header, data) = AmsHeader::parse_prefix(&packet)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        let data = data.to_vec();

        Ok(AmsFrame::from_parts(header, data))
    }

    /// Consumes the reader, returning the underlying stream. Buffered bytes
    /// are lost.
    pub fn into_inner(self) -> R {
        self.reader.into_inner()
    }
}
