use super::frame::AmsFrame;
use crate::ams::{AMS_HEADER_LEN, AmsTcpHeader};
use std::io::IoSlice;
use tokio::io::{self, AsyncWrite, AsyncWriteExt, BufWriter};

/// Writes AMS frames to an async byte stream.
///
/// Envelope, header, and data go out through one vectored write per frame,
/// followed by a flush so a request is never stuck in the buffer while the
/// caller waits on its response.
pub struct FrameWriter<W: AsyncWrite + Unpin> {
    writer: BufWriter<W>,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    /// Wraps a stream with default buffering.
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::new(writer),
        }
    }

    /// Writes one frame and flushes.
    pub async fn write_frame(&mut self, frame: &AmsFrame) -> io::Result<()> {
        let envelope = AmsTcpHeader::new((AMS_HEADER_LEN + frame.data().len()) as u32).to_bytes();
        let header = frame.header().to_bytes();

        let mut bufs = [
            IoSlice::new(&envelope),
            IoSlice::new(&header),
            IoSlice::new(frame.data()),
        ];
        write_all_vectored(&mut self.writer, &mut bufs).await?;
        self.writer.flush().await
    }

    /// Consumes the writer, returning the underlying stream.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }
}

/// Drives `write_vectored` until every byte of every slice is written.
///
/// `AsyncWriteExt::write_vectored` may make partial progress; this loops,
/// advancing the slices, until the frame is fully out or an error occurs.
async fn write_all_vectored<W: AsyncWrite + Unpin>(
    writer: &mut W,
    mut bufs: &mut [IoSlice<'_>],
) -> io::Result<()> {
    IoSlice::advance_slices(&mut bufs, 0);

    while !bufs.is_empty() {
        match writer.write_vectored(bufs).await? {
            0 => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "failed to write whole frame",
                ));
            }
            n => IoSlice::advance_slices(&mut bufs, n),
        }
    }
    Ok(())
}
