use super::frame::AmsFrame;
use super::reader::FrameReader;
use super::writer::FrameWriter;
use socket2::{SockRef, TcpKeepalive};
use std::time::Duration;
use tokio::io;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{self, TcpStream};

/// Keepalive probe period. Small enough to notice a silently dropped peer
/// within minutes.
pub const KEEPALIVE_PERIOD: Duration = Duration::from_secs(30);

/// An AMS/TCP connection.
///
/// Wraps a [`TcpStream`] tuned for ADS traffic and exposes frame-level
/// reads and writes. Multiplexing clients split it into independently owned
/// halves with [`into_split`](Self::into_split).
pub struct AmsStream {
    stream: TcpStream,
}

impl AmsStream {
    /// Connects and applies the TCP tuning ADS traffic needs:
    ///
    /// * Nagle off - request/response latency matters more than throughput.
    /// * Keepalive on with [`KEEPALIVE_PERIOD`] - a powered-off PLC
    ///   otherwise leaves the connection hanging until the OS gives up.
    /// * Linger zero - recycling clients against the same PLC must not
    ///   accumulate sockets in TIME_WAIT.
    pub async fn connect<A: net::ToSocketAddrs>(addr: A) -> io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        stream.set_nodelay(true)?;

        let sock = SockRef::from(&stream);
        sock.set_tcp_keepalive(&TcpKeepalive::new().with_time(KEEPALIVE_PERIOD))?;
        sock.set_linger(Some(Duration::ZERO))?;

        Ok(Self { stream })
    }

    /// Wraps an already-connected stream without touching socket options.
    pub fn from_stream(stream: TcpStream) -> Self {
        Self { stream }
    }

    /// Reads one frame directly from the stream, unbuffered.
    ///
    /// Two exact reads per frame. Loops that consume many frames should
    /// prefer [`into_split`](Self::into_split), whose reader buffers.
    pub async fn read_frame(&mut self) -> io::Result<AmsFrame> {
        use crate::ams::{AMS_HEADER_LEN, AmsHeader, AmsTcpHeader, ENVELOPE_LEN};
        use tokio::io::AsyncReadExt;

        let mut envelope = [0u8; ENVELOPE_LEN];
        self.stream.read_exact(&mut envelope).await?;
        let envelope = AmsTcpHeader::from_bytes(envelope)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;

        let packet_len = envelope.length() as usize;
        if !(AMS_HEADER_LEN..=super::frame::MAX_PACKET_LEN).contains(&packet_len) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!("invalid packet length {packet_len}"),
            ));
        }

        let mut packet = vec![0u8; packet_len];
        self.stream.read_exact(&mut packet).await?;

        let (header, data) = AmsHeader::parse_prefix(&packet)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e.to_string()))?;
        Ok(AmsFrame::from_parts(header, data.to_vec()))
    }

    /// Writes one frame directly to the stream.
    pub async fn write_frame(&mut self, frame: &AmsFrame) -> io::Result<()> {
        use tokio::io::AsyncWriteExt;
        self.stream.write_all(&frame.to_vec()).await
    }

    /// Splits into an owned frame reader and writer for concurrent use.
    pub fn into_split(self) -> (FrameReader<OwnedReadHalf>, FrameWriter<OwnedWriteHalf>) {
        let (read, write) = self.stream.into_split();
        (FrameReader::new(read), FrameWriter::new(write))
    }

    /// The remote peer's socket address.
    pub fn peer_addr(&self) -> io::Result<std::net::SocketAddr> {
        self.stream.peer_addr()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ads::CommandId;
    use crate::ams::{AmsAddr, AmsNetId};
    use tokio::net::TcpListener;

    fn sample_frame(invoke_id: u32) -> AmsFrame {
        AmsFrame::request(
            AmsAddr::new(AmsNetId::new(5, 1, 2, 3, 1, 1), 851),
            AmsAddr::new(AmsNetId::new(10, 0, 0, 1, 1, 1), 32905),
            CommandId::Read,
            invoke_id,
            vec![1, 2, 3],
        )
    }

    #[tokio::test]
    async fn connect_and_exchange() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let mut stream = AmsStream::from_stream(stream);
            let frame = stream.read_frame().await.unwrap();
            stream.write_frame(&frame).await.unwrap();
        });

        let mut client = AmsStream::connect(addr).await.unwrap();
        let frame = sample_frame(5);
        client.write_frame(&frame).await.unwrap();
        assert_eq!(client.read_frame().await.unwrap(), frame);

        server.await.unwrap();
    }

    #[tokio::test]
    async fn split_halves_work_concurrently() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let (mut reader, mut writer) = AmsStream::from_stream(stream).into_split();
            for _ in 0..2 {
                let frame = reader.read_frame().await.unwrap();
                writer.write_frame(&frame).await.unwrap();
            }
        });

        let (mut reader, mut writer) = AmsStream::connect(addr).await.unwrap().into_split();
        writer.write_frame(&sample_frame(1)).await.unwrap();
        writer.write_frame(&sample_frame(2)).await.unwrap();
        assert_eq!(reader.read_frame().await.unwrap().header().invoke_id(), 1);
        assert_eq!(reader.read_frame().await.unwrap().header().invoke_id(), 2);

        server.await.unwrap();
    }
}
