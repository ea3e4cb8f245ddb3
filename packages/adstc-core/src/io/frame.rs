use crate::ads::{CommandId, ReturnCode};
use crate::ams::{AMS_HEADER_LEN, AmsAddr, AmsHeader, AmsTcpHeader, ENVELOPE_LEN};

/// Upper bound on the packet a peer may announce (AMS header + data).
///
/// Symbol-table uploads legitimately run to megabytes on large projects;
/// anything past this is treated as a framing fault rather than an
/// allocation request.
pub const MAX_PACKET_LEN: usize = 16 * 1024 * 1024;

/// One complete AMS packet: the 32-byte header plus its ADS data.
///
/// The 6-byte TCP envelope is not stored; writers regenerate it from the
/// packet size and readers validate and discard it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AmsFrame {
    header: AmsHeader,
    data: Vec<u8>,
}

impl AmsFrame {
    /// Builds a request frame, deriving the header's length field from `data`.
    pub fn request(
        target: AmsAddr,
        source: AmsAddr,
        command: CommandId,
        invoke_id: u32,
        data: Vec<u8>,
    ) -> Self {
        let header = AmsHeader::request(target, source, command, data.len() as u32, invoke_id);
        Self { header, data }
    }

    /// Builds a response frame, deriving the header's length field from `data`.
    pub fn response(
        target: AmsAddr,
        source: AmsAddr,
        command: CommandId,
        invoke_id: u32,
        error_code: ReturnCode,
        data: Vec<u8>,
    ) -> Self {
        let header = AmsHeader::response(
            target,
            source,
            command,
            data.len() as u32,
            error_code,
            invoke_id,
        );
        Self { header, data }
    }

    /// Assembles a frame from parts already validated against each other.
    ///
    /// Intended for readers that have checked `header.length()` against the
    /// data they pulled off the stream; no re-validation happens here.
    pub fn from_parts(header: AmsHeader, data: Vec<u8>) -> Self {
        Self { header, data }
    }

    /// The AMS header.
    pub fn header(&self) -> &AmsHeader {
        &self.header
    }

    /// The ADS data following the header.
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Splits the frame into header and data.
    pub fn into_parts(self) -> (AmsHeader, Vec<u8>) {
        (self.header, self.data)
    }

    /// Total on-wire size including the envelope.
    pub fn wire_size(&self) -> usize {
        ENVELOPE_LEN + AMS_HEADER_LEN + self.data.len()
    }

    /// Serializes envelope + header + data into one buffer.
    pub fn to_vec(&self) -> Vec<u8> {
        let packet_len = (AMS_HEADER_LEN + self.data.len()) as u32;
        let mut buf = Vec::with_capacity(self.wire_size());
        buf.extend_from_slice(&AmsTcpHeader::new(packet_len).to_bytes());
        buf.extend_from_slice(&self.header.to_bytes());
        buf.extend_from_slice(&self.data);
        buf
    }
}
