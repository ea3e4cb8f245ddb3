use super::{Cursor, PayloadError};
use crate::ads::{CommandId, FileTime, NotificationHandle};

/// One pushed sample: the subscription it belongs to plus its bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Sample {
    pub handle: NotificationHandle,
    pub data: Vec<u8>,
}

/// A group of samples sharing one server-side timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Stamp {
    pub timestamp: FileTime,
    pub samples: Vec<Sample>,
}

/// Body of a DeviceNotification frame (0x0008), pushed by the server and
/// never answered.
///
/// Layout: total_len(4) + stamp_count(4), then per stamp
/// timestamp(8, FILETIME) + sample_count(4), then per sample
/// handle(4) + size(4) + bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Notification {
    pub stamps: Vec<Stamp>,
}

impl Notification {
    pub const COMMAND: CommandId = CommandId::DeviceNotification;

    /// Flattens to `(timestamp, handle, data)` triples in wire order.
    pub fn iter_samples(&self) -> impl Iterator<Item = (FileTime, &Sample)> {
        self.stamps
            .iter()
            .flat_map(|stamp| stamp.samples.iter().map(move |s| (stamp.timestamp, s)))
    }

    pub fn encode(&self) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(&(self.stamps.len() as u32).to_le_bytes());
        for stamp in &self.stamps {
            body.extend_from_slice(&stamp.timestamp.to_bytes());
            body.extend_from_slice(&(stamp.samples.len() as u32).to_le_bytes());
            for sample in &stamp.samples {
                body.extend_from_slice(&sample.handle.to_bytes());
                body.extend_from_slice(&(sample.data.len() as u32).to_le_bytes());
                body.extend_from_slice(&sample.data);
            }
        }

        // The leading length covers the stamp count and everything after it.
        let mut buf = Vec::with_capacity(4 + body.len());
        buf.extend_from_slice(&(body.len() as u32).to_le_bytes());
        buf.extend_from_slice(&body);
        buf
    }

    pub fn decode(payload: &[u8]) -> Result<Self, PayloadError> {
        let mut cur = Cursor::new("DeviceNotification", payload);
        let declared = cur.u32()? as usize;
        if declared != cur.remaining() {
            return Err(PayloadError::LengthMismatch {
                command: "DeviceNotification",
                declared,
                carried: cur.remaining(),
            });
        }

        let stamp_count = cur.u32()? as usize;
        let mut stamps = Vec::with_capacity(stamp_count.min(64));
        for _ in 0..stamp_count {
            let timestamp = FileTime::from_raw(cur.u64()?);
            let sample_count = cur.u32()? as usize;

            let mut samples = Vec::with_capacity(sample_count.min(256));
            for _ in 0..sample_count {
                let handle = NotificationHandle::new(cur.u32()?);
                let size = cur.u32()? as usize;
                let data = cur.bytes(size)?.to_vec();
                samples.push(Sample { handle, data });
            }
            stamps.push(Stamp { timestamp, samples });
        }
        cur.finish()?;

        Ok(Self { stamps })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_sample_frame() -> Notification {
        Notification {
            stamps: vec![Stamp {
                timestamp: FileTime::from_raw(FileTime::UNIX_EPOCH_TICKS + 1_000),
                samples: vec![
                    Sample {
                        handle: NotificationHandle::new(5),
                        data: vec![0x01, 0x00],
                    },
                    Sample {
                        handle: NotificationHandle::new(9),
                        data: vec![0x02, 0x00, 0x03, 0x00],
                    },
                ],
            }],
        }
    }

    #[test]
    fn roundtrip() {
        let notif = two_sample_frame();
        let decoded = Notification::decode(&notif.encode()).unwrap();
        assert_eq!(decoded, notif);
    }

    #[test]
    fn sample_iteration_preserves_wire_order() {
        let notif = two_sample_frame();
        let flat: Vec<u32> = notif
            .iter_samples()
            .map(|(_, s)| s.handle.as_u32())
            .collect();
        assert_eq!(flat, [5, 9]);
    }

    #[test]
    fn outer_length_mismatch_is_rejected() {
        let mut bytes = two_sample_frame().encode();
        bytes[0] ^= 0x01;
        assert!(matches!(
            Notification::decode(&bytes).unwrap_err(),
            PayloadError::LengthMismatch { .. }
        ));
    }

    #[test]
    fn truncated_sample_data_is_rejected() {
        let mut bytes = two_sample_frame().encode();
        let truncated_len = bytes.len() - 2;
        bytes.truncate(truncated_len);
        // Patch the outer length so only the sample truncation is at fault.
        let inner = (truncated_len - 4) as u32;
        bytes[..4].copy_from_slice(&inner.to_le_bytes());
        assert!(matches!(
            Notification::decode(&bytes).unwrap_err(),
            PayloadError::Truncated { .. }
        ));
    }

    #[test]
    fn empty_notification() {
        let notif = Notification { stamps: Vec::new() };
        assert_eq!(Notification::decode(&notif.encode()).unwrap(), notif);
    }
}
