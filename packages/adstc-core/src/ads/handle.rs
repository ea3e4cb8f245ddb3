use std::fmt;

/// A handle identifying an active device notification.
///
/// Assigned by the server in the AddDeviceNotification response and carried
/// by every pushed sample. The value is opaque; equality and hashing are
/// well-defined, so it works directly as a dispatch-map key. A handle is
/// only unique within one connection - reconnecting invalidates it.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NotificationHandle(u32);

impl NotificationHandle {
    /// Length of a notification handle on the wire.
    pub const LENGTH: usize = 4;

    /// Wraps a raw handle value.
    pub const fn new(raw: u32) -> Self {
        Self(raw)
    }

    /// Returns the raw handle value.
    pub const fn as_u32(&self) -> u32 {
        self.0
    }

    /// Serializes as little-endian.
    pub fn to_bytes(&self) -> [u8; Self::LENGTH] {
        self.0.to_le_bytes()
    }

    /// Deserializes from little-endian.
    pub fn from_bytes(bytes: [u8; Self::LENGTH]) -> Self {
        Self(u32::from_le_bytes(bytes))
    }
}

impl From<u32> for NotificationHandle {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl From<NotificationHandle> for u32 {
    fn from(value: NotificationHandle) -> Self {
        value.0
    }
}

impl fmt::Display for NotificationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for NotificationHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "NotificationHandle({})", self.0)
    }
}
