use std::fmt;

/// The 16-bit AMS state-flag field.
///
/// Carries the request/response direction and transport markers. TCP clients
/// only ever set `ADS_COMMAND`, and servers answer with
/// `ADS_COMMAND | RESPONSE`; the remaining bits exist for UDP and router
/// traffic and are preserved verbatim when parsed.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct StateFlags(u16);

impl StateFlags {
    /// Length of the state-flag field on the wire.
    pub const LENGTH: usize = 2;

    /// Bit 0: set on responses, clear on requests.
    pub const RESPONSE: u16 = 0x0001;
    /// Bit 1: the receiver must not answer this command.
    pub const NO_RETURN: u16 = 0x0002;
    /// Bit 2: the frame carries an ADS command rather than router traffic.
    pub const ADS_COMMAND: u16 = 0x0004;
    /// Bit 6: transport is UDP.
    pub const UDP: u16 = 0x0040;

    /// Wraps a raw flag word.
    pub const fn new(raw: u16) -> Self {
        Self(raw)
    }

    /// Flags for an ADS request over TCP.
    pub const fn request() -> Self {
        Self(Self::ADS_COMMAND)
    }

    /// Flags for an ADS response over TCP.
    pub const fn response() -> Self {
        Self(Self::ADS_COMMAND | Self::RESPONSE)
    }

    /// Returns the raw flag word.
    pub const fn raw(&self) -> u16 {
        self.0
    }

    /// True if the response bit is clear.
    pub const fn is_request(&self) -> bool {
        self.0 & Self::RESPONSE == 0
    }

    /// True if the response bit is set.
    pub const fn is_response(&self) -> bool {
        self.0 & Self::RESPONSE != 0
    }

    /// True if the ADS-command bit is set.
    pub const fn is_ads_command(&self) -> bool {
        self.0 & Self::ADS_COMMAND != 0
    }

    /// Serializes as little-endian.
    pub fn to_bytes(&self) -> [u8; Self::LENGTH] {
        self.0.to_le_bytes()
    }

    /// Deserializes from little-endian.
    pub fn from_bytes(bytes: [u8; Self::LENGTH]) -> Self {
        Self(u16::from_le_bytes(bytes))
    }
}

impl From<u16> for StateFlags {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

impl From<StateFlags> for u16 {
    fn from(value: StateFlags) -> Self {
        value.0
    }
}

impl fmt::Debug for StateFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "StateFlags({:#06x}, {})",
            self.0,
            if self.is_response() { "response" } else { "request" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_and_response_bits() {
        assert!(StateFlags::request().is_request());
        assert!(StateFlags::request().is_ads_command());
        assert!(StateFlags::response().is_response());
        assert_eq!(StateFlags::request().to_bytes(), [0x04, 0x00]);
        assert_eq!(StateFlags::response().to_bytes(), [0x05, 0x00]);
    }

    #[test]
    fn raw_roundtrip() {
        let flags = StateFlags::new(0x0045);
        assert_eq!(StateFlags::from_bytes(flags.to_bytes()), flags);
    }
}
