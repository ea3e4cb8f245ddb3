/// The device-specific status word. Always `0` on a TwinCAT PLC; custom ADS
/// servers are free to put their own flags in it.
pub type DeviceState = u16;

/// The operating state of an ADS device.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum AdsState {
    Invalid,
    Idle,
    Reset,
    Init,
    Start,
    Run,
    Stop,
    SaveConfig,
    LoadConfig,
    PowerFailure,
    PowerGood,
    Error,
    Shutdown,
    Suspend,
    Resume,
    /// The PLC is in Config mode; ADS endpoints answer `TargetPortNotFound`.
    Config,
    Reconfig,
    Stopping,
    /// A state not defined by this library.
    Unknown(u16),
}

impl AdsState {
    /// Length of the ADS state on the wire.
    pub const LENGTH: usize = 2;

    /// Serializes as little-endian.
    pub fn to_bytes(&self) -> [u8; Self::LENGTH] {
        u16::from(*self).to_le_bytes()
    }

    /// Deserializes from little-endian.
    pub fn from_bytes(bytes: [u8; Self::LENGTH]) -> Self {
        Self::from(u16::from_le_bytes(bytes))
    }
}

impl From<u16> for AdsState {
    fn from(value: u16) -> Self {
        match value {
            0 => Self::Invalid,
            1 => Self::Idle,
            2 => Self::Reset,
            3 => Self::Init,
            4 => Self::Start,
            5 => Self::Run,
            6 => Self::Stop,
            7 => Self::SaveConfig,
            8 => Self::LoadConfig,
            9 => Self::PowerFailure,
            10 => Self::PowerGood,
            11 => Self::Error,
            12 => Self::Shutdown,
            13 => Self::Suspend,
            14 => Self::Resume,
            15 => Self::Config,
            16 => Self::Reconfig,
            17 => Self::Stopping,
            n => Self::Unknown(n),
        }
    }
}

impl From<AdsState> for u16 {
    fn from(value: AdsState) -> Self {
        match value {
            AdsState::Invalid => 0,
            AdsState::Idle => 1,
            AdsState::Reset => 2,
            AdsState::Init => 3,
            AdsState::Start => 4,
            AdsState::Run => 5,
            AdsState::Stop => 6,
            AdsState::SaveConfig => 7,
            AdsState::LoadConfig => 8,
            AdsState::PowerFailure => 9,
            AdsState::PowerGood => 10,
            AdsState::Error => 11,
            AdsState::Shutdown => 12,
            AdsState::Suspend => 13,
            AdsState::Resume => 14,
            AdsState::Config => 15,
            AdsState::Reconfig => 16,
            AdsState::Stopping => 17,
            AdsState::Unknown(n) => n,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conversion_roundtrip() {
        for raw in 0u16..=17 {
            assert_eq!(u16::from(AdsState::from(raw)), raw);
        }
        assert_eq!(AdsState::from(99), AdsState::Unknown(99));
    }

    #[test]
    fn run_state_bytes() {
        assert_eq!(AdsState::Run.to_bytes(), [5, 0]);
        assert_eq!(AdsState::from_bytes([15, 0]), AdsState::Config);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_roundtrip() {
        let json = serde_json::to_string(&AdsState::Run).unwrap();
        assert_eq!(serde_json::from_str::<AdsState>(&json).unwrap(), AdsState::Run);
    }
}
