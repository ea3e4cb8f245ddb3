use crate::error::ClientError;
use adstc_core::ams::{AmsNetId, AmsPort};
use std::time::Duration;

/// TCP port the AMS/TCP carrier listens on.
pub const AMS_TCP_PORT: u16 = 48898;

/// AMS port of the first PLC runtime.
pub const DEFAULT_TARGET_PORT: AmsPort = 851;

/// AMS port this client claims as its source by default.
pub const DEFAULT_SOURCE_PORT: AmsPort = 32905;

/// Everything configurable about a [`Client`](crate::Client).
///
/// Built fluently and validated once at connect time:
///
/// ```no_run
/// use adstc_client::ClientOptions;
///
/// let opts = ClientOptions::new("172.16.17.10:48898", "172.16.17.10.1.1".parse().unwrap())
///     .with_reconnect(true)
///     .with_request_timeout(std::time::Duration::from_secs(2));
/// ```
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// TCP address of the target, `host:port`.
    pub target_addr: String,
    /// AMS Net ID of the target device.
    pub target_net_id: AmsNetId,
    /// AMS port of the target runtime.
    pub target_port: AmsPort,
    /// Source Net ID. Zero lets the target treat the TCP peer as the source.
    pub source_net_id: AmsNetId,
    /// Source AMS port.
    pub source_port: AmsPort,
    /// Deadline for dialing plus the device-state probe.
    pub connect_timeout: Duration,
    /// Default deadline for every request.
    pub request_timeout: Duration,
    /// Deadline for bulk symbol and type uploads, which legitimately take
    /// far longer than a normal request.
    pub upload_timeout: Duration,
    /// Re-dial and resubscribe automatically after connection loss.
    pub reconnect: bool,
    /// Ceiling for the doubling reconnect backoff.
    pub max_backoff: Duration,
    /// Period of the ReadState health probe, if any.
    pub health_check: Option<Duration>,
    /// Bound of each subscription's delivery queue.
    pub queue_capacity: usize,
    /// Soft cap on concurrently pending requests.
    pub max_in_flight: usize,
}

impl ClientOptions {
    /// Options for `target_addr` with every knob at its default.
    pub fn new(target_addr: impl Into<String>, target_net_id: AmsNetId) -> Self {
        Self {
            target_addr: target_addr.into(),
            target_net_id,
            target_port: DEFAULT_TARGET_PORT,
            source_net_id: AmsNetId::zero(),
            source_port: DEFAULT_SOURCE_PORT,
            connect_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(5),
            upload_timeout: Duration::from_secs(30),
            reconnect: false,
            max_backoff: Duration::from_secs(60),
            health_check: None,
            queue_capacity: 64,
            max_in_flight: 256,
        }
    }

    pub fn with_target_port(mut self, port: AmsPort) -> Self {
        self.target_port = port;
        self
    }

    pub fn with_source(mut self, net_id: AmsNetId, port: AmsPort) -> Self {
        self.source_net_id = net_id;
        self.source_port = port;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_upload_timeout(mut self, timeout: Duration) -> Self {
        self.upload_timeout = timeout;
        self
    }

    pub fn with_reconnect(mut self, enabled: bool) -> Self {
        self.reconnect = enabled;
        self
    }

    pub fn with_max_backoff(mut self, backoff: Duration) -> Self {
        self.max_backoff = backoff;
        self
    }

    pub fn with_health_check(mut self, period: Duration) -> Self {
        self.health_check = Some(period);
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    pub fn with_max_in_flight(mut self, cap: usize) -> Self {
        self.max_in_flight = cap;
        self
    }

    /// Rejects configurations no connection attempt could satisfy.
    pub(crate) fn validate(&self) -> Result<(), ClientError> {
        if self.target_addr.is_empty() {
            return Err(ClientError::validation("options", "target address is empty"));
        }
        for (what, value) in [
            ("connect timeout", self.connect_timeout),
            ("request timeout", self.request_timeout),
            ("upload timeout", self.upload_timeout),
            ("max backoff", self.max_backoff),
        ] {
            if value.is_zero() {
                return Err(ClientError::validation(
                    "options",
                    format!("{what} must be greater than zero"),
                ));
            }
        }
        if let Some(period) = self.health_check
            && period.is_zero()
        {
            return Err(ClientError::validation(
                "options",
                "health-check period must be greater than zero",
            ));
        }
        if self.queue_capacity == 0 {
            return Err(ClientError::validation(
                "options",
                "queue capacity must be at least one",
            ));
        }
        if self.max_in_flight == 0 {
            return Err(ClientError::validation(
                "options",
                "in-flight cap must be at least one",
            ));
        }
        Ok(())
    }
}
