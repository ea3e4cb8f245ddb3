use adstc_core::ads::ReturnCode;
use std::time::Duration;

/// The closed set of failure categories every [`ClientError`] falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// TCP dial, read, or write failures.
    Network,
    /// A deadline expired before the device answered.
    Timeout,
    /// The byte stream violated the wire contract.
    Protocol,
    /// The device answered with a non-zero result code.
    Device,
    /// Bad options, malformed names, missing symbols or fields.
    Validation,
    /// The operation is illegal in the client's current state.
    State,
}

/// Every failure the client surfaces, tagged with the operation that hit it.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("network error during {op}: {source}")]
    Network {
        op: &'static str,
        #[source]
        source: std::io::Error,
    },

    #[error("{op} timed out after {timeout:?}")]
    Timeout { op: &'static str, timeout: Duration },

    #[error("protocol violation during {op}: {reason}")]
    Protocol { op: &'static str, reason: String },

    #[error("device rejected {op}: {code}")]
    Device { op: &'static str, code: ReturnCode },

    #[error("invalid {what}: {reason}")]
    Validation { what: &'static str, reason: String },

    #[error("{op} is not possible: {reason}")]
    State { op: &'static str, reason: String },

    #[error("{op} rejected: {cap} requests already in flight")]
    Backpressure { op: &'static str, cap: usize },

    #[error("symbol {name:?} not found")]
    SymbolNotFound { name: String },

    #[error("type {type_name:?} has no field {field:?}")]
    FieldNotFound { type_name: String, field: String },

    #[error("index {index} out of range for {name:?}: dimension holds {len} elements")]
    IndexOutOfRange { name: String, index: u32, len: u32 },

    #[error("{reason}")]
    Unsupported { reason: String },
}

impl ClientError {
    pub(crate) fn network(op: &'static str, source: std::io::Error) -> Self {
        Self::Network { op, source }
    }

    pub(crate) fn timeout(op: &'static str, timeout: Duration) -> Self {
        Self::Timeout { op, timeout }
    }

    pub(crate) fn protocol(op: &'static str, reason: impl ToString) -> Self {
        Self::Protocol {
            op,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn device(op: &'static str, code: ReturnCode) -> Self {
        Self::Device { op, code }
    }

    pub(crate) fn validation(what: &'static str, reason: impl ToString) -> Self {
        Self::Validation {
            what,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn state(op: &'static str, reason: impl ToString) -> Self {
        Self::State {
            op,
            reason: reason.to_string(),
        }
    }

    pub(crate) fn unsupported(reason: impl ToString) -> Self {
        Self::Unsupported {
            reason: reason.to_string(),
        }
    }

    /// Which of the six categories this error belongs to.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::Network { .. } => ErrorCategory::Network,
            Self::Timeout { .. } => ErrorCategory::Timeout,
            Self::Protocol { .. } => ErrorCategory::Protocol,
            Self::Device { .. } => ErrorCategory::Device,
            Self::Validation { .. }
            | Self::SymbolNotFound { .. }
            | Self::FieldNotFound { .. }
            | Self::IndexOutOfRange { .. }
            | Self::Unsupported { .. } => ErrorCategory::Validation,
            Self::State { .. } | Self::Backpressure { .. } => ErrorCategory::State,
        }
    }

    /// True for failures a retry or reconnect can plausibly cure: network
    /// faults, expired deadlines, and the two routing result codes a PLC
    /// emits while its runtime is down.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network { source, .. } => io_error_is_transient(source),
            Self::Timeout { .. } => true,
            Self::Device { code, .. } => code.is_retryable(),
            _ => false,
        }
    }

    /// The device result code, if this is a device error.
    pub fn device_code(&self) -> Option<ReturnCode> {
        match self {
            Self::Device { code, .. } => Some(*code),
            _ => None,
        }
    }
}

/// Classifies an I/O error as transient by kind, with a message-substring
/// fallback for errors that arrive already stringified (wrapped causes,
/// foreign error types flattened into `Other`).
pub(crate) fn io_error_is_transient(err: &std::io::Error) -> bool {
    use std::io::ErrorKind;

    match err.kind() {
        ErrorKind::ConnectionReset
        | ErrorKind::ConnectionAborted
        | ErrorKind::ConnectionRefused
        | ErrorKind::BrokenPipe
        | ErrorKind::UnexpectedEof
        | ErrorKind::NotConnected
        | ErrorKind::TimedOut
        | ErrorKind::WouldBlock => true,
        ErrorKind::Other => {
            let text = err.to_string().to_ascii_lowercase();
            ["connection", "timeout", "closed", "reset"]
                .iter()
                .any(|needle| text.contains(needle))
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn categories() {
        let err = ClientError::network("read", io::Error::from(io::ErrorKind::BrokenPipe));
        assert_eq!(err.category(), ErrorCategory::Network);
        assert!(err.is_transient());

        let err = ClientError::device("read", ReturnCode::SymbolNotFound);
        assert_eq!(err.category(), ErrorCategory::Device);
        assert!(!err.is_transient());

        let err = ClientError::device("read", ReturnCode::TargetPortNotFound);
        assert!(err.is_transient());

        let err = ClientError::SymbolNotFound {
            name: "MAIN.x".into(),
        };
        assert_eq!(err.category(), ErrorCategory::Validation);
    }

    #[test]
    fn transient_classification_prefers_kind() {
        let reset = io::Error::from(io::ErrorKind::ConnectionReset);
        assert!(io_error_is_transient(&reset));

        let denied = io::Error::from(io::ErrorKind::PermissionDenied);
        assert!(!io_error_is_transient(&denied));
    }

    #[test]
    fn transient_classification_falls_back_to_message() {
        let opaque = io::Error::other("remote closed the session");
        assert!(io_error_is_transient(&opaque));

        let opaque = io::Error::other("checksum violation");
        assert!(!io_error_is_transient(&opaque));
    }

    #[test]
    fn timeout_is_transient() {
        assert!(ClientError::timeout("read", Duration::from_secs(5)).is_transient());
    }
}
