//! Error types
//!
//! Errors fall into three families that are handled differently:
//!
//! - [`TransportError`]: the clock endpoint could not be bound or reached.
//!   Retried by receivers, fatal for a server at startup.
//! - [`ConfigurationError`]: a pipeline cannot be synchronized as required.
//!   Fatal to the affected session only.
//! - [`Error::SynchronizationTimeout`]: no clock exchange succeeded in time.
//!   The receiver stays unsynchronized and produces no output.

use std::net::SocketAddr;
use std::time::Duration;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type
#[derive(Debug)]
pub enum Error {
    /// I/O error
    Io(std::io::Error),
    /// Clock endpoint unreachable, unbound or timed out
    Transport(TransportError),
    /// Session cannot be configured for synchronized playback
    Config(ConfigurationError),
    /// Malformed clock packet
    Protocol(ProtocolError),
    /// No clock exchange succeeded within the window
    SynchronizationTimeout(Duration),
}

impl Error {
    /// Whether this is a transport-level failure
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Transport(_) | Error::Io(_))
    }

    /// Whether this is a session configuration failure
    pub fn is_configuration(&self) -> bool {
        matches!(self, Error::Config(_))
    }

    /// Whether a receiver should retry the operation that produced this error
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Transport(TransportError::Bind { .. }) => false,
            Error::Transport(TransportError::RetriesExhausted { .. }) => false,
            Error::Transport(_) | Error::Io(_) | Error::Protocol(_) => true,
            Error::Config(_) | Error::SynchronizationTimeout(_) => false,
        }
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {}", e),
            Error::Transport(e) => write!(f, "Transport error: {}", e),
            Error::Config(e) => write!(f, "Configuration error: {}", e),
            Error::Protocol(e) => write!(f, "Protocol error: {}", e),
            Error::SynchronizationTimeout(window) => {
                write!(f, "No clock exchange completed within {:?}", window)
            }
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Transport(TransportError::Bind { source, .. }) => Some(source),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<TransportError> for Error {
    fn from(e: TransportError) -> Self {
        Error::Transport(e)
    }
}

impl From<ConfigurationError> for Error {
    fn from(e: ConfigurationError) -> Self {
        Error::Config(e)
    }
}

impl From<ProtocolError> for Error {
    fn from(e: ProtocolError) -> Self {
        Error::Protocol(e)
    }
}

/// Clock endpoint failures
#[derive(Debug)]
pub enum TransportError {
    /// The clock provider could not bind its endpoint
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    /// The clock server could not be reached
    Unreachable(SocketAddr),
    /// A clock-read request received no reply in time
    RequestTimeout(Duration),
    /// All retry attempts failed
    RetriesExhausted { attempts: u32 },
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Bind { addr, source } => {
                write!(f, "Cannot bind clock endpoint {}: {}", addr, source)
            }
            TransportError::Unreachable(addr) => write!(f, "Clock server unreachable: {}", addr),
            TransportError::RequestTimeout(t) => write!(f, "Clock request timed out after {:?}", t),
            TransportError::RetriesExhausted { attempts } => {
                write!(f, "Clock exchange failed after {} attempts", attempts)
            }
        }
    }
}

impl std::error::Error for TransportError {}

/// Session configuration failures
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    /// The pipeline clock was already bound for this session
    ClockAlreadyBound,
    /// The running-time origin was already fixed
    OriginAlreadySet,
    /// The pipeline has no RTP synchronization sub-layer
    MissingRtpSync(String),
    /// The RTP sync layer already processed packets and can no longer be reconfigured
    RtpSyncActive,
    /// A deferred origin was requested on a source that is live upstream
    DeferredOriginOnLiveSource,
    /// No pipeline clock bound when one was required
    ClockNotBound,
    /// The supplied clock has not synchronized to its reference
    ClockUnsynchronized(String),
    /// No factory mounted at the requested path
    UnknownMount(String),
    /// Session limit reached
    SessionLimit(usize),
    /// Packets offered to a session that is not synchronized
    SessionNotSynchronized,
}

impl std::fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigurationError::ClockAlreadyBound => write!(f, "Pipeline clock already bound"),
            ConfigurationError::OriginAlreadySet => write!(f, "Running-time origin already set"),
            ConfigurationError::MissingRtpSync(pipeline) => {
                write!(f, "Pipeline '{}' has no RTP sync sub-layer", pipeline)
            }
            ConfigurationError::RtpSyncActive => {
                write!(f, "RTP sync layer already processing packets")
            }
            ConfigurationError::DeferredOriginOnLiveSource => {
                write!(f, "Deferred running-time origin on a live source")
            }
            ConfigurationError::ClockNotBound => write!(f, "Pipeline clock not bound"),
            ConfigurationError::ClockUnsynchronized(clock) => {
                write!(f, "Clock '{}' is not synchronized", clock)
            }
            ConfigurationError::UnknownMount(path) => write!(f, "No factory mounted at {}", path),
            ConfigurationError::SessionLimit(max) => write!(f, "Session limit reached ({})", max),
            ConfigurationError::SessionNotSynchronized => write!(f, "Session is not synchronized"),
        }
    }
}

impl std::error::Error for ConfigurationError {}

/// Wire format errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// Datagram shorter than a clock packet
    PacketTooShort { expected: usize, actual: usize },
    /// Reply carries no clock value
    MissingClockValue,
    /// Reply token does not match any outstanding request
    TokenMismatch { expected: u64, actual: u64 },
}

impl std::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProtocolError::PacketTooShort { expected, actual } => {
                write!(f, "Clock packet too short: {} < {}", actual, expected)
            }
            ProtocolError::MissingClockValue => write!(f, "Clock reply has no clock value"),
            ProtocolError::TokenMismatch { expected, actual } => {
                write!(f, "Token mismatch: expected {:#x}, got {:#x}", expected, actual)
            }
        }
    }
}

impl std::error::Error for ProtocolError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_families() {
        let err: Error = ConfigurationError::ClockAlreadyBound.into();
        assert!(err.is_configuration());
        assert!(!err.is_retryable());

        let err: Error = TransportError::RequestTimeout(Duration::from_millis(5)).into();
        assert!(err.is_transport());
        assert!(err.is_retryable());

        let err: Error = TransportError::RetriesExhausted { attempts: 3 }.into();
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_display() {
        let err = Error::from(ConfigurationError::MissingRtpSync("media-pipeline".into()));
        assert_eq!(
            err.to_string(),
            "Configuration error: Pipeline 'media-pipeline' has no RTP sync sub-layer"
        );
    }
}
