//! Fetch error model.

use std::time::Duration;

use thiserror::Error;

/// Result type returned by every fetch against the remote API.
pub type FetchResult<T> = Result<T, FetchError>;

/// Failure of a single remote call.
///
/// Only [`FetchError::Timeout`] is timeout-class. Everything else is a
/// permanent failure for the request as issued: retrying it with a longer
/// timeout will not change the answer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// The call exceeded its allotted time budget.
    #[error("request timed out after {}s", .timeout.as_secs_f64())]
    Timeout { timeout: Duration },

    /// The remote answered with a non-success status.
    #[error("http {status} from {url}")]
    Http { status: u16, url: String },

    /// Connection-level failure that is not a timeout (DNS, TLS, reset).
    #[error("transport error: {0}")]
    Transport(String),

    /// The response did not have the expected shape.
    #[error("unexpected response: {0}")]
    Decode(String),

    /// The request could not be built from its parameters.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Local I/O failed while handling the response.
    #[error("io error: {0}")]
    Io(String),
}

impl FetchError {
    pub fn timeout(timeout: Duration) -> Self {
        Self::Timeout { timeout }
    }

    pub fn http(status: u16, url: impl Into<String>) -> Self {
        Self::Http {
            status,
            url: url.into(),
        }
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }

    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    pub fn invalid_request(msg: impl Into<String>) -> Self {
        Self::InvalidRequest(msg.into())
    }

    /// Whether this failure is timeout-class and therefore worth retrying.
    pub fn is_timeout(&self) -> bool {
        matches!(self, FetchError::Timeout { .. })
    }
}

impl From<std::io::Error> for FetchError {
    fn from(value: std::io::Error) -> Self {
        if value.kind() == std::io::ErrorKind::TimedOut {
            // Timeout length is unknown at this layer.
            return Self::Timeout {
                timeout: Duration::ZERO,
            };
        }
        Self::Io(value.to_string())
    }
}

/// Failure to parse an identifier or selector from user input.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("invalid player id: {0}")]
    InvalidId(String),

    #[error("invalid season (expected YYYY-YY): {0}")]
    InvalidSeason(String),

    #[error("unknown season type: {0}")]
    InvalidSeasonType(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_timeouts_are_timeout_class() {
        assert!(FetchError::timeout(Duration::from_secs(30)).is_timeout());
        assert!(!FetchError::http(500, "https://example.test").is_timeout());
        assert!(!FetchError::transport("connection reset").is_timeout());
        assert!(!FetchError::decode("missing resultSets").is_timeout());
        assert!(!FetchError::invalid_request("bad season").is_timeout());
    }

    #[test]
    fn io_timeouts_map_to_timeout_class() {
        let err: FetchError = std::io::Error::new(std::io::ErrorKind::TimedOut, "slow").into();
        assert!(err.is_timeout());

        let err: FetchError = std::io::Error::new(std::io::ErrorKind::NotFound, "gone").into();
        assert!(matches!(err, FetchError::Io(_)));
    }

    #[test]
    fn display_includes_timeout_seconds() {
        let err = FetchError::timeout(Duration::from_millis(1500));
        assert_eq!(err.to_string(), "request timed out after 1.5s");
    }
}
