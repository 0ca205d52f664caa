//! Error type for the query backend

use thiserror::Error;

/// Failure talking to the search backend
#[derive(Error, Debug)]
pub enum BackendError {
    /// Request never produced a response (connect, timeout, body read)
    #[error("Backend request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// Backend answered with a non-success status
    #[error("Backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    /// Backend answered 2xx with a body that is not a search response
    #[error("Invalid backend response: {0}")]
    Decode(String),

    /// Client could not be constructed from configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl BackendError {
    pub fn status(status: u16, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            body: body.into(),
        }
    }

    /// Check if retrying the same request may succeed
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Status { status, .. } => matches!(status, 502..=504),
            Self::Decode(_) | Self::Config(_) => false,
        }
    }

    /// HTTP status to surface to the caller
    ///
    /// Upstream 5xx statuses pass through, any other upstream status becomes
    /// 502, and failures without an upstream answer become 500.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Status { status, .. } if *status >= 500 => *status,
            Self::Status { .. } | Self::Decode(_) => 502,
            Self::Transport(_) | Self::Config(_) => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_error_display() {
        let err = BackendError::status(503, "overloaded");
        assert_eq!(err.to_string(), "Backend returned status 503: overloaded");
    }

    #[test]
    fn test_status_transient() {
        assert!(BackendError::status(503, "").is_transient());
        assert!(BackendError::status(504, "").is_transient());
        assert!(!BackendError::status(500, "").is_transient());
        assert!(!BackendError::status(400, "").is_transient());
    }

    #[test]
    fn test_decode_not_transient() {
        assert!(!BackendError::Decode("bad json".to_string()).is_transient());
    }

    #[test]
    fn test_http_status_mapping() {
        assert_eq!(BackendError::status(503, "").http_status(), 503);
        assert_eq!(BackendError::status(401, "").http_status(), 502);
        assert_eq!(BackendError::Decode("x".to_string()).http_status(), 502);
        assert_eq!(BackendError::Config("x".to_string()).http_status(), 500);
    }
}
