use std::time::Duration;
use thiserror::Error;

/// Errors raised by the poller itself, as opposed to the fetches it runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PollerError {
    #[error("fetch did not complete within {0:?}")]
    FetchTimeout(Duration),

    #[error("poll delay must be greater than zero")]
    ZeroDelay,
}

/// Errors from the pipeline REST API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid request URL {url}: {message}")]
    InvalidUrl { url: String, message: String },

    #[error("request to {path} failed: {source}")]
    Transport {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{path} returned HTTP {status}: {body}")]
    Status {
        path: String,
        status: u16,
        body: String,
    },

    #[error("could not decode response from {path}: {source}")]
    Decode {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Poller(#[from] PollerError),
}

impl ApiError {
    /// True for 401/403 responses, which usually mean the session token expired.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ApiError::Status { status: 401 | 403, .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_error(status: u16) -> ApiError {
        ApiError::Status {
            path: "/jobs/farm_jobs/".to_string(),
            status,
            body: String::new(),
        }
    }

    #[test]
    fn test_unauthorized_statuses() {
        assert!(status_error(401).is_unauthorized());
        assert!(status_error(403).is_unauthorized());
        assert!(!status_error(500).is_unauthorized());
        assert!(!ApiError::Poller(PollerError::ZeroDelay).is_unauthorized());
    }

    #[test]
    fn test_timeout_converts_into_api_error() {
        let err: ApiError = PollerError::FetchTimeout(Duration::from_secs(2)).into();
        assert!(err.status().is_none());
        assert_eq!(err.to_string(), "fetch did not complete within 2s");
    }
}
