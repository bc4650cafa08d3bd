//! Fault taxonomy for the platform API.
//!
//! Every error leaving this crate is classified into one of four
//! families the engine reacts to differently: not-found, version
//! conflict, transient, permanent. Classification happens here, at the
//! transport edge, so the engine never inspects HTTP statuses.

use reqwest::StatusCode;
use thiserror::Error;

/// Result type for platform API operations.
pub type ApiResult<T> = Result<T, ApiFault>;

/// A classified fault from the platform API.
#[derive(Debug, Error)]
pub enum ApiFault {
    /// The addressed resource does not exist.
    #[error("resource not found")]
    NotFound,

    /// The submitted version is stale. Carries the server's current
    /// version when the response body names one.
    #[error("version conflict")]
    Conflict { current_version: Option<u64> },

    /// Rate limiting, server errors, timeouts, connection failures.
    /// Terminal for the engine too — retrying is a transport concern.
    #[error("transient fault{}: {message}", fmt_status(.status))]
    Transient {
        status: Option<u16>,
        message: String,
    },

    /// Client-side errors the server will keep rejecting (malformed
    /// payload, permission denied, …).
    #[error("permanent fault (status {status}): {message}")]
    Permanent { status: u16, message: String },

    /// The response body did not parse into the expected shape.
    #[error("malformed response: {0}")]
    Decode(String),
}

fn fmt_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!(" (status {code})"),
        None => String::new(),
    }
}

impl ApiFault {
    /// Classifies an HTTP error status. `message` is the best available
    /// description of the failure, usually extracted from the body.
    #[must_use]
    pub fn from_status(status: StatusCode, message: String) -> Self {
        match status.as_u16() {
            404 => Self::NotFound,
            409 => Self::Conflict {
                current_version: None,
            },
            429 => Self::Transient {
                status: Some(429),
                message,
            },
            code if status.is_server_error() => Self::Transient {
                status: Some(code),
                message,
            },
            code => Self::Permanent {
                status: code,
                message,
            },
        }
    }

    /// Classifies a request-level error (no response at all).
    #[must_use]
    pub fn from_request_error(error: &reqwest::Error) -> Self {
        if error.is_decode() {
            return Self::Decode(error.to_string());
        }
        Self::Transient {
            status: error.status().map(|s| s.as_u16()),
            message: error.to_string(),
        }
    }

    /// True for the one fault family the engine recovers from.
    #[must_use]
    pub const fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_classification() {
        assert!(matches!(
            ApiFault::from_status(StatusCode::NOT_FOUND, String::new()),
            ApiFault::NotFound
        ));
        assert!(ApiFault::from_status(StatusCode::CONFLICT, String::new()).is_conflict());
        assert!(matches!(
            ApiFault::from_status(StatusCode::TOO_MANY_REQUESTS, "slow down".into()),
            ApiFault::Transient {
                status: Some(429),
                ..
            }
        ));
        assert!(matches!(
            ApiFault::from_status(StatusCode::BAD_GATEWAY, String::new()),
            ApiFault::Transient {
                status: Some(502),
                ..
            }
        ));
        assert!(matches!(
            ApiFault::from_status(StatusCode::BAD_REQUEST, String::new()),
            ApiFault::Permanent { status: 400, .. }
        ));
    }

    #[test]
    fn display_includes_status_when_known() {
        let fault = ApiFault::Transient {
            status: Some(503),
            message: "unavailable".to_string(),
        };
        assert_eq!(fault.to_string(), "transient fault (status 503): unavailable");

        let fault = ApiFault::Transient {
            status: None,
            message: "timed out".to_string(),
        };
        assert_eq!(fault.to_string(), "transient fault: timed out");
    }
}
