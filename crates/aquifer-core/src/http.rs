//! Shared HTTP plumbing for the API clients.
//!
//! All clients use the same blocking `reqwest` client configuration and the
//! same small retry helper. The retry policy is fixed: transient failures
//! (network errors, 429, 5xx) are retried a bounded number of times with
//! exponential backoff; everything else surfaces immediately.

use std::thread;
use std::time::Duration;
use thiserror::Error;

/// Request timeout applied to every client.
pub const TIMEOUT: Duration = Duration::from_secs(60);

/// Maximum number of attempts for a single logical request.
pub const MAX_ATTEMPTS: u32 = 5;

/// Initial backoff delay; doubled per attempt up to [`MAX_BACKOFF`].
pub const INITIAL_BACKOFF: Duration = Duration::from_secs(2);

/// Upper bound on the backoff delay.
pub const MAX_BACKOFF: Duration = Duration::from_secs(10);

/// Errors produced by the fetch layer.
#[derive(Error, Debug)]
pub enum FetchError {
    /// Connection-level failure (DNS, TLS, timeout, ...).
    #[error("network error: {0}")]
    Network(String),

    /// The API answered with a non-success status.
    #[error("API returned status {status}: {body}")]
    Api { status: u16, body: String },

    /// The requested resource does not exist (HTTP 404).
    #[error("resource '{0}' not available")]
    Unavailable(String),

    /// The response body could not be parsed.
    #[error("failed to parse response: {0}")]
    Parse(String),
}

impl FetchError {
    /// Whether retrying the request could plausibly succeed.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Network(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            Self::Unavailable(_) | Self::Parse(_) => false,
        }
    }
}

/// Build the blocking HTTP client shared by all API clients.
///
/// # Errors
///
/// Returns an error if the underlying client cannot be constructed.
pub fn client() -> Result<reqwest::blocking::Client, FetchError> {
    reqwest::blocking::Client::builder()
        .user_agent(user_agent())
        .timeout(TIMEOUT)
        .build()
        .map_err(|e| FetchError::Network(e.to_string()))
}

/// The user agent sent with every request.
#[must_use]
pub fn user_agent() -> String {
    format!("aquifer/{}", env!("CARGO_PKG_VERSION"))
}

/// Run `operation` up to [`MAX_ATTEMPTS`] times, sleeping with exponential
/// backoff between attempts. Only transient errors are retried.
///
/// # Errors
///
/// Returns the last error once attempts are exhausted, or the first
/// non-transient error immediately.
pub fn with_retry<T, F>(mut operation: F) -> Result<T, FetchError>
where
    F: FnMut() -> Result<T, FetchError>,
{
    let mut backoff = INITIAL_BACKOFF;
    let mut attempt = 1;
    loop {
        match operation() {
            Ok(value) => return Ok(value),
            Err(err) if err.is_transient() && attempt < MAX_ATTEMPTS => {
                log::warn!("attempt {attempt}/{MAX_ATTEMPTS} failed ({err}), retrying in {backoff:?}");
                thread::sleep(backoff);
                backoff = (backoff * 2).min(MAX_BACKOFF);
                attempt += 1;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Map a non-success response to a [`FetchError::Api`], keeping a bounded
/// snippet of the body for diagnostics.
#[must_use]
pub fn api_error(status: reqwest::StatusCode, body: &str) -> FetchError {
    let mut snippet: String = body.chars().take(500).collect();
    if snippet.len() < body.len() {
        snippet.push_str("...");
    }
    FetchError::Api {
        status: status.as_u16(),
        body: snippet,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(FetchError::Network("reset".into()).is_transient());
        assert!(FetchError::Api {
            status: 503,
            body: String::new()
        }
        .is_transient());
        assert!(FetchError::Api {
            status: 429,
            body: String::new()
        }
        .is_transient());
        assert!(!FetchError::Api {
            status: 400,
            body: String::new()
        }
        .is_transient());
        assert!(!FetchError::Unavailable("x".into()).is_transient());
        assert!(!FetchError::Parse("bad json".into()).is_transient());
    }

    #[test]
    fn test_with_retry_returns_first_success() {
        let mut calls = 0;
        let result: Result<u32, _> = with_retry(|| {
            calls += 1;
            Ok(42)
        });
        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_with_retry_gives_up_on_permanent_error() {
        let mut calls = 0;
        let result: Result<u32, _> = with_retry(|| {
            calls += 1;
            Err(FetchError::Unavailable("gone".into()))
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_api_error_truncates_body() {
        let body = "x".repeat(2000);
        let err = api_error(reqwest::StatusCode::BAD_GATEWAY, &body);
        match err {
            FetchError::Api { status, body } => {
                assert_eq!(status, 502);
                assert!(body.len() <= 503);
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
