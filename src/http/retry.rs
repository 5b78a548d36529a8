//! Retry policy for release API and download requests.

use reqwest::{Response, StatusCode};
use thiserror::Error;

/// Maximum number of attempts for one network operation.
pub const MAX_RETRIES: usize = 3;

/// Delay between attempts in milliseconds.
pub const RETRY_DELAY_MS: u64 = 1000;

/// GitHub answers an exhausted rate limit with 403 and this header at `0`.
const RATE_LIMIT_REMAINING: &str = "x-ratelimit-remaining";

/// Failures that will not go away by asking again.
#[derive(Debug, Error)]
pub enum NonRetryableError {
    #[error(
        "Rate limit exceeded: {0}. Try again later or set GITHUB_TOKEN environment variable."
    )]
    RateLimitExceeded(String),

    #[error("Authentication failed: {0}. Check your GITHUB_TOKEN.")]
    AuthenticationFailed(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Access forbidden: {0}. You may need authentication.")]
    Forbidden(String),

    #[error("Request error: {0}")]
    ClientError(String),
}

/// Classifies an HTTP error.
/// Returns Ok(()) if the request may be retried, the user-facing reason otherwise.
pub fn classify_error(error: &reqwest::Error) -> Result<(), NonRetryableError> {
    let Some(status) = error.status() else {
        // Connection errors, timeouts, etc.
        return Ok(());
    };

    match status {
        StatusCode::UNAUTHORIZED => Err(NonRetryableError::AuthenticationFailed(
            "Invalid or missing authentication token".to_string(),
        )),
        StatusCode::FORBIDDEN => Err(NonRetryableError::Forbidden(
            "Access to this resource is forbidden".to_string(),
        )),
        StatusCode::TOO_MANY_REQUESTS => Err(NonRetryableError::RateLimitExceeded(
            "Too many requests".to_string(),
        )),
        StatusCode::NOT_FOUND => Err(NonRetryableError::NotFound(
            "The repository or release does not exist, or has no published release".to_string(),
        )),
        s if s.is_client_error() => Err(NonRetryableError::ClientError(format!(
            "HTTP {} error",
            s.as_u16()
        ))),
        // 5xx
        _ => Ok(()),
    }
}

/// Maps an error from `error_for_status()` into an `anyhow::Error`, tagging the
/// ones that must not be retried.
pub fn check_retryable(error: reqwest::Error) -> anyhow::Error {
    match classify_error(&error) {
        Ok(()) => anyhow::Error::from(error),
        Err(non_retryable) => anyhow::Error::from(non_retryable),
    }
}

/// `Response::error_for_status` with the failure classified for retry.
/// Headers are inspected first, since the error no longer carries them.
pub fn error_for_status(response: Response) -> anyhow::Result<Response> {
    let rate_limited = response.status() == StatusCode::FORBIDDEN
        && response
            .headers()
            .get(RATE_LIMIT_REMAINING)
            .is_some_and(|remaining| remaining.as_bytes() == b"0");

    match response.error_for_status() {
        Ok(response) => Ok(response),
        Err(_) if rate_limited => Err(NonRetryableError::RateLimitExceeded(
            "GitHub API rate limit exceeded".to_string(),
        )
        .into()),
        Err(error) => Err(check_retryable(error)),
    }
}

pub(crate) fn is_retryable_error(e: &anyhow::Error) -> bool {
    e.downcast_ref::<NonRetryableError>().is_none()
}
