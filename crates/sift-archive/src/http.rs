//! Shared HTTP response helpers for the Zotero client.

use crate::error::ReferenceError;

/// Seconds assumed when a 429 carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 30;

/// Check a Zotero response for common error conditions.
///
/// Returns the response unchanged on success.
///
/// # Errors
///
/// - **401 / 403** → [`ReferenceError::Auth`]
/// - **412 Precondition Failed** → [`ReferenceError::Conflict`]
/// - **429 Too Many Requests** → [`ReferenceError::RateLimited`]
/// - **Non-success status** → [`ReferenceError::Api`] with status code and body
pub async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, ReferenceError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    match status.as_u16() {
        code @ (401 | 403) => Err(ReferenceError::Auth { status: code }),
        412 => Err(ReferenceError::Conflict {
            message: resp.text().await.unwrap_or_default(),
        }),
        429 => Err(ReferenceError::RateLimited {
            retry_after_secs: parse_retry_after(&resp),
        }),
        code => Err(ReferenceError::Api {
            status: code,
            message: resp.text().await.unwrap_or_default(),
        }),
    }
}

fn parse_retry_after(resp: &reqwest::Response) -> u64 {
    resp.headers()
        .get(reqwest::header::RETRY_AFTER)
        .or_else(|| resp.headers().get("Backoff"))
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}
