//! Shared HTTP response helpers for the provider clients.

use crate::error::LlmError;

/// Body fragments that mark a quota failure even under a non-429 status.
const QUOTA_MARKERS: &[&str] = &[
    "insufficient_quota",
    "resource_exhausted",
    "quota exceeded",
    "exceeded your current quota",
    "credit balance is too low",
];

/// Check a provider response for common error conditions.
///
/// Returns the response unchanged on success.
///
/// # Errors
///
/// - **401 / 403** → [`LlmError::Auth`]
/// - **429**, or a body naming an exhausted quota → [`LlmError::Quota`]
/// - **Non-success status** → [`LlmError::Api`] with status code and body
pub async fn check_response(
    resp: reqwest::Response,
    provider: &'static str,
) -> Result<reqwest::Response, LlmError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let code = status.as_u16();
    if code == 401 || code == 403 {
        return Err(LlmError::Auth {
            provider,
            status: code,
        });
    }
    let body = resp.text().await.unwrap_or_default();
    if code == 429 || is_quota_body(&body) {
        return Err(LlmError::Quota {
            provider,
            message: truncate(&body, 300),
        });
    }
    Err(LlmError::Api {
        provider,
        status: code,
        message: truncate(&body, 500),
    })
}

fn is_quota_body(body: &str) -> bool {
    let lower = body.to_lowercase();
    QUOTA_MARKERS.iter().any(|m| lower.contains(m))
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}
