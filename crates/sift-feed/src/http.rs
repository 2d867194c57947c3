//! Shared HTTP response helpers.
//!
//! Centralizes status-code checks (429 rate limiting with `Retry-After`
//! parsing, non-success → [`FeedError::Api`]).

use crate::error::FeedError;

/// Seconds assumed when a 429 carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 30;

/// Check an HTTP response for common error conditions.
///
/// Returns the response unchanged on success.
///
/// # Errors
///
/// - **429 Too Many Requests** → [`FeedError::RateLimited`]
/// - **Non-success status** → [`FeedError::Api`] with status code and body
pub async fn check_response(resp: reqwest::Response) -> Result<reqwest::Response, FeedError> {
    if resp.status() == 429 {
        let retry_after = parse_retry_after(&resp);
        return Err(FeedError::RateLimited {
            retry_after_secs: retry_after,
        });
    }
    if !resp.status().is_success() {
        return Err(FeedError::Api {
            status: resp.status().as_u16(),
            message: resp.text().await.unwrap_or_default(),
        });
    }
    Ok(resp)
}

fn parse_retry_after(resp: &reqwest::Response) -> u64 {
    resp.headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(DEFAULT_RETRY_AFTER_SECS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mock_response(status: u16, retry_after: Option<&str>) -> reqwest::Response {
        let mut builder = ::http::Response::builder().status(status);
        if let Some(value) = retry_after {
            builder = builder.header("Retry-After", value);
        }
        reqwest::Response::from(builder.body("feed body").unwrap())
    }

    #[test]
    fn retry_after_header_parsing() {
        assert_eq!(parse_retry_after(&mock_response(429, Some("12"))), 12);
        assert_eq!(parse_retry_after(&mock_response(429, None)), 30);
        assert_eq!(parse_retry_after(&mock_response(429, Some("soon"))), 30);
    }

    #[tokio::test]
    async fn rate_limited_maps_to_error() {
        let err = check_response(mock_response(429, Some("5")))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            FeedError::RateLimited {
                retry_after_secs: 5
            }
        ));
    }

    #[tokio::test]
    async fn server_error_keeps_body() {
        let err = check_response(mock_response(503, None)).await.unwrap_err();
        match err {
            FeedError::Api { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "feed body");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn success_passes_through() {
        assert!(check_response(mock_response(200, None)).await.is_ok());
    }
}
