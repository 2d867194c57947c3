//! HTTP document source with streaming size caps.

use std::future::Future;
use std::time::Duration;

use futures::StreamExt;
use sift_config::AcquisitionConfig;
use sift_core::retry::RetryPolicy;

use crate::error::FetchError;

/// Seconds assumed when a 429 carries no usable `Retry-After`.
const DEFAULT_RETRY_AFTER_SECS: u64 = 30;

/// Anything that can hand over the raw bytes of a paper's documents.
pub trait DocumentSource: Send + Sync {
    /// Download a PDF.
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when the document is missing, too large, not a
    /// PDF, or the transfer fails.
    fn fetch_pdf(&self, url: &str) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;

    /// Download a source archive (gzip, usually wrapping a tar).
    ///
    /// # Errors
    ///
    /// Returns [`FetchError`] when the archive is missing, too large, or the
    /// transfer fails.
    fn fetch_source_archive(
        &self,
        url: &str,
    ) -> impl Future<Output = Result<Vec<u8>, FetchError>> + Send;
}

/// [`DocumentSource`] over plain HTTP.
pub struct HttpDocumentSource {
    http: reqwest::Client,
    max_pdf_bytes: u64,
    max_source_bytes: u64,
    retry: RetryPolicy,
}

impl HttpDocumentSource {
    /// # Errors
    ///
    /// Returns [`FetchError::Http`] if the underlying `reqwest::Client` fails to build.
    pub fn new(config: &AcquisitionConfig, user_agent: &str) -> Result<Self, FetchError> {
        Ok(Self {
            http: reqwest::Client::builder()
                .user_agent(user_agent)
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()?,
            max_pdf_bytes: config.max_pdf_bytes(),
            max_source_bytes: config.max_source_bytes(),
            retry: config.retry_policy(),
        })
    }

    /// Download with backoff on transient failures; a truncated body is
    /// fetched again from the start.
    async fn download_with_retry(&self, url: &str, limit_bytes: u64) -> Result<Vec<u8>, FetchError> {
        self.retry.run(url, || self.download(url, limit_bytes)).await
    }

    async fn download(&self, url: &str, limit_bytes: u64) -> Result<Vec<u8>, FetchError> {
        let resp = check_response(self.http.get(url).send().await?, url).await?;
        if resp.content_length().is_some_and(|len| len > limit_bytes) {
            return Err(FetchError::TooLarge { limit_bytes });
        }

        let mut body = Vec::new();
        let mut stream = resp.bytes_stream();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk?;
            if (body.len() + chunk.len()) as u64 > limit_bytes {
                tracing::warn!(%url, limit_bytes, "download aborted at size cap");
                return Err(FetchError::TooLarge { limit_bytes });
            }
            body.extend_from_slice(&chunk);
        }
        tracing::debug!(%url, bytes = body.len(), "downloaded");
        Ok(body)
    }
}

impl DocumentSource for HttpDocumentSource {
    async fn fetch_pdf(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let body = self.download_with_retry(url, self.max_pdf_bytes).await?;
        if !looks_like_pdf(&body) {
            return Err(FetchError::NotPdf);
        }
        Ok(body)
    }

    async fn fetch_source_archive(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.download_with_retry(url, self.max_source_bytes).await
    }
}

/// PDF magic, tolerating leading whitespace some servers prepend.
#[must_use]
pub fn looks_like_pdf(body: &[u8]) -> bool {
    let start = body
        .iter()
        .position(|b| !b.is_ascii_whitespace())
        .unwrap_or(body.len());
    body[start..].starts_with(b"%PDF")
}

/// Check an HTTP response for common error conditions.
///
/// # Errors
///
/// - **404 / 410** → [`FetchError::NotFound`]
/// - **429 Too Many Requests** → [`FetchError::RateLimited`]
/// - **Non-success status** → [`FetchError::Api`] with status code and body
pub async fn check_response(
    resp: reqwest::Response,
    url: &str,
) -> Result<reqwest::Response, FetchError> {
    let status = resp.status();
    if status == 404 || status == 410 {
        return Err(FetchError::NotFound {
            url: url.to_string(),
        });
    }
    if status == 429 {
        return Err(FetchError::RateLimited {
            retry_after_secs: parse_retry_after(&resp),
        });
    }
    if !status.is_success() {
        return Err(FetchError::Api {
            status: status.as_u16(),
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
    use std::sync::atomic::{AtomicU32, Ordering};

    fn mock_response(status: u16) -> reqwest::Response {
        reqwest::Response::from(
            ::http::Response::builder()
                .status(status)
                .body("body")
                .unwrap(),
        )
    }

    #[tokio::test]
    async fn missing_document_is_not_found() {
        let err = check_response(mock_response(404), "https://arxiv.org/pdf/x")
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::NotFound { url } if url.ends_with("/x")));
    }

    #[tokio::test]
    async fn server_error_is_api() {
        let err = check_response(mock_response(502), "u").await.unwrap_err();
        assert!(matches!(err, FetchError::Api { status: 502, .. }));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn transient_download_failure_is_retried() {
        let policy = RetryPolicy::from_millis(3, 1, 2);
        let attempts = AtomicU32::new(0);
        let body = policy
            .run("https://arxiv.org/e-print/x", || {
                let n = attempts.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(FetchError::Api {
                            status: 503,
                            message: "busy".into(),
                        })
                    } else {
                        Ok(b"\x1f\x8b".to_vec())
                    }
                }
            })
            .await
            .unwrap();
        assert_eq!(body, b"\x1f\x8b".to_vec());
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn missing_document_is_not_retried() {
        let policy = RetryPolicy::from_millis(3, 1, 2);
        let attempts = AtomicU32::new(0);
        let err = policy
            .run("u", || {
                attempts.fetch_add(1, Ordering::SeqCst);
                async { Err::<Vec<u8>, _>(FetchError::NotFound { url: "u".into() }) }
            })
            .await
            .unwrap_err();
        assert!(matches!(err, FetchError::NotFound { .. }));
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn rate_limit_wait_is_capped() {
        let policy = RetryPolicy::from_millis(3, 1, 5);
        let err = FetchError::RateLimited {
            retry_after_secs: 120,
        };
        assert_eq!(policy.delay_for(0, &err), Duration::from_millis(5));
    }

    #[test]
    fn client_takes_retry_settings() {
        let config = AcquisitionConfig {
            retry_attempts: 5,
            ..AcquisitionConfig::default()
        };
        let source = HttpDocumentSource::new(&config, "sift-test").unwrap();
        assert_eq!(source.retry.max_attempts, 5);
    }

    #[test]
    fn pdf_magic() {
        assert!(looks_like_pdf(b"%PDF-1.5\n..."));
        assert!(looks_like_pdf(b"\r\n%PDF-1.7"));
        assert!(!looks_like_pdf(b"<html>"));
        assert!(!looks_like_pdf(b""));
    }
}
