//! Content acquisition error types.

use std::time::Duration;

use sift_core::errors::{Classify, ErrorClass};
use sift_core::retry::Retryable;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("not found: {url}")]
    NotFound { url: String },

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// The document exceeded its size cap, during download or unpacking.
    #[error("document exceeds {limit_bytes} bytes")]
    TooLarge { limit_bytes: u64 },

    #[error("response is not a PDF")]
    NotPdf,

    #[error("text extraction failed: {0}")]
    Extraction(String),

    #[error("source archive unreadable: {0}")]
    Archive(String),
}

impl FetchError {
    /// Whether the error is a transient network condition.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request() || e.is_body(),
            Self::Api { status, .. } => *status >= 500,
            Self::RateLimited { .. } => true,
            Self::NotFound { .. }
            | Self::TooLarge { .. }
            | Self::NotPdf
            | Self::Extraction(_)
            | Self::Archive(_) => false,
        }
    }
}

impl Retryable for FetchError {
    fn is_retryable(&self) -> bool {
        self.is_transient()
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after_secs } => Some(Duration::from_secs(*retry_after_secs)),
            _ => None,
        }
    }
}

impl Classify for FetchError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::Api { status: 401 | 403, .. } => ErrorClass::QuotaAuth,
            Self::RateLimited { .. } => ErrorClass::QuotaAuth,
            e if e.is_transient() => ErrorClass::TransientNetwork,
            Self::Http(_) => ErrorClass::TransientNetwork,
            Self::NotFound { .. }
            | Self::Api { .. }
            | Self::TooLarge { .. }
            | Self::NotPdf
            | Self::Extraction(_)
            | Self::Archive(_) => ErrorClass::MalformedContent,
        }
    }
}
