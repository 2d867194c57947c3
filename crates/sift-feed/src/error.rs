//! Feed error types.

use std::time::Duration;

use sift_core::errors::{Classify, ErrorClass};
use sift_core::retry::Retryable;
use thiserror::Error;

/// Errors that can occur when querying the search feed.
#[derive(Debug, Error)]
pub enum FeedError {
    /// HTTP transport error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The feed returned a non-success status code.
    #[error("API error ({status}): {message}")]
    Api {
        /// HTTP status code returned by the feed.
        status: u16,
        /// Error message or response body.
        message: String,
    },

    /// The response body was not a readable Atom document.
    #[error("parse error: {0}")]
    Parse(String),

    /// The feed returned a 429 Too Many Requests response.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// Nothing to search for after normalization.
    #[error("empty query")]
    EmptyQuery,

    /// Every attempt failed; carries the last error.
    #[error("gave up after {attempts} attempts: {last}")]
    Exhausted { attempts: u32, last: Box<Self> },
}

impl Retryable for FeedError {
    /// Whether a retry inside the same search may succeed.
    fn is_retryable(&self) -> bool {
        match self {
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request() || e.is_body(),
            Self::Api { status, .. } => *status >= 500,
            Self::Parse(_) | Self::RateLimited { .. } => true,
            Self::EmptyQuery | Self::Exhausted { .. } => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::RateLimited { retry_after_secs } => Some(Duration::from_secs(*retry_after_secs)),
            _ => None,
        }
    }

    fn exhausted(self, attempts: u32) -> Self {
        Self::Exhausted {
            attempts,
            last: Box::new(self),
        }
    }
}

impl Classify for FeedError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::Http(_) => ErrorClass::TransientNetwork,
            Self::Api { status, .. } if *status >= 500 => ErrorClass::TransientNetwork,
            Self::Api { status: 401 | 403, .. } | Self::RateLimited { .. } => ErrorClass::QuotaAuth,
            Self::Api { .. } | Self::Parse(_) => ErrorClass::MalformedContent,
            Self::EmptyQuery => ErrorClass::Configuration,
            Self::Exhausted { last, .. } => last.class(),
        }
    }
}
