//! Archive error types.

use sift_config::ConfigError;
use sift_content::FetchError;
use sift_core::errors::{Classify, ErrorClass};
use sift_store::StoreError;
use thiserror::Error;

/// Failures talking to the reference manager.
#[derive(Debug, Error)]
pub enum ReferenceError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("reference manager rejected the API key (HTTP {status})")]
    Auth { status: u16 },

    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// 412: a write with the same token, or a stale version, already landed.
    #[error("precondition failed: {message}")]
    Conflict { message: String },

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// A batch write returned 200 but listed the object under `failed`.
    #[error("write rejected: {message}")]
    Rejected { message: String },

    #[error("unexpected response: {0}")]
    Parse(String),

    #[error(transparent)]
    Configuration(#[from] ConfigError),
}

impl Classify for ReferenceError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::Http(_) => ErrorClass::TransientNetwork,
            Self::Api { status, .. } if *status >= 500 => ErrorClass::TransientNetwork,
            Self::Auth { .. } | Self::RateLimited { .. } => ErrorClass::QuotaAuth,
            Self::Conflict { .. } => ErrorClass::Conflict,
            Self::Api { .. } | Self::Rejected { .. } | Self::Parse(_) => {
                ErrorClass::MalformedContent
            }
            Self::Configuration(_) => ErrorClass::Configuration,
        }
    }
}

/// Failures of one archive call or one of its entries.
#[derive(Debug, Error)]
pub enum ArchiveError {
    #[error(transparent)]
    Reference(#[from] ReferenceError),

    #[error("PDF download failed: {0}")]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Classify for ArchiveError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::Reference(e) => e.class(),
            Self::Fetch(e) => e.class(),
            Self::Store(e) => e.class(),
            Self::Io(_) => ErrorClass::MalformedContent,
        }
    }
}
