//! LLM error types.

use sift_config::ConfigError;
use sift_core::errors::{Classify, ErrorClass};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    /// The provider rejected the credential (401/403).
    #[error("{provider} rejected the API key (HTTP {status})")]
    Auth { provider: &'static str, status: u16 },

    /// Rate limit or exhausted quota (429 or a quota error body).
    #[error("{provider} quota or rate limit: {message}")]
    Quota {
        provider: &'static str,
        message: String,
    },

    #[error("{provider} request timed out")]
    Timeout { provider: &'static str },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{provider} API error ({status}): {message}")]
    Api {
        provider: &'static str,
        status: u16,
        message: String,
    },

    #[error("{provider} returned no text")]
    EmptyResponse { provider: &'static str },

    #[error("unexpected {provider} response: {message}")]
    Parse {
        provider: &'static str,
        message: String,
    },

    #[error(transparent)]
    Configuration(#[from] ConfigError),
}

impl LlmError {
    /// Map a transport error, keeping timeouts distinct.
    pub(crate) fn from_send(provider: &'static str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout { provider }
        } else {
            Self::Http(err)
        }
    }
}

impl Classify for LlmError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::Auth { .. } | Self::Quota { .. } => ErrorClass::QuotaAuth,
            Self::Timeout { .. } | Self::Http(_) => ErrorClass::TransientNetwork,
            Self::Api { status, .. } if *status >= 500 => ErrorClass::TransientNetwork,
            Self::Api { .. } | Self::EmptyResponse { .. } | Self::Parse { .. } => {
                ErrorClass::MalformedContent
            }
            Self::Configuration(_) => ErrorClass::Configuration,
        }
    }
}
