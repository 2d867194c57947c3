//! Cross-cutting error types for Sift.
//!
//! Domain-specific errors (e.g., `FeedError`, `StoreError`) live in their
//! respective crates. Every one of them implements [`Classify`] so callers can
//! decide between retrying, degrading, and aborting without matching on
//! concrete variants. The binary converges everything into `anyhow`.

use std::fmt;

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can be raised by any Sift crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Entity lookup returned no result.
    #[error("Entity not found: {entity_type} {id}")]
    NotFound { entity_type: String, id: String },

    /// A state machine transition was attempted that is not allowed.
    #[error("Invalid state transition: {entity_type} {id} from {from} to {to}")]
    InvalidTransition {
        entity_type: String,
        id: String,
        from: String,
        to: String,
    },

    /// Data failed validation (schema, format, constraints).
    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Coarse failure classes shared by every component.
///
/// | class | typical cause | handling |
/// |-------|---------------|----------|
/// | `transient_network` | timeout, connection reset, 5xx | retry with backoff, then degrade |
/// | `quota_auth` | 401/403/429 from a provider | no retry inside the run |
/// | `malformed_content` | unparseable PDF, bad feed XML | next tier or skip |
/// | `conflict` | reference item already exists | treat as success |
/// | `configuration` | missing credential, bad template | fail the run before work starts |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    TransientNetwork,
    QuotaAuth,
    MalformedContent,
    Conflict,
    Configuration,
}

impl ErrorClass {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::TransientNetwork => "transient_network",
            Self::QuotaAuth => "quota_auth",
            Self::MalformedContent => "malformed_content",
            Self::Conflict => "conflict",
            Self::Configuration => "configuration",
        }
    }

    /// Whether another attempt inside the same run may succeed.
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::TransientNetwork)
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Maps a concrete error onto the shared [`ErrorClass`] taxonomy.
pub trait Classify {
    fn class(&self) -> ErrorClass;
}

impl Classify for CoreError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::NotFound { .. } | Self::Validation(_) | Self::Serialization(_) => {
                ErrorClass::MalformedContent
            }
            Self::InvalidTransition { .. } => ErrorClass::Conflict,
        }
    }
}
