//! Pipeline error types.

use sift_analysis::LlmError;
use sift_config::ConfigError;
use sift_content::FetchError;
use sift_core::errors::{Classify, CoreError, ErrorClass};
use sift_feed::FeedError;
use sift_store::StoreError;
use thiserror::Error;

/// Run-level failures. Per-paper problems never surface here; they degrade
/// the entry instead.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("a run is already in progress")]
    Busy,

    /// Every feed query failed and no candidate was found.
    #[error("every feed query failed: {0}")]
    FeedExhausted(#[source] FeedError),

    #[error(transparent)]
    Feed(#[from] FeedError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Llm(#[from] LlmError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Core(#[from] CoreError),
}

impl Classify for PipelineError {
    fn class(&self) -> ErrorClass {
        match self {
            Self::Busy => ErrorClass::Conflict,
            Self::FeedExhausted(e) | Self::Feed(e) => e.class(),
            Self::Store(e) => e.class(),
            Self::Config(e) => e.class(),
            Self::Llm(e) => e.class(),
            Self::Fetch(e) => e.class(),
            Self::Core(e) => e.class(),
        }
    }
}
