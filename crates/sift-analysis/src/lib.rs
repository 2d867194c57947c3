//! # sift-analysis
//!
//! Template-driven analysis of papers through a language model.
//!
//! - [`TextGenerator`] is the single capability the engine needs; the
//!   provider clients in [`providers`] implement it and [`LlmBackend`]
//!   selects one from configuration.
//! - [`prompt`] assembles the per-field prompt from metadata and full text.
//! - [`score`] turns the assessment field into a score and tags.
//! - [`AnalysisEngine`] runs every field of a template for one paper, isolating
//!   failures per field.

use std::future::Future;

pub mod engine;
mod error;
mod http;
pub mod prompt;
pub mod providers;
pub mod score;

pub use engine::AnalysisEngine;
pub use error::LlmError;
pub use prompt::Prompt;
pub use providers::{ClientOptions, LlmBackend};
pub use score::{Assessment, parse_assessment};

/// Produces text for a prompt.
pub trait TextGenerator: Send + Sync {
    /// # Errors
    ///
    /// Returns [`LlmError`] on transport, credential, quota or response
    /// failures.
    fn generate(
        &self,
        prompt: &Prompt,
        max_tokens: u32,
    ) -> impl Future<Output = Result<String, LlmError>> + Send;
}
