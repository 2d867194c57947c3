//! Pipeline wired to the real arXiv feed, HTTP downloads and LLM backend.

use std::sync::Arc;

use sift_analysis::{AnalysisEngine, LlmBackend};
use sift_config::SiftConfig;
use sift_content::{ContentResolver, HttpDocumentSource};
use sift_feed::ArxivClient;
use sift_store::Stores;

use crate::error::PipelineError;
use crate::Pipeline;

pub type LivePipeline = Pipeline<ArxivClient, HttpDocumentSource, LlmBackend>;

impl LivePipeline {
    /// Build every collaborator from configuration.
    ///
    /// With `analyze` off no LLM credential is needed and entries carry
    /// placeholder fields.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Config`] or [`PipelineError::Llm`] for a bad
    /// template or missing credential, and [`PipelineError::Store`] if the
    /// data directory cannot be opened.
    pub fn from_config(config: &SiftConfig, analyze: bool) -> Result<Self, PipelineError> {
        let template = config.analysis_template()?;
        let user_agent = config.general.user_agent.as_str();

        let engine = if analyze {
            let backend = LlmBackend::from_config(&config.llm, user_agent)?;
            AnalysisEngine::new(backend, template, config.llm.max_tokens)
        } else {
            AnalysisEngine::metadata_only(template)
        };

        let stores = Stores::open(
            config.data_dir(),
            config.acquisition.pdf_ttl_days,
            config.acquisition.source_ttl_days,
        )?;
        let resolver = ContentResolver::new(
            HttpDocumentSource::new(&config.acquisition, user_agent)?,
            Arc::clone(&stores.cache),
            config.acquisition.clone(),
        );
        tracing::debug!(
            data_dir = %stores.data_dir.display(),
            workers = config.general.workers,
            analyze,
            "pipeline ready"
        );

        Ok(Self::new(
            ArxivClient::new(&config.feed, user_agent)?,
            resolver,
            engine,
            Arc::new(stores),
            config.feed.clone(),
            config.general.workers,
        ))
    }
}
