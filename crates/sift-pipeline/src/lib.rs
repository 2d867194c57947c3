//! # sift-pipeline
//!
//! One run of Sift: discover unseen papers, resolve their content, analyze
//! them with bounded concurrency, and write a briefing artifact.
//!
//! Candidates are pulled lazily from the discovery cursor by a
//! `buffer_unordered` stream, so at most `general.workers` papers are in
//! flight and nothing beyond the cap is ever appended to the history.
//! Cancellation stops the pull, abandons in-flight work, and still writes
//! the entries that completed.

pub mod discovery;
pub mod scheduler;

mod error;
mod live;

pub use discovery::{Candidates, DiscoveryGate, RunRequest};
pub use error::PipelineError;
pub use live::LivePipeline;

use std::path::PathBuf;
use std::pin::pin;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Local;
use futures::StreamExt;
use futures::stream;
use serde::Serialize;
use sift_analysis::{AnalysisEngine, TextGenerator};
use sift_config::FeedConfig;
use sift_content::{ContentResolver, DocumentSource};
use sift_core::analysis::{AnalysisResult, sort_by_score};
use sift_core::artifact::BriefingArtifact;
use sift_core::paper::PaperRecord;
use sift_core::status::{RunStatus, Stage};
use sift_feed::FeedSource;
use sift_store::Stores;
use tokio_util::sync::CancellationToken;

/// Shared view of the current run, readable while it is in flight.
pub type StatusHandle = Arc<Mutex<RunStatus>>;

/// What a finished (or cancelled) run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunReport {
    /// `None` when no entry completed.
    pub artifact_id: Option<String>,
    pub path: Option<PathBuf>,
    pub entries: usize,
    pub cancelled: bool,
    pub warnings: Vec<String>,
}

impl RunReport {
    fn empty(cancelled: bool, warnings: Vec<String>) -> Self {
        Self {
            artifact_id: None,
            path: None,
            entries: 0,
            cancelled,
            warnings,
        }
    }

    /// One-line outcome for the status message.
    #[must_use]
    pub fn summary(&self) -> String {
        let base = match &self.artifact_id {
            Some(id) => format!("briefing {id} written with {} entries", self.entries),
            None => "no new papers".to_string(),
        };
        if self.cancelled {
            format!("{base} (cancelled)")
        } else {
            base
        }
    }
}

pub struct Pipeline<F, D, G> {
    feed: F,
    resolver: ContentResolver<D>,
    engine: AnalysisEngine<G>,
    stores: Arc<Stores>,
    feed_config: FeedConfig,
    workers: usize,
    status: StatusHandle,
}

impl<F, D, G> Pipeline<F, D, G>
where
    F: FeedSource,
    D: DocumentSource,
    G: TextGenerator,
{
    #[must_use]
    pub fn new(
        feed: F,
        resolver: ContentResolver<D>,
        engine: AnalysisEngine<G>,
        stores: Arc<Stores>,
        feed_config: FeedConfig,
        workers: usize,
    ) -> Self {
        Self {
            feed,
            resolver,
            engine,
            stores,
            feed_config,
            workers: workers.max(1),
            status: StatusHandle::default(),
        }
    }

    /// Report into an existing status handle instead of a private one.
    #[must_use]
    pub fn with_status(mut self, status: StatusHandle) -> Self {
        self.status = status;
        self
    }

    #[must_use]
    pub fn status(&self) -> StatusHandle {
        Arc::clone(&self.status)
    }

    #[must_use]
    pub fn snapshot(&self) -> RunStatus {
        self.update(|s| s.clone())
    }

    #[must_use]
    pub fn stores(&self) -> &Stores {
        &self.stores
    }

    /// Execute one run.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Busy`] if a run is already in flight on the
    /// same status handle, [`PipelineError::FeedExhausted`] if no feed query
    /// succeeded, and [`PipelineError::Store`] if the artifact cannot be
    /// written. Per-paper failures never fail the run.
    pub async fn run(
        &self,
        request: &RunRequest,
        cancel: &CancellationToken,
    ) -> Result<RunReport, PipelineError> {
        self.update(|s| {
            s.begin(format!(
                "run started: {} queries, up to {} papers",
                request.queries.len(),
                request.max_results
            ))
        })
        .map_err(|_| PipelineError::Busy)?;

        let outcome = self.execute(request, cancel).await;
        match &outcome {
            Ok(report) => {
                tracing::info!(
                    artifact = report.artifact_id.as_deref().unwrap_or("-"),
                    entries = report.entries,
                    cancelled = report.cancelled,
                    "run finished"
                );
                self.update(|s| s.finish(report.summary()));
            }
            Err(e) => {
                tracing::error!(%e, "run failed");
                self.update(|s| s.fail(format!("run failed: {e}")));
            }
        }
        outcome
    }

    async fn execute(
        &self,
        request: &RunRequest,
        cancel: &CancellationToken,
    ) -> Result<RunReport, PipelineError> {
        let gate = DiscoveryGate::new(&self.feed, &self.stores.history, &self.feed_config);
        let discovered = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            found = gate.discover(request) => Some(found?),
        };
        let Some(mut candidates) = discovered else {
            return Ok(RunReport::empty(true, Vec::new()));
        };

        let mut warnings = candidates.take_warnings();
        let expected = u64::try_from(candidates.expected()).unwrap_or(u64::MAX);
        self.update(|s| {
            for warning in &warnings {
                s.log(warning);
            }
            s.set_total(expected);
            s.set_stage(Stage::Analysis);
            s.log(&format!("{expected} new papers to analyze"));
        });

        let mut completed = pin!(stream::iter(candidates)
            .take_until(cancel.cancelled())
            .map(|candidate| async move {
                let paper = candidate?;
                Ok::<_, sift_store::StoreError>(tokio::select! {
                    biased;
                    () = cancel.cancelled() => None,
                    result = self.process(&paper) => Some(result),
                })
            })
            .buffer_unordered(self.workers));

        let mut entries = Vec::new();
        while let Some(item) = completed.next().await {
            match item {
                Ok(Some(result)) => {
                    self.update(|s| {
                        s.advance(1);
                        s.log(&format!(
                            "analyzed {} (score {}, {})",
                            result.paper.id, result.score, result.tier
                        ));
                    });
                    entries.push(result);
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(%e, "history append failed, discovery stopped");
                    let warning = format!("history append failed: {e}");
                    self.update(|s| s.log(&warning));
                    warnings.push(warning);
                }
            }
        }

        let cancelled = cancel.is_cancelled();
        self.update(|s| s.set_stage(Stage::Writing));
        if entries.is_empty() {
            return Ok(RunReport::empty(cancelled, warnings));
        }

        sort_by_score(&mut entries);
        let count = entries.len();
        let mut artifact = BriefingArtifact::new(
            String::new(),
            request.queries.clone(),
            self.engine.template(),
            entries,
        );
        let path = self
            .stores
            .artifacts
            .create(&mut artifact, Local::now().date_naive())?;

        Ok(RunReport {
            artifact_id: Some(artifact.id),
            path: Some(path),
            entries: count,
            cancelled,
            warnings,
        })
    }

    async fn process(&self, paper: &PaperRecord) -> AnalysisResult {
        let blob = self.resolver.resolve(paper).await;
        tracing::debug!(paper = %paper.id, tier = %blob.tier, chars = blob.text.len(), "content resolved");
        self.engine.analyze(paper, &blob).await
    }

    fn update<T>(&self, f: impl FnOnce(&mut RunStatus) -> T) -> T {
        let mut status = self.status.lock().unwrap_or_else(PoisonError::into_inner);
        f(&mut status)
    }
}
