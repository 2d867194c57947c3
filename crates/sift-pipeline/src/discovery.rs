//! Discovery and dedup gate.
//!
//! Queries the feed once per expression, merges the answers by identifier,
//! and hands out candidates lazily through [`Candidates`]. A candidate is
//! appended to the history before it is yielded, so a crash after the append
//! can lose a paper from one briefing but never duplicate it in the next.

use std::collections::{HashMap, VecDeque};

use sift_config::{FeedConfig, ScheduleConfig};
use sift_core::paper::PaperRecord;
use sift_feed::query::build_expressions;
use sift_feed::{DateRange, FeedError, FeedQuery, FeedSource, RankedPaper};
use sift_store::{HistoryStore, StoreError};

use crate::error::PipelineError;

/// What one run asks discovery for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunRequest {
    pub queries: Vec<String>,
    pub max_results: usize,
    pub range: Option<DateRange>,
}

impl RunRequest {
    /// Configured feed queries and cap, no date range.
    #[must_use]
    pub fn from_feed(config: &FeedConfig) -> Self {
        Self {
            queries: config.queries.clone(),
            max_results: config.max_results,
            range: None,
        }
    }

    /// Request for a scheduled run. Empty schedule queries fall back to the
    /// feed queries.
    #[must_use]
    pub fn scheduled(schedule: &ScheduleConfig, feed: &FeedConfig) -> Self {
        let queries = if schedule.queries.is_empty() {
            feed.queries.clone()
        } else {
            schedule.queries.clone()
        };
        Self {
            queries,
            max_results: schedule.max_results,
            range: None,
        }
    }
}

pub struct DiscoveryGate<'a, F> {
    feed: &'a F,
    history: &'a HistoryStore,
    config: &'a FeedConfig,
}

impl<'a, F: FeedSource> DiscoveryGate<'a, F> {
    #[must_use]
    pub const fn new(feed: &'a F, history: &'a HistoryStore, config: &'a FeedConfig) -> Self {
        Self {
            feed,
            history,
            config,
        }
    }

    /// Query the feed and return the candidate cursor.
    ///
    /// A failed query is logged and reported in [`Candidates::warnings`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Feed`] if no expression can be built, and
    /// [`PipelineError::FeedExhausted`] if every query failed.
    pub async fn discover(
        &self,
        request: &RunRequest,
    ) -> Result<Candidates<'a>, PipelineError> {
        let expressions = build_expressions(
            &request.queries,
            self.config.query_mode,
            self.config.combine,
            request.range.as_ref(),
        )?;
        let fetch = request
            .max_results
            .saturating_mul(self.config.fetch_multiplier.max(1));

        let mut merged: HashMap<String, RankedPaper> = HashMap::new();
        let mut warnings = Vec::new();
        let mut last_error: Option<FeedError> = None;
        let mut failed = 0;

        for expression in &expressions {
            let query = FeedQuery {
                expression: expression.clone(),
                start: 0,
                max_results: fetch,
                sort_by: self.config.sort_by,
            };
            match self.feed.search(&query).await {
                Ok(papers) => {
                    tracing::debug!(%expression, found = papers.len(), "feed query done");
                    for ranked in papers {
                        merge(&mut merged, ranked);
                    }
                }
                Err(e) => {
                    tracing::warn!(%expression, %e, "feed query failed");
                    warnings.push(format!("query {expression} failed: {e}"));
                    failed += 1;
                    last_error = Some(e);
                }
            }
        }

        if failed == expressions.len() && merged.is_empty() {
            if let Some(e) = last_error {
                return Err(PipelineError::FeedExhausted(e));
            }
        }

        let mut ordered: Vec<RankedPaper> = merged.into_values().collect();
        ordered.sort_by(|a, b| {
            a.rank
                .cmp(&b.rank)
                .then_with(|| b.paper.published.cmp(&a.paper.published))
                .then_with(|| a.paper.id.cmp(&b.paper.id))
        });

        Ok(Candidates {
            pending: ordered.into_iter().map(|r| r.paper).collect(),
            history: self.history,
            remaining: request.max_results,
            warnings,
            fused: false,
        })
    }
}

/// Keep the best rank for each identifier.
fn merge(merged: &mut HashMap<String, RankedPaper>, ranked: RankedPaper) {
    match merged.get(&ranked.paper.id) {
        Some(existing) if existing.rank <= ranked.rank => {}
        _ => {
            merged.insert(ranked.paper.id.clone(), ranked);
        }
    }
}

/// Lazy cursor over unseen candidates, capped at the requested count.
///
/// Yields `Err` once if the history cannot be appended to, then ends.
pub struct Candidates<'a> {
    pending: VecDeque<PaperRecord>,
    history: &'a HistoryStore,
    remaining: usize,
    warnings: Vec<String>,
    fused: bool,
}

impl Candidates<'_> {
    /// Upper bound on what the cursor will still yield.
    #[must_use]
    pub fn expected(&self) -> usize {
        self.pending
            .iter()
            .filter(|p| !self.history.contains(&p.id))
            .count()
            .min(self.remaining)
    }

    /// Per-query failures that did not stop discovery.
    #[must_use]
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn take_warnings(&mut self) -> Vec<String> {
        std::mem::take(&mut self.warnings)
    }
}

impl Iterator for Candidates<'_> {
    type Item = Result<PaperRecord, StoreError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.fused || self.remaining == 0 {
            return None;
        }
        while let Some(paper) = self.pending.pop_front() {
            // One short append on the polling thread. `block_in_place` is not
            // an option: it panics on a current-thread runtime.
            match self.history.record(&paper.id) {
                Ok(true) => {
                    self.remaining -= 1;
                    return Some(Ok(paper));
                }
                Ok(false) => {}
                Err(e) => {
                    self.fused = true;
                    return Some(Err(e));
                }
            }
        }
        None
    }
}
