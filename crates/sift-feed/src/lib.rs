//! # sift-feed
//!
//! arXiv search feed client for Sift.
//!
//! Builds search expressions from query strings, fetches the Atom feed with
//! bounded retries, and maps entries to [`PaperRecord`]s tagged with their
//! relevance rank. The [`FeedSource`] trait is the seam discovery depends on,
//! so tests can substitute an in-memory feed.

pub mod atom;
pub mod query;

mod error;
mod http;

pub use error::FeedError;
pub use query::DateRange;
pub use sift_core::retry::RetryPolicy;

use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use sift_config::{FeedConfig, SortBy};
use sift_core::paper::PaperRecord;

use crate::http::check_response;

// ── Types ──────────────────────────────────────────────────────────

/// One search request against the feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedQuery {
    /// Full search expression, date clause included.
    pub expression: String,
    pub start: usize,
    pub max_results: usize,
    pub sort_by: SortBy,
}

/// A paper with its 0-based position in the feed's ordering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedPaper {
    pub rank: usize,
    pub paper: PaperRecord,
}

/// Anything that can answer a feed query.
pub trait FeedSource: Send + Sync {
    /// Run one search.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError`] when the feed cannot be queried or read.
    fn search(
        &self,
        query: &FeedQuery,
    ) -> impl Future<Output = Result<Vec<RankedPaper>, FeedError>> + Send;
}

// ── Client ─────────────────────────────────────────────────────────

/// HTTP client for the arXiv Atom API.
pub struct ArxivClient {
    http: reqwest::Client,
    base_url: String,
    retry: RetryPolicy,
}

impl ArxivClient {
    /// Create a client from feed configuration.
    ///
    /// # Errors
    ///
    /// Returns [`FeedError::Http`] if the underlying `reqwest::Client` fails to build.
    pub fn new(config: &FeedConfig, user_agent: &str) -> Result<Self, FeedError> {
        Ok(Self {
            http: reqwest::Client::builder()
                .user_agent(user_agent)
                .timeout(Duration::from_secs(config.timeout_secs))
                .build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            retry: config.retry_policy(),
        })
    }

    fn request_url(&self, query: &FeedQuery) -> String {
        format!(
            "{}?search_query={}&start={}&max_results={}&sortBy={}&sortOrder=descending",
            self.base_url,
            urlencoding::encode(&query.expression),
            query.start,
            query.max_results,
            query.sort_by.as_param()
        )
    }

    async fn fetch_once(&self, url: &str, start: usize) -> Result<Vec<RankedPaper>, FeedError> {
        let resp = check_response(self.http.get(url).send().await?).await?;
        let body = resp.text().await?;
        let papers = atom::parse_feed(&body)?;
        Ok(papers
            .into_iter()
            .enumerate()
            .map(|(i, paper)| RankedPaper {
                rank: start + i,
                paper,
            })
            .collect())
    }
}

impl FeedSource for ArxivClient {
    async fn search(&self, query: &FeedQuery) -> Result<Vec<RankedPaper>, FeedError> {
        let url = self.request_url(query);
        tracing::debug!(expression = %query.expression, %url, "querying feed");
        let papers = self
            .retry
            .run(&query.expression, || self.fetch_once(&url, query.start))
            .await?;
        tracing::info!(expression = %query.expression, count = papers.len(), "feed search complete");
        Ok(papers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> ArxivClient {
        ArxivClient::new(&FeedConfig::default(), "sift-test").unwrap()
    }

    #[test]
    fn request_url_encodes_expression() {
        let url = client().request_url(&FeedQuery {
            expression: "ti:\"large language model\" AND abs:\"RAG\"".into(),
            start: 0,
            max_results: 90,
            sort_by: SortBy::SubmittedDate,
        });
        assert_eq!(
            url,
            "https://export.arxiv.org/api/query?search_query=ti%3A%22large%20language%20model%22%20AND%20abs%3A%22RAG%22&start=0&max_results=90&sortBy=submittedDate&sortOrder=descending"
        );
    }

    #[tokio::test]
    #[ignore] // requires network
    async fn live_search() {
        let papers = client()
            .search(&FeedQuery {
                expression: "\"retrieval augmented generation\"".into(),
                start: 0,
                max_results: 5,
                sort_by: SortBy::Relevance,
            })
            .await
            .unwrap();
        for p in &papers {
            println!("[{}] {} {}", p.rank, p.paper.id, p.paper.title);
        }
        assert!(!papers.is_empty());
    }
}
