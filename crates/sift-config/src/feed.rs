//! Search feed configuration.

use serde::{Deserialize, Serialize};
use sift_core::retry::RetryPolicy;

/// How a single query string is turned into a feed expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QueryMode {
    /// Quoted phrase over all fields.
    #[default]
    Phrase,
    /// Phrase in the title or the abstract.
    TitleAbstract,
    Title,
    Abstract,
}

/// How several query strings are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CombineMode {
    /// One search per query string, results merged.
    #[default]
    Any,
    /// A single conjunctive search.
    All,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    Relevance,
    SubmittedDate,
    LastUpdatedDate,
}

impl SortBy {
    /// Value of the feed's `sortBy` parameter.
    #[must_use]
    pub const fn as_param(self) -> &'static str {
        match self {
            Self::Relevance => "relevance",
            Self::SubmittedDate => "submittedDate",
            Self::LastUpdatedDate => "lastUpdatedDate",
        }
    }
}

fn default_base_url() -> String {
    "https://export.arxiv.org/api/query".to_string()
}

fn default_queries() -> Vec<String> {
    [
        "LLM",
        "large language model",
        "retrieval augmented generation",
        "RAG",
        "agent",
    ]
    .iter()
    .map(ToString::to_string)
    .collect()
}

const fn default_max_results() -> usize {
    30
}

const fn default_fetch_multiplier() -> usize {
    3
}

const fn default_timeout_secs() -> u64 {
    30
}

const fn default_retry_attempts() -> u32 {
    3
}

const fn default_base_delay_ms() -> u64 {
    1_000
}

const fn default_max_delay_ms() -> u64 {
    16_000
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct FeedConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Queries used when a run names none.
    #[serde(default = "default_queries")]
    pub queries: Vec<String>,

    #[serde(default)]
    pub query_mode: QueryMode,

    #[serde(default)]
    pub combine: CombineMode,

    #[serde(default)]
    pub sort_by: SortBy,

    /// Cap on papers emitted per run.
    #[serde(default = "default_max_results")]
    pub max_results: usize,

    /// Over-fetch factor so history filtering can still fill the cap.
    #[serde(default = "default_fetch_multiplier")]
    pub fetch_multiplier: usize,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
}

impl FeedConfig {
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::from_millis(self.retry_attempts, self.base_delay_ms, self.max_delay_ms)
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            queries: default_queries(),
            query_mode: QueryMode::default(),
            combine: CombineMode::default(),
            sort_by: SortBy::default(),
            max_results: default_max_results(),
            fetch_multiplier: default_fetch_multiplier(),
            timeout_secs: default_timeout_secs(),
            retry_attempts: default_retry_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
        }
    }
}
