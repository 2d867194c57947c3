//! Dedup history line format.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One line of the dedup history. Appended when discovery emits a paper;
/// never rewritten or pruned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct HistoryEntry {
    pub id: String,
    pub date_fetched: DateTime<Utc>,
    pub status: HistoryStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum HistoryStatus {
    /// Emitted to the analysis stage.
    Processed,
}

impl HistoryEntry {
    #[must_use]
    pub fn processed(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            date_fetched: Utc::now(),
            status: HistoryStatus::Processed,
        }
    }
}
