//! Archive records and the per-entry archive state machine.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::ErrorClass;

// ---------------------------------------------------------------------------
// ArchiveState
// ---------------------------------------------------------------------------

/// Lifecycle of one artifact entry with respect to the reference library.
///
/// ```text
/// unselected → selected → archiving → archived
///                                   → failed → archiving (retry)
/// ```
///
/// `selected` can fall back to `unselected` while the reviewer is still
/// editing. `archived` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ArchiveState {
    Unselected,
    Selected,
    Archiving,
    Archived,
    Failed,
}

impl ArchiveState {
    #[must_use]
    pub const fn allowed_next_states(self) -> &'static [Self] {
        match self {
            Self::Unselected => &[Self::Selected],
            Self::Selected => &[Self::Unselected, Self::Archiving],
            Self::Archiving => &[Self::Archived, Self::Failed],
            Self::Failed => &[Self::Archiving],
            Self::Archived => &[],
        }
    }

    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.allowed_next_states().contains(&next)
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unselected => "unselected",
            Self::Selected => "selected",
            Self::Archiving => "archiving",
            Self::Archived => "archived",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for ArchiveState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// ArchiveRecord
// ---------------------------------------------------------------------------

/// Proof that a paper reached the reference library. Written once, after the
/// item, the PDF and the note all exist.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ArchiveRecord {
    pub paper_id: String,
    pub item_key: String,
    pub pdf_path: PathBuf,
    pub note_path: PathBuf,
    pub archived_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// ArchiveOutcome
// ---------------------------------------------------------------------------

/// Per-entry result of one archive call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ArchiveOutcome {
    pub paper_id: String,
    pub title: String,
    pub state: ArchiveState,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_class: Option<ErrorClass>,
}

/// Message reported for entries archived by an earlier call.
pub const ALREADY_ARCHIVED: &str = "already archived";

impl ArchiveOutcome {
    #[must_use]
    pub fn archived(title: &str, record: &ArchiveRecord) -> Self {
        Self {
            paper_id: record.paper_id.clone(),
            title: title.to_string(),
            state: ArchiveState::Archived,
            message: format!("archived as {}", record.item_key),
            item_key: Some(record.item_key.clone()),
            error_class: None,
        }
    }

    #[must_use]
    pub fn already_archived(title: &str, record: &ArchiveRecord) -> Self {
        Self {
            paper_id: record.paper_id.clone(),
            title: title.to_string(),
            state: ArchiveState::Archived,
            message: ALREADY_ARCHIVED.to_string(),
            item_key: Some(record.item_key.clone()),
            error_class: None,
        }
    }

    #[must_use]
    pub fn failed(
        paper_id: &str,
        title: &str,
        item_key: Option<String>,
        class: ErrorClass,
        message: String,
    ) -> Self {
        Self {
            paper_id: paper_id.to_string(),
            title: title.to_string(),
            state: ArchiveState::Failed,
            message,
            item_key,
            error_class: Some(class),
        }
    }

    #[must_use]
    pub fn is_already_archived(&self) -> bool {
        self.state == ArchiveState::Archived && self.message == ALREADY_ARCHIVED
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn archived_is_terminal() {
        assert!(ArchiveState::Archived.allowed_next_states().is_empty());
    }

    #[test]
    fn failed_entries_can_be_retried() {
        assert!(ArchiveState::Failed.can_transition_to(ArchiveState::Archiving));
        assert!(!ArchiveState::Failed.can_transition_to(ArchiveState::Archived));
    }

    #[test]
    fn unselected_cannot_skip_to_archiving() {
        assert!(!ArchiveState::Unselected.can_transition_to(ArchiveState::Archiving));
        assert!(ArchiveState::Selected.can_transition_to(ArchiveState::Archiving));
    }
}
