//! Paper records emitted by discovery.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Metadata for one paper as reported by the search feed.
///
/// Created once by discovery and never mutated afterwards. `id` is the
/// source-assigned identifier with any version suffix removed (`2401.01234`,
/// `hep-th/9901001`); the suffix is kept separately in `version`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PaperRecord {
    pub id: String,
    pub version: Option<u32>,
    pub title: String,
    pub summary: String,
    pub authors: Vec<String>,
    pub published: DateTime<Utc>,
    pub updated: Option<DateTime<Utc>>,
    pub abs_url: String,
    pub pdf_url: String,
    pub categories: Vec<String>,
    pub doi: Option<String>,
}

impl PaperRecord {
    /// Filesystem-safe form of the identifier, used for every derived path.
    #[must_use]
    pub fn file_stem(&self) -> String {
        file_stem(&self.id)
    }

    /// Comma-separated author list, collapsed to "et al." past `max`.
    #[must_use]
    pub fn author_line(&self, max: usize) -> String {
        if self.authors.len() <= max {
            return self.authors.join(", ");
        }
        let mut line = self.authors[..max].join(", ");
        line.push_str(" et al.");
        line
    }

    /// Publication date as `YYYY-MM-DD`.
    #[must_use]
    pub fn published_date(&self) -> String {
        self.published.format("%Y-%m-%d").to_string()
    }
}

/// Replace path separators so an identifier can name a file.
#[must_use]
pub fn file_stem(id: &str) -> String {
    id.chars()
        .map(|c| match c {
            '/' | '\\' | ':' => '_',
            c => c,
        })
        .collect()
}

/// Split a raw feed identifier into its bare id and version.
///
/// Accepts either a bare id (`2401.01234v2`) or an abstract URL
/// (`http://arxiv.org/abs/2401.01234v2`).
#[must_use]
pub fn split_versioned_id(raw: &str) -> (String, Option<u32>) {
    let trimmed = raw.trim();
    let bare = trimmed
        .find("/abs/")
        .map_or(trimmed, |idx| &trimmed[idx + "/abs/".len()..]);

    if let Some(pos) = bare.rfind('v') {
        let (head, tail) = bare.split_at(pos);
        let digits = &tail[1..];
        if !head.is_empty()
            && !digits.is_empty()
            && digits.chars().all(|c| c.is_ascii_digit())
            && head.ends_with(|c: char| c.is_ascii_digit())
        {
            return (head.to_string(), digits.parse().ok());
        }
    }
    (bare.to_string(), None)
}
