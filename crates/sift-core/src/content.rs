//! Extracted paper content and the extraction tier it came from.

use std::fmt;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Rough characters-per-token ratio used for budgets and estimates.
pub const CHARS_PER_TOKEN: usize = 4;

/// Extraction method that produced a [`ContentBlob`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Pdf,
    Source,
    None,
}

impl Tier {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Source => "source",
            Self::None => "none",
        }
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full text of one paper at one tier.
///
/// A blob with tier [`Tier::None`] has empty text and means "analyze from
/// metadata only"; it is a normal value, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ContentBlob {
    pub paper_id: String,
    pub tier: Tier,
    pub text: String,
    /// Size of the downloaded document the text was extracted from.
    pub byte_size: u64,
    pub extracted_at: DateTime<Utc>,
    pub page_count: Option<u32>,
    pub token_estimate: usize,
}

impl ContentBlob {
    #[must_use]
    pub fn new(
        paper_id: impl Into<String>,
        tier: Tier,
        text: String,
        byte_size: u64,
        page_count: Option<u32>,
    ) -> Self {
        let token_estimate = estimate_tokens(&text);
        Self {
            paper_id: paper_id.into(),
            tier,
            text,
            byte_size,
            extracted_at: Utc::now(),
            page_count,
            token_estimate,
        }
    }

    /// The metadata-only blob.
    #[must_use]
    pub fn none(paper_id: impl Into<String>) -> Self {
        Self::new(paper_id, Tier::None, String::new(), 0, None)
    }

    #[must_use]
    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    #[must_use]
    pub fn has_text(&self) -> bool {
        self.tier != Tier::None && !self.text.trim().is_empty()
    }
}

#[must_use]
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / CHARS_PER_TOKEN
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn none_blob_has_no_text() {
        let blob = ContentBlob::none("2401.00001");
        assert_eq!(blob.tier, Tier::None);
        assert!(!blob.has_text());
        assert_eq!(blob.token_estimate, 0);
    }

    #[test]
    fn token_estimate_follows_char_count() {
        let blob = ContentBlob::new("x", Tier::Pdf, "a".repeat(4001), 10, Some(3));
        assert_eq!(blob.token_estimate, 1000);
        assert!(blob.has_text());
    }
}
