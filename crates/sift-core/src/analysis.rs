//! Generated analysis for one paper.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::content::Tier;
use crate::errors::ErrorClass;
use crate::paper::PaperRecord;

/// Score used when the assessment is missing or unparseable.
pub const NEUTRAL_SCORE: u8 = 5;

/// Highest valid score.
pub const MAX_SCORE: u8 = 10;

/// Entries at or above this score are listed as recommended.
pub const RECOMMENDED_THRESHOLD: u8 = 6;

/// Field text recorded when analysis was switched off for the run.
pub const NOT_ANALYZED: &str = "[not analyzed]";

/// Field text recorded when generation failed for that field.
#[must_use]
pub fn generation_failed(class: ErrorClass) -> String {
    format!("[generation failed: {class}]")
}

/// Output of one template field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FieldOutput {
    pub key: String,
    pub label: String,
    pub text: String,
    #[serde(default)]
    pub failed: bool,
}

/// Structured analysis of one paper.
///
/// Constructed by the analysis engine and never mutated afterwards except for
/// `selected`, which only the reviewer changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AnalysisResult {
    pub paper: PaperRecord,
    /// Field outputs in template order.
    pub fields: Vec<FieldOutput>,
    pub score: u8,
    pub tags: Vec<String>,
    pub generated_at: DateTime<Utc>,
    /// Content tier the analysis was generated from.
    pub tier: Tier,
    #[serde(default)]
    pub selected: bool,
}

impl AnalysisResult {
    #[must_use]
    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.key == key)
            .map(|f| f.text.as_str())
    }

    #[must_use]
    pub fn failed_fields(&self) -> Vec<&str> {
        self.fields
            .iter()
            .filter(|f| f.failed)
            .map(|f| f.key.as_str())
            .collect()
    }

    #[must_use]
    pub const fn is_recommended(&self) -> bool {
        self.score >= RECOMMENDED_THRESHOLD
    }
}

/// Order entries by score descending; ties keep their incoming order.
pub fn sort_by_score(entries: &mut [AnalysisResult]) {
    entries.sort_by(|a, b| b.score.cmp(&a.score));
}
