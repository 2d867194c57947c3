//! Score and tag extraction from the assessment field.
//!
//! Precedence: a JSON object `{"score": n, "tags": [...]}` (bare, fenced, or
//! embedded in prose; trailing commas tolerated), then the number after a
//! `score` label, then the first number in the text. A range yields its lower
//! bound. Anything outside `[0, 10]` or no number at all gives the neutral
//! score.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use sift_core::analysis::{MAX_SCORE, NEUTRAL_SCORE};

/// Maximum number of tags kept per paper.
pub const MAX_TAGS: usize = 8;

/// A number, optionally followed by a range upper bound which is ignored.
const NUMBER: &str = r"(-?\d+(?:\.\d+)?)(?:\s*(?:-|–|—|to)\s*\d+(?:\.\d+)?)?";

static NUMBER_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(NUMBER).expect("valid regex"));

static LABELLED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"(?i)\bscore\b[^\d\n]{{0,16}}?{NUMBER}")).expect("valid regex")
});

static TAGS_LINE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?im)^[\s>*-]*(?:\*\*)?tags(?:\*\*)?\s*[:：]\s*(?:\*\*)?\s*(.+)$")
        .expect("valid regex")
});

static FENCED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```(?:json|JSON)?\s*(\{.*?\})\s*```").expect("valid regex")
});

static TRAILING_COMMA_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r",\s*([}\]])").expect("valid regex"));

/// Parsed assessment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assessment {
    pub score: u8,
    pub tags: Vec<String>,
}

impl Default for Assessment {
    fn default() -> Self {
        Self {
            score: NEUTRAL_SCORE,
            tags: Vec::new(),
        }
    }
}

/// Parse score and tags from free-form model output. Never fails.
#[must_use]
pub fn parse_assessment(text: &str) -> Assessment {
    let json = find_json_object(text);

    let score = json
        .as_ref()
        .and_then(|obj| obj.get("score"))
        .and_then(json_score)
        .or_else(|| LABELLED_RE.captures(text).map(|c| clamp_score(&c[1])))
        .or_else(|| NUMBER_RE.captures(text).map(|c| clamp_score(&c[1])))
        .unwrap_or(NEUTRAL_SCORE);

    let raw_tags: Vec<String> = match json.as_ref().and_then(|obj| obj.get("tags")) {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect(),
        Some(Value::String(s)) => split_tags(s),
        _ => TAGS_LINE_RE
            .captures(text)
            .map(|c| split_tags(&c[1]))
            .unwrap_or_default(),
    };

    Assessment {
        score,
        tags: normalize_tags(raw_tags),
    }
}

/// First JSON object found in `text`, after repairing trailing commas.
fn find_json_object(text: &str) -> Option<serde_json::Map<String, Value>> {
    let trimmed = text.trim();
    let mut candidates: Vec<&str> = vec![trimmed];
    if let Some(c) = FENCED_RE.captures(trimmed) {
        if let Some(m) = c.get(1) {
            candidates.push(m.as_str());
        }
    }
    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
        if start < end {
            candidates.push(&trimmed[start..=end]);
        }
    }

    candidates.into_iter().find_map(|candidate| {
        let parsed = serde_json::from_str::<Value>(candidate).ok().or_else(|| {
            let repaired = TRAILING_COMMA_RE.replace_all(candidate, "$1");
            serde_json::from_str::<Value>(&repaired).ok()
        });
        match parsed {
            Some(Value::Object(map)) => Some(map),
            _ => None,
        }
    })
}

fn json_score(value: &Value) -> Option<u8> {
    match value {
        Value::Number(n) => n.as_f64().map(score_from_f64),
        Value::String(s) => NUMBER_RE.captures(s).map(|c| clamp_score(&c[1])),
        _ => None,
    }
}

fn clamp_score(raw: &str) -> u8 {
    raw.parse::<f64>().map_or(NEUTRAL_SCORE, score_from_f64)
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn score_from_f64(value: f64) -> u8 {
    if value.is_finite() && (0.0..=f64::from(MAX_SCORE)).contains(&value) {
        value.trunc() as u8
    } else {
        NEUTRAL_SCORE
    }
}

fn split_tags(raw: &str) -> Vec<String> {
    raw.split([',', ';']).map(str::to_string).collect()
}

fn normalize_tags(raw: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .map(|t| {
            t.trim()
                .trim_matches(|c: char| matches!(c, '"' | '\'' | '`' | '[' | ']' | '*'))
                .trim()
                .trim_start_matches('#')
                .trim()
                .to_string()
        })
        .filter(|t| !t.is_empty())
        .filter(|t| seen.insert(t.to_lowercase()))
        .take(MAX_TAGS)
        .collect()
}
