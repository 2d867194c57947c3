//! Text normalization and budget truncation shared by both tiers.

use std::sync::LazyLock;

use regex::Regex;
use sift_core::content::CHARS_PER_TOKEN;

/// Appended after text cut to fit the budget.
pub const TRUNCATED_MARKER: &str = "[truncated]";

/// Smallest character budget ever applied.
const MIN_CHARS: usize = 400;

static HYPHEN_BREAK: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"-\n([a-z])").expect("valid regex"));
static HORIZONTAL_WS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[ \t]+").expect("valid regex"));
static BLANK_RUNS: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

/// Drop NULs, join words hyphenated across lines, collapse spaces and blank
/// line runs.
#[must_use]
pub fn clean_text(text: &str) -> String {
    let text = text.replace('\0', " ");
    let text = HYPHEN_BREAK.replace_all(&text, "$1");
    let text = HORIZONTAL_WS.replace_all(&text, " ");
    let text = BLANK_RUNS.replace_all(&text, "\n\n");
    text.trim().to_string()
}

/// Keep at most `max_tokens` worth of characters.
///
/// The cut moves back to the last paragraph break when that still keeps more
/// than 70% of the budget. Text that fits is returned unchanged.
#[must_use]
pub fn truncate_to_tokens(text: &str, max_tokens: usize) -> String {
    let max_chars = MIN_CHARS.max(max_tokens.saturating_mul(CHARS_PER_TOKEN));
    let Some((cut, _)) = text.char_indices().nth(max_chars) else {
        return text.to_string();
    };

    let mut trimmed = &text[..cut];
    if let Some(last_break) = trimmed.rfind("\n\n") {
        let kept = trimmed[..last_break].chars().count();
        if kept * 10 > max_chars * 7 {
            trimmed = &trimmed[..last_break];
        }
    }
    format!("{trimmed}\n\n{TRUNCATED_MARKER}")
}
