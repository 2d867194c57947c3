//! PDF body extraction.
//!
//! Raw page text comes from `pdf-extract`. Body selection then finds the
//! introduction, drops running headers and footers, and stops at the
//! references.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::FetchError;
use crate::truncate::clean_text;

/// Pages searched for the introduction heading.
const INTRO_SCAN_PAGES: usize = 12;

/// Lines longer than this are never treated as headers or footers.
const MAX_REPEAT_LINE_CHARS: usize = 80;

/// Pages a line must appear on to count as a running header or footer.
const MIN_REPEATS: usize = 3;

static INTRO: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b1\s*\.?\s*introduction\b|\bintroduction\b|\b引言\b").expect("valid regex")
});
static CONTENTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bcontents\b").expect("valid regex"));
static REFERENCES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\breferences\b|\bbibliography\b|\b参考文献\b|\bappendix\b").expect("valid regex")
});
static PAGE_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\d+|page\s*\d+(?:\s*/\s*\d+)?|\d+\s*/\s*\d+)$").expect("valid regex")
});

/// Extracted body and the document's page count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PdfText {
    pub body: Option<String>,
    pub page_count: u32,
}

/// Extract body text from PDF bytes on the blocking pool.
///
/// # Errors
///
/// Returns [`FetchError::Extraction`] if the PDF cannot be parsed.
pub async fn extract_body(bytes: Vec<u8>, max_pages: usize) -> Result<PdfText, FetchError> {
    tokio::task::spawn_blocking(move || {
        let pages = pdf_extract::extract_text_from_mem_by_pages(&bytes)
            .map_err(|e| FetchError::Extraction(e.to_string()))?;
        Ok(PdfText {
            page_count: u32::try_from(pages.len()).unwrap_or(u32::MAX),
            body: select_body(&pages, max_pages),
        })
    })
    .await
    .map_err(|e| FetchError::Extraction(format!("extraction task failed: {e}")))?
}

/// Choose the body pages of a paper from raw per-page text.
///
/// Starts at the first page (of the first 12) that mentions an introduction
/// and is not a table of contents; without one, skips the title page. Keeps
/// at most `max_pages` pages and stops early at a references or appendix
/// page. Page numbers, `arXiv:` stamps and lines repeated on three or more
/// pages are removed.
#[must_use]
pub fn select_body(pages: &[String], max_pages: usize) -> Option<String> {
    let pages: Vec<Vec<&str>> = pages
        .iter()
        .map(|p| p.lines().map(str::trim).filter(|l| !l.is_empty()).collect())
        .collect();
    if pages.is_empty() {
        return None;
    }

    let repeats = count_repeats(&pages);
    let intro_idx = pages
        .iter()
        .take(INTRO_SCAN_PAGES)
        .position(|lines| is_intro_page(&lines.join("\n")))
        .unwrap_or(usize::from(pages.len() > 1));

    let end = pages.len().min(intro_idx + max_pages.max(1));
    let mut body = Vec::new();
    for (i, lines) in pages.iter().enumerate().take(end).skip(intro_idx) {
        let kept: Vec<&str> = lines
            .iter()
            .copied()
            .filter(|line| !is_noise(line, &repeats))
            .collect();
        let text = kept.join("\n");
        if i > intro_idx && REFERENCES.is_match(&text) {
            break;
        }
        let cleaned = clean_text(&text);
        if !cleaned.is_empty() {
            body.push(cleaned);
        }
    }

    (!body.is_empty()).then(|| body.join("\n\n"))
}

fn is_intro_page(text: &str) -> bool {
    !CONTENTS.is_match(text) && INTRO.is_match(text)
}

fn looks_like_page_number(line: &str) -> bool {
    PAGE_NUMBER.is_match(&line.trim().to_lowercase())
}

/// Key under which header and footer lines are counted: lowercase, no
/// digits or punctuation, single spaces.
fn normalize_for_repeat(line: &str) -> String {
    let kept: String = line
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_ascii_digit() && (c.is_alphanumeric() || *c == '_' || c.is_whitespace()))
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn count_repeats(pages: &[Vec<&str>]) -> HashMap<String, usize> {
    let mut counts = HashMap::new();
    for line in pages.iter().flatten() {
        if line.chars().count() > MAX_REPEAT_LINE_CHARS || looks_like_page_number(line) {
            continue;
        }
        let norm = normalize_for_repeat(line);
        if norm.chars().count() < 4 {
            continue;
        }
        *counts.entry(norm).or_insert(0) += 1;
    }
    counts
}

fn is_noise(line: &str, repeats: &HashMap<String, usize>) -> bool {
    if looks_like_page_number(line) || line.to_lowercase().contains("arxiv:") {
        return true;
    }
    let norm = normalize_for_repeat(line);
    !norm.is_empty()
        && norm.chars().count() <= 60
        && repeats.get(&norm).copied().unwrap_or(0) >= MIN_REPEATS
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn page(lines: &[&str]) -> String {
        lines.join("\n")
    }

    fn paper() -> Vec<String> {
        vec![
            page(&["Proceedings of Something 2024", "A Title", "Abstract text", "arXiv:2401.01234v1 [cs.CL]", "1"]),
            page(&["Proceedings of Something 2024", "1 Introduction", "Large models are", "useful.", "2"]),
            page(&["Proceedings of Something 2024", "2 Method", "We propose a meth-", "od that works.", "Page 3"]),
            page(&["Proceedings of Something 2024", "References", "[1] A. Author. 2020.", "4/9"]),
        ]
    }

    #[test]
    fn selects_body_between_intro_and_references() {
        let body = select_body(&paper(), 15).unwrap();
        assert_eq!(
            body,
            "1 Introduction\nLarge models are\nuseful.\n\n2 Method\nWe propose a method that works."
        );
    }

    #[test]
    fn page_budget_limits_body() {
        let body = select_body(&paper(), 1).unwrap();
        assert!(body.starts_with("1 Introduction"));
        assert!(!body.contains("Method"));
    }

    #[test]
    fn table_of_contents_is_not_the_introduction() {
        let pages = vec![
            page(&["Contents", "1 Introduction ..... 2"]),
            page(&["1 Introduction", "Real body."]),
        ];
        assert_eq!(select_body(&pages, 15).unwrap(), "1 Introduction\nReal body.");
    }

    #[test]
    fn without_intro_skips_title_page() {
        let pages = vec![page(&["Title page"]), page(&["Body text"])];
        assert_eq!(select_body(&pages, 15).unwrap(), "Body text");
        assert_eq!(select_body(&[page(&["Only page"])], 15).unwrap(), "Only page");
    }

    #[test]
    fn empty_document_has_no_body() {
        assert_eq!(select_body(&[], 15), None);
        assert_eq!(select_body(&[String::new(), String::new()], 15), None);
    }

    #[test]
    fn page_number_shapes() {
        for line in ["7", "Page 3", "page 3/10", "4 / 9"] {
            assert!(looks_like_page_number(line), "{line}");
        }
        assert!(!looks_like_page_number("3 Results"));
    }

    #[test]
    fn repeat_key_drops_digits_and_punctuation() {
        assert_eq!(normalize_for_repeat("  Preprint, 2024.  Under review "), "preprint under review");
    }
}
