//! Search-expression building for the arXiv query language.

use chrono::{Local, NaiveDate};
use sift_config::{CombineMode, QueryMode};

use crate::error::FeedError;

/// Inclusive submission-date window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateRange {
    /// Build a range from optional bounds.
    ///
    /// A missing `to` defaults to today, a missing `from` to `to`. Returns
    /// `None` when both are missing.
    #[must_use]
    pub fn from_bounds(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Option<Self> {
        match (from, to) {
            (None, None) => None,
            (Some(from), None) => Some(Self {
                from,
                to: Local::now().date_naive(),
            }),
            (None, Some(to)) => Some(Self { from: to, to }),
            (Some(from), Some(to)) => Some(Self { from, to }),
        }
    }

    fn clause(&self) -> String {
        format!(
            "submittedDate:[{}0000 TO {}2359]",
            self.from.format("%Y%m%d"),
            self.to.format("%Y%m%d")
        )
    }
}

/// Parse `YYYY-MM-DD` or `YYYYMMDD`.
///
/// # Errors
///
/// Returns [`FeedError::Parse`] for anything else.
pub fn parse_date(value: &str) -> Result<NaiveDate, FeedError> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(value, "%Y%m%d"))
        .map_err(|_| FeedError::Parse(format!("invalid date '{value}', expected YYYY-MM-DD")))
}

/// Quote a phrase: collapse whitespace, drop surrounding quotes, escape inner ones.
#[must_use]
pub fn quote_phrase(text: &str) -> String {
    let cleaned = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let inner = cleaned
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(&cleaned);
    format!("\"{}\"", inner.replace('"', "\\\""))
}

fn term(phrase: &str, mode: QueryMode) -> String {
    let quoted = quote_phrase(phrase);
    match mode {
        QueryMode::Phrase => quoted,
        QueryMode::TitleAbstract => format!("(ti:{quoted} OR abs:{quoted})"),
        QueryMode::Title => format!("ti:{quoted}"),
        QueryMode::Abstract => format!("abs:{quoted}"),
    }
}

fn with_dates(expression: String, range: Option<&DateRange>) -> String {
    match range {
        Some(range) => format!("({expression}) AND {}", range.clause()),
        None => expression,
    }
}

/// Turn query strings into feed expressions.
///
/// [`CombineMode::Any`] yields one expression per query string;
/// [`CombineMode::All`] yields a single conjunctive expression.
///
/// # Errors
///
/// Returns [`FeedError::EmptyQuery`] when no non-blank query remains.
pub fn build_expressions(
    queries: &[String],
    mode: QueryMode,
    combine: CombineMode,
    range: Option<&DateRange>,
) -> Result<Vec<String>, FeedError> {
    let cleaned: Vec<&str> = queries
        .iter()
        .map(|q| q.trim())
        .filter(|q| !q.is_empty())
        .collect();
    if cleaned.is_empty() {
        return Err(FeedError::EmptyQuery);
    }

    Ok(match combine {
        CombineMode::Any => cleaned
            .iter()
            .map(|q| with_dates(term(q, mode), range))
            .collect(),
        CombineMode::All => {
            let joined = cleaned
                .iter()
                .map(|q| term(q, mode))
                .collect::<Vec<_>>()
                .join(" AND ");
            vec![with_dates(joined, range)]
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn quotes_and_escapes() {
        assert_eq!(quote_phrase("  large   language model "), "\"large language model\"");
        assert_eq!(quote_phrase("\"already quoted\""), "\"already quoted\"");
        assert_eq!(quote_phrase("say \"hi\" now"), "\"say \\\"hi\\\" now\"");
    }

    #[test]
    fn any_mode_yields_one_expression_per_query() {
        let exprs = build_expressions(
            &strings(&["RAG", "  ", "agent"]),
            QueryMode::TitleAbstract,
            CombineMode::Any,
            None,
        )
        .unwrap();
        assert_eq!(
            exprs,
            vec![
                "(ti:\"RAG\" OR abs:\"RAG\")".to_string(),
                "(ti:\"agent\" OR abs:\"agent\")".to_string(),
            ]
        );
    }

    #[test]
    fn all_mode_joins_with_and_and_dates() {
        let range = DateRange {
            from: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            to: NaiveDate::from_ymd_opt(2024, 1, 7).unwrap(),
        };
        let exprs = build_expressions(
            &strings(&["LLM", "memory"]),
            QueryMode::Abstract,
            CombineMode::All,
            Some(&range),
        )
        .unwrap();
        assert_eq!(
            exprs,
            vec![
                "(abs:\"LLM\" AND abs:\"memory\") AND submittedDate:[202401010000 TO 202401072359]"
                    .to_string()
            ]
        );
    }

    #[test]
    fn blank_queries_are_rejected() {
        let err = build_expressions(&strings(&[" ", ""]), QueryMode::Phrase, CombineMode::Any, None)
            .unwrap_err();
        assert!(matches!(err, FeedError::EmptyQuery));
    }

    #[test]
    fn date_parsing_accepts_both_forms() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(parse_date("2024-03-09").unwrap(), expected);
        assert_eq!(parse_date("20240309").unwrap(), expected);
        assert!(parse_date("March 9").is_err());
    }

    #[test]
    fn missing_from_defaults_to_to() {
        let to = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let range = DateRange::from_bounds(None, Some(to)).unwrap();
        assert_eq!(range.from, to);
        assert!(DateRange::from_bounds(None, None).is_none());
    }
}
