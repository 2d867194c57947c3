//! Briefing artifacts: the reviewable output of one run.
//!
//! The structured record is authoritative. Markdown is a derived view that
//! carries each entry's payload in an HTML comment, so a rendered file can be
//! parsed back without loss. The reviewer's only edit is the checkbox on an
//! entry heading:
//!
//! ```text
//! ## - [x] [Paper title](https://arxiv.org/abs/2401.01234)
//! <!-- sift:entry {...} -->
//! ```
//!
//! [`BriefingArtifact::parse_markdown`] is total over entries: unknown markers
//! read as unselected and entries with a broken payload are skipped.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::analysis::{AnalysisResult, FieldOutput, RECOMMENDED_THRESHOLD};
use crate::content::Tier;
use crate::errors::CoreError;
use crate::paper::PaperRecord;
use crate::template::{AnalysisTemplate, TemplateField};

const ARTIFACT_MARKER: &str = "<!-- sift:artifact ";
const ENTRY_MARKER: &str = "<!-- sift:entry ";
const COMMENT_END: &str = " -->";

// ── Types ──────────────────────────────────────────────────────────────────

/// A dated collection of analysis results for one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct BriefingArtifact {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub queries: Vec<String>,
    /// Field headings in generation order.
    pub fields: Vec<TemplateField>,
    pub entries: Vec<AnalysisResult>,
}

/// Header payload embedded once per file.
#[derive(Serialize, Deserialize)]
struct ArtifactHeader {
    id: String,
    created_at: DateTime<Utc>,
    queries: Vec<String>,
    fields: Vec<TemplateField>,
}

/// Entry payload embedded after each heading. The selection flag is carried
/// by the heading checkbox instead.
#[derive(Serialize, Deserialize)]
struct EntryPayload {
    paper: PaperRecord,
    fields: Vec<FieldOutput>,
    score: u8,
    tags: Vec<String>,
    generated_at: DateTime<Utc>,
    tier: Tier,
}

// ── Construction and selection ─────────────────────────────────────────────

impl BriefingArtifact {
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        queries: Vec<String>,
        template: &AnalysisTemplate,
        entries: Vec<AnalysisResult>,
    ) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
            queries,
            fields: template.generated_fields(),
            entries,
        }
    }

    #[must_use]
    pub fn entry(&self, paper_id: &str) -> Option<&AnalysisResult> {
        self.entries.iter().find(|e| e.paper.id == paper_id)
    }

    pub fn selected(&self) -> impl Iterator<Item = &AnalysisResult> {
        self.entries.iter().filter(|e| e.selected)
    }

    /// Toggle the selection flag of one entry.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NotFound`] if no entry has that paper id.
    pub fn set_selected(&mut self, paper_id: &str, selected: bool) -> Result<(), CoreError> {
        let entry = self
            .entries
            .iter_mut()
            .find(|e| e.paper.id == paper_id)
            .ok_or_else(|| CoreError::NotFound {
                entity_type: "entry".into(),
                id: paper_id.to_string(),
            })?;
        entry.selected = selected;
        Ok(())
    }
}

// ── Render ─────────────────────────────────────────────────────────────────

impl BriefingArtifact {
    /// Render the artifact as markdown.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Serialization`] if a payload cannot be encoded.
    pub fn render_markdown(&self) -> Result<String, CoreError> {
        let header = ArtifactHeader {
            id: self.id.clone(),
            created_at: self.created_at,
            queries: self.queries.clone(),
            fields: self.fields.clone(),
        };

        let mut md = String::new();
        md.push_str(&format!("# Research Briefing {}\n", self.id));
        md.push_str(&format!(
            "{ARTIFACT_MARKER}{}{COMMENT_END}\n\n",
            comment_safe_json(&header)?
        ));
        md.push_str(&format!(
            "**Date**: {} | **Queries**: {} | **Papers**: {}\n\n",
            self.created_at.format("%Y-%m-%d %H:%M UTC"),
            if self.queries.is_empty() {
                "-".to_string()
            } else {
                self.queries.join("; ")
            },
            self.entries.len()
        ));
        md.push_str(&format!(
            "> Tick `[ ]` to `[x]` on a heading, then run `sift archive {}` to sync the \
             selection to the reference library.\n\n---\n\n",
            self.id
        ));

        let mut section: Option<bool> = None;
        for entry in &self.entries {
            let recommended = entry.is_recommended();
            if section != Some(recommended) {
                if recommended {
                    md.push_str(&format!("# Recommended (score >= {RECOMMENDED_THRESHOLD})\n\n"));
                } else {
                    md.push_str("# Other Papers\n\n");
                }
                section = Some(recommended);
            }
            self.render_entry(&mut md, entry)?;
        }
        Ok(md)
    }

    fn render_entry(&self, md: &mut String, entry: &AnalysisResult) -> Result<(), CoreError> {
        let paper = &entry.paper;
        let payload = EntryPayload {
            paper: paper.clone(),
            fields: entry.fields.clone(),
            score: entry.score,
            tags: entry.tags.clone(),
            generated_at: entry.generated_at,
            tier: entry.tier,
        };
        let mark = if entry.selected { 'x' } else { ' ' };

        md.push_str(&format!(
            "## - [{mark}] [{}]({})\n",
            single_line(&paper.title),
            paper.abs_url
        ));
        md.push_str(&format!(
            "{ENTRY_MARKER}{}{COMMENT_END}\n",
            comment_safe_json(&payload)?
        ));
        md.push_str(&format!(
            "> arXiv `{}` | score **{}** | tier `{}` | {}\n",
            paper.id,
            entry.score,
            entry.tier,
            paper.author_line(3)
        ));
        if !entry.tags.is_empty() {
            let tags: Vec<String> = entry.tags.iter().map(|t| format!("`#{t}`")).collect();
            md.push_str(&format!("> Tags: {}\n", tags.join(" ")));
        }
        md.push('\n');

        for field in &entry.fields {
            let label = self
                .fields
                .iter()
                .find(|f| f.key == field.key)
                .map_or(field.label.as_str(), |f| f.label.as_str());
            md.push_str(&format!("### {label}\n{}\n\n", field.text.trim()));
        }

        md.push_str(&format!(
            "[PDF]({}) | [arXiv]({})\n\n---\n\n",
            paper.pdf_url, paper.abs_url
        ));
        Ok(())
    }
}

// ── Parse ──────────────────────────────────────────────────────────────────

impl BriefingArtifact {
    /// Parse a rendered artifact.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] if the artifact header is missing or
    /// unreadable. Individual entries never fail the parse.
    pub fn parse_markdown(text: &str) -> Result<Self, CoreError> {
        let lines: Vec<&str> = text.lines().collect();

        let header: ArtifactHeader = lines
            .iter()
            .find_map(|line| comment_payload(line, ARTIFACT_MARKER))
            .ok_or_else(|| CoreError::Validation("missing artifact header".into()))
            .and_then(|json| {
                serde_json::from_str(json)
                    .map_err(|e| CoreError::Validation(format!("bad artifact header: {e}")))
            })?;

        let mut entries = Vec::new();
        for (idx, line) in lines.iter().enumerate() {
            let Some(selected) = heading_selection(line) else {
                continue;
            };
            let Some(json) = lines[idx + 1..]
                .iter()
                .find(|l| !l.trim().is_empty())
                .and_then(|l| comment_payload(l, ENTRY_MARKER))
            else {
                continue;
            };
            match serde_json::from_str::<EntryPayload>(json) {
                Ok(payload) => entries.push(AnalysisResult {
                    paper: payload.paper,
                    fields: payload.fields,
                    score: payload.score,
                    tags: payload.tags,
                    generated_at: payload.generated_at,
                    tier: payload.tier,
                    selected,
                }),
                Err(e) => {
                    tracing::warn!(artifact = %header.id, line = idx + 1, %e, "skipping unreadable entry");
                }
            }
        }

        Ok(Self {
            id: header.id,
            created_at: header.created_at,
            queries: header.queries,
            fields: header.fields,
            entries,
        })
    }
}

/// Selection flag of an entry heading, or `None` if the line is not one.
///
/// `[x]`/`[X]` is selected. Any other bracketed marker, or none, is unselected.
fn heading_selection(line: &str) -> Option<bool> {
    let rest = line.strip_prefix("## ")?.trim_start();
    let rest = rest.strip_prefix("- ").unwrap_or(rest);
    let mut chars = rest.chars();
    if chars.next() != Some('[') {
        return Some(false);
    }
    let mark = chars.next();
    if chars.next() != Some(']') {
        return Some(false);
    }
    Some(matches!(mark, Some('x' | 'X')))
}

fn comment_payload<'a>(line: &'a str, marker: &str) -> Option<&'a str> {
    line.trim()
        .strip_prefix(marker)?
        .strip_suffix(COMMENT_END)
        .map(str::trim)
}

/// JSON that cannot terminate the surrounding HTML comment.
fn comment_safe_json<T: Serialize>(value: &T) -> Result<String, CoreError> {
    Ok(serde_json::to_string(value)?.replace("-->", "--\\u003e"))
}

fn single_line(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
