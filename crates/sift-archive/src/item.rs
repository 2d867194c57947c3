//! Reference item metadata derived from an analysis result.

use std::path::PathBuf;

use serde::Serialize;
use serde_json::{Value, json};
use sift_core::analysis::AnalysisResult;
use sift_core::template::ASSESSMENT_KEY;

/// Tag prefix of the idempotency key stored on every created item.
pub const KEY_TAG_PREFIX: &str = "sift:";

/// Idempotency tag for a paper.
#[must_use]
pub fn key_tag(paper_id: &str) -> String {
    format!("{KEY_TAG_PREFIX}{paper_id}")
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Creator {
    pub creator_type: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Creator {
    /// Split "Given Names Family" at the last space; single names stay whole.
    #[must_use]
    pub fn author(full_name: &str) -> Self {
        let full_name = full_name.trim();
        match full_name.rsplit_once(' ') {
            Some((first, last)) if !first.trim().is_empty() => Self {
                creator_type: "author",
                first_name: Some(first.trim().to_string()),
                last_name: Some(last.to_string()),
                name: None,
            },
            _ => Self {
                creator_type: "author",
                first_name: None,
                last_name: None,
                name: Some(full_name.to_string()),
            },
        }
    }
}

/// A file attachment already stored under a reference item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attachment {
    /// Uploaded copy, identified by its filename.
    Uploaded { filename: String },
    /// Link to a local file.
    Linked { path: PathBuf },
}

/// What the reference manager stores about one paper.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ItemMetadata {
    pub title: String,
    pub abstract_note: String,
    pub creators: Vec<Creator>,
    /// `YYYY-MM-DD`.
    pub date: String,
    pub url: String,
    pub doi: Option<String>,
    pub tags: Vec<String>,
    /// Free-text `extra` field: score and headline analysis.
    pub extra: String,
    /// Child note with the analysis, HTML.
    pub note_html: Option<String>,
}

impl ItemMetadata {
    #[must_use]
    pub fn from_result(result: &AnalysisResult) -> Self {
        let paper = &result.paper;
        let mut extra = vec![format!("Sift score: {}", result.score)];
        if let Some(summary) = result.fields.iter().find(|f| !f.failed && f.key != ASSESSMENT_KEY) {
            extra.push(format!("{}: {}", summary.label, first_paragraph(&summary.text)));
        }
        if !result.tags.is_empty() {
            extra.push(format!("Tags: {}", result.tags.join(", ")));
        }

        Self {
            title: paper.title.clone(),
            abstract_note: paper.summary.trim().to_string(),
            creators: paper.authors.iter().map(|a| Creator::author(a)).collect(),
            date: paper.published_date(),
            url: paper.abs_url.clone(),
            doi: paper.doi.clone(),
            tags: result.tags.clone(),
            extra: extra.join("\n"),
            note_html: Some(note_html(result)),
        }
    }

    /// Zotero `preprint` item JSON.
    #[must_use]
    pub fn to_item_json(&self, paper_id: &str, collection_key: Option<&str>) -> Value {
        let mut tags = vec![json!({ "tag": key_tag(paper_id) })];
        tags.extend(self.tags.iter().map(|t| json!({ "tag": t })));

        let mut item = json!({
            "itemType": "preprint",
            "title": self.title,
            "abstractNote": self.abstract_note,
            "creators": self.creators,
            "date": self.date,
            "url": self.url,
            "repository": "arXiv",
            "archiveID": paper_id,
            "extra": self.extra,
            "tags": tags,
            "collections": collection_key.map(|k| vec![k]).unwrap_or_default(),
        });
        if let (Some(doi), Some(obj)) = (&self.doi, item.as_object_mut()) {
            obj.insert("DOI".into(), json!(doi));
        }
        item
    }
}

fn first_paragraph(text: &str) -> &str {
    text.trim().split("\n\n").next().unwrap_or_default().trim()
}

fn note_html(result: &AnalysisResult) -> String {
    let mut html = String::from("<h2>Sift analysis</h2>\n");
    for field in &result.fields {
        html.push_str(&format!(
            "<h3>{}</h3>\n<p>{}</p>\n",
            escape_html(&field.label),
            escape_html(field.text.trim()).replace('\n', "<br/>")
        ));
    }
    html.push_str(&format!(
        "<p><b>Score</b>: {} &middot; <b>Content</b>: {}</p>",
        result.score, result.tier
    ));
    html
}

fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            c => out.push(c),
        }
    }
    out
}
