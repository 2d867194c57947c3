//! Markdown note stub written next to each archived PDF.

use std::path::Path;

use chrono::{DateTime, Utc};
use sift_core::analysis::AnalysisResult;

/// Render the note stub for one archived paper.
///
/// Frontmatter strings are JSON-quoted, which YAML reads as double-quoted
/// scalars.
#[must_use]
pub fn render_note(
    result: &AnalysisResult,
    item_key: &str,
    pdf_path: &Path,
    archived_at: DateTime<Utc>,
) -> String {
    let paper = &result.paper;
    let mut out = String::from("---\n");
    out.push_str(&format!("title: {}\n", quote(&paper.title)));
    out.push_str(&format!("arxiv: {}\n", quote(&paper.id)));
    out.push_str(&format!("url: {}\n", quote(&paper.abs_url)));
    out.push_str(&format!("pdf: {}\n", quote(&pdf_path.to_string_lossy())));
    out.push_str(&format!("zotero_key: {}\n", quote(item_key)));
    out.push_str(&format!("published: {}\n", paper.published_date()));
    out.push_str(&format!("archived: {}\n", archived_at.format("%Y-%m-%d")));
    out.push_str(&format!("score: {}\n", result.score));
    if result.tags.is_empty() {
        out.push_str("tags: []\n");
    } else {
        out.push_str("tags:\n");
        for tag in &result.tags {
            out.push_str(&format!("  - {}\n", quote(tag)));
        }
    }
    out.push_str("draft: true\n---\n\n");

    out.push_str(&format!("# {}\n\n", paper.title.trim()));
    out.push_str("## Paper\n\n");
    out.push_str(&format!("- **arXiv**: [{}]({})\n", paper.id, paper.abs_url));
    if !paper.authors.is_empty() {
        out.push_str(&format!("- **Authors**: {}\n", paper.author_line(10)));
    }
    if let Some(doi) = &paper.doi {
        out.push_str(&format!("- **DOI**: {doi}\n"));
    }
    out.push_str(&format!("- **Content**: {}\n\n", result.tier));

    out.push_str("## Analysis\n\n");
    for field in &result.fields {
        out.push_str(&format!("### {}\n\n{}\n\n", field.label, field.text.trim()));
    }

    out.push_str("## Reading notes\n\n_Add your notes here._\n\n");
    out.push_str("## Key references\n\n_Record important citations here._\n");
    out
}

fn quote(value: &str) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| format!("\"{value}\""))
}
