//! Prompt assembly for one template field.

use sift_core::content::ContentBlob;
use sift_core::paper::PaperRecord;
use sift_core::template::TemplateField;

/// Reviewer persona shared by every field.
pub const SYSTEM_PROMPT: &str = "You are a senior academic researcher in computer science, \
specializing in AI, large language models and NLP.\n\
\n\
Your strengths:\n\
1. You quickly identify the essential contribution of a paper.\n\
2. You turn loose problem statements into precise mathematical or logical formulations.\n\
3. You judge academic and practical value accurately.\n\
\n\
Your answers are concise and precise, use formal notation where it helps, and stay rigorous.";

/// A system/user prompt pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
}

impl Prompt {
    /// System and user text as one block, for providers without a system role.
    #[must_use]
    pub fn combined(&self) -> String {
        format!("{}\n\n{}", self.system, self.user)
    }
}

/// Build the prompt asking for one field of one paper.
#[must_use]
pub fn build_prompt(paper: &PaperRecord, blob: &ContentBlob, field: &TemplateField) -> Prompt {
    let mut user = String::new();
    user.push_str(&format!("Title: {}\n", paper.title));
    if !paper.authors.is_empty() {
        user.push_str(&format!("Authors: {}\n", paper.author_line(10)));
    }
    if !paper.categories.is_empty() {
        user.push_str(&format!("Categories: {}\n", paper.categories.join(", ")));
    }
    user.push_str(&format!("Published: {}\n\n", paper.published_date()));
    user.push_str(&format!("Abstract:\n{}\n\n", paper.summary.trim()));

    if blob.has_text() {
        user.push_str(&format!(
            "Full text ({} extraction, references removed, possibly truncated):\n{}\n\n",
            blob.tier,
            blob.text.trim()
        ));
    }

    user.push_str(&format!(
        "---\n\nTask ({}): {}\n\nAnswer in plain prose or markdown, without restating the task.",
        field.label,
        field.instruction.trim()
    ));

    Prompt {
        system: SYSTEM_PROMPT.to_string(),
        user,
    }
}
