//! Per-paper analysis: one generation per template field, failures isolated.

use chrono::Utc;
use sift_core::analysis::{
    AnalysisResult, FieldOutput, NEUTRAL_SCORE, NOT_ANALYZED, generation_failed,
};
use sift_core::content::ContentBlob;
use sift_core::errors::Classify;
use sift_core::paper::PaperRecord;
use sift_core::template::{ASSESSMENT_KEY, AnalysisTemplate, TemplateField};

use crate::TextGenerator;
use crate::prompt::build_prompt;
use crate::score::parse_assessment;

/// Runs the template against a generator.
///
/// Without a generator the engine is in metadata-only mode: every field reads
/// `[not analyzed]` and the score is neutral.
pub struct AnalysisEngine<G> {
    generator: Option<G>,
    template: AnalysisTemplate,
    max_tokens: u32,
}

impl<G: TextGenerator> AnalysisEngine<G> {
    #[must_use]
    pub const fn new(generator: G, template: AnalysisTemplate, max_tokens: u32) -> Self {
        Self {
            generator: Some(generator),
            template,
            max_tokens,
        }
    }

    #[must_use]
    pub const fn metadata_only(template: AnalysisTemplate) -> Self {
        Self {
            generator: None,
            template,
            max_tokens: 0,
        }
    }

    #[must_use]
    pub const fn is_enabled(&self) -> bool {
        self.generator.is_some()
    }

    #[must_use]
    pub const fn template(&self) -> &AnalysisTemplate {
        &self.template
    }

    /// Analyze one paper. Never fails: a field whose generation errors is
    /// recorded as `[generation failed: <class>]` and the remaining fields
    /// still run. An unusable assessment leaves the score neutral.
    pub async fn analyze(&self, paper: &PaperRecord, blob: &ContentBlob) -> AnalysisResult {
        let fields = self.template.generated_fields();
        let mut outputs = Vec::with_capacity(fields.len());
        for field in &fields {
            outputs.push(self.generate_field(paper, blob, field).await);
        }

        let assessment = outputs
            .iter()
            .find(|f| f.key == ASSESSMENT_KEY && !f.failed && self.generator.is_some())
            .map(|f| parse_assessment(&f.text))
            .unwrap_or_default();

        let failed = outputs.iter().filter(|f| f.failed).count();
        if failed > 0 {
            tracing::warn!(
                paper = %paper.id,
                failed,
                total = outputs.len(),
                "analysis completed with failed fields"
            );
        }

        AnalysisResult {
            paper: paper.clone(),
            fields: outputs,
            score: if self.generator.is_some() {
                assessment.score
            } else {
                NEUTRAL_SCORE
            },
            tags: assessment.tags,
            generated_at: Utc::now(),
            tier: blob.tier,
            selected: false,
        }
    }

    async fn generate_field(
        &self,
        paper: &PaperRecord,
        blob: &ContentBlob,
        field: &TemplateField,
    ) -> FieldOutput {
        let Some(generator) = &self.generator else {
            return FieldOutput {
                key: field.key.clone(),
                label: field.label.clone(),
                text: NOT_ANALYZED.to_string(),
                failed: false,
            };
        };

        let prompt = build_prompt(paper, blob, field);
        match generator.generate(&prompt, self.max_tokens).await {
            Ok(text) => FieldOutput {
                key: field.key.clone(),
                label: field.label.clone(),
                text: text.trim().to_string(),
                failed: false,
            },
            Err(e) => {
                let class = e.class();
                tracing::warn!(
                    paper = %paper.id,
                    field = %field.key,
                    class = %class,
                    %e,
                    "field generation failed"
                );
                FieldOutput {
                    key: field.key.clone(),
                    label: field.label.clone(),
                    text: generation_failed(class),
                    failed: true,
                }
            }
        }
    }
}
