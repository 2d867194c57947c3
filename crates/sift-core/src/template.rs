//! Analysis templates: which fields the engine generates for every paper.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Key of the reserved field whose output carries the score and tags.
pub const ASSESSMENT_KEY: &str = "assessment";

const ASSESSMENT_LABEL: &str = "Assessment";

const ASSESSMENT_INSTRUCTION: &str = "Rate the paper for a researcher following these \
topics. Reply with a JSON object {\"score\": <integer 0-10>, \"tags\": [<up to 5 short \
topic tags>]} and then one sentence of justification.\n\
Scoring guide:\n\
- 9-10: groundbreaking, likely to change the direction of the field\n\
- 7-8: solid novelty with a clear technical contribution\n\
- 5-6: incremental improvement with some value\n\
- 3-4: engineering application or simple combination, limited novelty\n\
- 1-2: questionable value\n\
Suggested tags: LLM, RAG, Agent, Reasoning, Memory, Efficiency, Training, Inference, Multimodal";

/// One named field of the analysis template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct TemplateField {
    pub key: String,
    pub label: String,
    pub instruction: String,
}

impl TemplateField {
    #[must_use]
    pub fn new(key: &str, label: &str, instruction: &str) -> Self {
        Self {
            key: key.to_string(),
            label: label.to_string(),
            instruction: instruction.to_string(),
        }
    }
}

/// Ordered list of fields. The assessment field is always generated, last,
/// whether or not the template names it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct AnalysisTemplate {
    fields: Vec<TemplateField>,
}

impl Default for AnalysisTemplate {
    fn default() -> Self {
        Self {
            fields: vec![
                TemplateField::new(
                    "summary",
                    "Summary",
                    "Summarize the paper in 3-5 sentences: the problem it addresses, \
                     the core idea, and the headline result.",
                ),
                TemplateField::new(
                    "formulation",
                    "Problem Formulation",
                    "State the problem precisely: inputs, outputs, assumptions and the \
                     objective. Use mathematical notation where it makes the setting clearer.",
                ),
                TemplateField::new(
                    "method",
                    "Method",
                    "Describe the proposed approach step by step and how it differs from \
                     the closest prior work.",
                ),
            ],
        }
    }
}

impl AnalysisTemplate {
    /// Build a template from configured fields.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Validation`] on empty or duplicate keys and on
    /// empty instructions.
    pub fn new(fields: Vec<TemplateField>) -> Result<Self, CoreError> {
        let mut seen = std::collections::HashSet::new();
        for field in &fields {
            let key = field.key.trim();
            if key.is_empty() {
                return Err(CoreError::Validation("template field with empty key".into()));
            }
            if field.instruction.trim().is_empty() {
                return Err(CoreError::Validation(format!(
                    "template field '{key}' has an empty instruction"
                )));
            }
            if !seen.insert(key.to_string()) {
                return Err(CoreError::Validation(format!(
                    "duplicate template field '{key}'"
                )));
            }
        }
        Ok(Self { fields })
    }

    /// Configured fields, in order, as written.
    #[must_use]
    pub fn fields(&self) -> &[TemplateField] {
        &self.fields
    }

    /// Every field the engine generates: the configured ones followed by
    /// the assessment field (configured override or built-in default).
    #[must_use]
    pub fn generated_fields(&self) -> Vec<TemplateField> {
        let mut out: Vec<TemplateField> = self
            .fields
            .iter()
            .filter(|f| f.key != ASSESSMENT_KEY)
            .cloned()
            .collect();
        out.push(self.assessment_field());
        out
    }

    #[must_use]
    pub fn assessment_field(&self) -> TemplateField {
        self.fields
            .iter()
            .find(|f| f.key == ASSESSMENT_KEY)
            .cloned()
            .unwrap_or_else(|| {
                TemplateField::new(ASSESSMENT_KEY, ASSESSMENT_LABEL, ASSESSMENT_INSTRUCTION)
            })
    }

    /// Label for a generated field key, falling back to the key itself.
    #[must_use]
    pub fn label_for(&self, key: &str) -> String {
        self.generated_fields()
            .into_iter()
            .find(|f| f.key == key)
            .map_or_else(|| key.to_string(), |f| f.label)
    }
}
