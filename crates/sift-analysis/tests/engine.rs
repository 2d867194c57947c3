use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use sift_analysis::{AnalysisEngine, LlmError, Prompt, TextGenerator};
use sift_core::analysis::{AnalysisResult, NEUTRAL_SCORE, NOT_ANALYZED, generation_failed};
use sift_core::content::{ContentBlob, Tier};
use sift_core::errors::ErrorClass;
use sift_core::paper::PaperRecord;
use sift_core::template::{AnalysisTemplate, TemplateField};

type Reply = fn() -> Result<String, LlmError>;

/// Answers prompts by substring: the first rule whose needle occurs in the
/// user prompt wins, otherwise the task label is echoed back.
struct ScriptedGenerator {
    rules: Vec<(String, Reply)>,
    calls: Arc<AtomicUsize>,
}

impl ScriptedGenerator {
    fn new() -> Self {
        Self {
            rules: Vec::new(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn on(mut self, needle: &str, reply: Reply) -> Self {
        self.rules.push((needle.to_string(), reply));
        self
    }

    fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

impl TextGenerator for ScriptedGenerator {
    async fn generate(&self, prompt: &Prompt, _max_tokens: u32) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some((_, reply)) = self
            .rules
            .iter()
            .find(|(needle, _)| prompt.user.contains(needle.as_str()))
        {
            return reply();
        }
        let label = prompt
            .user
            .split("Task (")
            .nth(1)
            .and_then(|rest| rest.split(')').next())
            .unwrap_or_default();
        Ok(format!("  {label} text  "))
    }
}

fn paper(id: &str) -> PaperRecord {
    PaperRecord {
        id: id.into(),
        version: Some(1),
        title: format!("Paper {id}"),
        summary: "We study things.".into(),
        authors: vec!["Ada Lovelace".into()],
        published: Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
        updated: None,
        abs_url: format!("https://arxiv.org/abs/{id}"),
        pdf_url: format!("https://arxiv.org/pdf/{id}"),
        categories: vec!["cs.CL".into()],
        doi: None,
    }
}

fn blob(id: &str) -> ContentBlob {
    ContentBlob::new(id, Tier::Pdf, "Full body text.".into(), 1024, Some(9))
}

fn keys(result: &AnalysisResult) -> Vec<&str> {
    result.fields.iter().map(|f| f.key.as_str()).collect()
}

#[tokio::test]
async fn every_field_is_generated_in_template_order() {
    let generator = ScriptedGenerator::new().on("Task (Assessment)", || {
        Ok(r#"{"score": 8, "tags": ["LLM", "Agent"]}"#.into())
    });
    let engine = AnalysisEngine::new(generator, AnalysisTemplate::default(), 512);

    let result = engine.analyze(&paper("2401.00001"), &blob("2401.00001")).await;

    assert_eq!(keys(&result), vec!["summary", "formulation", "method", "assessment"]);
    assert_eq!(result.field("summary"), Some("Summary text"));
    assert_eq!(result.score, 8);
    assert_eq!(result.tags, vec!["LLM".to_string(), "Agent".to_string()]);
    assert_eq!(result.tier, Tier::Pdf);
    assert!(!result.selected);
    assert!(result.failed_fields().is_empty());
}

#[tokio::test]
async fn failed_field_does_not_stop_the_others() {
    let generator = ScriptedGenerator::new()
        .on("Task (Method)", || Err(LlmError::Timeout { provider: "fake" }))
        .on("Task (Assessment)", || Ok("Score: 7".into()));
    let calls = generator.calls();
    let engine = AnalysisEngine::new(generator, AnalysisTemplate::default(), 512);

    let result = engine.analyze(&paper("2401.00002"), &blob("2401.00002")).await;

    assert_eq!(calls.load(Ordering::SeqCst), 4);
    assert_eq!(result.failed_fields(), vec!["method"]);
    assert_eq!(
        result.field("method"),
        Some(generation_failed(ErrorClass::TransientNetwork).as_str())
    );
    assert_eq!(result.field("formulation"), Some("Problem Formulation text"));
    assert_eq!(result.score, 7);
}

#[tokio::test]
async fn failed_assessment_leaves_score_neutral() {
    let generator = ScriptedGenerator::new().on("Task (Assessment)", || {
        Err(LlmError::Quota {
            provider: "fake",
            message: "insufficient_quota".into(),
        })
    });
    let engine = AnalysisEngine::new(generator, AnalysisTemplate::default(), 512);

    let result = engine.analyze(&paper("2401.00003"), &blob("2401.00003")).await;

    assert_eq!(result.score, NEUTRAL_SCORE);
    assert!(result.tags.is_empty());
    assert_eq!(
        result.field("assessment"),
        Some(generation_failed(ErrorClass::QuotaAuth).as_str())
    );
    assert_eq!(result.field("summary"), Some("Summary text"));
}

#[tokio::test]
async fn unparseable_assessment_is_neutral() {
    let generator = ScriptedGenerator::new()
        .on("Task (Assessment)", || Ok("Hard to say without experiments.".into()));
    let engine = AnalysisEngine::new(generator, AnalysisTemplate::default(), 512);

    let result = engine.analyze(&paper("2401.00004"), &blob("2401.00004")).await;

    assert_eq!(result.score, NEUTRAL_SCORE);
    assert!(result.failed_fields().is_empty());
}

#[tokio::test]
async fn metadata_only_mode_makes_no_calls() {
    let engine = AnalysisEngine::<ScriptedGenerator>::metadata_only(AnalysisTemplate::default());
    assert!(!engine.is_enabled());

    let result = engine
        .analyze(&paper("2401.00005"), &ContentBlob::none("2401.00005"))
        .await;

    assert_eq!(result.fields.len(), 4);
    assert!(result.fields.iter().all(|f| f.text == NOT_ANALYZED && !f.failed));
    assert_eq!(result.score, NEUTRAL_SCORE);
    assert_eq!(result.tier, Tier::None);
}

#[tokio::test]
async fn custom_template_with_assessment_override() {
    let template = AnalysisTemplate::new(vec![
        TemplateField::new("assessment", "Verdict", "Give a score."),
        TemplateField::new("gist", "Gist", "One line."),
    ])
    .unwrap();
    let generator = ScriptedGenerator::new()
        .on("Task (Gist)", || Err(LlmError::EmptyResponse { provider: "fake" }))
        .on("Task (Verdict)", || Ok("score = 3".into()));
    let engine = AnalysisEngine::new(generator, template, 128);

    let result = engine.analyze(&paper("2401.00006"), &blob("2401.00006")).await;

    assert_eq!(keys(&result), vec!["gist", "assessment"]);
    assert_eq!(result.fields[1].label, "Verdict");
    assert_eq!(
        result.field("gist"),
        Some(generation_failed(ErrorClass::MalformedContent).as_str())
    );
    assert_eq!(result.score, 3);
}

#[tokio::test]
async fn failures_stay_within_one_paper() {
    let generator = ScriptedGenerator::new()
        .on("Title: Paper 2401.00007", || {
            Err(LlmError::Timeout { provider: "fake" })
        })
        .on("Task (Assessment)", || Ok(r#"{"score": 9}"#.into()));
    let engine = AnalysisEngine::new(generator, AnalysisTemplate::default(), 512);

    let broken = engine.analyze(&paper("2401.00007"), &blob("2401.00007")).await;
    let healthy = engine.analyze(&paper("2401.00008"), &blob("2401.00008")).await;

    assert_eq!(broken.failed_fields().len(), 4);
    assert_eq!(broken.score, NEUTRAL_SCORE);
    assert!(healthy.failed_fields().is_empty());
    assert_eq!(healthy.score, 9);
}
