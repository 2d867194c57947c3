use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{TimeZone, Utc};
use pretty_assertions::assert_eq;
use sift_analysis::{AnalysisEngine, LlmError, Prompt, TextGenerator};
use sift_archive::{ArchiveSync, Attachment, ItemMetadata, ReferenceError, ReferenceManager};
use sift_config::{AcquisitionConfig, AttachmentMode, FeedConfig};
use sift_content::{ContentResolver, DocumentSource, FetchError};
use sift_core::archive::ArchiveState;
use sift_core::paper::PaperRecord;
use sift_core::status::{RunState, Stage};
use sift_core::template::AnalysisTemplate;
use sift_feed::{FeedError, FeedQuery, FeedSource, RankedPaper};
use sift_pipeline::{DiscoveryGate, Pipeline, PipelineError, RunRequest};
use sift_store::Stores;
use tokio_util::sync::CancellationToken;

// ── Fakes ──────────────────────────────────────────────────────────────────

/// Answers by substring of the expression; unmatched expressions return
/// nothing.
#[derive(Default)]
struct FakeFeed {
    answers: Vec<(&'static str, Vec<RankedPaper>)>,
    failing: Vec<&'static str>,
    queries: Mutex<Vec<FeedQuery>>,
}

impl FakeFeed {
    fn answer(mut self, needle: &'static str, papers: Vec<RankedPaper>) -> Self {
        self.answers.push((needle, papers));
        self
    }

    fn fail(mut self, needle: &'static str) -> Self {
        self.failing.push(needle);
        self
    }
}

impl FeedSource for FakeFeed {
    async fn search(&self, query: &FeedQuery) -> Result<Vec<RankedPaper>, FeedError> {
        self.queries.lock().unwrap().push(query.clone());
        if self.failing.iter().any(|n| query.expression.contains(n)) {
            return Err(FeedError::Parse("feed unavailable".into()));
        }
        Ok(self
            .answers
            .iter()
            .filter(|(needle, _)| query.expression.contains(needle))
            .flat_map(|(_, papers)| papers.clone())
            .collect())
    }
}

struct NoDocs;

impl DocumentSource for NoDocs {
    async fn fetch_pdf(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        Err(FetchError::NotFound { url: url.into() })
    }

    async fn fetch_source_archive(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        Err(FetchError::NotFound { url: url.into() })
    }
}

/// Scores papers titled "Alpha ..." 9 and the rest 4. Papers titled
/// "Stuck ..." never get an answer.
#[derive(Default)]
struct Reviewer {
    calls: AtomicUsize,
}

impl TextGenerator for Reviewer {
    async fn generate(&self, prompt: &Prompt, _max_tokens: u32) -> Result<String, LlmError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if prompt.user.contains("Title: Stuck") {
            std::future::pending::<()>().await;
        }
        let score = if prompt.user.contains("Title: Alpha") { 9 } else { 4 };
        Ok(format!("{{\"score\": {score}, \"tags\": [\"agents\"]}}"))
    }
}

#[derive(Default)]
struct FakeLibrary {
    items: Mutex<HashMap<String, String>>,
}

impl ReferenceManager for FakeLibrary {
    async fn find_or_create_item(
        &self,
        paper_id: &str,
        _metadata: &ItemMetadata,
        _collection: &str,
    ) -> Result<String, ReferenceError> {
        let mut items = self.items.lock().unwrap();
        let next = format!("KEY{:04}", items.len());
        Ok(items.entry(paper_id.to_string()).or_insert(next).clone())
    }

    async fn attachments(&self, _: &str) -> Result<Vec<Attachment>, ReferenceError> {
        Ok(Vec::new())
    }

    async fn upload_attachment(&self, _: &str, _: &str, _: &[u8]) -> Result<(), ReferenceError> {
        Ok(())
    }

    async fn link_attachment(&self, _: &str, _: &Path) -> Result<(), ReferenceError> {
        Ok(())
    }
}

struct PdfDocs;

impl DocumentSource for PdfDocs {
    async fn fetch_pdf(&self, _url: &str) -> Result<Vec<u8>, FetchError> {
        Ok(b"%PDF-1.4 test".to_vec())
    }

    async fn fetch_source_archive(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        Err(FetchError::NotFound { url: url.into() })
    }
}

// ── Fixtures ───────────────────────────────────────────────────────────────

fn paper(id: &str, title: &str, day: u32) -> PaperRecord {
    PaperRecord {
        id: id.into(),
        version: Some(1),
        title: title.into(),
        summary: format!("Abstract of {title}."),
        authors: vec!["Ada Lovelace".into()],
        published: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
        updated: None,
        abs_url: format!("https://arxiv.org/abs/{id}"),
        pdf_url: format!("https://arxiv.org/pdf/{id}"),
        categories: vec!["cs.CL".into()],
        doi: None,
    }
}

fn ranked(rank: usize, paper: PaperRecord) -> RankedPaper {
    RankedPaper { rank, paper }
}

fn three_papers() -> Vec<RankedPaper> {
    vec![
        ranked(0, paper("2401.00001", "Beta agents", 3)),
        ranked(1, paper("2401.00002", "Alpha agents", 2)),
        ranked(2, paper("2401.00003", "Gamma agents", 1)),
    ]
}

fn request(queries: &[&str], max_results: usize) -> RunRequest {
    RunRequest {
        queries: queries.iter().map(ToString::to_string).collect(),
        max_results,
        range: None,
    }
}

fn pipeline(dir: &Path, feed: FakeFeed) -> Pipeline<FakeFeed, NoDocs, Reviewer> {
    let stores = Stores::open(dir, 30, 30).unwrap();
    let acquisition = AcquisitionConfig {
        full_text: false,
        ..AcquisitionConfig::default()
    };
    let resolver = ContentResolver::new(NoDocs, Arc::clone(&stores.cache), acquisition);
    let engine = AnalysisEngine::new(Reviewer::default(), AnalysisTemplate::default(), 512);
    Pipeline::new(
        feed,
        resolver,
        engine,
        Arc::new(stores),
        FeedConfig::default(),
        3,
    )
}

fn history_lines(dir: &Path) -> usize {
    std::fs::read_to_string(dir.join("history.jsonl"))
        .unwrap_or_default()
        .lines()
        .filter(|l| !l.trim().is_empty())
        .count()
}

// ── Runs ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn three_fresh_papers_make_one_briefing() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(dir.path(), FakeFeed::default().answer("agents", three_papers()));

    let report = pipeline
        .run(&request(&["agents"], 10), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.entries, 3);
    assert!(!report.cancelled);
    assert!(report.warnings.is_empty());
    assert_eq!(history_lines(dir.path()), 3);

    let id = report.artifact_id.unwrap();
    let artifact = pipeline.stores().artifacts.load(&id).unwrap();
    assert_eq!(artifact.entries.len(), 3);
    assert_eq!(artifact.selected().count(), 0);
    assert_eq!(artifact.entries[0].paper.title, "Alpha agents");
    assert_eq!(artifact.entries[0].score, 9);
    assert_eq!(artifact.queries, vec!["agents".to_string()]);

    let status = pipeline.snapshot();
    assert_eq!(status.state, RunState::Idle);
    assert_eq!(status.stage, Stage::Done);
    assert_eq!((status.progress, status.total), (3, 3));
}

#[tokio::test]
async fn rerun_finds_nothing_new() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(dir.path(), FakeFeed::default().answer("agents", three_papers()));
    let cancel = CancellationToken::new();

    pipeline.run(&request(&["agents"], 10), &cancel).await.unwrap();
    let second = pipeline.run(&request(&["agents"], 10), &cancel).await.unwrap();

    assert_eq!(second.entries, 0);
    assert_eq!(second.artifact_id, None);
    assert_eq!(history_lines(dir.path()), 3);
    assert_eq!(pipeline.stores().artifacts.list().unwrap().len(), 1);
    assert_eq!(pipeline.snapshot().message, "no new papers");
}

#[tokio::test]
async fn partial_feed_failure_is_a_warning() {
    let dir = tempfile::tempdir().unwrap();
    let feed = FakeFeed::default()
        .answer("agents", three_papers())
        .fail("memory");
    let pipeline = pipeline(dir.path(), feed);

    let report = pipeline
        .run(&request(&["agents", "memory"], 10), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.entries, 3);
    assert_eq!(report.warnings.len(), 1);
    assert!(report.warnings[0].contains("memory"));
}

#[tokio::test]
async fn total_feed_failure_fails_the_run() {
    let dir = tempfile::tempdir().unwrap();
    let feed = FakeFeed::default().fail("agents").fail("memory");
    let pipeline = pipeline(dir.path(), feed);

    let err = pipeline
        .run(&request(&["agents", "memory"], 10), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::FeedExhausted(_)));
    assert_eq!(history_lines(dir.path()), 0);
    let status = pipeline.snapshot();
    assert_eq!(status.state, RunState::Error);
    assert!(status.message.starts_with("run failed"));

    // an error state needs no cleanup before the next run
    let retry = pipeline
        .run(&request(&["other"], 10), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(retry.entries, 0);
}

#[tokio::test]
async fn blank_queries_are_a_configuration_error() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(dir.path(), FakeFeed::default());

    let err = pipeline
        .run(&request(&["  "], 10), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, PipelineError::Feed(FeedError::EmptyQuery)));
}

#[tokio::test]
async fn concurrent_run_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(dir.path(), FakeFeed::default().answer("agents", three_papers()));
    pipeline.status().lock().unwrap().begin("elsewhere").unwrap();

    let err = pipeline
        .run(&request(&["agents"], 10), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Busy));
    assert_eq!(history_lines(dir.path()), 0);
}

#[tokio::test]
async fn cancellation_keeps_completed_entries() {
    let dir = tempfile::tempdir().unwrap();
    let papers = vec![
        ranked(0, paper("2401.00001", "Alpha agents", 3)),
        ranked(1, paper("2401.00002", "Stuck agents", 2)),
        ranked(2, paper("2401.00003", "Gamma agents", 1)),
    ];
    let pipeline = pipeline(dir.path(), FakeFeed::default().answer("agents", papers));
    let cancel = CancellationToken::new();

    let status = pipeline.status();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        loop {
            tokio::time::sleep(Duration::from_millis(10)).await;
            if status.lock().unwrap().progress >= 2 {
                trigger.cancel();
                break;
            }
        }
    });

    let report = tokio::time::timeout(
        Duration::from_secs(10),
        pipeline.run(&request(&["agents"], 10), &cancel),
    )
    .await
    .expect("run stops after cancellation")
    .unwrap();

    assert!(report.cancelled);
    assert_eq!(report.entries, 2);
    let artifact = pipeline
        .stores()
        .artifacts
        .load(report.artifact_id.as_deref().unwrap())
        .unwrap();
    let mut ids: Vec<_> = artifact.entries.iter().map(|e| e.paper.id.as_str()).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec!["2401.00001", "2401.00003"]);
    assert_eq!(history_lines(dir.path()), 3);
    assert!(pipeline.snapshot().message.ends_with("(cancelled)"));
}

#[tokio::test]
async fn cancelled_before_start_touches_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(dir.path(), FakeFeed::default().answer("agents", three_papers()));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let report = pipeline.run(&request(&["agents"], 10), &cancel).await.unwrap();

    assert!(report.cancelled);
    assert_eq!(report.entries, 0);
    assert_eq!(history_lines(dir.path()), 0);
    assert!(pipeline.stores().artifacts.list().unwrap().is_empty());
}

// ── Discovery ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn merged_candidates_keep_best_rank_and_cap() {
    let dir = tempfile::tempdir().unwrap();
    let stores = Stores::open(dir.path(), 30, 30).unwrap();
    let feed = FakeFeed::default()
        .answer(
            "agents",
            vec![
                ranked(0, paper("p1", "One", 1)),
                ranked(1, paper("p2", "Two", 2)),
                ranked(2, paper("p3", "Three", 5)),
            ],
        )
        .answer(
            "memory",
            vec![ranked(0, paper("p3", "Three", 5)), ranked(1, paper("p4", "Four", 4))],
        );
    let config = FeedConfig::default();
    let gate = DiscoveryGate::new(&feed, &stores.history, &config);

    let candidates = gate.discover(&request(&["agents", "memory"], 3)).await.unwrap();
    assert_eq!(candidates.expected(), 3);
    let ids: Vec<String> = candidates.map(|c| c.unwrap().id).collect();

    assert_eq!(ids, vec!["p3", "p1", "p4"]);
    assert!(!stores.history.contains("p2"));
    assert_eq!(stores.history.len(), 3);
    let queries = feed.queries.lock().unwrap();
    assert_eq!(queries.len(), 2);
    assert!(queries.iter().all(|q| q.max_results == 9 && q.start == 0));
}

#[tokio::test]
async fn seen_papers_are_skipped_and_the_cap_still_fills() {
    let dir = tempfile::tempdir().unwrap();
    let stores = Stores::open(dir.path(), 30, 30).unwrap();
    stores.history.record("2401.00001").unwrap();
    let feed = FakeFeed::default().answer("agents", three_papers());
    let config = FeedConfig::default();
    let gate = DiscoveryGate::new(&feed, &stores.history, &config);

    let ids: Vec<String> = gate
        .discover(&request(&["agents"], 2))
        .await
        .unwrap()
        .map(|c| c.unwrap().id)
        .collect();

    assert_eq!(ids, vec!["2401.00002", "2401.00003"]);
    assert_eq!(stores.history.len(), 3);
}

// ── Review and archive ─────────────────────────────────────────────────────

#[tokio::test]
async fn selected_entry_archives_after_review() {
    let dir = tempfile::tempdir().unwrap();
    let pipeline = pipeline(dir.path(), FakeFeed::default().answer("agents", three_papers()));
    let report = pipeline
        .run(&request(&["agents"], 10), &CancellationToken::new())
        .await
        .unwrap();
    let id = report.artifact_id.unwrap();

    let stores = pipeline.stores();
    stores
        .artifacts
        .set_selected(&id, "2401.00002", true)
        .await
        .unwrap();

    let sync = ArchiveSync::new(
        FakeLibrary::default(),
        PdfDocs,
        stores.artifacts.clone(),
        stores.archive.clone(),
        dir.path().join("library"),
        AttachmentMode::None,
    );
    let outcomes = sync.archive(&id, "").await.unwrap();

    assert_eq!(outcomes.len(), 1);
    assert_eq!(outcomes[0].state, ArchiveState::Archived);
    let record = stores.archive.get("2401.00002").unwrap().unwrap();
    assert!(record.pdf_path.ends_with("pdfs/2401.00002.pdf"));
    assert!(record.note_path.exists());
    assert_eq!(stores.archive.all().unwrap().len(), 1);
}
