use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use chrono::{Duration, Utc};
use flate2::Compression;
use flate2::write::GzEncoder;
use pretty_assertions::assert_eq;
use sift_config::AcquisitionConfig;
use sift_content::{ContentResolver, DocumentSource, FetchError};
use sift_core::content::{ContentBlob, Tier};
use sift_core::paper::PaperRecord;
use sift_store::{CacheLookup, ContentCache};

// ── Fakes ──────────────────────────────────────────────────────────

#[derive(Default)]
struct FakeDocs {
    source_archive: Option<Vec<u8>>,
    pdf_calls: AtomicUsize,
    source_calls: AtomicUsize,
}

impl DocumentSource for FakeDocs {
    async fn fetch_pdf(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.pdf_calls.fetch_add(1, Ordering::SeqCst);
        Err(FetchError::NotFound { url: url.into() })
    }

    async fn fetch_source_archive(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.source_calls.fetch_add(1, Ordering::SeqCst);
        self.source_archive
            .clone()
            .ok_or_else(|| FetchError::NotFound { url: url.into() })
    }
}

fn paper() -> PaperRecord {
    PaperRecord {
        id: "2401.01234".into(),
        version: Some(1),
        title: "Retrieval Heads".into(),
        summary: "Abstract.".into(),
        authors: vec!["A. Author".into()],
        published: Utc::now(),
        updated: None,
        abs_url: "https://arxiv.org/abs/2401.01234".into(),
        pdf_url: "https://arxiv.org/pdf/2401.01234".into(),
        categories: vec!["cs.CL".into()],
        doi: None,
    }
}

fn source_archive(body: &str) -> Vec<u8> {
    let tex = format!("\\documentclass{{article}}\n\\begin{{document}}\n{body}\n\\end{{document}}\n");
    let mut builder = tar::Builder::new(Vec::new());
    let mut header = tar::Header::new_gnu();
    header.set_size(tex.len() as u64);
    header.set_mode(0o644);
    header.set_cksum();
    builder
        .append_data(&mut header, "paper.tex", tex.as_bytes())
        .unwrap();
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(&builder.into_inner().unwrap()).unwrap();
    enc.finish().unwrap()
}

fn cached(tier: Tier, chars: usize, age_days: i64) -> ContentBlob {
    let mut blob = ContentBlob::new("2401.01234", tier, "x".repeat(chars), 1000, None);
    blob.extracted_at = Utc::now() - Duration::days(age_days);
    blob
}

struct Harness {
    _dir: tempfile::TempDir,
    cache: Arc<ContentCache>,
}

fn harness() -> Harness {
    let dir = tempfile::tempdir().unwrap();
    let cache = Arc::new(ContentCache::open(dir.path().join("cache"), 30, 30).unwrap());
    Harness { _dir: dir, cache }
}

fn resolver(h: &Harness, docs: FakeDocs, config: AcquisitionConfig) -> ContentResolver<FakeDocs> {
    ContentResolver::new(docs, Arc::clone(&h.cache), config)
}

fn calls(r: &ContentResolver<FakeDocs>) -> (usize, usize) {
    (
        r.source().pdf_calls.load(Ordering::SeqCst),
        r.source().source_calls.load(Ordering::SeqCst),
    )
}

// ── Tests ──────────────────────────────────────────────────────────

#[tokio::test]
async fn full_text_disabled_does_no_io() {
    let h = harness();
    let config = AcquisitionConfig {
        full_text: false,
        ..AcquisitionConfig::default()
    };
    let r = resolver(&h, FakeDocs::default(), config);

    let blob = r.resolve(&paper()).await;
    assert_eq!(blob.tier, Tier::None);
    assert_eq!(calls(&r), (0, 0));
}

#[tokio::test]
async fn fresh_long_pdf_entry_skips_network() {
    let h = harness();
    h.cache.put(&cached(Tier::Pdf, 3000, 1)).unwrap();
    let r = resolver(&h, FakeDocs::default(), AcquisitionConfig::default());

    let blob = r.resolve(&paper()).await;
    assert_eq!(blob.tier, Tier::Pdf);
    assert_eq!(blob.char_count(), 3000);
    assert_eq!(calls(&r), (0, 0));
}

#[tokio::test]
async fn fresh_source_entry_beats_short_pdf() {
    let h = harness();
    h.cache.put(&cached(Tier::Pdf, 300, 1)).unwrap();
    h.cache.put(&cached(Tier::Source, 2500, 1)).unwrap();
    let r = resolver(&h, FakeDocs::default(), AcquisitionConfig::default());

    let blob = r.resolve(&paper()).await;
    assert_eq!(blob.tier, Tier::Source);
    assert_eq!(calls(&r), (0, 0));
}

#[tokio::test]
async fn short_pdf_entry_is_used_when_fallback_disabled() {
    let h = harness();
    h.cache.put(&cached(Tier::Pdf, 300, 1)).unwrap();
    let config = AcquisitionConfig {
        source_fallback: false,
        ..AcquisitionConfig::default()
    };
    let r = resolver(&h, FakeDocs::default(), config);

    let blob = r.resolve(&paper()).await;
    assert_eq!(blob.tier, Tier::Pdf);
    assert_eq!(blob.char_count(), 300);
    assert_eq!(calls(&r), (0, 0));
}

#[tokio::test]
async fn stale_entry_triggers_refetch() {
    let h = harness();
    h.cache.put(&cached(Tier::Pdf, 3000, 30)).unwrap();
    let config = AcquisitionConfig {
        source_fallback: false,
        ..AcquisitionConfig::default()
    };
    let r = resolver(&h, FakeDocs::default(), config);

    let blob = r.resolve(&paper()).await;
    assert_eq!(calls(&r), (1, 0));
    // The download fails, so the stale entry is not served.
    assert_eq!(blob.tier, Tier::None);
}

#[tokio::test]
async fn source_fallback_when_pdf_unavailable_and_result_is_cached() {
    let h = harness();
    let docs = FakeDocs {
        source_archive: Some(source_archive("We study \\emph{sparse} retrieval heads.")),
        ..FakeDocs::default()
    };
    let r = resolver(&h, docs, AcquisitionConfig::default());

    let blob = r.resolve(&paper()).await;
    assert_eq!(blob.tier, Tier::Source);
    assert_eq!(blob.text, "We study sparse retrieval heads.");
    assert_eq!(calls(&r), (1, 1));
    assert!(matches!(
        h.cache.get("2401.01234", Tier::Source),
        CacheLookup::Fresh(_)
    ));

    // Second resolve is served from the cache.
    let again = r.resolve(&paper()).await;
    assert_eq!(again.text, blob.text);
    assert_eq!(calls(&r), (1, 1));
}

#[tokio::test]
async fn nothing_available_resolves_to_metadata_only() {
    let h = harness();
    let r = resolver(&h, FakeDocs::default(), AcquisitionConfig::default());

    let blob = r.resolve(&paper()).await;
    assert_eq!(blob.tier, Tier::None);
    assert!(blob.text.is_empty());
    assert_eq!(calls(&r), (1, 1));
}

#[tokio::test]
async fn fallback_disabled_never_touches_source() {
    let h = harness();
    let config = AcquisitionConfig {
        source_fallback: false,
        ..AcquisitionConfig::default()
    };
    let r = resolver(&h, FakeDocs::default(), config);

    let blob = r.resolve(&paper()).await;
    assert_eq!(blob.tier, Tier::None);
    assert_eq!(calls(&r), (1, 0));
}

#[tokio::test]
async fn cached_source_is_ignored_when_fallback_disabled() {
    let h = harness();
    h.cache.put(&cached(Tier::Pdf, 300, 1)).unwrap();
    h.cache.put(&cached(Tier::Source, 2500, 1)).unwrap();
    let config = AcquisitionConfig {
        source_fallback: false,
        ..AcquisitionConfig::default()
    };
    let r = resolver(&h, FakeDocs::default(), config.clone());

    let blob = r.resolve(&paper()).await;
    assert_eq!(blob.tier, Tier::Pdf);
    assert_eq!(blob.char_count(), 300);

    let h = harness();
    h.cache.put(&cached(Tier::Source, 2500, 1)).unwrap();
    let r = resolver(&h, FakeDocs::default(), config);

    let blob = r.resolve(&paper()).await;
    assert_eq!(blob.tier, Tier::None);
    assert_eq!(calls(&r), (1, 0));
}
