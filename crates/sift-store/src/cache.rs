//! Content cache: one JSON file per (paper, tier), expired by age.

use std::collections::HashMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use sift_core::content::{ContentBlob, Tier};
use sift_core::paper::file_stem;
use tokio::sync::OwnedMutexGuard;

use crate::error::StoreError;

#[derive(Debug)]
pub enum CacheLookup {
    Miss,
    Fresh(ContentBlob),
    Stale(ContentBlob),
}

impl CacheLookup {
    /// The blob if it is still within its TTL.
    #[must_use]
    pub fn fresh(self) -> Option<ContentBlob> {
        match self {
            Self::Fresh(blob) => Some(blob),
            Self::Miss | Self::Stale(_) => None,
        }
    }
}

/// Cache of extracted text, keyed by paper id and tier.
///
/// Files live at `{dir}/{file_stem}.{tier}.json`. A blob is stale once its
/// age reaches the tier's TTL. Writes go through a temp file and a rename, so
/// a reader never sees a partial entry, and are serialized per paper id.
pub struct ContentCache {
    dir: PathBuf,
    pdf_ttl: Duration,
    source_ttl: Duration,
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl ContentCache {
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the cache directory cannot be created.
    pub fn open(
        dir: impl Into<PathBuf>,
        pdf_ttl_days: u32,
        source_ttl_days: u32,
    ) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self {
            dir,
            pdf_ttl: Duration::days(i64::from(pdf_ttl_days)),
            source_ttl: Duration::days(i64::from(source_ttl_days)),
            locks: Mutex::new(HashMap::new()),
        })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, paper_id: &str, tier: Tier) -> PathBuf {
        self.dir.join(format!("{}.{tier}.json", file_stem(paper_id)))
    }

    const fn ttl(&self, tier: Tier) -> Duration {
        match tier {
            Tier::Source => self.source_ttl,
            Tier::Pdf | Tier::None => self.pdf_ttl,
        }
    }

    fn is_fresh(&self, blob: &ContentBlob) -> bool {
        Utc::now() - blob.extracted_at < self.ttl(blob.tier)
    }

    /// Look up the cached blob for one tier.
    ///
    /// An unreadable entry counts as a miss.
    #[must_use]
    pub fn get(&self, paper_id: &str, tier: Tier) -> CacheLookup {
        let path = self.path_for(paper_id, tier);
        let Ok(raw) = std::fs::read_to_string(&path) else {
            return CacheLookup::Miss;
        };
        match serde_json::from_str::<ContentBlob>(&raw) {
            Ok(blob) if blob.paper_id == paper_id && blob.tier == tier => {
                if self.is_fresh(&blob) {
                    CacheLookup::Fresh(blob)
                } else {
                    CacheLookup::Stale(blob)
                }
            }
            Ok(_) => CacheLookup::Miss,
            Err(e) => {
                tracing::warn!(path = %path.display(), %e, "ignoring unreadable cache entry");
                CacheLookup::Miss
            }
        }
    }

    /// Hold the per-paper lock. Distinct papers never contend.
    pub async fn lock(&self, paper_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self
                .locks
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner);
            locks.retain(|_, l| Arc::strong_count(l) > 1);
            Arc::clone(locks.entry(paper_id.to_string()).or_default())
        };
        lock.lock_owned().await
    }

    /// Store a blob, replacing any previous entry for its tier.
    ///
    /// Callers hold [`Self::lock`] for the paper. [`Tier::None`] blobs are
    /// never cached.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the entry cannot be encoded or written.
    pub fn put(&self, blob: &ContentBlob) -> Result<(), StoreError> {
        if blob.tier == Tier::None {
            return Ok(());
        }
        let path = self.path_for(&blob.paper_id, blob.tier);
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        serde_json::to_writer(&mut tmp, blob)?;
        tmp.flush()?;
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;
        tracing::debug!(paper = %blob.paper_id, tier = %blob.tier, chars = blob.char_count(), "cached content");
        Ok(())
    }

    /// Delete every expired entry. Returns how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be listed.
    pub fn purge_expired(&self) -> Result<usize, StoreError> {
        let mut removed = 0;
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let expired = std::fs::read_to_string(&path)
                .ok()
                .and_then(|raw| serde_json::from_str::<ContentBlob>(&raw).ok())
                .is_none_or(|blob| !self.is_fresh(&blob));
            if expired && std::fs::remove_file(&path).is_ok() {
                removed += 1;
            }
        }
        tracing::info!(dir = %self.dir.display(), removed, "purged expired cache entries");
        Ok(removed)
    }
}
