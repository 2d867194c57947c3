//! # sift-store
//!
//! Flat-file persistence for Sift. Everything lives under the data
//! directory:
//!
//! ```text
//! .sift/
//!   history.jsonl          dedup history, append-only
//!   archive.jsonl          archived papers, append-only
//!   cache/<stem>.<tier>.json
//!   briefs/<id>.md         rendered artifacts
//!   briefs/<id>.lock       per-artifact lock
//! ```
//!
//! JSONL files are only appended to, and a torn trailing line is sealed off
//! before the next append so one crash never corrupts later records.

pub mod archive_index;
pub mod artifacts;
pub mod cache;
pub mod history;
pub mod lock;

mod error;

pub use archive_index::ArchiveIndex;
pub use artifacts::{ArtifactStore, ArtifactSummary};
pub use cache::{CacheLookup, ContentCache};
pub use error::StoreError;
pub use history::HistoryStore;
pub use lock::{FileLock, LockGuard};

use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The store layout rooted at one data directory.
pub struct Stores {
    pub history: HistoryStore,
    pub cache: Arc<ContentCache>,
    pub artifacts: ArtifactStore,
    pub archive: ArchiveIndex,
    pub data_dir: PathBuf,
}

impl Stores {
    /// Open every store under `data_dir`, creating directories as needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if a directory cannot be created or the
    /// history cannot be read.
    pub fn open(
        data_dir: impl Into<PathBuf>,
        pdf_ttl_days: u32,
        source_ttl_days: u32,
    ) -> Result<Self, StoreError> {
        let data_dir = data_dir.into();
        Ok(Self {
            history: HistoryStore::open(data_dir.join("history.jsonl"))?,
            cache: Arc::new(ContentCache::open(
                data_dir.join("cache"),
                pdf_ttl_days,
                source_ttl_days,
            )?),
            artifacts: ArtifactStore::open(data_dir.join("briefs"))?,
            archive: ArchiveIndex::open(data_dir.join("archive.jsonl"))?,
            data_dir,
        })
    }
}

/// Terminate a partial last line so the next append starts on its own line.
pub(crate) fn seal_trailing_line(path: &Path) -> std::io::Result<()> {
    let mut file = std::fs::OpenOptions::new().read(true).append(true).open(path)?;
    if file.metadata()?.len() == 0 {
        return Ok(());
    }
    file.seek(SeekFrom::End(-1))?;
    let mut last = [0u8; 1];
    file.read_exact(&mut last)?;
    if last[0] != b'\n' {
        file.write_all(b"\n")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn seal_adds_newline_only_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("x.jsonl");

        std::fs::write(&path, "{}\n{\"a\":").unwrap();
        seal_trailing_line(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}\n{\"a\":\n");

        seal_trailing_line(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "{}\n{\"a\":\n");

        std::fs::write(&path, "").unwrap();
        seal_trailing_line(&path).unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }

    #[test]
    fn open_lays_out_data_dir() {
        let dir = tempfile::tempdir().unwrap();
        let stores = Stores::open(dir.path().join(".sift"), 30, 30).unwrap();
        assert!(stores.data_dir.join("cache").is_dir());
        assert!(stores.data_dir.join("briefs").is_dir());
        assert!(stores.history.is_empty());
    }
}
