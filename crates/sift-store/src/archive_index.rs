//! Archive index: JSONL of papers already filed in the reference library.

use std::path::{Path, PathBuf};

use sift_core::archive::ArchiveRecord;

use crate::error::StoreError;

/// Append-only record of archived papers, backed by `archive.jsonl`.
///
/// Re-read on every lookup so that a concurrent process's appends are seen.
/// Later records for the same paper win.
#[derive(Debug, Clone)]
pub struct ArchiveIndex {
    path: PathBuf,
}

impl ArchiveIndex {
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the parent directory cannot be created.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(Self { path })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every readable record, in file order.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file exists but cannot be read.
    pub fn all(&self) -> Result<Vec<ArchiveRecord>, StoreError> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let lines: Vec<std::io::Result<ArchiveRecord>> =
            serde_jsonlines::json_lines(&self.path)?.collect();
        Ok(lines
            .into_iter()
            .enumerate()
            .filter_map(|(line, record)| match record {
                Ok(record) => Some(record),
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), line = line + 1, %e, "skipping unreadable archive line");
                    None
                }
            })
            .collect())
    }

    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file exists but cannot be read.
    pub fn get(&self, paper_id: &str) -> Result<Option<ArchiveRecord>, StoreError> {
        Ok(self
            .all()?
            .into_iter()
            .rev()
            .find(|r| r.paper_id == paper_id))
    }

    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the append fails.
    pub fn append(&self, record: &ArchiveRecord) -> Result<(), StoreError> {
        if self.path.exists() {
            crate::seal_trailing_line(&self.path)?;
        }
        serde_jsonlines::append_json_lines(&self.path, [record])?;
        Ok(())
    }
}
