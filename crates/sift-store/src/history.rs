//! Dedup history: append-only JSONL of every paper ever emitted.

use std::collections::HashSet;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde_jsonlines::JsonLinesReader;
use sift_core::history::HistoryEntry;

use crate::error::StoreError;

/// Set of paper ids already processed, backed by `history.jsonl`.
///
/// Lines are only ever appended. A line that fails to parse (a torn write
/// from a crash) is skipped on load. Lookups and appends first read any
/// lines other processes appended since the last read, so a long-lived
/// handle (the daemon's) never re-emits a paper a manual run recorded.
pub struct HistoryStore {
    path: PathBuf,
    state: Mutex<Seen>,
}

#[derive(Default)]
struct Seen {
    ids: HashSet<String>,
    /// Bytes of the file already folded into `ids`; always at a line boundary.
    offset: u64,
}

impl HistoryStore {
    /// Open (or create) the history file and load its ids.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the parent directory cannot be created
    /// or the existing file cannot be read.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        if path.exists() {
            crate::seal_trailing_line(&path)?;
        }

        let mut seen = Seen::default();
        refresh(&path, &mut seen)?;
        tracing::debug!(path = %path.display(), entries = seen.ids.len(), "history loaded");

        Ok(Self {
            path,
            state: Mutex::new(seen),
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether `id` is recorded, including by other processes since open.
    ///
    /// A failed re-read is logged and answered from what is already loaded.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        let mut seen = self.lock();
        if let Err(e) = refresh(&self.path, &mut seen) {
            tracing::warn!(path = %self.path.display(), %e, "history re-read failed");
        }
        seen.ids.contains(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().ids.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Append `id` unless it is already present in the file.
    ///
    /// Returns `true` if a line was written.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the file cannot be re-read or the append
    /// fails; the id is then not considered recorded.
    pub fn record(&self, id: &str) -> Result<bool, StoreError> {
        let mut seen = self.lock();
        refresh(&self.path, &mut seen)?;
        if seen.ids.contains(id) {
            return Ok(false);
        }
        if self.path.exists() {
            crate::seal_trailing_line(&self.path)?;
        }
        serde_jsonlines::append_json_lines(&self.path, [HistoryEntry::processed(id)])?;
        // The offset is left behind the new line; the next refresh reads it back.
        seen.ids.insert(id.to_string());
        Ok(true)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Seen> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Fold complete lines appended after `seen.offset` into `seen.ids`.
///
/// A file shorter than the offset was replaced, so it is read from the start.
fn refresh(path: &Path, seen: &mut Seen) -> std::io::Result<()> {
    let mut file = match std::fs::File::open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    let len = file.metadata()?.len();
    if len < seen.offset {
        seen.offset = 0;
    }
    if len == seen.offset {
        return Ok(());
    }

    file.seek(SeekFrom::Start(seen.offset))?;
    let mut tail = Vec::new();
    file.read_to_end(&mut tail)?;
    let Some(end) = tail.iter().rposition(|&b| b == b'\n') else {
        return Ok(());
    };
    let complete = &tail[..=end];

    for (line, entry) in JsonLinesReader::new(complete)
        .read_all::<HistoryEntry>()
        .enumerate()
    {
        match entry {
            Ok(entry) => {
                seen.ids.insert(entry.id);
            }
            Err(e) => {
                tracing::warn!(path = %path.display(), line = line + 1, %e, "skipping unreadable history line");
            }
        }
    }
    seen.offset += complete.len() as u64;
    Ok(())
}
