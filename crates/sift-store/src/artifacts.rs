//! Briefing artifact files under `briefs/`.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use sift_core::artifact::BriefingArtifact;

use crate::error::StoreError;
use crate::lock::FileLock;

/// Highest collision suffix tried for one date.
const MAX_SUFFIX: u32 = 999;

/// One line of `sift briefs list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArtifactSummary {
    pub id: String,
    pub created_at: DateTime<Utc>,
    pub entries: usize,
    pub selected: usize,
    pub path: PathBuf,
}

/// Directory of rendered artifacts, one `<id>.md` each.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    #[must_use]
    pub fn path_for(&self, id: &str) -> PathBuf {
        self.dir.join(format!("{id}.md"))
    }

    /// Cross-process lock guarding edits to one artifact.
    #[must_use]
    pub fn lock_for(&self, id: &str) -> FileLock {
        FileLock::new(self.dir.join(format!("{id}.lock")))
    }

    /// First unused id for `date`: `YYYY-MM-DD`, then `YYYY-MM-DD-2`, ...
    #[must_use]
    pub fn next_id(&self, date: NaiveDate) -> String {
        candidate_ids(date)
            .find(|id| !self.path_for(id).exists())
            .unwrap_or_else(|| format!("{date}-{MAX_SUFFIX}"))
    }

    /// Write a new artifact dated `date`, assigning it the first free id.
    ///
    /// Never overwrites an existing file, even when another process creates
    /// one for the same date concurrently.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::AlreadyExists`] if every suffix for the date is
    /// taken, or [`StoreError`] if rendering or writing fails.
    pub fn create(
        &self,
        artifact: &mut BriefingArtifact,
        date: NaiveDate,
    ) -> Result<PathBuf, StoreError> {
        for id in candidate_ids(date) {
            let path = self.path_for(&id);
            if path.exists() {
                continue;
            }
            artifact.id = id;
            let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
            tmp.write_all(artifact.render_markdown()?.as_bytes())?;
            tmp.flush()?;
            match tmp.persist_noclobber(&path) {
                Ok(_) => {
                    tracing::info!(artifact = %artifact.id, path = %path.display(), entries = artifact.entries.len(), "artifact written");
                    return Ok(path);
                }
                Err(e) if e.error.kind() == std::io::ErrorKind::AlreadyExists => {}
                Err(e) => return Err(StoreError::Io(e.error)),
            }
        }
        Err(StoreError::AlreadyExists {
            path: self.path_for(&format!("{date}-{MAX_SUFFIX}")),
        })
    }

    /// Overwrite an existing artifact with its current state.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if rendering or writing fails.
    pub fn save(&self, artifact: &BriefingArtifact) -> Result<PathBuf, StoreError> {
        let path = self.path_for(&artifact.id);
        let mut tmp = tempfile::NamedTempFile::new_in(&self.dir)?;
        tmp.write_all(artifact.render_markdown()?.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&path).map_err(|e| StoreError::Io(e.error))?;
        Ok(path)
    }

    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] if no artifact has that id, or
    /// [`StoreError::Core`] if its header cannot be parsed.
    pub fn load(&self, id: &str) -> Result<BriefingArtifact, StoreError> {
        let path = self.path_for(id);
        let text = match std::fs::read_to_string(&path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StoreError::NotFound {
                    kind: "artifact",
                    id: id.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };
        Ok(BriefingArtifact::parse_markdown(&text)?)
    }

    /// Summaries of every readable artifact, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Io`] if the directory cannot be listed.
    pub fn list(&self) -> Result<Vec<ArtifactSummary>, StoreError> {
        let mut out = Vec::new();
        for entry in std::fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("md") {
                continue;
            }
            let parsed = std::fs::read_to_string(&path)
                .map_err(StoreError::from)
                .and_then(|text| Ok(BriefingArtifact::parse_markdown(&text)?));
            match parsed {
                Ok(artifact) => out.push(ArtifactSummary {
                    selected: artifact.selected().count(),
                    entries: artifact.entries.len(),
                    id: artifact.id,
                    created_at: artifact.created_at,
                    path,
                }),
                Err(e) => {
                    tracing::warn!(path = %path.display(), %e, "skipping unreadable artifact");
                }
            }
        }
        out.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(out)
    }

    /// Most recently created artifact, if any.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the directory or the artifact cannot be read.
    pub fn latest(&self) -> Result<Option<BriefingArtifact>, StoreError> {
        match self.list()?.first() {
            Some(summary) => self.load(&summary.id).map(Some),
            None => Ok(None),
        }
    }

    /// Toggle one entry's selection under the artifact lock.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown artifact,
    /// [`StoreError::Core`] for an unknown paper, or a lock error if another
    /// process holds the artifact.
    pub async fn set_selected(
        &self,
        id: &str,
        paper_id: &str,
        selected: bool,
    ) -> Result<BriefingArtifact, StoreError> {
        let _guard = self.lock_for(id).acquire().await?;
        let mut artifact = self.load(id)?;
        artifact.set_selected(paper_id, selected)?;
        self.save(&artifact)?;
        tracing::info!(artifact = %id, paper = %paper_id, selected, "selection updated");
        Ok(artifact)
    }
}

fn candidate_ids(date: NaiveDate) -> impl Iterator<Item = String> {
    std::iter::once(date.to_string()).chain((2..=MAX_SUFFIX).map(move |n| format!("{date}-{n}")))
}
