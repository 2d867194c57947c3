//! # sift-archive
//!
//! Turns the selected entries of a briefing artifact into reference-manager
//! items plus a local PDF and note stub per paper.
//!
//! Every step is idempotent. An entry that already has an [`ArchiveRecord`]
//! is reported as already archived; the reference item is found by its
//! `sift:<id>` tag before any creation; files are written through a `.part`
//! rename. The record is appended only after the item, the PDF and the note
//! all exist, so a failed entry is simply retried by the next call.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use sift_config::AttachmentMode;
use sift_content::DocumentSource;
use sift_core::analysis::AnalysisResult;
use sift_core::archive::{ArchiveOutcome, ArchiveRecord, ArchiveState};
use sift_core::errors::Classify;
use sift_core::paper::PaperRecord;
use sift_store::{ArchiveIndex, ArtifactStore};

mod error;
mod http;
pub mod item;
pub mod note;
pub mod zotero;

pub use error::{ArchiveError, ReferenceError};
pub use item::{Attachment, Creator, ItemMetadata, key_tag};
pub use zotero::ZoteroClient;

/// External reference library.
pub trait ReferenceManager: Send + Sync {
    /// Return the key of the item tagged `sift:<paper_id>`, creating it in
    /// `collection` (by name; empty means none) when it does not exist yet.
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceError`] on transport, credential or write failures.
    fn find_or_create_item(
        &self,
        paper_id: &str,
        metadata: &ItemMetadata,
        collection: &str,
    ) -> impl Future<Output = Result<String, ReferenceError>> + Send;

    /// File attachments already stored under `item_key`.
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceError`] on transport or parse failures.
    fn attachments(
        &self,
        item_key: &str,
    ) -> impl Future<Output = Result<Vec<Attachment>, ReferenceError>> + Send;

    /// Store `bytes` as a file attachment of `item_key`.
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceError`] on transport or upload failures.
    fn upload_attachment(
        &self,
        item_key: &str,
        filename: &str,
        bytes: &[u8],
    ) -> impl Future<Output = Result<(), ReferenceError>> + Send;

    /// Attach a link to a local file.
    ///
    /// # Errors
    ///
    /// Returns [`ReferenceError`] on transport or write failures.
    fn link_attachment(
        &self,
        item_key: &str,
        path: &Path,
    ) -> impl Future<Output = Result<(), ReferenceError>> + Send;
}

/// Wait for a concurrent archive call on the same artifact before giving up.
const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(300);

/// Archival of one artifact at a time.
pub struct ArchiveSync<R, D> {
    manager: R,
    documents: D,
    artifacts: ArtifactStore,
    index: ArchiveIndex,
    root: PathBuf,
    attachment_mode: AttachmentMode,
    lock_timeout: Duration,
}

impl<R: ReferenceManager, D: DocumentSource> ArchiveSync<R, D> {
    #[must_use]
    pub fn new(
        manager: R,
        documents: D,
        artifacts: ArtifactStore,
        index: ArchiveIndex,
        root: impl Into<PathBuf>,
        attachment_mode: AttachmentMode,
    ) -> Self {
        Self {
            manager,
            documents,
            artifacts,
            index,
            root: root.into(),
            attachment_mode,
            lock_timeout: DEFAULT_LOCK_TIMEOUT,
        }
    }

    #[must_use]
    pub const fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    #[must_use]
    pub fn pdf_path(&self, paper: &PaperRecord) -> PathBuf {
        self.root.join("pdfs").join(format!("{}.pdf", paper.file_stem()))
    }

    #[must_use]
    pub fn note_path(&self, paper: &PaperRecord) -> PathBuf {
        self.root.join("notes").join(format!("{}.md", paper.file_stem()))
    }

    /// Archive every selected entry of an artifact.
    ///
    /// Entries are processed in artifact order; one entry's failure never
    /// stops the others.
    ///
    /// # Errors
    ///
    /// Returns [`ArchiveError::Store`] if the artifact cannot be locked or
    /// loaded, or the archive index cannot be read.
    pub async fn archive(
        &self,
        artifact_id: &str,
        collection: &str,
    ) -> Result<Vec<ArchiveOutcome>, ArchiveError> {
        let _guard = self
            .artifacts
            .lock_for(artifact_id)
            .with_timeout(self.lock_timeout)
            .acquire()
            .await?;
        let artifact = self.artifacts.load(artifact_id)?;

        let mut outcomes = Vec::new();
        for entry in artifact.selected() {
            let paper = &entry.paper;
            if let Some(record) = self.index.get(&paper.id)? {
                outcomes.push(ArchiveOutcome::already_archived(&paper.title, &record));
                continue;
            }

            tracing::debug!(
                paper = %paper.id,
                from = %ArchiveState::Selected,
                to = %ArchiveState::Archiving,
                "archiving entry"
            );
            let outcome = match self.archive_entry(entry, collection).await {
                Ok(record) => {
                    tracing::info!(paper = %paper.id, item = %record.item_key, "archived");
                    ArchiveOutcome::archived(&paper.title, &record)
                }
                Err(failure) => {
                    let class = failure.error.class();
                    tracing::warn!(
                        paper = %paper.id,
                        class = %class,
                        error = %failure.error,
                        "archive failed"
                    );
                    ArchiveOutcome::failed(
                        &paper.id,
                        &paper.title,
                        failure.item_key,
                        class,
                        failure.error.to_string(),
                    )
                }
            };
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    async fn archive_entry(
        &self,
        entry: &AnalysisResult,
        collection: &str,
    ) -> Result<ArchiveRecord, EntryFailure> {
        let paper = &entry.paper;
        let metadata = ItemMetadata::from_result(entry);
        let item_key = self
            .manager
            .find_or_create_item(&paper.id, &metadata, collection)
            .await
            .map_err(|e| EntryFailure::new(None, e))?;
        let with_key = |e: ArchiveError| EntryFailure::new(Some(item_key.clone()), e);

        let bytes = self
            .documents
            .fetch_pdf(&pdf_url(paper))
            .await
            .map_err(|e| with_key(e.into()))?;
        let pdf_path = self.pdf_path(paper);
        write_via_part(&pdf_path, &bytes)
            .await
            .map_err(|e| with_key(e.into()))?;

        self.attach(&item_key, &pdf_path, &bytes).await;

        let archived_at = Utc::now();
        let note_path = self.note_path(paper);
        let note = note::render_note(entry, &item_key, &pdf_path, archived_at);
        write_via_part(&note_path, note.as_bytes())
            .await
            .map_err(|e| with_key(e.into()))?;

        let record = ArchiveRecord {
            paper_id: paper.id.clone(),
            item_key: item_key.clone(),
            pdf_path,
            note_path,
            archived_at,
        };
        self.index.append(&record).map_err(|e| with_key(e.into()))?;
        Ok(record)
    }

    /// Attach the PDF per the configured mode, skipping attachments a
    /// previous attempt already made. Attachment failures are logged; the
    /// local copy stays authoritative.
    async fn attach(&self, item_key: &str, pdf_path: &Path, bytes: &[u8]) {
        if !self.attachment_mode.uploads() && !self.attachment_mode.links() {
            return;
        }
        let existing = match self.manager.attachments(item_key).await {
            Ok(existing) => existing,
            Err(e) => {
                tracing::warn!(%item_key, %e, "cannot list attachments, not attaching");
                return;
            }
        };

        if self.attachment_mode.uploads() {
            let filename = pdf_path
                .file_name()
                .map_or_else(|| "paper.pdf".to_string(), |n| n.to_string_lossy().into_owned());
            let uploaded = existing
                .iter()
                .any(|a| matches!(a, Attachment::Uploaded { filename: f } if *f == filename));
            if uploaded {
                tracing::debug!(%item_key, %filename, "PDF already uploaded");
            } else if let Err(e) = self.manager.upload_attachment(item_key, &filename, bytes).await {
                tracing::warn!(%item_key, %e, "PDF upload failed");
            }
        }
        if self.attachment_mode.links() {
            let linked = existing
                .iter()
                .any(|a| matches!(a, Attachment::Linked { path } if path == pdf_path));
            if linked {
                tracing::debug!(%item_key, path = %pdf_path.display(), "PDF already linked");
            } else if let Err(e) = self.manager.link_attachment(item_key, pdf_path).await {
                tracing::warn!(%item_key, %e, "linked attachment failed");
            }
        }
    }
}

struct EntryFailure {
    item_key: Option<String>,
    error: ArchiveError,
}

impl EntryFailure {
    fn new(item_key: Option<String>, error: impl Into<ArchiveError>) -> Self {
        Self {
            item_key,
            error: error.into(),
        }
    }
}

fn pdf_url(paper: &PaperRecord) -> String {
    if paper.pdf_url.trim().is_empty() {
        format!("https://arxiv.org/pdf/{}", paper.id)
    } else {
        paper.pdf_url.clone()
    }
}

/// Write through `<path>.part` and rename, replacing any earlier partial file.
async fn write_via_part(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let mut part = path.as_os_str().to_owned();
    part.push(".part");
    let part = PathBuf::from(part);
    tokio::fs::write(&part, bytes).await?;
    tokio::fs::rename(&part, path).await
}
