//! # sift-content
//!
//! Full-text acquisition for Sift.
//!
//! [`ContentResolver::resolve`] turns a paper into a [`ContentBlob`] through
//! three tiers: the PDF, the LaTeX source archive when the PDF text is short,
//! and finally metadata only. Every successful extraction is cached per tier
//! with a TTL, and a fresh cache entry short-circuits all network access.
//! Resolution never fails: a paper whose documents cannot be fetched or read
//! resolves to a [`Tier::None`] blob.

pub mod http;
pub mod latex;
pub mod pdf;
pub mod truncate;

mod error;

pub use error::FetchError;
pub use http::{DocumentSource, HttpDocumentSource};

use std::sync::Arc;

use sift_config::AcquisitionConfig;
use sift_core::content::{ContentBlob, Tier};
use sift_core::errors::Classify;
use sift_core::paper::PaperRecord;
use sift_store::ContentCache;

use crate::truncate::truncate_to_tokens;

/// Tiered, cached text extraction for papers.
pub struct ContentResolver<D> {
    source: D,
    cache: Arc<ContentCache>,
    config: AcquisitionConfig,
}

impl<D: DocumentSource> ContentResolver<D> {
    #[must_use]
    pub const fn new(source: D, cache: Arc<ContentCache>, config: AcquisitionConfig) -> Self {
        Self {
            source,
            cache,
            config,
        }
    }

    #[must_use]
    pub const fn source(&self) -> &D {
        &self.source
    }

    #[must_use]
    pub const fn config(&self) -> &AcquisitionConfig {
        &self.config
    }

    /// Best available text for `paper`.
    ///
    /// Cache precedence: a fresh PDF entry long enough to skip the fallback,
    /// then a fresh source entry (fallback enabled) or a fresh short PDF
    /// entry (fallback disabled). Anything else extracts again. Work for one paper holds that
    /// paper's cache lock throughout, so concurrent resolves of the same id
    /// download once.
    pub async fn resolve(&self, paper: &PaperRecord) -> ContentBlob {
        if !self.config.full_text {
            return ContentBlob::none(&paper.id);
        }

        let _guard = self.cache.lock(&paper.id).await;
        let min_chars = self.config.min_chars();

        let cached_pdf = self.cache.get(&paper.id, Tier::Pdf).fresh();
        if let Some(blob) = cached_pdf.as_ref().filter(|b| b.char_count() >= min_chars) {
            tracing::debug!(paper = %paper.id, tier = "pdf", "content cache hit");
            return blob.clone();
        }
        if self.config.source_fallback {
            if let Some(blob) = self.cache.get(&paper.id, Tier::Source).fresh() {
                tracing::debug!(paper = %paper.id, tier = "source", "content cache hit");
                return blob;
            }
        } else if let Some(blob) = cached_pdf {
            tracing::debug!(paper = %paper.id, tier = "pdf", "content cache hit (short)");
            return blob;
        }

        let pdf = match cached_pdf {
            Some(blob) => Some(blob),
            None => self.extract_pdf(paper).await,
        };

        let short = pdf.as_ref().is_none_or(|b| b.char_count() < min_chars);
        if short && self.config.source_fallback {
            tracing::info!(paper = %paper.id, "PDF text short, trying source archive");
            if let Some(source) = self.extract_source(paper).await {
                if pdf
                    .as_ref()
                    .is_none_or(|p| source.char_count() > p.char_count())
                {
                    return source;
                }
            }
        }

        pdf.unwrap_or_else(|| {
            tracing::warn!(paper = %paper.id, "no full text available, using metadata only");
            ContentBlob::none(&paper.id)
        })
    }

    async fn extract_pdf(&self, paper: &PaperRecord) -> Option<ContentBlob> {
        let bytes = match self.source.fetch_pdf(&paper.pdf_url).await {
            Ok(bytes) => bytes,
            Err(e) => {
                tracing::warn!(paper = %paper.id, url = %paper.pdf_url, class = %e.class(), %e, "PDF download failed");
                return None;
            }
        };
        let byte_size = bytes.len() as u64;

        let extracted = match pdf::extract_body(bytes, self.config.page_budget()).await {
            Ok(extracted) => extracted,
            Err(e) => {
                tracing::warn!(paper = %paper.id, %e, "PDF text extraction failed");
                return None;
            }
        };
        let Some(body) = extracted.body else {
            tracing::warn!(paper = %paper.id, pages = extracted.page_count, "PDF has no extractable body");
            return None;
        };

        let text = truncate_to_tokens(&body, self.config.token_budget());
        let blob = ContentBlob::new(
            &paper.id,
            Tier::Pdf,
            text,
            byte_size,
            Some(extracted.page_count),
        );
        self.store(&blob);
        Some(blob)
    }

    async fn extract_source(&self, paper: &PaperRecord) -> Option<ContentBlob> {
        let url = format!(
            "{}/{}",
            self.config.source_base_url.trim_end_matches('/'),
            paper.id
        );
        let archive = match self.source.fetch_source_archive(&url).await {
            Ok(archive) => archive,
            Err(e) => {
                tracing::warn!(paper = %paper.id, %url, class = %e.class(), %e, "source download failed");
                return None;
            }
        };
        let byte_size = archive.len() as u64;
        let max_bytes = self.config.max_source_bytes();

        let text = tokio::task::spawn_blocking(move || latex::source_text(&archive, max_bytes))
            .await
            .map_err(|e| FetchError::Extraction(format!("extraction task failed: {e}")))
            .and_then(|r| r);
        let text = match text {
            Ok(Some(text)) => text,
            Ok(None) => {
                tracing::warn!(paper = %paper.id, "source archive has no usable .tex file");
                return None;
            }
            Err(e) => {
                tracing::warn!(paper = %paper.id, %e, "source extraction failed");
                return None;
            }
        };

        let text = truncate_to_tokens(&text, self.config.token_budget());
        let blob = ContentBlob::new(&paper.id, Tier::Source, text, byte_size, None);
        self.store(&blob);
        Some(blob)
    }

    fn store(&self, blob: &ContentBlob) {
        if let Err(e) = self.cache.put(blob) {
            tracing::warn!(paper = %blob.paper_id, tier = %blob.tier, %e, "failed to cache content");
        }
    }
}
