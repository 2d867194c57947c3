use anyhow::Context;
use serde::Serialize;
use sift_archive::{ArchiveSync, ZoteroClient};
use sift_config::SiftConfig;
use sift_content::HttpDocumentSource;
use sift_core::archive::{ArchiveOutcome, ArchiveState};

use crate::bootstrap::open_stores;
use crate::cli::GlobalFlags;
use crate::cli::root_commands::ArchiveArgs;
use crate::output::output;

#[derive(Debug, Serialize)]
struct ArchiveResponse {
    artifact: String,
    collection: String,
    archived: usize,
    failed: usize,
    outcomes: Vec<ArchiveOutcome>,
}

/// Handle `sift archive`.
pub async fn handle(
    args: &ArchiveArgs,
    config: &SiftConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    config.require_zotero()?;
    let stores = open_stores(config)?;

    let artifact = match &args.id {
        Some(id) => id.clone(),
        None => stores
            .artifacts
            .latest()?
            .map(|a| a.id)
            .context("no briefings yet, run `sift run` first")?,
    };
    let collection = args
        .collection
        .clone()
        .unwrap_or_else(|| config.zotero.collection.clone());

    let user_agent = &config.general.user_agent;
    let sync = ArchiveSync::new(
        ZoteroClient::new(&config.zotero, user_agent)?,
        HttpDocumentSource::new(&config.acquisition, user_agent)?,
        stores.artifacts.clone(),
        stores.archive.clone(),
        config.archive_root(),
        config.zotero.attachment_mode,
    );
    let outcomes = sync.archive(&artifact, &collection).await?;

    let failed = outcomes
        .iter()
        .filter(|o| o.state == ArchiveState::Failed)
        .count();
    if failed > 0 {
        tracing::warn!(%artifact, failed, "some entries failed to archive; rerun to retry them");
    }
    output(
        &ArchiveResponse {
            archived: outcomes.len() - failed,
            failed,
            artifact,
            collection,
            outcomes,
        },
        flags.format,
    )
}
