use std::path::{Path, PathBuf};

use anyhow::Context;
use sift_config::SiftConfig;
use sift_store::Stores;

use crate::cli::GlobalFlags;

/// Project root: `--project` (or its parent when it names `.sift`
/// itself), otherwise the current directory.
pub fn project_root(flags: &GlobalFlags) -> anyhow::Result<PathBuf> {
    let Some(project) = &flags.project else {
        return std::env::current_dir().context("failed to read current directory");
    };

    let explicit = PathBuf::from(project);
    if explicit
        .file_name()
        .and_then(|name| name.to_str())
        .is_some_and(|name| name == ".sift")
    {
        return explicit
            .parent()
            .map(Path::to_path_buf)
            .context("invalid --project path: '.sift' directory has no parent");
    }
    if explicit.is_dir() {
        return Ok(explicit);
    }
    anyhow::bail!(
        "invalid --project '{}': directory does not exist",
        explicit.display()
    )
}

/// Load `.env` and the layered configuration, with relative data and archive
/// directories anchored at the project root.
pub fn load_config(flags: &GlobalFlags) -> anyhow::Result<SiftConfig> {
    let root = project_root(flags)?;
    let mut config = SiftConfig::load_with_dotenv(&root)
        .with_context(|| format!("failed to load configuration for {}", root.display()))?;

    config.general.data_dir = anchor(&root, &config.general.data_dir);
    if !config.zotero.archive_dir.trim().is_empty() {
        config.zotero.archive_dir = anchor(&root, &config.zotero.archive_dir);
    }
    tracing::debug!(root = %root.display(), data_dir = %config.general.data_dir, "configuration loaded");
    Ok(config)
}

pub fn open_stores(config: &SiftConfig) -> anyhow::Result<Stores> {
    Stores::open(
        config.data_dir(),
        config.acquisition.pdf_ttl_days,
        config.acquisition.source_ttl_days,
    )
    .with_context(|| format!("failed to open data directory {}", config.data_dir().display()))
}

fn anchor(root: &Path, dir: &str) -> String {
    let path = Path::new(dir);
    if path.is_absolute() {
        dir.to_string()
    } else {
        root.join(path).to_string_lossy().into_owned()
    }
}
