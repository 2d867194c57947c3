use serde::Serialize;
use sift_config::SiftConfig;

use crate::bootstrap::open_stores;
use crate::cli::GlobalFlags;
use crate::cli::subcommands::CacheCommands;
use crate::output::output;

#[derive(Debug, Serialize)]
struct PurgeResponse {
    removed: usize,
    cache_dir: String,
}

/// Handle `sift cache`.
pub fn handle(
    action: &CacheCommands,
    config: &SiftConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let stores = open_stores(config)?;
    match action {
        CacheCommands::Purge => output(
            &PurgeResponse {
                removed: stores.cache.purge_expired()?,
                cache_dir: stores.cache.dir().display().to_string(),
            },
            flags.format,
        ),
    }
}
