use sift_config::SiftConfig;

use crate::cli::GlobalFlags;
use crate::cli::subcommands::ConfigCommands;
use crate::output::output;

/// Handle `sift config`.
pub fn handle(
    action: &ConfigCommands,
    config: &SiftConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match action {
        ConfigCommands::Show => output(&config.surface(), flags.format),
    }
}
