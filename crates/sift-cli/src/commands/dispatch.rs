use sift_config::SiftConfig;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::Commands;
use crate::commands;

/// Dispatch a parsed command to the corresponding handler module.
pub async fn dispatch(
    command: Commands,
    config: SiftConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    match command {
        Commands::Run(args) => commands::run::handle(&args, config, flags).await,
        Commands::Archive(args) => commands::archive::handle(&args, &config, flags).await,
        Commands::Briefs { action } => commands::briefs::handle(&action, &config, flags),
        Commands::Select(args) => commands::select::handle(&args, &config, flags).await,
        Commands::Config { action } => commands::config::handle(&action, &config, flags),
        Commands::Cache { action } => commands::cache::handle(&action, &config, flags),
        Commands::Daemon => commands::daemon::handle(&config).await,
    }
}
