use sift_config::SiftConfig;

use crate::bootstrap::open_stores;
use crate::cli::subcommands::BriefsCommands;
use crate::cli::{GlobalFlags, OutputFormat};
use crate::output::output;

/// Handle `sift briefs`.
pub fn handle(
    action: &BriefsCommands,
    config: &SiftConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let stores = open_stores(config)?;
    match action {
        BriefsCommands::List => output(&stores.artifacts.list()?, flags.format),
        BriefsCommands::Show { id } => {
            let artifact = stores.artifacts.load(id)?;
            match flags.format {
                OutputFormat::Raw => {
                    print!("{}", artifact.render_markdown()?);
                    Ok(())
                }
                OutputFormat::Json => output(&artifact, flags.format),
            }
        }
    }
}
