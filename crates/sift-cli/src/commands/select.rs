use serde::Serialize;
use sift_config::SiftConfig;

use crate::bootstrap::open_stores;
use crate::cli::GlobalFlags;
use crate::cli::root_commands::SelectArgs;
use crate::output::output;

#[derive(Debug, Serialize)]
struct SelectResponse<'a> {
    artifact: &'a str,
    paper: &'a str,
    selected: bool,
    selected_total: usize,
}

/// Handle `sift select`.
pub async fn handle(
    args: &SelectArgs,
    config: &SiftConfig,
    flags: &GlobalFlags,
) -> anyhow::Result<()> {
    let stores = open_stores(config)?;
    let artifact = stores
        .artifacts
        .set_selected(&args.id, &args.paper, !args.off)
        .await?;

    output(
        &SelectResponse {
            artifact: &args.id,
            paper: &args.paper,
            selected: !args.off,
            selected_total: artifact.selected().count(),
        },
        flags.format,
    )
}
