use anyhow::Context;
use serde::Serialize;
use sift_config::SiftConfig;
use sift_core::status::RunStatus;
use sift_feed::DateRange;
use sift_feed::query::parse_date;
use sift_pipeline::{LivePipeline, RunReport, RunRequest};
use tokio_util::sync::CancellationToken;

use crate::cli::GlobalFlags;
use crate::cli::root_commands::RunArgs;
use crate::output::output;
use crate::progress::{self, Progress};

#[derive(Debug, Serialize)]
struct RunResponse {
    report: RunReport,
    status: RunStatus,
}

/// Handle `sift run`.
pub async fn handle(args: &RunArgs, mut config: SiftConfig, flags: &GlobalFlags) -> anyhow::Result<()> {
    if args.no_analyze {
        config.llm.analyze = false;
    }
    config.validate()?;

    let request = request(args, &config)?;
    let pipeline = LivePipeline::from_config(&config, config.llm.analyze)?;

    let cancel = super::interrupt_token();
    let done = CancellationToken::new();
    let watcher = progress::follow(pipeline.status(), Progress::for_run(flags), done.clone());

    let outcome = pipeline.run(&request, &cancel).await;
    done.cancel();
    let _ = watcher.await;

    let report = outcome.context("run failed")?;
    output(
        &RunResponse {
            report,
            status: pipeline.snapshot(),
        },
        flags.format,
    )
}

fn request(args: &RunArgs, config: &SiftConfig) -> anyhow::Result<RunRequest> {
    let mut request = RunRequest::from_feed(&config.feed);
    if !args.queries.is_empty() {
        request.queries.clone_from(&args.queries);
    }
    if let Some(max) = args.max_results {
        anyhow::ensure!(max > 0, "--max must be at least 1");
        request.max_results = max;
    }
    let from = args.from.as_deref().map(parse_date).transpose()?;
    let to = args.to.as_deref().map(parse_date).transpose()?;
    request.range = DateRange::from_bounds(from, to);
    if let Some(range) = &request.range {
        anyhow::ensure!(
            range.from <= range.to,
            "--from {} is after --to {}",
            range.from,
            range.to
        );
    }
    Ok(request)
}
