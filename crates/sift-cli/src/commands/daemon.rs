use sift_config::SiftConfig;
use sift_pipeline::scheduler::DailySchedule;
use sift_pipeline::{LivePipeline, RunRequest};

/// Handle `sift daemon`: the same run entry point, once a day at the
/// configured local time, until Ctrl-C.
pub async fn handle(config: &SiftConfig) -> anyhow::Result<()> {
    let schedule = DailySchedule::from_config(&config.schedule)?;
    let mut config = config.clone();
    config.llm.analyze = config.schedule.analyze;
    config.validate()?;

    let pipeline = LivePipeline::from_config(&config, config.llm.analyze)?;
    let request = RunRequest::scheduled(&config.schedule, &config.feed);
    let cancel = super::interrupt_token();
    tracing::info!(
        hour = config.schedule.hour,
        minute = config.schedule.minute,
        queries = request.queries.len(),
        "daemon started"
    );

    let (pipeline, request, token) = (&pipeline, &request, &cancel);
    schedule
        .run_forever(&cancel, move || async move {
            match pipeline.run(request, token).await {
                Ok(report) => tracing::info!(summary = %report.summary(), "scheduled run finished"),
                Err(e) => tracing::error!(error = %e, "scheduled run failed"),
            }
        })
        .await;

    tracing::info!("daemon stopped");
    Ok(())
}
