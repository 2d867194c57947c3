use std::io::IsTerminal;
use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use sift_core::status::{RunState, RunStatus};
use sift_pipeline::StatusHandle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::cli::GlobalFlags;

const POLL_INTERVAL: Duration = Duration::from_millis(200);

pub struct Progress {
    bar: Option<ProgressBar>,
}

fn bar_template() -> &'static str {
    match std::env::var("COLUMNS").ok().and_then(|v| v.parse::<usize>().ok()) {
        Some(cols) if cols >= 110 => "{spinner:.cyan} [{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} {msg}",
        _ => "{spinner:.cyan} {wide_bar:.cyan/blue} {pos}/{len} {msg}",
    }
}

impl Progress {
    /// A bar on stderr, or nothing when quiet or not attached to a terminal.
    #[must_use]
    pub fn for_run(flags: &GlobalFlags) -> Self {
        if flags.quiet || !std::io::stderr().is_terminal() {
            return Self { bar: None };
        }
        let bar = ProgressBar::new(0);
        bar.enable_steady_tick(Duration::from_millis(100));
        bar.set_style(
            ProgressStyle::with_template(bar_template())
                .unwrap_or_else(|_| ProgressStyle::default_bar()),
        );
        bar.set_message("discovering");
        Self { bar: Some(bar) }
    }

    pub fn sync(&self, status: &RunStatus) {
        let Some(bar) = &self.bar else {
            return;
        };
        bar.set_length(status.total);
        bar.set_position(status.progress);
        let line = status
            .log
            .back()
            .map_or_else(|| status.stage.to_string(), |l| format!("{}: {l}", status.stage));
        bar.set_message(line);
    }

    pub fn finish(&self, status: &RunStatus) {
        if let Some(bar) = &self.bar {
            match status.state {
                RunState::Error => bar.abandon_with_message(status.message.clone()),
                RunState::Idle | RunState::Busy => bar.finish_with_message(status.message.clone()),
            }
        }
    }
}

/// Mirror `status` onto `progress` until `done` fires, then draw the final
/// state.
pub fn follow(status: StatusHandle, progress: Progress, done: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            let finished = tokio::select! {
                () = done.cancelled() => true,
                () = tokio::time::sleep(POLL_INTERVAL) => false,
            };
            let snapshot = status
                .lock()
                .unwrap_or_else(std::sync::PoisonError::into_inner)
                .clone();
            if finished {
                progress.finish(&snapshot);
                return;
            }
            progress.sync(&snapshot);
        }
    })
}
