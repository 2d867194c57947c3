//! Run status exposed to callers while a pipeline run is in flight.

use std::collections::VecDeque;
use std::fmt;

use chrono::{DateTime, Local, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::errors::CoreError;

/// Maximum number of log lines kept in the tail.
pub const LOG_TAIL_CAPACITY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    #[default]
    Idle,
    Busy,
    Error,
}

impl RunState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Busy => "busy",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for RunState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    #[default]
    Idle,
    Discovery,
    Analysis,
    Writing,
    Done,
}

impl Stage {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Discovery => "discovery",
            Self::Analysis => "analysis",
            Self::Writing => "writing",
            Self::Done => "done",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Snapshot of the current (or last) run.
///
/// `progress` never decreases within a run. The log tail keeps the most recent
/// [`LOG_TAIL_CAPACITY`] lines, each prefixed with a local `[HH:MM:SS]` stamp.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RunStatus {
    pub state: RunState,
    pub stage: Stage,
    pub message: String,
    pub progress: u64,
    pub total: u64,
    pub log: VecDeque<String>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl RunStatus {
    /// Enter the busy state for a new run.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidTransition`] if a run is already busy.
    pub fn begin(&mut self, message: impl Into<String>) -> Result<(), CoreError> {
        if self.state == RunState::Busy {
            return Err(CoreError::InvalidTransition {
                entity_type: "run".into(),
                id: "current".into(),
                from: self.state.to_string(),
                to: RunState::Busy.to_string(),
            });
        }
        let message = message.into();
        self.state = RunState::Busy;
        self.stage = Stage::Discovery;
        self.progress = 0;
        self.total = 0;
        self.started_at = Some(Utc::now());
        self.finished_at = None;
        self.log(&message);
        self.message = message;
        Ok(())
    }

    pub fn set_stage(&mut self, stage: Stage) {
        self.stage = stage;
    }

    /// Raise the expected total. Never drops below current progress.
    pub fn set_total(&mut self, total: u64) {
        self.total = total.max(self.progress);
    }

    pub fn advance(&mut self, by: u64) {
        self.progress = self.progress.saturating_add(by);
        if self.progress > self.total {
            self.total = self.progress;
        }
    }

    pub fn log(&mut self, line: &str) {
        let stamp = Local::now().format("%H:%M:%S");
        self.log.push_back(format!("[{stamp}] {line}"));
        while self.log.len() > LOG_TAIL_CAPACITY {
            self.log.pop_front();
        }
    }

    pub fn finish(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.log(&message);
        self.state = RunState::Idle;
        self.stage = Stage::Done;
        self.message = message;
        self.finished_at = Some(Utc::now());
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.log(&message);
        self.state = RunState::Error;
        self.message = message;
        self.finished_at = Some(Utc::now());
    }
}
