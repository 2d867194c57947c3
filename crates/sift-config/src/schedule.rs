//! Daily schedule configuration.

use serde::{Deserialize, Serialize};

const fn default_true() -> bool {
    true
}

const fn default_hour() -> u32 {
    8
}

const fn default_max_results() -> usize {
    30
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct ScheduleConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Local hour of day, 0-23.
    #[serde(default = "default_hour")]
    pub hour: u32,

    #[serde(default)]
    pub minute: u32,

    /// Queries for scheduled runs. Empty means the feed defaults.
    #[serde(default)]
    pub queries: Vec<String>,

    #[serde(default = "default_max_results")]
    pub max_results: usize,

    #[serde(default = "default_true")]
    pub analyze: bool,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            hour: default_hour(),
            minute: 0,
            queries: Vec::new(),
            max_results: default_max_results(),
            analyze: true,
        }
    }
}
