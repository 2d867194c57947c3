//! General application configuration.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

fn default_data_dir() -> String {
    ".sift".to_string()
}

const fn default_workers() -> usize {
    4
}

fn default_user_agent() -> String {
    format!("sift/{} (research briefing)", env!("CARGO_PKG_VERSION"))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct GeneralConfig {
    /// Root for history, cache, artifacts and the archive index.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Papers acquired and analyzed concurrently.
    #[serde(default = "default_workers")]
    pub workers: usize,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            workers: default_workers(),
            user_agent: default_user_agent(),
        }
    }
}

impl GeneralConfig {
    #[must_use]
    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(&self.data_dir)
    }
}
