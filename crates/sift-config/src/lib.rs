//! # sift-config
//!
//! Layered configuration loading for Sift using figment.
//!
//! Configuration sources (in priority order, highest wins):
//! 1. Environment variables (`SIFT_*` prefix, `__` as separator)
//! 2. Well-known provider keys (`OPENAI_API_KEY`, `ANTHROPIC_API_KEY`,
//!    `GEMINI_API_KEY`, `ZOTERO_API_KEY`)
//! 3. Project-level `.sift/config.toml`
//! 4. User-level `~/.config/sift/config.toml`
//! 5. Built-in defaults
//!
//! # Environment Variable Mapping
//!
//! Figment maps `SIFT_LLM__PROVIDER` -> `llm.provider`,
//! `SIFT_ZOTERO__LIBRARY_ID` -> `zotero.library_id`, etc.
//!
//! The loaded [`SiftConfig`] is an immutable value. Components receive it (or
//! the section they need) at construction and never re-read configuration
//! mid-run.

mod acquisition;
mod error;
mod feed;
mod general;
mod llm;
mod schedule;
mod zotero;

pub use acquisition::AcquisitionConfig;
pub use error::ConfigError;
pub use feed::{CombineMode, FeedConfig, QueryMode, SortBy};
pub use general::GeneralConfig;
pub use llm::{LlmConfig, Provider, ProviderSettings};
pub use schedule::ScheduleConfig;
pub use zotero::{AttachmentMode, LibraryType, ZoteroConfig};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use sift_core::template::{AnalysisTemplate, TemplateField};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct SiftConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub feed: FeedConfig,
    #[serde(default)]
    pub acquisition: AcquisitionConfig,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub zotero: ZoteroConfig,
    #[serde(default)]
    pub schedule: ScheduleConfig,
    /// Analysis fields. Empty means the built-in template.
    #[serde(default)]
    pub template: Vec<TemplateField>,
}

impl SiftConfig {
    /// Load configuration from all sources (TOML files + environment variables).
    ///
    /// Does NOT call `dotenvy`; use [`Self::load_with_dotenv`] for `.env` support.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Figment`] if a source cannot be parsed.
    pub fn load() -> Result<Self, ConfigError> {
        Self::figment().extract().map_err(ConfigError::from)
    }

    /// Load configuration rooted at a project directory instead of the cwd.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Figment`] if a source cannot be parsed.
    pub fn load_from(project: &Path) -> Result<Self, ConfigError> {
        Self::figment_for(project).extract().map_err(ConfigError::from)
    }

    /// Load configuration with `.env` file support.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Figment`] if a source cannot be parsed.
    pub fn load_with_dotenv(project: &Path) -> Result<Self, ConfigError> {
        let _ = dotenvy::from_path(project.join(".env"));
        Self::load_from(project)
    }

    /// Build the figment provider chain for the current directory.
    #[must_use]
    pub fn figment() -> Figment {
        Self::figment_for(Path::new("."))
    }

    /// Build the figment provider chain for a project directory.
    ///
    /// Public so tests can inspect the figment directly or add providers on top.
    #[must_use]
    pub fn figment_for(project: &Path) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                figment = figment.merge(Toml::file(global_path));
            }
        }

        let local_path = project.join(".sift").join("config.toml");
        if local_path.exists() {
            figment = figment.merge(Toml::file(local_path));
        }

        figment
            .merge(Self::provider_key_env())
            .merge(Env::prefixed("SIFT_").split("__"))
    }

    /// Conventional provider key variables, mapped into their sections.
    fn provider_key_env() -> Env {
        Env::raw()
            .only(&[
                "OPENAI_API_KEY",
                "ANTHROPIC_API_KEY",
                "GEMINI_API_KEY",
                "ZOTERO_API_KEY",
            ])
            .map(|key| {
                let mapped = if key == "OPENAI_API_KEY" {
                    "llm.openai.api_key"
                } else if key == "ANTHROPIC_API_KEY" {
                    "llm.anthropic.api_key"
                } else if key == "GEMINI_API_KEY" {
                    "llm.gemini.api_key"
                } else {
                    "zotero.api_key"
                };
                mapped.into()
            })
    }

    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("sift").join("config.toml"))
    }

    /// Fail fast on configuration a run cannot start with.
    ///
    /// Checks the analysis template, scheduling bounds, worker count and, when
    /// analysis is on, the selected provider's credential. Zotero settings are
    /// checked separately by [`Self::require_zotero`] because only archival
    /// needs them.
    ///
    /// # Errors
    ///
    /// Returns the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.analysis_template()?;

        if self.general.workers == 0 {
            return Err(ConfigError::InvalidValue {
                field: "general.workers".into(),
                reason: "must be at least 1".into(),
            });
        }
        if self.schedule.hour > 23 || self.schedule.minute > 59 {
            return Err(ConfigError::InvalidValue {
                field: "schedule".into(),
                reason: format!(
                    "{:02}:{:02} is not a time of day",
                    self.schedule.hour, self.schedule.minute
                ),
            });
        }
        if self.llm.analyze {
            self.require_llm()?;
        }
        Ok(())
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCredential`] when the selected provider
    /// needs a key that is not set.
    pub fn require_llm(&self) -> Result<(), ConfigError> {
        self.llm.require_key()
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::NotConfigured`] when the key or library id is missing.
    pub fn require_zotero(&self) -> Result<(), ConfigError> {
        if self.zotero.is_configured() {
            Ok(())
        } else {
            Err(ConfigError::NotConfigured {
                section: "zotero".into(),
            })
        }
    }

    /// The analysis template in effect.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a malformed template.
    pub fn analysis_template(&self) -> Result<AnalysisTemplate, ConfigError> {
        if self.template.is_empty() {
            return Ok(AnalysisTemplate::default());
        }
        AnalysisTemplate::new(self.template.clone()).map_err(|e| ConfigError::InvalidValue {
            field: "template".into(),
            reason: e.to_string(),
        })
    }

    #[must_use]
    pub fn data_dir(&self) -> PathBuf {
        self.general.data_path()
    }

    #[must_use]
    pub fn archive_root(&self) -> PathBuf {
        self.zotero.archive_root(&self.data_dir())
    }

    /// Read-only view for display. Credentials are reduced to presence flags.
    #[must_use]
    pub fn surface(&self) -> ConfigSurface {
        let template = self
            .analysis_template()
            .map(|t| t.generated_fields())
            .unwrap_or_default();
        ConfigSurface {
            provider: self.llm.provider,
            model: self.llm.selected().model.clone(),
            analyze: self.llm.analyze,
            llm_key_present: self.llm.selected().has_key(),
            zotero_key_present: !self.zotero.api_key.trim().is_empty(),
            zotero_library_type: self.zotero.library_type,
            zotero_library_id: self.zotero.library_id.clone(),
            zotero_collection: self.zotero.collection.clone(),
            attachment_mode: self.zotero.attachment_mode,
            data_dir: self.general.data_dir.clone(),
            archive_dir: self.archive_root().display().to_string(),
            workers: self.general.workers,
            acquisition: self.acquisition.clone(),
            schedule: self.schedule.clone(),
            default_queries: self.feed.queries.clone(),
            template,
        }
    }
}

/// Configuration as shown to users. Never carries secret values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConfigSurface {
    pub provider: Provider,
    pub model: String,
    pub analyze: bool,
    pub llm_key_present: bool,
    pub zotero_key_present: bool,
    pub zotero_library_type: LibraryType,
    pub zotero_library_id: String,
    pub zotero_collection: String,
    pub attachment_mode: AttachmentMode,
    pub data_dir: String,
    pub archive_dir: String,
    pub workers: usize,
    pub acquisition: AcquisitionConfig,
    pub schedule: ScheduleConfig,
    pub default_queries: Vec<String>,
    pub template: Vec<TemplateField>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_needs_llm_key() {
        let config = SiftConfig::default();
        let err = config.validate().unwrap_err();
        assert!(matches!(err, ConfigError::MissingCredential { .. }));
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn analysis_off_skips_credential_check() {
        let mut config = SiftConfig::default();
        config.llm.analyze = false;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn zero_workers_rejected() {
        let mut config = SiftConfig::default();
        config.llm.analyze = false;
        config.general.workers = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn surface_hides_secrets() {
        let mut config = SiftConfig::default();
        config.llm.openai.api_key = "sk-very-secret".into();
        config.zotero.api_key = "zotero-secret".into();

        let surface = config.surface();
        assert!(surface.llm_key_present);
        assert!(surface.zotero_key_present);

        let json = serde_json::to_string(&surface).unwrap();
        assert!(!json.contains("sk-very-secret"));
        assert!(!json.contains("zotero-secret"));
        assert!(json.contains("\"assessment\""));
    }
}
