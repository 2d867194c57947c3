//! Language-model provider configuration.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Provider {
    #[default]
    Openai,
    Anthropic,
    Gemini,
    Ollama,
}

impl Provider {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Openai => "openai",
            Self::Anthropic => "anthropic",
            Self::Gemini => "gemini",
            Self::Ollama => "ollama",
        }
    }

    /// Local providers run without an API key.
    #[must_use]
    pub const fn requires_key(self) -> bool {
        !matches!(self, Self::Ollama)
    }

    /// Environment variable that supplies the key.
    #[must_use]
    pub const fn key_env(self) -> &'static str {
        match self {
            Self::Openai => "OPENAI_API_KEY",
            Self::Anthropic => "ANTHROPIC_API_KEY",
            Self::Gemini => "GEMINI_API_KEY",
            Self::Ollama => "SIFT_LLM__OLLAMA__API_KEY",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection settings for one provider.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct ProviderSettings {
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub base_url: String,
    #[serde(default)]
    pub model: String,
}

impl ProviderSettings {
    fn new(base_url: &str, model: &str) -> Self {
        Self {
            api_key: String::new(),
            base_url: base_url.to_string(),
            model: model.to_string(),
        }
    }

    #[must_use]
    pub fn has_key(&self) -> bool {
        !self.api_key.trim().is_empty()
    }
}

const fn default_true() -> bool {
    true
}

const fn default_max_tokens() -> u32 {
    2048
}

const fn default_temperature() -> f32 {
    0.3
}

const fn default_timeout_secs() -> u64 {
    120
}

fn default_openai() -> ProviderSettings {
    ProviderSettings::new("https://api.openai.com/v1", "gpt-4o")
}

fn default_anthropic() -> ProviderSettings {
    ProviderSettings::new("https://api.anthropic.com", "claude-3-5-sonnet-20240620")
}

fn default_gemini() -> ProviderSettings {
    ProviderSettings::new(
        "https://generativelanguage.googleapis.com/v1beta",
        "gemini-1.5-pro",
    )
}

fn default_ollama() -> ProviderSettings {
    ProviderSettings::new("http://localhost:11434", "llama3")
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct LlmConfig {
    /// Run the analysis engine. When off every field reads "not analyzed".
    #[serde(default = "default_true")]
    pub analyze: bool,

    #[serde(default)]
    pub provider: Provider,

    /// Output token cap per generated field.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_openai")]
    pub openai: ProviderSettings,

    #[serde(default = "default_anthropic")]
    pub anthropic: ProviderSettings,

    #[serde(default = "default_gemini")]
    pub gemini: ProviderSettings,

    #[serde(default = "default_ollama")]
    pub ollama: ProviderSettings,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            analyze: true,
            provider: Provider::default(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_timeout_secs(),
            openai: default_openai(),
            anthropic: default_anthropic(),
            gemini: default_gemini(),
            ollama: default_ollama(),
        }
    }
}

impl LlmConfig {
    /// Settings of the selected provider.
    #[must_use]
    pub const fn selected(&self) -> &ProviderSettings {
        match self.provider {
            Provider::Openai => &self.openai,
            Provider::Anthropic => &self.anthropic,
            Provider::Gemini => &self.gemini,
            Provider::Ollama => &self.ollama,
        }
    }

    /// Whether the selected provider can be called.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        !self.provider.requires_key() || self.selected().has_key()
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::MissingCredential`] naming the variables that
    /// supply the selected provider's key.
    pub fn require_key(&self) -> Result<(), ConfigError> {
        if self.is_configured() {
            return Ok(());
        }
        Err(ConfigError::MissingCredential {
            provider: self.provider.to_string(),
            hint: format!(
                "{} or SIFT_LLM__{}__API_KEY",
                self.provider.key_env(),
                self.provider.as_str().to_uppercase()
            ),
        })
    }
}
