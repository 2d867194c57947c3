//! Provider clients behind [`TextGenerator`].
//!
//! One client per provider, each owning its `reqwest::Client`. [`LlmBackend`]
//! picks the configured one at startup so the engine stays generic over a
//! single concrete type.

mod anthropic;
mod gemini;
mod ollama;
mod openai;

use std::time::Duration;

use sift_config::{LlmConfig, Provider};

pub use anthropic::AnthropicClient;
pub use gemini::GeminiClient;
pub use ollama::OllamaClient;
pub use openai::OpenAiClient;

use crate::TextGenerator;
use crate::error::LlmError;
use crate::prompt::Prompt;

/// Transport settings shared by every provider client.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub temperature: f32,
    pub timeout: Duration,
    pub user_agent: String,
}

impl ClientOptions {
    #[must_use]
    pub fn from_config(config: &LlmConfig, user_agent: &str) -> Self {
        Self {
            temperature: config.temperature,
            timeout: Duration::from_secs(config.timeout_secs),
            user_agent: user_agent.to_string(),
        }
    }

    pub(crate) fn http_client(&self) -> Result<reqwest::Client, LlmError> {
        Ok(reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .build()?)
    }
}

/// The configured provider.
pub enum LlmBackend {
    OpenAi(OpenAiClient),
    Anthropic(AnthropicClient),
    Gemini(GeminiClient),
    Ollama(OllamaClient),
}

impl LlmBackend {
    /// Build the client for `config.provider`.
    ///
    /// # Errors
    ///
    /// Returns [`LlmError::Configuration`] when the provider needs a key that
    /// is not set. No request is made in that case.
    pub fn from_config(config: &LlmConfig, user_agent: &str) -> Result<Self, LlmError> {
        config.require_key()?;
        let options = ClientOptions::from_config(config, user_agent);
        let settings = config.selected();
        Ok(match config.provider {
            Provider::Openai => Self::OpenAi(OpenAiClient::new(settings, &options)?),
            Provider::Anthropic => Self::Anthropic(AnthropicClient::new(settings, &options)?),
            Provider::Gemini => Self::Gemini(GeminiClient::new(settings, &options)?),
            Provider::Ollama => Self::Ollama(OllamaClient::new(settings, &options)?),
        })
    }

    #[must_use]
    pub const fn provider(&self) -> Provider {
        match self {
            Self::OpenAi(_) => Provider::Openai,
            Self::Anthropic(_) => Provider::Anthropic,
            Self::Gemini(_) => Provider::Gemini,
            Self::Ollama(_) => Provider::Ollama,
        }
    }
}

impl TextGenerator for LlmBackend {
    async fn generate(&self, prompt: &Prompt, max_tokens: u32) -> Result<String, LlmError> {
        match self {
            Self::OpenAi(c) => c.generate(prompt, max_tokens).await,
            Self::Anthropic(c) => c.generate(prompt, max_tokens).await,
            Self::Gemini(c) => c.generate(prompt, max_tokens).await,
            Self::Ollama(c) => c.generate(prompt, max_tokens).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sift_config::ConfigError;
    use sift_core::errors::{Classify, ErrorClass};

    #[test]
    fn missing_key_fails_before_any_request() {
        let config = LlmConfig::default();
        let Err(err) = LlmBackend::from_config(&config, "sift-test") else {
            panic!("expected a configuration error");
        };
        assert!(matches!(
            err,
            LlmError::Configuration(ConfigError::MissingCredential { .. })
        ));
        assert_eq!(err.class(), ErrorClass::Configuration);
        assert!(err.to_string().contains("OPENAI_API_KEY"));
    }

    #[test]
    fn ollama_builds_without_key() {
        let config = LlmConfig {
            provider: Provider::Ollama,
            ..LlmConfig::default()
        };
        let backend = LlmBackend::from_config(&config, "sift-test").unwrap();
        assert_eq!(backend.provider(), Provider::Ollama);
    }

    #[test]
    fn keyed_provider_builds() {
        let mut config = LlmConfig {
            provider: Provider::Anthropic,
            ..LlmConfig::default()
        };
        config.anthropic.api_key = "sk-ant-test".into();
        let backend = LlmBackend::from_config(&config, "sift-test").unwrap();
        assert_eq!(backend.provider(), Provider::Anthropic);
    }
}
