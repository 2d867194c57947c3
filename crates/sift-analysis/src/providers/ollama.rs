//! Local Ollama generate endpoint.

use serde::{Deserialize, Serialize};
use sift_config::ProviderSettings;

use super::ClientOptions;
use crate::TextGenerator;
use crate::error::LlmError;
use crate::http::check_response;
use crate::prompt::Prompt;

const PROVIDER: &str = "ollama";

pub struct OllamaClient {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    temperature: f32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: Options,
}

#[derive(Serialize)]
struct Options {
    temperature: f32,
    num_predict: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

impl OllamaClient {
    /// # Errors
    ///
    /// Returns [`LlmError::Http`] if the underlying `reqwest::Client` fails to build.
    pub fn new(settings: &ProviderSettings, options: &ClientOptions) -> Result<Self, LlmError> {
        Ok(Self {
            http: options.http_client()?,
            endpoint: format!("{}/api/generate", settings.base_url.trim().trim_end_matches('/')),
            model: settings.model.clone(),
            temperature: options.temperature,
        })
    }
}

impl TextGenerator for OllamaClient {
    async fn generate(&self, prompt: &Prompt, max_tokens: u32) -> Result<String, LlmError> {
        let combined = prompt.combined();
        let body = GenerateRequest {
            model: &self.model,
            prompt: &combined,
            stream: false,
            options: Options {
                temperature: self.temperature,
                num_predict: max_tokens,
            },
        };
        let resp = self
            .http
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::from_send(PROVIDER, e))?;
        let resp = check_response(resp, PROVIDER).await?;
        let parsed: GenerateResponse = resp.json().await.map_err(|e| LlmError::Parse {
            provider: PROVIDER,
            message: e.to_string(),
        })?;
        if parsed.response.trim().is_empty() {
            return Err(LlmError::EmptyResponse { provider: PROVIDER });
        }
        Ok(parsed.response)
    }
}
