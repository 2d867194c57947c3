//! OpenAI-compatible chat completions.

use serde::{Deserialize, Serialize};
use sift_config::ProviderSettings;

use super::ClientOptions;
use crate::TextGenerator;
use crate::error::LlmError;
use crate::http::check_response;
use crate::prompt::Prompt;

const PROVIDER: &str = "openai";

pub struct OpenAiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

impl OpenAiClient {
    /// # Errors
    ///
    /// Returns [`LlmError::Http`] if the underlying `reqwest::Client` fails to build.
    pub fn new(settings: &ProviderSettings, options: &ClientOptions) -> Result<Self, LlmError> {
        Ok(Self {
            http: options.http_client()?,
            endpoint: format!("{}/chat/completions", normalize_base_url(&settings.base_url)),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            temperature: options.temperature,
        })
    }
}

/// Strip a mistakenly configured endpoint suffix so the base ends at `/v1`.
fn normalize_base_url(base_url: &str) -> &str {
    let base = base_url.trim().trim_end_matches('/');
    ["/chat/completions", "/completions"]
        .iter()
        .find_map(|suffix| base.strip_suffix(suffix))
        .unwrap_or(base)
        .trim_end_matches('/')
}

fn extract_text(resp: ChatResponse) -> Result<String, LlmError> {
    resp.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|t| !t.trim().is_empty())
        .ok_or(LlmError::EmptyResponse { provider: PROVIDER })
}

impl TextGenerator for OpenAiClient {
    async fn generate(&self, prompt: &Prompt, max_tokens: u32) -> Result<String, LlmError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user,
                },
            ],
            temperature: self.temperature,
            max_tokens,
        };
        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::from_send(PROVIDER, e))?;
        let resp = check_response(resp, PROVIDER).await?;
        let parsed: ChatResponse = resp.json().await.map_err(|e| LlmError::Parse {
            provider: PROVIDER,
            message: e.to_string(),
        })?;
        extract_text(parsed)
    }
}
