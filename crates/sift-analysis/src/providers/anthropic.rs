//! Anthropic messages API.

use serde::{Deserialize, Serialize};
use sift_config::ProviderSettings;

use super::ClientOptions;
use crate::TextGenerator;
use crate::error::LlmError;
use crate::http::check_response;
use crate::prompt::Prompt;

const PROVIDER: &str = "anthropic";
const API_VERSION: &str = "2023-06-01";

pub struct AnthropicClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: [Message<'a>; 1],
    temperature: f32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

impl AnthropicClient {
    /// # Errors
    ///
    /// Returns [`LlmError::Http`] if the underlying `reqwest::Client` fails to build.
    pub fn new(settings: &ProviderSettings, options: &ClientOptions) -> Result<Self, LlmError> {
        Ok(Self {
            http: options.http_client()?,
            endpoint: format!("{}/v1/messages", settings.base_url.trim().trim_end_matches('/')),
            api_key: settings.api_key.clone(),
            model: settings.model.clone(),
            temperature: options.temperature,
        })
    }
}

fn extract_text(resp: MessagesResponse) -> Result<String, LlmError> {
    let text: String = resp
        .content
        .into_iter()
        .filter(|b| b.kind == "text")
        .map(|b| b.text)
        .collect::<Vec<_>>()
        .join("");
    if text.trim().is_empty() {
        return Err(LlmError::EmptyResponse { provider: PROVIDER });
    }
    Ok(text)
}

impl TextGenerator for AnthropicClient {
    async fn generate(&self, prompt: &Prompt, max_tokens: u32) -> Result<String, LlmError> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens,
            system: &prompt.system,
            messages: [Message {
                role: "user",
                content: &prompt.user,
            }],
            temperature: self.temperature,
        };
        let resp = self
            .http
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::from_send(PROVIDER, e))?;
        let resp = check_response(resp, PROVIDER).await?;
        let parsed: MessagesResponse = resp.json().await.map_err(|e| LlmError::Parse {
            provider: PROVIDER,
            message: e.to_string(),
        })?;
        extract_text(parsed)
    }
}
