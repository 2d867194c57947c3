//! Gemini generateContent.

use serde::{Deserialize, Serialize};
use sift_config::ProviderSettings;

use super::ClientOptions;
use crate::TextGenerator;
use crate::error::LlmError;
use crate::http::check_response;
use crate::prompt::Prompt;

const PROVIDER: &str = "gemini";

pub struct GeminiClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
    temperature: f32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    contents: [Content<'a>; 1],
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    role: &'static str,
    parts: [Part<'a>; 1],
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

impl GeminiClient {
    /// # Errors
    ///
    /// Returns [`LlmError::Http`] if the underlying `reqwest::Client` fails to build.
    pub fn new(settings: &ProviderSettings, options: &ClientOptions) -> Result<Self, LlmError> {
        let model = if settings.model.trim().is_empty() {
            "gemini-1.5-pro"
        } else {
            settings.model.trim()
        };
        Ok(Self {
            http: options.http_client()?,
            endpoint: format!(
                "{}/models/{model}:generateContent",
                settings.base_url.trim().trim_end_matches('/')
            ),
            api_key: settings.api_key.clone(),
            temperature: options.temperature,
        })
    }
}

fn extract_text(resp: GenerateResponse) -> Result<String, LlmError> {
    let text = resp
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|c| {
            c.parts
                .into_iter()
                .map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .unwrap_or_default();
    if text.trim().is_empty() {
        return Err(LlmError::EmptyResponse { provider: PROVIDER });
    }
    Ok(text)
}

impl TextGenerator for GeminiClient {
    async fn generate(&self, prompt: &Prompt, max_tokens: u32) -> Result<String, LlmError> {
        let combined = prompt.combined();
        let body = GenerateRequest {
            contents: [Content {
                role: "user",
                parts: [Part { text: &combined }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: max_tokens,
            },
        };
        let resp = self
            .http
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::from_send(PROVIDER, e))?;
        let resp = check_response(resp, PROVIDER).await?;
        let parsed: GenerateResponse = resp.json().await.map_err(|e| LlmError::Parse {
            provider: PROVIDER,
            message: e.to_string(),
        })?;
        extract_text(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn reads_first_candidate() {
        let resp: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"a"},{"text":"b"}]}}]}"#,
        )
        .unwrap();
        assert_eq!(extract_text(resp).unwrap(), "ab");
    }

    #[test]
    fn blocked_prompt_has_no_candidates() {
        let resp: GenerateResponse =
            serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#).unwrap();
        assert!(matches!(extract_text(resp), Err(LlmError::EmptyResponse { .. })));
    }

    #[test]
    fn request_uses_camel_case() {
        let body = GenerateRequest {
            contents: [Content {
                role: "user",
                parts: [Part { text: "hi" }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.3,
                max_output_tokens: 10,
            },
        };
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(json["generationConfig"]["maxOutputTokens"], 10);
        assert_eq!(json["contents"][0]["parts"][0]["text"], "hi");
    }
}
