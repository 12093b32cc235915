//! HTTP providers for the two supported model backends.
//!
//! Both providers are thin: one request, one completion, no internal retry.
//! Timeouts are configured at this boundary since the model call is the
//! pipeline's dominant latency source.

use super::TextModel;
use crate::error::{Result, UtilibillError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default request timeout for model calls.
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Sampling temperature for extraction calls; near-greedy keeps field values
/// stable across runs.
const TEMPERATURE: f32 = 0.1;

const GEMINI_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1";

fn build_client(timeout_secs: u64) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| UtilibillError::generation(format!("failed to build HTTP client: {}", e)))
}

// ---------------------------------------------------------------------------
// Gemini
// ---------------------------------------------------------------------------

/// Google Generative Language API provider.
pub struct GeminiModel {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(rename = "generationConfig")]
    generation_config: GeminiGenerationConfig,
}

#[derive(Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Serialize)]
struct GeminiGenerationConfig {
    temperature: f32,
}

#[derive(Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Deserialize)]
struct GeminiCandidate {
    content: GeminiCandidateContent,
}

#[derive(Deserialize)]
struct GeminiCandidateContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

impl GeminiModel {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            endpoint: GEMINI_ENDPOINT.to_string(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Override the API endpoint, for tests or proxies.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl TextModel for GeminiModel {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/models/{}:generateContent", self.endpoint, self.model);
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![GeminiPart {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GeminiGenerationConfig {
                temperature: TEMPERATURE,
            },
        };

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(UtilibillError::generation(format!(
                "Gemini request failed with HTTP {}: {:.200}",
                status, detail
            )));
        }

        let payload: GeminiResponse = response.json().await?;
        let text: String = payload
            .candidates
            .first()
            .map(|candidate| {
                candidate
                    .content
                    .parts
                    .iter()
                    .map(|part| part.text.as_str())
                    .collect()
            })
            .unwrap_or_default();

        if text.is_empty() {
            return Err(UtilibillError::generation(
                "Gemini response contained no candidates",
            ));
        }
        Ok(text)
    }
}

// ---------------------------------------------------------------------------
// OpenAI
// ---------------------------------------------------------------------------

/// OpenAI chat completions provider.
pub struct OpenAiModel {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

impl OpenAiModel {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>, timeout_secs: u64) -> Result<Self> {
        Ok(Self {
            client: build_client(timeout_secs)?,
            endpoint: OPENAI_ENDPOINT.to_string(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }

    /// Override the API endpoint, for tests or proxies.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl TextModel for OpenAiModel {
    fn name(&self) -> &str {
        "openai"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/chat/completions", self.endpoint);
        let body = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
            temperature: TEMPERATURE,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let detail = response.text().await.unwrap_or_default();
            return Err(UtilibillError::generation(format!(
                "OpenAI request failed with HTTP {}: {:.200}",
                status, detail
            )));
        }

        let payload: ChatResponse = response.json().await?;
        payload
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| UtilibillError::generation("OpenAI response contained no choices"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gemini_model_construction() {
        let model = GeminiModel::new("key", "gemini-2.5-flash", DEFAULT_TIMEOUT_SECS).unwrap();
        assert_eq!(model.name(), "gemini");
        assert_eq!(model.model, "gemini-2.5-flash");
        assert_eq!(model.endpoint, GEMINI_ENDPOINT);
    }

    #[test]
    fn test_openai_model_with_endpoint() {
        let model = OpenAiModel::new("key", "gpt-4o", DEFAULT_TIMEOUT_SECS)
            .unwrap()
            .with_endpoint("http://localhost:9099/v1");
        assert_eq!(model.endpoint, "http://localhost:9099/v1");
    }

    #[tokio::test]
    async fn test_openai_unreachable_endpoint_errors() {
        let model = OpenAiModel::new("key", "gpt-4o", 1)
            .unwrap()
            .with_endpoint("http://127.0.0.1:9");
        let result = model.generate("prompt").await;
        assert!(matches!(result, Err(UtilibillError::Generation { .. })));
    }
}
