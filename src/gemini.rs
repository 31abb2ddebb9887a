//! Gemini API client, the pipeline's LLM gateway
//!
//! Every LLM-backed tier (intent fallback, extraction, categorization,
//! query-filter fallback) goes through [`LlmGateway::complete`]. The gateway
//! returns cleaned text content: markdown fences and model control tokens are
//! stripped before the caller sees anything, so a successful completion is
//! JSON-parseable wherever the pipeline expects JSON.
//!
//! Uses a long-lived reqwest::Client for connection pooling.

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::{debug, error};

use crate::error::AgentError;
use crate::Result;

const DEFAULT_MODEL: &str = "gemini-2.0-flash";
const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

/// Abstraction over the LLM service so classifiers and the extractor can be
/// exercised with scripted doubles in tests.
#[async_trait]
pub trait LlmGateway: Send + Sync {
    /// Send a single-prompt completion and return the cleaned text content.
    async fn complete(&self, prompt: &str, max_tokens: u32, temperature: f32) -> Result<String>;
}

/// Reusable Gemini client (connection-pooled)
pub struct GeminiClient {
    client: Client,
    api_key: String,
    model: String,
}

impl GeminiClient {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(8)
            .timeout(Duration::from_secs(30))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            api_key,
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Build a client from `GEMINI_API_KEY` / `GEMINI_MODEL_NAME` env vars.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        let api_key = env::var("GEMINI_API_KEY").unwrap_or_default();
        let mut client = Self::new(api_key);
        if let Ok(model) = env::var("GEMINI_MODEL_NAME") {
            client.model = model;
        }
        client
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

#[async_trait]
impl LlmGateway for GeminiClient {
    async fn complete(&self, prompt: &str, max_tokens: u32, temperature: f32) -> Result<String> {
        if self.api_key.is_empty() {
            return Err(AgentError::Llm("GEMINI_API_KEY not configured".to_string()));
        }

        let url = format!(
            "{}/{}:generateContent?key={}",
            GEMINI_BASE_URL, self.model, self.api_key
        );

        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature,
                max_output_tokens: max_tokens,
            },
        };

        debug!(model = %self.model, "calling Gemini API");

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                error!("Gemini API request failed: {}", e);
                AgentError::Llm(format!("Gemini API error: {}", e))
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            error!("Gemini API error response ({}): {}", status, error_text);
            return Err(AgentError::Llm(format!(
                "Gemini API returned {}: {}",
                status, error_text
            )));
        }

        let gemini_response: GeminiResponse = response.json().await.map_err(|e| {
            error!("Failed to parse Gemini response: {}", e);
            AgentError::Llm(format!("Gemini parse error: {}", e))
        })?;

        let candidate = gemini_response
            .candidates
            .first()
            .ok_or_else(|| AgentError::Llm("No candidates in Gemini response".to_string()))?;

        let raw = candidate
            .content
            .parts
            .first()
            .map(|p| p.text.as_str())
            .ok_or_else(|| AgentError::Llm("Empty content in Gemini response".to_string()))?;

        let content = extract_json_from_markdown(&clean_control_tokens(raw));
        if content.is_empty() {
            return Err(AgentError::Llm("Gemini returned empty content".to_string()));
        }

        Ok(content)
    }
}

lazy_static! {
    // Control tokens some models emit around their output.
    static ref CONTROL_TOKENS: Regex = Regex::new(
        r"<｜(begin|end)▁of▁(sentence|text)｜>|<\|(begin|end)_of_(sentence|text)\|>|</?s>|<\|im_(start|end)\|>"
    )
    .expect("control token regex");
}

/// Remove special control tokens that some models emit.
pub fn clean_control_tokens(content: &str) -> String {
    CONTROL_TOKENS.replace_all(content, "").trim().to_string()
}

/// Extract the payload from a ```json fenced block (or a bare ``` block that
/// holds a JSON object). Content without fences passes through unchanged.
pub fn extract_json_from_markdown(content: &str) -> String {
    if let Some(start) = content.find("```json") {
        let after = &content[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim().to_string();
        }
    }

    if let Some(start) = content.find("```") {
        let after = &content[start + 3..];
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if inner.starts_with('{') && inner.ends_with('}') {
                return inner.to_string();
            }
        }
    }

    content.trim().to_string()
}

#[derive(Debug, Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    text: String,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
    #[serde(rename = "maxOutputTokens")]
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Content,
}

/// Scripted gateway double shared by classifier/extractor tests.
#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;

    pub struct ScriptedGateway {
        responses: Mutex<VecDeque<Result<String>>>,
        pub calls: AtomicUsize,
    }

    impl ScriptedGateway {
        pub fn new(responses: Vec<Result<String>>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().collect()),
                calls: AtomicUsize::new(0),
            }
        }

        pub fn replying(content: &str) -> Self {
            Self::new(vec![Ok(content.to_string())])
        }

        pub fn failing() -> Self {
            Self::new(vec![])
        }

        pub fn call_count(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl LlmGateway for ScriptedGateway {
        async fn complete(
            &self,
            _prompt: &str,
            _max_tokens: u32,
            _temperature: f32,
        ) -> Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .expect("scripted gateway poisoned")
                .pop_front()
                .unwrap_or_else(|| Err(AgentError::Llm("scripted gateway exhausted".to_string())))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serialization() {
        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: "classify this".to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                temperature: 0.0,
                max_output_tokens: 500,
            },
        };

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains("classify this"));
        assert!(json.contains("generationConfig"));
        assert!(json.contains("maxOutputTokens"));
    }

    #[test]
    fn strips_json_fences() {
        let content = "```json\n{\"intent\": \"log_expense\"}\n```";
        assert_eq!(
            extract_json_from_markdown(content),
            "{\"intent\": \"log_expense\"}"
        );
    }

    #[test]
    fn strips_bare_fences_holding_json() {
        let content = "```\n{\"a\": 1}\n```";
        assert_eq!(extract_json_from_markdown(content), "{\"a\": 1}");
    }

    #[test]
    fn passes_unfenced_content_through() {
        assert_eq!(extract_json_from_markdown("  {\"a\": 1} "), "{\"a\": 1}");
    }

    #[test]
    fn bare_fence_without_json_is_untouched() {
        let content = "```\nnot json\n```";
        assert_eq!(extract_json_from_markdown(content), content);
    }

    #[test]
    fn removes_control_tokens() {
        let content = "<|im_start|>{\"x\":1}<|im_end|></s>";
        assert_eq!(clean_control_tokens(content), "{\"x\":1}");
    }

    #[tokio::test]
    async fn missing_api_key_is_a_service_error() {
        let client = GeminiClient::new(String::new());
        let err = client.complete("hi", 10, 0.0).await.unwrap_err();
        assert!(matches!(err, AgentError::Llm(_)));
    }
}
