//! LLM provider transports.
//!
//! Two wire formats behind one trait: the native vendor generateContent API
//! and the OpenAI-compatible chat completions API. Provider choice is
//! config-driven at construction; the call surface is identical.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LlmError, LlmResult};

/// Which provider variant to construct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    /// Vendor-native generateContent endpoint
    Native,
    /// Generic OpenAI-compatible chat endpoint
    OpenAiCompatible,
}

impl Provider {
    pub fn parse(value: &str) -> Option<Provider> {
        match value {
            "native" => Some(Provider::Native),
            "openai_compatible" => Some(Provider::OpenAiCompatible),
            _ => None,
        }
    }
}

/// A single text-in/text-out generation call.
#[async_trait]
pub trait LlmTransport: Send + Sync {
    async fn generate(&self, prompt: &str) -> LlmResult<String>;
}

fn build_http_client(timeout_seconds: u64) -> LlmResult<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .build()
        .map_err(|e| LlmError::transport(format!("failed to build HTTP client: {}", e)))
}

fn map_error_status(status: StatusCode, body: &str) -> LlmError {
    if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
        LlmError::Auth(format!("provider returned {}: {}", status, body))
    } else if status == StatusCode::BAD_REQUEST {
        LlmError::InvalidParams(format!("provider returned {}: {}", status, body))
    } else {
        LlmError::transport(format!("provider returned {}: {}", status, body))
    }
}

/// Stand-in transport for a process whose LLM configuration is incomplete.
///
/// The server still boots and serves uploads and status reads; every model
/// call fails with the recorded reason, which surfaces as a stage failure.
pub struct MisconfiguredTransport {
    reason: String,
}

impl MisconfiguredTransport {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl LlmTransport for MisconfiguredTransport {
    async fn generate(&self, _prompt: &str) -> LlmResult<String> {
        Err(LlmError::Auth(self.reason.clone()))
    }
}

// ============================================================================
// Native provider
// ============================================================================

/// Client for the vendor-native generateContent REST API.
pub struct NativeTransport {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct NativeRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, Deserialize)]
struct NativeResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: String,
}

impl NativeTransport {
    pub const DEFAULT_BASE_URL: &'static str =
        "https://generativelanguage.googleapis.com/v1beta";

    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: Option<String>,
        timeout_seconds: u64,
    ) -> LlmResult<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(LlmError::Auth("API key is not configured".to_string()));
        }
        Ok(Self {
            api_key,
            model: model.into(),
            base_url: base_url.unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_string()),
            client: build_http_client(timeout_seconds)?,
        })
    }
}

#[async_trait]
impl LlmTransport for NativeTransport {
    async fn generate(&self, prompt: &str) -> LlmResult<String> {
        let url = format!(
            "{}/models/{}:generateContent?key={}",
            self.base_url, self.model, self.api_key
        );

        let request = NativeRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
        };

        debug!(model = %self.model, prompt_len = prompt.len(), "calling native provider");

        let response = self.client.post(&url).json(&request).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_error_status(status, &body));
        }

        let parsed: NativeResponse = response
            .json()
            .await
            .map_err(|e| LlmError::transport(format!("malformed provider response: {}", e)))?;

        let text = parsed
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text)
    }
}

// ============================================================================
// OpenAI-compatible provider
// ============================================================================

/// Client for any chat endpoint speaking the OpenAI completions dialect.
pub struct OpenAiCompatTransport {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl OpenAiCompatTransport {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        timeout_seconds: u64,
    ) -> LlmResult<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(LlmError::Auth("API key is not configured".to_string()));
        }
        Ok(Self {
            api_key,
            model: model.into(),
            base_url: base_url.into(),
            client: build_http_client(timeout_seconds)?,
        })
    }
}

#[async_trait]
impl LlmTransport for OpenAiCompatTransport {
    async fn generate(&self, prompt: &str) -> LlmResult<String> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user",
                content: prompt.to_string(),
            }],
            stream: false,
        };

        debug!(model = %self.model, prompt_len = prompt.len(), "calling openai-compatible provider");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(map_error_status(status, &body));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::transport(format!("malformed provider response: {}", e)))?;

        let text = parsed
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        if text.is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text)
    }
}
