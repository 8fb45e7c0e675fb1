//! The unified LLM call surface.

use std::time::Duration;

use serde_json::Value;
use tracing::{info, warn};

use crate::error::{LlmError, LlmResult};
use crate::provider::{LlmTransport, NativeTransport, OpenAiCompatTransport, Provider};

/// Header inserted between the prompt and serialized structured input.
const INPUT_HEADER: &str = "INPUT:";

/// Gateway over one configured provider transport.
///
/// `call` composes the prompt, retries transient failures with exponential
/// backoff, and maps an exhausted empty-output provider to an empty string so
/// callers can treat the batch as failed without aborting the stage.
pub struct LlmClient {
    transport: Box<dyn LlmTransport>,
    max_retries: u32,
}

impl LlmClient {
    /// Wrap an existing transport (used by tests to inject stubs).
    pub fn new(transport: Box<dyn LlmTransport>, max_retries: u32) -> Self {
        Self {
            transport,
            max_retries: max_retries.max(1),
        }
    }

    /// Construct the configured provider variant.
    pub fn for_provider(
        provider: Provider,
        api_key: &str,
        model: &str,
        base_url: Option<String>,
        timeout_seconds: u64,
        max_retries: u32,
    ) -> LlmResult<Self> {
        let transport: Box<dyn LlmTransport> = match provider {
            Provider::Native => Box::new(NativeTransport::new(
                api_key,
                model,
                base_url,
                timeout_seconds,
            )?),
            Provider::OpenAiCompatible => {
                let base = base_url.ok_or_else(|| {
                    LlmError::InvalidParams(
                        "openai_compatible provider requires a base URL".to_string(),
                    )
                })?;
                Box::new(OpenAiCompatTransport::new(
                    api_key,
                    model,
                    base,
                    timeout_seconds,
                )?)
            }
        };
        Ok(Self::new(transport, max_retries))
    }

    /// Call the model, appending `input` (serialized as JSON with stable key
    /// order) under a fixed header when present.
    ///
    /// Returns an empty string when the provider keeps answering OK with no
    /// text; callers treat empty output as a failed batch.
    pub async fn call(&self, prompt: &str, input: Option<&Value>) -> LlmResult<String> {
        let full_prompt = compose_prompt(prompt, input);

        for attempt in 0..self.max_retries {
            match self.transport.generate(&full_prompt).await {
                Ok(text) => {
                    info!(attempt, response_len = text.len(), "model call succeeded");
                    return Ok(text);
                }
                Err(e) if !e.is_retryable() => return Err(e),
                Err(e) => {
                    if attempt + 1 == self.max_retries {
                        if matches!(e, LlmError::EmptyResponse) {
                            warn!("provider kept returning empty output, giving up on batch");
                            return Ok(String::new());
                        }
                        return Err(e);
                    }
                    let wait = 2u64.pow(attempt);
                    warn!(attempt, error = %e, wait_secs = wait, "model call failed, backing off");
                    tokio::time::sleep(Duration::from_secs(wait)).await;
                }
            }
        }

        Ok(String::new())
    }

    /// Parse a raw response with the layered JSON repair.
    pub fn parse_json(&self, raw: &str) -> LlmResult<Value> {
        crate::json_repair::parse_json(raw)
    }
}

/// Compose the final prompt text. Structured input serializes with
/// `serde_json`'s sorted object keys, so composition is deterministic.
pub fn compose_prompt(prompt: &str, input: Option<&Value>) -> String {
    match input {
        Some(value) => {
            let serialized = match value {
                Value::String(s) => s.clone(),
                other => serde_json::to_string_pretty(other).unwrap_or_default(),
            };
            format!("{}\n\n{}\n{}", prompt, INPUT_HEADER, serialized)
        }
        None => prompt.to_string(),
    }
}
