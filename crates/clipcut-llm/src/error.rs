//! LLM gateway error types.

use thiserror::Error;

pub type LlmResult<T> = Result<T, LlmError>;

#[derive(Debug, Error)]
pub enum LlmError {
    /// Missing or rejected API key; never retried.
    #[error("authentication failed: {0}")]
    Auth(String),

    /// Request parameter rejected by the provider; never retried.
    #[error("invalid request parameters: {0}")]
    InvalidParams(String),

    /// Network failure, timeout, or server-side 5xx.
    #[error("transport error: {0}")]
    Transport(String),

    /// Provider answered OK but produced no text.
    #[error("provider returned an empty response")]
    EmptyResponse,

    /// Every JSON extraction and repair step failed.
    #[error("unparsable model response: {preview}")]
    Unparsable {
        /// First part of the raw response, for the error message
        preview: String,
    },
}

impl LlmError {
    /// Whether the retry loop should try again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::Transport(_) | LlmError::EmptyResponse)
    }

    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Transport(msg.into())
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        LlmError::Transport(err.to_string())
    }
}
