//! Unified LLM gateway.
//!
//! One client surface over two provider variants (the native vendor REST API
//! and any OpenAI-compatible chat endpoint) with retry, prompt composition,
//! and defensive JSON extraction for model output that is almost, but not
//! quite, valid JSON.

pub mod client;
pub mod error;
pub mod json_repair;
pub mod provider;

pub use client::LlmClient;
pub use error::{LlmError, LlmResult};
pub use json_repair::parse_json;
pub use provider::{
    LlmTransport, MisconfiguredTransport, NativeTransport, OpenAiCompatTransport, Provider,
};
