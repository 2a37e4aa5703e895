use async_trait::async_trait;
use edubridge_common::Result;
use serde::{Deserialize, Serialize};

pub mod anthropic;
pub mod openai;

pub use anthropic::AnthropicProvider;
pub use edubridge_common::{ChatMessage, ChatRole};
pub use openai::OpenAiCompatProvider;

/// Transport seam for LLM completion backends (Groq, Anthropic, OpenRouter, ...).
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Provider identifier (e.g. "groq-llama-70b").
    fn provider_id(&self) -> &str;

    /// Send a completion request and return the response.
    ///
    /// Non-2xx responses must be reported as `Error::Agent` with a
    /// `status=<code>` fragment so callers can classify the failure.
    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse>;

    /// Check if the provider is reachable with its configured credential.
    async fn health_check(&self) -> Result<bool>;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmRequest {
    pub model: String,
    /// Full conversation, system instructions included, in send order.
    pub messages: Vec<ChatMessage>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f64>,
    /// Ask the backend for a JSON object response where it supports it.
    #[serde(default)]
    pub json_mode: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmResponse {
    pub text: String,
    pub model: String,
    pub usage: Option<Usage>,
    pub stop_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}
