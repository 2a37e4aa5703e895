use async_trait::async_trait;
use edubridge_common::{Error, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::{ChatMessage, LlmProvider, LlmRequest, LlmResponse, Usage};

/// Client for any backend speaking the OpenAI `/chat/completions` dialect.
///
/// Groq, OpenRouter and the HuggingFace router all accept this shape; only the
/// base URL and the bearer token differ.
#[derive(Clone)]
pub struct OpenAiCompatProvider {
    id: String,
    client: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiCompatProvider {
    pub fn new(id: impl Into<String>, api_key: String, base_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            client: Client::new(),
            api_key,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    fn convert_request(&self, request: &LlmRequest) -> OpenAiRequest {
        OpenAiRequest {
            model: request.model.clone(),
            messages: request.messages.iter().map(OpenAiMessage::from).collect(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            response_format: request.json_mode.then(|| OpenAiResponseFormat {
                kind: "json_object".to_string(),
            }),
            stream: false,
        }
    }

    fn convert_response(&self, response: OpenAiResponse) -> Result<LlmResponse> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::Agent(format!("{} returned no choices", self.id)))?;

        Ok(LlmResponse {
            text: choice.message.content.unwrap_or_default(),
            model: response.model,
            usage: response.usage.map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            }),
            stop_reason: choice.finish_reason,
        })
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn provider_id(&self) -> &str {
        &self.id
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = self.convert_request(request);

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Agent(format!("{} request failed: {e}", self.id)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Agent(format!(
                "{} API error: status={}, body={}",
                self.id,
                status.as_u16(),
                error_text
            )));
        }

        let parsed: OpenAiResponse = response
            .json()
            .await
            .map_err(|e| Error::Agent(format!("failed to parse {} response: {e}", self.id)))?;

        self.convert_response(parsed)
    }

    async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/models", self.base_url);
        let response = self.client.get(&url).bearer_auth(&self.api_key).send().await;

        match response {
            Ok(resp) => Ok(resp.status().is_success()),
            Err(_) => Ok(false),
        }
    }
}

// Request Types
#[derive(Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<OpenAiResponseFormat>,
    stream: bool,
}

#[derive(Serialize)]
struct OpenAiMessage {
    role: &'static str,
    content: String,
}

impl From<&ChatMessage> for OpenAiMessage {
    fn from(message: &ChatMessage) -> Self {
        Self {
            role: message.role.as_str(),
            content: message.content.clone(),
        }
    }
}

#[derive(Serialize)]
struct OpenAiResponseFormat {
    #[serde(rename = "type")]
    kind: String,
}

// Response Types
#[derive(Deserialize)]
struct OpenAiResponse {
    #[serde(default)]
    model: String,
    choices: Vec<OpenAiChoice>,
    usage: Option<OpenAiUsage>,
}

#[derive(Deserialize)]
struct OpenAiChoice {
    message: OpenAiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}
