use super::{ChatMessage, ChatRole, LlmProvider, LlmRequest, LlmResponse, Usage};
use async_trait::async_trait;
use edubridge_common::{Error, Result};
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";

pub struct AnthropicProvider {
    id: String,
    api_key: String,
    client: Client,
    base_url: String,
    model: String,
}

impl AnthropicProvider {
    pub fn new(id: impl Into<String>, api_key: String) -> Self {
        Self {
            id: id.into(),
            api_key,
            client: Client::new(),
            base_url: ANTHROPIC_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
        }
    }

    /// Model used by `health_check`. Completions always use the request's model.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: String) -> Self {
        self.base_url = base_url;
        self
    }

    /// Anthropic takes system text as a top-level field, so system turns are
    /// pulled out of the message list and joined in order.
    ///
    /// The Messages API also wants the conversation to open with a user turn
    /// and to alternate roles. A trimmed history can start mid-exchange, so
    /// leading assistant turns are dropped and consecutive same-role turns are
    /// merged.
    fn create_request_body(&self, request: &LlmRequest) -> serde_json::Value {
        let (system, conversation): (Vec<&ChatMessage>, Vec<&ChatMessage>) = request
            .messages
            .iter()
            .partition(|m| m.role == ChatRole::System);

        let mut turns: Vec<(ChatRole, String)> = Vec::new();
        for message in conversation
            .into_iter()
            .skip_while(|m| m.role == ChatRole::Assistant)
        {
            let same_role = turns.last().is_some_and(|(role, _)| *role == message.role);
            match turns.last_mut() {
                Some((_, content)) if same_role => {
                    content.push_str("\n\n");
                    content.push_str(&message.content);
                }
                _ => turns.push((message.role, message.content.clone())),
            }
        }

        let messages: Vec<serde_json::Value> = turns
            .iter()
            .map(|(role, content)| {
                json!({
                    "role": role.as_str(),
                    "content": content,
                })
            })
            .collect();

        let mut body = json!({
            "model": request.model,
            "messages": messages,
            "max_tokens": request.max_tokens.unwrap_or(1024),
        });

        if !system.is_empty() {
            let joined = system
                .iter()
                .map(|m| m.content.as_str())
                .collect::<Vec<_>>()
                .join("\n\n");
            body["system"] = json!(joined);
        }

        if let Some(temp) = request.temperature {
            body["temperature"] = json!(temp);
        }

        body
    }
}

#[async_trait]
impl LlmProvider for AnthropicProvider {
    fn provider_id(&self) -> &str {
        &self.id
    }

    async fn complete(&self, request: &LlmRequest) -> Result<LlmResponse> {
        let body = self.create_request_body(request);

        let response = self
            .client
            .post(&self.base_url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Agent(format!("anthropic request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::Agent(format!(
                "anthropic API error: status={}, body={}",
                status.as_u16(),
                error_text
            )));
        }

        let parsed: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| Error::Agent(format!("failed to parse anthropic response: {e}")))?;

        let text = parsed
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        Ok(LlmResponse {
            text,
            model: parsed.model,
            usage: parsed.usage.map(|u| Usage {
                input_tokens: u.input_tokens,
                output_tokens: u.output_tokens,
            }),
            stop_reason: parsed.stop_reason,
        })
    }

    async fn health_check(&self) -> Result<bool> {
        // There is no cheap unauthenticated endpoint; a one-token request
        // proves both reachability and the key.
        let request = LlmRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage::user("ping")],
            max_tokens: Some(1),
            temperature: None,
            json_mode: false,
        };
        Ok(self.complete(&request).await.is_ok())
    }
}

#[derive(Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    content: Vec<AnthropicContentBlock>,
    stop_reason: Option<String>,
    usage: Option<AnthropicUsage>,
}

#[derive(Deserialize)]
struct AnthropicContentBlock {
    #[serde(rename = "type")]
    kind: String,
    text: Option<String>,
}

#[derive(Deserialize)]
struct AnthropicUsage {
    input_tokens: u32,
    output_tokens: u32,
}
