use std::time::Duration;

use async_trait::async_trait;
use edubridge_common::{Error, Result};
use reqwest::Client;
use serde_json::json;

#[async_trait]
pub trait VideoGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>>;
}

/// Posts `{"prompt": ...}` to a configured text-to-video service and expects
/// `video/*` bytes back.
pub struct HttpVideoGenerator {
    client: Client,
    endpoint: Option<String>,
}

impl HttpVideoGenerator {
    pub fn new(endpoint: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Media(format!("failed to build video client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.filter(|e| !e.trim().is_empty()),
        })
    }
}

#[async_trait]
impl VideoGenerator for HttpVideoGenerator {
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>> {
        let endpoint = self
            .endpoint
            .as_deref()
            .ok_or_else(|| Error::Media("video generation endpoint not configured".to_string()))?;

        let response = self
            .client
            .post(endpoint)
            .json(&json!({ "prompt": prompt }))
            .send()
            .await
            .map_err(|e| Error::Media(format!("video request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Media(format!(
                "video API error: status={}",
                status.as_u16()
            )));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        if !content_type.starts_with("video/") {
            return Err(Error::Media(format!(
                "video API returned unexpected content type '{content_type}'"
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Media(format!("video read failed: {e}")))?;
        Ok(bytes.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn missing_endpoint_is_an_error() {
        let generator = HttpVideoGenerator::new(None, Duration::from_secs(1)).unwrap();
        let err = generator.generate("a volcano").await.unwrap_err();
        assert!(err.to_string().contains("not configured"));
    }
}
