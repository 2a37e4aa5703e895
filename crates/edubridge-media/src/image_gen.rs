use std::io::Cursor;
use std::time::Duration;

use ::image::{ImageFormat, Rgb, RgbImage};
use async_trait::async_trait;
use edubridge_common::{Error, Result};
use edubridge_config::MediaConfig;
use edubridge_security::is_usable_credential;
use reqwest::Client;
use serde_json::json;
use tracing::warn;

const PLACEHOLDER_SIZE: u32 = 1024;
const PLACEHOLDER_COLOR: Rgb<u8> = Rgb([73, 109, 137]);

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Encoded image bytes for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>>;
}

/// Text-to-image through the HuggingFace inference API.
pub struct HuggingFaceImageGenerator {
    client: Client,
    endpoint: String,
    token: Option<String>,
}

impl HuggingFaceImageGenerator {
    pub fn new(base_url: &str, model: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| Error::Media(format!("failed to build image client: {e}")))?;
        Ok(Self {
            client,
            endpoint: format!("{}/models/{}", base_url.trim_end_matches('/'), model),
            token: token
                .filter(|t| is_usable_credential(t))
                .map(|t| t.trim().to_string()),
        })
    }

    pub fn from_config(config: &MediaConfig, token: Option<String>) -> Result<Self> {
        Self::new(
            &config.image_base_url,
            &config.image_model,
            token,
            Duration::from_secs(config.request_timeout_secs),
        )
    }
}

#[async_trait]
impl ImageGenerator for HuggingFaceImageGenerator {
    async fn generate(&self, prompt: &str) -> Result<Vec<u8>> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "inputs": prompt }));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| Error::Media(format!("image request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Media(format!(
                "image API error: status={}, body={}",
                status.as_u16(),
                body
            )));
        }

        let is_image = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("image/"));
        if !is_image {
            return Err(Error::Media("image API returned a non-image body".to_string()));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Media(format!("image read failed: {e}")))?;
        Ok(bytes.to_vec())
    }
}

/// Solid-colour PNG served when generation is unavailable.
pub fn placeholder_png() -> Result<Vec<u8>> {
    let img = RgbImage::from_pixel(PLACEHOLDER_SIZE, PLACEHOLDER_SIZE, PLACEHOLDER_COLOR);
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .map_err(|e| Error::Render(format!("failed to encode placeholder: {e}")))?;
    Ok(buf)
}

pub async fn generate_or_placeholder(generator: &dyn ImageGenerator, prompt: &str) -> Result<Vec<u8>> {
    match generator.generate(prompt).await {
        Ok(bytes) => Ok(bytes),
        Err(e) => {
            warn!("image generation failed, serving placeholder: {}", e);
            placeholder_png()
        }
    }
}
