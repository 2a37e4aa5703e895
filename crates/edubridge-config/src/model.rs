use serde::{Deserialize, Serialize};

/// Top-level configuration, read from `config.toml`.
///
/// Every section is optional; missing keys fall back to the values the service
/// ships with.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub gateway: GatewayConfig,
    pub dispatch: DispatchConfig,
    pub session: SessionConfig,
    pub media: MediaConfig,
    /// Overrides the built-in provider registry when non-empty. Order is priority.
    pub providers: Vec<ProviderConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Allow any origin. The bundled web UI is often served from a different port.
    pub cors_allow_any: bool,
    pub rate_limit: RateLimitConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8001,
            cors_allow_any: true,
            rate_limit: RateLimitConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub per_second: u64,
    pub burst_size: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            per_second: 1,
            burst_size: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatchConfig {
    pub max_tokens: u32,
    /// Sampling temperature for high-capability backends.
    pub temperature: f64,
    /// Forced temperature for backends flagged `strict_json`.
    pub strict_temperature: f64,
    pub attempt_timeout_secs: u64,
    /// Replaces the built-in classroom system instruction.
    pub system_prompt: Option<String>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            max_tokens: 2048,
            temperature: 0.7,
            strict_temperature: 0.1,
            attempt_timeout_secs: 60,
            system_prompt: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Turns kept per user and sent to the model.
    pub window: usize,
    /// Maximum number of users tracked before the least recently used is evicted.
    pub capacity: usize,
    pub ttl_secs: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            window: 10,
            capacity: 1000,
            ttl_secs: 24 * 60 * 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    pub image_base_url: String,
    pub image_model: String,
    pub image_token_env: String,
    pub video_endpoint: Option<String>,
    pub video_search_limit: usize,
    pub request_timeout_secs: u64,
}

impl Default for MediaConfig {
    fn default() -> Self {
        Self {
            image_base_url: "https://api-inference.huggingface.co".to_string(),
            image_model: "stabilityai/stable-diffusion-xl-base-1.0".to_string(),
            image_token_env: "HF_TOKEN".to_string(),
            video_endpoint: None,
            video_search_limit: 4,
            request_timeout_secs: 120,
        }
    }
}

/// One entry of a `[[providers]]` override list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    pub id: String,
    pub name: String,
    pub model: String,
    pub credential_env: String,
    #[serde(default)]
    pub kind: ProviderKindConfig,
    pub base_url: Option<String>,
    /// Set for backends that need JSON-only coercion. Defaults to `true`.
    #[serde(default = "default_strict_json")]
    pub strict_json: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKindConfig {
    #[default]
    Openai,
    Anthropic,
}

fn default_strict_json() -> bool {
    true
}
