use std::fmt;
use std::sync::Arc;

use edubridge_config::{ProviderConfig, ProviderKindConfig};
use edubridge_security::is_usable_credential;
use tracing::{info, warn};

use crate::providers::{AnthropicProvider, LlmProvider, OpenAiCompatProvider};

pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const OPENROUTER_BASE_URL: &str = "https://openrouter.ai/api/v1";
pub const HUGGINGFACE_BASE_URL: &str = "https://router.huggingface.co/v1";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderKind {
    OpenAiCompatible { base_url: String },
    Anthropic,
}

/// One candidate backend. Built once at startup and never mutated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderDescriptor {
    pub id: String,
    pub name: String,
    pub model: String,
    pub credential_env: String,
    pub kind: ProviderKind,
    /// Weaker backends get an extra JSON-only instruction and a low temperature.
    pub strict_json: bool,
}

impl ProviderDescriptor {
    fn openai_compatible(
        id: &str,
        name: &str,
        model: &str,
        credential_env: &str,
        base_url: &str,
        strict_json: bool,
    ) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            model: model.to_string(),
            credential_env: credential_env.to_string(),
            kind: ProviderKind::OpenAiCompatible {
                base_url: base_url.to_string(),
            },
            strict_json,
        }
    }
}

impl From<&ProviderConfig> for ProviderDescriptor {
    fn from(config: &ProviderConfig) -> Self {
        let kind = match config.kind {
            ProviderKindConfig::Anthropic => ProviderKind::Anthropic,
            ProviderKindConfig::Openai => ProviderKind::OpenAiCompatible {
                base_url: config
                    .base_url
                    .clone()
                    .unwrap_or_else(|| GROQ_BASE_URL.to_string()),
            },
        };
        Self {
            id: config.id.clone(),
            name: if config.name.trim().is_empty() {
                config.id.clone()
            } else {
                config.name.clone()
            },
            model: config.model.clone(),
            credential_env: config.credential_env.clone(),
            kind,
            strict_json: config.strict_json,
        }
    }
}

/// A descriptor whose credential resolved to a usable value.
#[derive(Clone)]
pub struct AvailableBackend {
    pub descriptor: ProviderDescriptor,
    pub credential: String,
}

impl fmt::Debug for AvailableBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AvailableBackend")
            .field("descriptor", &self.descriptor)
            .field("credential", &"<redacted>")
            .finish()
    }
}

impl AvailableBackend {
    pub fn name(&self) -> &str {
        &self.descriptor.name
    }

    /// Build the transport client for this backend.
    pub fn connect(&self) -> Arc<dyn LlmProvider> {
        match &self.descriptor.kind {
            ProviderKind::OpenAiCompatible { base_url } => Arc::new(OpenAiCompatProvider::new(
                self.descriptor.id.clone(),
                self.credential.clone(),
                base_url.clone(),
            )),
            ProviderKind::Anthropic => Arc::new(
                AnthropicProvider::new(self.descriptor.id.clone(), self.credential.clone())
                    .with_model(self.descriptor.model.clone()),
            ),
        }
    }
}

/// Ordered table of candidate backends, highest priority first.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    descriptors: Vec<ProviderDescriptor>,
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new(default_descriptors())
    }
}

impl ProviderRegistry {
    pub fn new(descriptors: Vec<ProviderDescriptor>) -> Self {
        Self { descriptors }
    }

    /// Use the `[[providers]]` table when present, otherwise the built-in order.
    pub fn from_config(providers: &[ProviderConfig]) -> Self {
        if providers.is_empty() {
            Self::default()
        } else {
            Self::new(providers.iter().map(ProviderDescriptor::from).collect())
        }
    }

    pub fn descriptors(&self) -> &[ProviderDescriptor] {
        &self.descriptors
    }

    /// Backends whose credential is set in the process environment.
    pub fn available_backends(&self) -> Vec<AvailableBackend> {
        self.available_backends_with(|key| std::env::var(key).ok())
    }

    /// Backends whose credential `lookup` resolves to a real value, in priority order.
    pub fn available_backends_with<F>(&self, lookup: F) -> Vec<AvailableBackend>
    where
        F: Fn(&str) -> Option<String>,
    {
        let available: Vec<AvailableBackend> = self
            .descriptors
            .iter()
            .filter_map(|descriptor| {
                let credential = lookup(&descriptor.credential_env)?;
                if !is_usable_credential(&credential) {
                    return None;
                }
                Some(AvailableBackend {
                    descriptor: descriptor.clone(),
                    credential: credential.trim().to_string(),
                })
            })
            .collect();

        if available.is_empty() {
            warn!(
                "no LLM backend credentials found; checked {}",
                self.credential_keys().join(", ")
            );
        } else {
            for backend in &available {
                info!(
                    "backend ready: {} ({})",
                    backend.descriptor.name, backend.descriptor.model
                );
            }
        }

        available
    }

    /// Distinct credential variables, in priority order.
    pub fn credential_keys(&self) -> Vec<&str> {
        let mut keys: Vec<&str> = Vec::new();
        for descriptor in &self.descriptors {
            if !keys.contains(&descriptor.credential_env.as_str()) {
                keys.push(&descriptor.credential_env);
            }
        }
        keys
    }
}

fn default_descriptors() -> Vec<ProviderDescriptor> {
    vec![
        ProviderDescriptor::openai_compatible(
            "groq-llama-70b",
            "Groq Llama-3.3-70B",
            "llama-3.3-70b-versatile",
            "GROQ_API_KEY",
            GROQ_BASE_URL,
            false,
        ),
        ProviderDescriptor::openai_compatible(
            "groq-llama-8b",
            "Groq Llama-3.1-8B",
            "llama-3.1-8b-instant",
            "GROQ_API_KEY",
            GROQ_BASE_URL,
            true,
        ),
        ProviderDescriptor {
            id: "claude-haiku".to_string(),
            name: "Claude 3 Haiku".to_string(),
            model: "claude-3-haiku-20240307".to_string(),
            credential_env: "ANTHROPIC_API_KEY".to_string(),
            kind: ProviderKind::Anthropic,
            strict_json: false,
        },
        ProviderDescriptor::openai_compatible(
            "openrouter-llama-8b",
            "OpenRouter Llama-3-8B",
            "meta-llama/llama-3-8b-instruct:free",
            "OPENROUTER_API_KEY",
            OPENROUTER_BASE_URL,
            true,
        ),
        ProviderDescriptor::openai_compatible(
            "hf-gemma-7b",
            "HuggingFace Gemma-7B",
            "google/gemma-7b",
            "HF_TOKEN",
            HUGGINGFACE_BASE_URL,
            true,
        ),
    ]
}
