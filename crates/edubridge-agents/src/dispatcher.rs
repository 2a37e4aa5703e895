use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use edubridge_common::Error;
use edubridge_config::DispatchConfig;
use tracing::{debug, info, instrument, warn};

use crate::providers::{ChatMessage, LlmProvider, LlmRequest};
use crate::registry::AvailableBackend;

pub const NO_CREDENTIALS: &str = "no credentials configured";

/// Appended as a second system turn for backends flagged `strict_json`.
pub const STRICT_JSON_INSTRUCTION: &str = "CRITICAL INSTRUCTION: You are a JSON-only API. \
     Return strictly valid JSON matching the defined tool schema. \
     Do not include ANY conversational text. Output ONLY the JSON object.";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchResult {
    Success {
        content: String,
        backend_name: String,
    },
    Exhausted {
        last_error: String,
    },
}

/// Why a backend attempt failed. Only used for diagnostics; every kind moves
/// on to the next backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendFailure {
    RateLimited,
    Unauthorized,
    Unknown,
}

impl BackendFailure {
    pub fn classify(error: &Error) -> Self {
        let message = error.to_string().to_ascii_lowercase();

        if let Some(status) = extract_status_code(&message) {
            match status {
                429 => return Self::RateLimited,
                401 | 403 => return Self::Unauthorized,
                _ => {}
            }
        }

        if message.contains("rate") || message.contains("429") {
            Self::RateLimited
        } else if ["api_key", "api key", "unauthorized"]
            .iter()
            .any(|fragment| message.contains(fragment))
        {
            Self::Unauthorized
        } else {
            Self::Unknown
        }
    }
}

impl fmt::Display for BackendFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::RateLimited => "rate limited",
            Self::Unauthorized => "unauthorized",
            Self::Unknown => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone)]
pub struct DispatchSettings {
    pub max_tokens: u32,
    pub temperature: f64,
    pub strict_temperature: f64,
    pub attempt_timeout: Duration,
}

impl Default for DispatchSettings {
    fn default() -> Self {
        Self::from(&DispatchConfig::default())
    }
}

impl From<&DispatchConfig> for DispatchSettings {
    fn from(config: &DispatchConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
            strict_temperature: config.strict_temperature,
            attempt_timeout: Duration::from_secs(config.attempt_timeout_secs),
        }
    }
}

/// Tries each available backend in priority order until one answers.
pub struct FallbackDispatcher {
    backends: Vec<(AvailableBackend, Arc<dyn LlmProvider>)>,
    settings: DispatchSettings,
}

impl FallbackDispatcher {
    pub fn new(
        backends: Vec<(AvailableBackend, Arc<dyn LlmProvider>)>,
        settings: DispatchSettings,
    ) -> Self {
        Self { backends, settings }
    }

    /// Connect a transport client for every backend.
    pub fn connect(available: Vec<AvailableBackend>, settings: DispatchSettings) -> Self {
        let backends = available
            .into_iter()
            .map(|backend| {
                let provider = backend.connect();
                (backend, provider)
            })
            .collect();
        Self::new(backends, settings)
    }

    pub fn backends(&self) -> impl Iterator<Item = &AvailableBackend> {
        self.backends.iter().map(|(backend, _)| backend)
    }

    /// Highest-priority backend, used by one-shot generation calls.
    pub fn primary(&self) -> Option<(&AvailableBackend, Arc<dyn LlmProvider>)> {
        self.backends
            .first()
            .map(|(backend, provider)| (backend, Arc::clone(provider)))
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    pub fn settings(&self) -> &DispatchSettings {
        &self.settings
    }

    #[instrument(skip_all, fields(turns = history.len()))]
    pub async fn dispatch(&self, history: &[ChatMessage], system_instruction: &str) -> DispatchResult {
        if self.backends.is_empty() {
            return DispatchResult::Exhausted {
                last_error: NO_CREDENTIALS.to_string(),
            };
        }

        let mut base_messages = Vec::with_capacity(history.len() + 2);
        base_messages.push(ChatMessage::system(system_instruction));
        base_messages.extend_from_slice(history);

        let mut last_error = String::new();
        for (index, (backend, provider)) in self.backends.iter().enumerate() {
            let request = self.shape_request(backend, &base_messages);
            debug!(
                "attempting backend '{}' (strict_json={})",
                backend.name(),
                backend.descriptor.strict_json
            );

            let outcome =
                match tokio::time::timeout(self.settings.attempt_timeout, provider.complete(&request))
                    .await
                {
                    Ok(Ok(response)) if response.text.trim().is_empty() => Err(Error::Agent(
                        format!("{} returned an empty response", backend.descriptor.id),
                    )),
                    Ok(result) => result,
                    Err(_) => Err(Error::Agent(format!(
                        "{} timed out after {}s",
                        backend.descriptor.id,
                        self.settings.attempt_timeout.as_secs_f64()
                    ))),
                };

            match outcome {
                Ok(response) => {
                    if index > 0 {
                        info!("using fallback backend '{}'", backend.name());
                    }
                    return DispatchResult::Success {
                        content: response.text,
                        backend_name: backend.name().to_string(),
                    };
                }
                Err(err) => {
                    let failure = BackendFailure::classify(&err);
                    warn!("backend '{}' {}: {}", backend.name(), failure, err);
                    last_error = err.to_string();
                }
            }
        }

        DispatchResult::Exhausted { last_error }
    }

    fn shape_request(&self, backend: &AvailableBackend, base: &[ChatMessage]) -> LlmRequest {
        let mut messages = base.to_vec();
        let temperature = if backend.descriptor.strict_json {
            messages.push(ChatMessage::system(STRICT_JSON_INSTRUCTION));
            self.settings.strict_temperature
        } else {
            self.settings.temperature
        };

        LlmRequest {
            model: backend.descriptor.model.clone(),
            messages,
            max_tokens: Some(self.settings.max_tokens),
            temperature: Some(temperature),
            json_mode: false,
        }
    }
}

fn extract_status_code(message: &str) -> Option<u16> {
    for marker in ["status=", "status:", "status code"] {
        let mut search_start = 0usize;
        while let Some(offset) = message[search_start..].find(marker) {
            let after_marker = search_start + offset + marker.len();
            let remainder = message[after_marker..].trim_start();
            let digits: String = remainder
                .chars()
                .take_while(|ch| ch.is_ascii_digit())
                .collect();

            if digits.len() >= 3 {
                if let Ok(status) = digits[..3].parse::<u16>() {
                    return Some(status);
                }
            }

            search_start = after_marker;
        }
    }
    None
}
