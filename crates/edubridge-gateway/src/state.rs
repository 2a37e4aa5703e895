use std::sync::Arc;
use std::time::Duration;

use edubridge_agents::{
    DispatchSettings, FallbackDispatcher, ProviderRegistry, ToolExecutor, generate_slides,
    generation_failed_deck,
};
use edubridge_common::Result;
use edubridge_config::AppConfig;
use edubridge_media::{
    DuckDuckGoVideoSearcher, HttpVideoGenerator, HuggingFaceImageGenerator, ImageGenerator, Slide,
    VideoGenerator, VideoSearcher,
};
use edubridge_store::SessionStore;
use tracing::info;

use crate::prompt::DEFAULT_SYSTEM_PROMPT;

pub type SharedState = Arc<AppState>;

/// External services the gateway talks to.
pub struct Collaborators {
    pub dispatcher: FallbackDispatcher,
    pub searcher: Arc<dyn VideoSearcher>,
    pub images: Arc<dyn ImageGenerator>,
    pub videos: Arc<dyn VideoGenerator>,
    /// Credential variables an operator can set to enable a backend.
    pub credential_keys: Vec<String>,
}

impl Collaborators {
    /// Real clients, with LLM credentials read from the environment.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let registry = ProviderRegistry::from_config(&config.providers);
        let credential_keys = registry
            .credential_keys()
            .into_iter()
            .map(str::to_string)
            .collect();
        let dispatcher = FallbackDispatcher::connect(
            registry.available_backends(),
            DispatchSettings::from(&config.dispatch),
        );

        let media = &config.media;
        let timeout = Duration::from_secs(media.request_timeout_secs);
        let image_token = std::env::var(&media.image_token_env).ok();

        Ok(Self {
            dispatcher,
            searcher: Arc::new(DuckDuckGoVideoSearcher::new(timeout)?),
            images: Arc::new(HuggingFaceImageGenerator::from_config(media, image_token)?),
            videos: Arc::new(HttpVideoGenerator::new(media.video_endpoint.clone(), timeout)?),
            credential_keys,
        })
    }
}

pub struct AppState {
    pub config: AppConfig,
    pub dispatcher: FallbackDispatcher,
    pub executor: ToolExecutor,
    pub sessions: SessionStore,
    pub images: Arc<dyn ImageGenerator>,
    pub videos: Arc<dyn VideoGenerator>,
    pub system_prompt: String,
    pub credential_keys: Vec<String>,
}

impl AppState {
    pub fn new(config: AppConfig, collaborators: Collaborators) -> Self {
        let session = &config.session;
        let sessions = SessionStore::new(
            session.window,
            session.capacity,
            Duration::from_secs(session.ttl_secs),
        );
        let executor = ToolExecutor::new(collaborators.searcher)
            .with_limit(config.media.video_search_limit);
        let system_prompt = config
            .dispatch
            .system_prompt
            .clone()
            .filter(|p| !p.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());

        info!(
            "gateway state ready: {} backend(s), session window {}",
            collaborators.dispatcher.backends().count(),
            session.window
        );

        Self {
            config,
            dispatcher: collaborators.dispatcher,
            executor,
            sessions,
            images: collaborators.images,
            videos: collaborators.videos,
            system_prompt,
            credential_keys: collaborators.credential_keys,
        }
    }

    /// Slide outline for `title` from the highest-priority backend.
    pub async fn outline_slides(&self, title: &str) -> Vec<Slide> {
        match self.dispatcher.primary() {
            Some((backend, provider)) => {
                generate_slides(provider.as_ref(), &backend.descriptor.model, title).await
            }
            None => generation_failed_deck(title),
        }
    }
}
