pub mod loader;
pub mod model;

pub use loader::ConfigLoader;
pub use model::{
    AppConfig, DispatchConfig, GatewayConfig, MediaConfig, ProviderConfig, ProviderKindConfig,
    RateLimitConfig, SessionConfig,
};
