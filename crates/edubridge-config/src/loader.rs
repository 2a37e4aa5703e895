use std::path::{Path, PathBuf};

use edubridge_common::{Error, Result};
use tracing::{debug, info};

use crate::model::AppConfig;

const CONFIG_ENV: &str = "EDUBRIDGE_CONFIG";
const CONFIG_FILE: &str = "config.toml";

/// Locates and parses `config.toml`.
///
/// Resolution order: explicit path, `$EDUBRIDGE_CONFIG`, `~/.edubridge/config.toml`.
/// An explicit or env-provided path must exist; the home-directory file is optional.
#[derive(Debug, Default)]
pub struct ConfigLoader {
    explicit: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            explicit: Some(path.into()),
        }
    }

    /// Default config directory (`~/.edubridge`).
    pub fn config_dir() -> PathBuf {
        dirs::home_dir()
            .map(|h| h.join(".edubridge"))
            .unwrap_or_else(|| PathBuf::from(".edubridge"))
    }

    pub fn load(&self) -> Result<AppConfig> {
        if let Some(path) = &self.explicit {
            return Self::load_file(path);
        }

        if let Ok(from_env) = std::env::var(CONFIG_ENV) {
            let trimmed = from_env.trim();
            if !trimmed.is_empty() {
                return Self::load_file(Path::new(trimmed));
            }
        }

        let default_path = Self::config_dir().join(CONFIG_FILE);
        if default_path.is_file() {
            return Self::load_file(&default_path);
        }

        debug!(
            "no config file at {}; using built-in defaults",
            default_path.display()
        );
        let config = AppConfig::default();
        validate(&config)?;
        Ok(config)
    }

    fn load_file(path: &Path) -> Result<AppConfig> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("failed to read config {}: {e}", path.display()))
        })?;
        let config = Self::parse(&raw)
            .map_err(|e| Error::Config(format!("{}: {e}", path.display())))?;
        info!("loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn parse(raw: &str) -> Result<AppConfig> {
        let config: AppConfig =
            toml::from_str(raw).map_err(|e| Error::Config(format!("invalid TOML: {e}")))?;
        validate(&config)?;
        Ok(config)
    }
}

fn validate(config: &AppConfig) -> Result<()> {
    if config.gateway.port == 0 {
        return Err(Error::Config("gateway.port must be non-zero".into()));
    }
    if config.session.window == 0 {
        return Err(Error::Config("session.window must be at least 1".into()));
    }
    if config.session.capacity == 0 {
        return Err(Error::Config("session.capacity must be at least 1".into()));
    }
    let rl = &config.gateway.rate_limit;
    if rl.enabled && (rl.per_second == 0 || rl.burst_size == 0) {
        return Err(Error::Config(
            "gateway.rate_limit.per_second and burst_size must be non-zero when enabled".into(),
        ));
    }
    if config.dispatch.attempt_timeout_secs == 0 {
        return Err(Error::Config(
            "dispatch.attempt_timeout_secs must be non-zero".into(),
        ));
    }
    for provider in &config.providers {
        if provider.id.trim().is_empty() || provider.credential_env.trim().is_empty() {
            return Err(Error::Config(format!(
                "provider '{}' needs both an id and a credential_env",
                provider.name
            )));
        }
    }
    Ok(())
}
