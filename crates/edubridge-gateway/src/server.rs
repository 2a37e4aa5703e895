use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use edubridge_common::{Error, Result};
use edubridge_config::AppConfig;
use tower_governor::GovernorLayer;
use tower_governor::governor::GovernorConfigBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use crate::router::build_router;
use crate::state::{AppState, Collaborators, SharedState};

const HOUSEKEEPING_INTERVAL: Duration = Duration::from_secs(60);

pub struct GatewayServer {
    config: AppConfig,
    state: SharedState,
}

impl GatewayServer {
    /// Server wired to the real provider, search and media clients.
    pub fn from_config(config: AppConfig) -> Result<Self> {
        let collaborators = Collaborators::from_config(&config)?;
        Ok(Self::new(config, collaborators))
    }

    pub fn new(config: AppConfig, collaborators: Collaborators) -> Self {
        let state = Arc::new(AppState::new(config.clone(), collaborators));
        Self { config, state }
    }

    pub fn state(&self) -> SharedState {
        Arc::clone(&self.state)
    }

    pub async fn run(self) -> Result<()> {
        let gateway = &self.config.gateway;
        let addr: SocketAddr = format!("{}:{}", gateway.host, gateway.port)
            .parse()
            .map_err(|e| Error::Gateway(format!("invalid listen address: {e}")))?;

        let mut app = build_router(self.state()).layer(TraceLayer::new_for_http());
        if gateway.cors_allow_any {
            app = app.layer(CorsLayer::permissive());
        }

        // Per-IP rate limit (default: 1 req/sec, burst 60).
        let rl = &gateway.rate_limit;
        let limiter = if rl.enabled {
            let governor_conf = GovernorConfigBuilder::default()
                .per_second(rl.per_second)
                .burst_size(rl.burst_size)
                .finish()
                .ok_or_else(|| Error::Config("invalid rate limit settings".to_string()))?;
            let limiter = governor_conf.limiter().clone();
            app = app.layer(GovernorLayer::new(governor_conf));
            Some(limiter)
        } else {
            None
        };

        // Drop idle sessions and stale rate-limiter entries.
        let state = self.state();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(HOUSEKEEPING_INTERVAL);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let pruned = state.sessions.prune_expired();
                if pruned > 0 {
                    debug!("pruned {} idle session(s)", pruned);
                }
                if let Some(limiter) = &limiter {
                    limiter.retain_recent();
                }
            }
        });

        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!("gateway listening on http://{}", listener.local_addr()?);

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal())
        .await?;

        info!("gateway stopped");
        Ok(())
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}
