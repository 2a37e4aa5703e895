use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use serde_json::{Value, json};

use crate::api;
use crate::media;
use crate::state::SharedState;

// Lesson documents posted to /download/* can be long.
const MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

/// Build the application router. Transport layers (CORS, tracing, rate
/// limiting) are added by [`crate::GatewayServer`].
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/chat", post(api::chat))
        .route("/history", get(api::list_sessions))
        .route("/history/{user_id}", get(api::session_history))
        .route("/api/providers", get(api::list_providers))
        .route("/generate/image", get(media::generate_image))
        .route("/generate/video", get(media::generate_video))
        .route("/download/pdf", post(media::download_pdf))
        .route("/download/ppt", post(media::download_ppt))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}

async fn health() -> axum::Json<Value> {
    axum::Json(json!({ "status": "ok" }))
}
