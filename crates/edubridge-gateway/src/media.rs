use axum::Json;
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use edubridge_media::{PPTX_MIME, Slide, generate_or_placeholder, render_pdf, render_pptx};
use serde::Deserialize;
use serde_json::json;
use tracing::{info, warn};

use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct PromptQuery {
    #[serde(default)]
    pub prompt: String,
}

#[derive(Debug, Deserialize)]
pub struct PdfRequest {
    #[serde(default = "default_pdf_title")]
    pub title: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Deserialize)]
pub struct PptRequest {
    #[serde(default = "default_ppt_title")]
    pub title: String,
    #[serde(default)]
    pub slides: Vec<Slide>,
}

fn default_pdf_title() -> String {
    "Lesson Plan".to_string()
}

fn default_ppt_title() -> String {
    "Presentation".to_string()
}

fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "error": message.into() }))).into_response()
}

fn attachment(content_type: &'static str, filename: String, bytes: Vec<u8>) -> Response {
    (
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ],
        bytes,
    )
        .into_response()
}

/// GET /generate/image: PNG for `prompt`, or a placeholder if generation fails.
pub async fn generate_image(
    State(state): State<SharedState>,
    Query(query): Query<PromptQuery>,
) -> Response {
    match generate_or_placeholder(state.images.as_ref(), &query.prompt).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, "image/png")], bytes).into_response(),
        Err(e) => {
            warn!("placeholder image failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Image generation failed")
        }
    }
}

/// GET /generate/video
pub async fn generate_video(
    State(state): State<SharedState>,
    Query(query): Query<PromptQuery>,
) -> Response {
    match state.videos.generate(&query.prompt).await {
        Ok(bytes) => ([(header::CONTENT_TYPE, "video/mp4")], bytes).into_response(),
        Err(e) => {
            warn!("video generation failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, "Video generation failed")
        }
    }
}

/// POST /download/pdf
pub async fn download_pdf(Json(body): Json<PdfRequest>) -> Response {
    let rendered =
        tokio::task::spawn_blocking(move || render_pdf(&body.title, &body.content)).await;

    match rendered {
        Ok(Ok(bytes)) => attachment(
            "application/pdf",
            format!("lesson_{}.pdf", uuid::Uuid::new_v4()),
            bytes,
        ),
        Ok(Err(e)) => {
            warn!("pdf rendering failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}

/// POST /download/ppt: An empty `slides` list asks the model for an outline.
pub async fn download_ppt(State(state): State<SharedState>, Json(body): Json<PptRequest>) -> Response {
    let slides = if body.slides.is_empty() {
        info!("no slides supplied for '{}'; generating an outline", body.title);
        state.outline_slides(&body.title).await
    } else {
        body.slides
    };

    let title = body.title;
    let rendered = tokio::task::spawn_blocking(move || render_pptx(&title, &slides)).await;

    match rendered {
        Ok(Ok(bytes)) => attachment(
            PPTX_MIME,
            format!("pres_{}.pptx", uuid::Uuid::new_v4()),
            bytes,
        ),
        Ok(Err(e)) => {
            warn!("pptx rendering failed: {}", e);
            error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string())
        }
        Err(e) => error_response(StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
    }
}
