use std::io::{Cursor, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use edubridge_agents::{
    AvailableBackend, DispatchSettings, FallbackDispatcher, LlmProvider, LlmRequest, LlmResponse,
    ProviderDescriptor, ProviderKind,
};
use edubridge_common::{Error, Result};
use edubridge_config::AppConfig;
use edubridge_gateway::{AppState, Collaborators, build_router};
use edubridge_media::{ImageGenerator, VideoGenerator, VideoResult, VideoSearcher};
use serde_json::{Value, json};
use tower::ServiceExt;

struct ScriptedProvider {
    replies: Vec<&'static str>,
    calls: Arc<AtomicUsize>,
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    fn provider_id(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, _request: &LlmRequest) -> Result<LlmResponse> {
        let n = self.calls.fetch_add(1, Ordering::SeqCst);
        let text = self.replies[n.min(self.replies.len() - 1)];
        Ok(LlmResponse {
            text: text.to_string(),
            model: "scripted-model".to_string(),
            usage: None,
            stop_reason: Some("stop".to_string()),
        })
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(true)
    }
}

struct FailingProvider;

#[async_trait]
impl LlmProvider for FailingProvider {
    fn provider_id(&self) -> &str {
        "failing"
    }

    async fn complete(&self, _request: &LlmRequest) -> Result<LlmResponse> {
        Err(Error::Agent(
            "failing API error: status=429, body=rate limit".to_string(),
        ))
    }

    async fn health_check(&self) -> Result<bool> {
        Ok(false)
    }
}

struct TwoVideos;

#[async_trait]
impl VideoSearcher for TwoVideos {
    async fn search(&self, query: &str, _limit: usize) -> Result<Vec<VideoResult>> {
        Ok(vec![
            VideoResult {
                title: format!("{query} 1"),
                link: "https://www.youtube.com/watch?v=1".to_string(),
                ..VideoResult::default()
            },
            VideoResult {
                title: format!("{query} 2"),
                link: "https://www.youtube.com/watch?v=2".to_string(),
                ..VideoResult::default()
            },
        ])
    }
}

struct BrokenImages;

#[async_trait]
impl ImageGenerator for BrokenImages {
    async fn generate(&self, _prompt: &str) -> Result<Vec<u8>> {
        Err(Error::Media("model loading".to_string()))
    }
}

struct BrokenVideos;

#[async_trait]
impl VideoGenerator for BrokenVideos {
    async fn generate(&self, _prompt: &str) -> Result<Vec<u8>> {
        Err(Error::Media("video generation endpoint not configured".to_string()))
    }
}

fn backend(id: &str) -> AvailableBackend {
    AvailableBackend {
        descriptor: ProviderDescriptor {
            id: id.to_string(),
            name: format!("{id} backend"),
            model: format!("{id}-model"),
            credential_env: "TEST_KEY".to_string(),
            kind: ProviderKind::OpenAiCompatible {
                base_url: "http://localhost".to_string(),
            },
            strict_json: true,
        },
        credential: "secret-value".to_string(),
    }
}

fn state_with(backends: Vec<(AvailableBackend, Arc<dyn LlmProvider>)>) -> Arc<AppState> {
    let collaborators = Collaborators {
        dispatcher: FallbackDispatcher::new(backends, DispatchSettings::default()),
        searcher: Arc::new(TwoVideos),
        images: Arc::new(BrokenImages),
        videos: Arc::new(BrokenVideos),
        credential_keys: vec!["GROQ_API_KEY".to_string(), "HF_TOKEN".to_string()],
    };
    Arc::new(AppState::new(AppConfig::default(), collaborators))
}

fn scripted(replies: Vec<&'static str>) -> (Arc<AppState>, Arc<AtomicUsize>) {
    let calls = Arc::new(AtomicUsize::new(0));
    let provider = ScriptedProvider {
        replies,
        calls: Arc::clone(&calls),
    };
    (state_with(vec![(backend("mock"), Arc::new(provider))]), calls)
}

async fn send(state: Arc<AppState>, request: Request<Body>) -> (StatusCode, Vec<u8>) {
    let response = build_router(state).oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

async fn post_json(state: Arc<AppState>, uri: &str, body: Value) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(state, request).await
}

async fn get(state: Arc<AppState>, uri: &str) -> (StatusCode, Vec<u8>) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(state, request).await
}

fn as_json(bytes: &[u8]) -> Value {
    serde_json::from_slice(bytes).unwrap()
}

#[tokio::test]
async fn health_reports_ok() {
    let (status, body) = get(state_with(Vec::new()), "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(as_json(&body), json!({"status": "ok"}));
}

#[tokio::test]
async fn chat_without_backends_returns_setup_hint() {
    let state = state_with(Vec::new());
    let (status, body) = post_json(Arc::clone(&state), "/chat", json!({"text": "hello"})).await;

    assert_eq!(status, StatusCode::OK);
    let body = as_json(&body);
    assert_eq!(body["toolUsed"], "text");
    let message = body["data"].as_str().unwrap();
    assert!(message.contains("GROQ_API_KEY"));
    assert!(body["metadata"].get("backend").is_none());

    // The user turn is kept; no assistant turn is recorded on failure.
    assert_eq!(state.sessions.window_for("guest").len(), 1);
}

#[tokio::test]
async fn chat_with_exhausted_backends_reports_last_error() {
    let state = state_with(vec![(backend("down"), Arc::new(FailingProvider))]);
    let (status, body) = post_json(state, "/chat", json!({"text": "hello"})).await;

    assert_eq!(status, StatusCode::OK);
    let data = as_json(&body)["data"].as_str().unwrap().to_string();
    assert!(data.starts_with("⚠️ All LLM providers exhausted. Last error:"));
    assert!(data.contains("status=429"));
}

#[tokio::test]
async fn chat_interprets_fenced_diagram() {
    let (state, calls) = scripted(vec![
        "Sure! ```json\n{\"toolUsed\":\"mermaid\",\"data\":\"graph TD; A-->B\",\"metadata\":{\"topic\":\"flow\"}}\n```",
    ]);
    let (status, body) = post_json(
        Arc::clone(&state),
        "/chat",
        json!({"text": "draw a flow", "userId": "teacher-1"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    let body = as_json(&body);
    assert_eq!(body["toolUsed"], "mermaid");
    assert_eq!(body["data"], "graph TD; A-->B");
    assert_eq!(body["metadata"]["topic"], "flow");
    assert_eq!(body["metadata"]["backend"], "mock backend");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let window = state.sessions.window_for("teacher-1");
    assert_eq!(window.len(), 2);
    assert_eq!(window[1].content, "graph TD; A-->B");
}

#[tokio::test]
async fn chat_runs_video_search() {
    let (state, _) = scripted(vec![r#"{"toolUsed":"youtube_search","data":"gravity for kids"}"#]);
    let (_, body) = post_json(state, "/chat", json!({"text": "find videos", "user_id": "t2"})).await;

    let body = as_json(&body);
    assert_eq!(body["toolUsed"], "youtube_search");
    let results = body["data"].as_array().unwrap();
    assert_eq!(results.len(), 2);
    assert_eq!(results[0]["title"], "gravity for kids 1");
    assert_eq!(results[0]["channel"], "YouTube");
}

#[tokio::test]
async fn history_lists_sessions_and_turns() {
    let (state, _) = scripted(vec!["Plain answer about cells."]);
    post_json(
        Arc::clone(&state),
        "/chat",
        json!({"text": "Explain cells", "userId": "amy"}),
    )
    .await;

    let (_, listing) = get(Arc::clone(&state), "/history").await;
    let listing = as_json(&listing);
    assert_eq!(listing["sessions"][0]["id"], "amy");
    assert_eq!(listing["sessions"][0]["summary"], "Explain cells");
    assert_eq!(listing["sessions"][0]["turns"], 2);

    let (_, history) = get(Arc::clone(&state), "/history/amy").await;
    let history = as_json(&history);
    assert_eq!(history["history"][0]["role"], "user");
    assert_eq!(history["history"][1]["role"], "assistant");
    assert_eq!(history["history"][1]["content"], "Plain answer about cells.");

    let (_, empty) = get(state, "/history/nobody").await;
    assert_eq!(as_json(&empty), json!({"history": []}));
}

#[tokio::test]
async fn providers_endpoint_hides_credentials() {
    let (state, _) = scripted(vec!["x"]);
    let (status, body) = get(state, "/api/providers").await;

    assert_eq!(status, StatusCode::OK);
    let text = String::from_utf8(body.clone()).unwrap();
    assert!(!text.contains("secret-value"));
    let body = as_json(&body);
    assert_eq!(body["providers"][0]["id"], "mock");
    assert_eq!(body["providers"][0]["strictJson"], true);
}

#[tokio::test]
async fn image_failure_serves_placeholder_png() {
    let (status, body) = get(state_with(Vec::new()), "/generate/image?prompt=a%20cell").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(&body[1..4], b"PNG");
}

#[tokio::test]
async fn video_failure_is_a_json_500() {
    let (status, body) = get(state_with(Vec::new()), "/generate/video?prompt=lava").await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(as_json(&body), json!({"error": "Video generation failed"}));
}

#[tokio::test]
async fn pdf_download_is_an_attachment() {
    let request = Request::builder()
        .method("POST")
        .uri("/download/pdf")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"title": "Volcanoes", "content": "### Intro\n**Magma** rises."}).to_string(),
        ))
        .unwrap();
    let response = build_router(state_with(Vec::new()))
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_TYPE], "application/pdf");
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"lesson_"));
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert!(bytes.starts_with(b"%PDF"));
}

fn slide_count(pptx: &[u8]) -> usize {
    let archive = zip::ZipArchive::new(Cursor::new(pptx)).unwrap();
    archive
        .file_names()
        .filter(|n| n.starts_with("ppt/slides/slide") && n.ends_with(".xml"))
        .count()
}

fn slide_text(pptx: &[u8], n: usize) -> String {
    let mut archive = zip::ZipArchive::new(Cursor::new(pptx)).unwrap();
    let mut file = archive.by_name(&format!("ppt/slides/slide{n}.xml")).unwrap();
    let mut out = String::new();
    file.read_to_string(&mut out).unwrap();
    out
}

#[tokio::test]
async fn ppt_with_supplied_slides_skips_the_model() {
    let (state, calls) = scripted(vec!["unused"]);
    let (status, body) = post_json(
        state,
        "/download/ppt",
        json!({"title": "Fractions", "slides": [{"title": "Halves", "content": ["1/2"]}]}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(slide_count(&body), 2);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn ppt_without_slides_generates_an_outline() {
    let (state, calls) = scripted(vec![
        r#"{"slides":[{"title":"Intro","content":["a"]},{"title":"Practice","content":["b"]},{"title":"Review"}]}"#,
    ]);
    let (status, body) =
        post_json(state, "/download/ppt", json!({"title": "Fractions", "slides": []})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(slide_count(&body), 4);
    assert!(slide_text(&body, 3).contains("Practice"));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn ppt_without_backends_uses_failure_deck() {
    let (status, body) =
        post_json(state_with(Vec::new()), "/download/ppt", json!({"title": "Fractions"})).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(slide_count(&body), 2);
    assert!(slide_text(&body, 2).contains("Content generation failed."));
}

#[tokio::test]
async fn ppt_download_is_a_named_attachment() {
    let request = Request::builder()
        .method("POST")
        .uri("/download/ppt")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            json!({"title": "Fractions", "slides": [{"title": "Halves", "content": ["1/2"]}]})
                .to_string(),
        ))
        .unwrap();
    let response = build_router(state_with(Vec::new()))
        .oneshot(request)
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let disposition = response.headers()[header::CONTENT_DISPOSITION]
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"pres_"));
    assert!(disposition.ends_with(".pptx\""));
}
