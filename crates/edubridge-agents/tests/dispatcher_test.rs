use std::time::Duration;

use edubridge_agents::{
    ChatMessage, DispatchResult, DispatchSettings, FallbackDispatcher, ProviderDescriptor,
    ProviderKind, ProviderRegistry,
};
use serde_json::json;
use wiremock::matchers::{bearer_token, body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn descriptor(id: &str, env: &str, base_url: String, strict_json: bool) -> ProviderDescriptor {
    ProviderDescriptor {
        id: id.to_string(),
        name: format!("{id} backend"),
        model: format!("{id}-model"),
        credential_env: env.to_string(),
        kind: ProviderKind::OpenAiCompatible { base_url },
        strict_json,
    }
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "model": "m",
        "choices": [{"message": {"role": "assistant", "content": content}, "finish_reason": "stop"}]
    })
}

#[tokio::test]
async fn falls_back_across_real_http_backends() {
    let primary = MockServer::start().await;
    let secondary = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_string("rate_limit_exceeded"))
        .expect(1)
        .mount(&primary)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(bearer_token("key-b"))
        .and(body_partial_json(json!({"temperature": 0.1})))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
        .expect(1)
        .mount(&secondary)
        .await;

    let registry = ProviderRegistry::new(vec![
        descriptor("a", "KEY_A", primary.uri(), false),
        descriptor("b", "KEY_B", secondary.uri(), true),
    ]);
    let available = registry.available_backends_with(|key| match key {
        "KEY_A" => Some("key-a".to_string()),
        "KEY_B" => Some("key-b".to_string()),
        _ => None,
    });
    let dispatcher = FallbackDispatcher::connect(available, DispatchSettings::default());

    let result = dispatcher
        .dispatch(&[ChatMessage::user("draw the water cycle")], "You are a tutor.")
        .await;

    assert_eq!(
        result,
        DispatchResult::Success {
            content: "ok".to_string(),
            backend_name: "b backend".to_string()
        }
    );
}

#[tokio::test]
async fn slow_backend_times_out_and_exhausts() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(completion("too late"))
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let registry = ProviderRegistry::new(vec![descriptor("slow", "KEY", server.uri(), true)]);
    let available = registry.available_backends_with(|_| Some("k".to_string()));
    let settings = DispatchSettings {
        attempt_timeout: Duration::from_millis(50),
        ..DispatchSettings::default()
    };

    let result = FallbackDispatcher::connect(available, settings)
        .dispatch(&[], "sys")
        .await;

    match result {
        DispatchResult::Exhausted { last_error } => assert!(last_error.contains("timed out")),
        other => panic!("expected exhaustion, got {other:?}"),
    }
}

#[tokio::test]
async fn registry_without_credentials_makes_no_requests() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("unused")))
        .expect(0)
        .mount(&server)
        .await;

    let registry = ProviderRegistry::new(vec![descriptor("a", "KEY", server.uri(), false)]);
    let available = registry.available_backends_with(|_| Some("hf_...".to_string()));
    let dispatcher = FallbackDispatcher::connect(available, DispatchSettings::default());

    let result = dispatcher.dispatch(&[ChatMessage::user("hi")], "sys").await;
    assert_eq!(
        result,
        DispatchResult::Exhausted {
            last_error: "no credentials configured".to_string()
        }
    );
}
