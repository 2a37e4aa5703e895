use edubridge_media::Slide;
use serde_json::Value;
use tracing::{info, warn};

use crate::interpreter::{JsonShape, extract_json};
use crate::providers::{ChatMessage, LlmProvider, LlmRequest};

const OUTLINE_TEMPERATURE: f64 = 0.1;
const OUTLINE_MAX_TOKENS: u32 = 2048;

fn outline_prompt(title: &str) -> String {
    format!(
        "Create a 5-slide educational presentation structure for the topic: '{title}'. \
         Audience: Students. Output JSON ONLY: \
         [{{\"title\": \"Slide Title\", \"content\": [\"Bullet 1\", \"Bullet 2\"]}}]"
    )
}

/// Ask one backend for a slide outline of `title`.
///
/// Never fails: transport errors and unusable output both produce a small
/// placeholder deck so the download still works.
pub async fn generate_slides(provider: &dyn LlmProvider, model: &str, title: &str) -> Vec<Slide> {
    let request = LlmRequest {
        model: model.to_string(),
        messages: vec![ChatMessage::user(outline_prompt(title))],
        max_tokens: Some(OUTLINE_MAX_TOKENS),
        temperature: Some(OUTLINE_TEMPERATURE),
        json_mode: true,
    };

    let response = match provider.complete(&request).await {
        Ok(response) => response,
        Err(e) => {
            warn!(
                "slide outline via '{}' failed: {}",
                provider.provider_id(),
                e
            );
            return generation_failed_deck(title);
        }
    };

    let slides = extract_json(&response.text, JsonShape::Any)
        .map(normalize_slides)
        .unwrap_or_default();

    if slides.is_empty() {
        warn!("slide outline for '{}' was unusable; using fallback deck", title);
        return unparseable_outline_deck(title);
    }

    info!("generated {} slides for '{}'", slides.len(), title);
    slides
}

/// Accepts a bare list, `{"slides": [...]}`, or the first list-valued field
/// of an object in the order the model wrote it. Items without a title are
/// dropped.
pub fn normalize_slides(value: Value) -> Vec<Slide> {
    let items = match value {
        Value::Array(items) => items,
        // `take` leaves a null in place so the remaining keys keep their order.
        Value::Object(mut object) => match object.get_mut("slides").map(Value::take) {
            Some(Value::Array(items)) => items,
            _ => object
                .into_iter()
                .find_map(|(_, v)| match v {
                    Value::Array(items) => Some(items),
                    _ => None,
                })
                .unwrap_or_default(),
        },
        _ => Vec::new(),
    };

    items.into_iter().filter_map(slide_from_value).collect()
}

fn slide_from_value(value: Value) -> Option<Slide> {
    let Value::Object(object) = value else {
        return None;
    };
    let title = match object.get("title")? {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    let content = match object.get("content") {
        Some(Value::Array(points)) => points
            .iter()
            .map(|p| match p {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .collect(),
        Some(Value::String(point)) => vec![point.clone()],
        _ => Vec::new(),
    };

    Some(Slide { title, content })
}

/// Deck used when the model answered but nothing usable could be parsed.
pub fn unparseable_outline_deck(title: &str) -> Vec<Slide> {
    vec![
        Slide {
            title: title.to_string(),
            content: vec![
                "AI generated content structure failed.".to_string(),
                "Using fallback mode.".to_string(),
            ],
        },
        Slide {
            title: "Summary".to_string(),
            content: vec![format!("Topic: {title}")],
        },
    ]
}

/// Deck used when no backend could be reached at all.
pub fn generation_failed_deck(title: &str) -> Vec<Slide> {
    vec![Slide {
        title: title.to_string(),
        content: vec![
            "Content generation failed.".to_string(),
            "Check logs.".to_string(),
        ],
    }]
}
