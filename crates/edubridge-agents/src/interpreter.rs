//! Turns raw model output into a [`ToolDirective`].
//!
//! Models are asked for a JSON object shaped like
//! `{"toolUsed": "...", "data": ..., "metadata": {...}}`, but weaker backends
//! wrap it in prose, fence it, or skip it entirely. Interpretation therefore
//! never fails: anything that does not yield a recognised directive becomes
//! [`ToolDirective::Text`] carrying the untouched input.

use edubridge_media::VideoResult;
use serde_json::{Map, Value};

const FENCE: &str = "```";

/// What `extract_json` is allowed to return.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JsonShape {
    /// Only a JSON object.
    Object,
    /// An object or an array.
    Any,
}

#[derive(Debug, Clone, PartialEq)]
pub enum VideoSearchPayload {
    Query(String),
    Results(Vec<VideoResult>),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ToolDirective {
    Text { body: String },
    Diagram { spec: String },
    ImagePrompt { prompt: String },
    VideoPrompt { prompt: String },
    VideoSearch(VideoSearchPayload),
    Presentation { title: String },
    Document { content: String },
    DataExport { kind: String, payload: Value },
}

impl ToolDirective {
    pub fn text(body: impl Into<String>) -> Self {
        Self::Text { body: body.into() }
    }

    /// Wire tag reported to clients as `toolUsed`.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Text { .. } => "text",
            Self::Diagram { .. } => "mermaid",
            Self::ImagePrompt { .. } => "image_prompt",
            Self::VideoPrompt { .. } => "video_prompt",
            Self::VideoSearch(_) => "youtube_search",
            Self::Presentation { .. } => "presentation",
            Self::Document { .. } => "document",
            Self::DataExport { .. } => "data_export",
        }
    }

    /// Payload reported to clients as `data`.
    pub fn data_value(&self) -> Value {
        match self {
            Self::Text { body } => Value::String(body.clone()),
            Self::Diagram { spec } => Value::String(spec.clone()),
            Self::ImagePrompt { prompt } | Self::VideoPrompt { prompt } => {
                Value::String(prompt.clone())
            }
            Self::VideoSearch(VideoSearchPayload::Query(query)) => Value::String(query.clone()),
            Self::VideoSearch(VideoSearchPayload::Results(results)) => {
                serde_json::to_value(results).unwrap_or_default()
            }
            Self::Presentation { title } => Value::String(title.clone()),
            Self::Document { content } => Value::String(content.clone()),
            Self::DataExport { payload, .. } => payload.clone(),
        }
    }
}

/// A directive plus the `metadata` object the model sent alongside it.
#[derive(Debug, Clone, PartialEq)]
pub struct InterpretedReply {
    pub directive: ToolDirective,
    pub metadata: Map<String, Value>,
}

impl InterpretedReply {
    pub fn text(body: impl Into<String>) -> Self {
        Self {
            directive: ToolDirective::text(body),
            metadata: Map::new(),
        }
    }
}

pub fn interpret(raw: &str) -> InterpretedReply {
    let Some(Value::Object(object)) = extract_json(raw, JsonShape::Object) else {
        return InterpretedReply::text(raw);
    };

    let tag = object
        .get("toolUsed")
        .or_else(|| object.get("tool_used"))
        .and_then(Value::as_str)
        .map(|t| t.trim().to_ascii_lowercase());
    let Some(tag) = tag else {
        return InterpretedReply::text(raw);
    };

    let data = object.get("data").cloned().unwrap_or(Value::Null);
    let metadata = object
        .get("metadata")
        .and_then(Value::as_object)
        .cloned()
        .unwrap_or_default();

    let directive = match tag.as_str() {
        "text" => ToolDirective::Text {
            body: data_text(&data),
        },
        "mermaid" => ToolDirective::Diagram {
            spec: data_text(&data),
        },
        "image_prompt" => ToolDirective::ImagePrompt {
            prompt: data_text(&data),
        },
        "video_prompt" => ToolDirective::VideoPrompt {
            prompt: data_text(&data),
        },
        "youtube_search" | "video_search" => {
            ToolDirective::VideoSearch(VideoSearchPayload::Query(data_text(&data)))
        }
        "presentation" => ToolDirective::Presentation {
            title: data_text(&data),
        },
        "document" => ToolDirective::Document {
            content: data_text(&data),
        },
        "data_export" => ToolDirective::DataExport {
            kind: export_kind(&metadata, &data),
            payload: data,
        },
        _ => return InterpretedReply::text(raw),
    };

    InterpretedReply {
        directive,
        metadata,
    }
}

fn data_text(data: &Value) -> String {
    match data {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn export_kind(metadata: &Map<String, Value>, data: &Value) -> String {
    metadata
        .get("format")
        .and_then(Value::as_str)
        .or_else(|| data.get("kind").and_then(Value::as_str))
        .unwrap_or("json")
        .to_string()
}

/// Pull the first JSON value of the requested shape out of free text.
///
/// Looks inside the preferred fenced block first (a ```` ```json ```` block,
/// else the first fence), then falls back to the whole input.
pub fn extract_json(raw: &str, shape: JsonShape) -> Option<Value> {
    let regions = fenced_regions(raw);
    let preferred = regions
        .iter()
        .find(|(info, _)| info.eq_ignore_ascii_case("json"))
        .or_else(|| regions.first())
        .map(|(_, body)| *body);

    if let Some(body) = preferred {
        if let Some(value) = scan_for_json(body, shape) {
            return Some(value);
        }
    }
    scan_for_json(raw, shape)
}

/// `(info string, body)` for every closed ```` ``` ```` pair.
fn fenced_regions(raw: &str) -> Vec<(&str, &str)> {
    let mut regions = Vec::new();
    let mut rest = raw;

    while let Some(open) = rest.find(FENCE) {
        let after_open = &rest[open + FENCE.len()..];
        let Some(close) = after_open.find(FENCE) else {
            break;
        };
        let block = &after_open[..close];

        let region = match block.find('\n') {
            Some(newline) if is_info_string(&block[..newline]) => {
                (block[..newline].trim(), &block[newline + 1..])
            }
            _ => ("", block),
        };
        regions.push(region);
        rest = &after_open[close + FENCE.len()..];
    }

    regions
}

fn is_info_string(line: &str) -> bool {
    line.trim()
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '+' | '.'))
}

fn scan_for_json(text: &str, shape: JsonShape) -> Option<Value> {
    for (start, ch) in text.char_indices() {
        let opens = match shape {
            JsonShape::Object => ch == '{',
            JsonShape::Any => ch == '{' || ch == '[',
        };
        if !opens {
            continue;
        }

        let Some(end) = balanced_end(&text[start..]) else {
            continue;
        };
        let Ok(value) = serde_json::from_str::<Value>(&text[start..start + end]) else {
            continue;
        };

        let accepted = match shape {
            JsonShape::Object => value.is_object(),
            JsonShape::Any => value.is_object() || value.is_array(),
        };
        if accepted {
            return Some(value);
        }
    }
    None
}

/// Byte length of the bracketed span starting at `text[0]`, ignoring
/// brackets inside string literals.
fn balanced_end(text: &str) -> Option<usize> {
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (index, ch) in text.char_indices() {
        if in_string {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == '"' {
                in_string = false;
            }
            continue;
        }

        match ch {
            '"' => in_string = true,
            '{' | '[' => depth += 1,
            '}' | ']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(index + ch.len_utf8());
                }
            }
            _ => {}
        }
    }
    None
}
