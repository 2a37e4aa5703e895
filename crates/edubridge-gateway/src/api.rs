use axum::Json;
use axum::extract::{Path, State};
use edubridge_agents::{
    ChatMessage, DispatchResult, InterpretedReply, NO_CREDENTIALS, ToolDirective, interpret,
};
use serde::Deserialize;
use serde_json::{Value, json};
use tracing::{debug, info};

use crate::state::{AppState, SharedState};

const DEFAULT_USER: &str = "guest";

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub text: String,
    #[serde(default, rename = "userId", alias = "user_id")]
    pub user_id: Option<String>,
}

/// POST /chat: Run one conversational turn.
///
/// Always answers 200 with `{toolUsed, data, metadata}`. Model and tool
/// failures come back as a `text` reply describing what went wrong.
pub async fn chat(State(state): State<SharedState>, Json(body): Json<ChatRequest>) -> Json<Value> {
    let user_id = body
        .user_id
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| DEFAULT_USER.to_string());

    Json(run_turn(&state, &user_id, &body.text).await)
}

/// Record the user turn, dispatch, interpret, execute, and record the reply.
pub async fn run_turn(state: &AppState, user_id: &str, text: &str) -> Value {
    let text = text.trim();
    if text.is_empty() {
        return reply_json(
            InterpretedReply::text("Please type a question or request."),
            None,
        );
    }

    state.sessions.append(user_id, ChatMessage::user(text));
    let history = state.sessions.window_for(user_id);

    let (reply, backend) = match state.dispatcher.dispatch(&history, &state.system_prompt).await {
        DispatchResult::Success {
            content,
            backend_name,
        } => (interpret(&content), Some(backend_name)),
        DispatchResult::Exhausted { last_error } => {
            (InterpretedReply::text(failure_message(state, &last_error)), None)
        }
    };

    let directive = state.executor.execute(reply.directive).await;
    let reply = InterpretedReply {
        directive,
        metadata: reply.metadata,
    };

    if let Some(backend) = &backend {
        state
            .sessions
            .append(user_id, ChatMessage::assistant(history_text(&reply.directive)));
        info!(
            "chat turn for '{}' answered by {} as '{}'",
            user_id,
            backend,
            reply.directive.tag()
        );
    }

    reply_json(reply, backend)
}

fn failure_message(state: &AppState, last_error: &str) -> String {
    if last_error == NO_CREDENTIALS {
        format!(
            "⚠️ No AI provider is configured. Set one of {} and restart the server.",
            state.credential_keys.join(", ")
        )
    } else {
        format!("⚠️ All LLM providers exhausted. Last error: {last_error}")
    }
}

fn history_text(directive: &ToolDirective) -> String {
    match directive.data_value() {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

fn reply_json(reply: InterpretedReply, backend: Option<String>) -> Value {
    let mut metadata = reply.metadata;
    if let Some(backend) = backend {
        metadata.insert("backend".to_string(), Value::String(backend));
    }
    json!({
        "toolUsed": reply.directive.tag(),
        "data": reply.directive.data_value(),
        "metadata": metadata,
    })
}

/// GET /history: One entry per live session.
pub async fn list_sessions(State(state): State<SharedState>) -> Json<Value> {
    let sessions: Vec<Value> = state
        .sessions
        .sessions()
        .into_iter()
        .map(|s| {
            json!({
                "id": s.user_id,
                "summary": s.summary,
                "turns": s.turns,
            })
        })
        .collect();
    Json(json!({ "sessions": sessions }))
}

/// GET /history/{user_id}: The retained window for one user.
pub async fn session_history(
    State(state): State<SharedState>,
    Path(user_id): Path<String>,
) -> Json<Value> {
    let history = state.sessions.window_for(&user_id);
    debug!("history for '{}': {} turns", user_id, history.len());
    Json(json!({ "history": history }))
}

/// GET /api/providers: Backends with a usable credential, in fallback order.
pub async fn list_providers(State(state): State<SharedState>) -> Json<Value> {
    let providers: Vec<Value> = state
        .dispatcher
        .backends()
        .map(|b| {
            json!({
                "id": b.descriptor.id,
                "name": b.descriptor.name,
                "model": b.descriptor.model,
                "strictJson": b.descriptor.strict_json,
            })
        })
        .collect();
    Json(json!({ "providers": providers }))
}
