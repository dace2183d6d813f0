use std::convert::Infallible;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures::stream::{self, BoxStream, StreamExt};
use serde::Deserialize;
use serde_json::json;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;

use crate::services::{Answer, QueryService, NO_CONTEXT_ANSWER};

#[derive(Clone)]
pub struct AppState {
    pub query: QueryService,
}

#[derive(Debug)]
pub enum AppError {
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::BadRequest(message) => (StatusCode::BAD_REQUEST, message),
            AppError::Internal(message) => (StatusCode::INTERNAL_SERVER_ERROR, message),
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionBody {
    #[serde(default)]
    pub messages: Vec<IncomingMessage>,
    #[serde(default)]
    pub stream: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    pub role: String,
    #[serde(default)]
    pub content: String,
}

pub async fn health() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// OpenAI-compatible chat completion endpoint answering with RAG over the
/// store. Streams server-sent events unless the client asks for a complete
/// response with `"stream": false`.
pub async fn chat_completions(
    State(state): State<AppState>,
    Json(body): Json<ChatCompletionBody>,
) -> Result<Response, AppError> {
    if body.messages.is_empty() {
        return Err(AppError::BadRequest("No messages provided".to_string()));
    }

    let question = body
        .messages
        .iter()
        .rev()
        .find(|m| m.role == "user")
        .map(|m| m.content.clone())
        .ok_or_else(|| AppError::BadRequest("No user message found".to_string()))?;

    if body.stream == Some(false) {
        let (answer, _excerpts) = state
            .query
            .answer_complete(&question)
            .await
            .map_err(|e| AppError::Internal(format!("Completion failed: {e}")))?;

        return Ok(Json(completion_payload(&answer)).into_response());
    }

    let answer = state
        .query
        .answer(&question)
        .await
        .map_err(|e| AppError::Internal(format!("Completion failed: {e}")))?;

    let events: BoxStream<'static, Result<Event, Infallible>> = match answer {
        Answer::NoContext => stream::iter(vec![Ok(delta_event(NO_CONTEXT_ANSWER)), Ok(done_event())]).boxed(),
        Answer::Streaming { stream: rx, .. } => ReceiverStream::new(rx)
            .map(|fragment| match fragment {
                Ok(content) => Ok(delta_event(&content)),
                Err(error) => Ok(Event::default()
                    .data(json!({ "error": error.to_string() }).to_string())),
            })
            .chain(stream::once(async { Ok(done_event()) }))
            .boxed(),
    };

    Ok(Sse::new(events).keep_alive(KeepAlive::default()).into_response())
}

fn delta_event(content: &str) -> Event {
    Event::default().data(json!({ "choices": [{ "delta": { "content": content } }] }).to_string())
}

fn done_event() -> Event {
    Event::default().data("[DONE]")
}

fn completion_payload(answer: &str) -> serde_json::Value {
    json!({
        "id": format!("chatcmpl-{}", Uuid::new_v4()),
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": answer },
            "finish_reason": "stop"
        }]
    })
}
