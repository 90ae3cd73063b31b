//! Coaching chat handlers
//!
//! Conversations are stored locally; a chat turn persists the user message,
//! asks the model with a freshly built financial context and persists the
//! reply. The stream endpoint relays reply chunks as server-sent events:
//! `chunk` events carry text, then one `done` (stored message) or `error`.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::sse::{Event, Sse},
    Json,
};
use futures_util::stream::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info};

use super::today;
use crate::{AppError, AppState, SuccessResponse};
use fincoach_core::db::WriteOutcome;
use fincoach_core::models::{Conversation, Message};

#[derive(Debug, Serialize)]
pub struct ChatStatus {
    pub configured: bool,
    pub model: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CreateConversationRequest {
    pub title: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
}

#[derive(Serialize)]
pub struct SseChunk {
    pub text: String,
}

#[derive(Serialize)]
pub struct SseError {
    pub message: String,
}

enum StreamUpdate {
    Chunk(String),
    Done(Message),
    Failed(String),
}

/// GET /api/chat/status - Whether the coach can answer
pub async fn chat_status(State(state): State<Arc<AppState>>) -> Json<ChatStatus> {
    Json(ChatStatus {
        configured: state.coach.is_some(),
        model: state
            .coach
            .as_ref()
            .map(|coach| coach.client().model().to_string()),
    })
}

/// GET /api/conversations - Most recently updated first
pub async fn list_conversations(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Conversation>>, AppError> {
    Ok(Json(state.db.list_conversations()?))
}

/// POST /api/conversations
pub async fn create_conversation(
    State(state): State<Arc<AppState>>,
    body: Option<Json<CreateConversationRequest>>,
) -> Result<(StatusCode, Json<Conversation>), AppError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();
    let conversation = state.db.create_conversation(body.title.as_deref())?;
    Ok((StatusCode::CREATED, Json(conversation)))
}

/// GET /api/conversations/:id - Conversation with its messages
pub async fn get_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Conversation>, AppError> {
    state
        .db
        .get_conversation(id)?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Conversation not found"))
}

/// DELETE /api/conversations/:id
pub async fn delete_conversation(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    match state.db.delete_conversation(id)? {
        WriteOutcome::Applied(()) => Ok(Json(SuccessResponse { success: true })),
        WriteOutcome::NotFound => Err(AppError::not_found("Conversation not found")),
    }
}

fn validate_message(body: &ChatRequest) -> Result<(), AppError> {
    if body.message.trim().is_empty() {
        return Err(AppError::bad_request("Message is required"));
    }
    Ok(())
}

/// POST /api/conversations/:id/messages - One chat turn; returns the reply
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<Message>, AppError> {
    validate_message(&body)?;
    let coach = state.coach()?;

    let reply = coach.ask(&state.db, id, &body.message, today()).await?;
    Ok(Json(reply))
}

/// POST /api/conversations/:id/stream - One chat turn as server-sent events
pub async fn stream_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<ChatRequest>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    validate_message(&body)?;
    let coach = state.coach()?.clone();

    // Fail fast before the event stream opens
    if state.db.get_conversation(id)?.is_none() {
        return Err(AppError::not_found("Conversation not found"));
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    let db = state.db.clone();

    tokio::spawn(async move {
        let chunks = tx.clone();
        let result = coach
            .ask_streaming(&db, id, &body.message, today(), move |chunk| {
                let _ = chunks.send(StreamUpdate::Chunk(chunk.to_string()));
            })
            .await;

        let update = match result {
            Ok(message) => {
                info!(conversation_id = id, "Streamed chat turn complete");
                StreamUpdate::Done(message)
            }
            Err(e) => {
                error!(conversation_id = id, error = %e, "Streamed chat turn failed");
                StreamUpdate::Failed(e.to_string())
            }
        };
        let _ = tx.send(update);
    });

    let stream = async_stream::stream! {
        while let Some(update) = rx.recv().await {
            let event = match update {
                StreamUpdate::Chunk(text) => Event::default()
                    .event("chunk")
                    .json_data(SseChunk { text }),
                StreamUpdate::Done(message) => Event::default()
                    .event("done")
                    .json_data(message),
                StreamUpdate::Failed(message) => Event::default()
                    .event("error")
                    .json_data(SseError { message }),
            };
            if let Ok(evt) = event {
                yield Ok(evt);
            }
        }
    };

    Ok(Sse::new(stream))
}
