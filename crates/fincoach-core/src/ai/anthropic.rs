//! Anthropic Messages API client for the coaching chat
//!
//! # Configuration
//!
//! Environment variables:
//! - `ANTHROPIC_API_KEY`: required; without it chat is disabled
//! - `ANTHROPIC_MODEL`: model id (default `claude-sonnet-4-20250514`)
//! - `ANTHROPIC_BASE_URL`: API host (default `https://api.anthropic.com`)
//!
//! One request per turn. Failures are classified into invalid-key,
//! rate-limited and generic errors and are never retried.

use futures_util::StreamExt;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::models::{self, MessageRole};

pub const DEFAULT_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const API_VERSION: &str = "2023-06-01";

/// Reply length cap for every coaching turn
pub const MAX_TOKENS: u32 = 1024;

/// Returned when the model answers without any text block
pub const EMPTY_REPLY: &str = "I apologize, but I was unable to generate a response.";

/// Anthropic Messages API request
#[derive(Debug, Serialize)]
pub struct MessagesRequest {
    pub model: String,
    pub max_tokens: u32,
    pub messages: Vec<Message>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub stream: bool,
}

/// One turn in the request transcript
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub role: String, // "user", "assistant"
    pub content: String,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: "assistant".into(),
            content: text.into(),
        }
    }
}

/// Content block types
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ContentBlock {
    #[serde(rename = "text")]
    Text { text: String },

    #[serde(other)]
    Other,
}

/// Anthropic Messages API response
#[derive(Debug, Deserialize)]
pub struct MessagesResponse {
    pub content: Vec<ContentBlock>,
    pub stop_reason: Option<String>,
}

impl MessagesResponse {
    /// Text of the first text block
    pub fn text(&self) -> Option<&str> {
        self.content.iter().find_map(|block| match block {
            ContentBlock::Text { text } => Some(text.as_str()),
            ContentBlock::Other => None,
        })
    }
}

/// Build the request transcript: prior turns with blank content dropped,
/// then the new user turn.
pub fn build_transcript(history: &[models::Message], text: &str) -> Vec<Message> {
    let mut messages: Vec<Message> = history
        .iter()
        .filter(|m| !m.content.trim().is_empty())
        .map(|m| match m.role {
            MessageRole::User => Message::user(m.content.clone()),
            MessageRole::Assistant => Message::assistant(m.content.clone()),
        })
        .collect();
    messages.push(Message::user(text));
    messages
}

/// Map a provider failure onto the chat error taxonomy
pub fn classify_failure(status: Option<StatusCode>, message: &str) -> Error {
    let lower = message.to_lowercase();
    if status == Some(StatusCode::UNAUTHORIZED) || lower.contains("api key") {
        Error::AiInvalidKey
    } else if status == Some(StatusCode::TOO_MANY_REQUESTS) || lower.contains("rate limit") {
        Error::AiRateLimited
    } else {
        Error::AiFailed(message.to_string())
    }
}

/// What one server-sent event contributes to the reply
#[derive(Debug, PartialEq)]
enum StreamEvent {
    Text(String),
    Error(String),
    Ignore,
}

fn parse_stream_event(data: &str) -> StreamEvent {
    let Ok(value) = serde_json::from_str::<serde_json::Value>(data) else {
        return StreamEvent::Ignore;
    };
    match value.get("type").and_then(|v| v.as_str()).unwrap_or("") {
        "content_block_delta" => {
            let delta = &value["delta"];
            if delta.get("type").and_then(|v| v.as_str()) == Some("text_delta") {
                if let Some(text) = delta.get("text").and_then(|v| v.as_str()) {
                    return StreamEvent::Text(text.to_string());
                }
            }
            StreamEvent::Ignore
        }
        "error" => StreamEvent::Error(
            value["error"]["message"]
                .as_str()
                .unwrap_or("stream error")
                .to_string(),
        ),
        _ => StreamEvent::Ignore,
    }
}

/// Chat client for the coaching assistant
#[derive(Clone)]
pub struct CoachClient {
    http_client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl std::fmt::Debug for CoachClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CoachClient")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

impl CoachClient {
    pub fn new(api_key: &str, base_url: &str, model: &str) -> Self {
        Self {
            http_client: Client::new(),
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    /// Create from environment; `None` when no API key is set
    pub fn from_env() -> Option<Self> {
        let api_key = std::env::var("ANTHROPIC_API_KEY")
            .ok()
            .filter(|k| !k.trim().is_empty())?;
        let base_url =
            std::env::var("ANTHROPIC_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let model = std::env::var("ANTHROPIC_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());
        Some(Self::new(&api_key, &base_url, &model))
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn request(&self, system: &str, history: &[models::Message], text: &str, stream: bool) -> MessagesRequest {
        MessagesRequest {
            model: self.model.clone(),
            max_tokens: MAX_TOKENS,
            messages: build_transcript(history, text),
            system: Some(system.to_string()),
            stream,
        }
    }

    async fn post(&self, request: &MessagesRequest) -> Result<reqwest::Response> {
        debug!(
            model = %self.model,
            turns = request.messages.len(),
            stream = request.stream,
            "Sending coaching request"
        );

        let response = self
            .http_client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(request)
            .send()
            .await
            .map_err(|e| classify_failure(None, &e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            warn!(%status, "Anthropic API error");
            return Err(classify_failure(Some(status), &body));
        }

        Ok(response)
    }

    /// One complete reply for `text`, given the prior turns
    pub async fn send_message(
        &self,
        system: &str,
        history: &[models::Message],
        text: &str,
    ) -> Result<String> {
        let request = self.request(system, history, text, false);
        let response = self.post(&request).await?;

        let parsed: MessagesResponse = response
            .json()
            .await
            .map_err(|e| classify_failure(None, &e.to_string()))?;

        debug!(stop_reason = ?parsed.stop_reason, "Received coaching reply");

        Ok(parsed.text().unwrap_or(EMPTY_REPLY).to_string())
    }

    /// Same as [`send_message`](Self::send_message), delivering text chunks
    /// to `on_chunk` as they arrive. Returns the concatenated reply.
    pub async fn stream_message<F>(
        &self,
        system: &str,
        history: &[models::Message],
        text: &str,
        mut on_chunk: F,
    ) -> Result<String>
    where
        F: FnMut(&str),
    {
        let request = self.request(system, history, text, true);
        let response = self.post(&request).await?;

        let mut full = String::new();
        // Raw bytes; an event is decoded only once its terminator has arrived
        let mut buffer: Vec<u8> = Vec::new();
        let mut stream = response.bytes_stream();

        while let Some(item) = stream.next().await {
            let bytes = item.map_err(|e| classify_failure(None, &e.to_string()))?;
            buffer.extend_from_slice(&bytes);

            while let Some(idx) = find_event_end(&buffer) {
                let raw: Vec<u8> = buffer.drain(..idx + 2).collect();
                let event = std::str::from_utf8(&raw)
                    .map_err(|e| classify_failure(None, &format!("invalid UTF-8 in stream: {}", e)))?;

                for line in event.lines() {
                    let Some(data) = line.strip_prefix("data: ") else {
                        continue;
                    };
                    match parse_stream_event(data) {
                        StreamEvent::Text(chunk) => {
                            on_chunk(&chunk);
                            full.push_str(&chunk);
                        }
                        StreamEvent::Error(message) => {
                            return Err(classify_failure(None, &message));
                        }
                        StreamEvent::Ignore => {}
                    }
                }
            }
        }

        debug!(chars = full.len(), "Coaching stream finished");
        Ok(full)
    }
}

/// Offset of the first `\n\n` event terminator in `buffer`
fn find_event_end(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|w| w == b"\n\n")
}
