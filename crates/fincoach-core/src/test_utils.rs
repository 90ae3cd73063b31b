//! Test utilities for fincoach-core
//!
//! Mock Plaid and Anthropic servers bound to an ephemeral local port. Both
//! record every request body so tests can assert on what was sent.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::{
    body::Body,
    extract::{Json, State},
    http::{header, HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    routing::post,
    Router,
};
use serde_json::{json, Value};
use tokio::sync::oneshot;

type RequestLog<T> = Arc<Mutex<Vec<T>>>;

async fn serve(app: Router) -> (SocketAddr, oneshot::Sender<()>) {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async {
                shutdown_rx.await.ok();
            })
            .await
            .unwrap();
    });

    (addr, shutdown_tx)
}

// ========== Plaid ==========

/// Mock Plaid API with one sandbox item
pub struct MockPlaidServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    requests: RequestLog<(String, Value)>,
}

impl MockPlaidServer {
    pub const LINK_TOKEN: &'static str = "link-sandbox-0001";
    pub const PUBLIC_TOKEN: &'static str = "public-sandbox-0001";
    pub const ACCESS_TOKEN: &'static str = "access-sandbox-0001";
    pub const ITEM_ID: &'static str = "item-sandbox-0001";

    /// Start the mock server on an available port
    pub async fn start() -> Self {
        let requests: RequestLog<(String, Value)> = Arc::default();

        let app = Router::new()
            .route("/link/token/create", post(handle_plaid))
            .route("/item/public_token/exchange", post(handle_plaid))
            .route("/accounts/get", post(handle_plaid))
            .route("/transactions/get", post(handle_plaid))
            .route("/transactions/sync", post(handle_plaid))
            .route("/item/remove", post(handle_plaid))
            .with_state(requests.clone());

        let (addr, shutdown_tx) = serve(app).await;
        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
            requests,
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Every request received so far as (path, JSON body)
    pub fn requests(&self) -> Vec<(String, Value)> {
        self.requests.lock().unwrap().clone()
    }

    /// Transactions reported for the sandbox item
    pub fn transactions() -> Value {
        json!([
            {
                "transaction_id": "plaid-tx-coffee",
                "account_id": "acc-checking",
                "amount": 4.75,
                "date": "2026-10-14",
                "name": "SQ *BLUE BOTTLE COFFEE",
                "merchant_name": "Blue Bottle Coffee",
                "category": ["Food and Drink", "Restaurants", "Coffee Shop"],
                "pending": false
            },
            {
                "transaction_id": "plaid-tx-payroll",
                "account_id": "acc-checking",
                "amount": -2400.0,
                "date": "2026-10-01",
                "name": "ACME CORP PAYROLL",
                "merchant_name": null,
                "category": ["Transfer", "Payroll"],
                "pending": false
            },
            {
                "transaction_id": "plaid-tx-uber",
                "account_id": "acc-credit",
                "amount": 18.20,
                "date": "2026-10-15",
                "name": "UBER TRIP",
                "merchant_name": "Uber",
                "category": ["Travel", "Taxi"],
                "pending": true
            },
            {
                "transaction_id": "plaid-tx-grocer",
                "account_id": "acc-credit",
                "amount": 82.10,
                "date": "2026-10-12",
                "name": "TRADER JOE'S #123",
                "merchant_name": "Trader Joe's",
                "category": ["Shops", "Supermarkets and Groceries"],
                "pending": false
            }
        ])
    }

    fn accounts() -> Value {
        json!([
            {
                "account_id": "acc-checking",
                "name": "Plaid Checking",
                "official_name": "Plaid Gold Standard 0% Interest Checking",
                "type": "depository",
                "subtype": "checking",
                "mask": "0000",
                "balances": { "available": 100.0, "current": 110.0, "limit": null }
            },
            {
                "account_id": "acc-credit",
                "name": "Plaid Credit Card",
                "official_name": null,
                "type": "credit",
                "subtype": "credit card",
                "mask": "3333",
                "balances": { "available": null, "current": 410.0, "limit": 2000.0 }
            }
        ])
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockPlaidServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn plaid_error(code: &str, message: &str) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(json!({
            "error_type": "INVALID_INPUT",
            "error_code": code,
            "error_message": message,
        })),
    )
        .into_response()
}

async fn handle_plaid(
    State(requests): State<RequestLog<(String, Value)>>,
    uri: Uri,
    Json(body): Json<Value>,
) -> Response {
    let path = uri.path().to_string();
    requests.lock().unwrap().push((path.clone(), body.clone()));

    if path == "/link/token/create" {
        return Json(json!({
            "link_token": MockPlaidServer::LINK_TOKEN,
            "expiration": "2026-10-16T04:00:00Z",
        }))
        .into_response();
    }

    if path == "/item/public_token/exchange" {
        if body["public_token"] != MockPlaidServer::PUBLIC_TOKEN {
            return plaid_error("INVALID_PUBLIC_TOKEN", "provided public token is in an invalid format");
        }
        return Json(json!({
            "access_token": MockPlaidServer::ACCESS_TOKEN,
            "item_id": MockPlaidServer::ITEM_ID,
        }))
        .into_response();
    }

    if body["access_token"] != MockPlaidServer::ACCESS_TOKEN {
        return plaid_error(
            "INVALID_ACCESS_TOKEN",
            "provided access token is in an invalid format",
        );
    }

    let transactions = MockPlaidServer::transactions();
    match path.as_str() {
        "/accounts/get" => Json(json!({ "accounts": MockPlaidServer::accounts() })).into_response(),
        "/transactions/get" => {
            let total = transactions.as_array().map(|a| a.len()).unwrap_or(0);
            Json(json!({
                "transactions": transactions,
                "accounts": MockPlaidServer::accounts(),
                "total_transactions": total,
            }))
            .into_response()
        }
        "/transactions/sync" => Json(json!({
            "added": transactions,
            "modified": [],
            "removed": [{ "transaction_id": "plaid-tx-old" }],
            "next_cursor": "cursor-0002",
            "has_more": false,
        }))
        .into_response(),
        "/item/remove" => Json(json!({ "request_id": "req-remove" })).into_response(),
        _ => StatusCode::NOT_FOUND.into_response(),
    }
}

// ========== Anthropic ==========

/// Mock Anthropic Messages API. Replies with a fixed text, streamed word by
/// word when the request asks for a stream.
pub struct MockAnthropicServer {
    addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    state: AnthropicState,
}

#[derive(Clone)]
struct AnthropicState {
    requests: RequestLog<Value>,
    reply: &'static str,
    /// Streamed bodies are written in pieces of this many bytes
    chunk_size: Option<usize>,
}

impl MockAnthropicServer {
    /// Requests carrying this key get a 401
    pub const REJECTED_KEY: &'static str = "sk-ant-rejected";
    /// Requests carrying this key get a 429
    pub const THROTTLED_KEY: &'static str = "sk-ant-throttled";

    const REPLY: &'static str =
        "You're doing well this month! Dining is at 15% of your budget, so there's room to spare.";

    const MULTIBYTE_REPLY: &'static str = "Nice 😀 café spending is down 12 €, keep going 💪";

    /// Start the mock server on an available port
    pub async fn start() -> Self {
        Self::start_with(Self::REPLY, None).await
    }

    /// Start a server whose reply carries multi-byte characters and whose
    /// streamed body is written `chunk_size` bytes at a time, so events and
    /// characters are cut at arbitrary offsets
    pub async fn start_fragmented(chunk_size: usize) -> Self {
        Self::start_with(Self::MULTIBYTE_REPLY, Some(chunk_size.max(1))).await
    }

    async fn start_with(reply: &'static str, chunk_size: Option<usize>) -> Self {
        let state = AnthropicState {
            requests: Arc::default(),
            reply,
            chunk_size,
        };

        let app = Router::new()
            .route("/v1/messages", post(handle_messages))
            .with_state(state.clone());

        let (addr, shutdown_tx) = serve(app).await;
        Self {
            addr,
            shutdown_tx: Some(shutdown_tx),
            state,
        }
    }

    /// Get the base URL for this mock server
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// The text every successful request receives
    pub fn reply(&self) -> &'static str {
        self.state.reply
    }

    /// Every request body received so far
    pub fn requests(&self) -> Vec<Value> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Stop the mock server
    pub fn stop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

impl Drop for MockAnthropicServer {
    fn drop(&mut self) {
        self.stop();
    }
}

fn sse_event(event: &str, data: Value) -> String {
    format!("event: {}\ndata: {}\n\n", event, data)
}

async fn handle_messages(
    State(state): State<AnthropicState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.requests.lock().unwrap().push(body.clone());

    let api_key = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if api_key == MockAnthropicServer::REJECTED_KEY {
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "type": "error",
                "error": { "type": "authentication_error", "message": "invalid x-api-key" }
            })),
        )
            .into_response();
    }
    if api_key == MockAnthropicServer::THROTTLED_KEY {
        return (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "type": "error",
                "error": { "type": "rate_limit_error", "message": "Number of requests has exceeded your rate limit" }
            })),
        )
            .into_response();
    }

    if body["stream"] == true {
        let mut stream = sse_event(
            "message_start",
            json!({"type": "message_start", "message": {"id": "msg_mock", "role": "assistant"}}),
        );
        stream.push_str(&sse_event(
            "content_block_start",
            json!({"type": "content_block_start", "index": 0, "content_block": {"type": "text", "text": ""}}),
        ));
        for piece in state.reply.split_inclusive(' ') {
            stream.push_str(&sse_event(
                "content_block_delta",
                json!({"type": "content_block_delta", "index": 0, "delta": {"type": "text_delta", "text": piece}}),
            ));
        }
        stream.push_str(&sse_event(
            "content_block_stop",
            json!({"type": "content_block_stop", "index": 0}),
        ));
        stream.push_str(&sse_event("message_stop", json!({"type": "message_stop"})));

        let body = match state.chunk_size {
            Some(size) => {
                let pieces: Vec<Result<Vec<u8>, std::convert::Infallible>> = stream
                    .as_bytes()
                    .chunks(size)
                    .map(|c| Ok(c.to_vec()))
                    .collect();
                Body::from_stream(futures_util::stream::iter(pieces))
            }
            None => Body::from(stream),
        };
        return ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response();
    }

    Json(json!({
        "id": "msg_mock",
        "type": "message",
        "role": "assistant",
        "model": body["model"],
        "content": [{ "type": "text", "text": state.reply }],
        "stop_reason": "end_turn",
        "stop_sequence": null,
        "usage": { "input_tokens": 512, "output_tokens": 24 }
    }))
    .into_response()
}
