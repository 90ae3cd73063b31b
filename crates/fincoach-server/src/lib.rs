//! FinCoach Web Server
//!
//! Axum-based REST API for the FinCoach personal finance tracker, plus the
//! bank aggregator proxy endpoints.
//!
//! - CRUD and analytics over the local store
//! - Coaching chat, plain and streamed (SSE)
//! - `/api/plaid/*` proxy holding access tokens server-side
//! - Sanitized error responses

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::{
    cors::CorsLayer, services::ServeDir, set_header::SetResponseHeaderLayer, trace::TraceLayer,
};
use tracing::{error, info, warn};

use fincoach_core::ai::Coach;
use fincoach_core::db::Database;
use fincoach_core::plaid::PlaidProxy;

mod handlers;

/// Maximum rows returned by a list endpoint
pub const MAX_PAGE_LIMIT: i64 = 1000;

/// Server configuration
#[derive(Clone, Default)]
pub struct ServerConfig {
    /// Directory of the built frontend, served as the fallback
    pub static_dir: Option<String>,
}

/// Shared application state
pub struct AppState {
    pub db: Database,
    /// `None` when Plaid credentials are not configured
    pub bank: Option<PlaidProxy>,
    /// `None` when no Anthropic API key is configured
    pub coach: Option<Coach>,
}

impl AppState {
    /// Build state with optional integrations read from the environment
    pub fn from_env(db: Database) -> Self {
        let bank = PlaidProxy::from_env(db.clone());
        let coach = Coach::from_env();
        Self { db, bank, coach }
    }

    pub(crate) fn bank(&self) -> Result<&PlaidProxy, AppError> {
        self.bank.as_ref().ok_or_else(|| {
            AppError::service_unavailable(&fincoach_core::Error::AggregatorNotConfigured.to_string())
        })
    }

    pub(crate) fn coach(&self) -> Result<&Coach, AppError> {
        self.coach.as_ref().ok_or_else(|| {
            AppError::service_unavailable(&fincoach_core::Error::AiNotConfigured.to_string())
        })
    }
}

/// Success response
#[derive(Serialize)]
pub struct SuccessResponse {
    pub success: bool,
}

/// Create the application router with integrations from the environment
pub fn create_router(db: Database, config: ServerConfig) -> Router {
    let state = AppState::from_env(db);

    match state.bank {
        Some(ref proxy) => info!("Bank aggregator configured: {}", proxy.client().base_url()),
        None => info!("ℹ️  Bank aggregator not configured (set PLAID_CLIENT_ID and PLAID_SECRET)"),
    }
    match state.coach {
        Some(ref coach) => info!("AI coach configured (model: {})", coach.client().model()),
        None => info!("ℹ️  AI coach not configured (set ANTHROPIC_API_KEY to enable chat)"),
    }

    create_router_with_state(state, config)
}

/// Create the application router around prepared state (for testing)
pub fn create_router_with_state(state: AppState, config: ServerConfig) -> Router {
    let state = Arc::new(state);

    let api_routes = Router::new()
        // Transactions
        .route(
            "/transactions",
            get(handlers::list_transactions).post(handlers::create_transaction),
        )
        .route("/transactions/stats", get(handlers::transaction_stats))
        .route("/transactions/by-category", get(handlers::spending_by_category))
        .route("/transactions/merchants", get(handlers::list_merchants))
        .route(
            "/transactions/:id",
            get(handlers::get_transaction)
                .put(handlers::update_transaction)
                .delete(handlers::delete_transaction),
        )
        // Budgets
        .route(
            "/budgets",
            get(handlers::list_budgets).post(handlers::create_budget),
        )
        .route("/budgets/progress", get(handlers::budget_progress))
        .route("/budgets/summary", get(handlers::budget_summary))
        .route("/budgets/alerts", get(handlers::budget_alerts))
        .route(
            "/budgets/:id",
            get(handlers::get_budget)
                .put(handlers::update_budget)
                .delete(handlers::delete_budget),
        )
        // Goals
        .route("/goals", get(handlers::list_goals).post(handlers::create_goal))
        .route("/goals/progress", get(handlers::goal_progress))
        .route("/goals/summary", get(handlers::goals_summary))
        .route(
            "/goals/:id",
            get(handlers::get_goal)
                .put(handlers::update_goal)
                .delete(handlers::delete_goal),
        )
        .route("/goals/:id/contribute", post(handlers::contribute_to_goal))
        // Analytics
        .route("/analytics/dashboard", get(handlers::get_dashboard))
        .route("/analytics/daily", get(handlers::get_daily_spending))
        .route("/analytics/monthly", get(handlers::get_monthly_comparison))
        .route("/analytics/day-of-week", get(handlers::get_day_of_week))
        .route("/analytics/top-merchants", get(handlers::get_top_merchants))
        // Coaching chat
        .route("/chat/status", get(handlers::chat_status))
        .route(
            "/conversations",
            get(handlers::list_conversations).post(handlers::create_conversation),
        )
        .route(
            "/conversations/:id",
            get(handlers::get_conversation).delete(handlers::delete_conversation),
        )
        .route("/conversations/:id/messages", post(handlers::send_message))
        .route("/conversations/:id/stream", post(handlers::stream_message))
        // Data management
        .route("/export", get(handlers::export_data))
        .route(
            "/export/transactions.csv",
            get(handlers::export_transactions_csv),
        )
        .route("/import", post(handlers::import_data))
        .route("/reset", post(handlers::reset_data))
        // Bank sync
        .route("/bank/sync", post(handlers::sync_all_institutions))
        .route("/bank/sync/:item_id", post(handlers::sync_institution))
        // Aggregator proxy
        .route("/plaid/create-link-token", post(handlers::create_link_token))
        .route("/plaid/exchange-token", post(handlers::exchange_token))
        .route("/plaid/accounts/:item_id", get(handlers::get_accounts))
        .route(
            "/plaid/transactions/:item_id",
            get(handlers::get_plaid_transactions),
        )
        .route(
            "/plaid/transactions/sync/:item_id",
            post(handlers::sync_plaid_transactions),
        )
        .route("/plaid/institutions", get(handlers::list_institutions))
        .route("/plaid/item/:item_id", delete(handlers::remove_item));

    let mut app = Router::new()
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        // Browser clients call from any origin
        .layer(CorsLayer::permissive())
        .layer(SetResponseHeaderLayer::overriding(
            header::X_CONTENT_TYPE_OPTIONS,
            HeaderValue::from_static("nosniff"),
        ));

    // Serve static files if directory provided
    if let Some(dir) = config.static_dir {
        app = app.fallback_service(ServeDir::new(dir));
    }

    app
}

/// Start the server
pub async fn serve(db: Database, host: &str, port: u16) -> anyhow::Result<()> {
    serve_with_config(db, host, port, ServerConfig::default()).await
}

/// Start the server with custom configuration
pub async fn serve_with_config(
    db: Database,
    host: &str,
    port: u16,
    config: ServerConfig,
) -> anyhow::Result<()> {
    if host != "127.0.0.1" && host != "localhost" {
        warn!("⚠️  No authentication - do not expose to an untrusted network!");
    }

    let app = create_router(db, config);
    let addr = format!("{}:{}", host, port);

    info!("Starting server at http://{}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============================================================================
// Error Handling
// ============================================================================

/// Application error type with proper HTTP status codes
#[derive(Debug)]
pub struct AppError {
    status: StatusCode,
    message: String,
    internal: Option<anyhow::Error>,
}

impl AppError {
    fn with_status(status: StatusCode, msg: &str) -> Self {
        Self {
            status,
            message: msg.to_string(),
            internal: None,
        }
    }

    pub fn bad_request(msg: &str) -> Self {
        Self::with_status(StatusCode::BAD_REQUEST, msg)
    }

    pub fn not_found(msg: &str) -> Self {
        Self::with_status(StatusCode::NOT_FOUND, msg)
    }

    pub fn internal(msg: &str) -> Self {
        Self::with_status(StatusCode::INTERNAL_SERVER_ERROR, msg)
    }

    pub fn conflict(msg: &str) -> Self {
        Self::with_status(StatusCode::CONFLICT, msg)
    }

    pub fn service_unavailable(msg: &str) -> Self {
        Self::with_status(StatusCode::SERVICE_UNAVAILABLE, msg)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Log the full internal error if present
        if let Some(err) = &self.internal {
            error!(error = %err, "Internal error");
        }

        let body = Json(serde_json::json!({
            "error": self.message
        }));

        (self.status, body).into_response()
    }
}

/// Map a domain error to its HTTP status and user-facing message
fn classify(err: &fincoach_core::Error) -> Option<(StatusCode, String)> {
    use fincoach_core::Error;

    let status = match err {
        Error::InvalidData(_) => StatusCode::BAD_REQUEST,
        Error::NotFound(_) => StatusCode::NOT_FOUND,
        Error::UnknownItem(_) => return Some((StatusCode::NOT_FOUND, "Item not found".into())),
        Error::DuplicateBudget(_) => StatusCode::CONFLICT,
        Error::AiNotConfigured | Error::AggregatorNotConfigured => StatusCode::SERVICE_UNAVAILABLE,
        Error::AiInvalidKey | Error::AiFailed(_) => StatusCode::BAD_GATEWAY,
        Error::AiRateLimited => StatusCode::TOO_MANY_REQUESTS,
        _ => return None,
    };
    Some((status, err.to_string()))
}

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        let err = err.into();

        if let Some((status, message)) = err.downcast_ref::<fincoach_core::Error>().and_then(classify)
        {
            return Self {
                status,
                message,
                internal: None,
            };
        }

        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            // Return generic message to client
            message: "An internal error occurred".to_string(),
            // Keep full error for logging
            internal: Some(err),
        }
    }
}
