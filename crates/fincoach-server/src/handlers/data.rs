//! Export, import and reset handlers

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, Response, StatusCode},
    Json,
};
use tracing::{info, warn};

use super::{today, TransactionQuery};
use crate::{AppError, AppState, SuccessResponse};
use fincoach_core::export::ImportStats;

fn attachment(content_type: &str, filename: &str, body: String) -> Result<Response<Body>, AppError> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, content_type)
        .header(
            header::CONTENT_DISPOSITION,
            format!("attachment; filename=\"{}\"", filename),
        )
        .body(Body::from(body))
        .map_err(|e| AppError::internal(&format!("Failed to build response: {}", e)))
}

/// GET /api/export - Full JSON snapshot as a download
pub async fn export_data(
    State(state): State<Arc<AppState>>,
) -> Result<Response<Body>, AppError> {
    let json = state.db.export_json()?;
    info!(bytes = json.len(), "Data exported");

    attachment(
        "application/json",
        &format!("fincoach-backup-{}.json", today()),
        json,
    )
}

/// GET /api/export/transactions.csv - Filtered transactions as CSV
pub async fn export_transactions_csv(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TransactionQuery>,
) -> Result<Response<Body>, AppError> {
    let csv = state.db.export_transactions_csv(&params.to_filter())?;

    attachment(
        "text/csv; charset=utf-8",
        &format!("fincoach-transactions-{}.csv", today()),
        csv,
    )
}

/// POST /api/import - Replace all data with an exported snapshot
pub async fn import_data(
    State(state): State<Arc<AppState>>,
    body: String,
) -> Result<Json<ImportStats>, AppError> {
    let stats = state.db.import_json(&body)?;
    Ok(Json(stats))
}

/// POST /api/reset - Delete all user data; linked bank items are kept
pub async fn reset_data(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SuccessResponse>, AppError> {
    state.db.clear_all()?;
    warn!("All user data cleared via API");
    Ok(Json(SuccessResponse { success: true }))
}
