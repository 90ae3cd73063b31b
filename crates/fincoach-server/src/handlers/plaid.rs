//! Bank aggregator proxy handlers
//!
//! Paths and payloads match what browser clients of the proxy expect. Access
//! tokens stay on the server; clients only ever see item ids.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    Json,
};
use tracing::error;

use crate::{AppError, AppState};
use fincoach_core::bank::BankDataSource;
use fincoach_core::plaid::{
    AccountsResponse, ExchangeTokenRequest, ExchangeTokenResponse, InstitutionsResponse,
    LinkTokenResponse, RemoveItemResponse, SyncRequest, SyncResponse, TransactionsQuery,
    TransactionsResponse,
};
use fincoach_core::Error;

/// Translate a proxy failure; aggregator details are logged, not returned
fn proxy_error(err: Error, failure: &str) -> AppError {
    match err {
        Error::UnknownItem(_) => AppError::not_found("Item not found"),
        Error::AggregatorNotConfigured => AppError::service_unavailable(&err.to_string()),
        other => {
            error!(error = %other, "{}", failure);
            AppError::internal(failure)
        }
    }
}

/// POST /api/plaid/create-link-token
pub async fn create_link_token(
    State(state): State<Arc<AppState>>,
) -> Result<Json<LinkTokenResponse>, AppError> {
    let proxy = state.bank()?;
    let created = proxy
        .create_link_token()
        .await
        .map_err(|e| proxy_error(e, "Failed to create link token"))?;
    Ok(Json(created))
}

/// POST /api/plaid/exchange-token - Store the item; return its id only
pub async fn exchange_token(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ExchangeTokenRequest>,
) -> Result<Json<ExchangeTokenResponse>, AppError> {
    let proxy = state.bank()?;
    let exchanged = proxy
        .exchange_token(&body.public_token, body.institution)
        .await
        .map_err(|e| proxy_error(e, "Failed to exchange token"))?;
    Ok(Json(exchanged))
}

/// GET /api/plaid/accounts/:item_id
pub async fn get_accounts(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<String>,
) -> Result<Json<AccountsResponse>, AppError> {
    let proxy = state.bank()?;
    let accounts = proxy
        .accounts(&item_id)
        .await
        .map_err(|e| proxy_error(e, "Failed to get accounts"))?;
    Ok(Json(accounts))
}

/// GET /api/plaid/transactions/:item_id?startDate=&endDate=
pub async fn get_plaid_transactions(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<String>,
    Query(params): Query<TransactionsQuery>,
) -> Result<Json<TransactionsResponse>, AppError> {
    let proxy = state.bank()?;
    let transactions = proxy
        .transactions(&item_id, params.start_date, params.end_date)
        .await
        .map_err(|e| proxy_error(e, "Failed to get transactions"))?;
    Ok(Json(transactions))
}

/// POST /api/plaid/transactions/sync/:item_id - Body `{ "cursor": .. }` is optional
pub async fn sync_plaid_transactions(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<String>,
    body: Option<Json<SyncRequest>>,
) -> Result<Json<SyncResponse>, AppError> {
    let proxy = state.bank()?;
    let cursor = body.and_then(|Json(b)| b.cursor);
    let page = proxy
        .sync(&item_id, cursor.as_deref())
        .await
        .map_err(|e| proxy_error(e, "Failed to sync transactions"))?;
    Ok(Json(page))
}

/// GET /api/plaid/institutions
pub async fn list_institutions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<InstitutionsResponse>, AppError> {
    let proxy = state.bank()?;
    let institutions = proxy
        .institutions()
        .await
        .map_err(|e| proxy_error(e, "Failed to list institutions"))?;
    Ok(Json(InstitutionsResponse { institutions }))
}

/// DELETE /api/plaid/item/:item_id
pub async fn remove_item(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<String>,
) -> Result<Json<RemoveItemResponse>, AppError> {
    let proxy = state.bank()?;
    proxy
        .remove_item(&item_id)
        .await
        .map_err(|e| proxy_error(e, "Failed to remove item"))?;
    Ok(Json(RemoveItemResponse { success: true }))
}
