//! Transaction handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;

use super::{today, RangeQuery};
use crate::{AppError, AppState, SuccessResponse, MAX_PAGE_LIMIT};
use fincoach_core::analytics::{with_percentages, CategoryBreakdown};
use fincoach_core::db::{TransactionFilter, WriteOutcome};
use fincoach_core::models::{
    NewTransaction, Transaction, TransactionStats, TransactionType, TransactionUpdate,
};

/// Query parameters for listing transactions
#[derive(Debug, Default, Deserialize)]
pub struct TransactionQuery {
    /// Inclusive start date (YYYY-MM-DD)
    pub start_date: Option<NaiveDate>,
    /// Inclusive end date (YYYY-MM-DD)
    pub end_date: Option<NaiveDate>,
    /// Category ids (comma-separated)
    pub category: Option<String>,
    /// `expense` or `income`
    #[serde(rename = "type")]
    pub transaction_type: Option<TransactionType>,
    /// Merchant substrings (comma-separated), any may match
    pub merchant: Option<String>,
    pub min_amount: Option<f64>,
    pub max_amount: Option<f64>,
    /// Free-text search
    pub search: Option<String>,
    pub limit: Option<i64>,
}

impl TransactionQuery {
    pub fn to_filter(&self) -> TransactionFilter {
        let mut filter = TransactionFilter::new()
            .start_date(self.start_date)
            .end_date(self.end_date)
            .amount_range(self.min_amount, self.max_amount)
            .search(self.search.as_deref());

        for category in split_list(self.category.as_deref()) {
            filter = filter.category(category);
        }
        for merchant in split_list(self.merchant.as_deref()) {
            filter = filter.merchant(merchant);
        }
        if let Some(t) = self.transaction_type {
            filter = filter.transaction_type(t);
        }
        if let Some(limit) = self.limit {
            // Input validation: clamp the page size
            filter = filter.limit(limit.clamp(1, MAX_PAGE_LIMIT));
        }
        filter
    }
}

fn split_list(value: Option<&str>) -> impl Iterator<Item = &str> {
    value
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// GET /api/transactions - List transactions, newest first
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TransactionQuery>,
) -> Result<Json<Vec<Transaction>>, AppError> {
    let transactions = state.db.list_transactions(&params.to_filter())?;
    Ok(Json(transactions))
}

/// POST /api/transactions - Record a transaction
pub async fn create_transaction(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewTransaction>,
) -> Result<(StatusCode, Json<Transaction>), AppError> {
    let created = state.db.create_transaction(&body)?;
    info!(id = created.id, amount = created.amount, "Transaction created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/transactions/:id
pub async fn get_transaction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Transaction>, AppError> {
    state
        .db
        .get_transaction(id)?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Transaction not found"))
}

/// PUT /api/transactions/:id - Partial update
pub async fn update_transaction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<TransactionUpdate>,
) -> Result<Json<Transaction>, AppError> {
    match state.db.update_transaction(id, &body)? {
        WriteOutcome::Applied(tx) => Ok(Json(tx)),
        WriteOutcome::NotFound => Err(AppError::not_found("Transaction not found")),
    }
}

/// DELETE /api/transactions/:id
pub async fn delete_transaction(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    match state.db.delete_transaction(id)? {
        WriteOutcome::Applied(()) => Ok(Json(SuccessResponse { success: true })),
        WriteOutcome::NotFound => Err(AppError::not_found("Transaction not found")),
    }
}

/// GET /api/transactions/stats - Totals, current month unless bounded
pub async fn transaction_stats(
    State(state): State<Arc<AppState>>,
    Query(range): Query<RangeQuery>,
) -> Result<Json<TransactionStats>, AppError> {
    let stats = state.db.transaction_stats(range.or_month_of(today()))?;
    Ok(Json(stats))
}

/// GET /api/transactions/by-category - Expense rollup with share of total
pub async fn spending_by_category(
    State(state): State<Arc<AppState>>,
    Query(range): Query<RangeQuery>,
) -> Result<Json<Vec<CategoryBreakdown>>, AppError> {
    let spending = state.db.spending_by_category(range.or_month_of(today()))?;
    Ok(Json(with_percentages(spending)))
}

/// GET /api/transactions/merchants - Distinct merchant names
pub async fn list_merchants(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<String>>, AppError> {
    Ok(Json(state.db.merchants()?))
}
