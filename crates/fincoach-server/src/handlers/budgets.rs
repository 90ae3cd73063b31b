//! Budget handlers

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use tracing::info;

use super::today;
use crate::{AppError, AppState, SuccessResponse};
use fincoach_core::db::WriteOutcome;
use fincoach_core::models::{Budget, BudgetProgress, BudgetSummary, BudgetUpdate, NewBudget};

/// GET /api/budgets
pub async fn list_budgets(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Budget>>, AppError> {
    Ok(Json(state.db.list_budgets()?))
}

/// POST /api/budgets - One budget per category; a second one is a 409
pub async fn create_budget(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewBudget>,
) -> Result<(StatusCode, Json<Budget>), AppError> {
    let created = state.db.create_budget(&body)?;
    info!(id = created.id, category = %created.category, "Budget created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/budgets/:id
pub async fn get_budget(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Budget>, AppError> {
    state
        .db
        .get_budget(id)?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Budget not found"))
}

/// PUT /api/budgets/:id
pub async fn update_budget(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<BudgetUpdate>,
) -> Result<Json<Budget>, AppError> {
    match state.db.update_budget(id, &body)? {
        WriteOutcome::Applied(budget) => Ok(Json(budget)),
        WriteOutcome::NotFound => Err(AppError::not_found("Budget not found")),
    }
}

/// DELETE /api/budgets/:id
pub async fn delete_budget(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    match state.db.delete_budget(id)? {
        WriteOutcome::Applied(()) => Ok(Json(SuccessResponse { success: true })),
        WriteOutcome::NotFound => Err(AppError::not_found("Budget not found")),
    }
}

/// GET /api/budgets/progress - This month's progress for every budget
pub async fn budget_progress(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<BudgetProgress>>, AppError> {
    Ok(Json(state.db.all_budget_progress(today())?))
}

/// GET /api/budgets/summary
pub async fn budget_summary(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BudgetSummary>, AppError> {
    Ok(Json(state.db.budget_summary(today())?))
}

/// GET /api/budgets/alerts - Budgets in warning or over
pub async fn budget_alerts(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<BudgetProgress>>, AppError> {
    Ok(Json(state.db.budget_alerts(today())?))
}
