//! Savings goal handlers

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use tracing::info;

use super::today;
use crate::{AppError, AppState, SuccessResponse};
use fincoach_core::db::WriteOutcome;
use fincoach_core::models::{Goal, GoalProgress, GoalStatus, GoalUpdate, GoalsSummary, NewGoal};

#[derive(Debug, Deserialize)]
pub struct GoalQuery {
    pub status: Option<GoalStatus>,
}

#[derive(Debug, Deserialize)]
pub struct ContributeRequest {
    pub amount: f64,
}

/// GET /api/goals - All goals, or those with `?status=`
pub async fn list_goals(
    State(state): State<Arc<AppState>>,
    Query(params): Query<GoalQuery>,
) -> Result<Json<Vec<Goal>>, AppError> {
    let goals = match params.status {
        Some(status) => state.db.goals_by_status(status)?,
        None => state.db.list_goals()?,
    };
    Ok(Json(goals))
}

/// POST /api/goals
pub async fn create_goal(
    State(state): State<Arc<AppState>>,
    Json(body): Json<NewGoal>,
) -> Result<(StatusCode, Json<Goal>), AppError> {
    let created = state.db.create_goal(&body)?;
    info!(id = created.id, name = %created.name, "Goal created");
    Ok((StatusCode::CREATED, Json(created)))
}

/// GET /api/goals/:id
pub async fn get_goal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<Goal>, AppError> {
    state
        .db
        .get_goal(id)?
        .map(Json)
        .ok_or_else(|| AppError::not_found("Goal not found"))
}

/// PUT /api/goals/:id
pub async fn update_goal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<GoalUpdate>,
) -> Result<Json<Goal>, AppError> {
    match state.db.update_goal(id, &body)? {
        WriteOutcome::Applied(goal) => Ok(Json(goal)),
        WriteOutcome::NotFound => Err(AppError::not_found("Goal not found")),
    }
}

/// DELETE /api/goals/:id
pub async fn delete_goal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
) -> Result<Json<SuccessResponse>, AppError> {
    match state.db.delete_goal(id)? {
        WriteOutcome::Applied(()) => Ok(Json(SuccessResponse { success: true })),
        WriteOutcome::NotFound => Err(AppError::not_found("Goal not found")),
    }
}

/// POST /api/goals/:id/contribute - Add to the saved amount
pub async fn contribute_to_goal(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i64>,
    Json(body): Json<ContributeRequest>,
) -> Result<Json<Goal>, AppError> {
    match state.db.contribute_to_goal(id, body.amount)? {
        WriteOutcome::Applied(goal) => {
            info!(id, amount = body.amount, status = %goal.status, "Goal contribution");
            Ok(Json(goal))
        }
        WriteOutcome::NotFound => Err(AppError::not_found("Goal not found")),
    }
}

/// GET /api/goals/progress - Pacing for active goals
pub async fn goal_progress(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<GoalProgress>>, AppError> {
    Ok(Json(state.db.all_goal_progress(today())?))
}

/// GET /api/goals/summary
pub async fn goals_summary(
    State(state): State<Arc<AppState>>,
) -> Result<Json<GoalsSummary>, AppError> {
    Ok(Json(state.db.goals_summary()?))
}
