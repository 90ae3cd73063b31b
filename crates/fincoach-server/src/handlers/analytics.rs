//! Analytics and dashboard handlers

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    Json,
};
use serde::Deserialize;

use super::{today, RangeQuery};
use crate::{AppError, AppState};
use fincoach_core::analytics::{
    self, DailySpending, DashboardData, DayOfWeekSpending, MerchantSpending, MonthlyComparison,
};

/// Longest monthly comparison served
const MAX_MONTHS: u32 = 36;

#[derive(Debug, Deserialize)]
pub struct MonthlyQuery {
    #[serde(default = "default_months")]
    pub months: u32,
}

fn default_months() -> u32 {
    6
}

#[derive(Debug, Deserialize)]
pub struct TopMerchantsQuery {
    #[serde(default = "default_merchant_limit")]
    pub limit: usize,
    pub start_date: Option<chrono::NaiveDate>,
    pub end_date: Option<chrono::NaiveDate>,
}

fn default_merchant_limit() -> usize {
    10
}

/// GET /api/analytics/dashboard
pub async fn get_dashboard(
    State(state): State<Arc<AppState>>,
) -> Result<Json<DashboardData>, AppError> {
    Ok(Json(analytics::dashboard(&state.db, today()).await?))
}

/// GET /api/analytics/daily - Zero-filled daily expense series.
///
/// Without bounds: the current month through today.
pub async fn get_daily_spending(
    State(state): State<Arc<AppState>>,
    Query(range): Query<RangeQuery>,
) -> Result<Json<Vec<DailySpending>>, AppError> {
    let today = today();
    let series = match (range.start_date, range.end_date) {
        (None, None) => analytics::current_month_daily_spending(&state.db, today)?,
        _ => {
            let range = range.or_month_of(today);
            if range.start > range.end {
                return Err(AppError::bad_request("start_date must not be after end_date"));
            }
            analytics::daily_spending(&state.db, range)?
        }
    };
    Ok(Json(series))
}

/// GET /api/analytics/monthly?months=6
pub async fn get_monthly_comparison(
    State(state): State<Arc<AppState>>,
    Query(params): Query<MonthlyQuery>,
) -> Result<Json<Vec<MonthlyComparison>>, AppError> {
    let months = params.months.clamp(1, MAX_MONTHS);
    Ok(Json(analytics::monthly_comparison(
        &state.db, months, today(),
    )?))
}

/// GET /api/analytics/day-of-week
pub async fn get_day_of_week(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<DayOfWeekSpending>>, AppError> {
    Ok(Json(analytics::spending_by_day_of_week(&state.db)?))
}

/// GET /api/analytics/top-merchants?limit=10
pub async fn get_top_merchants(
    State(state): State<Arc<AppState>>,
    Query(params): Query<TopMerchantsQuery>,
) -> Result<Json<Vec<MerchantSpending>>, AppError> {
    let range = RangeQuery {
        start_date: params.start_date,
        end_date: params.end_date,
    };
    Ok(Json(analytics::top_merchants(
        &state.db,
        params.limit.max(1),
        range.explicit(),
    )?))
}
