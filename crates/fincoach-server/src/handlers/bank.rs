//! Bank sync handlers: import linked-item transactions into the local store

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};

use crate::{AppError, AppState};
use fincoach_core::bank::{self, SyncResult, SyncSummary};

/// POST /api/bank/sync/:item_id - Import one item's recent transactions
pub async fn sync_institution(
    State(state): State<Arc<AppState>>,
    Path(item_id): Path<String>,
) -> Result<Json<SyncResult>, AppError> {
    let proxy = state.bank()?;
    let result = bank::sync_institution(&state.db, proxy, &item_id).await?;
    Ok(Json(result))
}

/// POST /api/bank/sync - Import every linked item; per-item failures are reported
pub async fn sync_all_institutions(
    State(state): State<Arc<AppState>>,
) -> Result<Json<SyncSummary>, AppError> {
    let proxy = state.bank()?;
    let summary = bank::sync_all(&state.db, proxy).await?;
    Ok(Json(summary))
}
