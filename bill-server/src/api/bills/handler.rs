//! Bill Handlers

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::{Deserialize, Serialize};
use shared::models::{Bill, BillCreate, BillUpdate, TrashedBill};

use crate::billing::share::SharePayload;
use crate::core::ServerState;
use crate::utils::{AppError, AppResult, time};

/// Optional business-date range; both bounds or neither
#[derive(Debug, Deserialize)]
pub struct RangeQuery {
    pub start: Option<String>,
    pub end: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct MigrateResponse {
    pub migrated: usize,
}

/// GET /api/bills - list bills, optionally filtered by business-date range
pub async fn list(
    State(state): State<ServerState>,
    Query(range): Query<RangeQuery>,
) -> AppResult<Json<Vec<Bill>>> {
    let bills = match (range.start, range.end) {
        (Some(start), Some(end)) => {
            let tz = state.config.timezone;
            let start = time::day_start_millis(time::parse_date(&start)?, tz);
            let end = time::day_end_millis(time::parse_date(&end)?, tz);
            state.bills.find_in_range(start, end).await?
        }
        (None, None) => state.bills.find_all().await?,
        _ => {
            return Err(AppError::validation(
                "start and end must be given together",
            ));
        }
    };
    Ok(Json(bills))
}

/// POST /api/bills - allocate a number and hash and persist a new bill
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<BillCreate>,
) -> AppResult<Json<Bill>> {
    let bill = state.manager.create(payload).await?;
    Ok(Json(bill))
}

/// GET /api/bills/{id} - fetch one bill
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<Bill>> {
    let bill = state
        .bills
        .find_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found("Bill not found"))?;
    Ok(Json(bill))
}

/// PUT /api/bills/{id} - replace the mutable fields of a bill
pub async fn update(
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<BillUpdate>,
) -> AppResult<Json<Bill>> {
    let bill = state.manager.update(&id, payload).await?;
    Ok(Json(bill))
}

/// DELETE /api/bills/{id} - move a bill to the trash
pub async fn trash(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<TrashedBill>> {
    let trashed = state.manager.trash(&id).await?;
    Ok(Json(trashed))
}

/// GET /api/bills/{id}/share - share message and links for a bill
pub async fn share(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<SharePayload>> {
    let payload = state.manager.share_payload(&id).await?;
    Ok(Json(payload))
}

/// POST /api/bills/migrate - backfill lookup hashes onto legacy bills
pub async fn migrate(State(state): State<ServerState>) -> AppResult<Json<MigrateResponse>> {
    let migrated = state.manager.migrate_legacy().await?;
    tracing::info!(migrated, "Legacy bill migration finished");
    Ok(Json(MigrateResponse { migrated }))
}
