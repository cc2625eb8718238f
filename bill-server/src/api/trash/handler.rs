//! Trash Handlers

use axum::Json;
use axum::extract::{Path, State};
use shared::models::{Bill, TrashedBill};

use crate::core::ServerState;
use crate::utils::AppResult;

/// GET /api/trash - list trashed bills
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<TrashedBill>>> {
    let trashed = state.trash.find_all().await?;
    Ok(Json(trashed))
}

/// POST /api/trash/{id}/restore - move a trashed bill back to the active set
pub async fn restore(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<Bill>> {
    let bill = state.manager.restore(&id).await?;
    Ok(Json(bill))
}

/// DELETE /api/trash/{id} - permanently delete a trashed bill
pub async fn purge(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<bool>> {
    state.manager.purge(&id).await?;
    Ok(Json(true))
}
