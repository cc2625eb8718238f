//! Analytics Handlers

use axum::Json;
use axum::extract::{Query, State};
use serde::Deserialize;
use shared::models::SalesSummary;

use crate::core::ServerState;
use crate::utils::{AppError, AppResult, time};

/// Inclusive business-date range, `YYYY-MM-DD`
#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub start: String,
    pub end: String,
}

/// GET /api/analytics/summary?start=&end= - sales totals over a date range
pub async fn summary(
    State(state): State<ServerState>,
    Query(query): Query<SummaryQuery>,
) -> AppResult<Json<SalesSummary>> {
    let start_date = time::parse_date(&query.start)?;
    let end_date = time::parse_date(&query.end)?;
    if end_date < start_date {
        return Err(AppError::validation("end must not precede start"));
    }

    let tz = state.config.timezone;
    let start = time::day_start_millis(start_date, tz);
    let end = time::day_end_millis(end_date, tz);

    let summary = state.bills.summary(start, end).await?;
    Ok(Json(summary))
}
