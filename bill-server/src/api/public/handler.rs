//! Public Lookup Handlers

use askama::Template;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Response};
use serde::Deserialize;

use crate::billing::resolver::{LookupKey, ResolvedBill, classify};
use crate::billing::viewer::{BillPage, ErrorPage};
use crate::core::ServerState;
use crate::utils::{AppError, AppResult};

/// Legacy link shape: `/b?id=...`
#[derive(Debug, Deserialize)]
pub struct LookupQuery {
    pub id: Option<String>,
}

/// GET /b/{identifier} - rendered bill page for a hash or legacy id
pub async fn view(State(state): State<ServerState>, Path(identifier): Path<String>) -> Response {
    let key = classify(None, Some(&identifier));
    render(&state, key).await
}

/// GET /b?id= - rendered bill page for the legacy query-string link shape
pub async fn view_query(
    State(state): State<ServerState>,
    Query(query): Query<LookupQuery>,
) -> Response {
    let key = classify(query.id.as_deref(), None);
    render(&state, key).await
}

/// GET /api/public/bills/{identifier} - the resolved bill as JSON
pub async fn get_bill(
    State(state): State<ServerState>,
    Path(identifier): Path<String>,
) -> AppResult<Json<ResolvedBill>> {
    let key = classify(None, Some(&identifier));
    let resolved = state.resolver.resolve(&key).await?;
    Ok(Json(resolved))
}

async fn render(state: &ServerState, key: LookupKey) -> Response {
    match state.resolver.resolve(&key).await {
        Ok(resolved) => {
            let page = BillPage::new(&resolved, state.config.timezone);
            match page.render() {
                Ok(html) => Html(html).into_response(),
                Err(e) => {
                    tracing::error!(error = %e, "Bill page render failed");
                    error_page(StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong")
                }
            }
        }
        Err(AppError::Validation(message)) => error_page(StatusCode::BAD_REQUEST, &message),
        Err(AppError::NotFound(message)) => error_page(StatusCode::NOT_FOUND, &message),
        Err(e) => {
            tracing::error!(error = %e, "Bill lookup failed");
            error_page(StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong")
        }
    }
}

fn error_page(status: StatusCode, message: &str) -> Response {
    match ErrorPage::new(message).render() {
        Ok(html) => (status, Html(html)).into_response(),
        Err(_) => (status, message.to_string()).into_response(),
    }
}
