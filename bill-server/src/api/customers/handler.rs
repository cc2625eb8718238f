//! Customer Handlers

use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;
use shared::models::{Bill, Customer, CustomerCreate};

use crate::core::ServerState;
use crate::utils::AppResult;
use crate::utils::validation::{MAX_NAME_LEN, validate_phone, validate_required_text};

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub q: String,
}

/// GET /api/customers - the full directory, ordered by name
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<Customer>>> {
    let customers = state.customers.find_all().await?;
    Ok(Json(customers))
}

/// POST /api/customers - create or update a customer keyed by phone
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<CustomerCreate>,
) -> AppResult<Json<Customer>> {
    validate_required_text(&payload.name, "name", MAX_NAME_LEN)?;
    validate_phone(&payload.phone, "phone")?;
    let customer = state
        .customers
        .upsert(Customer {
            name: payload.name.trim().to_string(),
            phone: payload.phone,
        })
        .await?;
    Ok(Json(customer))
}

/// GET /api/customers/search?q= - prefix search on name or phone
pub async fn search(
    State(state): State<ServerState>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<Vec<Customer>>> {
    let customers = state.customers.search(&query.q).await?;
    Ok(Json(customers))
}

/// GET /api/customers/{phone}/bills - bill history for one customer
pub async fn bills_for_customer(
    State(state): State<ServerState>,
    Path(phone): Path<String>,
) -> AppResult<Json<Vec<Bill>>> {
    let bills = state.bills.find_by_customer(&phone).await?;
    Ok(Json(bills))
}
