//! Shop Handlers

use axum::Json;
use axum::extract::State;
use shared::models::{ShopDetails, ShopDetailsUpdate};

use crate::core::ServerState;
use crate::utils::AppResult;
use crate::utils::validation::{
    MAX_ADDRESS_LEN, MAX_NAME_LEN, MAX_SHORT_TEXT_LEN, MAX_URL_LEN, validate_optional_text,
    validate_phone, validate_required_text,
};

/// GET /api/shop - the shop details singleton, created on first read
pub async fn get(State(state): State<ServerState>) -> AppResult<Json<ShopDetails>> {
    let shop = state.shop.get_or_create().await?;
    Ok(Json(shop))
}

/// PUT /api/shop - update the provided fields of the shop details
pub async fn update(
    State(state): State<ServerState>,
    Json(payload): Json<ShopDetailsUpdate>,
) -> AppResult<Json<ShopDetails>> {
    if let Some(name) = &payload.name {
        validate_required_text(name, "name", MAX_NAME_LEN)?;
    }
    if let Some(address) = &payload.address {
        validate_required_text(address, "address", MAX_ADDRESS_LEN)?;
    }
    if let Some(phone) = &payload.phone {
        validate_phone(phone, "phone")?;
    }
    validate_optional_text(&payload.gst, "gst", MAX_SHORT_TEXT_LEN)?;
    validate_optional_text(&payload.upi_id, "upi_id", MAX_SHORT_TEXT_LEN)?;
    validate_optional_text(&payload.logo, "logo", MAX_URL_LEN)?;

    let shop = state.shop.update(payload).await?;
    Ok(Json(shop))
}
