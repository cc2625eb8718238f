//! Auth Handlers

use axum::Json;
use axum::extract::{Extension, State};
use shared::client::{LoginRequest, LoginResponse};

use crate::auth::CurrentUser;
use crate::core::ServerState;
use crate::utils::{AppError, AppResult};

/// Fixed login latency so response timing reveals nothing about which
/// check failed.
const AUTH_FIXED_DELAY_MS: u64 = 500;

/// POST /api/auth/login - exchange owner credentials for a session token
pub async fn login(
    State(state): State<ServerState>,
    Json(req): Json<LoginRequest>,
) -> AppResult<Json<LoginResponse>> {
    tokio::time::sleep(std::time::Duration::from_millis(AUTH_FIXED_DELAY_MS)).await;

    if !state.owner.verify(&req.username, &req.password) {
        tracing::warn!(target: "security", username = %req.username, "Login failed");
        return Err(AppError::invalid_credentials());
    }

    let token = state
        .jwt_service
        .generate_token("owner", &req.username)
        .map_err(|e| AppError::internal(format!("Token generation failed: {e}")))?;

    tracing::info!(username = %req.username, "Owner logged in");

    Ok(Json(LoginResponse {
        token,
        username: req.username,
        expires_in: state.jwt_service.config.expiration_minutes * 60,
    }))
}

/// GET /api/auth/me - the identity behind the presented token
pub async fn me(Extension(user): Extension<CurrentUser>) -> Json<CurrentUser> {
    Json(user)
}
