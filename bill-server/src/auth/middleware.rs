//! Auth Middleware
//!
//! Bearer-token guard for the management API. Public lookup routes, the
//! login endpoint and the health check pass through unauthenticated.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::Response;
use http::Method;
use http::header::AUTHORIZATION;

use crate::core::ServerState;
use crate::utils::AppError;

use super::jwt::{CurrentUser, JwtError, JwtService};

/// Routes under `/api/` that do not require a token
fn is_public_api(path: &str) -> bool {
    path == "/api/auth/login" || path == "/api/health" || path.starts_with("/api/public/")
}

/// Require a valid Bearer token on management API routes.
///
/// On success the parsed [`CurrentUser`] is inserted into the request
/// extensions for handlers to consume.
pub async fn require_auth(
    State(state): State<ServerState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    if req.method() == Method::OPTIONS {
        return Ok(next.run(req).await);
    }

    let path = req.uri().path();
    if !path.starts_with("/api/") || is_public_api(path) {
        return Ok(next.run(req).await);
    }

    let header = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    let Some(header) = header else {
        tracing::warn!(target: "security", path = %req.uri().path(), "Missing Authorization header");
        return Err(AppError::Unauthorized);
    };

    let token = JwtService::extract_from_header(header).ok_or(AppError::InvalidToken)?;

    match state.jwt_service.validate_token(token) {
        Ok(claims) => {
            req.extensions_mut().insert(CurrentUser::from(claims));
            Ok(next.run(req).await)
        }
        Err(e) => {
            tracing::warn!(target: "security", path = %req.uri().path(), error = %e, "Token rejected");
            match e {
                JwtError::ExpiredToken => Err(AppError::TokenExpired),
                _ => Err(AppError::InvalidToken),
            }
        }
    }
}
