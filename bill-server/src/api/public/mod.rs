//! Public Lookup API
//!
//! Unauthenticated bill lookup: server-rendered HTML pages and a JSON
//! endpoint for client-side rendering.

pub mod handler;

use axum::Router;
use axum::routing::get;

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new()
        .route("/b", get(handler::view_query))
        .route("/b/{identifier}", get(handler::view))
        .route("/api/public/bills/{identifier}", get(handler::get_bill))
}
