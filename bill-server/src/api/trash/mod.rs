//! Trash API

pub mod handler;

use axum::Router;
use axum::routing::{delete, get, post};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/trash", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(handler::list))
        .route("/{id}", delete(handler::purge))
        .route("/{id}/restore", post(handler::restore))
}
