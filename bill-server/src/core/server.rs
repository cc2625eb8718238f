//! HTTP Server
//!
//! Router assembly and the serve loop with graceful shutdown.

use axum::Router;
use axum::middleware;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api;
use crate::auth::require_auth;

use super::config::Config;
use super::state::ServerState;

/// Merge every resource router into the application
pub fn build_app() -> Router<ServerState> {
    Router::new()
        .merge(api::auth::router())
        .merge(api::health::router())
        .merge(api::bills::router())
        .merge(api::trash::router())
        .merge(api::customers::router())
        .merge(api::shop::router())
        .merge(api::analytics::router())
        .merge(api::public::router())
}

/// Attach state and the middleware stack
pub fn build_router(state: ServerState) -> Router {
    build_app()
        .layer(middleware::from_fn_with_state(state.clone(), require_auth))
        .with_state(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
}

pub struct Server {
    config: Config,
    state: Option<ServerState>,
}

impl Server {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            state: None,
        }
    }

    pub fn with_state(config: Config, state: ServerState) -> Self {
        Self {
            config,
            state: Some(state),
        }
    }

    /// Bind and serve until interrupted
    pub async fn run(&self) -> anyhow::Result<()> {
        let state = match &self.state {
            Some(state) => state.clone(),
            None => ServerState::initialize(&self.config).await?,
        };

        let app = build_router(state);
        let addr = format!("{}:{}", self.config.host, self.config.http_port);
        let listener = TcpListener::bind(&addr).await?;

        tracing::info!("Listening on http://{}", listener.local_addr()?);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        Ok(())
    }
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("Shutting down...");
    }
}
