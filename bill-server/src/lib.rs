//! Bill Server
//!
//! Billing service for a small retail shop: bill creation with
//! date-prefixed numbers and short lookup hashes, a trash lifecycle,
//! customer directory, sales analytics and a public lookup page.
//!
//! Module tree:
//! - `core` - configuration, shared state, HTTP server
//! - `auth` - JWT sessions, owner account, request guard
//! - `api` - resource routers and handlers
//! - `billing` - allocators, lifecycle manager, resolver, viewer
//! - `db` - embedded SurrealDB service and repositories
//! - `utils` - errors, logging, money, time, validation

pub mod api;
pub mod auth;
pub mod billing;
pub mod core;
pub mod db;
pub mod utils;

pub use auth::{CurrentUser, JwtService};
pub use core::{Config, Server, ServerState};
pub use utils::{AppError, AppResult};
pub use utils::logger::{init_logger, init_logger_with_file};

/// Load `.env` and initialize logging from the environment
pub fn setup_environment() -> Result<(), Box<dyn std::error::Error>> {
    dotenv::dotenv().ok();

    let log_level = std::env::var("LOG_LEVEL").ok();
    let log_dir = std::env::var("LOG_DIR").ok();
    init_logger_with_file(log_level.as_deref(), log_dir.as_deref());

    Ok(())
}

pub fn print_banner() {
    println!(
        r#"
  ____  _ _ _   ____
 | __ )(_) | | / ___|  ___ _ ____   _____ _ __
 |  _ \| | | | \___ \ / _ \ '__\ \ / / _ \ '__|
 | |_) | | | |  ___) |  __/ |   \ V /  __/ |
 |____/|_|_|_| |____/ \___|_|    \_/ \___|_|

 Bill Server v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
