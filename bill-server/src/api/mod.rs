//! API Module
//!
//! Resource routers for the HTTP surface:
//! - `auth` - login and session identity
//! - `health` - liveness probe
//! - `bills` - bill CRUD, migration and share payloads
//! - `trash` - trashed bills, restore and purge
//! - `customers` - customer directory
//! - `shop` - shop details singleton
//! - `analytics` - sales summaries
//! - `public` - unauthenticated bill lookup

pub mod analytics;
pub mod auth;
pub mod bills;
pub mod customers;
pub mod health;
pub mod public;
pub mod shop;
pub mod trash;

pub use crate::utils::{AppResponse, AppResult};
