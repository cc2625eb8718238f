//! Data models
//!
//! Shared between the bill server and frontend (via API).
//! Record keys are domain strings (bill number, phone, singleton key);
//! `serde_helpers` converts SurrealDB record ids back to plain keys.

pub mod analytics;
pub mod bill;
pub mod customer;
pub mod serde_helpers;
pub mod shop;

// Re-exports
pub use analytics::*;
pub use bill::*;
pub use customer::*;
pub use shop::*;
