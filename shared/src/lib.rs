//! Shared types for the billing system
//!
//! Domain models used across the bill server and its clients, plus the
//! serde helpers that bridge SurrealDB record ids to plain string keys.

pub mod client;
pub mod models;
pub mod util;

// Re-exports
pub use models::{
    Bill, BillCreate, BillItem, BillUpdate, Customer, CustomerCreate, ItemKind, PaymentMode,
    SalesSummary, ShopDetails, ShopDetailsUpdate, TrashedBill,
};
