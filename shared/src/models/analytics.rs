//! Sales Analytics Models

use serde::{Deserialize, Serialize};

/// Aggregated sales over an inclusive business-date range
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SalesSummary {
    pub total_sales: f64,
    pub total_bills: i64,
    pub total_quantity: i64,
    pub cash_amount: f64,
    pub upi_amount: f64,
    pub saree_quantity: i64,
    pub dress_quantity: i64,
    pub suit_piece_quantity: i64,
}
