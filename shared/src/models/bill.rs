//! Bill Model
//!
//! The bill id is a date-prefixed sequential number (`YYMMDDNN`) and doubles
//! as the record key. `url_hash` is the opaque public lookup token.

use super::serde_helpers;
use serde::{Deserialize, Serialize};

/// Item category sold by the shop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ItemKind {
    Saree,
    Dress,
    #[serde(rename = "Suit-Piece")]
    SuitPiece,
}

impl ItemKind {
    pub fn label(&self) -> &'static str {
        match self {
            ItemKind::Saree => "Saree",
            ItemKind::Dress => "Dress",
            ItemKind::SuitPiece => "Suit-Piece",
        }
    }
}

/// Payment mode recorded on the bill
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum PaymentMode {
    Cash,
    Upi,
}

impl PaymentMode {
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMode::Cash => "CASH",
            PaymentMode::Upi => "UPI",
        }
    }
}

/// Single line item on a bill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillItem {
    pub kind: ItemKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_label: Option<String>,
    pub unit_price: f64,
    pub quantity: i32,
}

impl BillItem {
    /// Display name: custom label when present, kind label otherwise
    pub fn display_name(&self) -> &str {
        self.custom_label
            .as_deref()
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| self.kind.label())
    }

    pub fn line_total(&self) -> f64 {
        self.unit_price * self.quantity as f64
    }
}

/// Bill entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bill {
    #[serde(
        default,
        with = "serde_helpers::option_record_key",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    /// Empty on legacy records created before hashes were issued
    #[serde(default)]
    pub url_hash: String,
    /// Business date (Unix millis), may differ from `created_at`
    pub date: i64,
    pub customer_name: String,
    pub customer_phone: String,
    pub items: Vec<BillItem>,
    pub total_amount: f64,
    pub payment_mode: PaymentMode,
    pub created_at: i64,
}

/// Create bill payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillCreate {
    pub date: i64,
    pub customer_name: String,
    pub customer_phone: String,
    pub items: Vec<BillItem>,
    pub total_amount: f64,
    pub payment_mode: PaymentMode,
}

/// Update bill payload
///
/// Full replacement of the mutable field set. `id` and `url_hash` are
/// preserved from the stored record, even when `date` changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillUpdate {
    pub date: i64,
    pub customer_name: String,
    pub customer_phone: String,
    pub items: Vec<BillItem>,
    pub total_amount: f64,
    pub payment_mode: PaymentMode,
}

/// Bill in the trash holding area
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrashedBill {
    #[serde(
        default,
        with = "serde_helpers::option_record_key",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    pub url_hash: String,
    pub date: i64,
    pub customer_name: String,
    pub customer_phone: String,
    pub items: Vec<BillItem>,
    pub total_amount: f64,
    pub payment_mode: PaymentMode,
    pub created_at: i64,
    pub deleted_at: i64,
    pub original_collection: String,
}

impl TrashedBill {
    /// Annotate a bill for the trash collection
    pub fn from_bill(bill: Bill, deleted_at: i64) -> Self {
        Self {
            id: bill.id,
            url_hash: bill.url_hash,
            date: bill.date,
            customer_name: bill.customer_name,
            customer_phone: bill.customer_phone,
            items: bill.items,
            total_amount: bill.total_amount,
            payment_mode: bill.payment_mode,
            created_at: bill.created_at,
            deleted_at,
            original_collection: "bill".to_string(),
        }
    }

    /// Strip the trash annotations, recovering the original bill
    pub fn into_bill(self) -> Bill {
        Bill {
            id: self.id,
            url_hash: self.url_hash,
            date: self.date,
            customer_name: self.customer_name,
            customer_phone: self.customer_phone,
            items: self.items,
            total_amount: self.total_amount,
            payment_mode: self.payment_mode,
            created_at: self.created_at,
        }
    }
}
