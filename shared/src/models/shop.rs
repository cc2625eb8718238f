//! Shop Details Model (Singleton)
//!
//! One record per installation, fixed key "details".

use super::serde_helpers;
use serde::{Deserialize, Serialize};

/// Shop details entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShopDetails {
    #[serde(
        default,
        with = "serde_helpers::option_record_key",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<String>,
    pub name: String,
    pub address: String,
    pub phone: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gst: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    /// UPI payee id used for payment deep links
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upi_id: Option<String>,
    pub updated_at: i64,
}

impl Default for ShopDetails {
    fn default() -> Self {
        Self {
            id: None,
            name: String::new(),
            address: String::new(),
            phone: String::new(),
            gst: None,
            logo: None,
            upi_id: None,
            updated_at: 0,
        }
    }
}

/// Update shop details payload
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ShopDetailsUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gst: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upi_id: Option<String>,
}
