//! Public Bill Viewer
//!
//! Server-rendered HTML for a resolved bill. All fields pass through the
//! template engine's HTML escaping; amounts are formatted to two places
//! and the business date is shown in the shop's timezone.

use askama::Template;
use chrono_tz::Tz;
use shared::models::BillItem;

use crate::utils::time;

use super::resolver::ResolvedBill;

pub struct ItemRow {
    pub name: String,
    pub quantity: i32,
    pub price: String,
    pub total: String,
}

impl ItemRow {
    fn from_item(item: &BillItem) -> Self {
        Self {
            name: item.display_name().to_string(),
            quantity: item.quantity,
            price: format!("{:.2}", item.unit_price),
            total: format!("{:.2}", item.line_total()),
        }
    }
}

/// The rendered bill page
#[derive(Template)]
#[template(path = "bill.html")]
pub struct BillPage {
    pub shop_name: String,
    pub shop_address: String,
    pub shop_phone: String,
    pub shop_gst: Option<String>,
    pub shop_logo: Option<String>,
    pub bill_id: String,
    pub bill_date: String,
    pub customer_name: String,
    pub customer_phone: String,
    pub items: Vec<ItemRow>,
    pub total_amount: String,
    pub payment_mode: String,
}

impl BillPage {
    pub fn new(resolved: &ResolvedBill, tz: Tz) -> Self {
        let bill = &resolved.bill;
        let shop = &resolved.shop;
        Self {
            shop_name: shop.name.clone(),
            shop_address: shop.address.clone(),
            shop_phone: shop.phone.clone(),
            shop_gst: shop.gst.clone(),
            shop_logo: shop.logo.clone(),
            bill_id: bill.id.clone().unwrap_or_default(),
            bill_date: time::business_date(bill.date, tz)
                .format("%d/%m/%Y")
                .to_string(),
            customer_name: bill.customer_name.clone(),
            customer_phone: bill.customer_phone.clone(),
            items: bill.items.iter().map(ItemRow::from_item).collect(),
            total_amount: format!("{:.2}", bill.total_amount),
            payment_mode: bill.payment_mode.label().to_string(),
        }
    }
}

/// Fallback page for lookup failures
#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorPage {
    pub message: String,
}

impl ErrorPage {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::Asia::Kolkata;
    use shared::models::{Bill, BillItem, ItemKind, PaymentMode, ShopDetails};

    fn resolved() -> ResolvedBill {
        ResolvedBill {
            bill: Bill {
                id: Some("25040101".into()),
                url_hash: "a1b2c3d4".into(),
                date: 1_743_482_000_000,
                customer_name: "Asha & Co <Traders>".into(),
                customer_phone: "9876543210".into(),
                items: vec![BillItem {
                    kind: ItemKind::Saree,
                    custom_label: None,
                    unit_price: 1500.0,
                    quantity: 2,
                }],
                total_amount: 3000.0,
                payment_mode: PaymentMode::Upi,
                created_at: 1_743_482_000_000,
            },
            shop: ShopDetails {
                name: "Sri Sarees".into(),
                address: "12 Market Road".into(),
                phone: "04422334455".into(),
                gst: Some("27AAPFU0939F1ZV".into()),
                ..ShopDetails::default()
            },
        }
    }

    #[test]
    fn renders_bill_and_shop_fields() {
        let html = BillPage::new(&resolved(), Kolkata).render().unwrap();
        assert!(html.contains("Sri Sarees"));
        assert!(html.contains("Bill #: 25040101"));
        assert!(html.contains("Date: 01/04/2025"));
        assert!(html.contains("GST: 27AAPFU0939F1ZV"));
        assert!(html.contains("Saree"));
        assert!(html.contains("Grand Total: &#8377;3000.00"));
        assert!(html.contains("Payment Mode: UPI"));
        assert!(html.contains("NO RETURN. NO EXCHANGE. NO GUARANTEE."));
    }

    #[test]
    fn escapes_customer_supplied_text() {
        let html = BillPage::new(&resolved(), Kolkata).render().unwrap();
        assert!(!html.contains("<Traders>"));
        assert!(html.contains("&lt;Traders&gt;"));
    }

    #[test]
    fn omits_absent_logo_and_gst() {
        let mut data = resolved();
        data.shop.gst = None;
        data.shop.logo = None;
        let html = BillPage::new(&data, Kolkata).render().unwrap();
        assert!(!html.contains("company-logo"));
        assert!(!html.contains("GST:"));
    }

    #[test]
    fn error_page_carries_the_message() {
        let html = ErrorPage::new("Bill not found").render().unwrap();
        assert!(html.contains("Bill not found"));
    }
}
