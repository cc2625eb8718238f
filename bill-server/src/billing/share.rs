//! Share payload construction
//!
//! Builds the outbound share message and the messaging / payment deep
//! links for a bill. The server only constructs the links; opening them
//! is the client's user-confirmed send flow.

use serde::Serialize;
use shared::models::{Bill, ShopDetails};

/// Share payload returned to the client
#[derive(Debug, Clone, Serialize)]
pub struct SharePayload {
    pub message: String,
    pub whatsapp_link: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upi_link: Option<String>,
}

/// Strip separators; bare 10-digit numbers get the country code prefixed
pub fn normalize_phone(raw: &str, country_code: &str) -> String {
    let digits: String = raw.chars().filter(|c| c.is_ascii_digit()).collect();
    if digits.len() == 10 {
        format!("{country_code}{digits}")
    } else {
        digits
    }
}

/// The share message sent alongside the public bill link
pub fn share_message(bill: &Bill, public_base_url: &str) -> String {
    format!(
        "Thank you for shopping with us!\nBill #{}\nAmount: \u{20b9}{:.2}\nView Bill: {}/{}",
        bill.id.as_deref().unwrap_or(""),
        bill.total_amount,
        public_base_url.trim_end_matches('/'),
        bill.url_hash
    )
}

/// `whatsapp://send` deep link carrying the share message
pub fn whatsapp_link(bill: &Bill, public_base_url: &str, country_code: &str) -> String {
    let phone = normalize_phone(&bill.customer_phone, country_code);
    let text = share_message(bill, public_base_url);
    format!(
        "whatsapp://send?phone={}&text={}",
        phone,
        urlencoding::encode(&text)
    )
}

/// UPI intent format: upi://pay?pa=...&pn=...&am=...&cu=INR&tn=...
///
/// Requires the shop's UPI payee id; returns None when it is not set.
pub fn upi_link(bill: &Bill, shop: &ShopDetails) -> Option<String> {
    let payee = shop.upi_id.as_deref().filter(|id| !id.trim().is_empty())?;
    let note = format!("Bill #{}", bill.id.as_deref().unwrap_or(""));
    Some(format!(
        "upi://pay?pa={}&pn={}&am={:.2}&cu=INR&tn={}",
        payee,
        urlencoding::encode(&shop.name),
        bill.total_amount,
        urlencoding::encode(&note)
    ))
}

/// Assemble the full share payload for a bill
pub fn build_payload(
    bill: &Bill,
    shop: &ShopDetails,
    public_base_url: &str,
    country_code: &str,
) -> SharePayload {
    SharePayload {
        message: share_message(bill, public_base_url),
        whatsapp_link: whatsapp_link(bill, public_base_url, country_code),
        upi_link: upi_link(bill, shop),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::{BillItem, ItemKind, PaymentMode};

    fn sample_bill() -> Bill {
        Bill {
            id: Some("25040101".into()),
            url_hash: "a1b2c3d4".into(),
            date: 1_743_465_600_000,
            customer_name: "Asha".into(),
            customer_phone: "98765 43210".into(),
            items: vec![BillItem {
                kind: ItemKind::Saree,
                custom_label: None,
                unit_price: 1500.0,
                quantity: 2,
            }],
            total_amount: 3000.0,
            payment_mode: PaymentMode::Upi,
            created_at: 1_743_465_600_000,
        }
    }

    fn sample_shop() -> ShopDetails {
        ShopDetails {
            name: "Sri Sarees".into(),
            upi_id: Some("shop@upi".into()),
            ..ShopDetails::default()
        }
    }

    #[test]
    fn normalize_prefixes_bare_ten_digit_numbers() {
        assert_eq!(normalize_phone("9876543210", "91"), "919876543210");
        assert_eq!(normalize_phone("98765 43210", "91"), "919876543210");
        assert_eq!(normalize_phone("+91 98765 43210", "91"), "919876543210");
        // Already carries a country code, left alone
        assert_eq!(normalize_phone("449876543210", "91"), "449876543210");
    }

    #[test]
    fn message_contains_id_amount_and_link() {
        let msg = share_message(&sample_bill(), "https://bills.example.com/b/");
        assert!(msg.contains("Bill #25040101"));
        assert!(msg.contains("\u{20b9}3000.00"));
        assert!(msg.contains("https://bills.example.com/b/a1b2c3d4"));
    }

    #[test]
    fn whatsapp_link_encodes_the_message() {
        let link = whatsapp_link(&sample_bill(), "https://bills.example.com/b", "91");
        assert!(link.starts_with("whatsapp://send?phone=919876543210&text="));
        assert!(!link.contains('\n'));
        assert!(link.contains("%0A"));
    }

    #[test]
    fn upi_link_needs_a_payee_id() {
        let bill = sample_bill();
        let link = upi_link(&bill, &sample_shop()).unwrap();
        assert!(link.starts_with("upi://pay?pa=shop@upi&pn=Sri%20Sarees&am=3000.00&cu=INR"));

        let mut shop = sample_shop();
        shop.upi_id = None;
        assert!(upi_link(&bill, &shop).is_none());
        shop.upi_id = Some("  ".into());
        assert!(upi_link(&bill, &shop).is_none());
    }
}
