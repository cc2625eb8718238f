//! Money calculation utilities using rust_decimal for precision
//!
//! Amounts are stored and serialized as `f64`; every calculation runs on
//! `Decimal` internally and is rounded back to two places.

use rust_decimal::prelude::*;
use shared::models::BillItem;

use super::{AppError, AppResult};

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Tolerance for monetary comparisons (0.01)
pub const MONEY_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

/// Maximum allowed price per item (₹1,000,000)
const MAX_PRICE: f64 = 1_000_000.0;
/// Maximum allowed quantity per item
const MAX_QUANTITY: i32 = 9999;

/// Validate that a f64 value is finite (not NaN, not Infinity)
#[inline]
fn require_finite(value: f64, field_name: &str) -> AppResult<()> {
    if !value.is_finite() {
        return Err(AppError::validation(format!(
            "{} must be a finite number, got {}",
            field_name, value
        )));
    }
    Ok(())
}

/// Validate a bill line item before processing
pub fn validate_bill_item(item: &BillItem) -> AppResult<()> {
    require_finite(item.unit_price, "unit_price")?;
    if item.unit_price <= 0.0 {
        return Err(AppError::validation(format!(
            "unit_price must be positive, got {}",
            item.unit_price
        )));
    }
    if item.unit_price > MAX_PRICE {
        return Err(AppError::validation(format!(
            "unit_price exceeds maximum allowed ({}), got {}",
            MAX_PRICE, item.unit_price
        )));
    }

    if item.quantity <= 0 {
        return Err(AppError::validation(format!(
            "quantity must be positive, got {}",
            item.quantity
        )));
    }
    if item.quantity > MAX_QUANTITY {
        return Err(AppError::validation(format!(
            "quantity exceeds maximum allowed ({}), got {}",
            MAX_QUANTITY, item.quantity
        )));
    }
    Ok(())
}

/// Convert f64 to Decimal for calculation
#[inline]
pub fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
pub fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// Sum of all line totals as a Decimal
pub fn items_total(items: &[BillItem]) -> Decimal {
    items
        .iter()
        .map(|item| to_decimal(item.unit_price) * Decimal::from(item.quantity))
        .sum()
}

/// Whether a claimed total matches the computed item sum within tolerance
pub fn totals_match(claimed: f64, items: &[BillItem]) -> bool {
    let computed = items_total(items);
    (to_decimal(claimed) - computed).abs() <= MONEY_TOLERANCE
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::ItemKind;

    fn item(price: f64, qty: i32) -> BillItem {
        BillItem {
            kind: ItemKind::Saree,
            custom_label: None,
            unit_price: price,
            quantity: qty,
        }
    }

    #[test]
    fn items_total_avoids_float_drift() {
        // 0.1 + 0.2 style drift must not break the comparison
        let items = vec![item(0.1, 1), item(0.2, 1)];
        assert!(totals_match(0.3, &items));
    }

    #[test]
    fn totals_match_respects_tolerance() {
        let items = vec![item(1500.0, 2)];
        assert!(totals_match(3000.0, &items));
        assert!(totals_match(3000.01, &items));
        assert!(!totals_match(3000.02, &items));
        assert!(!totals_match(2999.0, &items));
    }

    #[test]
    fn rejects_non_finite_and_non_positive_prices() {
        assert!(validate_bill_item(&item(f64::NAN, 1)).is_err());
        assert!(validate_bill_item(&item(f64::INFINITY, 1)).is_err());
        assert!(validate_bill_item(&item(0.0, 1)).is_err());
        assert!(validate_bill_item(&item(-5.0, 1)).is_err());
        assert!(validate_bill_item(&item(1_000_001.0, 1)).is_err());
    }

    #[test]
    fn rejects_out_of_range_quantities() {
        assert!(validate_bill_item(&item(100.0, 0)).is_err());
        assert!(validate_bill_item(&item(100.0, -1)).is_err());
        assert!(validate_bill_item(&item(100.0, 10000)).is_err());
        assert!(validate_bill_item(&item(100.0, 9999)).is_ok());
    }

    #[test]
    fn to_f64_rounds_half_up() {
        assert_eq!(to_f64(Decimal::new(12345, 3)), 12.35); // 12.345
        assert_eq!(to_f64(Decimal::new(12344, 3)), 12.34); // 12.344
    }
}
