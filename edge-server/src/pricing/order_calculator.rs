//! Order-Level Price Calculator
//!
//! Calculate order-level prices with support for:
//! - Order-level rule discounts (exclusive, non-stackable, stackable)
//! - Order-level rule surcharges (same stacking logic)
//! - Manual order discounts (percentage or fixed amount)
//!
//! Uses functions from item_calculator for rule application logic.

use crate::db::models::PriceRule;
use rust_decimal::prelude::*;
use shared::order::AppliedRule;

use super::item_calculator::{apply_discount_rules, apply_surcharge_rules, to_decimal, to_f64};

/// Result of order price calculation
#[derive(Debug, Clone)]
pub struct OrderCalculationResult {
    /// Sum of all item totals (subtotal)
    pub subtotal: f64,
    /// Total discount amount from order-level rules
    pub order_rule_discount_amount: f64,
    /// Price after order rule discounts
    pub after_order_rule_discount: f64,
    /// Total surcharge amount from order-level rules
    pub order_rule_surcharge_amount: f64,
    /// Price after order rules (discounts and surcharges)
    pub after_order_rule: f64,
    /// Manual discount amount (either from percent or fixed)
    pub order_manual_discount_amount: f64,
    /// Final order total
    pub total: f64,
    /// Applied order-level rules (for tracking/display)
    pub order_applied_rules: Vec<AppliedRule>,
}

impl Default for OrderCalculationResult {
    fn default() -> Self {
        Self {
            subtotal: 0.0,
            order_rule_discount_amount: 0.0,
            after_order_rule_discount: 0.0,
            order_rule_surcharge_amount: 0.0,
            after_order_rule: 0.0,
            order_manual_discount_amount: 0.0,
            total: 0.0,
            order_applied_rules: vec![],
        }
    }
}

/// Calculate order-level price with rules and manual discount
///
/// # Arguments
/// * `subtotal` - Sum of all item final prices
/// * `order_rules` - Rules that apply at order level
/// * `manual_discount_percent` - Optional manual discount percentage (0-100)
/// * `manual_discount_fixed` - Optional manual fixed discount amount
///
/// # Calculation Steps
/// 1. Apply order rule discounts (based on subtotal)
/// 2. Apply order rule surcharges (based on subtotal)
/// 3. Apply manual discount (either percent or fixed, based on after_order_rule)
///
/// # Notes
/// - If both manual_discount_percent and manual_discount_fixed are provided,
///   only percentage is applied (percent takes precedence)
/// - Manual discount is applied AFTER rule discounts/surcharges
///
/// # Returns
/// `OrderCalculationResult` with all intermediate values and applied rules
pub fn calculate_order_price(
    subtotal: f64,
    order_rules: &[&PriceRule],
    manual_discount_percent: Option<f64>,
    manual_discount_fixed: Option<f64>,
) -> OrderCalculationResult {
    let subtotal_decimal = to_decimal(subtotal);

    // Step 1: Apply order rule discounts (based on subtotal)
    let discount_result = apply_discount_rules(order_rules, subtotal_decimal);
    let after_discount = (subtotal_decimal - discount_result.amount).max(Decimal::ZERO);

    // Step 2: Apply order rule surcharges (based on subtotal)
    let surcharge_result = apply_surcharge_rules(order_rules, subtotal_decimal);
    let after_order_rule = (after_discount + surcharge_result.amount).max(Decimal::ZERO);

    // Step 3: Apply manual discount (based on after_order_rule)
    let hundred = Decimal::ONE_HUNDRED;
    let manual_discount_amount = if let Some(percent) = manual_discount_percent {
        // Percentage takes precedence
        let pct = to_decimal(percent);
        after_order_rule * pct / hundred
    } else if let Some(fixed) = manual_discount_fixed {
        // Fixed amount (already in dollars)
        to_decimal(fixed)
    } else {
        Decimal::ZERO
    };

    let total = (after_order_rule - manual_discount_amount).max(Decimal::ZERO);

    // Combine applied rules
    let mut order_applied_rules = discount_result.applied;
    order_applied_rules.extend(surcharge_result.applied);

    OrderCalculationResult {
        subtotal: to_f64(subtotal_decimal),
        order_rule_discount_amount: to_f64(discount_result.amount),
        after_order_rule_discount: to_f64(after_discount),
        order_rule_surcharge_amount: to_f64(surcharge_result.amount),
        after_order_rule: to_f64(after_order_rule),
        order_manual_discount_amount: to_f64(manual_discount_amount),
        total: to_f64(total),
        order_applied_rules,
    }
}

// ==================== Tests ====================
