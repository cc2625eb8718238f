//! MG Discount Calculator
//!
//! Calculates Marketing Group discounts for order items.
//! All matching rules are applied multiplicatively ("capitalist mode").
//! Completely independent from the pricing/ module.

use rust_decimal::prelude::*;
use shared::models::{AdjustmentType, MgDiscountRule, ProductScope};
use shared::order::AppliedMgRule;

use crate::order_money::{to_decimal, to_f64};

/// Result of MG discount calculation for a single item
pub struct MgCalculationResult {
    /// Total MG discount amount (f64, rounded to 2 decimal places)
    pub mg_discount: f64,
    /// List of applied MG rules with individual contributions
    pub applied_rules: Vec<AppliedMgRule>,
}

/// Calculate MG discount for a single item.
///
/// All matching active rules are applied multiplicatively:
/// - Percentage: running_price *= (1 - rate/100)
/// - FixedAmount: running_price -= amount (floor at 0)
///
/// # Arguments
/// * `base_price` - Price after PriceRule discounts (the unit_price from pricing engine)
/// * `product_id` - Product ID for scope matching
/// * `category_id` - Category ID for scope matching (from backend metadata cache)
/// * `rules` - MG discount rules for the member's marketing group
pub fn calculate_mg_discount(
    base_price: f64,
    product_id: i64,
    category_id: Option<i64>,
    rules: &[MgDiscountRule],
) -> MgCalculationResult {
    let hundred = Decimal::ONE_HUNDRED;
    let mut running_price = to_decimal(base_price);
    let original_price = running_price;
    let mut applied_rules = Vec::new();

    for rule in rules {
        if !rule.is_active {
            continue;
        }

        if !matches_product(rule, product_id, category_id) {
            continue;
        }

        let price_before = running_price;

        match rule.adjustment_type {
            AdjustmentType::Percentage => {
                let rate = to_decimal(rule.adjustment_value) / hundred;
                running_price *= Decimal::ONE - rate;
            }
            AdjustmentType::FixedAmount => {
                let amount = to_decimal(rule.adjustment_value);
                running_price = (running_price - amount).max(Decimal::ZERO);
            }
        }

        let contributed = price_before - running_price;

        applied_rules.push(AppliedMgRule {
            rule_id: rule.id,
            name: rule.name.clone(),
            receipt_name: rule.receipt_name.clone(),
            product_scope: rule.product_scope.clone(),
            adjustment_type: rule.adjustment_type.clone(),
            adjustment_value: rule.adjustment_value,
            calculated_amount: to_f64(contributed),
            skipped: false,
        });
    }

    let total_discount = original_price - running_price;

    MgCalculationResult {
        mg_discount: to_f64(total_discount),
        applied_rules,
    }
}

/// Check if a rule matches a product based on its scope
fn matches_product(rule: &MgDiscountRule, product_id: i64, category_id: Option<i64>) -> bool {
    match rule.product_scope {
        ProductScope::Global => true,
        ProductScope::Product => rule.target_id == Some(product_id),
        ProductScope::Category => rule.target_id == category_id,
        // Tag/Zone scope not used for MG rules
        _ => false,
    }
}
