//! Price Calculator
//!
//! Logic for calculating price adjustments from matched rules.
//! Uses rust_decimal for precise calculations, stores as f64.

use crate::db::models::{AdjustmentType, PriceRule, RuleType};
use rust_decimal::prelude::*;

/// Rounding strategy for monetary values (2 decimal places, half-up)
const DECIMAL_PLACES: u32 = 2;

/// Convert f64 to Decimal for calculation
#[inline]
fn to_decimal(value: f64) -> Decimal {
    Decimal::from_f64(value).unwrap_or_default()
}

/// Convert Decimal back to f64 for storage, rounded to 2 decimal places
#[inline]
fn to_f64(value: Decimal) -> f64 {
    value
        .round_dp_with_strategy(DECIMAL_PLACES, RoundingStrategy::MidpointAwayFromZero)
        .to_f64()
        .unwrap_or_default()
}

/// Calculated adjustment result
#[derive(Debug, Clone, Default)]
pub struct PriceAdjustment {
    /// Surcharge amount (from SURCHARGE rules)
    pub surcharge: f64,
    /// Discount percentage (from DISCOUNT rules, percentage type)
    pub manual_discount_percent: f64,
    /// Discount fixed amount (from DISCOUNT rules, fixed type)
    pub discount_fixed: f64,
    /// Applied rule names for display
    pub applied_rules: Vec<String>,
}

impl PriceAdjustment {
    /// Calculate the final price after applying adjustments
    /// Order: base_price + surcharge - (surcharge * discount%) - fixed_discount
    ///
    /// Uses Decimal internally for precise calculations
    pub fn calculate_final_price(&self, base_price: f64) -> f64 {
        let base = to_decimal(base_price);
        let surcharge = to_decimal(self.surcharge);
        let discount_pct = to_decimal(self.manual_discount_percent);
        let discount_fixed = to_decimal(self.discount_fixed);

        // Step 1: Add surcharge
        let price_with_surcharge = base + surcharge;

        // Step 2: Apply percentage discount
        let discount_multiplier = Decimal::ONE - discount_pct / Decimal::ONE_HUNDRED;
        let after_percent_discount = price_with_surcharge * discount_multiplier;

        // Step 3: Apply fixed discount (never go below zero)
        let final_price = (after_percent_discount - discount_fixed).max(Decimal::ZERO);

        to_f64(final_price)
    }
}

/// Sort rules by priority (higher priority first)
pub fn sort_rules_by_priority(rules: &mut [&PriceRule]) {
    rules.sort_by(|a, b| b.priority.cmp(&a.priority));
}

/// Calculate adjustment from a single rule using Decimal precision
fn calculate_single_adjustment(rule: &PriceRule, base_price: Decimal) -> (Decimal, Decimal, Decimal) {
    let value = to_decimal(rule.adjustment_value);
    let hundred = Decimal::ONE_HUNDRED;

    match (&rule.rule_type, &rule.adjustment_type) {
        (RuleType::Surcharge, AdjustmentType::Percentage) => {
            // Surcharge as percentage of base price (e.g., value=10 means 10%)
            let amount = base_price * value / hundred;
            (amount, Decimal::ZERO, Decimal::ZERO)
        }
        (RuleType::Surcharge, AdjustmentType::FixedAmount) => {
            // Surcharge as fixed amount (e.g., value=5.00 means ¥5.00)
            (value, Decimal::ZERO, Decimal::ZERO)
        }
        (RuleType::Discount, AdjustmentType::Percentage) => {
            // Discount as percentage (store the percentage value, not the amount)
            (Decimal::ZERO, value, Decimal::ZERO)
        }
        (RuleType::Discount, AdjustmentType::FixedAmount) => {
            // Discount as fixed amount (e.g., value=5.00 means ¥5.00)
            (Decimal::ZERO, Decimal::ZERO, value)
        }
    }
}

/// Calculate total adjustment from matched rules
///
/// Rules are processed in priority order:
/// - Stackable rules accumulate their effects
/// - Non-stackable rules compete - highest priority wins per type
///
/// Returns: PriceAdjustment with surcharge, manual_discount_percent, discount_fixed
pub fn calculate_adjustments(rules: &[&PriceRule], base_price: f64) -> PriceAdjustment {
    if rules.is_empty() {
        return PriceAdjustment::default();
    }

    let base_decimal = to_decimal(base_price);

    // Sort by priority (already done by caller, but ensure)
    let mut sorted_rules: Vec<&PriceRule> = rules.to_vec();
    sort_rules_by_priority(&mut sorted_rules);

    // Accumulate using Decimal for precision
    let mut surcharge_acc = Decimal::ZERO;
    let mut discount_pct_acc = Decimal::ZERO;
    let mut discount_fixed_acc = Decimal::ZERO;
    let mut applied_rules = Vec::new();

    // Track if we've applied a non-stackable rule for each type
    let mut has_surcharge_non_stackable = false;
    let mut has_discount_non_stackable = false;

    for rule in sorted_rules {
        let is_surcharge = matches!(rule.rule_type, RuleType::Surcharge);
        let is_discount = matches!(rule.rule_type, RuleType::Discount);

        // Skip if non-stackable rule of this type already applied
        if is_surcharge && has_surcharge_non_stackable && !rule.is_stackable {
            continue;
        }
        if is_discount && has_discount_non_stackable && !rule.is_stackable {
            continue;
        }

        // Calculate adjustment using Decimal
        let (surcharge, discount_pct, discount_fixed) =
            calculate_single_adjustment(rule, base_decimal);

        // Apply adjustment
        if rule.is_stackable {
            surcharge_acc += surcharge;
            discount_pct_acc += discount_pct;
            discount_fixed_acc += discount_fixed;
        } else {
            // Non-stackable replaces
            if is_surcharge {
                surcharge_acc = surcharge;
                has_surcharge_non_stackable = true;
            }
            if is_discount {
                discount_pct_acc = discount_pct;
                discount_fixed_acc = discount_fixed;
                has_discount_non_stackable = true;
            }
        }

        applied_rules.push(rule.receipt_name.clone());
    }

    PriceAdjustment {
        surcharge: to_f64(surcharge_acc),
        manual_discount_percent: to_f64(discount_pct_acc),
        discount_fixed: to_f64(discount_fixed_acc),
        applied_rules,
    }
}
