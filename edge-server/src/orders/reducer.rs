//! Order snapshot utilities
//!
//! This module provides utilities for order snapshot computation:
//! - `generate_instance_id`: Generate content-addressed instance IDs for items
//! - `input_to_snapshot`: Convert CartItemInput to CartItemSnapshot
//! - `input_to_snapshot_with_rules`: Convert CartItemInput to CartItemSnapshot with price rules applied
//!
//! Note: Event application logic has been moved to the appliers module.
//! Use `EventAction` from `super::appliers` to apply events to snapshots.

use shared::models::PriceRule;
use crate::pricing::{calculate_item_price, matches_product_scope};
use shared::order::CartItemSnapshot;
use tracing::debug;

/// Generate a content-addressed instance_id from CartItemInput
///
/// The instance_id is a hash of the item's identity-defining properties:
/// - product_id: 商品唯一标识
/// - price: 输入价格（直接使用 CartItemInput.price）
/// - manual_discount_percent: 手动折扣
/// - selected_options: 选项（attribute_id + option_id）
/// - selected_specification: 规格
///
/// Items with the same instance_id can be merged (quantities added together).
///
/// 注意：instance_id 完全基于 CartItemInput 字段生成，不受规则计算结果影响。
/// 这确保了同一商品在任何时刻（规则缓存是否存在）都能正确合并。
pub fn generate_instance_id(input: &shared::order::CartItemInput) -> String {
    generate_instance_id_from_parts(
        input.product_id,
        input.price,
        input.manual_discount_percent,
        &input.selected_options,
        &input.selected_specification,
    )
}

/// Internal helper to generate instance_id from individual parts
///
/// This is used by `generate_instance_id` and also by modify_item when
/// computing instance_id for modified item portions.
pub(crate) fn generate_instance_id_from_parts(
    product_id: i64,
    price: f64,
    manual_discount_percent: Option<f64>,
    options: &Option<Vec<shared::order::ItemOption>>,
    specification: &Option<shared::order::SpecificationInfo>,
) -> String {
    use sha2::{Digest, Sha256};

    let mut hasher = Sha256::new();

    hasher.update(product_id.to_le_bytes());
    hasher.update(price.to_be_bytes());

    if let Some(discount) = manual_discount_percent.filter(|&d| d.abs() > 0.01) {
        hasher.update(discount.to_be_bytes());
    }

    if let Some(opts) = options {
        for opt in opts {
            hasher.update(opt.attribute_id.to_le_bytes());
            hasher.update(opt.option_id.to_le_bytes());
            hasher.update(opt.quantity.to_be_bytes());
        }
    }

    if let Some(spec) = specification {
        hasher.update(spec.id.to_le_bytes());
    }

    let result = hasher.finalize();
    hex::encode(&result[..16]) // Use first 16 bytes for shorter ID
}

/// Convert CartItemInput to CartItemSnapshot with generated instance_id
///
/// This is a convenience function that calls `input_to_snapshot_with_rules` with empty rules
/// and no product metadata (for cases where rule matching is not needed).
pub fn input_to_snapshot(input: &shared::order::CartItemInput) -> CartItemSnapshot {
    input_to_snapshot_with_rules(input, &[], 0, None, &[])
}

/// Convert CartItemInput to CartItemSnapshot with price rules applied
///
/// This function calculates the final price considering:
/// 1. Base price (original_price or price) + options modifier
/// 2. Manual discount percentage
/// 3. Rule-based discounts and surcharges
///
/// # Arguments
/// * `input` - The cart item input to convert
/// * `rules` - Cached price rules (will be filtered by product scope)
/// * `product_id` - Product's i64 ID for scope matching
/// * `category_id` - Product's category ID for scope matching (from backend cache)
/// * `tag_ids` - Product's tag IDs for scope matching (from backend cache)
///
/// # Returns
/// A CartItemSnapshot with calculated prices and applied rules
pub fn input_to_snapshot_with_rules(
    input: &shared::order::CartItemInput,
    rules: &[&PriceRule],
    product_id: i64,
    category_id: Option<i64>,
    tag_ids: &[i64],
) -> CartItemSnapshot {
    debug!(
        product_id,
        product_name = %input.name,
        input_price = input.price,
        original_price = ?input.original_price,
        manual_discount_percent = ?input.manual_discount_percent,
        rules_count = rules.len(),
        category_id = ?category_id,
        tags_count = tag_ids.len(),
        "[Reducer] input_to_snapshot_with_rules called"
    );

    // Filter rules by product scope matching
    // Uses category_id and tag_ids from backend product metadata cache
    let matched_rules: Vec<&PriceRule> = rules
        .iter()
        .filter(|rule| {
            matches_product_scope(rule, product_id, category_id, tag_ids)
        })
        .copied()
        .collect();

    debug!(
        product_id,
        total_rules = rules.len(),
        matched_rules_count = matched_rules.len(),
        "[Reducer] Filtered rules by product scope"
    );

    // Calculate options modifier from selected_options (considering quantity)
    let options_modifier: f64 = input
        .selected_options
        .as_ref()
        .map(|opts| {
            opts.iter()
                .filter_map(|o| o.price_modifier.map(|p| p * o.quantity as f64))
                .sum()
        })
        .unwrap_or(0.0);

    let manual_discount = input.manual_discount_percent.unwrap_or(0.0);
    let base_price = input.original_price.unwrap_or(input.price);

    debug!(
        product_id = %input.product_id,
        options_modifier,
        manual_discount,
        base_price,
        "[Reducer] Calculated input values"
    );

    // Calculate item price with matched rules
    let calc_result = calculate_item_price(base_price, options_modifier, manual_discount, &matched_rules);

    debug!(
        product_id = %input.product_id,
        calc_base = calc_result.base,
        calc_manual_discount_amount = calc_result.manual_discount_amount,
        calc_after_manual = calc_result.after_manual,
        calc_rule_discount_amount = calc_result.rule_discount_amount,
        calc_after_discount = calc_result.after_discount,
        calc_rule_surcharge_amount = calc_result.rule_surcharge_amount,
        calc_item_final = calc_result.item_final,
        applied_rules_count = calc_result.applied_rules.len(),
        "[Reducer] Price calculation result"
    );

    // Generate instance_id directly from CartItemInput
    // instance_id 完全基于 CartItemInput 字段生成，确保一致性
    let instance_id = generate_instance_id(input);

    CartItemSnapshot {
        id: input.product_id,
        instance_id,
        name: input.name.clone(),
        price: calc_result.item_final,
        original_price: input.original_price.unwrap_or(input.price),
        quantity: input.quantity,
        unpaid_quantity: input.quantity, // Initially all unpaid
        selected_options: input.selected_options.clone(),
        selected_specification: input.selected_specification.clone(),
        manual_discount_percent: input.manual_discount_percent,
        rule_discount_amount: if calc_result.rule_discount_amount > 0.0 {
            calc_result.rule_discount_amount
        } else {
            0.0
        },
        rule_surcharge_amount: if calc_result.rule_surcharge_amount > 0.0 {
            calc_result.rule_surcharge_amount
        } else {
            0.0
        },
        applied_rules: calc_result.applied_rules,
        applied_mg_rules: vec![],
        unit_price: 0.0,   // Computed by recalculate_totals
        line_total: 0.0,   // Computed by recalculate_totals
        tax: 0.0,          // Computed by recalculate_totals
        tax_rate: 0,       // Computed by recalculate_totals
        note: input.note.clone(),
        authorizer_id: input.authorizer_id,
        authorizer_name: input.authorizer_name.clone(),
        category_name: None,
        is_comped: false,
    }
}
