//! ModifyItem command handler
//!
//! Modifies an existing item in an order. Supports:
//! - Full modification (all items of same instance_id)
//! - Partial modification (splits item into unchanged + modified portions)
//!
//! Operations include: APPLY_DISCOUNT, MODIFY_PRICE, MODIFY_QUANTITY, MODIFY_ITEM

use async_trait::async_trait;

use crate::orders::reducer::generate_instance_id_from_parts;
use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use shared::order::{
    CartItemSnapshot, EventPayload, ItemChanges, ItemModificationResult, OrderEvent,
    OrderEventType, OrderStatus,
};

/// ModifyItem action
#[derive(Debug, Clone)]
pub struct ModifyItemAction {
    pub order_id: String,
    pub instance_id: String,
    pub affected_quantity: Option<i32>,
    pub changes: ItemChanges,
    pub authorizer_id: Option<i64>,
    pub authorizer_name: Option<String>,
}

#[async_trait]
impl CommandHandler for ModifyItemAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        // 1. Validate changes
        crate::orders::money::validate_item_changes(&self.changes)?;

        // 2. Load existing snapshot
        let snapshot = ctx.load_snapshot(&self.order_id)?;

        // 3. Validate order status
        match snapshot.status {
            OrderStatus::Completed => {
                return Err(OrderError::OrderAlreadyCompleted(self.order_id.clone()));
            }
            OrderStatus::Void => {
                return Err(OrderError::OrderAlreadyVoided(self.order_id.clone()));
            }
            _ => {}
        }

        // 4. Find the item
        let item = snapshot
            .items
            .iter()
            .find(|i| i.instance_id == self.instance_id)
            .ok_or_else(|| OrderError::ItemNotFound(self.instance_id.clone()))?;

        // 5. Reject modifications to comped items (locked)
        if item.is_comped {
            return Err(OrderError::InvalidOperation(
                "Cannot modify a comped item".to_string(),
            ));
        }

        // 6. Reject no-op modifications (all specified changes match current state)
        if !has_actual_changes(item, &self.changes) {
            return Err(OrderError::InvalidOperation(
                "No actual changes detected".to_string(),
            ));
        }

        // 7. Validate affected quantity
        let affected_qty = self.affected_quantity.unwrap_or(item.quantity);
        if affected_qty <= 0 {
            return Err(OrderError::InvalidOperation(
                "affected_quantity must be positive".to_string(),
            ));
        }
        if affected_qty > item.quantity {
            return Err(OrderError::InsufficientQuantity);
        }

        // 8. Validate quantity against paid amount
        if let Some(new_qty) = self.changes.quantity
            && new_qty <= 0
        {
            return Err(OrderError::InvalidOperation(
                "quantity must be positive".to_string(),
            ));
        }

        // 8b. Validate affected_qty doesn't exceed unpaid quantity
        //     (cannot modify already-paid portions via partial split)
        let paid_qty = snapshot
            .paid_item_quantities
            .get(&self.instance_id)
            .copied()
            .unwrap_or(0);
        if paid_qty > 0 && affected_qty > item.unpaid_quantity && affected_qty < item.quantity {
            return Err(OrderError::InvalidOperation(format!(
                "affected_quantity ({}) exceeds unpaid quantity ({})",
                affected_qty, item.unpaid_quantity
            )));
        }

        // 9. Calculate previous values for audit trail
        let previous_values = ItemChanges {
            price: if self.changes.price.is_some() {
                Some(item.price)
            } else {
                None
            },
            quantity: if self.changes.quantity.is_some() {
                Some(item.unpaid_quantity)
            } else {
                None
            },
            manual_discount_percent: if self.changes.manual_discount_percent.is_some() {
                item.manual_discount_percent
            } else {
                None
            },
            note: if self.changes.note.is_some() {
                item.note.clone()
            } else {
                None
            },
            selected_options: if self.changes.selected_options.is_some() {
                item.selected_options.clone()
            } else {
                None
            },
            selected_specification: if self.changes.selected_specification.is_some() {
                item.selected_specification.clone()
            } else {
                None
            },
        };

        // 10. Determine operation type for audit
        let operation = determine_operation(&self.changes);

        // 11. Calculate modification results (handle split scenario)
        let results = calculate_modification_results(item, affected_qty, &self.changes, paid_qty);

        // 12. Allocate sequence number
        let seq = ctx.next_sequence();

        // 13. Create event
        let event = OrderEvent::new(
            seq,
            self.order_id.clone(),
            metadata.operator_id,
            metadata.operator_name.clone(),
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            OrderEventType::ItemModified,
            EventPayload::ItemModified {
                operation: operation.to_string(),
                source: Box::new(item.clone()),
                affected_quantity: affected_qty,
                changes: Box::new(self.changes.clone()),
                previous_values: Box::new(previous_values),
                results,
                authorizer_id: self.authorizer_id,
                authorizer_name: self.authorizer_name.clone(),
            },
        );

        Ok(vec![event])
    }
}

/// Check if the changes contain any actual difference from the current item state.
///
/// Returns `false` (no-op) when all specified fields match current values.
/// Treats `None` and `Some(0.0)` as equivalent for discount.
fn has_actual_changes(item: &CartItemSnapshot, changes: &ItemChanges) -> bool {
    if let Some(price) = changes.price
        && (price - item.price).abs() > 0.01 {
            return true;
        }
    if let Some(qty) = changes.quantity
        && qty != item.unpaid_quantity {
            return true;
        }
    if let Some(discount) = changes.manual_discount_percent {
        let current = item.manual_discount_percent.unwrap_or(0.0);
        if (discount - current).abs() > 0.01 {
            return true;
        }
    }
    if let Some(ref note) = changes.note
        && item.note.as_ref() != Some(note) {
            return true;
        }
    if let Some(ref new_opts) = changes.selected_options {
        let current = item.selected_options.as_deref().unwrap_or(&[]);
        if new_opts.len() != current.len() {
            return true;
        }
        // Compare by (attribute_id, option_idx, quantity) tuples
        let mut new_keys: Vec<_> = new_opts
            .iter()
            .map(|o| (&o.attribute_id, o.option_idx, o.quantity))
            .collect();
        let mut cur_keys: Vec<_> = current
            .iter()
            .map(|o| (&o.attribute_id, o.option_idx, o.quantity))
            .collect();
        new_keys.sort();
        cur_keys.sort();
        if new_keys != cur_keys {
            return true;
        }
    }
    if let Some(ref new_spec) = changes.selected_specification {
        match &item.selected_specification {
            None => return true, // adding a spec is a change
            Some(curr) => {
                if new_spec.id != curr.id {
                    return true;
                }
                // Compare price (both optional)
                let new_p = new_spec.price.unwrap_or(0.0);
                let cur_p = curr.price.unwrap_or(0.0);
                if (new_p - cur_p).abs() > 0.01 {
                    return true;
                }
            }
        }
    }
    // All specified fields match current state, or no fields specified
    false
}

/// Determine the operation type based on changes
fn determine_operation(changes: &ItemChanges) -> &'static str {
    if changes.manual_discount_percent.is_some() {
        "APPLY_DISCOUNT"
    } else if changes.price.is_some() {
        "MODIFY_PRICE"
    } else if changes.quantity.is_some() {
        "MODIFY_QUANTITY"
    } else if changes.selected_options.is_some() || changes.selected_specification.is_some() {
        "MODIFY_OPTIONS"
    } else if changes.note.is_some() {
        "MODIFY_NOTE"
    } else {
        "MODIFY_ITEM"
    }
}

/// Calculate modification results, handling split scenario.
///
/// When `paid_qty > 0` and changes affect price/discount, the applier will split
/// the item into a frozen paid portion and a new unpaid portion. In this case,
/// generate a unique instance_id (with UUID suffix) for the new portion to avoid
/// hash collisions with previously frozen items that may share the same properties.
/// (Same pattern as comp: `{source}::comp::{uuid}`)
fn calculate_modification_results(
    item: &CartItemSnapshot,
    affected_qty: i32,
    changes: &ItemChanges,
    paid_qty: i32,
) -> Vec<ItemModificationResult> {
    let new_price = changes.price.unwrap_or(item.price);
    let new_discount = changes
        .manual_discount_percent
        .or(item.manual_discount_percent)
        .filter(|&d| d.abs() > 0.01);
    let new_options = changes
        .selected_options
        .as_ref()
        .or(item.selected_options.as_ref());
    let new_specification = changes
        .selected_specification
        .as_ref()
        .or(item.selected_specification.as_ref());

    // Generate base instance_id from item properties (deterministic hash)
    let base_id = generate_instance_id_from_parts(
        item.id,
        new_price,
        new_discount,
        &new_options.cloned(),
        &new_specification.cloned(),
    );

    // When item has paid portions AND price/discount is changing, the applier
    // will split: frozen paid portion keeps original instance_id, new unpaid
    // portion needs a unique ID to avoid collision with previously frozen items.
    let has_price_change =
        changes.price.is_some() || changes.manual_discount_percent.is_some();
    let new_instance_id = if paid_qty > 0 && has_price_change {
        format!("{}::mod::{}", base_id, uuid::Uuid::new_v4())
    } else {
        base_id
    };

    if affected_qty >= item.quantity {
        // Full modification
        vec![ItemModificationResult {
            instance_id: new_instance_id,
            quantity: item.quantity,
            price: new_price,
            manual_discount_percent: new_discount,
            action: "UPDATED".to_string(),
        }]
    } else {
        // Partial modification: split into unchanged + modified portions
        vec![
            // Unchanged portion (reduced quantity)
            ItemModificationResult {
                instance_id: item.instance_id.clone(),
                quantity: item.quantity - affected_qty,
                price: item.price,
                manual_discount_percent: item.manual_discount_percent,
                action: "UNCHANGED".to_string(),
            },
            // Modified portion (new item)
            ItemModificationResult {
                instance_id: new_instance_id,
                quantity: affected_qty,
                price: new_price,
                manual_discount_percent: new_discount,
                action: "CREATED".to_string(),
            },
        ]
    }
}
