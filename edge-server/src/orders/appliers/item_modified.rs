//! ItemModified event applier
//!
//! Applies the ItemModified event to update items in the snapshot.
//! Handles both full modifications and split scenarios.

use crate::orders::money;
use crate::orders::traits::EventApplier;
use shared::order::{
    CartItemSnapshot, EventPayload, ItemChanges, ItemModificationResult, OrderEvent, OrderSnapshot,
};

/// ItemModified applier
pub struct ItemModifiedApplier;

impl EventApplier for ItemModifiedApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::ItemModified {
            source,
            affected_quantity,
            changes,
            results,
            ..
        } = &event.payload
        {
            apply_item_modified(snapshot, source, *affected_quantity, changes, results);

            // Update sequence and timestamp
            snapshot.last_sequence = event.sequence;
            snapshot.updated_at = event.timestamp;

            // Recalculate totals using precise decimal arithmetic
            money::recalculate_totals(snapshot);

            // Update checksum
            snapshot.update_checksum();
        }
    }
}

/// Apply item modification to snapshot
fn apply_item_modified(
    snapshot: &mut OrderSnapshot,
    source: &CartItemSnapshot,
    affected_quantity: i32,
    changes: &ItemChanges,
    results: &[ItemModificationResult],
) {
    // Find the source item
    if let Some(idx) = snapshot
        .items
        .iter()
        .position(|i| i.instance_id == source.instance_id)
    {
        let original_qty = snapshot.items[idx].quantity;

        // Check if this item has been partially paid (split bill)
        let paid_qty = snapshot
            .paid_item_quantities
            .get(&source.instance_id)
            .copied()
            .unwrap_or(0);

        if paid_qty > 0 && affected_quantity >= original_qty {
            // Item has been partially paid - need to split to preserve paid portion
            // 1. Keep paid portion with original instance_id (so split_items can find it)
            snapshot.items[idx].quantity = paid_qty;
            snapshot.items[idx].unpaid_quantity = 0;
            // Don't apply changes or update instance_id for paid portion

            // 2. Create new item for unpaid portion with modifications
            let unpaid_qty = original_qty - paid_qty;
            if unpaid_qty > 0
                && let Some(result) = results.iter().find(|r| r.action == "UPDATED") {
                    let mut new_item = source.clone();
                    new_item.instance_id = result.instance_id.clone();
                    new_item.quantity = unpaid_qty;
                    new_item.unpaid_quantity = unpaid_qty;
                    apply_changes_to_item(&mut new_item, changes);
                    snapshot.items.push(new_item);
                }
        } else if affected_quantity >= original_qty {
            // Full modification (no paid portion): update entire item in place
            apply_changes_to_item(&mut snapshot.items[idx], changes);

            // Update instance_id from results (it may have changed due to modifications)
            if let Some(result) = results.iter().find(|r| r.action == "UPDATED") {
                snapshot.items[idx].instance_id = result.instance_id.clone();
            }
        } else {
            // Partial modification (split scenario):
            // 1. Reduce original item quantity
            snapshot.items[idx].quantity = original_qty - affected_quantity;
            snapshot.items[idx].unpaid_quantity =
                (snapshot.items[idx].unpaid_quantity - affected_quantity).max(0);

            // 2. Create new item(s) from results
            for result in results {
                if result.action == "CREATED" {
                    // Create new item based on source with changes applied
                    let mut new_item = source.clone();
                    new_item.instance_id = result.instance_id.clone();
                    new_item.quantity = result.quantity;
                    new_item.unpaid_quantity = result.quantity;
                    new_item.price = result.price;
                    new_item.manual_discount_percent = result.manual_discount_percent;

                    // Apply additional changes (note, surcharge, options, specification)
                    if let Some(ref note) = changes.note {
                        new_item.note = Some(note.clone());
                    }
                    if let Some(surcharge) = changes.surcharge {
                        new_item.surcharge = Some(surcharge);
                    }
                    if let Some(ref options) = changes.selected_options {
                        new_item.selected_options = Some(options.clone());
                    }
                    if let Some(ref specification) = changes.selected_specification {
                        new_item.selected_specification = Some(specification.clone());
                    }

                    snapshot.items.push(new_item);
                }
            }
        }
    }
}

/// Apply changes to a single item
fn apply_changes_to_item(item: &mut CartItemSnapshot, changes: &ItemChanges) {
    if let Some(price) = changes.price {
        item.price = price;
    }
    if let Some(quantity) = changes.quantity {
        item.quantity = quantity;
        item.unpaid_quantity = quantity; // Reset unpaid quantity
    }
    if let Some(discount) = changes.manual_discount_percent {
        item.manual_discount_percent = Some(discount);
    }
    if let Some(surcharge) = changes.surcharge {
        item.surcharge = Some(surcharge);
    }
    if let Some(ref note) = changes.note {
        item.note = Some(note.clone());
    }
    if let Some(ref options) = changes.selected_options {
        item.selected_options = Some(options.clone());
    }
    if let Some(ref specification) = changes.selected_specification {
        item.selected_specification = Some(specification.clone());
    }
}
