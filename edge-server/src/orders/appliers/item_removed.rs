//! ItemRemoved event applier
//!
//! Applies the ItemRemoved event to remove or reduce item quantity in the snapshot.
//! Handles both full removal and partial removal.
//!
//! Note: In the current implementation, items are physically removed from the
//! snapshot (or their quantity is reduced). For full audit trail support,
//! a future enhancement could mark items as "voided" instead.

use crate::order_money;
use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot};

/// ItemRemoved applier
pub struct ItemRemovedApplier;

impl EventApplier for ItemRemovedApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::ItemRemoved {
            instance_id,
            quantity,
            ..
        } = &event.payload
        {
            apply_item_removed(snapshot, instance_id, *quantity);

            // Update sequence and timestamp
            snapshot.last_sequence = event.sequence;
            snapshot.updated_at = event.timestamp;

            // Recalculate totals using precise decimal arithmetic
            order_money::recalculate_totals(snapshot);

            // Update checksum
            snapshot.update_checksum();
        }
    }
}

/// Apply item removal to snapshot
///
/// Removes only the FIRST matching item by index, not all items with the same
/// instance_id. This is important because duplicate instance_ids can exist
/// transiently (e.g., after discount cycling + payment cancellation).
fn apply_item_removed(snapshot: &mut OrderSnapshot, instance_id: &str, quantity: Option<i32>) {
    let Some(idx) = snapshot
        .items
        .iter()
        .position(|i| i.instance_id == instance_id)
    else {
        return;
    };

    if let Some(qty) = quantity {
        // Partial removal: reduce quantity
        snapshot.items[idx].quantity = (snapshot.items[idx].quantity - qty).max(0);
        snapshot.items[idx].unpaid_quantity = (snapshot.items[idx].unpaid_quantity - qty).max(0);

        // If quantity reaches 0, remove this specific item
        if snapshot.items[idx].quantity == 0 {
            snapshot.items.remove(idx);
        }
    } else {
        // Full removal: remove this specific item (not all with same instance_id)
        snapshot.items.remove(idx);
    }

    // Clean up paid_item_quantities if no items with this instance_id remain
    if !snapshot.items.iter().any(|i| i.instance_id == instance_id) {
        snapshot.paid_item_quantities.remove(instance_id);
    }
}
