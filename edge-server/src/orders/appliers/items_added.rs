//! ItemsAdded event applier
//!
//! Applies the ItemsAdded event to add items to the snapshot.

use crate::orders::money;
use crate::orders::traits::EventApplier;
use shared::order::{CartItemSnapshot, EventPayload, OrderEvent, OrderSnapshot};

/// ItemsAdded applier
pub struct ItemsAddedApplier;

impl EventApplier for ItemsAddedApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::ItemsAdded { items } = &event.payload {
            // Add items to snapshot (merge if same instance_id exists)
            for item in items {
                add_or_merge_item(snapshot, item);
            }

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

/// Add item to snapshot, merging with existing item if instance_id matches
pub(crate) fn add_or_merge_item(snapshot: &mut OrderSnapshot, item: &CartItemSnapshot) {
    if let Some(existing) = snapshot
        .items
        .iter_mut()
        .find(|i| i.instance_id == item.instance_id)
    {
        // Merge by adding quantity
        existing.quantity += item.quantity;
        existing.unpaid_quantity += item.quantity;
    } else {
        // Add new item
        snapshot.items.push(item.clone());
    }
}
