//! ItemUncomped event applier
//!
//! Applies the ItemUncomped event to reverse a comp.
//! If merged_into is Some, merges the comped item back into the source.
//! If merged_into is None, restores the item's price in place.

use crate::orders::money;
use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot};

/// ItemUncomped applier
pub struct ItemUncompedApplier;

impl EventApplier for ItemUncompedApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::ItemUncomped {
            instance_id,
            restored_price,
            merged_into,
            ..
        } = &event.payload
        {
            if let Some(source_id) = merged_into {
                // Merge back: find comped item and source item
                let comped_qty = snapshot
                    .items
                    .iter()
                    .find(|i| i.instance_id == *instance_id)
                    .map(|i| (i.quantity, i.unpaid_quantity));

                if let Some((qty, unpaid_qty)) = comped_qty {
                    // Add quantity back to source item
                    if let Some(source) = snapshot.items.iter_mut().find(|i| i.instance_id == *source_id) {
                        source.quantity += qty;
                        source.unpaid_quantity += unpaid_qty;
                    }

                    // Remove comped item from items array
                    snapshot.items.retain(|i| i.instance_id != *instance_id);
                }
            } else {
                // No merge: restore price in place
                if let Some(item) = snapshot.items.iter_mut().find(|i| i.instance_id == *instance_id) {
                    item.is_comped = false;
                    item.price = *restored_price;
                    // original_price stays as-is (it was the pre-comp price)
                }
            }

            // Remove CompRecord where instance_id matches
            snapshot.comps.retain(|c| c.instance_id != *instance_id);

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
