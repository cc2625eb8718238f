//! ItemComped event applier
//!
//! Applies the ItemComped event to mark an item as comped (gifted).
//! Handles both full comp and partial comp (split + mark).
//! Uses source_instance_id for deterministic replay.

use crate::orders::money;
use crate::orders::traits::EventApplier;
use shared::order::{CompRecord, EventPayload, OrderEvent, OrderSnapshot};

/// ItemComped applier
pub struct ItemCompedApplier;

impl EventApplier for ItemCompedApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::ItemComped {
            instance_id,
            source_instance_id,
            item_name,
            quantity,
            original_price,
            reason,
            authorizer_id,
            authorizer_name,
        } = &event.payload
        {
            let is_full_comp = instance_id == source_instance_id;

            if is_full_comp {
                // Full comp: find item by instance_id and mark as comped
                if let Some(item) = snapshot.items.iter_mut().find(|i| i.instance_id == *instance_id) {
                    // Save original_price if not already set
                    if item.original_price == 0.0 {
                        item.original_price = item.price;
                    }
                    item.is_comped = true;
                    item.price = 0.0;
                    // Keep applied_rules and manual_discount_percent intact:
                    // calculate_unit_price() returns 0 for comped items anyway,
                    // and preserving them allows correct restoration on uncomp.
                }
            } else {
                // Partial comp: find SOURCE item by source_instance_id (deterministic!)
                if let Some(source_idx) = snapshot
                    .items
                    .iter()
                    .position(|i| i.instance_id == *source_instance_id)
                {
                    let source = snapshot.items[source_idx].clone();

                    // Reduce source qty and unpaid_qty
                    snapshot.items[source_idx].quantity -= quantity;
                    snapshot.items[source_idx].unpaid_quantity =
                        (snapshot.items[source_idx].unpaid_quantity - quantity).max(0);

                    // Create new comped item as a split
                    // Clone preserves applied_rules and manual_discount_percent
                    // for correct restoration on uncomp.
                    let mut comped_item = source;
                    comped_item.instance_id = instance_id.to_string();
                    comped_item.quantity = *quantity;
                    comped_item.unpaid_quantity = *quantity;
                    comped_item.is_comped = true;
                    comped_item.price = 0.0;
                    comped_item.original_price = *original_price;

                    snapshot.items.push(comped_item);
                }
            }

            // Create CompRecord and push to snapshot.comps
            let comp_record = CompRecord {
                comp_id: event.event_id.clone(),
                instance_id: instance_id.clone(),
                source_instance_id: source_instance_id.clone(),
                item_name: item_name.clone(),
                quantity: *quantity,
                original_price: *original_price,
                reason: reason.clone(),
                authorizer_id: *authorizer_id,
                authorizer_name: authorizer_name.clone(),
                timestamp: event.timestamp,
            };
            snapshot.comps.push(comp_record);

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
