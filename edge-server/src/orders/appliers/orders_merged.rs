//! OrderMerged and OrderMergedOut event appliers
//!
//! Handles the merge operation for both orders:
//! - OrderMerged: Target order receives items from source order
//! - OrderMergedOut: Source order is marked as Merged status

use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot, OrderStatus};

/// OrderMerged applier - applies to the target order
///
/// Adds items from the source order to the target order's items list.
pub struct OrderMergedApplier;

impl EventApplier for OrderMergedApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::OrderMerged { items, .. } = &event.payload {
            // Add merged items to the target order
            for item in items {
                snapshot.items.push(item.clone());
            }

            // Update sequence and timestamp
            snapshot.last_sequence = event.sequence;
            snapshot.updated_at = event.timestamp;

            // Update checksum
            snapshot.update_checksum();
        }
    }
}

/// OrderMergedOut applier - applies to the source order
///
/// Marks the source order as Merged status.
pub struct OrderMergedOutApplier;

impl EventApplier for OrderMergedOutApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::OrderMergedOut { .. } = &event.payload {
            // Mark order as merged
            snapshot.status = OrderStatus::Merged;

            // Update sequence and timestamp
            snapshot.last_sequence = event.sequence;
            snapshot.updated_at = event.timestamp;

            // Update checksum
            snapshot.update_checksum();
        }
    }
}
