//! OrderMovedOut event applier
//!
//! Marks the source order as Moved status when items have been moved to another table.

use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot, OrderStatus};

/// OrderMovedOut applier - applies to the source order
///
/// Marks the source order as Moved status when items have been transferred out.
pub struct OrderMovedOutApplier;

impl EventApplier for OrderMovedOutApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::OrderMovedOut { .. } = &event.payload {
            // Mark order as moved
            snapshot.status = OrderStatus::Moved;

            // Update sequence and timestamp
            snapshot.last_sequence = event.sequence;
            snapshot.updated_at = event.timestamp;

            // Update checksum
            snapshot.update_checksum();
        }
    }
}
