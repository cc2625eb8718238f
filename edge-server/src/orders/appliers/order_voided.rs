//! OrderVoided event applier
//!
//! Applies the OrderVoided event to mark the order as voided.

use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot, OrderStatus};

/// OrderVoided applier
pub struct OrderVoidedApplier;

impl EventApplier for OrderVoidedApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::OrderVoided {
            reason: _,
            authorizer_id: _,
            authorizer_name: _,
        } = &event.payload
        {
            // Set status to Void
            snapshot.status = OrderStatus::Void;

            // Set end time (voided_at)
            snapshot.end_time = Some(event.timestamp);

            // Update sequence and timestamp
            snapshot.last_sequence = event.sequence;
            snapshot.updated_at = event.timestamp;

            // Update checksum
            snapshot.update_checksum();
        }
    }
}
