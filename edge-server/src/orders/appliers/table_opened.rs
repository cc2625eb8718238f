//! TableOpened event applier
//!
//! Applies the TableOpened event to create initial snapshot state.

use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot, OrderStatus};

/// TableOpened applier
pub struct TableOpenedApplier;

impl EventApplier for TableOpenedApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::TableOpened {
            table_id,
            table_name,
            zone_id,
            zone_name,
            guest_count,
            is_retail,
            receipt_number,
        } = &event.payload
        {
            // Set order_id from event (important for replay scenarios)
            snapshot.order_id = event.order_id.clone();
            snapshot.table_id = table_id.clone();
            snapshot.table_name = table_name.clone();
            snapshot.zone_id = zone_id.clone();
            snapshot.zone_name = zone_name.clone();
            snapshot.guest_count = *guest_count;
            snapshot.is_retail = *is_retail;
            snapshot.receipt_number = receipt_number.clone();
            snapshot.status = OrderStatus::Active;
            snapshot.start_time = event.timestamp;
            snapshot.created_at = event.timestamp;
            snapshot.updated_at = event.timestamp;
            snapshot.last_sequence = event.sequence;

            // Update checksum
            snapshot.update_checksum();
        }
    }
}
