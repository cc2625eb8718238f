//! TableReassigned event applier
//!
//! Updates table and zone information when an order is reassigned to a different table.

use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot};

/// TableReassigned applier
///
/// Updates table_id, table_name, and optionally zone_name when the order
/// is reassigned to a different table.
pub struct TableReassignedApplier;

impl EventApplier for TableReassignedApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::TableReassigned {
            target_table_id,
            target_table_name,
            target_zone_name,
            ..
        } = &event.payload
        {
            // Update table information to the target
            snapshot.table_id = Some(target_table_id.clone());
            snapshot.table_name = Some(target_table_name.clone());

            // Update zone name if provided
            if let Some(zone_name) = target_zone_name {
                snapshot.zone_name = Some(zone_name.clone());
            }

            // Update sequence and timestamp
            snapshot.last_sequence = event.sequence;
            snapshot.updated_at = event.timestamp;

            // Update checksum
            snapshot.update_checksum();
        }
    }
}
