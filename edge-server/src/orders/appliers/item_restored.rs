//! ItemRestored event applier
//!
//! Applies the ItemRestored event to restore a previously removed item.
//!
//! Note: In the current architecture, items are physically removed from the
//! snapshot when deleted (via ItemRemoved event). A full implementation would
//! require storing removed items elsewhere and retrieving them here.
//! This applier currently only updates sequence/timestamp as a placeholder
//! for future item tracking implementation.

use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot};

/// ItemRestored applier
pub struct ItemRestoredApplier;

impl EventApplier for ItemRestoredApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::ItemRestored {
            instance_id: _,
            item_name: _,
        } = &event.payload
        {
            // Note: In the current architecture, we cannot restore the item
            // because removed items are not tracked.
            // A full implementation would:
            // 1. Look up the removed item from a tracking store
            // 2. Add it back to snapshot.items
            // 3. Recalculate totals

            // For now, just update sequence and timestamp
            snapshot.last_sequence = event.sequence;
            snapshot.updated_at = event.timestamp;

            // Update checksum
            snapshot.update_checksum();
        }
    }
}
