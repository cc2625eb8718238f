//! StampRedeemed event applier
//!
//! Records the stamp redemption event. The actual item comp is handled
//! separately (the frontend/manager will issue a CompItem command for
//! the reward item after stamp redemption succeeds).

use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot};

/// StampRedeemed applier
pub struct StampRedeemedApplier;

impl EventApplier for StampRedeemedApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::StampRedeemed { .. } = &event.payload {
            // StampRedeemed is primarily a record event.
            // The actual comp of the reward item is done via a separate CompItem command.
            // We just update sequence and timestamp.
            snapshot.last_sequence = event.sequence;
            snapshot.updated_at = event.timestamp;

            // Update checksum
            snapshot.update_checksum();
        }
    }
}
