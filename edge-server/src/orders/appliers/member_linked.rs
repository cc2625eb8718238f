//! MemberLinked event applier
//!
//! Applies the MemberLinked event to set member info on the snapshot.
//! MG discount recalculation happens via recalculate_totals in the future
//! when MG rules are injected into items.

use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot};

/// MemberLinked applier
pub struct MemberLinkedApplier;

impl EventApplier for MemberLinkedApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::MemberLinked {
            member_id,
            member_name,
            marketing_group_id,
            marketing_group_name,
        } = &event.payload
        {
            snapshot.member_id = Some(*member_id);
            snapshot.member_name = Some(member_name.clone());
            snapshot.marketing_group_id = Some(*marketing_group_id);
            snapshot.marketing_group_name = Some(marketing_group_name.clone());

            // Update sequence and timestamp
            snapshot.last_sequence = event.sequence;
            snapshot.updated_at = event.timestamp;

            // Update checksum
            snapshot.update_checksum();
        }
    }
}
