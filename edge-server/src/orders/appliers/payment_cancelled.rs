//! PaymentCancelled event applier
//!
//! Applies the PaymentCancelled event to mark a payment as cancelled
//! and update the paid_amount.

use crate::orders::traits::EventApplier;
use shared::order::{EventPayload, OrderEvent, OrderSnapshot};

/// PaymentCancelled applier
pub struct PaymentCancelledApplier;

impl EventApplier for PaymentCancelledApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::PaymentCancelled {
            payment_id, reason, ..
        } = &event.payload
        {
            // Find the payment and mark it as cancelled
            if let Some(payment) = snapshot
                .payments
                .iter_mut()
                .find(|p| p.payment_id == *payment_id && !p.cancelled)
            {
                // Set cancelled flag
                payment.cancelled = true;
                payment.cancel_reason = reason.clone();

                // Subtract from paid_amount
                snapshot.paid_amount -= payment.amount;

                // Update sequence and timestamp
                snapshot.last_sequence = event.sequence;
                snapshot.updated_at = event.timestamp;

                // Update checksum
                snapshot.update_checksum();
            }
        }
    }
}
