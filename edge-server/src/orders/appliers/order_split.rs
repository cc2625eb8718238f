//! OrderSplit event applier
//!
//! Applies the OrderSplit event to track paid item quantities and update paid amount.
//! This is used for split bill payments where specific items are paid for.

use crate::orders::money::{self, to_decimal, to_f64};
use crate::orders::traits::EventApplier;
use shared::order::{CartItemSnapshot, EventPayload, OrderEvent, OrderSnapshot, PaymentRecord};

/// OrderSplit applier
pub struct OrderSplitApplier;

impl EventApplier for OrderSplitApplier {
    fn apply(&self, snapshot: &mut OrderSnapshot, event: &OrderEvent) {
        if let EventPayload::OrderSplit {
            split_amount,
            payment_method,
            items,
        } = &event.payload
        {
            // Track paid quantities for each item
            for split_item in items {
                *snapshot
                    .paid_item_quantities
                    .entry(split_item.instance_id.clone())
                    .or_insert(0) += split_item.quantity;
            }

            // Update paid amount using Decimal for precision
            snapshot.paid_amount = to_f64(to_decimal(snapshot.paid_amount) + to_decimal(*split_amount));

            // Create PaymentRecord for audit trail
            let item_names: Vec<&str> = items.iter().map(|i| i.name.as_str()).collect();
            let note = if items.is_empty() {
                None
            } else {
                Some(format!("Split: {}", item_names.join(", ")))
            };

            // Build split_items snapshot for restoration on cancel
            // Find each item in snapshot and create a snapshot with the split quantity
            let split_items: Vec<CartItemSnapshot> = items
                .iter()
                .filter_map(|split_item| {
                    snapshot
                        .items
                        .iter()
                        .find(|item| item.instance_id == split_item.instance_id)
                        .map(|item| {
                            let mut item_snapshot = item.clone();
                            // Set quantity to the split quantity (not the full item quantity)
                            item_snapshot.quantity = split_item.quantity;
                            item_snapshot.unpaid_quantity = 0; // These items are paid
                            item_snapshot
                        })
                })
                .collect();

            let payment = PaymentRecord {
                payment_id: format!("split-{}", event.event_id),
                method: payment_method.clone(),
                amount: *split_amount,
                tendered: None,
                change: None,
                note,
                timestamp: event.timestamp,
                cancelled: false,
                cancel_reason: None,
                split_items: if split_items.is_empty() {
                    None
                } else {
                    Some(split_items)
                },
            };
            snapshot.payments.push(payment);

            // Recalculate totals to update unpaid_quantity for each item
            money::recalculate_totals(snapshot);

            // Update sequence and timestamp
            snapshot.last_sequence = event.sequence;
            snapshot.updated_at = event.timestamp;

            // Update checksum
            snapshot.update_checksum();
        }
    }
}
