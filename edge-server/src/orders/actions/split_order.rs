//! SplitOrder command handler
//!
//! Splits an order by creating a partial payment for selected items.
//! Tracks which items have been paid and updates the paid amount.
//!
//! Two modes:
//! - **Item-based split (菜品分单)**: `split_amount` is None, backend calculates from items
//! - **Amount-based split (金额分单)**: `split_amount` is provided by frontend

use async_trait::async_trait;

use crate::orders::money::{calculate_unit_price, to_f64};
use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use rust_decimal::Decimal;
use shared::order::{EventPayload, OrderEvent, OrderEventType, OrderStatus, SplitItem};

/// SplitOrder action
#[derive(Debug, Clone)]
pub struct SplitOrderAction {
    pub order_id: String,
    /// Split amount (optional for item-based split, required for amount-based split)
    /// If None and items are provided, backend calculates from items
    pub split_amount: Option<f64>,
    pub payment_method: String,
    pub items: Vec<SplitItem>,
}

#[async_trait]
impl CommandHandler for SplitOrderAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        // 1. Load existing snapshot
        let snapshot = ctx.load_snapshot(&self.order_id)?;

        // 2. Validate order status - must be Active
        match snapshot.status {
            OrderStatus::Active => {}
            OrderStatus::Completed => {
                return Err(OrderError::OrderAlreadyCompleted(self.order_id.clone()));
            }
            OrderStatus::Void => {
                return Err(OrderError::OrderAlreadyVoided(self.order_id.clone()));
            }
            _ => {
                return Err(OrderError::OrderNotFound(self.order_id.clone()));
            }
        }

        // 3. Validate items exist in order and have sufficient quantity
        // Also calculate split amount from items if not provided
        let mut calculated_amount = Decimal::ZERO;
        for split_item in &self.items {
            let order_item = snapshot
                .items
                .iter()
                .find(|i| i.instance_id == split_item.instance_id)
                .ok_or_else(|| OrderError::ItemNotFound(split_item.instance_id.clone()))?;

            // Check if there's enough unpaid quantity
            let paid_qty = snapshot
                .paid_item_quantities
                .get(&split_item.instance_id)
                .copied()
                .unwrap_or(0);
            let available_qty = order_item.quantity - paid_qty;

            if split_item.quantity > available_qty {
                return Err(OrderError::InsufficientQuantity);
            }

            // Calculate amount for this item: unit_price * split_quantity
            let unit_price = calculate_unit_price(order_item);
            calculated_amount += unit_price * Decimal::from(split_item.quantity);
        }

        // 4. Determine final split amount
        let final_split_amount = if let Some(amount) = self.split_amount {
            // Amount-based split: use provided amount
            if amount <= 0.0 {
                return Err(OrderError::InvalidAmount);
            }
            amount
        } else if !self.items.is_empty() {
            // Item-based split: use calculated amount
            let amount = to_f64(calculated_amount);
            if amount <= 0.0 {
                return Err(OrderError::InvalidAmount);
            }
            amount
        } else {
            // No amount and no items
            return Err(OrderError::InvalidAmount);
        };

        // 5. Validate: cannot overpay (split_amount <= remaining unpaid)
        let remaining_unpaid = snapshot.total - snapshot.paid_amount;
        if final_split_amount > remaining_unpaid + 0.01 {
            // Allow small tolerance for rounding
            return Err(OrderError::InvalidOperation(format!(
                "Split amount ({:.2}) exceeds remaining unpaid ({:.2})",
                final_split_amount, remaining_unpaid
            )));
        }

        // 6. Allocate sequence number
        let seq = ctx.next_sequence();

        // 7. Create event
        let event = OrderEvent::new(
            seq,
            self.order_id.clone(),
            metadata.operator_id.clone(),
            metadata.operator_name.clone(),
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            OrderEventType::OrderSplit,
            EventPayload::OrderSplit {
                split_amount: final_split_amount,
                payment_method: self.payment_method.clone(),
                items: self.items.clone(),
            },
        );

        Ok(vec![event])
    }
}
