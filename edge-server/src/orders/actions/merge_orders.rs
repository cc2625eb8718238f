//! MergeOrders command handler
//!
//! Merges items and payments from source order into target order.
//! Source order is marked as Merged status. Generates two events:
//! - OrderMergedOut for the source order
//! - OrderMerged for the target order

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::orders::money::to_decimal;
use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use shared::order::{EventPayload, OrderEvent, OrderEventType, OrderStatus};

/// MergeOrders action
#[derive(Debug, Clone)]
pub struct MergeOrdersAction {
    pub source_order_id: String,
    pub target_order_id: String,
    pub authorizer_id: Option<String>,
    pub authorizer_name: Option<String>,
}

#[async_trait]
impl CommandHandler for MergeOrdersAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        // 1. Load source snapshot
        let source_snapshot = ctx.load_snapshot(&self.source_order_id)?;

        // 2. Validate source order status - must be Active
        match source_snapshot.status {
            OrderStatus::Active => {}
            OrderStatus::Completed => {
                return Err(OrderError::OrderAlreadyCompleted(
                    self.source_order_id.clone(),
                ));
            }
            OrderStatus::Void => {
                return Err(OrderError::OrderAlreadyVoided(self.source_order_id.clone()));
            }
            OrderStatus::Merged => {
                return Err(OrderError::InvalidOperation(format!(
                    "Source order {} is already merged",
                    self.source_order_id
                )));
            }
            _ => {
                return Err(OrderError::OrderNotFound(self.source_order_id.clone()));
            }
        }

        // 3. Load target snapshot
        let target_snapshot = ctx.load_snapshot(&self.target_order_id)?;

        // 4. Validate target order status - must be Active
        match target_snapshot.status {
            OrderStatus::Active => {}
            OrderStatus::Completed => {
                return Err(OrderError::OrderAlreadyCompleted(
                    self.target_order_id.clone(),
                ));
            }
            OrderStatus::Void => {
                return Err(OrderError::OrderAlreadyVoided(self.target_order_id.clone()));
            }
            OrderStatus::Merged => {
                return Err(OrderError::InvalidOperation(format!(
                    "Target order {} is already merged",
                    self.target_order_id
                )));
            }
            _ => {
                return Err(OrderError::OrderNotFound(self.target_order_id.clone()));
            }
        }

        // 5. Cannot merge order into itself
        if self.source_order_id == self.target_order_id {
            return Err(OrderError::InvalidOperation(
                "Cannot merge order into itself".to_string(),
            ));
        }

        // 6. Reject if either order has payments
        if to_decimal(source_snapshot.paid_amount) > Decimal::ZERO {
            return Err(OrderError::InvalidOperation(
                "存在支付记录的订单不能合并".to_string(),
            ));
        }
        if to_decimal(target_snapshot.paid_amount) > Decimal::ZERO {
            return Err(OrderError::InvalidOperation(
                "目标订单存在支付记录，不能合并".to_string(),
            ));
        }

        // 7. Reject if either order has active AA split
        if source_snapshot.aa_total_shares.is_some() {
            return Err(OrderError::InvalidOperation(
                "源订单存在 AA 分单，不能合并".to_string(),
            ));
        }
        if target_snapshot.aa_total_shares.is_some() {
            return Err(OrderError::InvalidOperation(
                "目标订单存在 AA 分单，不能合并".to_string(),
            ));
        }

        // 9. Extract table info
        let source_table_id = source_snapshot.table_id.clone().unwrap_or_default();
        let source_table_name = source_snapshot.table_name.clone().unwrap_or_default();
        let target_table_id = target_snapshot.table_id.clone().unwrap_or_default();
        let target_table_name = target_snapshot.table_name.clone().unwrap_or_default();

        // 10. Allocate sequence numbers for both events
        let seq1 = ctx.next_sequence();
        let seq2 = ctx.next_sequence();

        // 11. Create OrderMergedOut event for source order
        let event1 = OrderEvent::new(
            seq1,
            self.source_order_id.clone(),
            metadata.operator_id.clone(),
            metadata.operator_name.clone(),
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            OrderEventType::OrderMergedOut,
            EventPayload::OrderMergedOut {
                target_table_id: target_table_id.clone(),
                target_table_name: target_table_name.clone(),
                reason: None,
                authorizer_id: self.authorizer_id.clone(),
                authorizer_name: self.authorizer_name.clone(),
            },
        );

        // 12. Create OrderMerged event for target order (includes source items)
        let event2 = OrderEvent::new(
            seq2,
            self.target_order_id.clone(),
            metadata.operator_id.clone(),
            metadata.operator_name.clone(),
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            OrderEventType::OrderMerged,
            EventPayload::OrderMerged {
                source_table_id,
                source_table_name,
                items: source_snapshot.items.clone(),
                payments: source_snapshot.payments.clone(),
                paid_item_quantities: source_snapshot.paid_item_quantities.clone(),
                paid_amount: source_snapshot.paid_amount,
                has_amount_split: source_snapshot.has_amount_split,
                aa_total_shares: source_snapshot.aa_total_shares,
                aa_paid_shares: source_snapshot.aa_paid_shares,
                authorizer_id: self.authorizer_id.clone(),
                authorizer_name: self.authorizer_name.clone(),
            },
        );

        Ok(vec![event1, event2])
    }
}
