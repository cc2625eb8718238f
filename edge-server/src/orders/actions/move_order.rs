//! MoveOrder command handler
//!
//! Moves an order from one table to another, optionally changing zone.
//! Only applicable to orders in Active status.

use async_trait::async_trait;

use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use shared::order::{EventPayload, OrderEvent, OrderEventType, OrderStatus};

/// MoveOrder action
#[derive(Debug, Clone)]
pub struct MoveOrderAction {
    pub order_id: String,
    pub target_table_id: String,
    pub target_table_name: String,
    pub target_zone_id: Option<String>,
    pub target_zone_name: Option<String>,
}

#[async_trait]
impl CommandHandler for MoveOrderAction {
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

        // 3. Validate target table is not occupied by another order
        if let Some(existing_order_id) = ctx.find_active_order_for_table(&self.target_table_id)? {
            // Allow moving to the same table (no-op case)
            if existing_order_id != self.order_id {
                return Err(OrderError::TableOccupied(format!(
                    "目标桌台 {} 已被占用 (订单: {})",
                    self.target_table_name, existing_order_id
                )));
            }
        }

        // 4. Get source table info from snapshot
        let source_table_id = snapshot.table_id.clone().unwrap_or_default();
        let source_table_name = snapshot.table_name.clone().unwrap_or_default();

        // 5. Allocate sequence number
        let seq = ctx.next_sequence();

        // 6. Create event
        let event = OrderEvent::new(
            seq,
            self.order_id.clone(),
            metadata.operator_id.clone(),
            metadata.operator_name.clone(),
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            OrderEventType::OrderMoved,
            EventPayload::OrderMoved {
                source_table_id,
                source_table_name,
                target_table_id: self.target_table_id.clone(),
                target_table_name: self.target_table_name.clone(),
                items: snapshot.items.clone(),
            },
        );

        Ok(vec![event])
    }
}
