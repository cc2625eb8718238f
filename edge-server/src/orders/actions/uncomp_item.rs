//! UncompItem command handler
//!
//! Reverses a comp, restoring the item's original price.
//! If the source item still exists, the uncomped quantity is merged back.

use async_trait::async_trait;

use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use shared::order::types::CommandErrorCode;
use shared::order::{EventPayload, OrderEvent, OrderEventType, OrderStatus};

/// UncompItem action
#[derive(Debug, Clone)]
pub struct UncompItemAction {
    pub order_id: String,
    pub instance_id: String,
    pub authorizer_id: i64,
    pub authorizer_name: String,
}

#[async_trait]
impl CommandHandler for UncompItemAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        // 1. Load existing snapshot
        let snapshot = ctx.load_snapshot(&self.order_id)?;

        // 2. Validate order status
        match snapshot.status {
            OrderStatus::Active => {}
            OrderStatus::Completed => {
                return Err(OrderError::OrderAlreadyCompleted(self.order_id.clone()));
            }
            OrderStatus::Void => {
                return Err(OrderError::OrderAlreadyVoided(self.order_id.clone()));
            }
            _ => {
                return Err(OrderError::InvalidOperation(
                    CommandErrorCode::OrderNotActive,
                    format!(
                        "Cannot uncomp item on order with status: {:?}",
                        snapshot.status
                    ),
                ));
            }
        }

        // 3. Find the comped item
        let item = snapshot
            .items
            .iter()
            .find(|i| i.instance_id == self.instance_id)
            .ok_or_else(|| OrderError::ItemNotFound(self.instance_id.clone()))?;

        // 4. Item must be comped
        if !item.is_comped {
            return Err(OrderError::InvalidOperation(
                CommandErrorCode::ItemNotComped,
                "Item is not comped".to_string(),
            ));
        }

        let item_name = item.name.clone();

        // 5. Find the CompRecord for this instance_id
        let comp_record = snapshot
            .comps
            .iter()
            .find(|c| c.instance_id == self.instance_id)
            .ok_or_else(|| {
                OrderError::InvalidOperation(
                    CommandErrorCode::InternalError,
                    "CompRecord not found for this item".to_string(),
                )
            })?;

        let restored_price = comp_record.original_price;
        let source_instance_id = comp_record.source_instance_id.clone();

        // 6. Check if source item still exists (for merge-back)
        let merged_into = if source_instance_id != self.instance_id {
            // Partial comp case: check if source item exists
            if snapshot.items.iter().any(|i| i.instance_id == source_instance_id) {
                Some(source_instance_id)
            } else {
                None
            }
        } else {
            // Full comp case: no merge needed (item itself is the source)
            None
        };

        // 7. Generate event
        let seq = ctx.next_sequence();
        let event = OrderEvent::new(
            seq,
            self.order_id.clone(),
            metadata.operator_id,
            metadata.operator_name.clone(),
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            OrderEventType::ItemUncomped,
            EventPayload::ItemUncomped {
                instance_id: self.instance_id.clone(),
                item_name,
                restored_price,
                merged_into,
                authorizer_id: self.authorizer_id,
                authorizer_name: self.authorizer_name.clone(),
            },
        );

        Ok(vec![event])
    }
}
