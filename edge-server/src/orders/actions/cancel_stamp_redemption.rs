//! CancelStampRedemption command handler
//!
//! Emits a single StampRedemptionCancelled event. The applier removes the reward
//! item and the stamp_redemption record from the snapshot.

use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use shared::order::types::CommandErrorCode;
use shared::order::{EventPayload, OrderEvent, OrderEventType, OrderStatus};

/// CancelStampRedemption action
#[derive(Debug, Clone)]
pub struct CancelStampRedemptionAction {
    pub order_id: String,
    pub stamp_activity_id: i64,
}

impl CommandHandler for CancelStampRedemptionAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        let snapshot = ctx.load_snapshot(&self.order_id)?;

        // Validate order status
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
                        "Cannot cancel stamp redemption on order with status: {:?}",
                        snapshot.status
                    ),
                ));
            }
        }

        // Find the redemption record
        let redemption = snapshot
            .stamp_redemptions
            .iter()
            .find(|r| r.stamp_activity_id == self.stamp_activity_id)
            .ok_or_else(|| {
                OrderError::InvalidOperation(
                    CommandErrorCode::StampRedemptionNotFound,
                    format!(
                        "No stamp redemption found for activity {} in this order",
                        self.stamp_activity_id
                    ),
                )
            })?;

        // Get the stamp activity name from the reward item
        let reward_item = snapshot
            .items
            .iter()
            .find(|i| i.instance_id == redemption.reward_instance_id);

        let stamp_activity_name = reward_item.map(|i| i.name.clone()).unwrap_or_default();

        let reward_instance_id = redemption.reward_instance_id.clone();
        let is_comp_existing = redemption.is_comp_existing;
        let comp_source_instance_id = redemption.comp_source_instance_id.clone();

        let event = OrderEvent::new(
            ctx.next_sequence(),
            self.order_id.clone(),
            metadata.operator_id,
            metadata.operator_name.clone(),
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            OrderEventType::StampRedemptionCancelled,
            EventPayload::StampRedemptionCancelled {
                stamp_activity_id: self.stamp_activity_id,
                stamp_activity_name,
                reward_instance_id,
                is_comp_existing,
                comp_source_instance_id,
            },
        );

        Ok(vec![event])
    }
}
