//! UpdateOrderInfo command handler
//!
//! Updates order metadata such as guest count, table name, receipt number, etc.
//! Only applicable to orders in Active status.

use async_trait::async_trait;

use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use crate::utils::validation::{MAX_NAME_LEN, validate_order_optional_text};
use shared::order::types::CommandErrorCode;
use shared::order::{EventPayload, OrderEvent, OrderEventType, OrderStatus};

/// UpdateOrderInfo action
/// Note: receipt_number is immutable (set at OpenTable), not updatable here
#[derive(Debug, Clone)]
pub struct UpdateOrderInfoAction {
    pub order_id: String,
    pub guest_count: Option<i32>,
    pub table_name: Option<String>,
    pub is_pre_payment: Option<bool>,
}

#[async_trait]
impl CommandHandler for UpdateOrderInfoAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        // 1. Validate text lengths
        validate_order_optional_text(&self.table_name, "table_name", MAX_NAME_LEN)?;

        // 2. Load existing snapshot
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

        // 3. Validate that at least one field is being updated
        if self.guest_count.is_none() && self.table_name.is_none() && self.is_pre_payment.is_none()
        {
            return Err(OrderError::InvalidOperation(
                CommandErrorCode::NoFieldsToUpdate,
                "No fields to update".to_string(),
            ));
        }

        // 4. Validate guest_count if provided
        if let Some(count) = self.guest_count
            && count < 1
        {
            return Err(OrderError::InvalidOperation(
                CommandErrorCode::InvalidGuestCount,
                "guest_count must be at least 1".to_string(),
            ));
        }

        // 5. Allocate sequence number
        let seq = ctx.next_sequence();

        // 6. Create event
        let event = OrderEvent::new(
            seq,
            self.order_id.clone(),
            metadata.operator_id,
            metadata.operator_name.clone(),
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            OrderEventType::OrderInfoUpdated,
            EventPayload::OrderInfoUpdated {
                guest_count: self.guest_count,
                table_name: self.table_name.clone(),
                is_pre_payment: self.is_pre_payment,
            },
        );

        Ok(vec![event])
    }
}
