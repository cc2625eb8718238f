//! AddOrderNote command handler
//!
//! Adds or clears an order-level note. Replaces the previous note (not append).
//! Empty string clears the note. No authorization required.

use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use crate::utils::validation::{MAX_NOTE_LEN, validate_order_text};
use shared::order::types::CommandErrorCode;
use shared::order::{EventPayload, OrderEvent, OrderEventType, OrderStatus};

/// AddOrderNote action
#[derive(Debug, Clone)]
pub struct AddOrderNoteAction {
    pub order_id: String,
    pub note: String,
}

impl CommandHandler for AddOrderNoteAction {
    fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        // 1. Validate text length (empty string is allowed — it clears the note)
        if !self.note.is_empty() {
            validate_order_text(&self.note, "note", MAX_NOTE_LEN)?;
        }

        // 2. Load existing snapshot
        let snapshot = ctx.load_snapshot(&self.order_id)?;

        // 3. Validate order status - must be Active
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
                        "Cannot add note to order with status: {:?}",
                        snapshot.status
                    ),
                ));
            }
        }

        // 4. Capture previous note for audit trail
        let previous_note = snapshot.note.clone();

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
            OrderEventType::OrderNoteAdded,
            EventPayload::OrderNoteAdded {
                note: self.note.clone(),
                previous_note,
            },
        );

        Ok(vec![event])
    }
}
