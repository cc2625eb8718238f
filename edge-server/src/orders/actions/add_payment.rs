//! AddPayment command handler
//!
//! Adds a payment to an existing order.

use async_trait::async_trait;

use crate::orders::money::{to_decimal, to_f64, MONEY_TOLERANCE};
use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use rust_decimal::Decimal;
use shared::order::{EventPayload, OrderEvent, OrderEventType, OrderStatus, PaymentInput};

/// AddPayment action
#[derive(Debug, Clone)]
pub struct AddPaymentAction {
    pub order_id: String,
    pub payment: PaymentInput,
}

#[async_trait]
impl CommandHandler for AddPaymentAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        // 1. Validate payment input (finite, positive, within bounds)
        crate::orders::money::validate_payment(&self.payment)?;

        // 2. Load existing snapshot
        let snapshot = ctx.load_snapshot(&self.order_id)?;

        // 3. Validate order status - must be Active
        match snapshot.status {
            OrderStatus::Active => {} // OK - continue with payment
            OrderStatus::Completed => {
                return Err(OrderError::OrderAlreadyCompleted(self.order_id.clone()));
            }
            OrderStatus::Void => {
                return Err(OrderError::OrderAlreadyVoided(self.order_id.clone()));
            }
            OrderStatus::Merged => {
                return Err(OrderError::InvalidOperation(format!(
                    "Cannot add payment to order with status {:?}",
                    snapshot.status
                )));
            }
        }

        // 4. Overpayment guard: reject if amount exceeds remaining
        let remaining = to_decimal(snapshot.total) - to_decimal(snapshot.paid_amount);
        if to_decimal(self.payment.amount) > remaining + MONEY_TOLERANCE {
            return Err(OrderError::InvalidOperation(format!(
                "Payment amount ({:.2}) exceeds remaining unpaid ({:.2})",
                self.payment.amount,
                to_f64(remaining)
            )));
        }

        // 5. Allocate sequence number
        let seq = ctx.next_sequence();

        // 6. Generate payment_id
        let payment_id = uuid::Uuid::new_v4().to_string();

        // 7. Validate tendered amount
        if let Some(t) = self.payment.tendered
            && to_decimal(t) < to_decimal(self.payment.amount) - MONEY_TOLERANCE {
                return Err(OrderError::InvalidOperation(format!(
                    "Tendered {:.2} is less than required {:.2}",
                    t, self.payment.amount
                )));
            }

        // 8. Calculate change for cash payments (using rust_decimal)
        let change = self.payment.tendered.map(|t| {
            let diff = to_decimal(t) - to_decimal(self.payment.amount);
            to_f64(diff.max(Decimal::ZERO))
        });

        // 9. Create event
        let event = OrderEvent::new(
            seq,
            self.order_id.clone(),
            metadata.operator_id.clone(),
            metadata.operator_name.clone(),
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            OrderEventType::PaymentAdded,
            EventPayload::PaymentAdded {
                payment_id,
                method: self.payment.method.clone(),
                amount: self.payment.amount,
                tendered: self.payment.tendered,
                change,
                note: self.payment.note.clone(),
            },
        );

        Ok(vec![event])
    }
}
