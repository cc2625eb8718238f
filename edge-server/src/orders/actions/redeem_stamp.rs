//! RedeemStamp command handler
//!
//! Emits a single StampRedeemed event. The applier adds the reward item
//! (always as a new comped line) and records it in snapshot.stamp_redemptions.
//! MemberUnlinked applier reverses any pending redemptions.
//! Stamps are consumed only on order completion (track_stamps_on_completion).

use async_trait::async_trait;

use crate::marketing::stamp_tracker::{self, StampItemInfo};
use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use shared::models::{RewardStrategy, StampActivity, StampRewardTarget};
use shared::order::{EventPayload, OrderEvent, OrderEventType, OrderStatus};

/// Product info for the reward item (injected by OrdersManager)
#[derive(Debug, Clone)]
pub struct RewardProductInfo {
    pub product_id: i64,
    pub name: String,
    pub price: f64,
    pub tax_rate: i32,
    pub category_id: Option<i64>,
    pub category_name: Option<String>,
}

/// RedeemStamp action
#[derive(Debug, Clone)]
pub struct RedeemStampAction {
    pub order_id: String,
    pub stamp_activity_id: i64,
    /// Selection mode product_id (Eco/Gen selection or Designated)
    pub product_id: Option<i64>,
    /// Match mode: comp an existing item instead of adding a new one
    pub comp_existing_instance_id: Option<String>,
    /// Injected by OrdersManager
    pub activity: StampActivity,
    /// Injected by OrdersManager
    pub reward_targets: Vec<StampRewardTarget>,
    /// Product info for the reward (injected by OrdersManager)
    pub reward_product_info: Option<RewardProductInfo>,
}

#[async_trait]
impl CommandHandler for RedeemStampAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        // 1. Load snapshot
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
                return Err(OrderError::InvalidOperation(format!(
                    "Cannot redeem stamp on order with status: {:?}",
                    snapshot.status
                )));
            }
        }

        // 3. Must have a member linked
        if snapshot.member_id.is_none() {
            return Err(OrderError::InvalidOperation(
                "Must have a member linked to redeem stamps".to_string(),
            ));
        }

        // 4. Check this activity hasn't already been redeemed in this order
        if snapshot
            .stamp_redemptions
            .iter()
            .any(|r| r.stamp_activity_id == self.stamp_activity_id)
        {
            return Err(OrderError::InvalidOperation(format!(
                "Stamp activity {} already redeemed in this order",
                self.stamp_activity_id
            )));
        }

        // 5. Resolve reward product info based on mode
        //
        // Three modes:
        // A) Match mode (comp_existing_instance_id = Some): comp an existing order item
        // B) Selection mode (product_id = Some, Eco/Gen): add a new item from reward_targets
        // C) Direct mode (Designated): add the designated product
        // D) Auto-match mode (Eco/Gen, no product_id, no comp_existing): find best match from order

        let comp_existing = self.comp_existing_instance_id.clone();

        let (info, reward_instance_id) = if let Some(ref existing_id) = comp_existing {
            // Match mode: comp an existing item
            let item = snapshot
                .items
                .iter()
                .find(|i| i.instance_id == *existing_id)
                .ok_or_else(|| {
                    OrderError::InvalidOperation(format!(
                        "Item {} not found in order",
                        existing_id
                    ))
                })?;

            if item.is_comped {
                return Err(OrderError::InvalidOperation(format!(
                    "Item {} is already comped",
                    existing_id
                )));
            }

            // Validate the item matches reward_targets
            let matches_target = self.reward_targets.iter().any(|t| match t.target_type {
                shared::models::StampTargetType::Product => t.target_id == item.id,
                shared::models::StampTargetType::Category => {
                    item.category_id == Some(t.target_id)
                }
            });
            if !matches_target {
                return Err(OrderError::InvalidOperation(
                    "Item does not match reward targets".to_string(),
                ));
            }

            let product_info = RewardProductInfo {
                product_id: item.id,
                name: item.name.clone(),
                price: item.original_price,
                tax_rate: item.tax_rate,
                category_id: item.category_id,
                category_name: item.category_name.clone(),
            };
            // Use existing item's instance_id as reward_instance_id
            (product_info, existing_id.clone())
        } else if self.product_id.is_some() && self.activity.reward_strategy != RewardStrategy::Designated {
            // Selection mode (Eco/Gen + explicit product_id): add a new item
            let info = self.reward_product_info.clone().ok_or_else(|| {
                OrderError::InvalidOperation(
                    "Product info not available for selection mode".to_string(),
                )
            })?;
            let rid = format!("stamp_reward::{}", metadata.command_id);
            (info, rid)
        } else if self.activity.reward_strategy == RewardStrategy::Designated {
            // Direct mode: designated product
            let product_id = self
                .product_id
                .or(self.activity.designated_product_id)
                .ok_or_else(|| {
                    OrderError::InvalidOperation(
                        "Designated strategy requires a product_id".to_string(),
                    )
                })?;
            let info = self.reward_product_info.clone().ok_or_else(|| {
                OrderError::InvalidOperation(format!(
                    "Product info not available for designated product {}",
                    product_id
                ))
            })?;
            let rid = format!("stamp_reward::{}", metadata.command_id);
            (info, rid)
        } else {
            // Auto-match mode (Eco/Gen, no explicit selection): find best match from order
            let items_with_category: Vec<StampItemInfo<'_>> = snapshot
                .items
                .iter()
                .map(|item| StampItemInfo {
                    item,
                    category_id: item.category_id,
                })
                .collect();

            let found_id = stamp_tracker::find_reward_item(
                &items_with_category,
                &self.reward_targets,
                &self.activity.reward_strategy,
            )
            .ok_or_else(|| {
                OrderError::InvalidOperation(
                    "No qualifying item found for stamp reward".to_string(),
                )
            })?;

            let item = snapshot
                .items
                .iter()
                .find(|i| i.instance_id == found_id)
                .ok_or_else(|| {
                    OrderError::InvalidOperation(
                        "Reward item not found in snapshot".to_string(),
                    )
                })?;

            let product_info = RewardProductInfo {
                product_id: item.id,
                name: item.name.clone(),
                price: item.original_price,
                tax_rate: item.tax_rate,
                category_id: item.category_id,
                category_name: item.category_name.clone(),
            };
            let rid = format!("stamp_reward::{}", metadata.command_id);
            (product_info, rid)
        };

        let comp_qty = self.activity.reward_quantity;

        let strategy_str = serde_json::to_value(&self.activity.reward_strategy)
            .ok()
            .and_then(|v| v.as_str().map(String::from))
            .unwrap_or_default();

        // 6. Generate single StampRedeemed event
        let event = OrderEvent::new(
            ctx.next_sequence(),
            self.order_id.clone(),
            metadata.operator_id,
            metadata.operator_name.clone(),
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            OrderEventType::StampRedeemed,
            EventPayload::StampRedeemed {
                stamp_activity_id: self.stamp_activity_id,
                stamp_activity_name: self.activity.display_name.clone(),
                reward_instance_id,
                reward_strategy: strategy_str,
                product_id: info.product_id,
                product_name: info.name.clone(),
                original_price: info.price,
                quantity: comp_qty,
                tax_rate: info.tax_rate,
                category_id: info.category_id,
                category_name: info.category_name.clone(),
                comp_existing_instance_id: comp_existing,
            },
        );

        Ok(vec![event])
    }
}
