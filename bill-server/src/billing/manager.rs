//! Bill Lifecycle Manager
//!
//! Orchestrates the bill lifecycle: create with id and hash allocation,
//! full-replacement update, the trash round trip, permanent purge, the
//! legacy hash migration and share payload construction. Handlers stay
//! thin; every state transition and its validation lives here.

use shared::models::{Bill, BillCreate, BillItem, BillUpdate, Customer, TrashedBill};
use shared::util::now_millis;

use crate::db::repository::{
    BillRepository, CustomerRepository, OldBillRepository, ShopRepository, TrashRepository,
};
use crate::utils::{AppError, AppResult, money, validation};

use super::share::{self, SharePayload};
use super::{BillNumberAllocator, HashAllocator};

/// Validate the mutable field set shared by create and update
fn validate_bill_fields(
    customer_name: &str,
    customer_phone: &str,
    items: &[BillItem],
    total_amount: f64,
) -> AppResult<()> {
    validation::validate_required_text(customer_name, "customer_name", validation::MAX_NAME_LEN)?;
    validation::validate_phone(customer_phone, "customer_phone")?;

    if items.is_empty() {
        return Err(AppError::validation("Bill must contain at least one item"));
    }
    for item in items {
        money::validate_bill_item(item)?;
        validation::validate_optional_text(
            &item.custom_label,
            "custom_label",
            validation::MAX_NAME_LEN,
        )?;
    }

    if !money::totals_match(total_amount, items) {
        return Err(AppError::validation(format!(
            "total_amount {:.2} does not match the item total {:.2}",
            total_amount,
            money::to_f64(money::items_total(items))
        )));
    }
    Ok(())
}

#[derive(Clone)]
pub struct BillManager {
    bills: BillRepository,
    trash: TrashRepository,
    old_bills: OldBillRepository,
    customers: CustomerRepository,
    shop: ShopRepository,
    numbers: BillNumberAllocator,
    hashes: HashAllocator,
    public_base_url: String,
    country_code: String,
}

impl BillManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        bills: BillRepository,
        trash: TrashRepository,
        old_bills: OldBillRepository,
        customers: CustomerRepository,
        shop: ShopRepository,
        numbers: BillNumberAllocator,
        hashes: HashAllocator,
        public_base_url: String,
        country_code: String,
    ) -> Self {
        Self {
            bills,
            trash,
            old_bills,
            customers,
            shop,
            numbers,
            hashes,
            public_base_url,
            country_code,
        }
    }

    /// Create a bill: validate, allocate id and hash, record the customer,
    /// persist.
    ///
    /// The customer upsert runs before the bill write. If the bill write
    /// then fails the customer record stands, which is harmless: it carries
    /// no balance, only a name for autocomplete.
    pub async fn create(&self, data: BillCreate) -> AppResult<Bill> {
        validate_bill_fields(
            &data.customer_name,
            &data.customer_phone,
            &data.items,
            data.total_amount,
        )?;

        let id = self.numbers.allocate(data.date).await?;
        let url_hash = self.hashes.allocate().await?;

        self.customers
            .upsert(Customer {
                name: data.customer_name.trim().to_string(),
                phone: data.customer_phone.clone(),
            })
            .await?;

        let bill = self
            .bills
            .create(Bill {
                id: Some(id.clone()),
                url_hash,
                date: data.date,
                customer_name: data.customer_name,
                customer_phone: data.customer_phone,
                items: data.items,
                total_amount: data.total_amount,
                payment_mode: data.payment_mode,
                created_at: now_millis(),
            })
            .await?;

        tracing::info!(bill_id = %id, total = bill.total_amount, "Bill created");
        Ok(bill)
    }

    /// Replace the mutable field set of an existing bill.
    ///
    /// `id`, `url_hash` and `created_at` are carried over from the stored
    /// record. The id keeps its original date prefix even when the business
    /// date moves to another day.
    pub async fn update(&self, id: &str, data: BillUpdate) -> AppResult<Bill> {
        let existing = self
            .bills
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Bill {} not found", id)))?;

        validate_bill_fields(
            &data.customer_name,
            &data.customer_phone,
            &data.items,
            data.total_amount,
        )?;

        self.customers
            .upsert(Customer {
                name: data.customer_name.trim().to_string(),
                phone: data.customer_phone.clone(),
            })
            .await?;

        let bill = self
            .bills
            .replace(
                id,
                Bill {
                    id: existing.id,
                    url_hash: existing.url_hash,
                    date: data.date,
                    customer_name: data.customer_name,
                    customer_phone: data.customer_phone,
                    items: data.items,
                    total_amount: data.total_amount,
                    payment_mode: data.payment_mode,
                    created_at: existing.created_at,
                },
            )
            .await?;

        tracing::info!(bill_id = %id, "Bill updated");
        Ok(bill)
    }

    /// Move a bill to the trash. Its id and hash stay reserved.
    pub async fn trash(&self, id: &str) -> AppResult<TrashedBill> {
        let bill = self
            .bills
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Bill {} not found", id)))?;

        let trashed = self.trash.trash_bill(bill).await?;
        tracing::info!(bill_id = %id, "Bill moved to trash");
        Ok(trashed)
    }

    /// Move a trashed bill back to the active table under its original id.
    pub async fn restore(&self, id: &str) -> AppResult<Bill> {
        let bill = self.trash.restore(id).await?;
        tracing::info!(bill_id = %id, "Bill restored from trash");
        Ok(bill)
    }

    /// Permanently delete a trashed bill. Irreversible.
    pub async fn purge(&self, id: &str) -> AppResult<()> {
        self.trash.purge(id).await?;
        tracing::info!(bill_id = %id, "Trashed bill purged");
        Ok(())
    }

    /// Issue lookup hashes to active bills that predate the hash scheme.
    ///
    /// Each migrated bill is also copied into the legacy table under its
    /// id, keeping bookmarked id-based links resolvable. Returns the number
    /// of bills migrated.
    pub async fn migrate_legacy(&self) -> AppResult<usize> {
        let pending = self.bills.find_missing_hash().await?;
        let mut migrated = 0usize;

        for mut bill in pending {
            let Some(id) = bill.id.clone() else {
                continue;
            };
            let hash = self.hashes.allocate().await?;
            self.bills.set_hash(&id, &hash).await?;
            bill.url_hash = hash;
            self.old_bills.upsert(bill).await?;
            migrated += 1;
            tracing::info!(bill_id = %id, "Legacy bill migrated");
        }

        if migrated > 0 {
            tracing::info!(count = migrated, "Legacy hash migration complete");
        }
        Ok(migrated)
    }

    /// Build the share message and deep links for a bill.
    ///
    /// Construction only. The client opens the links after the user
    /// confirms the send, so nothing here mutates bill state.
    pub async fn share_payload(&self, id: &str) -> AppResult<SharePayload> {
        let bill = self
            .bills
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Bill {} not found", id)))?;

        let shop = self.shop.get_or_create().await?;
        tracing::info!(bill_id = %id, "Share payload built");
        Ok(share::build_payload(
            &bill,
            &shop,
            &self.public_base_url,
            &self.country_code,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::models::ItemKind;

    fn items() -> Vec<BillItem> {
        vec![BillItem {
            kind: ItemKind::Saree,
            custom_label: None,
            unit_price: 1500.0,
            quantity: 2,
        }]
    }

    #[test]
    fn accepts_a_well_formed_bill() {
        assert!(validate_bill_fields("Asha", "9876543210", &items(), 3000.0).is_ok());
    }

    #[test]
    fn rejects_blank_name_and_short_phone() {
        assert!(validate_bill_fields("", "9876543210", &items(), 3000.0).is_err());
        assert!(validate_bill_fields("Asha", "98765", &items(), 3000.0).is_err());
    }

    #[test]
    fn rejects_empty_item_list() {
        let err = validate_bill_fields("Asha", "9876543210", &[], 0.0).unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[test]
    fn rejects_total_that_disagrees_with_items() {
        assert!(validate_bill_fields("Asha", "9876543210", &items(), 2999.0).is_err());
        // Within the one paisa tolerance
        assert!(validate_bill_fields("Asha", "9876543210", &items(), 3000.01).is_ok());
    }

    #[test]
    fn rejects_oversized_custom_label() {
        let mut bad = items();
        bad[0].custom_label = Some("x".repeat(201));
        assert!(validate_bill_fields("Asha", "9876543210", &bad, 3000.0).is_err());
    }
}
