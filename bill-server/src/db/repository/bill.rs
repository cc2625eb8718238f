//! Bill Repository
//!
//! Active bills are keyed by their date-prefixed sequential id. Lookups by
//! `url_hash` serve the public resolver; the aggregation query serves the
//! sales analytics endpoint.

use super::{BaseRepository, RepoError, RepoResult};
use shared::models::{Bill, SalesSummary};
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const TABLE: &str = "bill";

#[derive(Clone)]
pub struct BillRepository {
    base: BaseRepository,
}

impl BillRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find all active bills, newest business date first
    pub async fn find_all(&self) -> RepoResult<Vec<Bill>> {
        let bills: Vec<Bill> = self
            .base
            .db()
            .query("SELECT * FROM bill ORDER BY date DESC, created_at DESC")
            .await?
            .take(0)?;
        Ok(bills)
    }

    /// Find bills whose business date falls within `[start, end)` (millis)
    pub async fn find_in_range(&self, start: i64, end: i64) -> RepoResult<Vec<Bill>> {
        let bills: Vec<Bill> = self
            .base
            .db()
            .query(
                "SELECT * FROM bill WHERE date >= $start AND date < $end \
                 ORDER BY date DESC, created_at DESC",
            )
            .bind(("start", start))
            .bind(("end", end))
            .await?
            .take(0)?;
        Ok(bills)
    }

    /// Find bills for a customer phone, newest first
    pub async fn find_by_customer(&self, phone: &str) -> RepoResult<Vec<Bill>> {
        let phone_owned = phone.to_string();
        let bills: Vec<Bill> = self
            .base
            .db()
            .query(
                "SELECT * FROM bill WHERE customer_phone = $phone \
                 ORDER BY date DESC, created_at DESC",
            )
            .bind(("phone", phone_owned))
            .await?
            .take(0)?;
        Ok(bills)
    }

    /// Find a bill by its id
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Bill>> {
        let bill: Option<Bill> = self.base.db().select((TABLE, id)).await?;
        Ok(bill)
    }

    /// Find a bill by its public lookup hash
    pub async fn find_by_hash(&self, hash: &str) -> RepoResult<Option<Bill>> {
        let hash_owned = hash.to_string();
        let mut result = self
            .base
            .db()
            .query("SELECT * FROM bill WHERE url_hash = $hash LIMIT 1")
            .bind(("hash", hash_owned))
            .await?;
        let bills: Vec<Bill> = result.take(0)?;
        Ok(bills.into_iter().next())
    }

    /// Create a bill under its pre-allocated id
    pub async fn create(&self, bill: Bill) -> RepoResult<Bill> {
        let key = bill
            .id
            .clone()
            .ok_or_else(|| RepoError::Validation("Bill id must be allocated first".to_string()))?;

        // The record key carries the id; the content must not.
        let mut content = bill;
        content.id = None;

        let created: Option<Bill> = self.base.db().create((TABLE, key)).content(content).await?;
        created.ok_or_else(|| RepoError::Database("Failed to create bill".to_string()))
    }

    /// Replace the full field set of an existing bill
    pub async fn replace(&self, id: &str, bill: Bill) -> RepoResult<Bill> {
        if self.find_by_id(id).await?.is_none() {
            return Err(RepoError::NotFound(format!("Bill {} not found", id)));
        }

        let mut content = bill;
        content.id = None;

        let updated: Option<Bill> = self.base.db().update((TABLE, id)).content(content).await?;
        updated.ok_or_else(|| RepoError::NotFound(format!("Bill {} not found", id)))
    }

    /// Find active bills that never received a lookup hash
    pub async fn find_missing_hash(&self) -> RepoResult<Vec<Bill>> {
        let bills: Vec<Bill> = self
            .base
            .db()
            .query(
                "SELECT * FROM bill WHERE url_hash = NONE OR url_hash = '' \
                 ORDER BY created_at",
            )
            .await?
            .take(0)?;
        Ok(bills)
    }

    /// Set the lookup hash on an existing bill
    pub async fn set_hash(&self, id: &str, hash: &str) -> RepoResult<()> {
        let key = id.to_string();
        let hash_owned = hash.to_string();
        self.base
            .db()
            .query("UPDATE type::thing('bill', $key) SET url_hash = $hash")
            .bind(("key", key))
            .bind(("hash", hash_owned))
            .await?
            .check()?;
        Ok(())
    }

    /// Aggregate sales over `[start, end)` (millis) into a summary
    pub async fn summary(&self, start: i64, end: i64) -> RepoResult<SalesSummary> {
        let mut result = self
            .base
            .db()
            .query(
                r#"
                LET $bills = SELECT * FROM bill
                    WHERE date >= $start
                    AND date < $end;

                LET $cash = SELECT * FROM $bills WHERE payment_mode = 'CASH';
                LET $upi = SELECT * FROM $bills WHERE payment_mode = 'UPI';

                LET $items = array::flatten($bills.items);
                LET $sarees = SELECT * FROM $items WHERE kind = 'Saree';
                LET $dresses = SELECT * FROM $items WHERE kind = 'Dress';
                LET $suit_pieces = SELECT * FROM $items WHERE kind = 'Suit-Piece';

                RETURN {
                    total_sales: math::sum($bills.total_amount) OR 0,
                    total_bills: count($bills),
                    total_quantity: math::sum($items.quantity) OR 0,
                    cash_amount: math::sum($cash.total_amount) OR 0,
                    upi_amount: math::sum($upi.total_amount) OR 0,
                    saree_quantity: math::sum($sarees.quantity) OR 0,
                    dress_quantity: math::sum($dresses.quantity) OR 0,
                    suit_piece_quantity: math::sum($suit_pieces.quantity) OR 0
                };
            "#,
            )
            .bind(("start", start))
            .bind(("end", end))
            .await?;

        let last = result.num_statements() - 1;
        let summary: Option<SalesSummary> = result.take(last)?;
        summary.ok_or_else(|| RepoError::Database("Failed to aggregate sales summary".to_string()))
    }
}
