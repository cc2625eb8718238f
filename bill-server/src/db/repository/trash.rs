//! Trash Repository
//!
//! Soft-deleted bills, keyed by the original bill id. The move in and the
//! move out both run as a create-plus-delete transaction, so a bill is
//! never observable in both tables, and an engine abort leaves the source
//! record in place rather than losing it.

use super::{BaseRepository, RepoError, RepoResult};
use shared::models::{Bill, TrashedBill};
use shared::util::now_millis;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const TABLE: &str = "trash";

#[derive(Clone)]
pub struct TrashRepository {
    base: BaseRepository,
}

impl TrashRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find all trashed bills, most recently deleted first
    pub async fn find_all(&self) -> RepoResult<Vec<TrashedBill>> {
        let trashed: Vec<TrashedBill> = self
            .base
            .db()
            .query("SELECT * FROM trash ORDER BY deleted_at DESC")
            .await?
            .take(0)?;
        Ok(trashed)
    }

    /// Find a trashed bill by its id
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<TrashedBill>> {
        let trashed: Option<TrashedBill> = self.base.db().select((TABLE, id)).await?;
        Ok(trashed)
    }

    /// Move an active bill into the trash.
    ///
    /// Creates the annotated trash record and deletes the active record in
    /// one transaction.
    pub async fn trash_bill(&self, bill: Bill) -> RepoResult<TrashedBill> {
        let key = bill
            .id
            .clone()
            .ok_or_else(|| RepoError::Validation("Bill has no id".to_string()))?;

        let trashed = TrashedBill::from_bill(bill, now_millis());
        let mut content = trashed.clone();
        content.id = None;

        self.base
            .db()
            .query(
                "BEGIN TRANSACTION; \
                 CREATE type::thing('trash', $key) CONTENT $data; \
                 DELETE type::thing('bill', $key); \
                 COMMIT TRANSACTION;",
            )
            .bind(("key", key))
            .bind(("data", content))
            .await?
            .check()?;

        Ok(trashed)
    }

    /// Move a trashed bill back to the active table.
    ///
    /// Strips the trash annotations, creates the active record and deletes
    /// the trash record in one transaction.
    pub async fn restore(&self, id: &str) -> RepoResult<Bill> {
        let trashed = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| RepoError::NotFound(format!("Trashed bill {} not found", id)))?;

        let bill = trashed.into_bill();
        let mut content = bill.clone();
        content.id = None;

        let key = id.to_string();
        self.base
            .db()
            .query(
                "BEGIN TRANSACTION; \
                 CREATE type::thing('bill', $key) CONTENT $data; \
                 DELETE type::thing('trash', $key); \
                 COMMIT TRANSACTION;",
            )
            .bind(("key", key))
            .bind(("data", content))
            .await?
            .check()?;

        Ok(Bill {
            id: Some(id.to_string()),
            ..bill
        })
    }

    /// Permanently delete a trashed bill. Irreversible.
    pub async fn purge(&self, id: &str) -> RepoResult<()> {
        if self.find_by_id(id).await?.is_none() {
            return Err(RepoError::NotFound(format!(
                "Trashed bill {} not found",
                id
            )));
        }

        let _: Option<TrashedBill> = self.base.db().delete((TABLE, id)).await?;
        Ok(())
    }
}
