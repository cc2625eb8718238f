//! Old Bill Repository
//!
//! Legacy bills issued before the hash scheme, kept resolvable by their
//! original id. The table is written only by the migration operation and
//! read only by the public resolver.

use super::{BaseRepository, RepoError, RepoResult};
use shared::models::Bill;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const TABLE: &str = "old_bill";

#[derive(Clone)]
pub struct OldBillRepository {
    base: BaseRepository,
}

impl OldBillRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find a legacy bill by its id
    pub async fn find_by_id(&self, id: &str) -> RepoResult<Option<Bill>> {
        let bill: Option<Bill> = self.base.db().select((TABLE, id)).await?;
        Ok(bill)
    }

    /// Write (or overwrite) a legacy bill under its id
    pub async fn upsert(&self, bill: Bill) -> RepoResult<Bill> {
        let key = bill
            .id
            .clone()
            .ok_or_else(|| RepoError::Validation("Bill has no id".to_string()))?;

        let mut content = bill;
        content.id = None;

        let stored: Option<Bill> = self.base.db().upsert((TABLE, key)).content(content).await?;
        stored.ok_or_else(|| RepoError::Database("Failed to store legacy bill".to_string()))
    }
}
