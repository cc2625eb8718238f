//! Shop Details Repository (Singleton)

use super::{BaseRepository, RepoError, RepoResult};
use shared::models::{ShopDetails, ShopDetailsUpdate};
use surrealdb::engine::local::Db;
use surrealdb::{RecordId, Surreal};

const TABLE: &str = "shop";
const SINGLETON_ID: &str = "details";

#[derive(Clone)]
pub struct ShopRepository {
    base: BaseRepository,
}

impl ShopRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Get or create the singleton shop details
    pub async fn get_or_create(&self) -> RepoResult<ShopDetails> {
        // Try to get existing
        if let Some(details) = self.get().await? {
            return Ok(details);
        }

        // Create new singleton with defaults
        let details = ShopDetails::default();

        let created: Option<ShopDetails> = self
            .base
            .db()
            .create((TABLE, SINGLETON_ID))
            .content(details)
            .await?;
        created.ok_or_else(|| RepoError::Database("Failed to create shop details".to_string()))
    }

    /// Get the singleton shop details
    pub async fn get(&self) -> RepoResult<Option<ShopDetails>> {
        let details: Option<ShopDetails> = self.base.db().select((TABLE, SINGLETON_ID)).await?;
        Ok(details)
    }

    /// Update shop details
    pub async fn update(&self, data: ShopDetailsUpdate) -> RepoResult<ShopDetails> {
        // Ensure singleton exists
        self.get_or_create().await?;

        // Update timestamp first
        let singleton_id = RecordId::from_table_key(TABLE, SINGLETON_ID);
        let _ = self
            .base
            .db()
            .query("UPDATE $id SET updated_at = $now")
            .bind(("id", singleton_id.clone()))
            .bind(("now", shared::util::now_millis()))
            .await?;

        // Merge update data
        let updated: Option<ShopDetails> = self.base.db().update(singleton_id).merge(data).await?;
        updated.ok_or_else(|| RepoError::Database("Failed to update shop details".to_string()))
    }
}
