//! Database Module
//!
//! Owns the embedded SurrealDB handle (RocksDB backend) and applies the
//! schema definitions on startup.

pub mod repository;

use crate::utils::AppError;
use surrealdb::Surreal;
use surrealdb::engine::local::{Db, RocksDb};

const NAMESPACE: &str = "shop";
const DATABASE: &str = "billing";

/// Owns the embedded database handle
#[derive(Clone)]
pub struct DbService {
    pub db: Surreal<Db>,
}

impl DbService {
    /// Open (or create) the database at `db_path` and apply schema definitions
    pub async fn new(db_path: &str) -> Result<Self, AppError> {
        let db: Surreal<Db> = Surreal::new::<RocksDb>(db_path)
            .await
            .map_err(|e| AppError::database(format!("Failed to open database: {e}")))?;

        db.use_ns(NAMESPACE)
            .use_db(DATABASE)
            .await
            .map_err(|e| AppError::database(format!("Failed to select namespace: {e}")))?;

        tracing::info!("Database connection established (SurrealDB RocksDB at {db_path})");

        define_schema(&db)
            .await
            .map_err(|e| AppError::database(format!("Failed to apply schema: {e}")))?;
        tracing::info!("Database schema applied");

        Ok(Self { db })
    }
}

/// Idempotent schema definitions, re-applied on every startup.
///
/// The unique index on `bill.url_hash` backstops the hash allocator's
/// verify-and-retry loop against concurrent allocation of the same token.
pub async fn define_schema(db: &Surreal<Db>) -> Result<(), surrealdb::Error> {
    db.query("DEFINE INDEX IF NOT EXISTS bill_url_hash ON TABLE bill FIELDS url_hash UNIQUE")
        .await?
        .check()?;
    Ok(())
}
