//! Repository Module
//!
//! Typed CRUD operations over the SurrealDB tables. Records cross this
//! boundary as serde structs; malformed documents surface as errors here.

pub mod bill;
pub mod counter;
pub mod customer;
pub mod old_bill;
pub mod shop;
pub mod trash;

// Re-exports
pub use bill::BillRepository;
pub use counter::CounterRepository;
pub use customer::CustomerRepository;
pub use old_bill::OldBillRepository;
pub use shop::ShopRepository;
pub use trash::TrashRepository;

use surrealdb::Surreal;
use surrealdb::engine::local::Db;
use thiserror::Error;

/// Repository error types
#[derive(Debug, Error)]
pub enum RepoError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Duplicate: {0}")]
    Duplicate(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<surrealdb::Error> for RepoError {
    fn from(err: surrealdb::Error) -> Self {
        RepoError::Database(err.to_string())
    }
}

/// Result type for repository operations
pub type RepoResult<T> = Result<T, RepoError>;

/// Base repository with database reference
#[derive(Clone)]
pub struct BaseRepository {
    db: Surreal<Db>,
}

impl BaseRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &Surreal<Db> {
        &self.db
    }
}
