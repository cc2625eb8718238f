//! Customer Repository
//!
//! Customers are keyed by phone number. Writing an existing phone replaces
//! the name (last write wins).

use super::{BaseRepository, RepoError, RepoResult};
use shared::models::Customer;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const TABLE: &str = "customer";

#[derive(Clone)]
pub struct CustomerRepository {
    base: BaseRepository,
}

impl CustomerRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Find all customers ordered by name
    pub async fn find_all(&self) -> RepoResult<Vec<Customer>> {
        let customers: Vec<Customer> = self
            .base
            .db()
            .query("SELECT * FROM customer ORDER BY name")
            .await?
            .take(0)?;
        Ok(customers)
    }

    /// Find a customer by phone number
    pub async fn find_by_phone(&self, phone: &str) -> RepoResult<Option<Customer>> {
        let customer: Option<Customer> = self.base.db().select((TABLE, phone)).await?;
        Ok(customer)
    }

    /// Case-insensitive name prefix search
    pub async fn search(&self, query: &str) -> RepoResult<Vec<Customer>> {
        let needle = query.to_lowercase();
        let customers: Vec<Customer> = self
            .base
            .db()
            .query(
                "SELECT * FROM customer \
                 WHERE string::starts_with(string::lowercase(name), $needle) \
                 ORDER BY name",
            )
            .bind(("needle", needle))
            .await?
            .take(0)?;
        Ok(customers)
    }

    /// Create or replace the customer record for a phone number
    pub async fn upsert(&self, customer: Customer) -> RepoResult<Customer> {
        let key = customer.phone.clone();
        let stored: Option<Customer> = self
            .base
            .db()
            .upsert((TABLE, key))
            .content(customer)
            .await?;
        stored.ok_or_else(|| RepoError::Database("Failed to store customer".to_string()))
    }
}
