//! Server State
//!
//! Shared state for request handlers. Owns the embedded database handle,
//! the repositories, the bill manager and resolver, and the auth services.

use std::sync::Arc;

use anyhow::Context;
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

use crate::auth::{JwtService, OwnerCredentials};
use crate::billing::{BillManager, BillNumberAllocator, HashAllocator, PublicResolver};
use crate::db::DbService;
use crate::db::repository::{
    BillRepository, CounterRepository, CustomerRepository, OldBillRepository, ShopRepository,
    TrashRepository,
};

use super::config::Config;

#[derive(Clone)]
pub struct ServerState {
    pub config: Config,
    pub db: Surreal<Db>,
    pub bills: BillRepository,
    pub trash: TrashRepository,
    pub customers: CustomerRepository,
    pub shop: ShopRepository,
    pub manager: BillManager,
    pub resolver: PublicResolver,
    pub jwt_service: Arc<JwtService>,
    pub owner: Arc<OwnerCredentials>,
}

impl ServerState {
    /// Open the database and wire up every service
    pub async fn initialize(config: &Config) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&config.data_dir).with_context(|| {
            format!("Failed to create data directory {}", config.data_dir.display())
        })?;

        let db_path = config.database_path();
        let service = DbService::new(&db_path.to_string_lossy())
            .await
            .context("Failed to initialize database")?;
        let db = service.db;

        let bills = BillRepository::new(db.clone());
        let trash = TrashRepository::new(db.clone());
        let old_bills = OldBillRepository::new(db.clone());
        let customers = CustomerRepository::new(db.clone());
        let shop = ShopRepository::new(db.clone());
        let counter = CounterRepository::new(db.clone());

        let numbers = BillNumberAllocator::new(counter, config.timezone);
        let hashes = HashAllocator::new(bills.clone());

        let manager = BillManager::new(
            bills.clone(),
            trash.clone(),
            old_bills.clone(),
            customers.clone(),
            shop.clone(),
            numbers,
            hashes,
            config.public_base_url.clone(),
            config.country_code.clone(),
        );
        let resolver = PublicResolver::new(bills.clone(), old_bills, shop.clone());

        let jwt_service = Arc::new(JwtService::with_config(config.jwt.clone()));
        let owner = Arc::new(
            OwnerCredentials::new(config.owner_username.clone(), &config.owner_password)
                .map_err(|e| anyhow::anyhow!("Failed to hash owner password: {e}"))?,
        );

        Ok(Self {
            config: config.clone(),
            db,
            bills,
            trash,
            customers,
            shop,
            manager,
            resolver,
            jwt_service,
            owner,
        })
    }

    pub fn get_jwt_service(&self) -> &JwtService {
        &self.jwt_service
    }
}
