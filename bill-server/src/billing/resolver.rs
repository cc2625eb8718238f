//! Public Lookup Resolver
//!
//! Classifies a raw identifier from an unauthenticated request and
//! resolves it to a bill plus the shop-details singleton. Read-only and
//! restricted to exact-match lookups; this is the only surface exposed
//! without authentication.

use serde::Serialize;
use shared::models::{Bill, ShopDetails};

use crate::db::repository::{BillRepository, OldBillRepository, ShopRepository};
use crate::utils::{AppError, AppResult};

use super::hash::HASH_LEN;

/// What a raw request identifier was classified as
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupKey {
    /// New-format public lookup token
    Hash(String),
    /// Date-prefixed bill id, possibly pre-hash-era
    OldId(String),
    /// No usable identifier in the request
    Invalid,
}

/// Eight lowercase alphanumerics, at least one letter. An all-digit
/// segment has the legacy `YYMMDDNN` id shape and is never a hash; the
/// allocator never issues all-digit tokens.
fn is_hash_shaped(segment: &str) -> bool {
    segment.len() == HASH_LEN
        && segment
            .chars()
            .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
        && !segment.chars().all(|c| c.is_ascii_digit())
}

/// Classify a request identifier. Precedence, first match wins:
///
/// 1. A non-empty legacy `id` query parameter is an old id.
/// 2. An empty path segment, or the literal `index.html`, is invalid.
/// 3. A hash-shaped segment is a hash.
/// 4. Anything else is an old id.
pub fn classify(query_id: Option<&str>, segment: Option<&str>) -> LookupKey {
    if let Some(id) = query_id.filter(|id| !id.is_empty()) {
        return LookupKey::OldId(id.to_string());
    }

    let segment = segment.unwrap_or("");
    if segment.is_empty() || segment == "index.html" {
        return LookupKey::Invalid;
    }

    if is_hash_shaped(segment) {
        return LookupKey::Hash(segment.to_string());
    }
    LookupKey::OldId(segment.to_string())
}

/// A bill paired with the shop header it is rendered under
#[derive(Debug, Clone, Serialize)]
pub struct ResolvedBill {
    pub bill: Bill,
    pub shop: ShopDetails,
}

#[derive(Clone)]
pub struct PublicResolver {
    bills: BillRepository,
    old_bills: OldBillRepository,
    shop: ShopRepository,
}

impl PublicResolver {
    pub fn new(bills: BillRepository, old_bills: OldBillRepository, shop: ShopRepository) -> Self {
        Self {
            bills,
            old_bills,
            shop,
        }
    }

    /// Resolve a classified key to a bill and the shop singleton.
    ///
    /// Old ids fall through to the legacy table when the active table has
    /// no record, so pre-hash-era links stay alive.
    pub async fn resolve(&self, key: &LookupKey) -> AppResult<ResolvedBill> {
        let bill = match key {
            LookupKey::Hash(hash) => self.bills.find_by_hash(hash).await?,
            LookupKey::OldId(id) => match self.bills.find_by_id(id).await? {
                Some(bill) => Some(bill),
                None => self.old_bills.find_by_id(id).await?,
            },
            LookupKey::Invalid => {
                return Err(AppError::validation("No bill identifier provided"));
            }
        };

        let bill = bill.ok_or_else(|| AppError::not_found("Bill not found"))?;
        let shop = self
            .shop
            .get()
            .await?
            .ok_or_else(|| AppError::not_found("Shop details not found"))?;

        Ok(ResolvedBill { bill, shop })
    }
}
