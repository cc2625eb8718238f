//! Bill Counter Repository
//!
//! One counter record per business-date prefix (`YYMMDD`), holding the
//! highest sequence number issued for that day. The increment is a single
//! UPSERT statement, so concurrent allocations for the same day serialize
//! on the counter record instead of racing a read-then-write cycle.

use super::{BaseRepository, RepoResult};
use surrealdb::Surreal;
use surrealdb::engine::local::Db;

const TABLE: &str = "bill_counter";

#[derive(Clone)]
pub struct CounterRepository {
    base: BaseRepository,
}

impl CounterRepository {
    pub fn new(db: Surreal<Db>) -> Self {
        Self {
            base: BaseRepository::new(db),
        }
    }

    /// Issue the next sequence number for a date prefix.
    ///
    /// The counter is floored at the highest sequence already present in
    /// the bill and trash tables, so a counter record lost or never written
    /// (data imported from an older installation) cannot cause a reissue.
    /// Returns the raw sequence; values above 99 mean the day is exhausted
    /// and no bill id can be formed from them.
    pub async fn next_sequence(&self, prefix: &str, now: i64) -> RepoResult<i64> {
        let floor = self.scan_floor(prefix).await?;

        let prefix_owned = prefix.to_string();
        let mut result = self
            .base
            .db()
            .query(
                "UPSERT type::thing($tb, $prefix) \
                 SET seq = math::max([seq ?? 0, $floor]) + 1, updated_at = $now \
                 RETURN VALUE seq",
            )
            .bind(("tb", TABLE))
            .bind(("prefix", prefix_owned))
            .bind(("floor", floor))
            .bind(("now", now))
            .await?;

        let seqs: Vec<i64> = result.take(0)?;
        seqs.into_iter().next().ok_or_else(|| {
            super::RepoError::Database("Counter upsert returned no sequence".to_string())
        })
    }

    /// Highest sequence number embedded in existing bill and trash keys
    /// for the prefix, or 0 when the day has none.
    async fn scan_floor(&self, prefix: &str) -> RepoResult<i64> {
        let prefix_owned = prefix.to_string();
        let mut result = self
            .base
            .db()
            .query(
                "SELECT VALUE record::id(id) FROM bill \
                 WHERE string::starts_with(record::id(id), $prefix)",
            )
            .query(
                "SELECT VALUE record::id(id) FROM trash \
                 WHERE string::starts_with(record::id(id), $prefix)",
            )
            .bind(("prefix", prefix_owned))
            .await?;

        let bill_keys: Vec<String> = result.take(0)?;
        let trash_keys: Vec<String> = result.take(1)?;

        let floor = bill_keys
            .iter()
            .chain(trash_keys.iter())
            .filter_map(|key| key.strip_prefix(prefix))
            .filter_map(|tail| tail.parse::<i64>().ok())
            .max()
            .unwrap_or(0);
        Ok(floor)
    }
}
