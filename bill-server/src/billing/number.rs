//! Bill Number Allocator
//!
//! Bill ids are `YYMMDDNN`: the business date of the bill followed by a
//! two-digit sequence number, dense from 01. The sequence comes from the
//! per-day counter record, so concurrent creates never race each other
//! into the same id.

use chrono_tz::Tz;

use crate::db::repository::CounterRepository;
use crate::utils::{AppError, AppResult, time};
use shared::util::now_millis;

/// Highest sequence number a single business day can hold
pub const MAX_PER_DAY: i64 = 99;

/// `YYMMDD` prefix for the business date a timestamp falls on
pub fn date_prefix(date_millis: i64, tz: Tz) -> String {
    time::business_date(date_millis, tz)
        .format("%y%m%d")
        .to_string()
}

#[derive(Clone)]
pub struct BillNumberAllocator {
    counter: CounterRepository,
    tz: Tz,
}

impl BillNumberAllocator {
    pub fn new(counter: CounterRepository, tz: Tz) -> Self {
        Self { counter, tz }
    }

    /// Allocate the next bill id for the business date of `date_millis`.
    ///
    /// Fails once the day's 99 ids are used up; the sequence is never
    /// reused, even when earlier bills of the day have been trashed.
    pub async fn allocate(&self, date_millis: i64) -> AppResult<String> {
        let prefix = date_prefix(date_millis, self.tz);
        let seq = self.counter.next_sequence(&prefix, now_millis()).await?;
        if seq > MAX_PER_DAY {
            return Err(AppError::business_rule(format!(
                "Daily bill limit of {MAX_PER_DAY} reached for {prefix}"
            )));
        }
        Ok(format!("{prefix}{seq:02}"))
    }
}
