//! crates/eduverse_core/src/quota.rs
//!
//! Per-user, per-day request accounting on top of the [`UsageStore`] port.

use std::sync::Arc;

use chrono::NaiveDate;

use crate::ports::{PortResult, UsageStore};

/// Maximum number of gateway requests a user may have accepted per calendar day.
pub const DAILY_LIMIT: i32 = 10;

/// Owns the daily counters. Reads never mutate; writes go through the store's
/// atomic upsert so concurrent increments for the same user and day are never
/// lost. Storage failures propagate untouched: quota correctness matters more
/// than availability, so there is no retry here.
#[derive(Clone)]
pub struct QuotaTracker {
    store: Arc<dyn UsageStore>,
}

impl QuotaTracker {
    pub fn new(store: Arc<dyn UsageStore>) -> Self {
        Self { store }
    }

    /// Whether the user may make another request today. Safe to call any
    /// number of times; never mutates state.
    pub async fn can_proceed(&self, user_id: i64, today: NaiveDate) -> PortResult<bool> {
        let count = self.store.request_count(user_id, today).await?;
        Ok(match count {
            None => true,
            Some(count) => count < DAILY_LIMIT,
        })
    }

    /// Charge one request. Called exactly once per accepted request, before
    /// the remote call, so a slow or failed completion still consumes quota.
    pub async fn increment(&self, user_id: i64, today: NaiveDate) -> PortResult<()> {
        self.store.increment(user_id, today).await
    }

    /// Requests the user has left today.
    pub async fn remaining_today(&self, user_id: i64, today: NaiveDate) -> PortResult<i32> {
        let count = self.store.request_count(user_id, today).await?.unwrap_or(0);
        Ok(DAILY_LIMIT - count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryUsageStore {
        counts: Mutex<HashMap<(i64, NaiveDate), i32>>,
    }

    #[async_trait]
    impl UsageStore for MemoryUsageStore {
        async fn request_count(&self, user_id: i64, date: NaiveDate) -> PortResult<Option<i32>> {
            Ok(self.counts.lock().unwrap().get(&(user_id, date)).copied())
        }

        async fn increment(&self, user_id: i64, date: NaiveDate) -> PortResult<()> {
            *self
                .counts
                .lock()
                .unwrap()
                .entry((user_id, date))
                .or_insert(0) += 1;
            Ok(())
        }
    }

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 8, 15).unwrap()
    }

    #[tokio::test]
    async fn fresh_user_has_full_quota() {
        let tracker = QuotaTracker::new(Arc::new(MemoryUsageStore::default()));
        assert!(tracker.can_proceed(7, today()).await.unwrap());
        assert_eq!(tracker.remaining_today(7, today()).await.unwrap(), DAILY_LIMIT);
    }

    #[tokio::test]
    async fn remaining_decreases_one_per_increment() {
        let tracker = QuotaTracker::new(Arc::new(MemoryUsageStore::default()));
        for n in 1..=4 {
            tracker.increment(7, today()).await.unwrap();
            assert_eq!(
                tracker.remaining_today(7, today()).await.unwrap(),
                DAILY_LIMIT - n
            );
        }
    }

    #[tokio::test]
    async fn limit_cuts_off_at_ten() {
        let tracker = QuotaTracker::new(Arc::new(MemoryUsageStore::default()));
        for _ in 0..DAILY_LIMIT {
            assert!(tracker.can_proceed(7, today()).await.unwrap());
            tracker.increment(7, today()).await.unwrap();
        }
        assert!(!tracker.can_proceed(7, today()).await.unwrap());
        assert_eq!(tracker.remaining_today(7, today()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn days_and_users_are_independent() {
        let tracker = QuotaTracker::new(Arc::new(MemoryUsageStore::default()));
        let tomorrow = today().succ_opt().unwrap();

        tracker.increment(7, today()).await.unwrap();
        assert_eq!(tracker.remaining_today(7, tomorrow).await.unwrap(), DAILY_LIMIT);
        assert_eq!(tracker.remaining_today(8, today()).await.unwrap(), DAILY_LIMIT);
    }

    #[tokio::test]
    async fn concurrent_increments_are_all_observed() {
        let tracker = QuotaTracker::new(Arc::new(MemoryUsageStore::default()));
        let mut handles = Vec::new();
        for _ in 0..6 {
            let tracker = tracker.clone();
            handles.push(tokio::spawn(async move {
                tracker.increment(7, today()).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        assert_eq!(tracker.remaining_today(7, today()).await.unwrap(), DAILY_LIMIT - 6);
    }
}
