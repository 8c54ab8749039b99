//! Quota Tracker: free-tier usage per user per UTC day.

use std::sync::Arc;

use augur_core::{ActionId, ActionType, DailyUsageRecord, Result, UsageDay, UserId};
use augur_store::Store;

use crate::config::ConfigSource;

/// Counts and consumes daily free slots.
#[derive(Clone)]
pub struct QuotaTracker {
    store: Arc<dyn Store>,
    config: Arc<dyn ConfigSource>,
}

impl QuotaTracker {
    /// Create a tracker over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: Arc<dyn ConfigSource>) -> Self {
        Self { store, config }
    }

    /// Configured daily limit; zero when there is no free tier.
    pub async fn daily_limit(&self) -> u32 {
        self.config.daily_free_limit().await.unwrap_or(0)
    }

    /// Free slots left for `user_id` on `day`.
    pub async fn remaining_free_uses(&self, user_id: &UserId, day: UsageDay) -> Result<u32> {
        let limit = self.daily_limit().await;
        if limit == 0 {
            return Ok(0);
        }
        let used = self.store.count_free_uses(user_id, day)?;
        Ok(limit.saturating_sub(used))
    }

    /// Take one free slot if any is left.
    ///
    /// Returns `None` without side effects when the day's quota is exhausted, including
    /// when a concurrent submission took the last slot first.
    pub async fn try_consume_free_use(
        &self,
        user_id: &UserId,
        day: UsageDay,
        action_type: &ActionType,
        action_id: ActionId,
    ) -> Result<Option<DailyUsageRecord>> {
        let limit = self.daily_limit().await;
        if limit == 0 {
            return Ok(None);
        }
        let record = self
            .store
            .try_consume_free_use(user_id, day, action_type, action_id, limit)?;

        match &record {
            Some(record) => tracing::debug!(
                user_id = %user_id,
                day = %day,
                slot = record.slot,
                "Free use granted"
            ),
            None => tracing::debug!(user_id = %user_id, day = %day, "Free quota exhausted"),
        }
        Ok(record)
    }

    /// Free uses recorded for `user_id` on `day`.
    pub fn usage(&self, user_id: &UserId, day: UsageDay) -> Result<Vec<DailyUsageRecord>> {
        Ok(self.store.list_free_uses(user_id, day)?)
    }
}
