//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use augur_core::{
    ActionId, ActionRecord, ActionStatus, ActionType, DailyUsageRecord, EntryKind,
    IdempotencyKey, LedgerEntry, RewardGrant, RewardKind, UsageDay, UserId, Wallet,
};
use augur_engine::{ChannelQueue, Engine, EngineConfig, FixedClock, StaticConfig};
use augur_store::{MemoryStore, Result, Store, StoreError};
use chrono::{TimeZone, Utc};
use rand::SeedableRng;
use rand_pcg::Pcg64Mcg;
use tokio::sync::mpsc;

use augur_core::ActionCreated;

/// Engine plus the handles tests poke at.
pub struct TestEngine {
    pub engine: Engine,
    pub store: Arc<dyn Store>,
    pub events: mpsc::Receiver<ActionCreated>,
    pub clock: Arc<FixedClock>,
}

/// Fortune cost used throughout.
pub const COST: i64 = 50;

/// Build an engine over `store` with the given welcome credits and daily limit.
pub fn engine_with(store: Arc<dyn Store>, welcome: i64, daily_limit: Option<u32>) -> TestEngine {
    engine_with_queue(store, welcome, daily_limit, 1024)
}

/// Like [`engine_with`], with a fulfillment queue of `capacity` events.
pub fn engine_with_queue(
    store: Arc<dyn Store>,
    welcome: i64,
    daily_limit: Option<u32>,
    capacity: usize,
) -> TestEngine {
    let config = EngineConfig::default()
        .with_welcome_credits(welcome)
        .with_daily_free_limit(daily_limit)
        .with_cost(ActionType::fortune(), COST);
    let (queue, events) = ChannelQueue::bounded(capacity);
    let clock = Arc::new(FixedClock::new(
        Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap(),
    ));
    let engine = Engine::with_clock(
        Arc::clone(&store),
        Arc::new(StaticConfig::new(config)),
        Arc::new(queue),
        Arc::clone(&clock) as _,
    );
    TestEngine {
        engine,
        store,
        events,
        clock,
    }
}

/// Engine over a fresh in-memory store.
pub fn engine(welcome: i64, daily_limit: Option<u32>) -> TestEngine {
    engine_with(Arc::new(MemoryStore::new()), welcome, daily_limit)
}

/// Sum of a user's ledger entries per currency: `(credits, diamonds)`.
pub fn ledger_totals(store: &dyn Store, user_id: &UserId) -> (i64, i64) {
    store
        .list_entries(user_id, usize::MAX, 0)
        .unwrap()
        .iter()
        .fold((0, 0), |(c, d), e| match e.currency {
            augur_core::Currency::Credits => (c + e.amount, d),
            augur_core::Currency::Diamonds => (c, d + e.amount),
        })
}

/// Store wrapper that fails selected operations on demand.
#[derive(Default)]
pub struct FaultyStore {
    inner: MemoryStore,
    pub fail_create_action: AtomicBool,
    pub panic_on_create_action: AtomicBool,
    pub fail_reversal: AtomicBool,
    /// Write the action but report a timeout.
    pub lose_create_ack: AtomicBool,
    pub fail_status_update: AtomicBool,
}

impl FaultyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(flag: &AtomicBool, on: bool) {
        flag.store(on, Ordering::SeqCst);
    }
}

impl Store for FaultyStore {
    fn get_wallet(&self, user_id: &UserId) -> Result<Option<Wallet>> {
        self.inner.get_wallet(user_id)
    }

    fn apply_entries(
        &self,
        user_id: &UserId,
        entries: &[LedgerEntry],
        welcome_credits: i64,
    ) -> Result<Wallet> {
        if self.fail_reversal.load(Ordering::SeqCst)
            && entries.iter().any(|e| e.kind == EntryKind::Reversal)
        {
            return Err(StoreError::Database("disk on fire".into()));
        }
        self.inner.apply_entries(user_id, entries, welcome_credits)
    }

    fn reset_wallet(&self, user_id: &UserId) -> Result<Wallet> {
        self.inner.reset_wallet(user_id)
    }

    fn list_entries(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>> {
        self.inner.list_entries(user_id, limit, offset)
    }

    fn count_free_uses(&self, user_id: &UserId, day: UsageDay) -> Result<u32> {
        self.inner.count_free_uses(user_id, day)
    }

    fn try_consume_free_use(
        &self,
        user_id: &UserId,
        day: UsageDay,
        action_type: &ActionType,
        action_id: ActionId,
        limit: u32,
    ) -> Result<Option<DailyUsageRecord>> {
        self.inner
            .try_consume_free_use(user_id, day, action_type, action_id, limit)
    }

    fn list_free_uses(&self, user_id: &UserId, day: UsageDay) -> Result<Vec<DailyUsageRecord>> {
        self.inner.list_free_uses(user_id, day)
    }

    fn has_grant(&self, kind: RewardKind, key: &IdempotencyKey) -> Result<bool> {
        self.inner.has_grant(kind, key)
    }

    fn record_grant(
        &self,
        grant: &RewardGrant,
        entry: &LedgerEntry,
        welcome_credits: i64,
    ) -> Result<Wallet> {
        self.inner.record_grant(grant, entry, welcome_credits)
    }

    fn create_action(&self, action: &ActionRecord) -> Result<()> {
        if self.panic_on_create_action.load(Ordering::SeqCst) {
            panic!("worker crashed while creating action");
        }
        if self.fail_create_action.load(Ordering::SeqCst) {
            return Err(StoreError::Timeout);
        }
        self.inner.create_action(action)?;
        if self.lose_create_ack.load(Ordering::SeqCst) {
            return Err(StoreError::Timeout);
        }
        Ok(())
    }

    fn get_action(&self, action_id: &ActionId) -> Result<Option<ActionRecord>> {
        self.inner.get_action(action_id)
    }

    fn update_action_status(
        &self,
        action_id: &ActionId,
        status: ActionStatus,
        reason: Option<String>,
    ) -> Result<ActionRecord> {
        if self.fail_status_update.load(Ordering::SeqCst) {
            return Err(StoreError::Database("disk on fire".into()));
        }
        self.inner.update_action_status(action_id, status, reason)
    }

    fn list_pending_actions(&self, limit: usize) -> Result<Vec<ActionRecord>> {
        self.inner.list_pending_actions(limit)
    }
}

/// Seeded generator for interleaving tests.
pub fn seeded_rng(seed: u64) -> Pcg64Mcg {
    Pcg64Mcg::seed_from_u64(seed)
}
