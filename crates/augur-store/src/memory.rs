//! In-memory storage implementation.
//!
//! All tables sit behind a single mutex, so every operation is serializable. Intended for
//! tests and single-process deployments; nothing survives a restart.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard};

use augur_core::{
    ActionId, ActionRecord, ActionStatus, ActionType, DailyUsageRecord, IdempotencyKey,
    LedgerEntry, RewardGrant, RewardKind, UsageDay, UserId, Wallet,
};

use crate::error::{Result, StoreError};
use crate::{mutation, Store};

#[derive(Default)]
struct Tables {
    wallets: HashMap<UserId, Wallet>,
    entries: BTreeMap<(UserId, u64), LedgerEntry>,
    daily_usage: BTreeMap<(UserId, UsageDay, u32), DailyUsageRecord>,
    grants: HashMap<(RewardKind, IdempotencyKey), RewardGrant>,
    actions: HashMap<ActionId, ActionRecord>,
}

impl Tables {
    fn commit_wallet(&mut self, change: mutation::WalletChange) -> Wallet {
        for entry in change.entries {
            self.entries.insert((entry.user_id, entry.seq), entry);
        }
        if change.dirty {
            self.wallets.insert(change.wallet.user_id, change.wallet.clone());
        }
        change.wallet
    }

    fn free_uses(
        &self,
        user_id: UserId,
        day: UsageDay,
    ) -> impl Iterator<Item = &DailyUsageRecord> {
        self.daily_usage
            .range((user_id, day, 0)..=(user_id, day, u32::MAX))
            .map(|(_, record)| record)
    }
}

/// Mutex-guarded in-memory storage.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>> {
        self.tables
            .lock()
            .map_err(|_| StoreError::Database("memory store lock poisoned".into()))
    }
}

impl Store for MemoryStore {
    fn get_wallet(&self, user_id: &UserId) -> Result<Option<Wallet>> {
        Ok(self.lock()?.wallets.get(user_id).cloned())
    }

    fn apply_entries(
        &self,
        user_id: &UserId,
        entries: &[LedgerEntry],
        welcome_credits: i64,
    ) -> Result<Wallet> {
        let mut tables = self.lock()?;
        let existing = tables.wallets.get(user_id).cloned();
        let change = mutation::apply(user_id, existing, entries, welcome_credits)?;
        Ok(tables.commit_wallet(change))
    }

    fn reset_wallet(&self, user_id: &UserId) -> Result<Wallet> {
        let mut tables = self.lock()?;
        let wallet = tables
            .wallets
            .get(user_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                entity: "wallet",
                id: user_id.to_string(),
            })?;
        Ok(tables.commit_wallet(mutation::reset(wallet)))
    }

    fn list_entries(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>> {
        let tables = self.lock()?;
        Ok(tables
            .entries
            .range((*user_id, 0)..=(*user_id, u64::MAX))
            .rev()
            .skip(offset)
            .take(limit)
            .map(|(_, entry)| entry.clone())
            .collect())
    }

    fn count_free_uses(&self, user_id: &UserId, day: UsageDay) -> Result<u32> {
        let tables = self.lock()?;
        let count = tables.free_uses(*user_id, day).count();
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    fn try_consume_free_use(
        &self,
        user_id: &UserId,
        day: UsageDay,
        action_type: &ActionType,
        action_id: ActionId,
        limit: u32,
    ) -> Result<Option<DailyUsageRecord>> {
        let mut tables = self.lock()?;
        let used = u32::try_from(tables.free_uses(*user_id, day).count()).unwrap_or(u32::MAX);
        if used >= limit {
            return Ok(None);
        }
        let record = DailyUsageRecord {
            user_id: *user_id,
            day,
            slot: used,
            action_type: action_type.clone(),
            action_id,
            created_at: chrono::Utc::now(),
        };
        tables
            .daily_usage
            .insert((*user_id, day, used), record.clone());
        Ok(Some(record))
    }

    fn list_free_uses(&self, user_id: &UserId, day: UsageDay) -> Result<Vec<DailyUsageRecord>> {
        let tables = self.lock()?;
        Ok(tables.free_uses(*user_id, day).cloned().collect())
    }

    fn has_grant(&self, kind: RewardKind, key: &IdempotencyKey) -> Result<bool> {
        Ok(self.lock()?.grants.contains_key(&(kind, key.clone())))
    }

    fn record_grant(
        &self,
        grant: &RewardGrant,
        entry: &LedgerEntry,
        welcome_credits: i64,
    ) -> Result<Wallet> {
        let mut tables = self.lock()?;
        let grant_key = (grant.kind, grant.key.clone());
        if tables.grants.contains_key(&grant_key) {
            return Err(StoreError::DuplicateGrant {
                key: grant.key.to_string(),
            });
        }
        let existing = tables.wallets.get(&grant.user_id).cloned();
        let change = mutation::apply(
            &grant.user_id,
            existing,
            std::slice::from_ref(entry),
            welcome_credits,
        )?;
        tables.grants.insert(grant_key, grant.clone());
        Ok(tables.commit_wallet(change))
    }

    fn create_action(&self, action: &ActionRecord) -> Result<()> {
        let mut tables = self.lock()?;
        if tables.actions.contains_key(&action.id) {
            return Err(StoreError::Conflict(format!(
                "action {} already exists",
                action.id
            )));
        }
        tables.actions.insert(action.id, action.clone());
        Ok(())
    }

    fn get_action(&self, action_id: &ActionId) -> Result<Option<ActionRecord>> {
        Ok(self.lock()?.actions.get(action_id).cloned())
    }

    fn update_action_status(
        &self,
        action_id: &ActionId,
        status: ActionStatus,
        reason: Option<String>,
    ) -> Result<ActionRecord> {
        let mut tables = self.lock()?;
        let existing = tables.actions.get(action_id).cloned();
        let action = mutation::transition(action_id, existing, status, reason)?;
        tables.actions.insert(*action_id, action.clone());
        Ok(action)
    }

    fn list_pending_actions(&self, limit: usize) -> Result<Vec<ActionRecord>> {
        let tables = self.lock()?;
        let mut pending: Vec<_> = tables
            .actions
            .values()
            .filter(|action| action.status == ActionStatus::Pending)
            .cloned()
            .collect();
        pending.sort_by_key(|action| action.id);
        pending.truncate(limit);
        Ok(pending)
    }
}
