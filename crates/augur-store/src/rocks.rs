//! `RocksDB` storage implementation.
//!
//! Uses a pessimistic `TransactionDB`: every mutation opens a transaction, locks the rows it
//! reads with `get_for_update`, and commits the whole write set at once. A transaction that
//! returns early is dropped uncommitted, which discards its writes and releases its locks.
//!
//! Lock order is grant row, then wallet row, so concurrent operations cannot deadlock.

use std::path::Path;
use std::sync::Arc;

use rocksdb::{
    BoundColumnFamily, ColumnFamilyDescriptor, Direction, ErrorKind, IteratorMode,
    MultiThreaded, Options, Transaction, TransactionDB, TransactionDBOptions,
};

use augur_core::{
    ActionId, ActionRecord, ActionStatus, ActionType, DailyUsageRecord, IdempotencyKey,
    LedgerEntry, RewardGrant, RewardKind, UsageDay, UserId, Wallet,
};

use crate::error::{Result, StoreError};
use crate::keys;
use crate::mutation::{self, WalletChange};
use crate::schema::{all_column_families, cf};
use crate::Store;

type Db = TransactionDB<MultiThreaded>;
type Txn<'db> = Transaction<'db, Db>;

/// Milliseconds a transaction waits for a row lock before giving up.
const LOCK_TIMEOUT_MS: i64 = 2_000;

/// RocksDB-backed storage implementation.
pub struct RocksStore {
    db: Arc<Db>,
}

impl RocksStore {
    /// Open or create a `RocksDB` database at the given path.
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or created.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut opts = Options::default();
        opts.create_if_missing(true);
        opts.create_missing_column_families(true);

        let mut txn_opts = TransactionDBOptions::default();
        txn_opts.set_txn_lock_timeout(LOCK_TIMEOUT_MS);

        let cf_descriptors: Vec<_> = all_column_families()
            .into_iter()
            .map(|name| ColumnFamilyDescriptor::new(name, Options::default()))
            .collect();

        let db = Db::open_cf_descriptors(&opts, &txn_opts, path, cf_descriptors)
            .map_err(db_error)?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Get a column family handle.
    fn cf(&self, name: &str) -> Result<Arc<BoundColumnFamily<'_>>> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| StoreError::Database(format!("column family not found: {name}")))
    }

    /// Run `f` inside a transaction and commit it if `f` succeeds.
    fn atomically<T>(&self, f: impl FnOnce(&Txn<'_>) -> Result<T>) -> Result<T> {
        let txn = self.db.transaction();
        let out = f(&txn)?;
        txn.commit().map_err(db_error)?;
        Ok(out)
    }

    /// Read and lock one row inside `txn`.
    fn locked_get<T: serde::de::DeserializeOwned>(
        txn: &Txn<'_>,
        cf: &Arc<BoundColumnFamily<'_>>,
        key: &[u8],
    ) -> Result<Option<T>> {
        txn.get_for_update_cf(cf, key, true)
            .map_err(db_error)?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    fn get<T: serde::de::DeserializeOwned>(&self, cf_name: &str, key: &[u8]) -> Result<Option<T>> {
        let cf = self.cf(cf_name)?;
        self.db
            .get_cf(&cf, key)
            .map_err(db_error)?
            .map(|data| Self::deserialize(&data))
            .transpose()
    }

    /// Stage the rows of a wallet change in `txn`.
    fn stage_wallet(&self, txn: &Txn<'_>, change: &WalletChange) -> Result<()> {
        let cf_wallets = self.cf(cf::WALLETS)?;
        let cf_entries = self.cf(cf::ENTRIES)?;
        let cf_by_user = self.cf(cf::ENTRIES_BY_USER)?;

        if change.dirty {
            txn.put_cf(
                &cf_wallets,
                keys::wallet_key(&change.wallet.user_id),
                Self::serialize(&change.wallet)?,
            )
            .map_err(db_error)?;
        }
        for entry in &change.entries {
            txn.put_cf(&cf_entries, keys::entry_key(&entry.id), Self::serialize(entry)?)
                .map_err(db_error)?;
            txn.put_cf(
                &cf_by_user,
                keys::user_entry_key(&entry.user_id, entry.seq),
                entry.id.to_bytes(),
            )
            .map_err(db_error)?;
        }
        Ok(())
    }

    /// Lock the wallet row, apply `entries`, and stage the result.
    fn stage_entries(
        &self,
        txn: &Txn<'_>,
        user_id: &UserId,
        entries: &[LedgerEntry],
        welcome_credits: i64,
    ) -> Result<Wallet> {
        let cf_wallets = self.cf(cf::WALLETS)?;
        let existing = Self::locked_get(txn, &cf_wallets, &keys::wallet_key(user_id))?;
        let change = mutation::apply(user_id, existing, entries, welcome_credits)?;
        self.stage_wallet(txn, &change)?;
        Ok(change.wallet)
    }

    /// Serialize a value using CBOR.
    fn serialize<T: serde::Serialize>(value: &T) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        ciborium::into_writer(value, &mut buf)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;
        Ok(buf)
    }

    /// Deserialize a value from CBOR.
    fn deserialize<T: serde::de::DeserializeOwned>(data: &[u8]) -> Result<T> {
        ciborium::from_reader(data).map_err(|e| StoreError::Serialization(e.to_string()))
    }

    /// Rows of `cf_name` whose key starts with `prefix`, in key order.
    fn scan_prefix(&self, cf_name: &str, prefix: &[u8]) -> Result<Vec<(Box<[u8]>, Box<[u8]>)>> {
        let cf = self.cf(cf_name)?;
        let mut found = Vec::new();
        for item in self
            .db
            .iterator_cf(&cf, IteratorMode::From(prefix, Direction::Forward))
        {
            let (key, value) = item.map_err(db_error)?;
            if !key.starts_with(prefix) {
                break;
            }
            found.push((key, value));
        }
        Ok(found)
    }
}

/// Lock waits and busy conflicts are timeouts; everything else is a database failure.
fn db_error(e: rocksdb::Error) -> StoreError {
    match e.kind() {
        ErrorKind::TimedOut | ErrorKind::Busy | ErrorKind::TryAgain => {
            tracing::warn!(error = %e, "RocksDB transaction timed out");
            StoreError::Timeout
        }
        _ => StoreError::Database(e.to_string()),
    }
}

impl Store for RocksStore {
    // =========================================================================
    // Wallet Operations
    // =========================================================================

    fn get_wallet(&self, user_id: &UserId) -> Result<Option<Wallet>> {
        self.get(cf::WALLETS, &keys::wallet_key(user_id))
    }

    fn apply_entries(
        &self,
        user_id: &UserId,
        entries: &[LedgerEntry],
        welcome_credits: i64,
    ) -> Result<Wallet> {
        self.atomically(|txn| self.stage_entries(txn, user_id, entries, welcome_credits))
    }

    fn reset_wallet(&self, user_id: &UserId) -> Result<Wallet> {
        self.atomically(|txn| {
            let cf_wallets = self.cf(cf::WALLETS)?;
            let wallet: Wallet = Self::locked_get(txn, &cf_wallets, &keys::wallet_key(user_id))?
                .ok_or_else(|| StoreError::NotFound {
                    entity: "wallet",
                    id: user_id.to_string(),
                })?;
            let change = mutation::reset(wallet);
            self.stage_wallet(txn, &change)?;
            Ok(change.wallet)
        })
    }

    fn list_entries(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>> {
        let mut index = self.scan_prefix(cf::ENTRIES_BY_USER, &keys::user_prefix(user_id))?;
        index.reverse();

        let mut entries = Vec::with_capacity(limit.min(index.len()));
        for (_, value) in index.iter().skip(offset).take(limit) {
            let Some(entry_id) = keys::entry_id_from_index(value) else {
                continue;
            };
            if let Some(entry) = self.get(cf::ENTRIES, &keys::entry_key(&entry_id))? {
                entries.push(entry);
            }
        }
        Ok(entries)
    }

    // =========================================================================
    // Daily Quota Operations
    // =========================================================================

    fn count_free_uses(&self, user_id: &UserId, day: UsageDay) -> Result<u32> {
        let cf = self.cf(cf::USAGE_COUNTERS)?;
        let raw = self
            .db
            .get_cf(&cf, keys::usage_counter_key(user_id, day))
            .map_err(db_error)?;
        Ok(raw.as_deref().map_or(0, decode_counter))
    }

    fn try_consume_free_use(
        &self,
        user_id: &UserId,
        day: UsageDay,
        action_type: &ActionType,
        action_id: ActionId,
        limit: u32,
    ) -> Result<Option<DailyUsageRecord>> {
        self.atomically(|txn| {
            let cf_counters = self.cf(cf::USAGE_COUNTERS)?;
            let cf_usage = self.cf(cf::DAILY_USAGE)?;
            let counter_key = keys::usage_counter_key(user_id, day);

            let used = txn
                .get_for_update_cf(&cf_counters, &counter_key, true)
                .map_err(db_error)?
                .as_deref()
                .map_or(0, decode_counter);
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
            txn.put_cf(&cf_counters, &counter_key, (used + 1).to_be_bytes())
                .map_err(db_error)?;
            txn.put_cf(
                &cf_usage,
                keys::daily_usage_key(user_id, day, used),
                Self::serialize(&record)?,
            )
            .map_err(db_error)?;
            Ok(Some(record))
        })
    }

    fn list_free_uses(&self, user_id: &UserId, day: UsageDay) -> Result<Vec<DailyUsageRecord>> {
        let prefix = keys::usage_counter_key(user_id, day);
        self.scan_prefix(cf::DAILY_USAGE, &prefix)?
            .iter()
            .map(|(_, value)| Self::deserialize(value))
            .collect()
    }

    // =========================================================================
    // Reward Grant Operations
    // =========================================================================

    fn has_grant(&self, kind: RewardKind, key: &IdempotencyKey) -> Result<bool> {
        let cf = self.cf(cf::REWARD_GRANTS)?;
        let exists = self
            .db
            .get_cf(&cf, keys::grant_key(kind, key))
            .map_err(db_error)?
            .is_some();
        Ok(exists)
    }

    fn record_grant(
        &self,
        grant: &RewardGrant,
        entry: &LedgerEntry,
        welcome_credits: i64,
    ) -> Result<Wallet> {
        self.atomically(|txn| {
            let cf_grants = self.cf(cf::REWARD_GRANTS)?;
            let grant_key = keys::grant_key(grant.kind, &grant.key);

            // The locked read is the uniqueness check: a concurrent claim of the same key
            // blocks here until this transaction commits, then sees the row.
            if txn
                .get_for_update_cf(&cf_grants, &grant_key, true)
                .map_err(db_error)?
                .is_some()
            {
                return Err(StoreError::DuplicateGrant {
                    key: grant.key.to_string(),
                });
            }

            let wallet = self.stage_entries(
                txn,
                &grant.user_id,
                std::slice::from_ref(entry),
                welcome_credits,
            )?;
            txn.put_cf(&cf_grants, &grant_key, Self::serialize(grant)?)
                .map_err(db_error)?;
            Ok(wallet)
        })
    }

    // =========================================================================
    // Action Operations
    // =========================================================================

    fn create_action(&self, action: &ActionRecord) -> Result<()> {
        self.atomically(|txn| {
            let cf = self.cf(cf::ACTIONS)?;
            let key = keys::action_key(&action.id);
            if txn
                .get_for_update_cf(&cf, &key, true)
                .map_err(db_error)?
                .is_some()
            {
                return Err(StoreError::Conflict(format!(
                    "action {} already exists",
                    action.id
                )));
            }
            txn.put_cf(&cf, &key, Self::serialize(action)?)
                .map_err(db_error)?;
            if action.status == ActionStatus::Pending {
                let cf_pending = self.cf(cf::PENDING_ACTIONS)?;
                txn.put_cf(&cf_pending, &key, b"").map_err(db_error)?;
            }
            Ok(())
        })
    }

    fn get_action(&self, action_id: &ActionId) -> Result<Option<ActionRecord>> {
        self.get(cf::ACTIONS, &keys::action_key(action_id))
    }

    fn update_action_status(
        &self,
        action_id: &ActionId,
        status: ActionStatus,
        reason: Option<String>,
    ) -> Result<ActionRecord> {
        self.atomically(|txn| {
            let cf = self.cf(cf::ACTIONS)?;
            let key = keys::action_key(action_id);
            let existing = Self::locked_get(txn, &cf, &key)?;
            let action = mutation::transition(action_id, existing, status, reason)?;
            txn.put_cf(&cf, &key, Self::serialize(&action)?)
                .map_err(db_error)?;
            let cf_pending = self.cf(cf::PENDING_ACTIONS)?;
            txn.delete_cf(&cf_pending, &key).map_err(db_error)?;
            Ok(action)
        })
    }

    fn list_pending_actions(&self, limit: usize) -> Result<Vec<ActionRecord>> {
        let cf_pending = self.cf(cf::PENDING_ACTIONS)?;
        let mut actions = Vec::with_capacity(limit.min(64));
        for item in self.db.iterator_cf(&cf_pending, IteratorMode::Start) {
            if actions.len() >= limit {
                break;
            }
            let (key, _) = item.map_err(db_error)?;
            if let Some(action) = self.get::<ActionRecord>(cf::ACTIONS, &key)? {
                if action.status == ActionStatus::Pending {
                    actions.push(action);
                }
            }
        }
        Ok(actions)
    }
}

fn decode_counter(raw: &[u8]) -> u32 {
    raw.try_into().map_or(0, u32::from_be_bytes)
}
