//! Storage layer for augur.
//!
//! This crate provides durable storage for wallets, ledger entries, daily usage, reward
//! grants and action records. Every mutating operation is a single atomic unit with a
//! conditional write: callers never read a balance and write it back themselves.
//!
//! # Backends
//!
//! - [`RocksStore`] (feature `rocksdb-backend`): `RocksDB` `TransactionDB` with column
//!   families; each operation locks the rows it touches with `get_for_update` and commits
//!   or discards as a whole.
//! - [`MemoryStore`]: in-process tables behind one mutex, for tests and local runs.
//!
//! # Example
//!
//! ```no_run
//! use augur_core::{ActionId, LedgerEntry, UserId};
//! use augur_store::{MemoryStore, Store};
//!
//! let store = MemoryStore::new();
//! let user_id = UserId::generate();
//!
//! // First access creates the wallet with 100 welcome credits.
//! let wallet = store.get_or_create_wallet(&user_id, 100).unwrap();
//! assert_eq!(wallet.credits, 100);
//!
//! // Conditional debit.
//! let debit = LedgerEntry::debit(user_id, 40, ActionId::generate());
//! let wallet = store.apply_entries(&user_id, &[debit], 100).unwrap();
//! assert_eq!(wallet.credits, 60);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod keys;
mod memory;
mod mutation;
#[cfg(feature = "rocksdb-backend")]
mod rocks;
pub mod schema;

pub use error::{Result, StoreError};
pub use memory::MemoryStore;
#[cfg(feature = "rocksdb-backend")]
pub use rocks::RocksStore;

use augur_core::{
    ActionId, ActionRecord, ActionStatus, ActionType, DailyUsageRecord, IdempotencyKey,
    LedgerEntry, RewardGrant, RewardKind, UsageDay, UserId, Wallet,
};

/// The storage trait defining all database operations.
///
/// Implementations must make every method linearizable per user: each mutation observes
/// all previously committed mutations of the same wallet or day.
pub trait Store: Send + Sync {
    // =========================================================================
    // Wallet Operations
    // =========================================================================

    /// Get a wallet without creating it.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_wallet(&self, user_id: &UserId) -> Result<Option<Wallet>>;

    /// Apply ledger entries to a wallet as one atomic unit.
    ///
    /// The wallet is created with `welcome_credits` (and a welcome entry) if absent. Each
    /// entry's signed amount is added to its currency; if any balance would go negative the
    /// whole call fails with [`StoreError::InsufficientBalance`] and nothing is written.
    /// Entries are stored with `balance_after` filled in.
    ///
    /// # Errors
    ///
    /// - `StoreError::InsufficientBalance` if a decrement is not covered.
    /// - `StoreError::Timeout` if the row lock could not be acquired.
    fn apply_entries(
        &self,
        user_id: &UserId,
        entries: &[LedgerEntry],
        welcome_credits: i64,
    ) -> Result<Wallet>;

    /// Get a wallet, creating it with `welcome_credits` if absent.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_or_create_wallet(&self, user_id: &UserId, welcome_credits: i64) -> Result<Wallet> {
        self.apply_entries(user_id, &[], welcome_credits)
    }

    /// Zero both balances of an existing wallet, recording reset entries.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the wallet doesn't exist.
    fn reset_wallet(&self, user_id: &UserId) -> Result<Wallet>;

    /// List ledger entries for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_entries(&self, user_id: &UserId, limit: usize, offset: usize)
        -> Result<Vec<LedgerEntry>>;

    // =========================================================================
    // Daily Quota Operations
    // =========================================================================

    /// Number of free uses consumed by `user_id` on `day`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn count_free_uses(&self, user_id: &UserId, day: UsageDay) -> Result<u32>;

    /// Consume one free use if fewer than `limit` were consumed on `day`.
    ///
    /// Returns the written record, or `None` if the quota is exhausted (nothing written).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn try_consume_free_use(
        &self,
        user_id: &UserId,
        day: UsageDay,
        action_type: &ActionType,
        action_id: ActionId,
        limit: u32,
    ) -> Result<Option<DailyUsageRecord>>;

    /// Records of free uses consumed on `day`, in slot order.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_free_uses(&self, user_id: &UserId, day: UsageDay) -> Result<Vec<DailyUsageRecord>>;

    // =========================================================================
    // Reward Grant Operations
    // =========================================================================

    /// Check whether a grant exists for `(kind, key)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn has_grant(&self, kind: RewardKind, key: &IdempotencyKey) -> Result<bool>;

    /// Insert a grant and apply its ledger entry in one atomic unit.
    ///
    /// # Errors
    ///
    /// - `StoreError::DuplicateGrant` if a grant with the same kind and key exists; the
    ///   entry is not applied.
    fn record_grant(
        &self,
        grant: &RewardGrant,
        entry: &LedgerEntry,
        welcome_credits: i64,
    ) -> Result<Wallet>;

    // =========================================================================
    // Action Operations
    // =========================================================================

    /// Insert a new action record.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Conflict` if an action with the same id exists.
    fn create_action(&self, action: &ActionRecord) -> Result<()>;

    /// Get an action record by id.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_action(&self, action_id: &ActionId) -> Result<Option<ActionRecord>>;

    /// Move a pending action to a terminal status.
    ///
    /// # Errors
    ///
    /// - `StoreError::NotFound` if the action doesn't exist.
    /// - `StoreError::Conflict` if the action is already terminal.
    fn update_action_status(
        &self,
        action_id: &ActionId,
        status: ActionStatus,
        reason: Option<String>,
    ) -> Result<ActionRecord>;

    /// Up to `limit` actions still `pending`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn list_pending_actions(&self, limit: usize) -> Result<Vec<ActionRecord>>;
}
