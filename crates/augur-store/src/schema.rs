//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Wallet records, keyed by `user_id`.
    pub const WALLETS: &str = "wallets";

    /// Ledger entries, keyed by `entry_id` (ULID).
    pub const ENTRIES: &str = "entries";

    /// Index: entries by user, keyed by `user_id || entry_id`.
    /// Value is empty (index only).
    pub const ENTRIES_BY_USER: &str = "entries_by_user";

    /// Free uses consumed per day, keyed by `user_id || day`. Value is a big-endian `u32`.
    pub const USAGE_COUNTERS: &str = "usage_counters";

    /// Daily usage records, keyed by `user_id || day || slot`.
    pub const DAILY_USAGE: &str = "daily_usage";

    /// Reward grants, keyed by `kind || 0x00 || idempotency_key`.
    pub const REWARD_GRANTS: &str = "reward_grants";

    /// Action records, keyed by `action_id` (ULID).
    pub const ACTIONS: &str = "actions";

    /// Index: actions still awaiting an outcome, keyed by `action_id`. Value is empty.
    pub const PENDING_ACTIONS: &str = "pending_actions";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![
        cf::WALLETS,
        cf::ENTRIES,
        cf::ENTRIES_BY_USER,
        cf::USAGE_COUNTERS,
        cf::DAILY_USAGE,
        cf::REWARD_GRANTS,
        cf::ACTIONS,
        cf::PENDING_ACTIONS,
    ]
}
