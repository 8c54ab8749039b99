//! Key encoding for the storage backends.

use augur_core::{ActionId, EntryId, IdempotencyKey, RewardKind, UsageDay, UserId};

/// Wallet key: the 16 user id bytes.
#[must_use]
pub fn wallet_key(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Entry key: the 16 ULID bytes.
#[must_use]
pub fn entry_key(entry_id: &EntryId) -> Vec<u8> {
    entry_id.to_bytes().to_vec()
}

/// User-entry index key. The index value is the entry id.
///
/// Format: `user_id (16 bytes) || seq (8 bytes, big-endian)`, so a prefix scan yields a
/// user's entries oldest first.
#[must_use]
pub fn user_entry_key(user_id: &UserId, seq: u64) -> Vec<u8> {
    let mut key = Vec::with_capacity(24);
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(&seq.to_be_bytes());
    key
}

/// Prefix for all index keys of a user.
#[must_use]
pub fn user_prefix(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Decode an entry id stored as a user-entry index value.
///
/// Returns `None` unless the value is exactly 16 bytes.
#[must_use]
pub fn entry_id_from_index(value: &[u8]) -> Option<EntryId> {
    let bytes: [u8; 16] = value.try_into().ok()?;
    Some(EntryId::from_bytes(bytes))
}

/// Usage counter key: `user_id || YYYYMMDD`.
#[must_use]
pub fn usage_counter_key(user_id: &UserId, day: UsageDay) -> Vec<u8> {
    let mut key = Vec::with_capacity(24);
    key.extend_from_slice(user_id.as_bytes());
    key.extend_from_slice(&day.key_bytes());
    key
}

/// Daily usage record key: `user_id || YYYYMMDD || slot (u32 BE)`.
#[must_use]
pub fn daily_usage_key(user_id: &UserId, day: UsageDay, slot: u32) -> Vec<u8> {
    let mut key = usage_counter_key(user_id, day);
    key.extend_from_slice(&slot.to_be_bytes());
    key
}

/// Reward grant key: `kind || 0x00 || idempotency key`.
#[must_use]
pub fn grant_key(kind: RewardKind, key: &IdempotencyKey) -> Vec<u8> {
    let mut out = Vec::with_capacity(kind.as_str().len() + 1 + key.as_str().len());
    out.extend_from_slice(kind.as_str().as_bytes());
    out.push(0);
    out.extend_from_slice(key.as_str().as_bytes());
    out
}

/// Action key: the 16 ULID bytes.
#[must_use]
pub fn action_key(action_id: &ActionId) -> Vec<u8> {
    action_id.to_bytes().to_vec()
}
