//! Ledger entries recording every wallet mutation.
//!
//! An entry is written in the same atomic unit as the wallet change it describes, so the
//! entry history of a user always sums to the wallet balance.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ActionId, Currency, EntryId, RewardKind, UserId};

/// A single balance change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique entry id.
    pub id: EntryId,

    /// Position in the user's history, strictly increasing per wallet.
    ///
    /// Assigned by the store when the entry is committed.
    #[serde(default)]
    pub seq: u64,

    /// The user whose wallet changed.
    pub user_id: UserId,

    /// Signed amount. Positive = credit, negative = debit.
    pub amount: i64,

    /// Currency the amount is denominated in.
    pub currency: Currency,

    /// Why the balance changed.
    pub kind: EntryKind,

    /// Balance of `currency` after this entry was applied.
    ///
    /// Filled in by the store when the entry is committed.
    pub balance_after: i64,

    /// Action the entry belongs to, if any.
    pub action_id: Option<ActionId>,

    /// Human-readable description.
    pub description: String,

    /// When the entry was created.
    pub created_at: DateTime<Utc>,
}

impl LedgerEntry {
    fn new(
        user_id: UserId,
        amount: i64,
        currency: Currency,
        kind: EntryKind,
        description: String,
    ) -> Self {
        Self {
            id: EntryId::generate(),
            seq: 0,
            user_id,
            amount,
            currency,
            kind,
            balance_after: 0,
            action_id: None,
            description,
            created_at: Utc::now(),
        }
    }

    /// Welcome credits granted when the wallet is created.
    #[must_use]
    pub fn welcome(user_id: UserId, amount: i64) -> Self {
        Self::new(user_id, amount, Currency::Credits, EntryKind::Welcome, "Welcome credits".into())
    }

    /// Charge for a billable action. The amount is always stored negative.
    #[must_use]
    pub fn debit(user_id: UserId, amount: i64, action_id: ActionId) -> Self {
        let mut entry = Self::new(
            user_id,
            -amount.abs(),
            Currency::Credits,
            EntryKind::Debit,
            format!("Charge for action {action_id}"),
        );
        entry.action_id = Some(action_id);
        entry
    }

    /// Compensating credit undoing a prior debit.
    #[must_use]
    pub fn reversal(user_id: UserId, amount: i64, action_id: ActionId) -> Self {
        let mut entry = Self::new(
            user_id,
            amount.abs(),
            Currency::Credits,
            EntryKind::Reversal,
            format!("Reversal of charge for action {action_id}"),
        );
        entry.action_id = Some(action_id);
        entry
    }

    /// Reward granted by the reward issuer.
    #[must_use]
    pub fn reward(
        user_id: UserId,
        amount: i64,
        currency: Currency,
        kind: RewardKind,
        key: &str,
    ) -> Self {
        let entry_kind = match kind {
            RewardKind::PurchaseGrant | RewardKind::SubscriptionGrant => EntryKind::Purchase,
            RewardKind::DailyLogin | RewardKind::AdWatch => EntryKind::Reward,
        };
        Self::new(
            user_id,
            amount,
            currency,
            entry_kind,
            format!("{} ({key})", kind.as_str()),
        )
    }

    /// Manual bonus issued by an operator.
    #[must_use]
    pub fn bonus(user_id: UserId, amount: i64, reason: String) -> Self {
        Self::new(user_id, amount, Currency::Credits, EntryKind::Bonus, reason)
    }

    /// One half of a diamond-to-credit conversion.
    #[must_use]
    pub fn conversion(user_id: UserId, amount: i64, currency: Currency) -> Self {
        Self::new(user_id, amount, currency, EntryKind::Conversion, "Diamond conversion".into())
    }

    /// Zeroing of a currency on account deletion.
    #[must_use]
    pub fn reset(user_id: UserId, amount: i64, currency: Currency) -> Self {
        Self::new(user_id, -amount.abs(), currency, EntryKind::Reset, "Account deletion".into())
    }
}

/// Reason for a ledger entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Welcome credits on wallet creation.
    Welcome,
    /// Charge for a billable action.
    Debit,
    /// Compensating reversal of a charge.
    Reversal,
    /// Daily login or ad-watch reward.
    Reward,
    /// Purchase or subscription grant.
    Purchase,
    /// Operator bonus.
    Bonus,
    /// Diamond-to-credit conversion.
    Conversion,
    /// Zeroed on account deletion.
    Reset,
}
