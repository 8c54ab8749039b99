//! Wallet arithmetic shared by the storage backends.
//!
//! Backends load the locked wallet row, call into here, and write back whatever is
//! returned. Nothing in this module touches storage.

use augur_core::{
    ActionId, ActionRecord, ActionStatus, BalanceError, Currency, LedgerEntry, UserId, Wallet,
};

use crate::error::{Result, StoreError};

/// The rows a wallet mutation produces.
pub(crate) struct WalletChange {
    /// The wallet after every entry was applied.
    pub wallet: Wallet,
    /// Entries to persist, with `balance_after` set. Includes the welcome entry when the
    /// wallet was created by this change.
    pub entries: Vec<LedgerEntry>,
    /// Whether the wallet row must be written.
    pub dirty: bool,
}

/// Apply `entries` to `existing` (or a fresh wallet holding `welcome_credits`).
pub(crate) fn apply(
    user_id: &UserId,
    existing: Option<Wallet>,
    entries: &[LedgerEntry],
    welcome_credits: i64,
) -> Result<WalletChange> {
    let mut committed = Vec::with_capacity(entries.len() + 1);
    let (mut wallet, created) = match existing {
        Some(wallet) => (wallet, false),
        None => {
            let wallet = Wallet::new(*user_id, welcome_credits);
            if wallet.credits > 0 {
                let mut welcome = LedgerEntry::welcome(*user_id, wallet.credits);
                welcome.balance_after = wallet.credits;
                committed.push(welcome);
            }
            (wallet, true)
        }
    };

    for entry in entries {
        let balance = wallet.amount_of(entry.currency);
        match wallet.apply(entry.currency, entry.amount) {
            Ok(()) => {}
            Err(BalanceError::Insufficient) => {
                return Err(StoreError::InsufficientBalance {
                    currency: entry.currency,
                    balance,
                    required: entry.amount.saturating_neg(),
                });
            }
            Err(BalanceError::Overflow) => {
                return Err(StoreError::BalanceOverflow {
                    currency: entry.currency,
                    balance,
                    amount: entry.amount,
                });
            }
        }
        let mut entry = entry.clone();
        entry.user_id = *user_id;
        entry.balance_after = wallet.amount_of(entry.currency);
        entry.seq = wallet.version;
        committed.push(entry);
    }

    Ok(WalletChange {
        wallet,
        entries: committed,
        dirty: created || !entries.is_empty(),
    })
}

/// Zero an existing wallet, producing one reset entry per non-empty currency.
pub(crate) fn reset(mut wallet: Wallet) -> WalletChange {
    let mut entries = Vec::with_capacity(2);
    for currency in [Currency::Credits, Currency::Diamonds] {
        let amount = wallet.amount_of(currency);
        if amount > 0 && wallet.apply(currency, -amount).is_ok() {
            let mut entry = LedgerEntry::reset(wallet.user_id, amount, currency);
            entry.seq = wallet.version;
            entries.push(entry);
        }
    }
    WalletChange {
        wallet,
        entries,
        dirty: true,
    }
}

/// Move an action to `status`, or explain why it can't.
pub(crate) fn transition(
    action_id: &ActionId,
    existing: Option<ActionRecord>,
    status: ActionStatus,
    reason: Option<String>,
) -> Result<ActionRecord> {
    let mut action = existing.ok_or_else(|| StoreError::NotFound {
        entity: "action",
        id: action_id.to_string(),
    })?;
    if !action.transition(status, reason) {
        return Err(StoreError::Conflict(format!(
            "action {action_id} cannot move from {:?} to {status:?}",
            action.status
        )));
    }
    Ok(action)
}
