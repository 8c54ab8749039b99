//! Wallet types.
//!
//! A wallet is owned by exactly one user and is created lazily on first access with the
//! configured welcome credits. It is never deleted; account deletion zeroes it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

/// Credits granted to a wallet on creation when no configuration overrides it.
pub const DEFAULT_WELCOME_CREDITS: i64 = 100;

/// Credits received per diamond on conversion.
pub const DIAMOND_TO_CREDIT_RATE: i64 = 10;

/// Currency a balance change applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Currency {
    /// Primary consumable currency.
    #[default]
    Credits,
    /// Secondary currency earned through rewards.
    Diamonds,
}

/// Why a balance change was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum BalanceError {
    /// The balance does not cover the decrement.
    #[error("balance would go negative")]
    Insufficient,

    /// The increment does not fit in the balance.
    #[error("balance would overflow")]
    Overflow,
}

/// A user's balance record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    /// Owner of the wallet.
    pub user_id: UserId,

    /// Credit balance. Never negative.
    pub credits: i64,

    /// Diamond balance. Never negative.
    pub diamonds: i64,

    /// Incremented on every committed mutation.
    pub version: u64,

    /// When the wallet was created.
    pub created_at: DateTime<Utc>,

    /// When the wallet was last mutated.
    pub updated_at: DateTime<Utc>,
}

impl Wallet {
    /// Create a wallet holding the welcome credits.
    #[must_use]
    pub fn new(user_id: UserId, welcome_credits: i64) -> Self {
        let now = Utc::now();
        Self {
            user_id,
            credits: welcome_credits.max(0),
            diamonds: 0,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    /// Current balance in both currencies.
    #[must_use]
    pub const fn balance(&self) -> Balance {
        Balance {
            credits: self.credits,
            diamonds: self.diamonds,
        }
    }

    /// Balance held in the given currency.
    #[must_use]
    pub const fn amount_of(&self, currency: Currency) -> i64 {
        match currency {
            Currency::Credits => self.credits,
            Currency::Diamonds => self.diamonds,
        }
    }

    /// Apply a signed change to one currency.
    ///
    /// On error the wallet is left untouched.
    ///
    /// # Errors
    ///
    /// - [`BalanceError::Insufficient`] if the balance would go negative.
    /// - [`BalanceError::Overflow`] if it would exceed `i64::MAX`.
    pub fn apply(&mut self, currency: Currency, delta: i64) -> Result<(), BalanceError> {
        let slot = match currency {
            Currency::Credits => &mut self.credits,
            Currency::Diamonds => &mut self.diamonds,
        };
        match slot.checked_add(delta) {
            Some(next) if next >= 0 => {
                *slot = next;
                self.touch();
                Ok(())
            }
            Some(_) => Err(BalanceError::Insufficient),
            None if delta > 0 => Err(BalanceError::Overflow),
            None => Err(BalanceError::Insufficient),
        }
    }

    fn touch(&mut self) {
        self.version += 1;
        self.updated_at = Utc::now();
    }
}

/// Both balances of a wallet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Balance {
    /// Credit balance.
    pub credits: i64,
    /// Diamond balance.
    pub diamonds: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_wallet_holds_welcome_credits() {
        let wallet = Wallet::new(UserId::generate(), 100);
        assert_eq!(wallet.balance(), Balance { credits: 100, diamonds: 0 });
        assert_eq!(wallet.version, 0);
    }

    #[test]
    fn negative_welcome_amount_is_clamped() {
        let wallet = Wallet::new(UserId::generate(), -5);
        assert_eq!(wallet.credits, 0);
    }

    #[test]
    fn apply_refuses_to_go_negative() {
        let mut wallet = Wallet::new(UserId::generate(), 10);
        assert_eq!(
            wallet.apply(Currency::Credits, -11),
            Err(BalanceError::Insufficient)
        );
        assert_eq!(wallet.credits, 10);
        assert_eq!(wallet.version, 0);

        assert_eq!(wallet.apply(Currency::Credits, -10), Ok(()));
        assert_eq!(wallet.credits, 0);
        assert_eq!(wallet.version, 1);
    }

    #[test]
    fn apply_refuses_overflow() {
        let mut wallet = Wallet::new(UserId::generate(), 0);
        assert_eq!(wallet.apply(Currency::Diamonds, i64::MAX), Ok(()));
        assert_eq!(
            wallet.apply(Currency::Diamonds, 1),
            Err(BalanceError::Overflow)
        );
        assert_eq!(wallet.diamonds, i64::MAX);
    }

    #[test]
    fn every_change_bumps_version() {
        let mut wallet = Wallet::new(UserId::generate(), 50);
        assert_eq!(wallet.apply(Currency::Diamonds, 7), Ok(()));
        assert_eq!(wallet.apply(Currency::Credits, -50), Ok(()));
        assert_eq!(wallet.version, 2);
        assert_eq!(wallet.balance(), Balance { credits: 0, diamonds: 7 });
    }
}
