//! Ledger Store: the only writer of wallet balances.

use std::sync::Arc;

use augur_core::{
    ActionId, Balance, BillingError, Currency, LedgerEntry, Result, UserId, Wallet,
    DIAMOND_TO_CREDIT_RATE,
};
use augur_store::Store;

use crate::config::ConfigSource;

/// Balance operations over the wallet table.
///
/// Every method is a single atomic storage operation. A failed debit leaves no trace.
#[derive(Clone)]
pub struct LedgerStore {
    store: Arc<dyn Store>,
    config: Arc<dyn ConfigSource>,
}

impl LedgerStore {
    /// Create a ledger over `store`.
    #[must_use]
    pub fn new(store: Arc<dyn Store>, config: Arc<dyn ConfigSource>) -> Self {
        Self { store, config }
    }

    /// The wallet for `user_id`, created with welcome credits if absent.
    pub async fn wallet(&self, user_id: &UserId) -> Result<Wallet> {
        let welcome = self.config.welcome_credits().await;
        Ok(self.store.get_or_create_wallet(user_id, welcome)?)
    }

    /// Current balances. Creates the wallet if absent.
    pub async fn get_balance(&self, user_id: &UserId) -> Result<Balance> {
        self.wallet(user_id).await.map(|w| w.balance())
    }

    /// Conditionally take `amount` credits for `action_id`.
    ///
    /// # Errors
    ///
    /// [`BillingError::InsufficientCredits`] if the balance does not cover `amount`; the
    /// wallet is unchanged.
    pub async fn debit(
        &self,
        user_id: &UserId,
        amount: i64,
        action_id: ActionId,
    ) -> Result<Wallet> {
        ensure_positive(amount)?;
        let welcome = self.config.welcome_credits().await;
        let entry = LedgerEntry::debit(*user_id, amount, action_id);
        let wallet = self.store.apply_entries(user_id, &[entry], welcome)?;

        tracing::info!(
            user_id = %user_id,
            action_id = %action_id,
            amount,
            credits = wallet.credits,
            "Credits debited"
        );
        Ok(wallet)
    }

    /// Add `amount` credits as an operator bonus.
    pub async fn credit(&self, user_id: &UserId, amount: i64, reason: String) -> Result<Wallet> {
        ensure_positive(amount)?;
        let welcome = self.config.welcome_credits().await;
        let entry = LedgerEntry::bonus(*user_id, amount, reason);
        let wallet = self.store.apply_entries(user_id, &[entry], welcome)?;

        tracing::info!(user_id = %user_id, amount, credits = wallet.credits, "Credits added");
        Ok(wallet)
    }

    /// Return `amount` credits taken for `action_id`.
    ///
    /// Does not await, so it can run from a drop guard.
    pub fn reverse(&self, user_id: &UserId, amount: i64, action_id: ActionId) -> Result<Wallet> {
        ensure_positive(amount)?;
        let entry = LedgerEntry::reversal(*user_id, amount, action_id);
        // The wallet exists: it was just debited.
        let wallet = self.store.apply_entries(user_id, &[entry], 0)?;

        tracing::info!(
            user_id = %user_id,
            action_id = %action_id,
            amount,
            credits = wallet.credits,
            "Charge reversed"
        );
        Ok(wallet)
    }

    /// Exchange `diamonds` for credits at [`DIAMOND_TO_CREDIT_RATE`].
    ///
    /// # Errors
    ///
    /// [`BillingError::InsufficientDiamonds`] if the diamond balance is too low; nothing
    /// changes.
    pub async fn convert_diamonds(&self, user_id: &UserId, diamonds: i64) -> Result<Wallet> {
        ensure_positive(diamonds)?;
        let credits = diamonds
            .checked_mul(DIAMOND_TO_CREDIT_RATE)
            .ok_or_else(|| BillingError::InvalidAmount(format!("{diamonds} diamonds overflows")))?;
        let welcome = self.config.welcome_credits().await;
        let entries = [
            LedgerEntry::conversion(*user_id, -diamonds, Currency::Diamonds),
            LedgerEntry::conversion(*user_id, credits, Currency::Credits),
        ];
        let wallet = self.store.apply_entries(user_id, &entries, welcome)?;

        tracing::info!(user_id = %user_id, diamonds, credits, "Diamonds converted");
        Ok(wallet)
    }

    /// Zero both balances on account deletion. The wallet row is kept.
    pub async fn reset(&self, user_id: &UserId) -> Result<Wallet> {
        // Make sure there is something to reset.
        self.wallet(user_id).await?;
        let wallet = self.store.reset_wallet(user_id)?;
        tracing::info!(user_id = %user_id, "Wallet reset");
        Ok(wallet)
    }

    /// Ledger entries, newest first.
    pub fn history(
        &self,
        user_id: &UserId,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<LedgerEntry>> {
        Ok(self.store.list_entries(user_id, limit, offset)?)
    }
}

fn ensure_positive(amount: i64) -> Result<()> {
    if amount > 0 {
        Ok(())
    } else {
        Err(BillingError::InvalidAmount(format!(
            "amount must be positive, got {amount}"
        )))
    }
}
