//! Reward Issuer: idempotent grants for qualifying events.
//!
//! A grant row and its balance credit are written in one storage operation. The grant row is
//! unique on `(kind, idempotency key)`, so a repeated delivery fails on insert rather than
//! after a separate existence check.

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use augur_core::{
    Balance, BillingError, Currency, IdempotencyKey, LedgerEntry, Result, RewardGrant,
    RewardKind, UsageDay, UserId,
};
use augur_store::Store;

use crate::clock::Clock;
use crate::config::ConfigSource;

/// Outcome of a daily reward claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyClaim {
    /// Whether this call granted the reward.
    pub granted: bool,
    /// Amount granted; zero when already claimed today.
    pub amount: i64,
    /// Currency of the reward.
    pub currency: Currency,
    /// Balances after the call.
    pub balance: Balance,
}

/// Whether today's daily reward can still be claimed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyRewardStatus {
    /// UTC day the status refers to.
    pub day: UsageDay,
    /// `true` if not yet claimed today and a daily rule is active.
    pub eligible: bool,
    /// Amount the claim would grant.
    pub amount: i64,
    /// Currency of the reward.
    pub currency: Currency,
}

/// Issues rewards exactly once per idempotency key.
#[derive(Clone)]
pub struct RewardIssuer {
    store: Arc<dyn Store>,
    config: Arc<dyn ConfigSource>,
    clock: Arc<dyn Clock>,
}

impl RewardIssuer {
    /// Create an issuer over `store`.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        config: Arc<dyn ConfigSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            config,
            clock,
        }
    }

    /// `true` if no grant exists for `key` yet.
    pub fn is_eligible(&self, kind: RewardKind, key: &IdempotencyKey) -> Result<bool> {
        Ok(!self.store.has_grant(kind, key)?)
    }

    /// Grant the reward for `kind` under `key`.
    ///
    /// Rule-priced kinds take amount and currency from the earning rules; provider-priced
    /// kinds (purchases, subscriptions) take `amount` from the event, in credits unless a
    /// rule says otherwise.
    ///
    /// # Errors
    ///
    /// - [`BillingError::AlreadyClaimed`] if `key` was already granted; nothing is credited.
    /// - [`BillingError::RewardUnavailable`] if no active rule covers a rule-priced kind.
    /// - [`BillingError::InvalidAmount`] if a provider-priced claim has no positive amount.
    pub async fn claim(
        &self,
        user_id: &UserId,
        kind: RewardKind,
        key: IdempotencyKey,
        amount: Option<i64>,
    ) -> Result<(RewardGrant, Balance)> {
        let (amount, currency) = self.price(kind, amount).await?;
        let welcome = self.config.welcome_credits().await;

        let entry = LedgerEntry::reward(*user_id, amount, currency, kind, key.as_str());
        let grant = RewardGrant {
            user_id: *user_id,
            kind,
            key,
            amount,
            currency,
            entry_id: entry.id,
            created_at: Utc::now(),
        };

        let wallet = match self.store.record_grant(&grant, &entry, welcome) {
            Ok(wallet) => wallet,
            Err(e) => {
                let err = BillingError::from(e);
                if matches!(err, BillingError::AlreadyClaimed { .. }) {
                    tracing::debug!(
                        user_id = %user_id,
                        kind = kind.as_str(),
                        key = %grant.key,
                        "Reward already claimed"
                    );
                }
                return Err(err);
            }
        };

        tracing::info!(
            user_id = %user_id,
            kind = kind.as_str(),
            key = %grant.key,
            amount,
            currency = ?currency,
            "Reward granted"
        );
        Ok((grant, wallet.balance()))
    }

    /// Claim today's login reward. A second claim on the same UTC day grants nothing.
    pub async fn claim_daily(&self, user_id: &UserId) -> Result<DailyClaim> {
        let day = self.clock.today();
        let key = IdempotencyKey::daily(*user_id, day);
        match self.claim(user_id, RewardKind::DailyLogin, key, None).await {
            Ok((grant, balance)) => Ok(DailyClaim {
                granted: true,
                amount: grant.amount,
                currency: grant.currency,
                balance,
            }),
            Err(BillingError::AlreadyClaimed { .. }) => {
                let (_, currency) = self.price(RewardKind::DailyLogin, None).await?;
                let welcome = self.config.welcome_credits().await;
                let wallet = self.store.get_or_create_wallet(user_id, welcome)?;
                Ok(DailyClaim {
                    granted: false,
                    amount: 0,
                    currency,
                    balance: wallet.balance(),
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Reward a completed ad view, once per impression.
    pub async fn claim_ad(
        &self,
        user_id: &UserId,
        impression_id: &str,
    ) -> Result<(RewardGrant, Balance)> {
        let key = IdempotencyKey::ad_impression(*user_id, impression_id);
        self.claim(user_id, RewardKind::AdWatch, key, None).await
    }

    /// Grant purchased credits, once per provider transaction.
    pub async fn claim_purchase(
        &self,
        user_id: &UserId,
        transaction_id: &str,
        amount: i64,
    ) -> Result<(RewardGrant, Balance)> {
        let key = IdempotencyKey::transaction(transaction_id);
        self.claim(user_id, RewardKind::PurchaseGrant, key, Some(amount)).await
    }

    /// Grant subscription credits, once per provider transaction.
    pub async fn claim_subscription(
        &self,
        user_id: &UserId,
        transaction_id: &str,
        amount: i64,
    ) -> Result<(RewardGrant, Balance)> {
        let key = IdempotencyKey::transaction(transaction_id);
        self.claim(user_id, RewardKind::SubscriptionGrant, key, Some(amount))
            .await
    }

    /// Today's daily reward eligibility.
    pub async fn daily_reward_status(&self, user_id: &UserId) -> Result<DailyRewardStatus> {
        let day = self.clock.today();
        let schedule = self.config.reward_schedule().await;
        let rule = schedule.rule(RewardKind::DailyLogin);
        let claimed = self
            .store
            .has_grant(RewardKind::DailyLogin, &IdempotencyKey::daily(*user_id, day))?;

        Ok(DailyRewardStatus {
            day,
            eligible: rule.is_some_and(|r| r.reward_amount > 0) && !claimed,
            amount: rule.map_or(0, |r| r.reward_amount),
            currency: rule.map_or(Currency::Credits, |r| r.currency),
        })
    }

    async fn price(&self, kind: RewardKind, amount: Option<i64>) -> Result<(i64, Currency)> {
        let schedule = self.config.reward_schedule().await;
        let rule = schedule.rule(kind);

        if kind.is_provider_priced() {
            let amount = amount.filter(|a| *a > 0).ok_or_else(|| {
                BillingError::InvalidAmount(format!("{} requires a positive amount", kind.as_str()))
            })?;
            return Ok((amount, rule.map_or(Currency::Credits, |r| r.currency)));
        }

        match rule {
            Some(rule) if rule.reward_amount > 0 => Ok((rule.reward_amount, rule.currency)),
            _ => Err(BillingError::RewardUnavailable { kind }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::config::{EngineConfig, StaticConfig};
    use augur_core::EarningRule;
    use augur_store::MemoryStore;
    use chrono::{Duration, TimeZone};

    struct Fixture {
        issuer: RewardIssuer,
        clock: Arc<FixedClock>,
    }

    fn fixture(rules: Vec<EarningRule>) -> Fixture {
        let config = StaticConfig::new(
            EngineConfig::default()
                .with_welcome_credits(100)
                .with_earning_rules(rules)
                .unwrap(),
        );
        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap(),
        ));
        let issuer = RewardIssuer::new(
            Arc::new(MemoryStore::new()),
            Arc::new(config),
            Arc::clone(&clock) as Arc<dyn Clock>,
        );
        Fixture { issuer, clock }
    }

    fn rule(kind: RewardKind, amount: i64, currency: Currency) -> EarningRule {
        EarningRule {
            kind,
            reward_amount: amount,
            currency,
            active: true,
        }
    }

    #[tokio::test]
    async fn daily_reward_once_per_day() {
        let Fixture { issuer, clock } =
            fixture(vec![rule(RewardKind::DailyLogin, 10, Currency::Credits)]);
        let user = UserId::generate();

        let first = issuer.claim_daily(&user).await.unwrap();
        assert!(first.granted);
        assert_eq!(first.amount, 10);
        assert_eq!(first.balance.credits, 110);

        let second = issuer.claim_daily(&user).await.unwrap();
        assert!(!second.granted);
        assert_eq!(second.amount, 0);
        assert_eq!(second.balance.credits, 110);
        assert!(!issuer.daily_reward_status(&user).await.unwrap().eligible);

        clock.advance(Duration::days(1));
        assert!(issuer.daily_reward_status(&user).await.unwrap().eligible);
        assert_eq!(issuer.claim_daily(&user).await.unwrap().balance.credits, 120);
    }

    #[tokio::test]
    async fn ad_reward_per_impression_in_diamonds() {
        let Fixture { issuer, .. } =
            fixture(vec![rule(RewardKind::AdWatch, 3, Currency::Diamonds)]);
        let user = UserId::generate();

        let (grant, balance) = issuer.claim_ad(&user, "imp-1").await.unwrap();
        assert_eq!(grant.currency, Currency::Diamonds);
        assert_eq!(balance.diamonds, 3);

        assert!(matches!(
            issuer.claim_ad(&user, "imp-1").await,
            Err(BillingError::AlreadyClaimed { .. })
        ));
        let (_, balance) = issuer.claim_ad(&user, "imp-2").await.unwrap();
        assert_eq!(balance.diamonds, 6);
    }

    #[tokio::test]
    async fn purchase_uses_event_amount_and_transaction_key() {
        let Fixture { issuer, .. } = fixture(vec![]);
        let user = UserId::generate();
        let key = IdempotencyKey::transaction("txn_1");

        assert!(issuer.is_eligible(RewardKind::PurchaseGrant, &key).unwrap());
        let (_, balance) = issuer.claim_purchase(&user, "txn_1", 500).await.unwrap();
        assert_eq!(balance.credits, 600);
        assert!(!issuer.is_eligible(RewardKind::PurchaseGrant, &key).unwrap());

        assert!(matches!(
            issuer.claim_purchase(&user, "txn_1", 500).await,
            Err(BillingError::AlreadyClaimed { .. })
        ));
        assert!(matches!(
            issuer.claim_subscription(&user, "txn_2", 0).await,
            Err(BillingError::InvalidAmount(_))
        ));
    }

    #[tokio::test]
    async fn overflowing_purchase_is_rejected_not_underfunded() {
        let Fixture { issuer, .. } = fixture(vec![]);
        let user = UserId::generate();

        assert!(matches!(
            issuer.claim_purchase(&user, "txn_huge", i64::MAX).await,
            Err(BillingError::InvalidAmount(_))
        ));
        let key = IdempotencyKey::transaction("txn_huge");
        assert!(issuer.is_eligible(RewardKind::PurchaseGrant, &key).unwrap());

        let (_, balance) = issuer.claim_purchase(&user, "txn_ok", 5).await.unwrap();
        assert_eq!(balance.credits, 105);
    }

    #[tokio::test]
    async fn missing_rule_is_unavailable() {
        let Fixture { issuer, .. } = fixture(vec![]);
        let user = UserId::generate();

        assert!(matches!(
            issuer.claim_ad(&user, "imp").await,
            Err(BillingError::RewardUnavailable {
                kind: RewardKind::AdWatch
            })
        ));
        let status = issuer.daily_reward_status(&user).await.unwrap();
        assert!(!status.eligible);
        assert_eq!(status.amount, 0);
    }
}
