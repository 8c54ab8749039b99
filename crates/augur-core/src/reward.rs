//! Reward rules and grant records.
//!
//! Earning rules arrive from configuration as loosely typed rows; they are parsed once into
//! a [`RewardSchedule`] keyed by the closed [`RewardKind`] enum, so no lookup by string
//! happens on the claim path.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Currency, EntryId, UsageDay, UserId};

/// Events that can earn currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewardKind {
    /// Once per user per UTC day.
    DailyLogin,
    /// Once per ad impression.
    #[serde(alias = "watch_ad")]
    AdWatch,
    /// One-time purchase confirmed by the payment provider.
    #[serde(alias = "purchase")]
    PurchaseGrant,
    /// Subscription renewal confirmed by the payment provider.
    #[serde(alias = "subscription")]
    SubscriptionGrant,
}

impl RewardKind {
    /// Stable name used in configuration and storage keys.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::DailyLogin => "daily_login",
            Self::AdWatch => "ad_watch",
            Self::PurchaseGrant => "purchase_grant",
            Self::SubscriptionGrant => "subscription_grant",
        }
    }

    /// Whether the granted amount is supplied by the event rather than by a rule.
    #[must_use]
    pub const fn is_provider_priced(&self) -> bool {
        matches!(self, Self::PurchaseGrant | Self::SubscriptionGrant)
    }
}

impl FromStr for RewardKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "daily_login" => Ok(Self::DailyLogin),
            "watch_ad" | "ad_watch" => Ok(Self::AdWatch),
            "purchase" | "purchase_grant" => Ok(Self::PurchaseGrant),
            "subscription" | "subscription_grant" => Ok(Self::SubscriptionGrant),
            other => Err(format!("unknown earning rule type: {other}")),
        }
    }
}

/// A configured way to earn currency. Read-only to the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EarningRule {
    /// Which event the rule rewards.
    #[serde(rename = "type")]
    pub kind: RewardKind,

    /// Amount granted per qualifying event.
    pub reward_amount: i64,

    /// Currency the reward is paid in.
    #[serde(default)]
    pub currency: Currency,

    /// Inactive rules grant nothing.
    #[serde(default = "default_active")]
    pub active: bool,
}

const fn default_active() -> bool {
    true
}

/// Active earning rules indexed by kind.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RewardSchedule {
    rules: HashMap<RewardKind, EarningRule>,
}

impl RewardSchedule {
    /// Index the active rules. Later rules of the same kind replace earlier ones.
    ///
    /// # Errors
    ///
    /// Returns an error if an active rule carries a negative amount.
    pub fn from_rules(rules: impl IntoIterator<Item = EarningRule>) -> Result<Self, String> {
        let mut indexed = HashMap::new();
        for rule in rules {
            if !rule.active {
                continue;
            }
            if rule.reward_amount < 0 {
                return Err(format!(
                    "negative reward amount for {}: {}",
                    rule.kind.as_str(),
                    rule.reward_amount
                ));
            }
            indexed.insert(rule.kind, rule);
        }
        Ok(Self { rules: indexed })
    }

    /// The active rule for `kind`, if any.
    #[must_use]
    pub fn rule(&self, kind: RewardKind) -> Option<&EarningRule> {
        self.rules.get(&kind)
    }

    /// Iterate over active rules.
    pub fn rules(&self) -> impl Iterator<Item = &EarningRule> {
        self.rules.values()
    }
}

/// Identifies one reward-granting event so redelivery cannot grant twice.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdempotencyKey(String);

impl IdempotencyKey {
    /// Daily login: one per user per day.
    #[must_use]
    pub fn daily(user_id: UserId, day: UsageDay) -> Self {
        Self(format!("{user_id}:{day}"))
    }

    /// Ad-watch: one per user per impression.
    #[must_use]
    pub fn ad_impression(user_id: UserId, impression_id: &str) -> Self {
        Self(format!("{user_id}:{impression_id}"))
    }

    /// Purchase or subscription: the provider transaction id.
    #[must_use]
    pub fn transaction(transaction_id: &str) -> Self {
        Self(transaction_id.to_string())
    }

    /// The key as a string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdempotencyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Proof that a reward was granted. Written atomically with the balance credit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardGrant {
    /// The rewarded user.
    pub user_id: UserId,

    /// Which rule granted it.
    pub kind: RewardKind,

    /// Unique per kind.
    pub key: IdempotencyKey,

    /// Amount granted.
    pub amount: i64,

    /// Currency granted.
    pub currency: Currency,

    /// Ledger entry recording the credit.
    pub entry_id: EntryId,

    /// When the grant was committed.
    pub created_at: DateTime<Utc>,
}
