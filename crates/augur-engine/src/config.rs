//! Engine configuration.
//!
//! The engine reads its tunables through [`ConfigSource`] so they can come from a remote
//! configuration service. A missing value disables the feature it controls: no daily limit
//! means no free tier, no cost means cost enforcement is off for that action type.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use augur_core::{
    ActionType, BillingError, Currency, EarningRule, RewardKind, RewardSchedule,
    DEFAULT_WELCOME_CREDITS,
};

/// Read-only source of engine configuration.
#[async_trait]
pub trait ConfigSource: Send + Sync {
    /// Free actions per user per day, or `None` when there is no free tier.
    async fn daily_free_limit(&self) -> Option<u32>;

    /// Credit cost of an action type, or `None` when the type is not charged.
    async fn action_cost(&self, action_type: &ActionType) -> Option<i64>;

    /// Active earning rules.
    async fn reward_schedule(&self) -> Arc<RewardSchedule>;

    /// Credits granted when a wallet is first created.
    async fn welcome_credits(&self) -> i64;
}

/// Resolved engine settings.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Credits granted on wallet creation.
    pub welcome_credits: i64,

    /// Free actions per user per UTC day.
    pub daily_free_limit: Option<u32>,

    /// Credit cost per action type.
    pub action_costs: HashMap<ActionType, i64>,

    /// Active earning rules.
    pub rewards: Arc<RewardSchedule>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            welcome_credits: DEFAULT_WELCOME_CREDITS,
            daily_free_limit: None,
            action_costs: HashMap::new(),
            rewards: Arc::new(default_reward_schedule()),
        }
    }
}

impl EngineConfig {
    /// Set the cost of one action type.
    #[must_use]
    pub fn with_cost(mut self, action_type: ActionType, cost: i64) -> Self {
        self.action_costs.insert(action_type, cost);
        self
    }

    /// Set the daily free limit.
    #[must_use]
    pub const fn with_daily_free_limit(mut self, limit: Option<u32>) -> Self {
        self.daily_free_limit = limit;
        self
    }

    /// Set the welcome credits.
    #[must_use]
    pub const fn with_welcome_credits(mut self, credits: i64) -> Self {
        self.welcome_credits = credits;
        self
    }

    /// Replace the earning rules.
    ///
    /// # Errors
    ///
    /// Returns [`BillingError::Configuration`] if a rule is invalid.
    pub fn with_earning_rules(
        mut self,
        rules: impl IntoIterator<Item = EarningRule>,
    ) -> Result<Self, BillingError> {
        let schedule = RewardSchedule::from_rules(rules).map_err(BillingError::Configuration)?;
        self.rewards = Arc::new(schedule);
        Ok(self)
    }
}

/// Parse a cost table of the form `fortune=50,tarot=80`.
///
/// # Errors
///
/// Returns [`BillingError::Configuration`] on a malformed pair, an invalid action type or a
/// negative cost.
pub fn parse_action_costs(raw: &str) -> Result<HashMap<ActionType, i64>, BillingError> {
    let mut costs = HashMap::new();
    for pair in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (name, cost) = pair.split_once('=').ok_or_else(|| {
            BillingError::Configuration(format!("expected type=cost, got {pair:?}"))
        })?;
        let action_type: ActionType = name
            .trim()
            .parse()
            .map_err(BillingError::Configuration)?;
        let cost: i64 = cost.trim().parse().map_err(|_| {
            BillingError::Configuration(format!("invalid cost for {name}: {cost:?}"))
        })?;
        if cost < 0 {
            return Err(BillingError::Configuration(format!(
                "negative cost for {name}: {cost}"
            )));
        }
        costs.insert(action_type, cost);
    }
    Ok(costs)
}

/// Rules used when no earning rules are configured.
#[must_use]
pub fn default_earning_rules() -> Vec<EarningRule> {
    vec![
        EarningRule {
            kind: RewardKind::DailyLogin,
            reward_amount: 20,
            currency: Currency::Credits,
            active: true,
        },
        EarningRule {
            kind: RewardKind::AdWatch,
            reward_amount: 5,
            currency: Currency::Diamonds,
            active: true,
        },
    ]
}

fn default_reward_schedule() -> RewardSchedule {
    // The built-in rules are non-negative.
    RewardSchedule::from_rules(default_earning_rules()).unwrap_or_default()
}

/// A [`ConfigSource`] over a fixed [`EngineConfig`].
#[derive(Debug, Clone, Default)]
pub struct StaticConfig {
    config: Arc<EngineConfig>,
}

impl StaticConfig {
    /// Wrap a resolved configuration.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// The wrapped configuration.
    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

#[async_trait]
impl ConfigSource for StaticConfig {
    async fn daily_free_limit(&self) -> Option<u32> {
        self.config.daily_free_limit
    }

    async fn action_cost(&self, action_type: &ActionType) -> Option<i64> {
        self.config.action_costs.get(action_type).copied()
    }

    async fn reward_schedule(&self) -> Arc<RewardSchedule> {
        Arc::clone(&self.config.rewards)
    }

    async fn welcome_credits(&self) -> i64 {
        self.config.welcome_credits
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cost_table() {
        let costs = parse_action_costs("fortune=50, tarot = 80,").unwrap();
        assert_eq!(costs.len(), 2);
        assert_eq!(costs[&ActionType::fortune()], 50);
        assert_eq!(costs[&"tarot".parse::<ActionType>().unwrap()], 80);
        assert!(parse_action_costs("").unwrap().is_empty());
    }

    #[test]
    fn rejects_bad_cost_tables() {
        assert!(parse_action_costs("fortune").is_err());
        assert!(parse_action_costs("fortune=abc").is_err());
        assert!(parse_action_costs("fortune=-1").is_err());
        assert!(parse_action_costs("Fortune!=1").is_err());
    }

    #[tokio::test]
    async fn missing_values_disable_features() {
        let config = StaticConfig::default();
        assert_eq!(config.daily_free_limit().await, None);
        assert_eq!(config.action_cost(&ActionType::fortune()).await, None);
        assert_eq!(config.welcome_credits().await, DEFAULT_WELCOME_CREDITS);

        let schedule = config.reward_schedule().await;
        assert_eq!(schedule.rule(RewardKind::DailyLogin).unwrap().reward_amount, 20);
        assert_eq!(
            schedule.rule(RewardKind::AdWatch).unwrap().currency,
            Currency::Diamonds
        );
    }

    #[tokio::test]
    async fn builder_overrides() {
        let config = StaticConfig::new(
            EngineConfig::default()
                .with_cost(ActionType::fortune(), 50)
                .with_daily_free_limit(Some(2))
                .with_welcome_credits(0)
                .with_earning_rules(vec![EarningRule {
                    kind: RewardKind::DailyLogin,
                    reward_amount: 7,
                    currency: Currency::Credits,
                    active: false,
                }])
                .unwrap(),
        );
        assert_eq!(config.action_cost(&ActionType::fortune()).await, Some(50));
        assert_eq!(config.daily_free_limit().await, Some(2));
        assert_eq!(config.welcome_credits().await, 0);
        assert!(config.reward_schedule().await.rule(RewardKind::DailyLogin).is_none());
    }
}
