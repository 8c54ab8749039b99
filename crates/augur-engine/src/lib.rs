//! Credit entitlement and metering engine for augur.
//!
//! The engine decides whether a billable action is free, paid or denied, and commits that
//! decision against durable storage without ever reading a balance and writing it back.
//!
//! - [`LedgerStore`]: conditional debits, credits and reversals.
//! - [`QuotaTracker`]: per-user, per-UTC-day free-tier slots.
//! - [`RewardIssuer`]: idempotent rewards for logins, ads, purchases and subscriptions.
//! - [`EntitlementResolver`]: the read-only funding decision.
//! - [`SubmissionOrchestrator`]: resolve, commit, create the action, compensate on failure.
//!
//! [`Engine`] wires them together over one [`Store`] and one [`ConfigSource`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use augur_core::{ActionType, UserId};
//! use augur_engine::{ChannelQueue, Engine, EngineConfig, StaticConfig};
//! use augur_store::MemoryStore;
//!
//! # async fn run() -> augur_core::Result<()> {
//! let config = EngineConfig::default().with_cost(ActionType::fortune(), 50);
//! let (queue, _events) = ChannelQueue::bounded(64);
//! let engine = Engine::new(
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(StaticConfig::new(config)),
//!     Arc::new(queue),
//! );
//!
//! let user = UserId::generate();
//! let submission = engine.submit_action(&user, ActionType::fortune()).await?;
//! println!("{:?} for {} credits", submission.funding_mode, submission.cost);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::missing_errors_doc)]

pub mod clock;
pub mod config;
pub mod fulfillment;
pub mod ledger;
pub mod orchestrator;
pub mod quota;
pub mod resolver;
pub mod rewards;

use std::sync::Arc;

pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{
    default_earning_rules, parse_action_costs, ConfigSource, EngineConfig, StaticConfig,
};
pub use fulfillment::{ChannelQueue, FulfillmentQueue, PublishError};
pub use ledger::LedgerStore;
pub use orchestrator::{Submission, SubmissionOrchestrator};
pub use quota::QuotaTracker;
pub use resolver::EntitlementResolver;
pub use rewards::{DailyClaim, DailyRewardStatus, RewardIssuer};

use augur_core::{ActionType, Balance, Result, UserId};
use augur_store::Store;

/// The engine's components over shared storage and configuration.
#[derive(Clone)]
pub struct Engine {
    ledger: LedgerStore,
    quota: QuotaTracker,
    rewards: RewardIssuer,
    resolver: EntitlementResolver,
    orchestrator: SubmissionOrchestrator,
    clock: Arc<dyn Clock>,
}

impl Engine {
    /// Build an engine on the system clock.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        config: Arc<dyn ConfigSource>,
        queue: Arc<dyn FulfillmentQueue>,
    ) -> Self {
        Self::with_clock(store, config, queue, Arc::new(SystemClock))
    }

    /// Build an engine on a custom clock.
    #[must_use]
    pub fn with_clock(
        store: Arc<dyn Store>,
        config: Arc<dyn ConfigSource>,
        queue: Arc<dyn FulfillmentQueue>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let ledger = LedgerStore::new(Arc::clone(&store), Arc::clone(&config));
        let quota = QuotaTracker::new(Arc::clone(&store), Arc::clone(&config));
        let rewards =
            RewardIssuer::new(Arc::clone(&store), Arc::clone(&config), Arc::clone(&clock));
        let resolver = EntitlementResolver::new(ledger.clone(), quota.clone(), config);
        let orchestrator = SubmissionOrchestrator::new(
            resolver.clone(),
            ledger.clone(),
            quota.clone(),
            store,
            queue,
            Arc::clone(&clock),
        );
        Self {
            ledger,
            quota,
            rewards,
            resolver,
            orchestrator,
            clock,
        }
    }

    /// Submit a billable action.
    pub async fn submit_action(
        &self,
        user_id: &UserId,
        action_type: ActionType,
    ) -> Result<Submission> {
        self.orchestrator.submit(user_id, action_type).await
    }

    /// Current balances, creating the wallet if absent.
    pub async fn get_balance(&self, user_id: &UserId) -> Result<Balance> {
        self.ledger.get_balance(user_id).await
    }

    /// Claim today's login reward.
    pub async fn claim_daily_reward(&self, user_id: &UserId) -> Result<DailyClaim> {
        self.rewards.claim_daily(user_id).await
    }

    /// Free uses left today.
    pub async fn remaining_free_uses_today(&self, user_id: &UserId) -> Result<u32> {
        self.quota.remaining_free_uses(user_id, self.clock.today()).await
    }

    /// The ledger store.
    #[must_use]
    pub const fn ledger(&self) -> &LedgerStore {
        &self.ledger
    }

    /// The quota tracker.
    #[must_use]
    pub const fn quota(&self) -> &QuotaTracker {
        &self.quota
    }

    /// The reward issuer.
    #[must_use]
    pub const fn rewards(&self) -> &RewardIssuer {
        &self.rewards
    }

    /// The entitlement resolver.
    #[must_use]
    pub const fn resolver(&self) -> &EntitlementResolver {
        &self.resolver
    }

    /// The submission orchestrator.
    #[must_use]
    pub const fn orchestrator(&self) -> &SubmissionOrchestrator {
        &self.orchestrator
    }

    /// The engine's clock.
    #[must_use]
    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }
}
