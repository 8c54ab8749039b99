//! Entitlement Resolver: the read-only funding decision.

use std::sync::Arc;

use augur_core::{entitlement, ActionType, Decision, Result, UsageDay, UserId};

use crate::config::ConfigSource;
use crate::ledger::LedgerStore;
use crate::quota::QuotaTracker;

/// Decides how a submission would be funded without consuming anything.
///
/// The decision is advisory. The orchestrator commits it with the atomic quota and ledger
/// primitives, which re-check the same conditions.
#[derive(Clone)]
pub struct EntitlementResolver {
    ledger: LedgerStore,
    quota: QuotaTracker,
    config: Arc<dyn ConfigSource>,
}

impl EntitlementResolver {
    /// Create a resolver over the ledger and quota tracker.
    #[must_use]
    pub fn new(ledger: LedgerStore, quota: QuotaTracker, config: Arc<dyn ConfigSource>) -> Self {
        Self {
            ledger,
            quota,
            config,
        }
    }

    /// Configured cost of `action_type`.
    pub async fn cost(&self, action_type: &ActionType) -> Option<i64> {
        self.config.action_cost(action_type).await
    }

    /// Free if a slot is left today, paid if the balance covers `cost`, denied otherwise.
    ///
    /// `cost` of `None` waives the charge without reading any state.
    pub async fn resolve(
        &self,
        user_id: &UserId,
        day: UsageDay,
        cost: Option<i64>,
    ) -> Result<Decision> {
        let Some(cost) = cost.filter(|c| *c > 0) else {
            return Ok(Decision::Waived);
        };
        let remaining = self.quota.remaining_free_uses(user_id, day).await?;
        let balance = self.ledger.get_balance(user_id).await?;
        let decision = entitlement::resolve(remaining, balance.credits, Some(cost));

        tracing::debug!(
            user_id = %user_id,
            remaining,
            cost,
            decision = ?decision,
            "Entitlement resolved"
        );
        Ok(decision)
    }
}
