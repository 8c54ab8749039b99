//! Action Submission Orchestrator.
//!
//! A submission moves through `Resolving -> Committing -> (ActionCreated | RolledBack)`:
//!
//! 1. Resolve a non-binding funding decision.
//! 2. Commit it with the atomic primitives: take a free slot, or debit the wallet. A lost
//!    race for the last free slot falls back once to a balance debit.
//! 3. Create the action record. If that fails after a debit, the debit is reversed before
//!    the error is returned. A consumed free slot is not given back.
//! 4. Announce the action to the fulfillment queue. An action that could not be announced
//!    stays `pending` and is listed by [`SubmissionOrchestrator::pending_actions`].
//!
//! An action record therefore exists only if the user was charged (or used a free slot)
//! exactly once, and a failed submission leaves the balance where it was.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use augur_core::{
    ActionId, ActionRecord, ActionStatus, ActionType, BillingError, Decision, FundingMode,
    Result, UsageDay, UserId,
};
use augur_store::{Store, StoreError};

use crate::clock::Clock;
use crate::fulfillment::FulfillmentQueue;
use crate::ledger::LedgerStore;
use crate::quota::QuotaTracker;
use crate::resolver::EntitlementResolver;

/// Result of a successful submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    /// The created action.
    pub action_id: ActionId,
    /// How it was paid for.
    pub funding_mode: FundingMode,
    /// Credits charged; zero unless paid.
    pub cost: i64,
}

/// Coordinates entitlement, charging and action creation.
#[derive(Clone)]
pub struct SubmissionOrchestrator {
    resolver: EntitlementResolver,
    ledger: LedgerStore,
    quota: QuotaTracker,
    store: Arc<dyn Store>,
    queue: Arc<dyn FulfillmentQueue>,
    clock: Arc<dyn Clock>,
}

/// How a submission was funded once committed.
struct Funding {
    mode: FundingMode,
    cost: i64,
    charge: Option<PendingCharge>,
}

impl Funding {
    const fn unpaid(mode: FundingMode) -> Self {
        Self {
            mode,
            cost: 0,
            charge: None,
        }
    }
}

impl SubmissionOrchestrator {
    /// Create an orchestrator.
    #[must_use]
    pub fn new(
        resolver: EntitlementResolver,
        ledger: LedgerStore,
        quota: QuotaTracker,
        store: Arc<dyn Store>,
        queue: Arc<dyn FulfillmentQueue>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            resolver,
            ledger,
            quota,
            store,
            queue,
            clock,
        }
    }

    /// Submit a billable action for `user_id`.
    ///
    /// # Errors
    ///
    /// - [`BillingError::InsufficientCredits`] if neither a free slot nor the balance covers
    ///   the action. Nothing was charged.
    /// - [`BillingError::ActionCreationFailed`] if the record could not be written. Any
    ///   debit was reversed.
    /// - [`BillingError::RollbackFailed`] if that reversal failed too.
    /// - [`BillingError::LedgerUnavailable`] / [`BillingError::StorageTimeout`] on
    ///   infrastructure faults.
    pub async fn submit(&self, user_id: &UserId, action_type: ActionType) -> Result<Submission> {
        let action_id = ActionId::generate();
        let day = self.clock.today();
        let cost = self.resolver.cost(&action_type).await;

        let funding = self
            .commit_entitlement(user_id, day, &action_type, action_id, cost)
            .await?;

        let record =
            ActionRecord::pending(action_id, *user_id, action_type, funding.mode, funding.cost);
        if let Err(e) = self.store.create_action(&record) {
            return Err(self.roll_back(&record, funding.charge, &e));
        }
        if let Some(charge) = funding.charge {
            charge.settle();
        }

        tracing::info!(
            user_id = %user_id,
            action_id = %action_id,
            action_type = %record.action_type,
            funding_mode = ?funding.mode,
            cost = funding.cost,
            "Action submitted"
        );

        if let Err(e) = self.queue.publish(record.created_event()).await {
            tracing::error!(
                user_id = %user_id,
                action_id = %action_id,
                cost = funding.cost,
                error = %e,
                "Failed to publish action, left pending for the worker to poll"
            );
        }

        Ok(Submission {
            action_id,
            funding_mode: funding.mode,
            cost: funding.cost,
        })
    }

    /// Read an action record.
    pub fn action(&self, action_id: &ActionId) -> Result<ActionRecord> {
        self.store
            .get_action(action_id)?
            .ok_or(BillingError::ActionNotFound(*action_id))
    }

    /// Up to `limit` actions awaiting an outcome, oldest first.
    pub fn pending_actions(&self, limit: usize) -> Result<Vec<ActionRecord>> {
        Ok(self.store.list_pending_actions(limit)?)
    }

    /// Record the fulfillment outcome of a pending action.
    ///
    /// # Errors
    ///
    /// [`BillingError::InvalidTransition`] if the action is already terminal or `status` is
    /// not terminal.
    pub fn record_outcome(
        &self,
        action_id: &ActionId,
        status: ActionStatus,
        reason: Option<String>,
    ) -> Result<ActionRecord> {
        let action = self
            .store
            .update_action_status(action_id, status, reason)
            .map_err(|e| match e {
                StoreError::NotFound { .. } => BillingError::ActionNotFound(*action_id),
                StoreError::Conflict(msg) => BillingError::InvalidTransition(msg),
                other => other.into(),
            })?;

        tracing::info!(
            action_id = %action_id,
            status = ?action.status,
            "Action outcome recorded"
        );
        Ok(action)
    }

    async fn commit_entitlement(
        &self,
        user_id: &UserId,
        day: UsageDay,
        action_type: &ActionType,
        action_id: ActionId,
        cost: Option<i64>,
    ) -> Result<Funding> {
        match self.resolver.resolve(user_id, day, cost).await? {
            Decision::Waived => Ok(Funding::unpaid(FundingMode::Waived)),
            Decision::Free => {
                if self
                    .quota
                    .try_consume_free_use(user_id, day, action_type, action_id)
                    .await?
                    .is_some()
                {
                    return Ok(Funding::unpaid(FundingMode::Free));
                }
                // The debit is itself the balance check, so this is the one fallback.
                tracing::debug!(
                    user_id = %user_id,
                    action_id = %action_id,
                    "{}, falling back to balance",
                    BillingError::QuotaRaceLost
                );
                self.charge(user_id, action_id, cost.unwrap_or_default()).await
            }
            Decision::Paid { cost } => self.charge(user_id, action_id, cost).await,
            Decision::Denied { reason } => {
                tracing::debug!(user_id = %user_id, reason = ?reason, "Submission denied");
                Err(reason.into())
            }
        }
    }

    async fn charge(&self, user_id: &UserId, action_id: ActionId, cost: i64) -> Result<Funding> {
        self.ledger.debit(user_id, cost, action_id).await?;
        Ok(Funding {
            mode: FundingMode::Paid,
            cost,
            charge: Some(PendingCharge {
                ledger: self.ledger.clone(),
                user_id: *user_id,
                action_id,
                amount: cost,
                armed: true,
            }),
        })
    }

    fn roll_back(
        &self,
        record: &ActionRecord,
        charge: Option<PendingCharge>,
        cause: &StoreError,
    ) -> BillingError {
        tracing::warn!(
            user_id = %record.user_id,
            action_id = %record.id,
            error = %cause,
            "Action creation failed, rolling back"
        );

        // A timed-out write may have landed anyway; it must not stay pending.
        if let Ok(Some(_)) = self.store.get_action(&record.id) {
            if let Err(e) = self.store.update_action_status(
                &record.id,
                ActionStatus::Failed,
                Some("charge reversed".into()),
            ) {
                tracing::error!(
                    user_id = %record.user_id,
                    action_id = %record.id,
                    amount = record.cost,
                    error = %e,
                    "Failed to mark action failed, manual reconciliation required"
                );
            }
        }

        if let Some(charge) = charge {
            if let Err(e) = charge.compensate() {
                return e;
            }
        } else if record.funding_mode == FundingMode::Free {
            tracing::debug!(user_id = %record.user_id, "Free slot not returned");
        }
        BillingError::ActionCreationFailed(cause.to_string())
    }
}

/// A debit not yet matched by an action record.
///
/// Dropped without [`settle`](Self::settle) (the submission future was cancelled, or
/// unwound), it reverses the debit.
struct PendingCharge {
    ledger: LedgerStore,
    user_id: UserId,
    action_id: ActionId,
    amount: i64,
    armed: bool,
}

impl PendingCharge {
    /// The action record exists; keep the charge.
    fn settle(mut self) {
        self.armed = false;
    }

    /// Reverse the charge now.
    fn compensate(mut self) -> Result<()> {
        self.armed = false;
        self.reverse()
    }

    fn reverse(&self) -> Result<()> {
        match self.ledger.reverse(&self.user_id, self.amount, self.action_id) {
            Ok(_) => Ok(()),
            Err(e) => {
                tracing::error!(
                    user_id = %self.user_id,
                    action_id = %self.action_id,
                    amount = self.amount,
                    error = %e,
                    "Rollback failed, manual reconciliation required"
                );
                Err(BillingError::RollbackFailed {
                    user_id: self.user_id,
                    action_id: self.action_id,
                    amount: self.amount,
                    message: e.to_string(),
                })
            }
        }
    }
}

impl Drop for PendingCharge {
    fn drop(&mut self) {
        if self.armed {
            tracing::warn!(
                user_id = %self.user_id,
                action_id = %self.action_id,
                "Submission abandoned after debit, reversing charge"
            );
            // Failure is already logged for reconciliation.
            let _ = self.reverse();
        }
    }
}
