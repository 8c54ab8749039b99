//! Entitlement decisions.
//!
//! [`resolve`] only inspects state. Consuming the quota slot or debiting the wallet is left
//! to the submission orchestrator, which re-checks atomically at commit time.

use serde::{Deserialize, Serialize};

use crate::BillingError;

/// Outcome of an entitlement check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "mode")]
pub enum Decision {
    /// A free slot is available today.
    Free,
    /// The balance covers the cost.
    Paid {
        /// Credits to debit.
        cost: i64,
    },
    /// No cost is configured for the action.
    Waived,
    /// The action may not proceed.
    Denied {
        /// Why it was denied.
        reason: DenialReason,
    },
}

/// Why an action was denied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum DenialReason {
    /// Neither a free slot nor enough credits.
    InsufficientCredits {
        /// Credit balance at decision time.
        balance: i64,
        /// Cost of the action.
        required: i64,
    },
}

impl From<DenialReason> for BillingError {
    fn from(reason: DenialReason) -> Self {
        match reason {
            DenialReason::InsufficientCredits { balance, required } => {
                Self::InsufficientCredits { balance, required }
            }
        }
    }
}

/// Decide how an action costing `cost` would be funded.
///
/// `cost` of `None` (or zero) means cost enforcement is off for the action type.
#[must_use]
pub fn resolve(remaining_free_uses: u32, credits: i64, cost: Option<i64>) -> Decision {
    match cost {
        Some(cost) if cost > 0 => {
            if remaining_free_uses > 0 {
                Decision::Free
            } else {
                resolve_paid(credits, cost)
            }
        }
        _ => Decision::Waived,
    }
}

fn resolve_paid(credits: i64, cost: i64) -> Decision {
    if credits >= cost {
        Decision::Paid { cost }
    } else {
        Decision::Denied {
            reason: DenialReason::InsufficientCredits {
                balance: credits,
                required: cost,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_slot_wins_over_balance() {
        assert_eq!(resolve(1, 1000, Some(50)), Decision::Free);
    }

    #[test]
    fn paid_when_no_free_slot_and_balance_covers() {
        assert_eq!(resolve(0, 100, Some(50)), Decision::Paid { cost: 50 });
        assert_eq!(resolve(0, 50, Some(50)), Decision::Paid { cost: 50 });
    }

    #[test]
    fn denied_when_neither() {
        assert_eq!(
            resolve(0, 10, Some(50)),
            Decision::Denied {
                reason: DenialReason::InsufficientCredits {
                    balance: 10,
                    required: 50
                }
            }
        );
    }

    #[test]
    fn missing_cost_waives_enforcement() {
        assert_eq!(resolve(0, 0, None), Decision::Waived);
        assert_eq!(resolve(3, 0, Some(0)), Decision::Waived);
    }
}
