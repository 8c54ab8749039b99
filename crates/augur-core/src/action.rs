//! Billable action records ("fortune requests").

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{ActionId, UserId};

/// Maximum length of an action type name.
const MAX_ACTION_TYPE_LEN: usize = 64;

/// Kind of billable action, e.g. `fortune` or `tarot`.
///
/// Names are lowercase ASCII letters, digits and underscores; costs are configured per name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ActionType(String);

impl ActionType {
    /// The default billable action: requesting a fortune.
    pub const FORTUNE: &'static str = "fortune";

    /// The default fortune request type.
    #[must_use]
    pub fn fortune() -> Self {
        Self(Self::FORTUNE.to_string())
    }

    /// The type name.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for ActionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let valid = !s.is_empty()
            && s.len() <= MAX_ACTION_TYPE_LEN
            && s
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_');
        if valid {
            Ok(Self(s.to_string()))
        } else {
            Err(format!("invalid action type: {s:?}"))
        }
    }
}

impl TryFrom<String> for ActionType {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ActionType> for String {
    fn from(action_type: ActionType) -> Self {
        action_type.0
    }
}

impl fmt::Display for ActionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How an action was paid for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FundingMode {
    /// Consumed a daily free slot.
    Free,
    /// Debited from the credit balance.
    Paid,
    /// No cost is configured for the action type; nothing was consumed.
    Waived,
}

/// Lifecycle of an action record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    /// Created, waiting for the fulfillment worker.
    Pending,
    /// Fulfilled by the worker.
    Completed,
    /// Failed during fulfillment or rolled back.
    Failed,
}

impl ActionStatus {
    /// Terminal states cannot change again.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

/// The billable unit of work.
///
/// The engine owns the funding fields; the fulfillment worker owns the result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionRecord {
    /// Action id.
    pub id: ActionId,

    /// Requesting user.
    pub user_id: UserId,

    /// Kind of action.
    pub action_type: ActionType,

    /// Credits charged (0 unless paid).
    pub cost: i64,

    /// How the action was funded.
    pub funding_mode: FundingMode,

    /// Current status.
    pub status: ActionStatus,

    /// Why the action failed, if it did.
    pub failure_reason: Option<String>,

    /// When the record was created.
    pub created_at: DateTime<Utc>,

    /// When the status last changed.
    pub updated_at: DateTime<Utc>,
}

impl ActionRecord {
    /// A pending action funded as described.
    #[must_use]
    pub fn pending(
        id: ActionId,
        user_id: UserId,
        action_type: ActionType,
        funding_mode: FundingMode,
        cost: i64,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            user_id,
            action_type,
            cost,
            funding_mode,
            status: ActionStatus::Pending,
            failure_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Move to `status`. Only `Pending` may transition, and only to a terminal state.
    ///
    /// Returns `false` if the transition is not allowed.
    #[must_use]
    pub fn transition(&mut self, status: ActionStatus, reason: Option<String>) -> bool {
        if self.status != ActionStatus::Pending || !status.is_terminal() {
            return false;
        }
        self.status = status;
        self.failure_reason = reason;
        self.updated_at = Utc::now();
        true
    }

    /// Event announcing this action to the fulfillment worker.
    #[must_use]
    pub fn created_event(&self) -> ActionCreated {
        ActionCreated {
            action_id: self.id,
            user_id: self.user_id,
            action_type: self.action_type.clone(),
        }
    }
}

/// Emitted once an action record is durable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionCreated {
    /// The new action.
    pub action_id: ActionId,
    /// Requesting user.
    pub user_id: UserId,
    /// Kind of action.
    pub action_type: ActionType,
}
