//! Request and response types for the augur client.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use augur_core::{
    ActionId, ActionRecord, ActionStatus, Balance, Currency, EntryKind, FundingMode, UsageDay,
    UserId,
};

/// Result of submitting an action.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmissionResponse {
    /// The created action.
    pub action_id: ActionId,
    /// How it was paid for.
    pub funding_mode: FundingMode,
    /// Credits charged.
    pub cost: i64,
}

/// One ledger entry.
#[derive(Debug, Clone, Deserialize)]
pub struct Transaction {
    /// Entry ID.
    pub id: String,
    /// Signed amount.
    pub amount: i64,
    /// Currency of `amount`.
    pub currency: Currency,
    /// Why the balance changed.
    pub kind: EntryKind,
    /// Balance of `currency` after this entry.
    pub balance_after: i64,
    /// Related action.
    #[serde(default)]
    pub action_id: Option<String>,
    /// Description.
    pub description: String,
    /// Timestamp.
    pub created_at: DateTime<Utc>,
}

/// A page of ledger history.
#[derive(Debug, Clone, Deserialize)]
pub struct TransactionPage {
    /// Entries, newest first.
    pub transactions: Vec<Transaction>,
    /// Whether more entries follow.
    pub has_more: bool,
}

/// Diamond conversion result.
#[derive(Debug, Clone, Deserialize)]
pub struct ConversionResponse {
    /// Diamonds spent.
    pub diamonds: i64,
    /// Credits received.
    pub credits: i64,
    /// Balances afterwards.
    pub balance: Balance,
}

/// Free-tier quota for today.
#[derive(Debug, Clone, Deserialize)]
pub struct QuotaResponse {
    /// UTC day.
    pub day: UsageDay,
    /// Free uses per day.
    pub daily_limit: u32,
    /// Free uses left.
    pub remaining: u32,
}

/// Today's daily reward eligibility.
#[derive(Debug, Clone, Deserialize)]
pub struct DailyRewardStatus {
    /// UTC day.
    pub day: UsageDay,
    /// Whether a claim would grant.
    pub eligible: bool,
    /// Amount a claim grants.
    pub amount: i64,
    /// Currency of the reward.
    pub currency: Currency,
}

/// Outcome of a daily claim.
#[derive(Debug, Clone, Deserialize)]
pub struct DailyClaim {
    /// False if already claimed today.
    pub granted: bool,
    /// Amount granted.
    pub amount: i64,
    /// Currency granted.
    pub currency: Currency,
    /// Balances afterwards.
    pub balance: Balance,
}

/// Status report from the fulfillment worker.
#[derive(Debug, Clone, Serialize)]
pub struct StatusUpdateRequest {
    /// `Completed` or `Failed`.
    pub status: ActionStatus,
    /// Failure reason.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Actions awaiting an outcome, oldest first.
#[derive(Debug, Clone, Deserialize)]
pub struct PendingActions {
    /// The actions.
    pub actions: Vec<ActionRecord>,
}

/// Acknowledged status update.
#[derive(Debug, Clone, Deserialize)]
pub struct StatusUpdateResponse {
    /// The action.
    pub action_id: ActionId,
    /// Its new status.
    pub status: ActionStatus,
}

/// Health check response.
#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    /// Service status.
    pub status: String,
    /// Service name.
    pub service: String,
    /// Service version.
    pub version: String,
}

/// API error response.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorResponse {
    /// Error details.
    pub error: ApiErrorBody,
}

/// API error body.
#[derive(Debug, Clone, Deserialize)]
pub struct ApiErrorBody {
    /// Error code.
    pub code: String,
    /// Error message.
    pub message: String,
    /// Additional details.
    pub details: Option<serde_json::Value>,
}

impl ApiErrorBody {
    /// Integer field of `details`, or 0.
    #[must_use]
    pub fn detail_i64(&self, field: &str) -> i64 {
        self.details
            .as_ref()
            .and_then(|d| d.get(field))
            .and_then(serde_json::Value::as_i64)
            .unwrap_or(0)
    }
}
