//! Wallet balance, history, conversion and deletion handlers.

use std::sync::Arc;

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use augur_core::{Balance, Currency, EntryKind, LedgerEntry, DIAMOND_TO_CREDIT_RATE};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Get current balances, creating the wallet on first access.
pub async fn get_balance(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<Balance>, ApiError> {
    let balance = state.engine.get_balance(&auth.user_id).await?;
    Ok(Json(balance))
}

/// Transaction list query parameters.
#[derive(Debug, Deserialize)]
pub struct ListTransactionsQuery {
    /// Maximum number of entries to return (default: 50, max: 100).
    #[serde(default = "default_limit")]
    pub limit: usize,
    /// Offset for pagination (default: 0).
    #[serde(default)]
    pub offset: usize,
}

const fn default_limit() -> usize {
    50
}

/// One ledger entry.
#[derive(Debug, Serialize)]
pub struct TransactionResponse {
    /// Entry ID.
    pub id: String,
    /// Signed amount.
    pub amount: i64,
    /// Currency the amount is in.
    pub currency: Currency,
    /// Why the balance changed.
    pub kind: EntryKind,
    /// Balance of `currency` after this entry.
    pub balance_after: i64,
    /// Related action, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_id: Option<String>,
    /// Description.
    pub description: String,
    /// Timestamp.
    pub created_at: String,
}

impl From<&LedgerEntry> for TransactionResponse {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            id: entry.id.to_string(),
            amount: entry.amount,
            currency: entry.currency,
            kind: entry.kind,
            balance_after: entry.balance_after,
            action_id: entry.action_id.map(|id| id.to_string()),
            description: entry.description.clone(),
            created_at: entry.created_at.to_rfc3339(),
        }
    }
}

/// List transactions response.
#[derive(Debug, Serialize)]
pub struct ListTransactionsResponse {
    /// Entries, newest first.
    pub transactions: Vec<TransactionResponse>,
    /// Whether there are more entries.
    pub has_more: bool,
}

/// List ledger history.
pub async fn list_transactions(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Query(query): Query<ListTransactionsQuery>,
) -> Result<Json<ListTransactionsResponse>, ApiError> {
    // Fetch one more than requested to determine has_more
    let limit = query.limit.min(100);
    let entries = state
        .engine
        .ledger()
        .history(&auth.user_id, limit + 1, query.offset)?;

    let has_more = entries.len() > limit;
    let transactions = entries
        .iter()
        .take(limit)
        .map(TransactionResponse::from)
        .collect();

    Ok(Json(ListTransactionsResponse {
        transactions,
        has_more,
    }))
}

/// Convert diamonds request.
#[derive(Debug, Deserialize)]
pub struct ConvertRequest {
    /// Diamonds to convert.
    pub diamonds: i64,
}

/// Convert diamonds response.
#[derive(Debug, Serialize)]
pub struct ConvertResponse {
    /// Diamonds spent.
    pub diamonds: i64,
    /// Credits received.
    pub credits: i64,
    /// Balances after the conversion.
    pub balance: Balance,
}

/// Convert diamonds into credits.
pub async fn convert_diamonds(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<ConvertRequest>,
) -> Result<Json<ConvertResponse>, ApiError> {
    let wallet = state
        .engine
        .ledger()
        .convert_diamonds(&auth.user_id, body.diamonds)
        .await?;

    Ok(Json(ConvertResponse {
        diamonds: body.diamonds,
        credits: body.diamonds.saturating_mul(DIAMOND_TO_CREDIT_RATE),
        balance: wallet.balance(),
    }))
}

/// Zero the caller's wallet on account deletion.
pub async fn reset_wallet(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<Balance>, ApiError> {
    tracing::info!(user_id = %auth.user_id, "Account deletion requested");
    let wallet = state.engine.ledger().reset(&auth.user_id).await?;
    Ok(Json(wallet.balance()))
}
