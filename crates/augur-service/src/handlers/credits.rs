//! Operator credit grants.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use augur_core::{Balance, UserId};

use crate::auth::AdminAuth;
use crate::error::ApiError;
use crate::state::AppState;

/// Admin add credits request.
#[derive(Debug, Deserialize)]
pub struct AdminAddCreditsRequest {
    /// User to credit.
    pub user_id: UserId,
    /// Credits to add.
    pub amount: i64,
    /// Reason, recorded on the ledger entry.
    pub reason: String,
}

/// Admin add credits response.
#[derive(Debug, Serialize)]
pub struct AdminAddCreditsResponse {
    /// The credited user.
    pub user_id: UserId,
    /// Credits added.
    pub amount: i64,
    /// Balances after the grant.
    pub balance: Balance,
}

/// Grant bonus credits.
pub async fn admin_add_credits(
    State(state): State<Arc<AppState>>,
    admin: AdminAuth,
    Json(body): Json<AdminAddCreditsRequest>,
) -> Result<Json<AdminAddCreditsResponse>, ApiError> {
    if body.reason.trim().is_empty() {
        return Err(ApiError::BadRequest("reason is required".into()));
    }

    tracing::info!(
        admin_id = %admin.admin_id,
        user_id = %body.user_id,
        amount = body.amount,
        reason = %body.reason,
        "Admin adding credits"
    );

    let wallet = state
        .engine
        .ledger()
        .credit(&body.user_id, body.amount, body.reason)
        .await?;

    Ok(Json(AdminAddCreditsResponse {
        user_id: body.user_id,
        amount: body.amount,
        balance: wallet.balance(),
    }))
}
