//! Daily reward handlers.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;

use augur_engine::{DailyClaim, DailyRewardStatus};

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Today's daily reward eligibility.
pub async fn daily_status(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<DailyRewardStatus>, ApiError> {
    let status = state.engine.rewards().daily_reward_status(&auth.user_id).await?;
    Ok(Json(status))
}

/// Claim today's login reward.
///
/// A repeat claim on the same day returns `granted: false` with the current balance.
pub async fn claim_daily(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<DailyClaim>, ApiError> {
    let claim = state.engine.claim_daily_reward(&auth.user_id).await?;
    Ok(Json(claim))
}
