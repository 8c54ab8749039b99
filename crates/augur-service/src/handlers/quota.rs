//! Free-tier quota handler.

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use augur_core::UsageDay;

use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::state::AppState;

/// Quota response.
#[derive(Debug, Serialize)]
pub struct QuotaResponse {
    /// The UTC day the numbers apply to.
    pub day: UsageDay,
    /// Configured free uses per day (0 when there is no free tier).
    pub daily_limit: u32,
    /// Free uses left today.
    pub remaining: u32,
}

/// Free uses left today.
pub async fn get_quota(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
) -> Result<Json<QuotaResponse>, ApiError> {
    let quota = state.engine.quota();
    let day = state.engine.clock().today();
    let remaining = quota.remaining_free_uses(&auth.user_id, day).await?;

    Ok(Json(QuotaResponse {
        day,
        daily_limit: quota.daily_limit().await,
        remaining,
    }))
}
