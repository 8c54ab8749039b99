//! Action submission and status handlers.

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use augur_core::{ActionId, ActionRecord, ActionStatus, ActionType};
use augur_engine::Submission;

use crate::auth::{AuthUser, ServiceAuth};
use crate::error::ApiError;
use crate::state::AppState;

/// Submit action request.
#[derive(Debug, Deserialize)]
pub struct SubmitActionRequest {
    /// Kind of action (default: "fortune").
    #[serde(default = "ActionType::fortune")]
    pub action_type: ActionType,
}

/// Submit a billable action for the caller.
pub async fn submit_action(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Json(body): Json<SubmitActionRequest>,
) -> Result<Json<Submission>, ApiError> {
    let submission = state
        .engine
        .submit_action(&auth.user_id, body.action_type)
        .await?;
    Ok(Json(submission))
}

fn parse_action_id(raw: &str) -> Result<ActionId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid action id: {raw}")))
}

/// Read one of the caller's actions.
///
/// Another user's action is reported as not found.
pub async fn get_action(
    State(state): State<Arc<AppState>>,
    auth: AuthUser,
    Path(id): Path<String>,
) -> Result<Json<ActionRecord>, ApiError> {
    let action_id = parse_action_id(&id)?;
    let action = state.engine.orchestrator().action(&action_id)?;
    if action.user_id != auth.user_id {
        return Err(ApiError::NotFound(format!("action not found: {action_id}")));
    }
    Ok(Json(action))
}

/// Pending action list query parameters.
#[derive(Debug, Deserialize)]
pub struct ListActionsQuery {
    /// Only `pending` is listable.
    #[serde(default = "default_status")]
    pub status: ActionStatus,
    /// Maximum number of actions to return (default: 50, max: 100).
    #[serde(default = "default_limit")]
    pub limit: usize,
}

const fn default_status() -> ActionStatus {
    ActionStatus::Pending
}

const fn default_limit() -> usize {
    50
}

/// Pending action list response.
#[derive(Debug, Serialize)]
pub struct ListActionsResponse {
    /// Actions awaiting an outcome, oldest first.
    pub actions: Vec<ActionRecord>,
}

/// List actions the worker has not reported on yet.
///
/// Lets the worker recover events it never received.
pub async fn list_pending(
    State(state): State<Arc<AppState>>,
    service: ServiceAuth,
    Query(query): Query<ListActionsQuery>,
) -> Result<Json<ListActionsResponse>, ApiError> {
    if query.status != ActionStatus::Pending {
        return Err(ApiError::BadRequest(
            "only pending actions can be listed".into(),
        ));
    }
    let limit = query.limit.min(100);
    let actions = state.engine.orchestrator().pending_actions(limit)?;

    tracing::debug!(
        service = %service.service_name,
        count = actions.len(),
        "Pending actions listed"
    );
    Ok(Json(ListActionsResponse { actions }))
}

/// Status report from the fulfillment worker.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    /// `completed` or `failed`.
    pub status: ActionStatus,
    /// Why fulfillment failed.
    #[serde(default)]
    pub reason: Option<String>,
}

/// Status update response.
#[derive(Debug, Serialize)]
pub struct UpdateStatusResponse {
    /// The action.
    pub action_id: ActionId,
    /// Its new status.
    pub status: ActionStatus,
}

/// Record the fulfillment outcome of an action.
pub async fn update_status(
    State(state): State<Arc<AppState>>,
    service: ServiceAuth,
    Path(id): Path<String>,
    Json(body): Json<UpdateStatusRequest>,
) -> Result<Json<UpdateStatusResponse>, ApiError> {
    let action_id = parse_action_id(&id)?;
    if !body.status.is_terminal() {
        return Err(ApiError::BadRequest(
            "status must be completed or failed".into(),
        ));
    }

    tracing::debug!(
        action_id = %action_id,
        service = %service.service_name,
        status = ?body.status,
        "Fulfillment status reported"
    );

    let action = state
        .engine
        .orchestrator()
        .record_outcome(&action_id, body.status, body.reason)?;

    Ok(Json(UpdateStatusResponse {
        action_id: action.id,
        status: action.status,
    }))
}
