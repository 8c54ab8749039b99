//! Payment and ad-network webhooks.
//!
//! Both callbacks are signed: `x-signature` carries the hex HMAC-SHA256 of the raw body
//! under the provider's shared secret. A redelivered event answers 200 with
//! `duplicate: true` so the provider stops retrying.

use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use augur_core::{Balance, BillingError, Currency, RewardGrant, UserId};

use crate::crypto::verify_signature;
use crate::error::ApiError;
use crate::state::AppState;

/// Header carrying the body signature.
pub const SIGNATURE_HEADER: &str = "x-signature";

/// What the payment provider is reporting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentEventType {
    /// One-time credit purchase.
    #[default]
    #[serde(alias = "purchase.completed")]
    Purchase,
    /// Subscription renewal.
    #[serde(alias = "subscription.renewed")]
    Subscription,
}

/// Payment provider callback.
#[derive(Debug, Deserialize)]
pub struct PaymentEvent {
    /// Purchase or renewal.
    #[serde(default, alias = "eventType")]
    pub event_type: PaymentEventType,
    /// Paying user.
    #[serde(alias = "userId")]
    pub user_id: UserId,
    /// Provider transaction id; grants are idempotent on it.
    #[serde(alias = "transactionId")]
    pub transaction_id: String,
    /// Credits bought.
    #[serde(alias = "creditAmount")]
    pub credit_amount: i64,
}

/// Ad network reward callback.
#[derive(Debug, Deserialize)]
pub struct AdEvent {
    /// Viewer.
    #[serde(alias = "userId")]
    pub user_id: UserId,
    /// Completed impression; grants are idempotent on it.
    #[serde(alias = "impressionId")]
    pub impression_id: String,
}

/// Webhook response.
#[derive(Debug, Serialize)]
pub struct WebhookResponse {
    /// Whether this delivery granted anything.
    pub granted: bool,
    /// Whether the event had already been granted.
    pub duplicate: bool,
    /// Amount granted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<i64>,
    /// Currency granted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub currency: Option<Currency>,
    /// Balances after the grant.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance: Option<Balance>,
}

impl WebhookResponse {
    fn granted((grant, balance): (RewardGrant, Balance)) -> Self {
        Self {
            granted: true,
            duplicate: false,
            amount: Some(grant.amount),
            currency: Some(grant.currency),
            balance: Some(balance),
        }
    }

    const fn duplicate() -> Self {
        Self {
            granted: false,
            duplicate: true,
            amount: None,
            currency: None,
            balance: None,
        }
    }
}

fn settle(
    result: Result<(RewardGrant, Balance), BillingError>,
    event: &str,
) -> Result<Json<WebhookResponse>, ApiError> {
    match result {
        Ok(granted) => Ok(Json(WebhookResponse::granted(granted))),
        Err(BillingError::AlreadyClaimed { key }) => {
            tracing::info!(key = %key, event, "Duplicate webhook delivery ignored");
            Ok(Json(WebhookResponse::duplicate()))
        }
        Err(e) => Err(e.into()),
    }
}

/// Check the signature, then parse the body.
fn authenticate<T: serde::de::DeserializeOwned>(
    secret: Option<&String>,
    headers: &HeaderMap,
    body: &str,
    source: &str,
) -> Result<T, ApiError> {
    let Some(secret) = secret else {
        tracing::warn!(source, "Webhook received but no secret is configured");
        return Err(ApiError::Unauthorized);
    };

    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            tracing::warn!(source, "Webhook missing signature");
            ApiError::Unauthorized
        })?;

    if !verify_signature(secret, body.as_bytes(), signature) {
        tracing::warn!(source, "Webhook signature mismatch");
        return Err(ApiError::Unauthorized);
    }

    serde_json::from_str(body).map_err(|e| ApiError::BadRequest(format!("invalid payload: {e}")))
}

/// Handle a payment provider callback.
pub async fn payment_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WebhookResponse>, ApiError> {
    let event: PaymentEvent = authenticate(
        state.config.payment_webhook_secret.as_ref(),
        &headers,
        &body,
        "payments",
    )?;

    tracing::info!(
        user_id = %event.user_id,
        transaction_id = %event.transaction_id,
        event_type = ?event.event_type,
        credit_amount = event.credit_amount,
        "Payment webhook received"
    );

    let rewards = state.engine.rewards();
    let result = match event.event_type {
        PaymentEventType::Purchase => {
            rewards
                .claim_purchase(&event.user_id, &event.transaction_id, event.credit_amount)
                .await
        }
        PaymentEventType::Subscription => {
            rewards
                .claim_subscription(&event.user_id, &event.transaction_id, event.credit_amount)
                .await
        }
    };
    settle(result, "payments")
}

/// Handle an ad network reward callback.
pub async fn ad_webhook(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    body: String,
) -> Result<Json<WebhookResponse>, ApiError> {
    let event: AdEvent = authenticate(
        state.config.ad_webhook_secret.as_ref(),
        &headers,
        &body,
        "ads",
    )?;

    if event.impression_id.trim().is_empty() {
        return Err(ApiError::BadRequest("impression_id is required".into()));
    }

    tracing::debug!(
        user_id = %event.user_id,
        impression_id = %event.impression_id,
        "Ad reward callback received"
    );

    let result = state
        .engine
        .rewards()
        .claim_ad(&event.user_id, &event.impression_id)
        .await;
    settle(result, "ads")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payment_event_accepts_both_casings() {
        let user = UserId::generate();
        let snake: PaymentEvent = serde_json::from_str(&format!(
            r#"{{"user_id":"{user}","transaction_id":"t1","credit_amount":500}}"#
        ))
        .unwrap();
        assert_eq!(snake.event_type, PaymentEventType::Purchase);
        assert_eq!(snake.credit_amount, 500);

        let camel: PaymentEvent = serde_json::from_value(serde_json::json!({
            "eventType": "subscription.renewed",
            "userId": user.to_string(),
            "transactionId": "t2",
            "creditAmount": 900
        }))
        .unwrap();
        assert_eq!(camel.event_type, PaymentEventType::Subscription);
        assert_eq!(camel.user_id, user);
    }
}
