//! Delivers `ActionCreated` events to the fulfillment worker.
//!
//! The engine publishes to an in-process channel; this task drains it and POSTs each event
//! to `FULFILLMENT_URL`. Delivery failures are logged and never retract the action: the
//! record stays `pending` and the worker recovers it from `GET /v1/actions?status=pending`.

use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use augur_core::ActionCreated;

/// Maximum delivery attempts per event.
const DELIVERY_MAX_RETRIES: u32 = 3;

/// Initial backoff duration for retries (doubles with each attempt).
const DELIVERY_INITIAL_BACKOFF_MS: u64 = 100;

/// Maximum backoff duration for retries.
const DELIVERY_MAX_BACKOFF_MS: u64 = 5000;

/// Timeout for a single delivery request.
const DELIVERY_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors delivering an event.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    /// Request could not be sent.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The worker answered with a non-success status.
    #[error("worker returned {0}")]
    Status(reqwest::StatusCode),
}

/// Posts events to the worker endpoint.
#[derive(Debug, Clone)]
pub struct Forwarder {
    client: reqwest::Client,
    url: String,
    service_api_key: Option<String>,
}

impl Forwarder {
    /// Create a forwarder for `url`.
    #[must_use]
    pub fn new(url: impl Into<String>, service_api_key: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(DELIVERY_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        Self {
            client,
            url: url.into(),
            service_api_key,
        }
    }

    /// Deliver one event.
    pub async fn deliver(&self, event: &ActionCreated) -> Result<(), DeliveryError> {
        let mut request = self.client.post(&self.url).json(event);
        if let Some(key) = &self.service_api_key {
            request = request.header("x-api-key", key);
        }
        let response = request.send().await?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(DeliveryError::Status(response.status()))
        }
    }

    /// Deliver one event, retrying with exponential backoff.
    pub async fn deliver_with_retry(&self, event: &ActionCreated) -> Result<(), DeliveryError> {
        let mut attempt = 0;
        let mut backoff_ms = DELIVERY_INITIAL_BACKOFF_MS;

        loop {
            match self.deliver(event).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    attempt += 1;

                    if attempt >= DELIVERY_MAX_RETRIES {
                        return Err(e);
                    }

                    tracing::debug!(
                        action_id = %event.action_id,
                        attempt = %attempt,
                        backoff_ms = %backoff_ms,
                        error = %e,
                        "Fulfillment delivery failed, retrying"
                    );

                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    backoff_ms = (backoff_ms * 2).min(DELIVERY_MAX_BACKOFF_MS);
                }
            }
        }
    }
}

/// Drain `events` until every sender is dropped.
///
/// Without a forwarder the events are only logged.
pub fn spawn(
    mut events: mpsc::Receiver<ActionCreated>,
    forwarder: Option<Forwarder>,
) -> JoinHandle<()> {
    if forwarder.is_none() {
        tracing::warn!("FULFILLMENT_URL not configured - action events will only be logged");
    }

    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let Some(forwarder) = &forwarder else {
                tracing::info!(
                    action_id = %event.action_id,
                    user_id = %event.user_id,
                    action_type = %event.action_type,
                    "Action created (no fulfillment endpoint)"
                );
                continue;
            };

            if let Err(e) = forwarder.deliver_with_retry(&event).await {
                tracing::error!(
                    action_id = %event.action_id,
                    user_id = %event.user_id,
                    error = %e,
                    "Fulfillment delivery failed after max retries, left pending"
                );
            }
        }
        tracing::debug!("Fulfillment channel closed");
    })
}
