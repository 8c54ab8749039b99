//! Hand-off of created actions to the fulfillment worker.
//!
//! The engine publishes [`ActionCreated`] once an action record is durable. Publishing waits
//! for queue capacity but never for the worker itself. An event that still cannot be handed
//! off leaves the action `pending`, where [`Store::list_pending_actions`] finds it.
//!
//! [`Store::list_pending_actions`]: augur_store::Store::list_pending_actions

use async_trait::async_trait;
use tokio::sync::mpsc;

use augur_core::ActionCreated;

/// Why an event could not be handed off.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    /// The consumer has gone away.
    #[error("fulfillment queue closed")]
    Closed,
}

/// Destination for [`ActionCreated`] events.
#[async_trait]
pub trait FulfillmentQueue: Send + Sync {
    /// Hand off an event, waiting for room but not for it to be processed.
    async fn publish(&self, event: ActionCreated) -> Result<(), PublishError>;
}

/// In-process queue backed by a bounded tokio channel.
#[derive(Debug, Clone)]
pub struct ChannelQueue {
    tx: mpsc::Sender<ActionCreated>,
}

impl ChannelQueue {
    /// Create a queue holding at most `capacity` undelivered events. Publishers wait while
    /// it is full.
    #[must_use]
    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<ActionCreated>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl FulfillmentQueue for ChannelQueue {
    async fn publish(&self, event: ActionCreated) -> Result<(), PublishError> {
        self.tx.send(event).await.map_err(|_| PublishError::Closed)
    }
}
