//! Application state.

use std::sync::Arc;

use tokio::sync::RwLock;

use augur_engine::Engine;

use crate::auth::JwksCache;
use crate::config::ServiceConfig;

/// Application state shared across handlers.
pub struct AppState {
    /// The entitlement engine.
    pub engine: Engine,

    /// Service configuration.
    pub config: ServiceConfig,

    /// Signing keys fetched from the identity provider.
    pub(crate) jwks: RwLock<JwksCache>,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(engine: Engine, config: ServiceConfig) -> Self {
        if config.auth_jwt_secret.is_some() {
            tracing::info!("Verifying user tokens with the shared HS256 secret");
        } else {
            tracing::info!(issuer = %config.auth_base_url, "Verifying user tokens against JWKS");
        }
        if config.payment_webhook_secret.is_none() {
            tracing::warn!("PAYMENT_WEBHOOK_SECRET not set - payment callbacks will be rejected");
        }
        if config.ad_webhook_secret.is_none() {
            tracing::warn!("AD_WEBHOOK_SECRET not set - ad callbacks will be rejected");
        }

        Self {
            engine,
            config,
            jwks: RwLock::new(JwksCache::new()),
        }
    }

    /// Wrap in an `Arc` for use as router state.
    #[must_use]
    pub fn shared(self) -> Arc<Self> {
        Arc::new(self)
    }
}
