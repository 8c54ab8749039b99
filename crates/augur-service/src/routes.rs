//! Router configuration.

use std::sync::Arc;
use std::time::Duration;

use axum::routing::{delete, get, post};
use axum::Router;
use tower::limit::ConcurrencyLimitLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::handlers::{actions, credits, health, quota, rewards, wallet, webhooks};
use crate::state::AppState;

/// Maximum concurrent requests for action submission.
const ACTIONS_MAX_CONCURRENT_REQUESTS: usize = 100;

/// Maximum concurrent requests for general API endpoints.
const API_MAX_CONCURRENT_REQUESTS: usize = 50;

/// Create the service router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Wallet (user JWT)
/// - `GET /v1/wallet/balance` - Credits and diamonds
/// - `GET /v1/wallet/transactions` - Ledger history, newest first
/// - `POST /v1/wallet/convert` - Convert diamonds to credits
/// - `DELETE /v1/wallet/me` - Zero the wallet (account deletion)
/// - `GET /v1/quota` - Free uses left today
///
/// ## Actions
/// - `POST /v1/actions` - Submit a billable action (user JWT)
/// - `GET /v1/actions?status=pending` - Actions awaiting an outcome (service API key)
/// - `GET /v1/actions/:id` - Read one of the caller's actions (user JWT)
/// - `POST /v1/actions/:id/status` - Report the fulfillment outcome (service API key)
///
/// ## Rewards (user JWT)
/// - `GET /v1/rewards/daily` - Today's eligibility
/// - `POST /v1/rewards/daily` - Claim today's login reward
///
/// ## Admin
/// - `POST /v1/credits/add` - Grant bonus credits (admin API key)
///
/// ## Webhooks (HMAC signature)
/// - `POST /webhooks/payments` - Purchases and subscription renewals
/// - `POST /webhooks/ads` - Completed ad views
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.cors_origins);
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout_seconds = state.config.request_timeout_seconds;

    let state = Arc::new(state);

    let action_routes = Router::new()
        .route("/", post(actions::submit_action).get(actions::list_pending))
        .route("/:id", get(actions::get_action))
        .route("/:id/status", post(actions::update_status))
        .layer(ConcurrencyLimitLayer::new(ACTIONS_MAX_CONCURRENT_REQUESTS));

    let api_routes = Router::new()
        .route("/wallet/balance", get(wallet::get_balance))
        .route("/wallet/transactions", get(wallet::list_transactions))
        .route("/wallet/convert", post(wallet::convert_diamonds))
        .route("/wallet/me", delete(wallet::reset_wallet))
        .route("/quota", get(quota::get_quota))
        .route(
            "/rewards/daily",
            get(rewards::daily_status).post(rewards::claim_daily),
        )
        .route("/credits/add", post(credits::admin_add_credits))
        .nest("/actions", action_routes)
        .layer(ConcurrencyLimitLayer::new(API_MAX_CONCURRENT_REQUESTS));

    Router::new()
        .route("/health", get(health::health))
        .nest("/v1", api_routes)
        // Webhooks are not rate limited; providers retry on failure.
        .route("/webhooks/payments", post(webhooks::payment_webhook))
        .route("/webhooks/ads", post(webhooks::ad_webhook))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(Duration::from_secs(request_timeout_seconds)))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
