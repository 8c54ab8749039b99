//! Augur HTTP API service.
//!
//! Exposes the entitlement engine over HTTP:
//!
//! - Wallet balances, history, diamond conversion and account deletion
//! - Action submission and fulfillment status
//! - Daily rewards and free-tier quota
//! - Payment and ad-network webhooks
//!
//! # Authentication
//!
//! 1. **User JWTs** - bearer tokens, HS256 with a shared secret or RS256 via JWKS
//! 2. **Service API key** - the fulfillment worker (`X-API-Key`)
//! 3. **Admin API key** - operator endpoints (`X-Admin-Key`)
//! 4. **HMAC signatures** - webhooks (`X-Signature`)

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
// Allow some pedantic lints that are noisy for Axum handler functions
#![allow(clippy::missing_errors_doc)] // Axum handlers all return Result
#![allow(clippy::unused_async)] // Handlers are async for the router even when they don't await

pub mod auth;
pub mod config;
pub mod crypto;
pub mod error;
pub mod fulfillment;
pub mod handlers;
pub mod routes;
pub mod state;

pub use config::{ServiceConfig, StorageBackend};
pub use error::ApiError;
pub use routes::create_router;
pub use state::AppState;
