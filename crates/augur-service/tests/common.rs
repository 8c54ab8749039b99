//! Common test utilities for augur service integration tests.

#![allow(dead_code)] // Some utilities are used by different test files

use std::sync::Arc;

use axum::http::{HeaderName, HeaderValue};
use axum_test::TestServer;
use chrono::{TimeZone, Utc};
use jsonwebtoken::{encode, EncodingKey, Header};
use serde::Serialize;
use tokio::sync::mpsc;

use augur_core::{ActionCreated, ActionType, EarningRule, UserId};
use augur_engine::{
    default_earning_rules, ChannelQueue, Engine, EngineConfig, FixedClock, StaticConfig,
};
use augur_service::crypto::hmac_sha256_hex;
use augur_service::{create_router, AppState, ServiceConfig, StorageBackend};
use augur_store::MemoryStore;

pub const JWT_SECRET: &str = "test-jwt-secret";
pub const ISSUER: &str = "http://localhost";
pub const AUDIENCE: &str = "augur";
pub const SERVICE_KEY: &str = "test-service-key";
pub const ADMIN_KEY: &str = "test-admin-key";
pub const PAYMENT_SECRET: &str = "test-payment-secret";
pub const AD_SECRET: &str = "test-ad-secret";
pub const FORTUNE_COST: i64 = 50;

/// Test harness containing everything needed for integration tests.
pub struct TestHarness {
    /// The test server for making HTTP requests.
    pub server: TestServer,
    /// A test user ID for authenticated requests.
    pub test_user_id: UserId,
    /// Events the engine published for the fulfillment worker.
    pub events: mpsc::Receiver<ActionCreated>,
    /// The engine's clock.
    pub clock: Arc<FixedClock>,
}

impl TestHarness {
    /// Fortune costs 50 credits, 100 welcome credits, no free tier.
    pub fn new() -> Self {
        Self::with_engine(EngineConfig::default().with_cost(ActionType::fortune(), FORTUNE_COST))
    }

    /// Same as [`TestHarness::new`] with `limit` free uses per day.
    pub fn with_free_limit(limit: u32) -> Self {
        Self::with_engine(
            EngineConfig::default()
                .with_cost(ActionType::fortune(), FORTUNE_COST)
                .with_daily_free_limit(Some(limit)),
        )
    }

    pub fn with_rules(rules: Vec<EarningRule>) -> Self {
        Self::with_engine(
            EngineConfig::default()
                .with_cost(ActionType::fortune(), FORTUNE_COST)
                .with_earning_rules(rules)
                .expect("valid rules"),
        )
    }

    pub fn with_engine(engine_config: EngineConfig) -> Self {
        let config = ServiceConfig {
            listen_addr: "127.0.0.1:0".into(),
            data_dir: String::new(),
            storage_backend: StorageBackend::Memory,
            auth_base_url: ISSUER.into(),
            auth_audience: AUDIENCE.into(),
            auth_jwt_secret: Some(JWT_SECRET.into()),
            service_api_key: Some(SERVICE_KEY.into()),
            admin_api_key: Some(ADMIN_KEY.into()),
            payment_webhook_secret: Some(PAYMENT_SECRET.into()),
            ad_webhook_secret: Some(AD_SECRET.into()),
            fulfillment_url: None,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
            engine: engine_config.clone(),
        };

        let clock = Arc::new(FixedClock::new(
            Utc.with_ymd_and_hms(2024, 6, 1, 9, 30, 0).unwrap(),
        ));
        let (queue, events) = ChannelQueue::bounded(64);
        let engine = Engine::with_clock(
            Arc::new(MemoryStore::new()),
            Arc::new(StaticConfig::new(engine_config)),
            Arc::new(queue),
            clock.clone(),
        );

        let server = TestServer::new(create_router(AppState::new(engine, config)))
            .expect("Failed to create test server");

        Self {
            server,
            test_user_id: UserId::generate(),
            events,
            clock,
        }
    }

    /// Authorization header for the test user.
    pub fn user_auth(&self) -> (HeaderName, HeaderValue) {
        bearer(&token_for(&self.test_user_id))
    }

    /// Authorization header for a fresh user.
    pub fn other_user_auth() -> (HeaderName, HeaderValue) {
        bearer(&token_for(&UserId::generate()))
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

pub fn default_rules() -> Vec<EarningRule> {
    default_earning_rules()
}

#[derive(Serialize)]
struct Claims<'a> {
    sub: String,
    aud: &'a str,
    iss: &'a str,
    exp: i64,
    iat: i64,
}

/// A valid HS256 token for `user_id`.
pub fn token_for(user_id: &UserId) -> String {
    signed_token(&user_id.to_string(), JWT_SECRET)
}

pub fn signed_token(sub: &str, secret: &str) -> String {
    let now = Utc::now().timestamp();
    let claims = Claims {
        sub: sub.to_string(),
        aud: AUDIENCE,
        iss: ISSUER,
        exp: now + 3600,
        iat: now,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("encode token")
}

pub fn bearer(token: &str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static("authorization"),
        HeaderValue::from_str(&format!("Bearer {token}")).expect("header value"),
    )
}

pub fn header(name: &'static str, value: &str) -> (HeaderName, HeaderValue) {
    (
        HeaderName::from_static(name),
        HeaderValue::from_str(value).expect("header value"),
    )
}

/// `x-signature` header for `body` under `secret`.
pub fn signature(secret: &str, body: &str) -> (HeaderName, HeaderValue) {
    header(
        "x-signature",
        &hmac_sha256_hex(secret, body.as_bytes()).expect("hmac"),
    )
}
