//! Authentication extractors.
//!
//! - `AuthUser` - end users, via a bearer JWT
//! - `ServiceAuth` - the fulfillment worker, via `X-API-Key`
//! - `AdminAuth` - operators, via `X-Admin-Key`
//!
//! User tokens are verified with the shared HS256 secret when one is configured, otherwise
//! with RS256 keys fetched from the identity provider's JWKS endpoint.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use jsonwebtoken::{decode, decode_header, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};

use augur_core::UserId;

use crate::error::ApiError;
use crate::state::AppState;

/// How long to cache JWKS keys before refreshing.
const JWKS_CACHE_DURATION: Duration = Duration::from_secs(3600);

/// Timeout for JWKS fetch requests.
const JWKS_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// An authenticated user extracted from a JWT.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user ID.
    pub user_id: UserId,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .ok_or(ApiError::Unauthorized)?;

        // Never compiled into production builds.
        #[cfg(any(test, feature = "test-auth"))]
        if let Some(user_id) = token.strip_prefix("test-token:") {
            let user_id = user_id.parse().map_err(|_| ApiError::Unauthorized)?;
            return Ok(Self { user_id });
        }

        let claims = match &state.config.auth_jwt_secret {
            Some(secret) => validate_hs256(token, secret, state)?,
            None => validate_jwt(token, state).await?,
        };

        let user_id = claims.sub.parse().map_err(|_| {
            tracing::debug!(sub = %claims.sub, "JWT subject is not a user id");
            ApiError::Unauthorized
        })?;

        Ok(Self { user_id })
    }
}

/// Service authentication via API key.
///
/// Used by the fulfillment worker to report action outcomes.
#[derive(Debug, Clone)]
pub struct ServiceAuth {
    /// The service name or identifier.
    pub service_name: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for ServiceAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let api_key = parts
            .headers
            .get("x-api-key")
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let expected_key = state
            .config
            .service_api_key
            .as_ref()
            .ok_or(ApiError::Unauthorized)?;

        if !keys_match(api_key, expected_key) {
            return Err(ApiError::Unauthorized);
        }

        let service_name = parts
            .headers
            .get("x-service-name")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
            .to_string();

        Ok(Self { service_name })
    }
}

/// Admin authentication via the `X-Admin-Key` header.
#[derive(Debug, Clone)]
pub struct AdminAuth {
    /// Admin identifier (for audit logging).
    pub admin_id: String,
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AdminAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let admin_key = parts
            .headers
            .get("x-admin-key")
            .and_then(|v| v.to_str().ok())
            .ok_or(ApiError::Unauthorized)?;

        let expected_key = state
            .config
            .admin_api_key
            .as_ref()
            .ok_or(ApiError::Unauthorized)?;

        if !keys_match(admin_key, expected_key) {
            return Err(ApiError::Unauthorized);
        }

        let admin_id = parts
            .headers
            .get("x-admin-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("admin")
            .to_string();

        tracing::info!(admin_id = %admin_id, "Admin authenticated");

        Ok(Self { admin_id })
    }
}

fn keys_match(provided: &str, expected: &str) -> bool {
    let (a, b) = (provided.as_bytes(), expected.as_bytes());
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// JWT claims.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    /// Subject (user ID).
    pub sub: String,
    /// Audience (string or array).
    #[serde(default)]
    pub aud: Option<serde_json::Value>,
    /// Issuer.
    pub iss: String,
    /// Expiration time.
    pub exp: i64,
    /// Issued at.
    #[serde(default)]
    pub iat: i64,
}

fn validation(algorithm: Algorithm, state: &AppState) -> Validation {
    let mut validation = Validation::new(algorithm);
    validation.set_audience(&[&state.config.auth_audience]);
    validation.set_issuer(&[&state.config.auth_base_url]);
    validation
}

fn validate_hs256(token: &str, secret: &str, state: &AppState) -> Result<JwtClaims, ApiError> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    decode::<JwtClaims>(token, &key, &validation(Algorithm::HS256, state))
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(error = %e, "JWT validation failed");
            ApiError::Unauthorized
        })
}

/// JWKS (JSON Web Key Set) response structure.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwks {
    /// List of JWK keys.
    pub keys: Vec<Jwk>,
}

/// Single JSON Web Key.
#[derive(Debug, Clone, Deserialize)]
pub struct Jwk {
    /// Key type (e.g., "RSA").
    pub kty: String,
    /// Key ID.
    pub kid: Option<String>,
    /// RSA public key modulus (base64url encoded).
    pub n: Option<String>,
    /// RSA public key exponent (base64url encoded).
    pub e: Option<String>,
}

/// Cached signing keys, held in [`AppState`].
pub(crate) struct JwksCache {
    client: reqwest::Client,
    keys: HashMap<String, DecodingKey>,
    /// Used for tokens without a `kid`.
    default_key: Option<DecodingKey>,
    last_updated: Option<Instant>,
}

impl JwksCache {
    pub(crate) fn new() -> Self {
        let client = reqwest::Client::builder()
            .timeout(JWKS_FETCH_TIMEOUT)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            client,
            keys: HashMap::new(),
            default_key: None,
            last_updated: None,
        }
    }

    fn is_expired(&self) -> bool {
        self.last_updated
            .map_or(true, |at| at.elapsed() >= JWKS_CACHE_DURATION)
    }

    fn lookup(&self, kid: Option<&str>) -> Option<DecodingKey> {
        match kid {
            Some(kid) => self.keys.get(kid).cloned(),
            None => self.default_key.clone(),
        }
    }

    fn replace(&mut self, jwks: &Jwks) {
        self.keys.clear();
        self.default_key = None;
        self.last_updated = Some(Instant::now());

        for jwk in &jwks.keys {
            let Some(key) = jwk_to_decoding_key(jwk) else {
                continue;
            };
            if let Some(kid) = &jwk.kid {
                self.keys.insert(kid.clone(), key.clone());
            }
            if self.default_key.is_none() {
                self.default_key = Some(key);
            }
        }
    }
}

/// Validate an RS256 JWT against the provider's JWKS.
async fn validate_jwt(token: &str, state: &AppState) -> Result<JwtClaims, ApiError> {
    let header = decode_header(token).map_err(|e| {
        tracing::debug!(error = %e, "Failed to decode JWT header");
        ApiError::Unauthorized
    })?;

    let key = decoding_key(header.kid.as_deref(), state).await?;

    decode::<JwtClaims>(token, &key, &validation(Algorithm::RS256, state))
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(error = %e, "JWT validation failed");
            ApiError::Unauthorized
        })
}

async fn decoding_key(kid: Option<&str>, state: &AppState) -> Result<DecodingKey, ApiError> {
    let client = {
        let cache = state.jwks.read().await;
        if !cache.is_expired() {
            if let Some(key) = cache.lookup(kid) {
                return Ok(key);
            }
        }
        cache.client.clone()
    };

    let jwks = fetch_jwks(&client, &state.config.auth_base_url).await?;

    let mut cache = state.jwks.write().await;
    cache.replace(&jwks);
    cache.lookup(kid).ok_or(ApiError::Unauthorized)
}

async fn fetch_jwks(client: &reqwest::Client, base_url: &str) -> Result<Jwks, ApiError> {
    let jwks_url = format!("{base_url}/.well-known/jwks.json");

    tracing::debug!(url = %jwks_url, "Fetching JWKS");

    let response = client.get(&jwks_url).send().await.map_err(|e| {
        tracing::error!(error = %e, url = %jwks_url, "Failed to fetch JWKS");
        ApiError::ExternalService("Failed to fetch authentication keys".into())
    })?;

    if !response.status().is_success() {
        tracing::error!(
            status = %response.status(),
            url = %jwks_url,
            "JWKS fetch returned non-success status"
        );
        return Err(ApiError::ExternalService(
            "Failed to fetch authentication keys".into(),
        ));
    }

    let jwks: Jwks = response.json().await.map_err(|e| {
        tracing::error!(error = %e, "Failed to parse JWKS response");
        ApiError::ExternalService("Failed to parse authentication keys".into())
    })?;

    tracing::info!(keys_count = %jwks.keys.len(), "JWKS fetched");

    Ok(jwks)
}

fn jwk_to_decoding_key(jwk: &Jwk) -> Option<DecodingKey> {
    if jwk.kty != "RSA" {
        tracing::debug!(kty = %jwk.kty, "Skipping non-RSA JWK");
        return None;
    }
    DecodingKey::from_rsa_components(jwk.n.as_ref()?, jwk.e.as_ref()?).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_comparison() {
        assert!(keys_match("abc", "abc"));
        assert!(!keys_match("abc", "abd"));
        assert!(!keys_match("abc", "abcd"));
        assert!(!keys_match("", "a"));
    }

    #[test]
    fn empty_cache_is_expired() {
        let cache = JwksCache::new();
        assert!(cache.is_expired());
        assert!(cache.lookup(None).is_none());
    }

    #[test]
    fn non_rsa_keys_are_skipped() {
        let jwk = Jwk {
            kty: "EC".into(),
            kid: Some("k1".into()),
            n: None,
            e: None,
        };
        assert!(jwk_to_decoding_key(&jwk).is_none());

        let mut cache = JwksCache::new();
        cache.replace(&Jwks { keys: vec![jwk] });
        assert!(!cache.is_expired());
        assert!(cache.lookup(Some("k1")).is_none());
    }
}
