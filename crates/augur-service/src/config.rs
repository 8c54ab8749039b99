//! Service configuration.

use std::path::Path;
use std::str::FromStr;

use serde::Deserialize;

use augur_core::{BillingError, EarningRule};
use augur_engine::{default_earning_rules, parse_action_costs, EngineConfig};

/// Where balances are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StorageBackend {
    /// `RocksDB` under `DATA_DIR`.
    #[default]
    RocksDb,
    /// In-process tables; nothing survives a restart.
    Memory,
}

impl FromStr for StorageBackend {
    type Err = BillingError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "rocksdb" | "rocks" => Ok(Self::RocksDb),
            "memory" | "mem" => Ok(Self::Memory),
            other => Err(BillingError::Configuration(format!(
                "unknown storage backend: {other}"
            ))),
        }
    }
}

/// Service configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Address to listen on (default: "0.0.0.0:8080").
    pub listen_addr: String,

    /// Path to `RocksDB` data directory (default: "/data/augur").
    pub data_dir: String,

    /// Storage backend (default: `RocksDB`).
    pub storage_backend: StorageBackend,

    /// JWT issuer base URL; JWKS is fetched from `<base>/.well-known/jwks.json`.
    pub auth_base_url: String,

    /// Expected JWT audience (default: "augur").
    pub auth_audience: String,

    /// Shared HS256 secret. When set, user tokens are verified with it instead of JWKS.
    pub auth_jwt_secret: Option<String>,

    /// Service API key for the fulfillment worker.
    pub service_api_key: Option<String>,

    /// Admin API key.
    pub admin_api_key: Option<String>,

    /// HMAC secret for payment provider webhooks.
    pub payment_webhook_secret: Option<String>,

    /// HMAC secret for ad network callbacks.
    pub ad_webhook_secret: Option<String>,

    /// Worker endpoint `ActionCreated` events are posted to (optional).
    pub fulfillment_url: Option<String>,

    /// CORS allowed origins.
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    pub request_timeout_seconds: u64,

    /// Costs, quota and rewards.
    pub engine: EngineConfig,
}

/// Secrets file structure. Every field falls back to its environment variable.
#[derive(Debug, Default, Deserialize)]
struct Secrets {
    #[serde(default)]
    service_api_key: Option<String>,
    #[serde(default)]
    admin_api_key: Option<String>,
    #[serde(default)]
    payment_webhook_secret: Option<String>,
    #[serde(default)]
    ad_webhook_secret: Option<String>,
    #[serde(default)]
    auth_jwt_secret: Option<String>,
}

impl ServiceConfig {
    /// Load configuration from environment variables and the secrets file.
    ///
    /// # Errors
    ///
    /// Returns [`BillingError::Configuration`] if an engine setting is malformed.
    pub fn from_env() -> Result<Self, BillingError> {
        let secrets = load_secrets();
        let defaults = Self::default();

        Ok(Self {
            listen_addr: env("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            data_dir: env("DATA_DIR").unwrap_or(defaults.data_dir),
            storage_backend: env("STORAGE_BACKEND")
                .map(|s| s.parse())
                .transpose()?
                .unwrap_or_default(),
            auth_base_url: env("AUTH_BASE_URL").unwrap_or(defaults.auth_base_url),
            auth_audience: env("AUTH_AUDIENCE").unwrap_or(defaults.auth_audience),
            auth_jwt_secret: secrets.auth_jwt_secret.or_else(|| env("AUTH_JWT_SECRET")),
            service_api_key: secrets.service_api_key.or_else(|| env("SERVICE_API_KEY")),
            admin_api_key: secrets.admin_api_key.or_else(|| env("ADMIN_API_KEY")),
            payment_webhook_secret: secrets
                .payment_webhook_secret
                .or_else(|| env("PAYMENT_WEBHOOK_SECRET")),
            ad_webhook_secret: secrets.ad_webhook_secret.or_else(|| env("AD_WEBHOOK_SECRET")),
            fulfillment_url: env("FULFILLMENT_URL"),
            cors_origins: env("CORS_ORIGINS").map_or(defaults.cors_origins, |s| {
                s.split(',').map(|o| o.trim().to_string()).collect()
            }),
            max_body_bytes: parsed("MAX_BODY_BYTES").unwrap_or(defaults.max_body_bytes),
            request_timeout_seconds: parsed("REQUEST_TIMEOUT_SECONDS")
                .unwrap_or(defaults.request_timeout_seconds),
            engine: engine_from_env()?,
        })
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".into(),
            data_dir: "/data/augur".into(),
            storage_backend: StorageBackend::RocksDb,
            auth_base_url: "https://auth.augur.app".into(),
            auth_audience: "augur".into(),
            auth_jwt_secret: None,
            service_api_key: None,
            admin_api_key: None,
            payment_webhook_secret: None,
            ad_webhook_secret: None,
            fulfillment_url: None,
            cors_origins: vec!["*".into()],
            max_body_bytes: 1024 * 1024,
            request_timeout_seconds: 30,
            engine: EngineConfig::default(),
        }
    }
}

fn env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn parsed<T: FromStr>(name: &str) -> Option<T> {
    env(name).and_then(|s| s.trim().parse().ok())
}

/// Build the engine settings from `WELCOME_CREDITS`, `DAILY_FREE_LIMIT`, `ACTION_COSTS` and
/// `EARNING_RULES_PATH`.
fn engine_from_env() -> Result<EngineConfig, BillingError> {
    let mut engine = EngineConfig::default();
    if let Some(welcome) = env("WELCOME_CREDITS") {
        engine.welcome_credits = welcome.trim().parse().map_err(|_| {
            BillingError::Configuration(format!("invalid WELCOME_CREDITS: {welcome}"))
        })?;
    }
    if let Some(limit) = env("DAILY_FREE_LIMIT") {
        engine.daily_free_limit = Some(limit.trim().parse().map_err(|_| {
            BillingError::Configuration(format!("invalid DAILY_FREE_LIMIT: {limit}"))
        })?);
    }
    if let Some(costs) = env("ACTION_COSTS") {
        engine.action_costs = parse_action_costs(&costs)?;
    }

    let rules = match env("EARNING_RULES_PATH") {
        Some(path) => load_earning_rules(&path)?,
        None => default_earning_rules(),
    };
    engine.with_earning_rules(rules)
}

/// Read earning rules from a JSON array file.
///
/// # Errors
///
/// Returns [`BillingError::Configuration`] if the file is unreadable or malformed.
pub fn load_earning_rules(path: &str) -> Result<Vec<EarningRule>, BillingError> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| BillingError::Configuration(format!("{path}: {e}")))?;
    let rules: Vec<EarningRule> = serde_json::from_str(&contents)
        .map_err(|e| BillingError::Configuration(format!("{path}: {e}")))?;
    tracing::info!(path = %path, rules = rules.len(), "Loaded earning rules");
    Ok(rules)
}

/// Load secrets from the first secrets file found.
fn load_secrets() -> Secrets {
    let secret_paths = [
        ".secrets/augur.json",
        "augur/.secrets/augur.json",
        "../.secrets/augur.json",
    ];

    for path in &secret_paths {
        if let Ok(secrets) = load_secrets_file::<Secrets>(path) {
            tracing::info!(path = %path, "Loaded secrets from file");
            return secrets;
        }
    }

    tracing::debug!("Secrets file not found, using environment variables");
    Secrets::default()
}

/// Load secrets from a JSON file.
fn load_secrets_file<T: serde::de::DeserializeOwned>(path: &str) -> Result<T, std::io::Error> {
    let path = Path::new(path);
    if !path.exists() {
        return Err(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            "Secrets file not found",
        ));
    }
    let contents = std::fs::read_to_string(path)?;
    serde_json::from_str(&contents)
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
}
