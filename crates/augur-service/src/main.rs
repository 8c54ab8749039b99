//! Augur service - HTTP API for credits, quota and rewards.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use augur_engine::{ChannelQueue, Engine, StaticConfig};
use augur_service::fulfillment::{self, Forwarder};
use augur_service::{create_router, AppState, ServiceConfig, StorageBackend};
use augur_store::{MemoryStore, Store};

/// Capacity of the in-process fulfillment channel.
const FULFILLMENT_QUEUE_CAPACITY: usize = 1024;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,augur=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting augur service");

    let config = ServiceConfig::from_env()?;

    tracing::info!(
        listen_addr = %config.listen_addr,
        data_dir = %config.data_dir,
        storage_backend = ?config.storage_backend,
        welcome_credits = config.engine.welcome_credits,
        daily_free_limit = ?config.engine.daily_free_limit,
        priced_actions = config.engine.action_costs.len(),
        fulfillment_configured = %config.fulfillment_url.is_some(),
        "Service configuration loaded"
    );

    let store = open_store(&config)?;

    let (queue, events) = ChannelQueue::bounded(FULFILLMENT_QUEUE_CAPACITY);
    let forwarder = config
        .fulfillment_url
        .as_ref()
        .map(|url| Forwarder::new(url.clone(), config.service_api_key.clone()));
    let _delivery = fulfillment::spawn(events, forwarder);

    let engine = Engine::new(
        store,
        Arc::new(StaticConfig::new(config.engine.clone())),
        Arc::new(queue),
    );

    let state = AppState::new(engine, config.clone());
    let app = create_router(state);

    tracing::info!(listen_addr = %config.listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&config.listen_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn open_store(config: &ServiceConfig) -> Result<Arc<dyn Store>, Box<dyn std::error::Error>> {
    match config.storage_backend {
        #[cfg(feature = "rocksdb-backend")]
        StorageBackend::RocksDb => {
            tracing::info!(path = %config.data_dir, "Opening RocksDB store");
            Ok(Arc::new(augur_store::RocksStore::open(&config.data_dir)?))
        }
        #[cfg(not(feature = "rocksdb-backend"))]
        StorageBackend::RocksDb => {
            Err("built without the rocksdb-backend feature; set STORAGE_BACKEND=memory".into())
        }
        StorageBackend::Memory => {
            tracing::warn!("Using in-memory store - balances will not survive a restart");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}
