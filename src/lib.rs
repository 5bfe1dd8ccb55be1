//! poll-depot: vote aggregation and read-serving for the rental site's
//! poll cards. A registry of poll definitions, a durable vote tally, and a
//! bulk result API with short-TTL and gzip feed caching.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use log::{error, info};
use tokio::net::TcpListener;
use tokio::signal::{
    ctrl_c,
    unix::{SignalKind, signal},
};

pub mod cache;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod registry;
pub mod store;
pub mod tally;
pub mod tasks;

use cache::{ResultsCache, feed::FeedCache};
use config::{Config, StoreBackend};
use handlers::AppState;
use registry::Registry;
use store::{FileStore, SqliteStore, VoteStore};

pub async fn start_server() {
    let config = Config::load();

    let registry = Arc::new(Registry::load(&config.registry_path));
    info!(
        "Loaded {} polls from {}",
        registry.len(),
        config.registry_path.display()
    );

    let store: Arc<dyn VoteStore> = match config.store_backend {
        StoreBackend::Sqlite => {
            match SqliteStore::connect(Arc::clone(&registry), &config.database_url).await {
                Ok(store) => Arc::new(store),
                Err(e) => {
                    error!("Failed to open vote database: {e}");
                    return;
                }
            }
        }
        StoreBackend::File => Arc::new(
            FileStore::open(
                Arc::clone(&registry),
                &config.data_path,
                Duration::from_millis(config.write_debounce_ms),
            )
            .await,
        ),
    };

    let state = AppState {
        registry,
        store: Arc::clone(&store),
        results_cache: Arc::new(Mutex::new(ResultsCache::new(
            Duration::from_secs(config.bulk_cache_ttl_secs),
            config.bulk_cache_capacity,
        ))),
        feed: Arc::new(FeedCache::new(Duration::from_secs(config.feed_refresh_secs))),
    };

    let app = handlers::router(state);

    tokio::spawn(tasks::flush::periodic_flush(
        Arc::clone(&store),
        Duration::from_secs(config.flush_interval_secs),
    ));

    let listener = match TcpListener::bind(&config.bind_addr).await {
        Ok(listener) => listener,
        Err(e) => {
            error!("Failed to bind {}: {}", config.bind_addr, e);
            return;
        }
    };
    info!("poll-depot listening on {}", config.bind_addr);

    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("Server error: {e}");
    }

    // Last chance to land a debounced write that was still pending.
    store.force_write().await;
    info!("Shut down cleanly");
}

async fn shutdown_signal() {
    let ctrl_c = async {
        ctrl_c().await.expect("Failed to install Ctrl+C handler");
        info!("Received Ctrl+C, shutting down");
    };

    #[cfg(unix)]
    let terminate = async {
        signal(SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
        info!("Received terminate signal, shutting down");
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
