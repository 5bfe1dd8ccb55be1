use std::{env, fmt::Display, path::PathBuf, str::FromStr};

use log::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    File,
    Sqlite,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub bind_addr: String,
    pub store_backend: StoreBackend,
    pub data_path: PathBuf,
    pub database_url: String,
    pub registry_path: PathBuf,
    pub write_debounce_ms: u64,
    pub bulk_cache_ttl_secs: u64,
    pub bulk_cache_capacity: usize,
    pub feed_refresh_secs: u64,
    pub flush_interval_secs: u64,
}

impl Config {
    pub fn load() -> Self {
        Self {
            bind_addr: try_load("POLL_ADDR", "0.0.0.0:3000"),
            store_backend: load_backend(),
            data_path: PathBuf::from(try_load::<String>("POLL_DATA_PATH", "data/polls.json")),
            database_url: try_load("DATABASE_URL", "sqlite:poll_depot.db"),
            registry_path: PathBuf::from(try_load::<String>(
                "POLL_REGISTRY_PATH",
                "data/pollsRegistry.json",
            )),
            write_debounce_ms: try_load("POLL_WRITE_DEBOUNCE_MS", "500"),
            bulk_cache_ttl_secs: try_load("POLL_BULK_CACHE_TTL_SECS", "15"),
            bulk_cache_capacity: try_load("POLL_BULK_CACHE_CAPACITY", "100"),
            feed_refresh_secs: try_load("POLL_FEED_REFRESH_SECS", "300"),
            flush_interval_secs: try_load("POLL_FLUSH_INTERVAL_SECS", "60"),
        }
    }
}

fn load_backend() -> StoreBackend {
    match try_load::<String>("POLL_STORE", "file").as_str() {
        "sqlite" => StoreBackend::Sqlite,
        "file" => StoreBackend::File,
        other => {
            warn!("Unknown POLL_STORE value {other:?}, falling back to the file store");
            StoreBackend::File
        }
    }
}

fn try_load<T: FromStr>(key: &str, default: &str) -> T
where
    T::Err: Display,
{
    env::var(key)
        .unwrap_or_else(|_| {
            info!("{key} not set, using default: {default}");
            default.to_string()
        })
        .parse()
        .map_err(|e| {
            warn!("Invalid {key} value: {e}");
        })
        .expect("Environment misconfigured!")
}
