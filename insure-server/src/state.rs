//! Application state

use crate::config::ServerConfig;
use insure_core::PolicyStore;
use std::sync::Arc;
use std::time::Instant;

/// State handed to every handler and middleware.
///
/// Cloning is cheap: the store and config are shared, never copied.
#[derive(Clone)]
pub struct AppState {
    /// The policy store, one per process
    pub store: Arc<PolicyStore>,

    /// Resolved server configuration
    pub config: Arc<ServerConfig>,

    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    /// Wrap a store with the default configuration
    pub fn new(store: PolicyStore) -> Self {
        Self::with_config(store, ServerConfig::default())
    }

    /// Wrap a store with an explicit configuration
    pub fn with_config(store: PolicyStore, config: ServerConfig) -> Self {
        Self {
            store: Arc::new(store),
            config: Arc::new(config),
            start_time: Instant::now(),
        }
    }

    /// Load the store from the configured data directory
    pub fn load(config: ServerConfig) -> insure_core::Result<Self> {
        let store = PolicyStore::load(&config.data_dir)?;
        Ok(Self::with_config(store, config))
    }

    /// Get uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
