// Application state module
// Read-only configuration plus the few counters shared across connections

use std::sync::atomic::AtomicUsize;
use std::sync::Arc;
use tokio::sync::Notify;

use super::types::Config;

/// Application state
pub struct AppState {
    pub config: Config,
    /// Live connection count, checked against `performance.max_connections`
    pub active_connections: Arc<AtomicUsize>,
    /// Fired once by the signal handler to stop accepting connections
    pub shutdown_signal: Arc<Notify>,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            active_connections: Arc::new(AtomicUsize::new(0)),
            shutdown_signal: Arc::new(Notify::new()),
        }
    }

    pub fn access_log_enabled(&self) -> bool {
        self.config.logging.access_log
    }
}
