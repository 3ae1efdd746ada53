use std::sync::Arc;

use mdk_domain::config::Config;
use mdk_sessions::Mdk;

/// Shared application state passed to the middleware and all handlers.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Process-wide client handle; started in bootstrap, stopped after the
    /// server shuts down.
    pub mdk: Arc<Mdk>,
}
