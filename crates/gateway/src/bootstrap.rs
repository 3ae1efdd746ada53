//! AppState construction extracted from `main.rs` so tests can boot the
//! same wiring without a listener.

use std::sync::Arc;

use anyhow::Context;

use mdk_domain::config::Config;
use mdk_sessions::{Mdk, TimeSource};

use crate::api::session::{self, SessionOptions};
use crate::state::AppState;

/// Validate config, create and start the client handle, apply the session
/// options and run `init` once against the started handle.
pub fn build_app_state<F>(
    config: Arc<Config>,
    time: Arc<dyn TimeSource>,
    init: F,
) -> anyhow::Result<AppState>
where
    F: FnOnce(&Mdk),
{
    config.validate().context("config validation failed")?;

    let mdk = Arc::new(Mdk::with_time_source(&config, time));
    let options = SessionOptions::from(&config.session);
    session::setup(&mdk, &options, init);

    tracing::info!(
        nodes = config.discovery.nodes.len(),
        default_deadline = ?mdk.default_deadline(),
        "session middleware ready"
    );

    Ok(AppState { config, mdk })
}
