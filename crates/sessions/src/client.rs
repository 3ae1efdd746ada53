//! The process-wide client handle.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;

use mdk_domain::config::Config;
use mdk_domain::error::Result;
use mdk_domain::node::Node;

use crate::context::SharedContext;
use crate::discovery::Discovery;
use crate::session::Session;
use crate::time::{SystemTime, TimeSource};

/// Owns discovery and the defaults applied to every session. Construct one
/// per process, call [`Mdk::start`] before serving and [`Mdk::stop`] on
/// shutdown.
pub struct Mdk {
    discovery: Arc<Discovery>,
    time: Arc<dyn TimeSource>,
    /// Nodes registered on `start`.
    seed_nodes: Vec<Node>,
    resolve_cap: f64,
    default_deadline: RwLock<Option<f64>>,
    started: AtomicBool,
    stopped: AtomicBool,
}

impl Mdk {
    pub fn new(config: &Config) -> Self {
        Self::with_time_source(config, Arc::new(SystemTime))
    }

    pub fn with_time_source(config: &Config, time: Arc<dyn TimeSource>) -> Self {
        Self {
            discovery: Arc::new(Discovery::new(
                config.failure_policy.clone(),
                time.clone(),
            )),
            time,
            seed_nodes: config.discovery.nodes.clone(),
            resolve_cap: config.discovery.resolve_timeout_secs,
            default_deadline: RwLock::new(None),
            started: AtomicBool::new(false),
            stopped: AtomicBool::new(false),
        }
    }

    /// Register the configured nodes. Only the first call has any effect.
    pub fn start(&self) {
        if self.started.swap(true, Ordering::AcqRel) {
            return;
        }
        for node in &self.seed_nodes {
            self.discovery.add_node(node.clone());
        }
        tracing::info!(nodes = self.seed_nodes.len(), "mdk started");
    }

    /// Stop the client. Pending and future resolves fail; sessions stay
    /// readable. Only the first call has any effect.
    pub fn stop(&self) {
        if !self.started.load(Ordering::Acquire) || self.stopped.swap(true, Ordering::AcqRel) {
            return;
        }
        self.discovery.close();
        tracing::info!("mdk stopped");
    }

    pub fn is_running(&self) -> bool {
        self.started.load(Ordering::Acquire) && !self.stopped.load(Ordering::Acquire)
    }

    pub fn discovery(&self) -> &Arc<Discovery> {
        &self.discovery
    }

    /// Deadline (seconds) applied to every session created or joined from
    /// now on. Joined sessions keep an inherited deadline if it is sooner.
    pub fn set_default_deadline(&self, secs: f64) {
        *self.default_deadline.write() = Some(secs);
        tracing::debug!(secs, "default deadline set");
    }

    pub fn default_deadline(&self) -> Option<f64> {
        *self.default_deadline.read()
    }

    /// A fresh session with a new trace.
    pub fn session(&self) -> Arc<Session> {
        self.build(SharedContext::new())
    }

    /// Continue the session encoded in `token`.
    pub fn join(&self, token: &str) -> Result<Arc<Session>> {
        let mut inbound = SharedContext::decode(token)?;
        Ok(self.build(inbound.enter()))
    }

    /// Join `token` when present and valid, otherwise start fresh.
    pub fn join_or_create(&self, token: Option<&str>) -> Arc<Session> {
        match token.map(str::trim).filter(|t| !t.is_empty()) {
            Some(raw) => match self.join(raw) {
                Ok(session) => session,
                Err(e) => {
                    tracing::warn!(error = %e, "ignoring malformed context header");
                    self.session()
                }
            },
            None => self.session(),
        }
    }

    fn build(&self, context: SharedContext) -> Arc<Session> {
        let session = Session::new(
            context,
            self.discovery.clone(),
            self.time.clone(),
            self.resolve_cap,
        );
        if let Some(secs) = self.default_deadline() {
            session.set_deadline(secs);
        }
        Arc::new(session)
    }
}

impl Drop for Mdk {
    fn drop(&mut self) {
        self.stop();
    }
}
