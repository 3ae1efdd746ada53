//! A session: one logical call context inside this process.
//!
//! Interactions are tracked as a stack. Every node resolved while an
//! interaction is innermost is judged by that interaction: failure marks
//! them failed immediately, finishing marks whatever is left as succeeded.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde_json::Value;

use mdk_domain::error::Result;
use mdk_domain::node::Node;

use crate::context::SharedContext;
use crate::discovery::Discovery;
use crate::time::TimeSource;

/// Context property holding the absolute deadline (seconds since epoch).
pub const DEADLINE_PROPERTY: &str = "timeout";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    Critical,
}

pub struct Session {
    context: Mutex<SharedContext>,
    interactions: Mutex<Vec<Vec<Node>>>,
    discovery: Arc<Discovery>,
    time: Arc<dyn TimeSource>,
    resolve_cap: f64,
}

impl Session {
    pub(crate) fn new(
        context: SharedContext,
        discovery: Arc<Discovery>,
        time: Arc<dyn TimeSource>,
        resolve_cap: f64,
    ) -> Self {
        Self {
            context: Mutex::new(context),
            interactions: Mutex::new(Vec::new()),
            discovery,
            time,
            resolve_cap,
        }
    }

    pub fn trace_id(&self) -> String {
        self.context.lock().trace_id().to_owned()
    }

    /// Current `trace:clock` key without advancing the clock.
    pub fn context_key(&self) -> String {
        self.context.lock().key()
    }

    /// Serialize this session to a propagation token.
    pub fn externalize(&self) -> Result<String> {
        self.context.lock().encode()
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.context.lock().property(key).cloned()
    }

    pub fn set(&self, key: impl Into<String>, value: Value) {
        self.context.lock().set_property(key, value);
    }

    // ── Interactions ────────────────────────────────────────────────

    pub fn start_interaction(&self) {
        let depth = {
            let mut stack = self.interactions.lock();
            stack.push(Vec::new());
            stack.len()
        };
        self.log(LogLevel::Debug, "interaction", &format!("started (depth {depth})"));
    }

    /// Mark every node resolved so far in the innermost interaction as
    /// failed. Nodes resolved afterwards are judged when it finishes.
    pub fn fail_interaction(&self, message: &str) {
        let failed = match self.interactions.lock().last_mut() {
            Some(current) => std::mem::take(current),
            None => Vec::new(),
        };
        for node in &failed {
            self.discovery.failure_policy(node).failure();
        }
        self.log(
            LogLevel::Error,
            "interaction",
            &format!("failed ({} node(s)): {message}", failed.len()),
        );
    }

    /// Close the innermost interaction, marking its remaining nodes as
    /// succeeded.
    pub fn finish_interaction(&self) {
        let finished = self.interactions.lock().pop();
        match finished {
            Some(nodes) => {
                for node in &nodes {
                    self.discovery.failure_policy(node).success();
                }
                self.log(
                    LogLevel::Debug,
                    "interaction",
                    &format!("finished ({} node(s))", nodes.len()),
                );
            }
            None => {
                self.log(LogLevel::Warn, "interaction", "finish without an open interaction");
            }
        }
    }

    /// Number of interactions currently open.
    pub fn interaction_depth(&self) -> usize {
        self.interactions.lock().len()
    }

    // ── Deadlines ───────────────────────────────────────────────────

    /// Set the deadline `secs` from now, unless the current one is sooner.
    pub fn set_deadline(&self, secs: f64) {
        let candidate = self.time.now() + secs;
        let mut ctx = self.context.lock();
        let current = ctx.property(DEADLINE_PROPERTY).and_then(Value::as_f64);
        if current.is_some_and(|d| d <= candidate) {
            return;
        }
        ctx.set_property(DEADLINE_PROPERTY, Value::from(candidate));
    }

    /// Seconds left before the deadline, `None` when there is no deadline.
    pub fn remaining_time(&self) -> Option<f64> {
        let deadline = self
            .context
            .lock()
            .property(DEADLINE_PROPERTY)
            .and_then(Value::as_f64)?;
        Some(deadline - self.time.now())
    }

    // ── Discovery ───────────────────────────────────────────────────

    /// Resolve a node for `service`/`version`. Waits at most the smaller of
    /// the remaining deadline and the configured resolve cap.
    pub async fn resolve(&self, service: &str, version: &str) -> Result<Node> {
        let wait = match self.remaining_time() {
            Some(remaining) => remaining.min(self.resolve_cap),
            None => self.resolve_cap,
        }
        .max(0.0);
        let wait = Duration::try_from_secs_f64(wait).unwrap_or(Duration::MAX);

        let node = self
            .discovery
            .resolve(service, version, wait)
            .await?;

        if let Some(current) = self.interactions.lock().last_mut() {
            current.push(node.clone());
        }
        self.log(
            LogLevel::Info,
            "discovery",
            &format!("resolved {service} {version} -> {}", node.address),
        );
        Ok(node)
    }

    // ── Logging ─────────────────────────────────────────────────────

    pub fn trace(&self, category: &str, text: &str) {
        self.log(LogLevel::Trace, category, text);
    }

    pub fn debug(&self, category: &str, text: &str) {
        self.log(LogLevel::Debug, category, text);
    }

    pub fn info(&self, category: &str, text: &str) {
        self.log(LogLevel::Info, category, text);
    }

    pub fn warn(&self, category: &str, text: &str) {
        self.log(LogLevel::Warn, category, text);
    }

    pub fn error(&self, category: &str, text: &str) {
        self.log(LogLevel::Error, category, text);
    }

    pub fn critical(&self, category: &str, text: &str) {
        self.log(LogLevel::Critical, category, text);
    }

    /// Emit a log event stamped with this session's causal key.
    pub fn log(&self, level: LogLevel, category: &str, text: &str) {
        let key = {
            let mut ctx = self.context.lock();
            ctx.tick();
            ctx.key()
        };
        match level {
            LogLevel::Trace => tracing::trace!(context = %key, category, "{text}"),
            LogLevel::Debug => tracing::debug!(context = %key, category, "{text}"),
            LogLevel::Info => tracing::info!(context = %key, category, "{text}"),
            LogLevel::Warn => tracing::warn!(context = %key, category, "{text}"),
            LogLevel::Error => tracing::error!(context = %key, category, "{text}"),
            LogLevel::Critical => {
                tracing::error!(context = %key, category, critical = true, "{text}")
            }
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("context", &self.context_key())
            .field("interactions", &self.interaction_depth())
            .finish()
    }
}
