//! Cross-process session context and its wire encoding.
//!
//! A [`SharedContext`] carries a trace id, a vector of Lamport counters
//! (one level per nested unit of work) and free-form properties. Its JSON
//! form is the propagation token sent in the `X-MDK-Context` header.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use mdk_domain::error::{Error, Result};

/// Largest counter accepted from a token: the biggest integer a JSON
/// number round-trips exactly.
pub const MAX_COUNTER: u64 = (1 << 53) - 1;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Lamport clock
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Nested logical clock. The last element is the counter of the innermost
/// level; outer elements record where each level was entered.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LamportClock {
    clocks: Vec<u64>,
}

impl Default for LamportClock {
    fn default() -> Self {
        Self { clocks: vec![0] }
    }
}

impl LamportClock {
    /// Advance the innermost counter and return its new value.
    pub fn tick(&mut self) -> u64 {
        match self.clocks.last_mut() {
            Some(c) => {
                *c = c.saturating_add(1);
                *c
            }
            None => {
                self.clocks.push(1);
                1
            }
        }
    }

    /// Open a new innermost level starting at zero.
    pub fn enter(&mut self) {
        self.clocks.push(0);
    }

    /// Close the innermost level. The outermost level is never removed.
    pub fn leave(&mut self) {
        if self.clocks.len() > 1 {
            self.clocks.pop();
        }
    }

    pub fn depth(&self) -> usize {
        self.clocks.len()
    }

    /// Comma-joined counters, outermost first.
    pub fn key(&self) -> String {
        self.clocks
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Shared context
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedContext {
    trace_id: String,
    #[serde(default)]
    clock: LamportClock,
    #[serde(default)]
    properties: Map<String, Value>,
}

impl Default for SharedContext {
    fn default() -> Self {
        Self::new()
    }
}

impl SharedContext {
    /// A new context with a random trace id.
    pub fn new() -> Self {
        Self::with_origin(uuid::Uuid::new_v4().to_string())
    }

    /// A new context whose trace id is `origin`.
    pub fn with_origin(origin: impl Into<String>) -> Self {
        Self {
            trace_id: origin.into(),
            clock: LamportClock::default(),
            properties: Map::new(),
        }
    }

    pub fn trace_id(&self) -> &str {
        &self.trace_id
    }

    pub fn clock(&self) -> &LamportClock {
        &self.clock
    }

    pub fn tick(&mut self) -> u64 {
        self.clock.tick()
    }

    /// `"<trace id>:<clock key>"`, unique per event within a trace.
    pub fn key(&self) -> String {
        format!("{}:{}", self.trace_id, self.clock.key())
    }

    /// Start a nested unit of work. Ticks this context and returns a child
    /// whose clock has one more level.
    pub fn enter(&mut self) -> SharedContext {
        self.clock.tick();
        let mut child = self.clone();
        child.clock.enter();
        child
    }

    /// The context to continue with once this nested unit is done.
    pub fn leave(&self) -> SharedContext {
        let mut parent = self.clone();
        parent.clock.leave();
        parent.clock.tick();
        parent
    }

    pub fn property(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: Value) {
        self.properties.insert(key.into(), value);
    }

    /// Serialize to the propagation token.
    pub fn encode(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Parse a propagation token.
    pub fn decode(token: &str) -> Result<Self> {
        let ctx: SharedContext = serde_json::from_str(token)?;
        if ctx.trace_id.is_empty() {
            return Err(Error::InvalidContext("empty traceId".into()));
        }
        if ctx.clock.clocks.is_empty() {
            return Err(Error::InvalidContext("empty clock".into()));
        }
        if let Some(c) = ctx.clock.clocks.iter().find(|c| **c > MAX_COUNTER) {
            return Err(Error::InvalidContext(format!("clock counter {c} out of range")));
        }
        Ok(ctx)
    }
}
