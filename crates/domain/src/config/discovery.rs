use serde::{Deserialize, Serialize};

use crate::node::Node;

/// Largest accepted `resolve_timeout_secs` (one hour).
pub const MAX_RESOLVE_TIMEOUT_SECS: f64 = 3600.0;

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Discovery
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

/// Static discovery source: the nodes registered when the client starts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Upper bound on how long `resolve` waits for a usable node, even when
    /// the session deadline is further away.
    #[serde(default = "d_resolve_timeout")]
    pub resolve_timeout_secs: f64,

    #[serde(default)]
    pub nodes: Vec<Node>,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            resolve_timeout_secs: d_resolve_timeout(),
            nodes: Vec::new(),
        }
    }
}

fn d_resolve_timeout() -> f64 {
    10.0
}

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Failure policy (circuit breaker)
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailurePolicyConfig {
    /// Consecutive failures before a node is taken out of rotation.
    #[serde(default = "d_threshold")]
    pub threshold: u32,

    /// Seconds a tripped node stays out of rotation before a single retest
    /// request is let through.
    #[serde(default = "d_retest_delay")]
    pub retest_delay_secs: f64,
}

impl Default for FailurePolicyConfig {
    fn default() -> Self {
        Self {
            threshold: d_threshold(),
            retest_delay_secs: d_retest_delay(),
        }
    }
}

fn d_threshold() -> u32 {
    3
}
fn d_retest_delay() -> f64 {
    30.0
}
