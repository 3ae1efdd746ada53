mod discovery;
mod observability;
mod server;
mod session;

pub use discovery::*;
pub use observability::*;
pub use server::*;
pub use session::*;

use serde::{Deserialize, Serialize};

// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━
// Top-level config
// ━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub failure_policy: FailurePolicyConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Config {
    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::Error;

        if let Some(t) = self.session.default_timeout {
            if !t.is_finite() || t <= 0.0 {
                return Err(Error::Config(format!(
                    "session.default_timeout must be a positive number of seconds, got {t}"
                )));
            }
        }
        let resolve = self.discovery.resolve_timeout_secs;
        if !(resolve > 0.0 && resolve <= MAX_RESOLVE_TIMEOUT_SECS) {
            return Err(Error::Config(format!(
                "discovery.resolve_timeout_secs must be within (0, {MAX_RESOLVE_TIMEOUT_SECS}], got {resolve}"
            )));
        }
        if self.failure_policy.threshold == 0 {
            return Err(Error::Config("failure_policy.threshold must be > 0".into()));
        }
        let retest = self.failure_policy.retest_delay_secs;
        if !retest.is_finite() || retest < 0.0 {
            return Err(Error::Config(format!(
                "failure_policy.retest_delay_secs must be a finite, non-negative number, got {retest}"
            )));
        }
        if !(0.0..=1.0).contains(&self.observability.sample_rate) {
            return Err(Error::Config(
                "observability.sample_rate must be within 0.0..=1.0".into(),
            ));
        }
        for node in &self.discovery.nodes {
            if node.service.is_empty() || node.address.is_empty() {
                return Err(Error::Config(
                    "discovery.nodes entries need a service and an address".into(),
                ));
            }
        }
        Ok(())
    }
}
