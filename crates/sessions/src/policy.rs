//! Per-node failure policy: success/failure counters plus a circuit
//! breaker that takes a node out of rotation after repeated failures.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::Serialize;

use mdk_domain::config::FailurePolicyConfig;

use crate::time::TimeSource;

/// Counters reported by the `/resolve` endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PolicySnapshot {
    pub successes: u64,
    pub failures: u64,
}

#[derive(Debug, Default)]
struct BreakerState {
    successes: u64,
    failures: u64,
    consecutive_failures: u32,
    /// Set while the breaker is open.
    open_until: Option<f64>,
    /// When the current retest was handed out, while one is in flight.
    retest_started: Option<f64>,
}

pub struct FailurePolicy {
    address: String,
    threshold: u32,
    retest_delay: f64,
    time: Arc<dyn TimeSource>,
    state: Mutex<BreakerState>,
}

impl FailurePolicy {
    pub fn new(
        address: impl Into<String>,
        config: &FailurePolicyConfig,
        time: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            address: address.into(),
            threshold: config.threshold.max(1),
            retest_delay: config.retest_delay_secs.max(0.0),
            time,
            state: Mutex::new(BreakerState::default()),
        }
    }

    pub fn success(&self) {
        let mut st = self.state.lock();
        st.successes += 1;
        st.consecutive_failures = 0;
        st.retest_started = None;
        if st.open_until.take().is_some() {
            tracing::info!(address = %self.address, "circuit closed");
        }
    }

    pub fn failure(&self) {
        let mut st = self.state.lock();
        st.failures += 1;
        st.consecutive_failures = st.consecutive_failures.saturating_add(1);
        st.retest_started = None;
        if st.consecutive_failures >= self.threshold {
            let until = self.time.now() + self.retest_delay;
            st.open_until = Some(until);
            tracing::warn!(
                address = %self.address,
                consecutive_failures = st.consecutive_failures,
                retest_in_secs = self.retest_delay,
                "circuit opened"
            );
        }
    }

    /// Whether the node could be handed out right now. A tripped node is
    /// unavailable until the retest delay elapses, then available for a
    /// single retest until that retest reports back.
    pub fn available(&self) -> bool {
        let st = self.state.lock();
        self.admits(&st, self.time.now())
    }

    /// Claim the node for one request. Closed breakers always admit; a
    /// tripped one admits only the first caller after the retest delay.
    /// A retest that never reports back is released after another delay.
    pub fn try_acquire(&self) -> bool {
        let mut st = self.state.lock();
        let now = self.time.now();
        if !self.admits(&st, now) {
            return false;
        }
        if st.open_until.is_some() {
            st.retest_started = Some(now);
            tracing::debug!(address = %self.address, "circuit half-open, retesting");
        }
        true
    }

    fn admits(&self, st: &BreakerState, now: f64) -> bool {
        match st.open_until {
            None => true,
            Some(until) if now < until => false,
            Some(_) => match st.retest_started {
                Some(started) => now >= started + self.retest_delay,
                None => true,
            },
        }
    }

    pub fn successes(&self) -> u64 {
        self.state.lock().successes
    }

    pub fn failures(&self) -> u64 {
        self.state.lock().failures
    }

    pub fn snapshot(&self) -> PolicySnapshot {
        let st = self.state.lock();
        PolicySnapshot {
            successes: st.successes,
            failures: st.failures,
        }
    }
}

impl std::fmt::Debug for FailurePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FailurePolicy")
            .field("address", &self.address)
            .field("snapshot", &self.snapshot())
            .finish()
    }
}
