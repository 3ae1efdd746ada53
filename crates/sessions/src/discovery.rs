//! In-memory service discovery.
//!
//! Nodes are grouped into clusters by service name. `resolve` hands out
//! compatible, available nodes round-robin and waits (bounded) when none
//! is usable yet.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::Notify;

use mdk_domain::config::FailurePolicyConfig;
use mdk_domain::error::{Error, Result};
use mdk_domain::node::Node;

use crate::policy::FailurePolicy;
use crate::time::TimeSource;

/// How often a waiting `resolve` re-checks breakers that may have reopened.
const RECHECK_INTERVAL: Duration = Duration::from_millis(250);
/// Longest wait `resolve` honours; longer requests are clamped.
const MAX_WAIT: Duration = Duration::from_secs(86_400);

#[derive(Default)]
struct Cluster {
    nodes: Vec<Node>,
    next: usize,
}

pub struct Discovery {
    clusters: RwLock<HashMap<String, Cluster>>,
    /// Keyed by node address.
    policies: RwLock<HashMap<String, Arc<FailurePolicy>>>,
    policy_config: FailurePolicyConfig,
    time: Arc<dyn TimeSource>,
    changed: Notify,
    closed: AtomicBool,
}

impl Discovery {
    pub fn new(policy_config: FailurePolicyConfig, time: Arc<dyn TimeSource>) -> Self {
        Self {
            clusters: RwLock::new(HashMap::new()),
            policies: RwLock::new(HashMap::new()),
            policy_config,
            time,
            changed: Notify::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// Register a node. Replaces any node of the same service with the same
    /// address.
    pub fn add_node(&self, node: Node) {
        {
            let mut clusters = self.clusters.write();
            let cluster = clusters.entry(node.service.clone()).or_default();
            tracing::debug!(
                service = %node.service,
                version = %node.version,
                address = %node.address,
                "node active"
            );
            match cluster.nodes.iter_mut().find(|n| n.address == node.address) {
                Some(existing) => *existing = node,
                None => cluster.nodes.push(node),
            }
        }
        self.changed.notify_waiters();
    }

    /// Replace every node of `service` at once.
    pub fn replace_cluster(&self, service: &str, nodes: Vec<Node>) {
        {
            let mut clusters = self.clusters.write();
            tracing::debug!(service = %service, nodes = nodes.len(), "cluster replaced");
            clusters.insert(service.to_owned(), Cluster { nodes, next: 0 });
        }
        self.changed.notify_waiters();
    }

    /// Remove a node. Returns whether it was registered.
    pub fn remove_node(&self, service: &str, address: &str) -> bool {
        let mut clusters = self.clusters.write();
        let Some(cluster) = clusters.get_mut(service) else {
            return false;
        };
        let before = cluster.nodes.len();
        cluster.nodes.retain(|n| n.address != address);
        let removed = cluster.nodes.len() != before;
        if removed {
            tracing::debug!(service = %service, address = %address, "node expired");
        }
        removed
    }

    /// Nodes currently registered for `service`.
    pub fn nodes(&self, service: &str) -> Vec<Node> {
        self.clusters
            .read()
            .get(service)
            .map(|c| c.nodes.clone())
            .unwrap_or_default()
    }

    /// The failure policy for `node`, created on first use.
    pub fn failure_policy(&self, node: &Node) -> Arc<FailurePolicy> {
        if let Some(p) = self.policies.read().get(&node.address) {
            return p.clone();
        }
        self.policies
            .write()
            .entry(node.address.clone())
            .or_insert_with(|| {
                Arc::new(FailurePolicy::new(
                    node.address.clone(),
                    &self.policy_config,
                    self.time.clone(),
                ))
            })
            .clone()
    }

    /// Pick the next usable node without waiting.
    pub fn choose(&self, service: &str, version: &str) -> Option<Node> {
        let mut clusters = self.clusters.write();
        let cluster = clusters.get_mut(service)?;
        let len = cluster.nodes.len();
        for offset in 0..len {
            let idx = (cluster.next + offset) % len;
            let node = &cluster.nodes[idx];
            if node.satisfies(version) && self.failure_policy(node).try_acquire() {
                let chosen = node.clone();
                cluster.next = idx + 1;
                return Some(chosen);
            }
        }
        None
    }

    /// Resolve a node for `service`/`version`, waiting up to `wait` for one
    /// to be registered or for a tripped breaker to allow a retest.
    pub async fn resolve(&self, service: &str, version: &str, wait: Duration) -> Result<Node> {
        let wait = wait.min(MAX_WAIT);
        let deadline = tokio::time::Instant::now() + wait;
        loop {
            // Register interest before checking so a concurrent `add_node`
            // between the check and the wait is not missed.
            let notified = self.changed.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if self.closed.load(Ordering::Acquire) {
                return Err(Error::Stopped);
            }
            if let Some(node) = self.choose(service, version) {
                return Ok(node);
            }

            let now = tokio::time::Instant::now();
            if now >= deadline {
                tracing::warn!(
                    service = %service,
                    version = %version,
                    waited_ms = wait.as_millis() as u64,
                    "no node available"
                );
                return Err(Error::Timeout(format!(
                    "no node available for {service} {version}"
                )));
            }
            let tick = RECHECK_INTERVAL.min(deadline - now);
            tokio::select! {
                _ = &mut notified => {}
                _ = tokio::time::sleep(tick) => {}
            }
        }
    }

    /// Fail every pending and future `resolve` with [`Error::Stopped`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
        self.changed.notify_waiters();
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time::ManualTime;

    fn discovery() -> Discovery {
        Discovery::new(
            FailurePolicyConfig {
                threshold: 1,
                retest_delay_secs: 30.0,
            },
            Arc::new(ManualTime::default()),
        )
    }

    #[test]
    fn choose_round_robins() {
        let d = discovery();
        d.replace_cluster(
            "service1",
            vec![
                Node::new("service1", "1.0", "a1"),
                Node::new("service1", "1.0", "a2"),
            ],
        );
        let picks: Vec<String> = (0..4)
            .map(|_| d.choose("service1", "1.0").unwrap().address)
            .collect();
        assert_eq!(picks, vec!["a1", "a2", "a1", "a2"]);
    }

    #[test]
    fn choose_skips_incompatible_versions() {
        let d = discovery();
        d.add_node(Node::new("service1", "2.0", "new"));
        d.add_node(Node::new("service1", "1.3", "old"));
        assert_eq!(d.choose("service1", "1.0").unwrap().address, "old");
        assert_eq!(d.choose("service1", "2.0").unwrap().address, "new");
        assert!(d.choose("service1", "3.0").is_none());
        assert!(d.choose("service2", "1.0").is_none());
    }

    #[test]
    fn choose_skips_tripped_nodes() {
        let d = discovery();
        let bad = Node::new("service1", "1.0", "bad");
        d.add_node(bad.clone());
        d.add_node(Node::new("service1", "1.0", "good"));
        d.failure_policy(&bad).failure();
        for _ in 0..3 {
            assert_eq!(d.choose("service1", "1.0").unwrap().address, "good");
        }
    }

    #[test]
    fn tripped_node_gets_a_single_retest() {
        let time = Arc::new(ManualTime::default());
        let d = Discovery::new(
            FailurePolicyConfig {
                threshold: 1,
                retest_delay_secs: 5.0,
            },
            time.clone(),
        );
        let bad = Node::new("service1", "1.0", "bad");
        d.add_node(bad.clone());
        d.failure_policy(&bad).failure();
        assert!(d.choose("service1", "1.0").is_none());

        time.advance(6.0);
        let picks: Vec<Option<String>> = (0..3)
            .map(|_| d.choose("service1", "1.0").map(|n| n.address))
            .collect();
        assert_eq!(picks, vec![Some("bad".to_string()), None, None]);

        d.failure_policy(&bad).success();
        assert_eq!(d.choose("service1", "1.0").unwrap().address, "bad");
        assert_eq!(d.choose("service1", "1.0").unwrap().address, "bad");
    }

    #[test]
    fn add_node_replaces_same_address() {
        let d = discovery();
        d.add_node(Node::new("service1", "1.0", "a1"));
        d.add_node(Node::new("service1", "1.1", "a1"));
        let nodes = d.nodes("service1");
        assert_eq!(nodes.len(), 1);
        assert_eq!(nodes[0].version, "1.1");
        assert!(d.remove_node("service1", "a1"));
        assert!(!d.remove_node("service1", "a1"));
        assert!(d.nodes("service1").is_empty());
    }

    #[test]
    fn policies_are_shared_per_address() {
        let d = discovery();
        let node = Node::new("service1", "1.0", "a1");
        d.failure_policy(&node).success();
        assert_eq!(d.failure_policy(&node).successes(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn resolve_times_out_after_wait() {
        let d = discovery();
        let start = tokio::time::Instant::now();
        let err = d
            .resolve("unknown", "1.0", Duration::from_secs(3))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Timeout(_)));
        assert_eq!(start.elapsed().as_secs(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn resolve_wakes_when_node_arrives() {
        let d = Arc::new(discovery());
        let d2 = d.clone();
        let waiter = tokio::spawn(async move {
            d2.resolve("service1", "1.0", Duration::from_secs(10)).await
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        d.add_node(Node::new("service1", "1.0", "late"));
        let node = waiter.await.unwrap().unwrap();
        assert_eq!(node.address, "late");
    }

    #[tokio::test(start_paused = true)]
    async fn resolve_accepts_unbounded_wait() {
        let d = discovery();
        d.add_node(Node::new("service1", "1.0", "a1"));
        let node = d
            .resolve("service1", "1.0", Duration::MAX)
            .await
            .unwrap();
        assert_eq!(node.address, "a1");
    }

    #[tokio::test(start_paused = true)]
    async fn close_fails_pending_resolves() {
        let d = Arc::new(discovery());
        let d2 = d.clone();
        let waiter = tokio::spawn(async move {
            d2.resolve("service1", "1.0", Duration::from_secs(10)).await
        });
        tokio::time::sleep(Duration::from_millis(100)).await;
        d.close();
        assert!(matches!(waiter.await.unwrap(), Err(Error::Stopped)));
        assert!(d.is_closed());
    }
}
