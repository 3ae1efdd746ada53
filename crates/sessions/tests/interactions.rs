//! Interaction bookkeeping against discovery failure policies.

use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

use mdk_domain::config::Config;
use mdk_domain::node::Node;
use mdk_sessions::{ManualTime, Mdk, PolicySnapshot, Session};

struct Env {
    mdk: Mdk,
    session: Arc<Session>,
}

fn env() -> Env {
    let mdk = Mdk::with_time_source(&Config::default(), Arc::new(ManualTime::default()));
    mdk.start();
    let disco = mdk.discovery();
    disco.replace_cluster(
        "service1",
        vec![
            Node::new("service1", "1.0", "a1"),
            Node::new("service1", "1.0", "a2"),
        ],
    );
    disco.replace_cluster(
        "service2",
        vec![
            Node::new("service2", "1.0", "b1"),
            Node::new("service2", "1.0", "b2"),
        ],
    );
    let session = mdk.session();
    Env { mdk, session }
}

impl Env {
    fn counts(&self, address: &str) -> (u64, u64) {
        let node = Node::new("", "", address);
        let PolicySnapshot {
            successes,
            failures,
        } = self.mdk.discovery().failure_policy(&node).snapshot();
        (successes, failures)
    }

    fn untouched_except(&self, touched: &[&str]) {
        for addr in ["a1", "a2", "b1", "b2"] {
            if !touched.contains(&addr) {
                assert_eq!(self.counts(addr), (0, 0), "{addr} should be untouched");
            }
        }
    }
}

#[tokio::test]
async fn successful_interaction_marks_resolved_nodes_succeeded() {
    let env = env();
    env.session.start_interaction();
    let node = env.session.resolve("service1", "1.0").await.unwrap();
    let another = env.session.resolve("service2", "1.0").await.unwrap();
    env.session.finish_interaction();

    assert_eq!(env.counts(&node.address), (1, 0));
    assert_eq!(env.counts(&another.address), (1, 0));
    env.untouched_except(&[&node.address, &another.address]);
}

#[tokio::test]
async fn failed_interaction_marks_resolved_nodes_failed() {
    let env = env();
    env.session.start_interaction();
    let node = env.session.resolve("service1", "1.0").await.unwrap();
    let another = env.session.resolve("service2", "1.0").await.unwrap();
    env.session.fail_interaction("OHNO");
    env.session.finish_interaction();

    assert_eq!(env.counts(&node.address), (0, 1));
    assert_eq!(env.counts(&another.address), (0, 1));
    env.untouched_except(&[&node.address, &another.address]);
}

#[tokio::test]
async fn nodes_resolved_after_failure_succeed_at_finish() {
    let env = env();
    env.session.start_interaction();
    let node = env.session.resolve("service1", "1.0").await.unwrap();
    env.session.fail_interaction("OHNO");
    let another = env.session.resolve("service2", "1.0").await.unwrap();
    env.session.finish_interaction();

    assert_eq!(env.counts(&node.address), (0, 1));
    assert_eq!(env.counts(&another.address), (1, 0));
    env.untouched_except(&[&node.address, &another.address]);
}

#[tokio::test]
async fn each_new_interaction_records_fresh_results() {
    let env = env();
    env.session.start_interaction();
    let node = env.session.resolve("service1", "1.0").await.unwrap();
    env.session.fail_interaction("OHNO");
    env.session.finish_interaction();

    env.session.start_interaction();
    loop {
        let again = env.session.resolve("service1", "1.0").await.unwrap();
        if again.address == node.address {
            break;
        }
    }
    env.session.finish_interaction();

    assert_eq!(env.counts(&node.address), (1, 1));
}

/// A tree of interactions: each level resolves its own services, may fail,
/// and may contain nested interactions.
struct Step {
    services: Vec<&'static str>,
    fails: bool,
    children: Vec<Step>,
}

fn run<'a>(
    env: &'a Env,
    step: &'a Step,
    expected: &'a RefCell<HashMap<String, (u64, u64)>>,
) -> std::pin::Pin<Box<dyn std::future::Future<Output = ()> + 'a>> {
    Box::pin(async move {
        env.session.start_interaction();
        for service in &step.services {
            env.mdk
                .discovery()
                .add_node(Node::new(*service, "1.0", *service));
            env.session.resolve(service, "1.0").await.unwrap();
            let mut expected = expected.borrow_mut();
            let entry = expected.entry(service.to_string()).or_default();
            if step.fails {
                entry.1 += 1;
            } else {
                entry.0 += 1;
            }
        }
        for child in &step.children {
            run(env, child, expected).await;
        }
        if step.fails {
            env.session.fail_interaction("OHNO");
        }
        env.session.finish_interaction();
    })
}

#[tokio::test]
async fn nested_interactions_are_independent() {
    let env = env();
    let tree = Step {
        services: vec!["a", "b"],
        fails: false,
        children: vec![
            Step {
                services: vec!["a", "c"],
                fails: true,
                children: vec![Step {
                    services: vec!["d"],
                    fails: false,
                    children: vec![],
                }],
            },
            Step {
                services: vec!["b"],
                fails: true,
                children: vec![],
            },
        ],
    };
    let expected = RefCell::new(HashMap::new());
    run(&env, &tree, &expected).await;

    assert_eq!(env.session.interaction_depth(), 0);
    for (address, counts) in expected.into_inner() {
        assert_eq!(env.counts(&address), counts, "node {address}");
    }
}

#[tokio::test(start_paused = true)]
async fn resolve_caps_wait_at_ten_seconds() {
    let env = env();
    env.session.set_deadline(20.0);
    let start = tokio::time::Instant::now();
    assert!(env.session.resolve("unknown", "1.0").await.is_err());
    assert_eq!(start.elapsed().as_secs(), 10);
}

#[tokio::test(start_paused = true)]
async fn resolve_honours_a_lower_deadline() {
    let env = env();
    env.session.set_deadline(3.0);
    let start = tokio::time::Instant::now();
    assert!(env.session.resolve("unknown", "1.0").await.is_err());
    assert_eq!(start.elapsed().as_secs(), 3);
}

#[tokio::test(start_paused = true)]
async fn unbounded_resolve_cap_does_not_panic() {
    let mut config = Config::default();
    config.discovery.resolve_timeout_secs = f64::INFINITY;
    config
        .discovery
        .nodes
        .push(Node::new("service1", "1.0", "a1"));
    let mdk = Mdk::with_time_source(&config, Arc::new(ManualTime::default()));
    mdk.start();
    let node = mdk.session().resolve("service1", "1.0").await.unwrap();
    assert_eq!(node.address, "a1");
}
