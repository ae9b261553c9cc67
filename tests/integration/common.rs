//! Shared test harness and helpers for the integration tests.
//!
//! Every test builds its own `MemoryStore` and `RecordingNotifier`, so tests
//! are isolated and run in parallel.  There is no controller loop: tests call
//! `reconcile_key` directly and act as the runtime, which makes every pass
//! and its outcome observable.

use std::sync::{Arc, Once};
use std::time::Duration;

use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition;
use kube::api::ObjectMeta;
use tracing_subscriber::EnvFilter;

use hostproxy_operator::controller::conditions::find_condition;
use hostproxy_operator::controller::hostproxy::{reconcile_key, Context};
use hostproxy_operator::controller::pipeline::Outcome;
use hostproxy_operator::crd::hostproxy::{Hostproxy, HostproxySpec};
use hostproxy_operator::error::Result;
use hostproxy_operator::helpers::OperatorConfig;
use hostproxy_operator::notify::RecordingNotifier;
use hostproxy_operator::store::{MemoryStore, ObjectKey};

pub const NAMESPACE: &str = "default";
pub const NAME: &str = "test-hostproxy";
pub const IMAGE: &str = "example.com/image:test";
pub const HOST_PORT: i32 = 10541;
pub const CLUSTER_PORT: i32 = 80;

/// Upper bound on passes in `reconcile_until_done`; convergence takes five.
const MAX_PASSES: usize = 10;

static TRACING: Once = Once::new();

fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::new("warn,hostproxy_operator=debug"))
            .with_test_writer()
            .try_init();
    });
}

/// Per-test harness: store, event sink and the reconcile context using both.
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub events: Arc<RecordingNotifier>,
    pub ctx: Context,
    pub key: ObjectKey,
}

impl TestContext {
    /// Harness with the proxy image configured.
    pub fn new() -> Self {
        Self::with_image(Some(IMAGE))
    }

    pub fn with_image(image: Option<&str>) -> Self {
        init_tracing();
        let store = Arc::new(MemoryStore::new());
        let events = Arc::new(RecordingNotifier::new());
        let config = OperatorConfig {
            hostproxy_image: image.map(str::to_string),
            error_requeue: Duration::from_secs(30),
        };
        let ctx = Context::new(store.clone(), events.clone(), config);
        Self {
            store,
            events,
            ctx,
            key: ObjectKey::new(NAMESPACE, NAME),
        }
    }

    /// Create the standard test Hostproxy the way `kubectl apply` would.
    pub fn create_hostproxy(&self) -> Hostproxy {
        self.store
            .create_hostproxy(&test_hostproxy(NAME))
            .expect("failed to create Hostproxy")
    }

    pub async fn reconcile(&self) -> Result<Outcome> {
        reconcile_key(&self.key, &self.ctx).await
    }

    /// Run passes until one finishes with `Outcome::Done`, returning the
    /// outcomes of every pass in order.  Panics on error or non-convergence.
    pub async fn reconcile_until_done(&self) -> Vec<Outcome> {
        let mut outcomes = Vec::new();
        for _ in 0..MAX_PASSES {
            let outcome = self.reconcile().await.expect("reconcile failed");
            outcomes.push(outcome);
            if outcome == Outcome::Done {
                return outcomes;
            }
        }
        panic!("no convergence after {MAX_PASSES} passes: {outcomes:?}");
    }

    pub fn hostproxy(&self) -> Hostproxy {
        self.store.hostproxy(&self.key).expect("Hostproxy not found")
    }

    pub fn condition(&self, type_: &str) -> Option<Condition> {
        find_condition(self.hostproxy().conditions(), type_).cloned()
    }
}

pub fn test_hostproxy(name: &str) -> Hostproxy {
    Hostproxy {
        metadata: ObjectMeta {
            name: Some(name.to_string()),
            namespace: Some(NAMESPACE.to_string()),
            ..Default::default()
        },
        spec: HostproxySpec {
            host_port: HOST_PORT,
            cluster_port: CLUSTER_PORT,
        },
        status: None,
    }
}

/// Assert a condition's status, reason and message in one go.
pub fn assert_condition(condition: Option<&Condition>, status: &str, reason: &str, message: &str) {
    let c = condition.expect("condition missing");
    assert_eq!(c.status, status, "status of {}", c.type_);
    assert_eq!(c.reason, reason, "reason of {}", c.type_);
    assert_eq!(c.message, message, "message of {}", c.type_);
}
