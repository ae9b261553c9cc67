use super::common::*;
use hostproxy_operator::controller::conditions::{AVAILABLE, REASON_RECONCILING};
use hostproxy_operator::controller::pipeline::{Outcome, CREATE_REQUEUE};
use hostproxy_operator::error::Error;
use hostproxy_operator::store::StoreWrite;

/// A rejected Deployment create is reported in `Available` and returned.
#[tokio::test]
async fn deployment_create_failure_is_reported() {
    let t = TestContext::new();
    t.create_hostproxy();
    t.store.fail_deployment_creates(Some("quota exceeded"));

    let err = t.reconcile().await.unwrap_err();
    assert!(matches!(err, Error::Reconcile(_)), "unexpected error: {err}");
    assert_condition(
        t.condition(AVAILABLE).as_ref(),
        "False",
        REASON_RECONCILING,
        "Failed to create Deployment for the custom resource (test-hostproxy): (Reconcile error: quota exceeded)",
    );
    assert!(t.store.deployment(&t.key).is_none());
    assert!(t.events.events().is_empty());

    t.store.fail_deployment_creates(None);
    t.reconcile_until_done().await;
    assert_eq!(t.condition(AVAILABLE).unwrap().status, "True");
}

/// A rejected Service create is reported in `Available` and returned; the
/// Deployment created earlier is left in place.
#[tokio::test]
async fn service_create_failure_is_reported() {
    let t = TestContext::new();
    t.create_hostproxy();
    assert_eq!(
        t.reconcile().await.unwrap(),
        Outcome::RequeueAfter(CREATE_REQUEUE)
    );

    t.store.fail_service_creates(Some("admission denied"));
    let err = t.reconcile().await.unwrap_err();
    assert!(matches!(err, Error::Reconcile(_)), "unexpected error: {err}");
    assert_condition(
        t.condition(AVAILABLE).as_ref(),
        "False",
        REASON_RECONCILING,
        "Failed to create Service for the custom resource (test-hostproxy): (Reconcile error: admission denied)",
    );
    assert!(t.store.deployment(&t.key).is_some());
    assert!(t.store.service(&t.key).is_none());

    t.store.fail_service_creates(None);
    let outcomes = t.reconcile_until_done().await;
    assert_eq!(
        outcomes,
        vec![Outcome::RequeueAfter(CREATE_REQUEUE), Outcome::Done]
    );
    assert!(t.store.service(&t.key).is_some());
    assert_eq!(t.condition(AVAILABLE).unwrap().status, "True");
}

/// A failed dependent lookup propagates without touching status or
/// dependents.
#[tokio::test]
async fn dependent_lookup_failure_propagates() {
    let t = TestContext::new();
    t.create_hostproxy();
    t.reconcile_until_done().await;
    let before = t.hostproxy();

    t.store.fail_dependent_lookups(Some("connection reset"));
    t.store.clear_writes();

    let err = t.reconcile().await.unwrap_err();
    assert_eq!(err.to_string(), "Reconcile error: connection reset");
    assert!(t.store.writes().is_empty());
    assert_eq!(t.hostproxy(), before);

    t.store.fail_dependent_lookups(None);
    assert_eq!(t.reconcile().await.unwrap(), Outcome::Done);
    assert!(!t.store.writes().iter().any(StoreWrite::touches_dependents));
}

/// A lookup failure before the Deployment exists creates nothing.
#[tokio::test]
async fn lookup_failure_creates_nothing() {
    let t = TestContext::new();
    t.create_hostproxy();
    t.store.fail_dependent_lookups(Some("timeout"));

    assert!(t.reconcile().await.is_err());
    assert!(t.store.deployment(&t.key).is_none());
    assert!(!t.store.writes().iter().any(StoreWrite::touches_dependents));
}
