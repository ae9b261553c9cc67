use super::common::*;
use hostproxy_operator::controller::conditions::{AVAILABLE, REASON_RECONCILING};
use hostproxy_operator::controller::helpers::{has_finalizer, FINALIZER};
use hostproxy_operator::error::Error;

const MESSAGE: &str = "Failed to create Deployment for the custom resource (test-hostproxy): \
     (Configuration error: Unable to find HOSTPROXY_IMAGE environment variable with the image)";

/// Without an image no Deployment can be built: every pass fails and says so
/// in `Available`, naming the resource.
#[tokio::test]
async fn every_pass_fails_without_image() {
    let t = TestContext::with_image(None);
    t.create_hostproxy();

    for _ in 0..3 {
        let err = t.reconcile().await.unwrap_err();
        assert!(matches!(err, Error::Config(_)), "unexpected error: {err}");
        assert_condition(t.condition(AVAILABLE).as_ref(), "False", REASON_RECONCILING, MESSAGE);
    }

    assert!(has_finalizer(&t.hostproxy(), FINALIZER));
    assert!(t.store.deployment(&t.key).is_none());
    assert!(t.store.service(&t.key).is_none());
    assert!(t.events.events().is_empty());
}

/// The failure condition is written once; repeated failures do not churn the
/// status.
#[tokio::test]
async fn failure_condition_is_not_rewritten() {
    let t = TestContext::with_image(None);
    t.create_hostproxy();
    let _ = t.reconcile().await;
    let rv = t.hostproxy().metadata.resource_version;

    t.store.clear_writes();
    let _ = t.reconcile().await;
    assert!(t.store.writes().is_empty());
    assert_eq!(t.hostproxy().metadata.resource_version, rv);
}
