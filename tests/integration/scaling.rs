use super::common::*;
use hostproxy_operator::controller::child_resources::deployment_replicas;
use hostproxy_operator::controller::conditions::{AVAILABLE, REASON_RECONCILING, REASON_RESIZING};
use hostproxy_operator::controller::pipeline::Outcome;
use hostproxy_operator::store::{ObjectStore, StoreWrite};

/// Set the stored Deployment's replica count, as a user scaling it would.
async fn scale_deployment(t: &TestContext, replicas: i32) {
    let mut dep = t.store.deployment(&t.key).expect("Deployment missing");
    dep.spec.get_or_insert_with(Default::default).replicas = Some(replicas);
    t.store.update_deployment(&dep).await.unwrap();
}

/// A Deployment scaled by hand is pinned back to one replica and the pass is
/// requeued immediately.
#[tokio::test]
async fn replicas_are_pinned_to_one() {
    let t = TestContext::new();
    t.create_hostproxy();
    t.reconcile_until_done().await;

    scale_deployment(&t, 3).await;
    t.store.clear_writes();

    assert_eq!(t.reconcile().await.unwrap(), Outcome::RequeueNow);
    assert_eq!(deployment_replicas(&t.store.deployment(&t.key).unwrap()), Some(1));
    assert_eq!(
        t.store.writes(),
        vec![StoreWrite::DeploymentUpdated(t.key.clone())]
    );

    // The follow-up pass finds everything in place and Available unchanged.
    assert_eq!(t.reconcile().await.unwrap(), Outcome::Done);
    assert_eq!(t.store.writes().len(), 1);
}

/// Zero replicas is corrected like any other value.
#[tokio::test]
async fn scaled_to_zero_is_corrected() {
    let t = TestContext::new();
    t.create_hostproxy();
    t.reconcile_until_done().await;

    scale_deployment(&t, 0).await;
    assert_eq!(t.reconcile().await.unwrap(), Outcome::RequeueNow);
    assert_eq!(deployment_replicas(&t.store.deployment(&t.key).unwrap()), Some(1));
}

/// A failed resize is reported as `Available=False/Resizing` and surfaced as
/// an error; the next successful pass restores `Available=True`.
#[tokio::test]
async fn failed_resize_reports_resizing() {
    let t = TestContext::new();
    t.create_hostproxy();
    t.reconcile_until_done().await;

    scale_deployment(&t, 2).await;
    t.store.fail_deployment_updates(Some("quota exceeded"));

    assert!(t.reconcile().await.is_err());
    assert_condition(
        t.condition(AVAILABLE).as_ref(),
        "False",
        REASON_RESIZING,
        "Failed to update the size for the custom resource (test-hostproxy): (Reconcile error: quota exceeded)",
    );

    t.store.fail_deployment_updates(None);
    let outcomes = t.reconcile_until_done().await;
    assert_eq!(outcomes, vec![Outcome::RequeueNow, Outcome::Done]);
    assert_eq!(t.condition(AVAILABLE).unwrap().status, "True");
    assert_eq!(t.condition(AVAILABLE).unwrap().reason, REASON_RECONCILING);
}
