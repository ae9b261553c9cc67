use super::common::*;
use hostproxy_operator::controller::pipeline::Outcome;

/// Once converged, further passes change nothing.
#[tokio::test]
async fn steady_state_passes_write_nothing() {
    let t = TestContext::new();
    t.create_hostproxy();
    t.reconcile_until_done().await;

    let before = t.hostproxy();
    let deployment = t.store.deployment(&t.key);
    let service = t.store.service(&t.key);
    t.store.clear_writes();

    for _ in 0..3 {
        assert_eq!(t.reconcile().await.unwrap(), Outcome::Done);
    }

    assert!(t.store.writes().is_empty());
    assert_eq!(t.hostproxy(), before);
    assert_eq!(t.store.deployment(&t.key), deployment);
    assert_eq!(t.store.service(&t.key), service);
    assert_eq!(t.events.events().len(), 2, "only the two creation events");
}

/// Passes for one key never touch another Hostproxy's dependents.
#[tokio::test]
async fn keys_are_independent() {
    let t = TestContext::new();
    t.create_hostproxy();
    t.store.create_hostproxy(&test_hostproxy("other")).unwrap();

    t.reconcile_until_done().await;

    let other = hostproxy_operator::store::ObjectKey::new(NAMESPACE, "other");
    assert!(t.store.deployment(&other).is_none());
    assert!(t.store.hostproxy(&other).unwrap().conditions().is_empty());
}
