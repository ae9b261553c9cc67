use super::common::*;
use hostproxy_operator::controller::child_resources::{deployment_replicas, PORTS_ENV};
use hostproxy_operator::controller::conditions::{AVAILABLE, REASON_RECONCILING};
use hostproxy_operator::controller::pipeline::{Outcome, CREATE_REQUEUE};
use hostproxy_operator::notify::EventSeverity;
use hostproxy_operator::store::StoreWrite;

/// Deployment first, then Service, each followed by the create delay, then
/// steady state.
#[tokio::test]
async fn converges_in_order() {
    let t = TestContext::new();
    t.create_hostproxy();

    let outcomes = t.reconcile_until_done().await;
    assert_eq!(
        outcomes,
        vec![
            Outcome::RequeueAfter(CREATE_REQUEUE),
            Outcome::RequeueAfter(CREATE_REQUEUE),
            Outcome::Done,
        ]
    );

    let created: Vec<StoreWrite> = t
        .store
        .writes()
        .into_iter()
        .filter(StoreWrite::touches_dependents)
        .collect();
    assert_eq!(
        created,
        vec![
            StoreWrite::DeploymentCreated(t.key.clone()),
            StoreWrite::ServiceCreated(t.key.clone()),
        ]
    );

    assert_condition(
        t.condition(AVAILABLE).as_ref(),
        "True",
        REASON_RECONCILING,
        "Deployment for custom resource (test-hostproxy) with 1 replicas created successfully",
    );
}

/// Dependents are owned by the Hostproxy and carry its port mapping.
#[tokio::test]
async fn dependents_are_owned_and_configured() {
    let t = TestContext::new();
    let hp = t.create_hostproxy();
    t.reconcile_until_done().await;

    let dep = t.store.deployment(&t.key).expect("Deployment missing");
    let owner = &dep.metadata.owner_references.as_ref().unwrap()[0];
    assert_eq!(owner.uid, hp.metadata.uid.clone().unwrap());
    assert_eq!(deployment_replicas(&dep), Some(1));
    let pod = dep.spec.unwrap().template.spec.unwrap();
    let ports = pod.containers[0]
        .env
        .iter()
        .flatten()
        .find(|e| e.name == PORTS_ENV)
        .and_then(|e| e.value.clone());
    assert_eq!(ports.as_deref(), Some("80:10541"));

    let svc = t.store.service(&t.key).expect("Service missing");
    assert_eq!(svc.spec.unwrap().cluster_ip.as_deref(), Some("None"));
    assert_eq!(
        svc.metadata.owner_references.unwrap()[0].uid,
        hp.metadata.uid.unwrap()
    );
}

/// Each created dependent is announced with a Normal event.
#[tokio::test]
async fn creation_events_are_recorded() {
    let t = TestContext::new();
    t.create_hostproxy();
    t.reconcile_until_done().await;

    let events = t.events.events();
    assert_eq!(events.len(), 2);
    assert!(events.iter().all(|e| e.severity == EventSeverity::Normal));
    assert!(events.iter().all(|e| e.reason == "Created" && e.subject == t.key));
    assert_eq!(events[0].message, "Created Deployment test-hostproxy");
    assert_eq!(events[1].message, "Created Service test-hostproxy");
}
