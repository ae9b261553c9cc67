//! Diagnostic events attached to a Hostproxy.
//!
//! Publishing is best-effort: failures are logged and never reach the
//! reconcile pipeline.

use std::sync::{Mutex, PoisonError};

use async_trait::async_trait;
use k8s_openapi::api::core::v1::ObjectReference;
use kube::runtime::events::{Event as KubeEvent, EventType, Recorder, Reporter};
use kube::{Client, Resource, ResourceExt};
use tracing::warn;

use crate::crd::hostproxy::Hostproxy;
use crate::store::ObjectKey;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EventSeverity {
    Normal,
    Warning,
}

impl From<EventSeverity> for EventType {
    fn from(severity: EventSeverity) -> Self {
        match severity {
            EventSeverity::Normal => EventType::Normal,
            EventSeverity::Warning => EventType::Warning,
        }
    }
}

/// Fire-and-forget event sink.
#[async_trait]
pub trait EventNotifier: Send + Sync {
    async fn record(
        &self,
        hostproxy: &Hostproxy,
        severity: EventSeverity,
        reason: &str,
        message: String,
    );
}

/// Build an ObjectReference from any kube Resource.
pub fn kube_object_ref<K: Resource<DynamicType = ()>>(obj: &K) -> ObjectReference {
    ObjectReference {
        api_version: Some(K::api_version(&()).to_string()),
        kind: Some(K::kind(&()).to_string()),
        name: Some(obj.name_any()),
        namespace: obj.namespace(),
        uid: obj.meta().uid.clone(),
        resource_version: obj.meta().resource_version.clone(),
        ..Default::default()
    }
}

/// Publishes Kubernetes events through the kube-rs recorder.
pub struct KubeEventNotifier {
    client: Client,
    reporter: Reporter,
}

impl KubeEventNotifier {
    pub fn new(client: Client, reporter: Reporter) -> Self {
        Self { client, reporter }
    }
}

#[async_trait]
impl EventNotifier for KubeEventNotifier {
    async fn record(
        &self,
        hostproxy: &Hostproxy,
        severity: EventSeverity,
        reason: &str,
        message: String,
    ) {
        let rec = Recorder::new(self.client.clone(), self.reporter.clone());
        let oref = kube_object_ref(hostproxy);
        if let Err(e) = rec
            .publish(
                &KubeEvent {
                    type_: severity.into(),
                    reason: reason.to_string(),
                    note: Some(message),
                    action: "Reconcile".to_string(),
                    secondary: None,
                },
                &oref,
            )
            .await
        {
            warn!(%e, "failed to publish event");
        }
    }
}

/// An event captured by [`RecordingNotifier`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecordedEvent {
    pub subject: ObjectKey,
    pub severity: EventSeverity,
    pub reason: String,
    pub message: String,
}

/// Keeps events in memory instead of publishing them.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<RecordedEvent>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl EventNotifier for RecordingNotifier {
    async fn record(
        &self,
        hostproxy: &Hostproxy,
        severity: EventSeverity,
        reason: &str,
        message: String,
    ) {
        self.events
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedEvent {
                subject: ObjectKey::of(hostproxy),
                severity,
                reason: reason.to_string(),
                message,
            });
    }
}
