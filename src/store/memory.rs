use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;
use k8s_openapi::api::{apps::v1::Deployment, core::v1::Service};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{Condition, Time};
use kube::api::ObjectMeta;
use kube::ResourceExt;

use crate::crd::hostproxy::Hostproxy;
use crate::error::{Error, Result};

use super::{ObjectKey, ObjectStore};

/// One mutation applied to a [`MemoryStore`], in the order it happened.
#[derive(Clone, Debug, PartialEq)]
pub enum StoreWrite {
    HostproxyCreated(ObjectKey),
    HostproxyUpdated(ObjectKey),
    /// Status write, with the condition list as persisted.
    HostproxyStatusUpdated(ObjectKey, Vec<Condition>),
    /// Deletion requested while finalizers were present.
    DeletionRequested(ObjectKey),
    /// Physically removed from the store.
    HostproxyDeleted(ObjectKey),
    DeploymentCreated(ObjectKey),
    DeploymentUpdated(ObjectKey),
    DeploymentDeleted(ObjectKey),
    ServiceCreated(ObjectKey),
    ServiceDeleted(ObjectKey),
}

impl StoreWrite {
    /// True for writes to a Deployment or Service.
    pub fn touches_dependents(&self) -> bool {
        matches!(
            self,
            Self::DeploymentCreated(_)
                | Self::DeploymentUpdated(_)
                | Self::DeploymentDeleted(_)
                | Self::ServiceCreated(_)
                | Self::ServiceDeleted(_)
        )
    }
}

#[derive(Default)]
struct State {
    hostproxies: BTreeMap<ObjectKey, Hostproxy>,
    deployments: BTreeMap<ObjectKey, Deployment>,
    services: BTreeMap<ObjectKey, Service>,
    version: u64,
    writes: Vec<StoreWrite>,
    deployment_update_failure: Option<String>,
    deployment_create_failure: Option<String>,
    service_create_failure: Option<String>,
    dependent_lookup_failure: Option<String>,
}

impl State {
    fn next_version(&mut self) -> String {
        self.version += 1;
        self.version.to_string()
    }

    /// Fill in the server-assigned metadata of a freshly created object.
    fn admit(&mut self, meta: &mut ObjectMeta) {
        let rv = self.next_version();
        meta.uid = Some(format!("uid-{rv}"));
        meta.resource_version = Some(rv);
        meta.generation = Some(1);
        meta.creation_timestamp = Some(Time(Utc::now()));
        meta.deletion_timestamp = None;
    }

    /// Remove every dependent owned by `uid`, as the garbage collector would.
    fn cascade(&mut self, uid: &str) {
        let owned = |meta: &ObjectMeta| {
            meta.owner_references
                .iter()
                .flatten()
                .any(|o| o.uid == uid)
        };

        let deployments: Vec<ObjectKey> = self
            .deployments
            .iter()
            .filter(|(_, d)| owned(&d.metadata))
            .map(|(k, _)| k.clone())
            .collect();
        for key in deployments {
            self.deployments.remove(&key);
            self.writes.push(StoreWrite::DeploymentDeleted(key));
        }

        let services: Vec<ObjectKey> = self
            .services
            .iter()
            .filter(|(_, s)| owned(&s.metadata))
            .map(|(k, _)| k.clone())
            .collect();
        for key in services {
            self.services.remove(&key);
            self.writes.push(StoreWrite::ServiceDeleted(key));
        }
    }

    fn remove_hostproxy(&mut self, key: &ObjectKey) {
        if let Some(hp) = self.hostproxies.remove(key) {
            self.writes.push(StoreWrite::HostproxyDeleted(key.clone()));
            if let Some(uid) = hp.metadata.uid.as_deref() {
                self.cascade(uid);
            }
        }
    }
}

/// Reject a write whose resourceVersion does not match the stored one.
/// A write without a resourceVersion is unconditional.
fn check_version(key: &ObjectKey, stored: &ObjectMeta, incoming: &ObjectMeta) -> Result<()> {
    match incoming.resource_version.as_deref() {
        Some(rv) if Some(rv) != stored.resource_version.as_deref() => Err(Error::conflict(
            format!(
                "{key}: the object has been modified; please apply your changes to the latest version and try again"
            ),
        )),
        _ => Ok(()),
    }
}

/// In-process [`ObjectStore`] with the API server semantics the reconciler
/// relies on: resource versions, finalizer-gated deletion and owner-reference
/// cascade. Every mutation is appended to a write log.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a Hostproxy the way a user would.
    pub fn create_hostproxy(&self, hostproxy: &Hostproxy) -> Result<Hostproxy> {
        let key = ObjectKey::of(hostproxy);
        let mut state = self.state();
        if state.hostproxies.contains_key(&key) {
            return Err(Error::conflict(format!("{key} already exists")));
        }
        let mut created = hostproxy.clone();
        state.admit(&mut created.metadata);
        created.status = None;
        state.hostproxies.insert(key.clone(), created.clone());
        state.writes.push(StoreWrite::HostproxyCreated(key));
        Ok(created)
    }

    pub fn hostproxy(&self, key: &ObjectKey) -> Option<Hostproxy> {
        self.state().hostproxies.get(key).cloned()
    }

    pub fn deployment(&self, key: &ObjectKey) -> Option<Deployment> {
        self.state().deployments.get(key).cloned()
    }

    pub fn service(&self, key: &ObjectKey) -> Option<Service> {
        self.state().services.get(key).cloned()
    }

    /// Every mutation since creation (or the last [`Self::clear_writes`]).
    pub fn writes(&self) -> Vec<StoreWrite> {
        self.state().writes.clone()
    }

    pub fn clear_writes(&self) {
        self.state().writes.clear();
    }

    /// Make every Deployment update fail with `message` until reset with `None`.
    pub fn fail_deployment_updates(&self, message: Option<&str>) {
        self.state().deployment_update_failure = message.map(str::to_string);
    }

    /// Make every Deployment create fail with `message` until reset with `None`.
    pub fn fail_deployment_creates(&self, message: Option<&str>) {
        self.state().deployment_create_failure = message.map(str::to_string);
    }

    /// Make every Service create fail with `message` until reset with `None`.
    pub fn fail_service_creates(&self, message: Option<&str>) {
        self.state().service_create_failure = message.map(str::to_string);
    }

    /// Make Deployment and Service reads fail with `message` until reset with
    /// `None`.
    pub fn fail_dependent_lookups(&self, message: Option<&str>) {
        self.state().dependent_lookup_failure = message.map(str::to_string);
    }

    fn lookup<T: Clone>(
        &self,
        pick: impl FnOnce(&State) -> Option<&T>,
    ) -> Result<Option<T>> {
        let state = self.state();
        if let Some(message) = state.dependent_lookup_failure.clone() {
            return Err(Error::reconcile(message));
        }
        Ok(pick(&state).cloned())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn get_hostproxy(&self, key: &ObjectKey) -> Result<Option<Hostproxy>> {
        Ok(self.hostproxy(key))
    }

    async fn update_hostproxy(&self, hostproxy: &Hostproxy) -> Result<Hostproxy> {
        let key = ObjectKey::of(hostproxy);
        let mut state = self.state();
        let stored = state
            .hostproxies
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::not_found(key.to_string()))?;
        check_version(&key, &stored.metadata, &hostproxy.metadata)?;

        let mut next = hostproxy.clone();
        next.status = stored.status.clone();
        next.metadata.uid = stored.metadata.uid.clone();
        next.metadata.creation_timestamp = stored.metadata.creation_timestamp.clone();
        next.metadata.deletion_timestamp = stored.metadata.deletion_timestamp.clone();
        let generation = stored.metadata.generation.unwrap_or(1);
        next.metadata.generation = Some(if next.spec != stored.spec {
            generation + 1
        } else {
            generation
        });
        next.metadata.resource_version = Some(state.next_version());
        state.writes.push(StoreWrite::HostproxyUpdated(key.clone()));

        if next.is_marked_for_deletion() && next.finalizers().is_empty() {
            state.remove_hostproxy(&key);
        } else {
            state.hostproxies.insert(key, next.clone());
        }
        Ok(next)
    }

    async fn update_hostproxy_status(&self, hostproxy: &Hostproxy) -> Result<Hostproxy> {
        let key = ObjectKey::of(hostproxy);
        let mut state = self.state();
        let mut next = state
            .hostproxies
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::not_found(key.to_string()))?;
        check_version(&key, &next.metadata, &hostproxy.metadata)?;

        next.status = hostproxy.status.clone();
        next.metadata.resource_version = Some(state.next_version());
        state.writes.push(StoreWrite::HostproxyStatusUpdated(
            key.clone(),
            next.conditions().to_vec(),
        ));
        state.hostproxies.insert(key, next.clone());
        Ok(next)
    }

    async fn delete_hostproxy(&self, key: &ObjectKey) -> Result<()> {
        let mut state = self.state();
        let stored = state
            .hostproxies
            .get(key)
            .cloned()
            .ok_or_else(|| Error::not_found(key.to_string()))?;

        if stored.finalizers().is_empty() {
            state.remove_hostproxy(key);
            return Ok(());
        }
        if !stored.is_marked_for_deletion() {
            let mut next = stored;
            next.metadata.deletion_timestamp = Some(Time(Utc::now()));
            next.metadata.resource_version = Some(state.next_version());
            state.hostproxies.insert(key.clone(), next);
            state.writes.push(StoreWrite::DeletionRequested(key.clone()));
        }
        Ok(())
    }

    async fn get_deployment(&self, key: &ObjectKey) -> Result<Option<Deployment>> {
        self.lookup(|state| state.deployments.get(key))
    }

    async fn create_deployment(&self, deployment: &Deployment) -> Result<Deployment> {
        let key = ObjectKey::of(deployment);
        let mut state = self.state();
        if let Some(message) = state.deployment_create_failure.clone() {
            return Err(Error::reconcile(message));
        }
        if state.deployments.contains_key(&key) {
            return Err(Error::conflict(format!("deployment {key} already exists")));
        }
        let mut created = deployment.clone();
        state.admit(&mut created.metadata);
        state.deployments.insert(key.clone(), created.clone());
        state.writes.push(StoreWrite::DeploymentCreated(key));
        Ok(created)
    }

    async fn update_deployment(&self, deployment: &Deployment) -> Result<Deployment> {
        let key = ObjectKey::of(deployment);
        let mut state = self.state();
        if let Some(message) = state.deployment_update_failure.clone() {
            return Err(Error::reconcile(message));
        }
        let stored = state
            .deployments
            .get(&key)
            .cloned()
            .ok_or_else(|| Error::not_found(format!("deployment {key}")))?;
        check_version(&key, &stored.metadata, &deployment.metadata)?;

        let mut next = deployment.clone();
        next.metadata.uid = stored.metadata.uid.clone();
        next.metadata.creation_timestamp = stored.metadata.creation_timestamp.clone();
        let generation = stored.metadata.generation.unwrap_or(1);
        next.metadata.generation = Some(if next.spec != stored.spec {
            generation + 1
        } else {
            generation
        });
        next.metadata.resource_version = Some(state.next_version());
        state.deployments.insert(key.clone(), next.clone());
        state.writes.push(StoreWrite::DeploymentUpdated(key));
        Ok(next)
    }

    async fn get_service(&self, key: &ObjectKey) -> Result<Option<Service>> {
        self.lookup(|state| state.services.get(key))
    }

    async fn create_service(&self, service: &Service) -> Result<Service> {
        let key = ObjectKey::of(service);
        let mut state = self.state();
        if let Some(message) = state.service_create_failure.clone() {
            return Err(Error::reconcile(message));
        }
        if state.services.contains_key(&key) {
            return Err(Error::conflict(format!("service {key} already exists")));
        }
        let mut created = service.clone();
        state.admit(&mut created.metadata);
        state.services.insert(key.clone(), created.clone());
        state.writes.push(StoreWrite::ServiceCreated(key));
        Ok(created)
    }
}
