//! Object store seam between the reconciler and the cluster.
//!
//! The reconciler only ever talks to an [`ObjectStore`]: `KubeStore` in
//! production, `MemoryStore` in tests. Every write returns the object at its
//! new resourceVersion so callers can keep working on the latest copy.

use std::fmt;

use async_trait::async_trait;
use k8s_openapi::api::{apps::v1::Deployment, core::v1::Service};
use kube::{Resource, ResourceExt};

use crate::crd::hostproxy::Hostproxy;
use crate::error::Result;

mod api;
mod memory;

pub use api::KubeStore;
pub use memory::{MemoryStore, StoreWrite};

/// Namespace-qualified name identifying an object.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ObjectKey {
    pub namespace: String,
    pub name: String,
}

impl ObjectKey {
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Key of any namespaced kube object.
    pub fn of<K: Resource>(obj: &K) -> Self {
        Self {
            namespace: obj.namespace().unwrap_or_default(),
            name: obj.name_any(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Get/create/update/delete by key, with optimistic concurrency on updates.
///
/// `get_*` returns `Ok(None)` for a missing object; any other failure is an
/// error. Updates carrying a stale resourceVersion fail with a conflict.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get_hostproxy(&self, key: &ObjectKey) -> Result<Option<Hostproxy>>;

    /// Replace metadata and spec. Status is left untouched.
    async fn update_hostproxy(&self, hostproxy: &Hostproxy) -> Result<Hostproxy>;

    /// Replace the status subresource only.
    async fn update_hostproxy_status(&self, hostproxy: &Hostproxy) -> Result<Hostproxy>;

    async fn delete_hostproxy(&self, key: &ObjectKey) -> Result<()>;

    async fn get_deployment(&self, key: &ObjectKey) -> Result<Option<Deployment>>;

    async fn create_deployment(&self, deployment: &Deployment) -> Result<Deployment>;

    async fn update_deployment(&self, deployment: &Deployment) -> Result<Deployment>;

    async fn get_service(&self, key: &ObjectKey) -> Result<Option<Service>>;

    async fn create_service(&self, service: &Service) -> Result<Service>;
}
