//! Shared helpers for the controller modules.
//!
//! Pure utility functions (configuration, labels) live in `crate::helpers`
//! instead.

use k8s_openapi::api::core::v1::EnvVar;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::OwnerReference;
use kube::{Resource, ResourceExt};

use crate::error::{Error, Result};

/// Field manager name used for status patches.
pub const FIELD_MANAGER: &str = "hostproxy-operator";

/// Finalizer token guarding Hostproxy deletion.
pub const FINALIZER: &str = "networking.raw1z.fr/finalizer";

/// Build a controller OwnerReference for any kube-rs `Resource`.
///
/// The owner must already be persisted: without a uid the garbage collector
/// could never cascade the deletion, so that is reported as an error.
pub fn controller_owner_ref<K: Resource<DynamicType = ()>>(obj: &K) -> Result<OwnerReference> {
    let uid = obj.meta().uid.clone().ok_or_else(|| {
        Error::reconcile(format!(
            "{} {} has no uid; cannot own dependents",
            K::kind(&()),
            obj.name_any()
        ))
    })?;
    Ok(OwnerReference {
        api_version: K::api_version(&()).to_string(),
        kind: K::kind(&()).to_string(),
        name: obj.name_any(),
        uid,
        controller: Some(true),
        block_owner_deletion: Some(true),
    })
}

/// Shorthand for a plain-value `EnvVar`.
pub fn env(name: &str, value: impl Into<String>) -> EnvVar {
    EnvVar {
        name: name.into(),
        value: Some(value.into()),
        ..Default::default()
    }
}

/// Whether `obj` carries `token` in its finalizer list.
pub fn has_finalizer<K: Resource>(obj: &K, token: &str) -> bool {
    obj.finalizers().iter().any(|f| f == token)
}

/// Add `token` to the finalizer list. Returns false if it was already there.
pub fn add_finalizer<K: Resource>(obj: &mut K, token: &str) -> bool {
    if has_finalizer(obj, token) {
        return false;
    }
    obj.finalizers_mut().push(token.to_string());
    true
}

/// Remove `token` from the finalizer list. Returns false if it was absent.
pub fn remove_finalizer<K: Resource>(obj: &mut K, token: &str) -> bool {
    if !has_finalizer(obj, token) {
        return false;
    }
    obj.finalizers_mut().retain(|f| f != token);
    true
}
