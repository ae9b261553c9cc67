//! hostproxy-operator: Kubernetes operator exposing cluster-internal
//! service ports on host ports through a per-Hostproxy proxy Deployment.

pub mod controller;
pub mod crd;
pub mod error;
pub mod helpers;
pub mod notify;
pub mod store;
