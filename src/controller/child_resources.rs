//! Builders for the resources every Hostproxy owns: a single-replica proxy
//! Deployment and a headless Service selecting its pods.
//!
//! Both share the Hostproxy's name and namespace and carry a controller owner
//! reference, so the store deletes them once the Hostproxy is gone.

use k8s_openapi::api::{
    apps::v1::{Deployment, DeploymentSpec},
    core::v1::{
        Capabilities, Container, PodSecurityContext, PodSpec, PodTemplateSpec, SeccompProfile,
        SecurityContext, Service, ServiceSpec,
    },
};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;
use kube::api::{ObjectMeta, ResourceExt};

use crate::crd::hostproxy::Hostproxy;
use crate::error::Result;
use crate::helpers::{labels_for, OperatorConfig};

use super::helpers::{controller_owner_ref, env};

/// Replica count every proxy Deployment is pinned to.
pub const HOSTPROXY_REPLICAS: i32 = 1;

/// Name of the proxy container inside the Deployment's pods.
pub const CONTAINER_NAME: &str = "hostproxy";

/// Environment variable telling the proxy which ports to wire together.
pub const PORTS_ENV: &str = "PORTS";

/// Build the proxy Deployment for a Hostproxy.
///
/// Fails when no image is configured or the Hostproxy has not been persisted
/// yet (no uid to own the Deployment with).
pub fn deployment_for(hostproxy: &Hostproxy, config: &OperatorConfig) -> Result<Deployment> {
    let image = config.image()?;
    let name = hostproxy.name_any();
    let labels = labels_for(&name, Some(image));

    Ok(Deployment {
        metadata: ObjectMeta {
            name: Some(name),
            namespace: hostproxy.namespace(),
            owner_references: Some(vec![controller_owner_ref(hostproxy)?]),
            ..Default::default()
        },
        spec: Some(DeploymentSpec {
            replicas: Some(HOSTPROXY_REPLICAS),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    labels: Some(labels),
                    ..Default::default()
                }),
                spec: Some(PodSpec {
                    security_context: Some(PodSecurityContext {
                        seccomp_profile: Some(SeccompProfile {
                            type_: "RuntimeDefault".to_string(),
                            ..Default::default()
                        }),
                        ..Default::default()
                    }),
                    containers: vec![Container {
                        name: CONTAINER_NAME.to_string(),
                        image: Some(image.to_string()),
                        image_pull_policy: Some("IfNotPresent".to_string()),
                        security_context: Some(SecurityContext {
                            capabilities: Some(Capabilities {
                                add: Some(vec!["NET_ADMIN".to_string(), "NET_RAW".to_string()]),
                                ..Default::default()
                            }),
                            ..Default::default()
                        }),
                        env: Some(vec![env(PORTS_ENV, hostproxy.ports_env())]),
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
            },
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// Build the headless Service selecting the proxy pods.
pub fn service_for(hostproxy: &Hostproxy, config: &OperatorConfig) -> Result<Service> {
    let name = hostproxy.name_any();
    let labels = labels_for(&name, config.hostproxy_image.as_deref());

    Ok(Service {
        metadata: ObjectMeta {
            name: Some(name),
            namespace: hostproxy.namespace(),
            owner_references: Some(vec![controller_owner_ref(hostproxy)?]),
            ..Default::default()
        },
        spec: Some(ServiceSpec {
            cluster_ip: Some("None".to_string()),
            selector: Some(labels),
            ..Default::default()
        }),
        ..Default::default()
    })
}

/// Replica count requested by a Deployment's spec, if any.
pub fn deployment_replicas(deployment: &Deployment) -> Option<i32> {
    deployment.spec.as_ref().and_then(|s| s.replicas)
}
