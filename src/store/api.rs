use async_trait::async_trait;
use k8s_openapi::api::{apps::v1::Deployment, core::v1::Service};
use kube::api::{Api, DeleteParams, Patch, PatchParams, PostParams};
use kube::{Client, ResourceExt};
use serde_json::json;
use tracing::debug;

use crate::controller::helpers::FIELD_MANAGER;
use crate::crd::hostproxy::Hostproxy;
use crate::error::Result;

use super::{ObjectKey, ObjectStore};

/// Production store backed by the Kubernetes API server.
#[derive(Clone)]
pub struct KubeStore {
    client: Client,
}

impl KubeStore {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn hostproxies(&self, ns: &str) -> Api<Hostproxy> {
        Api::namespaced(self.client.clone(), ns)
    }

    fn deployments(&self, ns: &str) -> Api<Deployment> {
        Api::namespaced(self.client.clone(), ns)
    }

    fn services(&self, ns: &str) -> Api<Service> {
        Api::namespaced(self.client.clone(), ns)
    }
}

#[async_trait]
impl ObjectStore for KubeStore {
    async fn get_hostproxy(&self, key: &ObjectKey) -> Result<Option<Hostproxy>> {
        Ok(self.hostproxies(&key.namespace).get_opt(&key.name).await?)
    }

    async fn update_hostproxy(&self, hostproxy: &Hostproxy) -> Result<Hostproxy> {
        let key = ObjectKey::of(hostproxy);
        Ok(self
            .hostproxies(&key.namespace)
            .replace(&key.name, &PostParams::default(), hostproxy)
            .await?)
    }

    async fn update_hostproxy_status(&self, hostproxy: &Hostproxy) -> Result<Hostproxy> {
        let key = ObjectKey::of(hostproxy);
        // Carrying resourceVersion in the merge patch makes the API server
        // reject the write with 409 if the object moved on since we read it.
        let mut patch = json!({ "status": hostproxy.status });
        if let Some(rv) = hostproxy.resource_version() {
            patch["metadata"] = json!({ "resourceVersion": rv });
        }
        Ok(self
            .hostproxies(&key.namespace)
            .patch_status(
                &key.name,
                &PatchParams::apply(FIELD_MANAGER),
                &Patch::Merge(&patch),
            )
            .await?)
    }

    async fn delete_hostproxy(&self, key: &ObjectKey) -> Result<()> {
        match self
            .hostproxies(&key.namespace)
            .delete(&key.name, &DeleteParams::default())
            .await
        {
            Ok(_) => Ok(()),
            Err(kube::Error::Api(ref e)) if e.code == 404 => {
                debug!(%key, "hostproxy already gone");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn get_deployment(&self, key: &ObjectKey) -> Result<Option<Deployment>> {
        Ok(self.deployments(&key.namespace).get_opt(&key.name).await?)
    }

    async fn create_deployment(&self, deployment: &Deployment) -> Result<Deployment> {
        let ns = deployment.namespace().unwrap_or_default();
        Ok(self
            .deployments(&ns)
            .create(&PostParams::default(), deployment)
            .await?)
    }

    async fn update_deployment(&self, deployment: &Deployment) -> Result<Deployment> {
        let key = ObjectKey::of(deployment);
        Ok(self
            .deployments(&key.namespace)
            .replace(&key.name, &PostParams::default(), deployment)
            .await?)
    }

    async fn get_service(&self, key: &ObjectKey) -> Result<Option<Service>> {
        Ok(self.services(&key.namespace).get_opt(&key.name).await?)
    }

    async fn create_service(&self, service: &Service) -> Result<Service> {
        let ns = service.namespace().unwrap_or_default();
        Ok(self
            .services(&ns)
            .create(&PostParams::default(), service)
            .await?)
    }
}
