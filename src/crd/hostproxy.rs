use k8s_openapi::apimachinery::pkg::apis::meta::v1::Condition;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

// ── CRD ───────────────────────────────────────────────────────────────────────

/// Hostproxy is the Schema for the hostproxies API.
///
/// Each Hostproxy asks the operator to proxy `hostPort` on the node into
/// `clusterPort` of the service running inside the cluster.
#[derive(CustomResource, Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[kube(
    group = "networking.raw1z.fr",
    version = "v1",
    kind = "Hostproxy",
    plural = "hostproxies",
    shortname = "hp",
    namespaced,
    status = "HostproxyStatus",
    derive = "PartialEq",
    printcolumn = r#"{"name": "Host Port", "type": "integer", "jsonPath": ".spec.hostPort"}"#,
    printcolumn = r#"{"name": "Cluster Port", "type": "integer", "jsonPath": ".spec.clusterPort"}"#,
    printcolumn = r#"{"name": "Available", "type": "string", "jsonPath": ".status.conditions[?(@.type==\"Available\")].status"}"#,
    printcolumn = r#"{"name": "Age", "type": "date", "jsonPath": ".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct HostproxySpec {
    /// Port of the host which is proxied inside the cluster.
    #[serde(default)]
    #[schemars(range(min = 0, max = 65535))]
    pub host_port: i32,

    /// Port of the service inside the cluster to which the host port is proxied.
    #[serde(default)]
    #[schemars(range(min = 0, max = 65535))]
    pub cluster_port: i32,
}

// ── Status ────────────────────────────────────────────────────────────────────

/// HostproxyStatus defines the observed state of Hostproxy.
///
/// Condition types written by the operator are `Available` and `Degraded`.
#[derive(Clone, Debug, Default, Serialize, Deserialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct HostproxyStatus {
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,
}

impl Hostproxy {
    /// Conditions currently recorded in status (empty when status is unset).
    pub fn conditions(&self) -> &[Condition] {
        self.status
            .as_ref()
            .map(|s| s.conditions.as_slice())
            .unwrap_or_default()
    }

    /// Mutable access to the condition list, creating the status block if needed.
    pub fn conditions_mut(&mut self) -> &mut Vec<Condition> {
        &mut self.status.get_or_insert_with(Default::default).conditions
    }

    /// The store sets a deletion timestamp once deletion has been requested.
    pub fn is_marked_for_deletion(&self) -> bool {
        self.metadata.deletion_timestamp.is_some()
    }

    /// Value of the `PORTS` variable handed to the proxy container.
    pub fn ports_env(&self) -> String {
        format!("{}:{}", self.spec.cluster_port, self.spec.host_port)
    }
}
