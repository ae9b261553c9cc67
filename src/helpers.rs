use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::{Error, Result};

/// Name of the environment variable (and CLI flag env fallback) carrying the
/// proxy container image.
pub const IMAGE_ENV_VAR: &str = "HOSTPROXY_IMAGE";

// ── Operator configuration (injected via CLI flags / env) ─────────────────────

/// Process-wide configuration built once at startup and handed to every
/// reconcile through the controller `Context`.
#[derive(Clone, Debug)]
pub struct OperatorConfig {
    /// Image for the proxy container. `None` makes every dependent-creation
    /// path fail until the operator is restarted with an image.
    pub hostproxy_image: Option<String>,
    /// Delay before a failed reconcile is retried.
    pub error_requeue: Duration,
}

impl Default for OperatorConfig {
    fn default() -> Self {
        Self {
            hostproxy_image: None,
            error_requeue: Duration::from_secs(30),
        }
    }
}

impl OperatorConfig {
    /// The configured image, or a configuration error naming the variable.
    pub fn image(&self) -> Result<&str> {
        self.hostproxy_image
            .as_deref()
            .filter(|img| !img.is_empty())
            .ok_or_else(|| {
                Error::config(format!(
                    "Unable to find {IMAGE_ENV_VAR} environment variable with the image"
                ))
            })
    }
}

// ── Naming helpers ────────────────────────────────────────────────────────────

/// Longest value the API server accepts for a label.
const LABEL_VALUE_MAX: usize = 63;

/// Tag part of an image reference: the text after the last `:`, unless that
/// text contains a `/` (then the colon belonged to a registry port). A digest
/// (`@sha256:...`) is not a tag and is ignored.
///
/// The result is used as a label value, so it is cut to 63 characters and
/// stripped of trailing characters a label may not end with.
pub fn image_tag(image: &str) -> &str {
    let name = image.split_once('@').map_or(image, |(name, _)| name);
    let tag = name
        .rsplit_once(':')
        .map(|(_, tag)| tag)
        .filter(|tag| !tag.contains('/'))
        .unwrap_or_default();
    let tag = tag.get(..LABEL_VALUE_MAX).unwrap_or(tag);
    tag.trim_end_matches(|c: char| !c.is_ascii_alphanumeric())
}

/// Labels shared by the Deployment, its pods and the Service selector.
pub fn labels_for(name: &str, image: Option<&str>) -> BTreeMap<String, String> {
    let version = image.map(image_tag).unwrap_or_default();
    BTreeMap::from([
        ("app.kubernetes.io/name".to_string(), "Hostproxy".to_string()),
        ("app.kubernetes.io/instance".to_string(), name.to_string()),
        ("app.kubernetes.io/version".to_string(), version.to_string()),
        ("app.kubernetes.io/part-of".to_string(), "hostproxy".to_string()),
        (
            "app.kubernetes.io/created-by".to_string(),
            "controller-manager".to_string(),
        ),
    ])
}
