//! Spec and status pieces shared by every Thanos component.

use crate::conditions::Condition;
use crate::config::BuilderDefaults;
use crate::error::{OperatorError, OperatorResult};
use crate::resources::quantity::parse_quantity;
use k8s_openapi::api::apps::v1::{DeploymentStatus, StatefulSetStatus};
use k8s_openapi::api::core::v1::{ResourceRequirements, ServiceStatus, Toleration};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Fields every component spec carries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CommonSpec {
    /// Thanos image. Falls back to the operator default when empty.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub image: String,

    /// Log level passed to Thanos. Empty and "info" pass no flag.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub log_level: String,

    /// Number of pods to run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub replicas: Option<i32>,

    /// Resource requests and limits for the Thanos container.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceRequirements>,

    /// Labels and annotations propagated to the pods.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pod_metadata: Option<PodMetadata>,

    /// Node selector for pod placement.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub node_selector: BTreeMap<String, String>,

    /// Tolerations for pod scheduling.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tolerations: Vec<Toleration>,
}

/// Metadata copied onto the pod template.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct PodMetadata {
    /// Extra pod labels. These override `app` but never the group label.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,

    /// Extra pod annotations.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub annotations: BTreeMap<String, String>,
}

/// Object storage bucket selection.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ObjectStorageSpec {
    /// Object storage provider type, e.g. GCS or S3.
    #[serde(default, rename = "objstoreType", skip_serializing_if = "String::is_empty")]
    pub objstore_type: String,

    /// Bucket name.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub bucket_name: String,

    /// Secret holding the provider credentials file.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub secret_name: String,
}

impl CommonSpec {
    /// Return a copy with every unset field filled from `defaults`.
    ///
    /// The memory request default is applied here as well (see
    /// [`crate::resources::memory_request`]).
    pub fn with_defaults(&self, defaults: &BuilderDefaults) -> Self {
        let mut spec = self.clone();
        if spec.image.is_empty() {
            spec.image = defaults.image.clone();
        }
        if spec.replicas.is_none() {
            spec.replicas = Some(defaults.replicas);
        }
        spec.resources = Some(crate::resources::with_memory_request(
            spec.resources.as_ref(),
            &defaults.memory_request_floor,
        ));
        spec
    }

    /// Check fields the API server schema cannot.
    pub fn validate(&self) -> OperatorResult<()> {
        if let Some(replicas) = self.replicas {
            if replicas < 0 {
                return Err(OperatorError::ValidationError(format!(
                    "replicas must not be negative, got {}",
                    replicas
                )));
            }
        }

        let Some(resources) = &self.resources else {
            return Ok(());
        };
        for (section, list) in [("requests", &resources.requests), ("limits", &resources.limits)] {
            if let Some(memory) = list.as_ref().and_then(|l| l.get("memory")) {
                if parse_quantity(&memory.0).is_none() {
                    return Err(OperatorError::ValidationError(format!(
                        "resources.{}.memory {:?} is not a quantity",
                        section, memory.0
                    )));
                }
            }
        }
        Ok(())
    }
}

/// Observed state shared by every component.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ComponentStatus {
    /// Status of the generated Service.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_status: Option<ServiceStatus>,

    /// Status of the generated Deployment (Querier, Store).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_status: Option<DeploymentStatus>,

    /// Status of the generated StatefulSet (Receiver).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stateful_set_status: Option<StatefulSetStatus>,

    /// Total number of pods targeted by the workload.
    #[serde(default)]
    pub replicas: i32,

    /// Number of ready pods.
    #[serde(default)]
    pub ready_replicas: i32,

    /// Number of pods running the current template.
    #[serde(default)]
    pub updated_replicas: i32,

    /// Number of available pods.
    #[serde(default)]
    pub available_replicas: i32,

    /// Number of unavailable pods.
    #[serde(default)]
    pub unavailable_replicas: i32,

    /// Health conditions, at most one per type.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<Condition>,

    /// Generation of the spec this status was computed from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}
