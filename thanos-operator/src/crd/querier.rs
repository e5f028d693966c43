//! Querier Custom Resource Definition.
//!
//! A Querier runs `thanos query`, the stateless PromQL aggregation layer.

use super::common::{CommonSpec, ComponentStatus};
use crate::config::BuilderDefaults;
use crate::error::OperatorResult;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Querier is the Schema for the queriers API.
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "thanos.orangesys.io",
    version = "v1beta1",
    kind = "Querier",
    plural = "queriers",
    namespaced,
    status = "ComponentStatus",
    printcolumn = r#"{"name":"Replicas", "type":"integer", "jsonPath":".status.replicas"}"#,
    printcolumn = r#"{"name":"Ready", "type":"integer", "jsonPath":".status.readyReplicas"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct QuerierSpec {
    /// Image, log level, resources and placement.
    #[serde(flatten)]
    pub common: CommonSpec,

    /// Label that distinguishes HA replicas, used for deduplication.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub replica_label: String,

    /// DNS name of the StoreAPI endpoints to query, resolved via SRV.
    #[serde(default, rename = "storeDNS", skip_serializing_if = "String::is_empty")]
    pub store_dns: String,
}

impl QuerierSpec {
    /// Return a copy with every unset field filled from `defaults`.
    pub fn with_defaults(&self, defaults: &BuilderDefaults) -> Self {
        Self {
            common: self.common.with_defaults(defaults),
            ..self.clone()
        }
    }

    /// Validate the spec.
    pub fn validate(&self) -> OperatorResult<()> {
        self.common.validate()
    }
}
