//! Receiver Custom Resource Definition.
//!
//! A Receiver runs `thanos receive`, accepting Prometheus remote-write into
//! a local TSDB that is shipped to object storage.

use super::common::{CommonSpec, ComponentStatus, ObjectStorageSpec};
use crate::config::BuilderDefaults;
use crate::error::{OperatorError, OperatorResult};
use crate::resources::quantity::parse_quantity;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Receiver is the Schema for the receivers API.
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "thanos.orangesys.io",
    version = "v1beta1",
    kind = "Receiver",
    plural = "receivers",
    namespaced,
    status = "ComponentStatus",
    printcolumn = r#"{"name":"Storage", "type":"string", "jsonPath":".spec.storage"}"#,
    printcolumn = r#"{"name":"Ready", "type":"integer", "jsonPath":".status.readyReplicas"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct ReceiverSpec {
    /// Image, log level, resources and placement.
    #[serde(flatten)]
    pub common: CommonSpec,

    /// Bucket TSDB blocks are uploaded to.
    #[serde(flatten)]
    pub object_storage: ObjectStorageSpec,

    /// Size of the persistent volume, e.g. "2Gi".
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub storage: String,

    /// Storage class of the persistent volume.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_class: Option<String>,

    /// TSDB path, also where the volume is mounted.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub receive_prefix: String,

    /// How long to keep raw samples locally, e.g. "24h".
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub retention: String,

    /// Value of the `receive` external label.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub receive_labels: String,
}

impl ReceiverSpec {
    /// Return a copy with every unset field filled from `defaults`.
    pub fn with_defaults(&self, defaults: &BuilderDefaults) -> Self {
        let mut spec = Self {
            common: self.common.with_defaults(defaults),
            ..self.clone()
        };
        if spec.storage.is_empty() {
            spec.storage = defaults.receive_storage_size.clone();
        }
        if spec.receive_prefix.is_empty() {
            spec.receive_prefix = defaults.receive_tsdb_path.clone();
        }
        if spec.retention.is_empty() {
            spec.retention = defaults.retention.clone();
        }
        spec
    }

    /// Validate the spec.
    pub fn validate(&self) -> OperatorResult<()> {
        self.common.validate()?;
        if !self.storage.is_empty() && parse_quantity(&self.storage).is_none() {
            return Err(OperatorError::ValidationError(format!(
                "storage {:?} is not a quantity",
                self.storage
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_defaults_fills_storage_path_and_retention() {
        let defaults = BuilderDefaults::default();
        let spec = ReceiverSpec::default().with_defaults(&defaults);

        assert_eq!(spec.storage, "2Gi");
        assert_eq!(spec.receive_prefix, "/thanos-receive");
        assert_eq!(spec.retention, "24h");
    }

    #[test]
    fn with_defaults_keeps_explicit_values() {
        let spec = ReceiverSpec {
            storage: "50Gi".into(),
            retention: "6h".into(),
            receive_prefix: "/data".into(),
            ..Default::default()
        }
        .with_defaults(&BuilderDefaults::default());

        assert_eq!(spec.storage, "50Gi");
        assert_eq!(spec.retention, "6h");
        assert_eq!(spec.receive_prefix, "/data");
    }

    #[test]
    fn validate_rejects_bad_storage() {
        let spec = ReceiverSpec {
            storage: "two gigs".into(),
            ..Default::default()
        };
        assert!(matches!(
            spec.validate(),
            Err(OperatorError::ValidationError(_))
        ));
    }
}
