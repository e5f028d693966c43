//! Store Custom Resource Definition.
//!
//! A Store runs `thanos store`, the gateway serving blocks from object
//! storage over the StoreAPI.

use super::common::{CommonSpec, ComponentStatus, ObjectStorageSpec};
use crate::config::BuilderDefaults;
use crate::error::OperatorResult;
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Store is the Schema for the stores API.
#[derive(CustomResource, Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[kube(
    group = "thanos.orangesys.io",
    version = "v1beta1",
    kind = "Store",
    plural = "stores",
    namespaced,
    status = "ComponentStatus",
    printcolumn = r#"{"name":"Bucket", "type":"string", "jsonPath":".spec.bucketName"}"#,
    printcolumn = r#"{"name":"Ready", "type":"integer", "jsonPath":".status.readyReplicas"}"#,
    printcolumn = r#"{"name":"Age", "type":"date", "jsonPath":".metadata.creationTimestamp"}"#
)]
#[serde(rename_all = "camelCase")]
pub struct StoreSpec {
    /// Image, log level, resources and placement.
    #[serde(flatten)]
    pub common: CommonSpec,

    /// Bucket to serve.
    #[serde(flatten)]
    pub object_storage: ObjectStorageSpec,

    /// Local cache directory.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub data_dir: String,

    /// Size of the in-memory index cache, e.g. "250MB".
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub index_cache_size: String,

    /// Size of the chunk pool, e.g. "2GB".
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub chunk_pool_size: String,
}

impl StoreSpec {
    /// Return a copy with every unset field filled from `defaults`.
    pub fn with_defaults(&self, defaults: &BuilderDefaults) -> Self {
        let mut spec = Self {
            common: self.common.with_defaults(defaults),
            ..self.clone()
        };
        if spec.data_dir.is_empty() {
            spec.data_dir = defaults.store_data_dir.clone();
        }
        if spec.index_cache_size.is_empty() {
            spec.index_cache_size = defaults.index_cache_size.clone();
        }
        if spec.chunk_pool_size.is_empty() {
            spec.chunk_pool_size = defaults.chunk_pool_size.clone();
        }
        spec
    }

    /// Validate the spec.
    pub fn validate(&self) -> OperatorResult<()> {
        self.common.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn with_defaults_fills_cache_knobs() {
        let defaults = BuilderDefaults::default();
        let spec = StoreSpec {
            index_cache_size: "500MB".into(),
            ..Default::default()
        }
        .with_defaults(&defaults);

        assert_eq!(spec.index_cache_size, "500MB");
        assert_eq!(spec.chunk_pool_size, defaults.chunk_pool_size);
        assert_eq!(spec.data_dir, defaults.store_data_dir);
    }

    #[test]
    fn flattened_fields_round_trip_from_manifest() {
        let spec: StoreSpec = serde_json::from_value(serde_json::json!({
            "objstoreType": "GCS",
            "bucketName": "thanos-demo",
            "secretName": "thanos-demo-gcs",
            "indexCacheSize": "1GB",
            "image": "quay.io/thanos/thanos:v0.5.0"
        }))
        .expect("deserialize");

        assert_eq!(spec.object_storage.bucket_name, "thanos-demo");
        assert_eq!(spec.index_cache_size, "1GB");
        assert_eq!(spec.common.image, "quay.io/thanos/thanos:v0.5.0");
    }
}
