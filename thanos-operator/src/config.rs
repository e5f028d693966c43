//! Operator configuration.
//!
//! Every default the resource builders fall back on lives in
//! [`BuilderDefaults`], so tests and deployments can vary them without
//! touching process-wide state. Controller timing lives in
//! [`ControllerSettings`].

use crate::error::{OperatorError, OperatorResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level operator configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OperatorConfig {
    /// Defaults injected into the desired-state builders.
    pub defaults: BuilderDefaults,

    /// Controller loop settings.
    pub controller: ControllerSettings,
}

/// Defaults used when a component spec leaves a field empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BuilderDefaults {
    /// Label key grouping all pods of one parent resource.
    pub group_label_key: String,

    /// Label stamped on every generated child resource.
    pub managed_by_label: (String, String),

    /// Image used when the spec sets none.
    pub image: String,

    /// Log level Thanos runs with when no flag is passed.
    pub log_level: String,

    /// Replica count used when the spec sets none.
    pub replicas: i32,

    /// Memory request floor (see `resources::memory_request`).
    pub memory_request_floor: String,

    /// Directory the credentials secret is mounted into.
    pub secrets_dir: String,

    /// Extension of the credentials file inside the secret.
    pub credentials_extension: String,

    /// Environment variable the object-store client reads credentials from.
    pub credentials_env_var: String,

    /// Name of the credentials secret volume.
    pub credentials_volume_name: String,

    /// Receiver persistent volume size.
    pub receive_storage_size: String,

    /// Receiver TSDB path, also the data volume mount path.
    pub receive_tsdb_path: String,

    /// Receiver TSDB retention.
    pub retention: String,

    /// Name of the receiver volume claim template.
    pub storage_volume_name: String,

    /// Store index cache size.
    pub index_cache_size: String,

    /// Store chunk pool size.
    pub chunk_pool_size: String,

    /// Store local cache directory.
    pub store_data_dir: String,

    /// Pod termination grace period in seconds.
    pub termination_grace_period_seconds: i64,

    /// HTTP port (metrics, UI, query API).
    pub http_port: i32,

    /// gRPC StoreAPI port.
    pub grpc_port: i32,

    /// Remote-write receive port.
    pub receive_port: i32,
}

impl Default for BuilderDefaults {
    fn default() -> Self {
        Self {
            group_label_key: "thanos".to_string(),
            managed_by_label: ("managed-by".to_string(), "thanos-operator".to_string()),
            image: "quay.io/thanos/thanos:v0.5.0".to_string(),
            log_level: "info".to_string(),
            replicas: 1,
            memory_request_floor: "1Gi".to_string(),
            secrets_dir: "/etc/thanos/secrets/".to_string(),
            credentials_extension: ".json".to_string(),
            credentials_env_var: "GOOGLE_APPLICATION_CREDENTIALS".to_string(),
            credentials_volume_name: "google-cloud-key".to_string(),
            receive_storage_size: "2Gi".to_string(),
            receive_tsdb_path: "/thanos-receive".to_string(),
            retention: "24h".to_string(),
            storage_volume_name: "thanos-persistent-storage".to_string(),
            index_cache_size: "250MB".to_string(),
            chunk_pool_size: "2GB".to_string(),
            store_data_dir: "/var/thanos/store".to_string(),
            termination_grace_period_seconds: 10,
            http_port: 10902,
            grpc_port: 10901,
            receive_port: 19291,
        }
    }
}

/// Controller loop settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ControllerSettings {
    /// Requeue delay handed to the scheduler after a failed pass.
    pub error_requeue_secs: u64,

    /// Requeue delay when a child is held by another owner.
    ///
    /// A foreign object never triggers our watches, so the pass polls.
    pub orphan_requeue_secs: u64,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            error_requeue_secs: 30,
            orphan_requeue_secs: 300,
        }
    }
}

impl ControllerSettings {
    /// Requeue delay after a failed pass.
    pub fn error_requeue(&self) -> Duration {
        Duration::from_secs(self.error_requeue_secs)
    }

    /// Requeue delay while a child is orphaned.
    pub fn orphan_requeue(&self) -> Duration {
        Duration::from_secs(self.orphan_requeue_secs)
    }
}

impl OperatorConfig {
    /// Parse a configuration from YAML. Missing keys keep their defaults.
    pub fn from_yaml(yaml: &str) -> OperatorResult<Self> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file.
    pub fn load(path: impl AsRef<Path>) -> OperatorResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            OperatorError::InvalidConfig(format!("cannot read {}: {}", path.display(), e))
        })?;
        Self::from_yaml(&contents)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> OperatorResult<()> {
        let d = &self.defaults;
        if d.group_label_key.is_empty() {
            return Err(OperatorError::InvalidConfig(
                "groupLabelKey must not be empty".into(),
            ));
        }
        if d.replicas < 0 {
            return Err(OperatorError::InvalidConfig(
                "replicas must not be negative".into(),
            ));
        }
        if crate::resources::quantity::parse_quantity(&d.memory_request_floor).is_none() {
            return Err(OperatorError::InvalidConfig(format!(
                "memoryRequestFloor {:?} is not a quantity",
                d.memory_request_floor
            )));
        }
        if crate::resources::quantity::parse_quantity(&d.receive_storage_size).is_none() {
            return Err(OperatorError::InvalidConfig(format!(
                "receiveStorageSize {:?} is not a quantity",
                d.receive_storage_size
            )));
        }
        for (name, port) in [
            ("httpPort", d.http_port),
            ("grpcPort", d.grpc_port),
            ("receivePort", d.receive_port),
        ] {
            if !(1..=65535).contains(&port) {
                return Err(OperatorError::InvalidConfig(format!(
                    "{} {} is out of range",
                    name, port
                )));
            }
        }
        Ok(())
    }
}
