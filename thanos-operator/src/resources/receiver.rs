//! Receiver workload builder.

use super::quantity::parse_quantity;
use super::{
    child_metadata, common_ports, credentials_env, credentials_mount, credentials_volume,
    objstore_config_arg, pod_labels, pod_template, thanos_args, PodParts,
};
use crate::config::BuilderDefaults;
use crate::crd::{ReceiverSpec, Role};
use crate::error::{OperatorError, OperatorResult};
use k8s_openapi::api::apps::v1::{StatefulSet, StatefulSetSpec};
use k8s_openapi::api::core::v1::{
    ContainerPort, PersistentVolumeClaim, PersistentVolumeClaimSpec, VolumeMount,
    VolumeResourceRequirements,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{LabelSelector, ObjectMeta};
use std::collections::BTreeMap;

/// Pod label marking StoreAPI endpoints for discovery by queriers.
pub const STORE_API_LABEL: &str = "thanos-store-api";

/// Arguments for `thanos receive`. `spec` must already carry defaults.
///
/// An empty `receive_labels` falls back to the component name so every
/// receiver uploads blocks with a distinguishing external label.
pub fn args(spec: &ReceiverSpec, name: &str, defaults: &BuilderDefaults) -> Vec<String> {
    let receive_label = if spec.receive_labels.is_empty() {
        name
    } else {
        spec.receive_labels.as_str()
    };
    let flags = vec![
        format!("--tsdb.path={}", spec.receive_prefix),
        format!("--tsdb.retention={}", spec.retention),
        format!("--labels=receive=\"{}\"", receive_label),
        objstore_config_arg(&spec.object_storage),
    ];
    thanos_args(Role::Receiver, flags, &spec.common.log_level, &defaults.log_level)
}

/// Build the StatefulSet running `thanos receive`.
///
/// Fails when the storage size is not a valid quantity.
pub fn build_statefulset(
    spec: &ReceiverSpec,
    name: &str,
    namespace: &str,
    service_name: &str,
    defaults: &BuilderDefaults,
) -> OperatorResult<StatefulSet> {
    let spec = spec.with_defaults(defaults);
    if parse_quantity(&spec.storage).is_none() {
        return Err(OperatorError::InvalidConfig(format!(
            "receiver {} storage {:?} is not a quantity",
            name, spec.storage
        )));
    }

    let mut labels = pod_labels(Role::Receiver, name, &spec.common, defaults);
    labels.insert(STORE_API_LABEL.to_string(), "true".to_string());

    let mut ports = common_ports(defaults);
    ports.push(ContainerPort {
        container_port: defaults.receive_port,
        name: Some("receive".to_string()),
        ..Default::default()
    });

    let parts = PodParts {
        args: args(&spec, name, defaults),
        env: credentials_env(&spec.object_storage, defaults),
        ports,
        volume_mounts: vec![
            credentials_mount(defaults),
            VolumeMount {
                name: defaults.storage_volume_name.clone(),
                mount_path: spec.receive_prefix.clone(),
                ..Default::default()
            },
        ],
        volumes: vec![credentials_volume(&spec.object_storage, defaults)],
    };

    let claim = PersistentVolumeClaim {
        metadata: ObjectMeta {
            name: Some(defaults.storage_volume_name.clone()),
            ..Default::default()
        },
        spec: Some(PersistentVolumeClaimSpec {
            access_modes: Some(vec!["ReadWriteOnce".to_string()]),
            storage_class_name: spec.storage_class.clone(),
            resources: Some(VolumeResourceRequirements {
                requests: Some(BTreeMap::from([(
                    "storage".to_string(),
                    Quantity(spec.storage.clone()),
                )])),
                ..Default::default()
            }),
            ..Default::default()
        }),
        ..Default::default()
    };

    Ok(StatefulSet {
        metadata: child_metadata(Role::Receiver, name, namespace, defaults),
        spec: Some(StatefulSetSpec {
            replicas: spec.common.replicas,
            service_name: service_name.to_string(),
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: pod_template(Role::Receiver, labels, &spec.common, parts, defaults),
            volume_claim_templates: Some(vec![claim]),
            ..Default::default()
        }),
        ..Default::default()
    })
}
