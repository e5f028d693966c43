//! Desired-state builders.
//!
//! Every function here is pure: the same spec and defaults always produce
//! the same objects, argument lists and port sets. Nothing in this module
//! talks to the cluster.
//!
//! - [`service`]: the Service fronting every component
//! - [`querier`]: the `thanos query` Deployment
//! - [`store`]: the `thanos store` Deployment
//! - [`receiver`]: the `thanos receive` StatefulSet

pub mod quantity;
pub mod querier;
pub mod receiver;
pub mod service;
pub mod store;

use crate::config::BuilderDefaults;
use crate::crd::{CommonSpec, ObjectStorageSpec, Role, ThanosComponent};
use crate::error::{OperatorError, OperatorResult};
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::{
    Container, ContainerPort, EnvVar, PodSpec, PodTemplateSpec, ResourceRequirements,
    SecretVolumeSource, Service, Volume, VolumeMount,
};
use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use std::collections::BTreeMap;
use std::fmt;

/// Kinds of child resources the operator generates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChildKind {
    /// Network endpoint in front of the pods.
    Service,
    /// Stateless replica set.
    Deployment,
    /// Stateful replica set.
    StatefulSet,
}

impl ChildKind {
    /// Kubernetes kind name.
    pub fn as_str(self) -> &'static str {
        match self {
            ChildKind::Service => "Service",
            ChildKind::Deployment => "Deployment",
            ChildKind::StatefulSet => "StatefulSet",
        }
    }

    /// Condition type reporting on this child.
    pub fn condition_type(self) -> &'static str {
        match self {
            ChildKind::Service => crate::conditions::SERVICE_UP_TO_DATE,
            ChildKind::Deployment => crate::conditions::DEPLOYMENT_UP_TO_DATE,
            ChildKind::StatefulSet => crate::conditions::STATEFUL_SET_UP_TO_DATE,
        }
    }

    /// Reason recorded once the child matches the desired state.
    pub fn ensured_reason(self) -> String {
        format!("Ensured{}", self.as_str())
    }

    /// Reason recorded when the child belongs to someone else.
    pub fn orphan_reason(self) -> String {
        format!("Orphan{}", self.as_str())
    }
}

impl fmt::Display for ChildKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A generated child resource.
#[derive(Debug, Clone, PartialEq)]
pub enum ChildResource {
    /// A Service.
    Service(Service),
    /// A Deployment.
    Deployment(Deployment),
    /// A StatefulSet.
    StatefulSet(StatefulSet),
}

impl ChildResource {
    /// Kind of the wrapped object.
    pub fn kind(&self) -> ChildKind {
        match self {
            ChildResource::Service(_) => ChildKind::Service,
            ChildResource::Deployment(_) => ChildKind::Deployment,
            ChildResource::StatefulSet(_) => ChildKind::StatefulSet,
        }
    }

    /// Object metadata.
    pub fn metadata(&self) -> &ObjectMeta {
        match self {
            ChildResource::Service(o) => &o.metadata,
            ChildResource::Deployment(o) => &o.metadata,
            ChildResource::StatefulSet(o) => &o.metadata,
        }
    }

    /// Mutable object metadata.
    pub fn metadata_mut(&mut self) -> &mut ObjectMeta {
        match self {
            ChildResource::Service(o) => &mut o.metadata,
            ChildResource::Deployment(o) => &mut o.metadata,
            ChildResource::StatefulSet(o) => &mut o.metadata,
        }
    }

    /// Object name, empty if unset.
    pub fn name(&self) -> &str {
        self.metadata().name.as_deref().unwrap_or_default()
    }

    /// Link the child to its controlling parent.
    ///
    /// Any other controller reference is dropped; non-controller references
    /// are kept.
    pub fn set_controller_owner(&mut self, owner: OwnerReference) {
        let refs = self.metadata_mut().owner_references.get_or_insert_with(Vec::new);
        refs.retain(|r| r.controller != Some(true) && r.uid != owner.uid);
        refs.push(owner);
    }
}

/// Build the desired child of `kind` for `component`.
///
/// The result carries no owner reference; the reconciler links it.
pub fn desired_child(
    component: &ThanosComponent,
    kind: ChildKind,
    defaults: &BuilderDefaults,
) -> OperatorResult<ChildResource> {
    let name = component.name();
    let namespace = component.namespace().ok_or_else(|| {
        OperatorError::InvalidConfig(format!("{} {} must be namespaced", component.role(), name))
    })?;

    let child = match (component, kind) {
        (_, ChildKind::Service) => ChildResource::Service(service::build_service(
            component.role(),
            &name,
            &namespace,
            defaults,
        )),
        (ThanosComponent::Querier(q), ChildKind::Deployment) => ChildResource::Deployment(
            querier::build_deployment(&q.spec, &name, &namespace, defaults),
        ),
        (ThanosComponent::Store(s), ChildKind::Deployment) => ChildResource::Deployment(
            store::build_deployment(&s.spec, &name, &namespace, defaults),
        ),
        (ThanosComponent::Receiver(r), ChildKind::StatefulSet) => {
            ChildResource::StatefulSet(receiver::build_statefulset(
                &r.spec,
                &name,
                &namespace,
                &service::service_name(&name),
                defaults,
            )?)
        }
        (component, kind) => {
            return Err(OperatorError::InvalidConfig(format!(
                "{} does not generate a {}",
                component.role(),
                kind
            )))
        }
    };
    Ok(child)
}

/// Pod labels: `app` overlaid with caller labels, then the group key.
///
/// The group key is written last because the Service selects on it.
pub fn pod_labels(
    role: Role,
    name: &str,
    common: &CommonSpec,
    defaults: &BuilderDefaults,
) -> BTreeMap<String, String> {
    let mut labels = BTreeMap::from([("app".to_string(), role.app_label().to_string())]);
    if let Some(meta) = &common.pod_metadata {
        labels.extend(meta.labels.clone());
    }
    labels.insert(defaults.group_label_key.clone(), name.to_string());
    labels
}

/// Labels stamped on the child objects themselves.
pub fn object_labels(role: Role, name: &str, defaults: &BuilderDefaults) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("service".to_string(), role.app_label().to_string()),
        (defaults.group_label_key.clone(), name.to_string()),
        (
            defaults.managed_by_label.0.clone(),
            defaults.managed_by_label.1.clone(),
        ),
    ])
}

/// Metadata for a child object named after its parent.
pub fn child_metadata(
    role: Role,
    name: &str,
    namespace: &str,
    defaults: &BuilderDefaults,
) -> ObjectMeta {
    ObjectMeta {
        name: Some(name.to_string()),
        namespace: Some(namespace.to_string()),
        labels: Some(object_labels(role, name, defaults)),
        ..Default::default()
    }
}

/// Compute the memory request.
///
/// An explicit request wins. Otherwise the request is the memory limit when
/// that limit is at or below `floor`, and `floor` in every other case,
/// including a missing or unparsable limit.
pub fn memory_request(resources: Option<&ResourceRequirements>, floor: &str) -> Quantity {
    let requests = resources.and_then(|r| r.requests.as_ref());
    if let Some(request) = requests.and_then(|r| r.get("memory")) {
        return request.clone();
    }

    let limit = resources
        .and_then(|r| r.limits.as_ref())
        .and_then(|l| l.get("memory"));
    match (limit, quantity::parse_quantity(floor)) {
        (Some(limit), Some(floor_value)) => match quantity::parse_quantity(&limit.0) {
            Some(limit_value) if limit_value <= floor_value => limit.clone(),
            _ => Quantity(floor.to_string()),
        },
        _ => Quantity(floor.to_string()),
    }
}

/// Return `resources` with the memory request filled in.
pub fn with_memory_request(
    resources: Option<&ResourceRequirements>,
    floor: &str,
) -> ResourceRequirements {
    let request = memory_request(resources, floor);
    let mut resolved = resources.cloned().unwrap_or_default();
    resolved
        .requests
        .get_or_insert_with(BTreeMap::new)
        .insert("memory".to_string(), request);
    resolved
}

/// Assemble a Thanos argument list.
///
/// The subcommand comes first, then `flags` in the given order, then a
/// `--log.level` flag only when `log_level` is set and differs from
/// `default_level`.
pub fn thanos_args(
    role: Role,
    flags: impl IntoIterator<Item = String>,
    log_level: &str,
    default_level: &str,
) -> Vec<String> {
    let mut args = vec![role.subcommand().to_string()];
    args.extend(flags);
    if !log_level.is_empty() && log_level != default_level {
        args.push(format!("--log.level={}", log_level));
    }
    args
}

/// `--objstore.config` flag with the bucket config inlined as YAML.
pub fn objstore_config_arg(storage: &ObjectStorageSpec) -> String {
    format!(
        "--objstore.config=type: {}\nconfig:\n  bucket: \"{}\"",
        storage.objstore_type, storage.bucket_name
    )
}

/// Path of the credentials file inside the container.
pub fn credentials_path(storage: &ObjectStorageSpec, defaults: &BuilderDefaults) -> String {
    format!(
        "{}{}{}",
        defaults.secrets_dir, storage.secret_name, defaults.credentials_extension
    )
}

/// Environment pointing the object-store client at the credentials file.
pub fn credentials_env(storage: &ObjectStorageSpec, defaults: &BuilderDefaults) -> Vec<EnvVar> {
    vec![EnvVar {
        name: defaults.credentials_env_var.clone(),
        value: Some(credentials_path(storage, defaults)),
        ..Default::default()
    }]
}

/// Secret volume carrying the credentials.
pub fn credentials_volume(storage: &ObjectStorageSpec, defaults: &BuilderDefaults) -> Volume {
    Volume {
        name: defaults.credentials_volume_name.clone(),
        secret: Some(SecretVolumeSource {
            secret_name: Some(storage.secret_name.clone()),
            ..Default::default()
        }),
        ..Default::default()
    }
}

/// Mount of the credentials volume.
pub fn credentials_mount(defaults: &BuilderDefaults) -> VolumeMount {
    VolumeMount {
        name: defaults.credentials_volume_name.clone(),
        mount_path: defaults.secrets_dir.clone(),
        ..Default::default()
    }
}

/// The http and grpc ports every component exposes.
pub fn common_ports(defaults: &BuilderDefaults) -> Vec<ContainerPort> {
    vec![
        ContainerPort {
            container_port: defaults.http_port,
            name: Some("http".to_string()),
            ..Default::default()
        },
        ContainerPort {
            container_port: defaults.grpc_port,
            name: Some("grpc".to_string()),
            ..Default::default()
        },
    ]
}

/// Role-specific pieces of a pod.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PodParts {
    /// Container arguments.
    pub args: Vec<String>,
    /// Container environment.
    pub env: Vec<EnvVar>,
    /// Container ports.
    pub ports: Vec<ContainerPort>,
    /// Container volume mounts.
    pub volume_mounts: Vec<VolumeMount>,
    /// Pod volumes.
    pub volumes: Vec<Volume>,
}

/// Build the pod template around a single Thanos container.
///
/// `common` must already carry defaults (see [`CommonSpec::with_defaults`]).
pub fn pod_template(
    role: Role,
    labels: BTreeMap<String, String>,
    common: &CommonSpec,
    parts: PodParts,
    defaults: &BuilderDefaults,
) -> PodTemplateSpec {
    let annotations = common
        .pod_metadata
        .as_ref()
        .map(|m| m.annotations.clone())
        .filter(|a| !a.is_empty());

    let container = Container {
        name: role.app_label().to_string(),
        image: Some(common.image.clone()),
        args: Some(parts.args),
        env: non_empty(parts.env),
        ports: non_empty(parts.ports),
        volume_mounts: non_empty(parts.volume_mounts),
        resources: common.resources.clone(),
        ..Default::default()
    };

    PodTemplateSpec {
        metadata: Some(ObjectMeta {
            labels: Some(labels),
            annotations,
            ..Default::default()
        }),
        spec: Some(PodSpec {
            termination_grace_period_seconds: Some(defaults.termination_grace_period_seconds),
            containers: vec![container],
            volumes: non_empty(parts.volumes),
            node_selector: Some(common.node_selector.clone()).filter(|s| !s.is_empty()),
            tolerations: non_empty(common.tolerations.clone()),
            ..Default::default()
        }),
    }
}

fn non_empty<T>(items: Vec<T>) -> Option<Vec<T>> {
    if items.is_empty() {
        None
    } else {
        Some(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::{PodMetadata, Querier, QuerierSpec, Receiver, ReceiverSpec};

    fn memory(requests: Option<&str>, limits: Option<&str>) -> ResourceRequirements {
        let list = |v: Option<&str>| {
            v.map(|q| BTreeMap::from([("memory".to_string(), Quantity(q.to_string()))]))
        };
        ResourceRequirements {
            requests: list(requests),
            limits: list(limits),
            ..Default::default()
        }
    }

    #[test]
    fn memory_request_uses_small_limit() {
        let r = memory(None, Some("512Mi"));
        assert_eq!(memory_request(Some(&r), "1Gi"), Quantity("512Mi".into()));
    }

    #[test]
    fn memory_request_limit_equal_to_floor() {
        let r = memory(None, Some("1024Mi"));
        assert_eq!(memory_request(Some(&r), "1Gi"), Quantity("1024Mi".into()));
    }

    #[test]
    fn memory_request_caps_at_floor_for_large_limit() {
        let r = memory(None, Some("4Gi"));
        assert_eq!(memory_request(Some(&r), "1Gi"), Quantity("1Gi".into()));
    }

    #[test]
    fn memory_request_without_limit_is_floor() {
        assert_eq!(memory_request(None, "1Gi"), Quantity("1Gi".into()));
        let r = memory(None, None);
        assert_eq!(memory_request(Some(&r), "1Gi"), Quantity("1Gi".into()));
    }

    #[test]
    fn explicit_memory_request_wins() {
        let r = memory(Some("3Gi"), Some("512Mi"));
        assert_eq!(memory_request(Some(&r), "1Gi"), Quantity("3Gi".into()));
    }

    #[test]
    fn with_memory_request_keeps_other_entries() {
        let mut r = memory(None, Some("512Mi"));
        r.requests = Some(BTreeMap::from([("cpu".to_string(), Quantity("100m".into()))]));
        let resolved = with_memory_request(Some(&r), "1Gi");
        let requests = resolved.requests.unwrap();
        assert_eq!(requests["cpu"], Quantity("100m".into()));
        assert_eq!(requests["memory"], Quantity("512Mi".into()));
        assert_eq!(resolved.limits, r.limits);
    }

    #[test]
    fn log_level_flag_omitted_for_default_and_empty() {
        for level in ["", "info"] {
            let args = thanos_args(Role::Querier, vec!["--a".to_string()], level, "info");
            assert_eq!(args, vec!["query", "--a"]);
        }
    }

    #[test]
    fn log_level_flag_appended_once_at_end() {
        let args = thanos_args(
            Role::Store,
            vec!["--a".to_string(), "--b".to_string()],
            "warn",
            "info",
        );
        assert_eq!(args, vec!["store", "--a", "--b", "--log.level=warn"]);
        assert_eq!(args.iter().filter(|a| a.starts_with("--log.level")).count(), 1);
    }

    #[test]
    fn objstore_config_inlines_yaml() {
        let storage = ObjectStorageSpec {
            objstore_type: "GCS".into(),
            bucket_name: "thanos-demo".into(),
            secret_name: "thanos-demo-gcs".into(),
        };
        assert_eq!(
            objstore_config_arg(&storage),
            "--objstore.config=type: GCS\nconfig:\n  bucket: \"thanos-demo\""
        );
        assert_eq!(
            credentials_path(&storage, &BuilderDefaults::default()),
            "/etc/thanos/secrets/thanos-demo-gcs.json"
        );
    }

    #[test]
    fn caller_labels_override_defaults() {
        let common = CommonSpec {
            pod_metadata: Some(PodMetadata {
                labels: BTreeMap::from([
                    ("app".to_string(), "custom".to_string()),
                    ("team".to_string(), "obs".to_string()),
                ]),
                ..Default::default()
            }),
            ..Default::default()
        };
        let labels = pod_labels(Role::Querier, "q", &common, &BuilderDefaults::default());
        assert_eq!(labels["app"], "custom");
        assert_eq!(labels["thanos"], "q");
        assert_eq!(labels["team"], "obs");
    }

    #[test]
    fn group_key_cannot_be_overridden() {
        let common = CommonSpec {
            pod_metadata: Some(PodMetadata {
                labels: BTreeMap::from([("thanos".to_string(), "elsewhere".to_string())]),
                ..Default::default()
            }),
            ..Default::default()
        };
        let labels = pod_labels(Role::Store, "store-a", &common, &BuilderDefaults::default());
        assert_eq!(labels["thanos"], "store-a");

        let svc = service::build_service(
            Role::Store,
            "store-a",
            "monitoring",
            &BuilderDefaults::default(),
        );
        let selector = svc.spec.and_then(|s| s.selector).unwrap();
        assert!(selector.iter().all(|(k, v)| labels.get(k) == Some(v)));
    }

    #[test]
    fn group_label_key_is_injected() {
        let defaults = BuilderDefaults {
            group_label_key: "thanos.io/instance".into(),
            ..Default::default()
        };
        let labels = pod_labels(Role::Store, "s", &CommonSpec::default(), &defaults);
        assert_eq!(labels["thanos.io/instance"], "s");
        assert!(!labels.contains_key("thanos"));
    }

    #[test]
    fn set_controller_owner_replaces_previous_controller() {
        let mut child = ChildResource::Service(Service::default());
        let owner = |uid: &str, controller| OwnerReference {
            api_version: "thanos.orangesys.io/v1beta1".into(),
            kind: "Querier".into(),
            name: "q".into(),
            uid: uid.into(),
            controller,
            ..Default::default()
        };
        child.set_controller_owner(owner("a", Some(true)));
        child.set_controller_owner(owner("b", Some(true)));

        let refs = child.metadata().owner_references.clone().unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].uid, "b");
    }

    #[test]
    fn desired_child_rejects_mismatched_kind() {
        let mut q = Querier::new("q", QuerierSpec::default());
        q.metadata.namespace = Some("monitoring".into());
        let err = desired_child(&q.into(), ChildKind::StatefulSet, &BuilderDefaults::default())
            .expect_err("querier has no stateful set");
        assert!(matches!(err, OperatorError::InvalidConfig(_)));
    }

    #[test]
    fn desired_child_requires_namespace() {
        let r = Receiver::new("r", ReceiverSpec::default());
        assert!(desired_child(&r.into(), ChildKind::Service, &BuilderDefaults::default()).is_err());
    }

    #[test]
    fn desired_child_is_deterministic() {
        let mut r = Receiver::new("receiver", ReceiverSpec::default());
        r.metadata.namespace = Some("monitoring".into());
        let component: ThanosComponent = r.into();
        let defaults = BuilderDefaults::default();

        let first = desired_child(&component, ChildKind::StatefulSet, &defaults).unwrap();
        let second = desired_child(&component, ChildKind::StatefulSet, &defaults).unwrap();
        assert_eq!(first, second);
    }
}
