//! Querier workload builder.

use super::{child_metadata, common_ports, pod_labels, pod_template, thanos_args, PodParts};
use crate::config::BuilderDefaults;
use crate::crd::{QuerierSpec, Role};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;

/// Arguments for `thanos query`.
pub fn args(spec: &QuerierSpec, defaults: &BuilderDefaults) -> Vec<String> {
    let mut flags = Vec::new();
    if !spec.replica_label.is_empty() {
        flags.push(format!("--query.replica-label={}", spec.replica_label));
    }
    if !spec.store_dns.is_empty() {
        flags.push(format!("--store=dnssrv+{}", spec.store_dns));
    }
    thanos_args(Role::Querier, flags, &spec.common.log_level, &defaults.log_level)
}

/// Build the Deployment running `thanos query`.
pub fn build_deployment(
    spec: &QuerierSpec,
    name: &str,
    namespace: &str,
    defaults: &BuilderDefaults,
) -> Deployment {
    let spec = spec.with_defaults(defaults);
    let labels = pod_labels(Role::Querier, name, &spec.common, defaults);

    let parts = PodParts {
        args: args(&spec, defaults),
        ports: common_ports(defaults),
        ..Default::default()
    };

    Deployment {
        metadata: child_metadata(Role::Querier, name, namespace, defaults),
        spec: Some(DeploymentSpec {
            replicas: spec.common.replicas,
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: pod_template(Role::Querier, labels, &spec.common, parts, defaults),
            ..Default::default()
        }),
        ..Default::default()
    }
}
