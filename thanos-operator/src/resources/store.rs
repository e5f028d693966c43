//! Store gateway workload builder.

use super::{
    child_metadata, common_ports, credentials_env, credentials_mount, credentials_volume,
    objstore_config_arg, pod_labels, pod_template, thanos_args, PodParts,
};
use crate::config::BuilderDefaults;
use crate::crd::{Role, StoreSpec};
use k8s_openapi::api::apps::v1::{Deployment, DeploymentSpec};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::LabelSelector;

/// Arguments for `thanos store`. `spec` must already carry defaults.
pub fn args(spec: &StoreSpec, defaults: &BuilderDefaults) -> Vec<String> {
    let flags = vec![
        format!("--index-cache-size={}", spec.index_cache_size),
        format!("--chunk-pool-size={}", spec.chunk_pool_size),
        format!("--data-dir={}", spec.data_dir),
        objstore_config_arg(&spec.object_storage),
    ];
    thanos_args(Role::Store, flags, &spec.common.log_level, &defaults.log_level)
}

/// Build the Deployment running `thanos store`.
pub fn build_deployment(
    spec: &StoreSpec,
    name: &str,
    namespace: &str,
    defaults: &BuilderDefaults,
) -> Deployment {
    let spec = spec.with_defaults(defaults);
    let labels = pod_labels(Role::Store, name, &spec.common, defaults);

    let parts = PodParts {
        args: args(&spec, defaults),
        env: credentials_env(&spec.object_storage, defaults),
        ports: common_ports(defaults),
        volume_mounts: vec![credentials_mount(defaults)],
        volumes: vec![credentials_volume(&spec.object_storage, defaults)],
    };

    Deployment {
        metadata: child_metadata(Role::Store, name, namespace, defaults),
        spec: Some(DeploymentSpec {
            replicas: spec.common.replicas,
            selector: LabelSelector {
                match_labels: Some(labels.clone()),
                ..Default::default()
            },
            template: pod_template(Role::Store, labels, &spec.common, parts, defaults),
            ..Default::default()
        }),
        ..Default::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crd::ObjectStorageSpec;

    fn store() -> StoreSpec {
        StoreSpec {
            object_storage: ObjectStorageSpec {
                objstore_type: "GCS".into(),
                bucket_name: "thanos-demo".into(),
                secret_name: "thanos-demo-gcs".into(),
            },
            ..Default::default()
        }
    }

    #[test]
    fn args_in_order() {
        let defaults = BuilderDefaults::default();
        let spec = store().with_defaults(&defaults);
        assert_eq!(
            args(&spec, &defaults),
            vec![
                "store",
                "--index-cache-size=250MB",
                "--chunk-pool-size=2GB",
                "--data-dir=/var/thanos/store",
                "--objstore.config=type: GCS\nconfig:\n  bucket: \"thanos-demo\"",
            ]
        );
    }

    #[test]
    fn deployment_mounts_credentials() {
        let deploy = build_deployment(&store(), "store", "monitoring", &BuilderDefaults::default());
        let pod = deploy.spec.unwrap().template.spec.unwrap();
        let container = &pod.containers[0];

        let volumes = pod.volumes.unwrap();
        assert_eq!(volumes.len(), 1);
        assert_eq!(volumes[0].name, "google-cloud-key");
        assert_eq!(
            volumes[0].secret.as_ref().unwrap().secret_name.as_deref(),
            Some("thanos-demo-gcs")
        );

        let mounts = container.volume_mounts.as_ref().unwrap();
        assert_eq!(mounts[0].mount_path, "/etc/thanos/secrets/");

        let env = container.env.as_ref().unwrap();
        assert_eq!(env[0].name, "GOOGLE_APPLICATION_CREDENTIALS");
        assert_eq!(
            env[0].value.as_deref(),
            Some("/etc/thanos/secrets/thanos-demo-gcs.json")
        );
    }
}
