//! Integration tests for desired-state builders.
//!
//! Manifests go in as YAML, children come out as typed objects.

use k8s_openapi::apimachinery::pkg::api::resource::Quantity;
use kube::CustomResourceExt;
use thanos_operator::crd::{Querier, Receiver, Store, ThanosComponent};
use thanos_operator::resources::{desired_child, ChildKind, ChildResource};
use thanos_operator::BuilderDefaults;

fn component<K>(yaml: &str) -> ThanosComponent
where
    K: serde::de::DeserializeOwned + Into<ThanosComponent>,
{
    let object: K = serde_yaml::from_str(yaml).expect("manifest");
    object.into()
}

fn args(child: &ChildResource) -> Vec<String> {
    let template = match child {
        ChildResource::Deployment(d) => d.spec.as_ref().map(|s| s.template.clone()),
        ChildResource::StatefulSet(s) => s.spec.as_ref().map(|s| s.template.clone()),
        ChildResource::Service(_) => None,
    };
    template
        .and_then(|t| t.spec)
        .and_then(|p| p.containers.into_iter().next())
        .and_then(|c| c.args)
        .unwrap_or_default()
}

#[test]
fn receiver_with_empty_storage_settings_gets_defaults() {
    let receiver = component::<Receiver>(
        r#"
apiVersion: thanos.orangesys.io/v1beta1
kind: Receiver
metadata:
  name: receiver
  namespace: monitoring
spec:
  objstoreType: GCS
  bucketName: thanos-demo
  secretName: thanos-demo-gcs
  storage: ""
  retention: ""
  receivePrefix: ""
"#,
    );

    let child = desired_child(&receiver, ChildKind::StatefulSet, &BuilderDefaults::default())
        .expect("build");
    let ChildResource::StatefulSet(sts) = &child else {
        panic!("receiver must produce a stateful set");
    };

    let claims = sts
        .spec
        .as_ref()
        .and_then(|s| s.volume_claim_templates.clone())
        .expect("claim templates");
    let requests = claims[0]
        .spec
        .as_ref()
        .and_then(|s| s.resources.as_ref())
        .and_then(|r| r.requests.as_ref())
        .expect("requests");
    assert_eq!(requests["storage"], Quantity("2Gi".into()));

    let args = args(&child);
    assert_eq!(args[0], "receive");
    assert!(args.contains(&"--tsdb.retention=24h".to_string()));
    assert!(args.contains(&"--tsdb.path=/thanos-receive".to_string()));
}

#[test]
fn querier_args_follow_replica_label_and_log_level() {
    let querier = component::<Querier>(
        r#"
apiVersion: thanos.orangesys.io/v1beta1
kind: Querier
metadata:
  name: query
  namespace: monitoring
spec:
  replicaLabel: replica
  logLevel: debug
"#,
    );

    let child = desired_child(&querier, ChildKind::Deployment, &BuilderDefaults::default())
        .expect("build");
    assert_eq!(
        args(&child),
        vec!["query", "--query.replica-label=replica", "--log.level=debug"]
    );
}

#[test]
fn store_memory_request_follows_small_limit() {
    let store = component::<Store>(
        r#"
apiVersion: thanos.orangesys.io/v1beta1
kind: Store
metadata:
  name: store
  namespace: monitoring
spec:
  objstoreType: GCS
  bucketName: thanos-demo
  secretName: thanos-demo-gcs
  resources:
    limits:
      memory: 512Mi
"#,
    );

    let child = desired_child(&store, ChildKind::Deployment, &BuilderDefaults::default())
        .expect("build");
    let ChildResource::Deployment(deploy) = child else {
        panic!("store must produce a deployment");
    };
    let container = deploy
        .spec
        .and_then(|s| s.template.spec)
        .map(|p| p.containers[0].clone())
        .expect("container");
    let requests = container.resources.and_then(|r| r.requests).expect("requests");
    assert_eq!(requests["memory"], Quantity("512Mi".into()));
}

#[test]
fn every_role_builds_a_service_named_after_the_parent() {
    let defaults = BuilderDefaults::default();
    let parents = [
        component::<Querier>(
            "apiVersion: thanos.orangesys.io/v1beta1\nkind: Querier\nmetadata: {name: q, namespace: ns}\nspec: {}\n",
        ),
        component::<Store>(
            "apiVersion: thanos.orangesys.io/v1beta1\nkind: Store\nmetadata: {name: s, namespace: ns}\nspec: {}\n",
        ),
        component::<Receiver>(
            "apiVersion: thanos.orangesys.io/v1beta1\nkind: Receiver\nmetadata: {name: r, namespace: ns}\nspec: {}\n",
        ),
    ];

    for parent in &parents {
        for kind in parent.role().child_kinds() {
            let child = desired_child(parent, kind, &defaults).expect("build");
            assert_eq!(child.kind(), kind);
            assert_eq!(child.name(), parent.name());
            assert_eq!(child.metadata().namespace.as_deref(), Some("ns"));
        }
    }
}

#[test]
fn crds_are_generated_for_every_kind() {
    for (crd, kind) in [
        (Querier::crd(), "Querier"),
        (Store::crd(), "Store"),
        (Receiver::crd(), "Receiver"),
    ] {
        assert_eq!(crd.spec.group, "thanos.orangesys.io");
        assert_eq!(crd.spec.names.kind, kind);
        assert_eq!(crd.spec.versions[0].name, "v1beta1");
        assert!(crd.spec.versions[0].subresources.is_some());
    }
}
