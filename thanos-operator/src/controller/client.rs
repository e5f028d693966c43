//! Cluster access used by the reconciler.
//!
//! The reconciler only talks to the cluster through [`ClusterClient`], so
//! tests can substitute a mock and production wraps a [`kube::Client`].

use crate::crd::{ComponentStatus, Querier, Receiver, Role, Store, ThanosComponent};
use crate::error::OperatorResult;
use crate::resources::{ChildKind, ChildResource};
use async_trait::async_trait;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::Service;
use kube::api::{Api, Patch, PatchParams, PostParams};
use kube::Client;
#[cfg(test)]
use mockall::automock;

/// Field manager recorded on every write.
pub const FIELD_MANAGER: &str = "thanos-operator";

/// Read and write access to parents and their children.
///
/// Reads return `Ok(None)` when the object does not exist. Writes are single
/// attempts; retrying is the scheduler's job.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// Fetch a parent resource.
    async fn get_component(
        &self,
        role: Role,
        namespace: &str,
        name: &str,
    ) -> OperatorResult<Option<ThanosComponent>>;

    /// Fetch a child resource.
    async fn get_child(
        &self,
        kind: ChildKind,
        namespace: &str,
        name: &str,
    ) -> OperatorResult<Option<ChildResource>>;

    /// Create a child resource.
    async fn create_child(
        &self,
        namespace: &str,
        child: &ChildResource,
    ) -> OperatorResult<ChildResource>;

    /// Replace a child resource. The write is rejected when its resource
    /// version no longer matches the stored object.
    async fn replace_child(
        &self,
        namespace: &str,
        child: &ChildResource,
    ) -> OperatorResult<ChildResource>;

    /// Write the status subresource of a parent. The spec is never touched.
    async fn update_status(
        &self,
        role: Role,
        namespace: &str,
        name: &str,
        status: &ComponentStatus,
    ) -> OperatorResult<()>;
}

/// [`ClusterClient`] backed by the Kubernetes API.
#[derive(Clone)]
pub struct KubeClusterClient {
    client: Client,
}

impl KubeClusterClient {
    /// Wrap a Kubernetes client.
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api<K>(&self, namespace: &str) -> Api<K>
    where
        K: kube::Resource<Scope = k8s_openapi::NamespaceResourceScope>,
        <K as kube::Resource>::DynamicType: Default,
    {
        Api::namespaced(self.client.clone(), namespace)
    }

    fn post_params() -> PostParams {
        PostParams {
            field_manager: Some(FIELD_MANAGER.to_string()),
            ..Default::default()
        }
    }
}

#[async_trait]
impl ClusterClient for KubeClusterClient {
    async fn get_component(
        &self,
        role: Role,
        namespace: &str,
        name: &str,
    ) -> OperatorResult<Option<ThanosComponent>> {
        let component = match role {
            Role::Querier => self
                .api::<Querier>(namespace)
                .get_opt(name)
                .await?
                .map(ThanosComponent::from),
            Role::Store => self
                .api::<Store>(namespace)
                .get_opt(name)
                .await?
                .map(ThanosComponent::from),
            Role::Receiver => self
                .api::<Receiver>(namespace)
                .get_opt(name)
                .await?
                .map(ThanosComponent::from),
        };
        Ok(component)
    }

    async fn get_child(
        &self,
        kind: ChildKind,
        namespace: &str,
        name: &str,
    ) -> OperatorResult<Option<ChildResource>> {
        let child = match kind {
            ChildKind::Service => self
                .api::<Service>(namespace)
                .get_opt(name)
                .await?
                .map(ChildResource::Service),
            ChildKind::Deployment => self
                .api::<Deployment>(namespace)
                .get_opt(name)
                .await?
                .map(ChildResource::Deployment),
            ChildKind::StatefulSet => self
                .api::<StatefulSet>(namespace)
                .get_opt(name)
                .await?
                .map(ChildResource::StatefulSet),
        };
        Ok(child)
    }

    async fn create_child(
        &self,
        namespace: &str,
        child: &ChildResource,
    ) -> OperatorResult<ChildResource> {
        let pp = Self::post_params();
        let created = match child {
            ChildResource::Service(svc) => {
                ChildResource::Service(self.api::<Service>(namespace).create(&pp, svc).await?)
            }
            ChildResource::Deployment(deploy) => ChildResource::Deployment(
                self.api::<Deployment>(namespace).create(&pp, deploy).await?,
            ),
            ChildResource::StatefulSet(sts) => ChildResource::StatefulSet(
                self.api::<StatefulSet>(namespace).create(&pp, sts).await?,
            ),
        };
        Ok(created)
    }

    async fn replace_child(
        &self,
        namespace: &str,
        child: &ChildResource,
    ) -> OperatorResult<ChildResource> {
        let pp = Self::post_params();
        let name = child.name().to_string();
        let replaced = match child {
            ChildResource::Service(svc) => ChildResource::Service(
                self.api::<Service>(namespace).replace(&name, &pp, svc).await?,
            ),
            ChildResource::Deployment(deploy) => ChildResource::Deployment(
                self.api::<Deployment>(namespace)
                    .replace(&name, &pp, deploy)
                    .await?,
            ),
            ChildResource::StatefulSet(sts) => ChildResource::StatefulSet(
                self.api::<StatefulSet>(namespace)
                    .replace(&name, &pp, sts)
                    .await?,
            ),
        };
        Ok(replaced)
    }

    async fn update_status(
        &self,
        role: Role,
        namespace: &str,
        name: &str,
        status: &ComponentStatus,
    ) -> OperatorResult<()> {
        let patch = serde_json::json!({ "status": status });
        let pp = PatchParams::default();
        match role {
            Role::Querier => {
                self.api::<Querier>(namespace)
                    .patch_status(name, &pp, &Patch::Merge(&patch))
                    .await?;
            }
            Role::Store => {
                self.api::<Store>(namespace)
                    .patch_status(name, &pp, &Patch::Merge(&patch))
                    .await?;
            }
            Role::Receiver => {
                self.api::<Receiver>(namespace)
                    .patch_status(name, &pp, &Patch::Merge(&patch))
                    .await?;
            }
        }
        Ok(())
    }
}
