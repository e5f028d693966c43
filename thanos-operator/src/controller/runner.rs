//! Registration of the component controllers with `kube::runtime`.
//!
//! Each role watches its parent kind and owns the Service plus its workload
//! kind, so edits to generated children re-trigger the parent.

use super::{ComponentController, ControllerContext};
use crate::crd::{Querier, Receiver, Role, Store};
use crate::error::{OperatorError, OperatorResult};
use crate::resources::ChildKind;
use futures::StreamExt;
use k8s_openapi::api::apps::v1::{Deployment, StatefulSet};
use k8s_openapi::api::core::v1::Service;
use kube::runtime::controller::Action;
use kube::runtime::watcher::Config as WatcherConfig;
use kube::runtime::Controller;
use kube::{Api, Client, Resource, ResourceExt};
use serde::de::DeserializeOwned;
use std::fmt::Debug;
use std::sync::Arc;

/// Run the controller for `role` until shutdown is signalled.
pub async fn run(client: Client, role: Role, ctx: Arc<ControllerContext>) {
    match role {
        Role::Querier => run_for::<Querier>(client, role, ctx).await,
        Role::Store => run_for::<Store>(client, role, ctx).await,
        Role::Receiver => run_for::<Receiver>(client, role, ctx).await,
    }
}

async fn run_for<K>(client: Client, role: Role, ctx: Arc<ControllerContext>)
where
    K: Resource<DynamicType = ()> + Clone + DeserializeOwned + Debug + Send + Sync + 'static,
{
    tracing::info!(kind = %role, "Starting controller");

    let parents: Api<K> = Api::all(client.clone());
    let controller = ComponentController::new(ctx.clone(), role);

    let watched = Controller::new(parents, WatcherConfig::default())
        .owns(Api::<Service>::all(client.clone()), WatcherConfig::default());
    let watched = match role.workload_kind() {
        ChildKind::StatefulSet => {
            watched.owns(Api::<StatefulSet>::all(client), WatcherConfig::default())
        }
        _ => watched.owns(Api::<Deployment>::all(client), WatcherConfig::default()),
    };

    watched
        .shutdown_on_signal()
        .run(
            move |object, _ctx| {
                let controller = controller.clone();
                async move { reconcile(&controller, object).await }
            },
            error_policy::<K>,
            ctx,
        )
        .for_each(|result| async move {
            match result {
                Ok((obj, action)) => {
                    tracing::debug!(
                        kind = %role,
                        name = %obj.name,
                        ?action,
                        "Reconciled"
                    );
                }
                Err(e) => {
                    tracing::error!(kind = %role, error = %e, "Controller stream error");
                }
            }
        })
        .await;

    tracing::info!(kind = %role, "Controller stopped");
}

/// Reconcile the object delivered by the runtime.
pub async fn reconcile<K>(controller: &ComponentController, object: Arc<K>) -> OperatorResult<Action>
where
    K: ResourceExt,
{
    let name = object.name_any();
    let namespace = object.namespace().ok_or_else(|| {
        OperatorError::InvalidConfig(format!("{} {} must be namespaced", controller.role(), name))
    })?;

    let action = controller.reconcile(&namespace, &name).await?;
    Ok(action.into_action())
}

/// Error policy for the component controllers.
pub fn error_policy<K>(
    object: Arc<K>,
    error: &OperatorError,
    ctx: Arc<ControllerContext>,
) -> Action
where
    K: ResourceExt,
{
    tracing::error!(
        name = %object.name_any(),
        namespace = ?object.namespace(),
        error = %error,
        "Reconciliation error"
    );
    Action::requeue(ctx.config.controller.error_requeue())
}
