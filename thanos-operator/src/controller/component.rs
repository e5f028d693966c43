//! Reconciler shared by the Querier, Store and Receiver controllers.

use super::apply::{create_or_update, ApplyOutcome};
use super::ownership::foreign_owner;
use super::{ControllerContext, ReconcileAction};
use crate::conditions::{self, set_condition, Condition};
use crate::crd::{ComponentStatus, Role};
use crate::error::{OperatorError, OperatorResult};
use crate::resources::{desired_child, ChildKind, ChildResource};
use std::sync::Arc;

/// Controller for one Thanos role.
#[derive(Clone)]
pub struct ComponentController {
    ctx: Arc<ControllerContext>,
    role: Role,
}

impl ComponentController {
    /// Create a controller for `role`.
    pub fn new(ctx: Arc<ControllerContext>, role: Role) -> Self {
        Self { ctx, role }
    }

    /// Role this controller reconciles.
    pub fn role(&self) -> Role {
        self.role
    }

    /// Run one reconciliation pass for the parent `namespace/name`.
    ///
    /// This:
    /// 1. Fetches the parent (gone means nothing to do)
    /// 2. Validates the spec
    /// 3. Guards and applies each child, Service first
    /// 4. Reads back the live status of every applied child
    /// 5. Persists the parent status
    pub async fn reconcile(&self, namespace: &str, name: &str) -> OperatorResult<ReconcileAction> {
        let client = &self.ctx.client;

        let Some(parent) = client.get_component(self.role, namespace, name).await? else {
            tracing::info!(
                kind = %self.role,
                name = %name,
                namespace = %namespace,
                "Parent not found, nothing to reconcile"
            );
            return Ok(ReconcileAction::Done);
        };

        tracing::info!(
            kind = %self.role,
            name = %name,
            namespace = %namespace,
            "Reconciling"
        );

        let mut status = parent.status().cloned().unwrap_or_default();
        status.observed_generation = parent.meta().generation;

        if let Err(e) = parent.validate() {
            tracing::warn!(kind = %self.role, name = %name, error = %e, "Invalid spec");
            set_condition(
                &mut status.conditions,
                Condition::unhealthy(
                    conditions::SPEC_VALID,
                    conditions::REASON_INVALID_SPEC,
                    e.to_string(),
                ),
            );
            self.persist_status(namespace, name, &status).await?;
            return Ok(ReconcileAction::Done);
        }
        set_condition(
            &mut status.conditions,
            Condition::healthy(conditions::SPEC_VALID, conditions::REASON_VALID_SPEC, ""),
        );

        let owner = parent.owner_reference()?;
        let mut applied = Vec::new();
        let mut orphaned = false;

        for kind in self.role.child_kinds() {
            let existing = match client.get_child(kind, namespace, name).await {
                Ok(existing) => existing,
                Err(e) => {
                    tracing::error!(
                        kind = %kind,
                        name = %name,
                        namespace = %namespace,
                        error = %e,
                        "Failed to fetch child"
                    );
                    let message = e.to_string();
                    self.record_failure(
                        &mut status,
                        namespace,
                        name,
                        kind,
                        conditions::REASON_READ_ERROR,
                        &message,
                    )
                    .await;
                    return Err(e);
                }
            };

            if let Some(foreign) = existing
                .as_ref()
                .and_then(|child| foreign_owner(child.metadata(), self.role.kind(), name))
            {
                tracing::warn!(
                    kind = %kind,
                    name = %name,
                    namespace = %namespace,
                    owner_kind = %foreign.kind,
                    owner_name = %foreign.name,
                    "Child is owned by another resource, leaving it alone"
                );
                set_condition(
                    &mut status.conditions,
                    Condition::unhealthy(
                        kind.condition_type(),
                        kind.orphan_reason(),
                        format!(
                            "{} {} is owned by {} {}",
                            kind, name, foreign.kind, foreign.name
                        ),
                    ),
                );
                orphaned = true;
                continue;
            }

            let mut desired = desired_child(&parent, kind, &self.ctx.config.defaults)?;
            desired.set_controller_owner(owner.clone());

            match create_or_update(client.as_ref(), namespace, existing, desired).await {
                Ok(outcome) => {
                    log_outcome(kind, name, namespace, &outcome);
                    set_condition(
                        &mut status.conditions,
                        Condition::healthy(kind.condition_type(), kind.ensured_reason(), ""),
                    );
                    applied.push(kind);
                }
                Err(e) => {
                    tracing::error!(
                        kind = %kind,
                        name = %name,
                        namespace = %namespace,
                        error = %e,
                        "Failed to apply child"
                    );
                    let cause = e.to_string();
                    self.record_failure(
                        &mut status,
                        namespace,
                        name,
                        kind,
                        conditions::REASON_UPDATE_ERROR,
                        &cause,
                    )
                    .await;
                    return Err(OperatorError::ApplyError {
                        kind: kind.to_string(),
                        name: name.to_string(),
                        cause,
                    });
                }
            }
        }

        for kind in applied {
            let cause = match client.get_child(kind, namespace, name).await {
                Ok(Some(child)) => {
                    record_child_status(&mut status, &child);
                    continue;
                }
                Ok(None) => "not found after apply".to_string(),
                Err(e) => e.to_string(),
            };
            tracing::error!(
                kind = %kind,
                name = %name,
                namespace = %namespace,
                error = %cause,
                "Failed to read back child"
            );
            self.record_failure(
                &mut status,
                namespace,
                name,
                kind,
                conditions::REASON_READ_BACK_ERROR,
                &cause,
            )
            .await;
            return Err(OperatorError::ReadBackError {
                kind: kind.to_string(),
                name: name.to_string(),
                cause,
            });
        }

        self.persist_status(namespace, name, &status).await?;

        if orphaned {
            Ok(ReconcileAction::Requeue(
                self.ctx.config.controller.orphan_requeue(),
            ))
        } else {
            Ok(ReconcileAction::Done)
        }
    }

    /// Mark the condition for `kind` unhealthy and try to persist the status.
    ///
    /// A failed write is only logged; the caller returns its own error.
    async fn record_failure(
        &self,
        status: &mut ComponentStatus,
        namespace: &str,
        name: &str,
        kind: ChildKind,
        reason: &str,
        message: &str,
    ) {
        set_condition(
            &mut status.conditions,
            Condition::unhealthy(kind.condition_type(), reason, message),
        );
        if let Err(persist_err) = self.persist_status(namespace, name, status).await {
            tracing::warn!(
                kind = %self.role,
                name = %name,
                child = %kind,
                reason = %reason,
                error = %persist_err,
                "Failed to record child error on status"
            );
        }
    }

    async fn persist_status(
        &self,
        namespace: &str,
        name: &str,
        status: &ComponentStatus,
    ) -> OperatorResult<()> {
        self.ctx
            .client
            .update_status(self.role, namespace, name, status)
            .await
            .map_err(|e| OperatorError::StatusUpdateError {
                kind: self.role.to_string(),
                name: name.to_string(),
                cause: e.to_string(),
            })
    }
}

fn log_outcome(kind: ChildKind, name: &str, namespace: &str, outcome: &ApplyOutcome) {
    match outcome {
        ApplyOutcome::Unchanged(_) => {
            tracing::debug!(kind = %kind, name = %name, namespace = %namespace, "Child up to date")
        }
        _ => tracing::info!(
            kind = %kind,
            name = %name,
            namespace = %namespace,
            outcome = %outcome,
            "Applied child"
        ),
    }
}

/// Mirror the live status of `child` onto the parent status.
pub fn record_child_status(status: &mut ComponentStatus, child: &ChildResource) {
    match child {
        ChildResource::Service(svc) => {
            status.service_status = svc.status.clone();
        }
        ChildResource::Deployment(deploy) => {
            let live = deploy.status.clone().unwrap_or_default();
            status.replicas = live.replicas.unwrap_or(0);
            status.ready_replicas = live.ready_replicas.unwrap_or(0);
            status.updated_replicas = live.updated_replicas.unwrap_or(0);
            status.available_replicas = live.available_replicas.unwrap_or(0);
            status.unavailable_replicas = live.unavailable_replicas.unwrap_or(0);
            status.deployment_status = Some(live);
        }
        ChildResource::StatefulSet(sts) => {
            let live = sts.status.clone().unwrap_or_default();
            status.replicas = live.replicas;
            status.ready_replicas = live.ready_replicas.unwrap_or(0);
            status.updated_replicas = live.updated_replicas.unwrap_or(0);
            status.available_replicas = live.available_replicas.unwrap_or(0);
            status.unavailable_replicas = (live.replicas - status.available_replicas).max(0);
            status.stateful_set_status = Some(live);
        }
    }
}
