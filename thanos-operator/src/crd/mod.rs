//! Custom Resource Definitions for the Thanos operator.
//!
//! This module defines the CRDs that the operator manages:
//!
//! - [`Querier`]: a `thanos query` deployment
//! - [`Store`]: a `thanos store` gateway deployment
//! - [`Receiver`]: a `thanos receive` stateful set
//!
//! [`Role`] names the component kind explicitly and [`ThanosComponent`]
//! carries any of the three, so the reconciler is written once.

mod common;
mod querier;
mod receiver;
mod store;

pub use common::{CommonSpec, ComponentStatus, ObjectStorageSpec, PodMetadata};
pub use querier::{Querier, QuerierSpec};
pub use receiver::{Receiver, ReceiverSpec};
pub use store::{Store, StoreSpec};

use crate::error::{OperatorError, OperatorResult};
use crate::resources::ChildKind;
use k8s_openapi::apimachinery::pkg::apis::meta::v1::{ObjectMeta, OwnerReference};
use kube::{Resource, ResourceExt};
use std::fmt;

/// The three Thanos components the operator can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    /// Stateless query aggregation.
    Querier,
    /// Stateless object-store gateway.
    Store,
    /// Stateful remote-write ingestion.
    Receiver,
}

impl Role {
    /// Every role, in registration order.
    pub const ALL: [Role; 3] = [Role::Querier, Role::Store, Role::Receiver];

    /// Kind of the parent custom resource.
    pub fn kind(self) -> &'static str {
        match self {
            Role::Querier => "Querier",
            Role::Store => "Store",
            Role::Receiver => "Receiver",
        }
    }

    /// Value of the `app` pod label and the `service` label.
    pub fn app_label(self) -> &'static str {
        match self {
            Role::Querier => "querier",
            Role::Store => "store",
            Role::Receiver => "receiver",
        }
    }

    /// Thanos subcommand the container runs.
    pub fn subcommand(self) -> &'static str {
        match self {
            Role::Querier => "query",
            Role::Store => "store",
            Role::Receiver => "receive",
        }
    }

    /// Workload kind backing the role.
    pub fn workload_kind(self) -> ChildKind {
        match self {
            Role::Querier | Role::Store => ChildKind::Deployment,
            Role::Receiver => ChildKind::StatefulSet,
        }
    }

    /// Child kinds in apply order. The Service comes first so a StatefulSet
    /// can reference it as its governing service.
    pub fn child_kinds(self) -> [ChildKind; 2] {
        [ChildKind::Service, self.workload_kind()]
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind())
    }
}

/// A fetched parent resource of any role.
#[derive(Debug, Clone)]
pub enum ThanosComponent {
    /// A Querier resource.
    Querier(Querier),
    /// A Store resource.
    Store(Store),
    /// A Receiver resource.
    Receiver(Receiver),
}

impl ThanosComponent {
    /// Role of the wrapped resource.
    pub fn role(&self) -> Role {
        match self {
            ThanosComponent::Querier(_) => Role::Querier,
            ThanosComponent::Store(_) => Role::Store,
            ThanosComponent::Receiver(_) => Role::Receiver,
        }
    }

    /// Object metadata of the wrapped resource.
    pub fn meta(&self) -> &ObjectMeta {
        match self {
            ThanosComponent::Querier(q) => q.meta(),
            ThanosComponent::Store(s) => s.meta(),
            ThanosComponent::Receiver(r) => r.meta(),
        }
    }

    /// Resource name.
    pub fn name(&self) -> String {
        match self {
            ThanosComponent::Querier(q) => q.name_any(),
            ThanosComponent::Store(s) => s.name_any(),
            ThanosComponent::Receiver(r) => r.name_any(),
        }
    }

    /// Resource namespace.
    pub fn namespace(&self) -> Option<String> {
        self.meta().namespace.clone()
    }

    /// Current status, if any was persisted.
    pub fn status(&self) -> Option<&ComponentStatus> {
        match self {
            ThanosComponent::Querier(q) => q.status.as_ref(),
            ThanosComponent::Store(s) => s.status.as_ref(),
            ThanosComponent::Receiver(r) => r.status.as_ref(),
        }
    }

    /// Common spec fields.
    pub fn common(&self) -> &CommonSpec {
        match self {
            ThanosComponent::Querier(q) => &q.spec.common,
            ThanosComponent::Store(s) => &s.spec.common,
            ThanosComponent::Receiver(r) => &r.spec.common,
        }
    }

    /// Validate the spec of the wrapped resource.
    pub fn validate(&self) -> OperatorResult<()> {
        match self {
            ThanosComponent::Querier(q) => q.spec.validate(),
            ThanosComponent::Store(s) => s.spec.validate(),
            ThanosComponent::Receiver(r) => r.spec.validate(),
        }
    }

    /// Controller owner reference pointing at this resource.
    ///
    /// Fails when the resource has no uid, i.e. it was never persisted.
    pub fn owner_reference(&self) -> OperatorResult<OwnerReference> {
        let owner = match self {
            ThanosComponent::Querier(q) => q.controller_owner_ref(&()),
            ThanosComponent::Store(s) => s.controller_owner_ref(&()),
            ThanosComponent::Receiver(r) => r.controller_owner_ref(&()),
        };
        owner.ok_or_else(|| {
            OperatorError::InvalidConfig(format!(
                "{} {} has no uid, cannot own children",
                self.role(),
                self.name()
            ))
        })
    }
}

impl From<Querier> for ThanosComponent {
    fn from(q: Querier) -> Self {
        ThanosComponent::Querier(q)
    }
}

impl From<Store> for ThanosComponent {
    fn from(s: Store) -> Self {
        ThanosComponent::Store(s)
    }
}

impl From<Receiver> for ThanosComponent {
    fn from(r: Receiver) -> Self {
        ThanosComponent::Receiver(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn receiver(uid: Option<&str>) -> ThanosComponent {
        let mut r = Receiver::new("receiver-a", ReceiverSpec::default());
        r.metadata.namespace = Some("monitoring".into());
        r.metadata.uid = uid.map(str::to_string);
        r.into()
    }

    #[test]
    fn role_child_sets() {
        assert_eq!(
            Role::Querier.child_kinds(),
            [ChildKind::Service, ChildKind::Deployment]
        );
        assert_eq!(
            Role::Store.child_kinds(),
            [ChildKind::Service, ChildKind::Deployment]
        );
        assert_eq!(
            Role::Receiver.child_kinds(),
            [ChildKind::Service, ChildKind::StatefulSet]
        );
    }

    #[test]
    fn subcommands() {
        assert_eq!(Role::Querier.subcommand(), "query");
        assert_eq!(Role::Store.subcommand(), "store");
        assert_eq!(Role::Receiver.subcommand(), "receive");
    }

    #[test]
    fn owner_reference_points_at_parent() {
        let owner = receiver(Some("uid-1"))
            .owner_reference()
            .expect("persisted parent");
        assert_eq!(owner.kind, "Receiver");
        assert_eq!(owner.name, "receiver-a");
        assert_eq!(owner.uid, "uid-1");
        assert_eq!(owner.api_version, "thanos.orangesys.io/v1beta1");
        assert_eq!(owner.controller, Some(true));
    }

    #[test]
    fn owner_reference_requires_uid() {
        assert!(receiver(None).owner_reference().is_err());
    }

    #[test]
    fn role_is_taken_from_variant_not_name() {
        let mut q = Querier::new("receiver-lookalike", QuerierSpec::default());
        q.metadata.namespace = Some("monitoring".into());
        assert_eq!(ThanosComponent::from(q).role(), Role::Querier);
    }
}
