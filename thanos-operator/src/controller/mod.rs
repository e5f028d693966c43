//! Kubernetes controllers for Thanos components.
//!
//! One [`ComponentController`] per [`Role`] drives the reconciliation pass:
//! fetch the parent, guard and apply each child, read back child status,
//! persist the parent status.
//!
//! - [`client`]: the cluster access seam ([`ClusterClient`])
//! - [`ownership`]: refuses to touch children owned by someone else
//! - [`apply`]: create-or-update with a no-op when nothing changed
//! - [`runner`]: wires a controller into `kube::runtime`
//!
//! # Usage with kube-runtime
//!
//! ```ignore
//! use thanos_operator::controller::{runner, ControllerContext};
//! use thanos_operator::crd::Role;
//!
//! let ctx = Arc::new(ControllerContext::from_client(client.clone(), config));
//! runner::run(client, Role::Receiver, ctx).await;
//! ```
//!
//! [`Role`]: crate::crd::Role

pub mod apply;
pub mod client;
mod component;
pub mod ownership;
pub mod runner;

pub use client::{ClusterClient, KubeClusterClient};
pub use component::{record_child_status, ComponentController};

use crate::config::OperatorConfig;
use std::sync::Arc;
use std::time::Duration;

/// Shared context for controllers.
pub struct ControllerContext {
    /// Cluster access.
    pub client: Arc<dyn ClusterClient>,
    /// Builder defaults and loop settings.
    pub config: Arc<OperatorConfig>,
}

impl ControllerContext {
    /// Create a new controller context.
    pub fn new(client: Arc<dyn ClusterClient>, config: Arc<OperatorConfig>) -> Self {
        Self { client, config }
    }

    /// Context backed by a live Kubernetes client.
    pub fn from_client(client: kube::Client, config: OperatorConfig) -> Self {
        Self::new(Arc::new(KubeClusterClient::new(client)), Arc::new(config))
    }
}

/// Result type for reconciliation actions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileAction {
    /// Requeue after the specified duration.
    Requeue(Duration),
    /// Don't requeue; wait for the next change event.
    Done,
}

impl ReconcileAction {
    /// Translate into the kube runtime action.
    pub fn into_action(self) -> kube::runtime::controller::Action {
        match self {
            ReconcileAction::Requeue(duration) => kube::runtime::controller::Action::requeue(duration),
            ReconcileAction::Done => kube::runtime::controller::Action::await_change(),
        }
    }
}
