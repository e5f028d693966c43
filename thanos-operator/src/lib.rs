//! Thanos Kubernetes Operator
//!
//! This crate provides a Kubernetes operator that runs the components of a
//! Thanos deployment and keeps them converged on their declared spec.
//!
//! # Custom Resource Definitions
//!
//! - **Querier**: `thanos query` behind a Service (Deployment)
//! - **Store**: `thanos store` gateway behind a Service (Deployment)
//! - **Receiver**: `thanos receive` behind a Service (StatefulSet with a
//!   persistent TSDB volume)
//!
//! # Example
//!
//! ```yaml
//! apiVersion: thanos.orangesys.io/v1beta1
//! kind: Receiver
//! metadata:
//!   name: receiver
//! spec:
//!   objstoreType: GCS
//!   bucketName: thanos-demo
//!   secretName: thanos-demo-gcs
//!   retention: 12h
//!   storage: 10Gi
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod conditions;
pub mod config;
pub mod controller;
pub mod crd;
pub mod error;
pub mod resources;

pub use config::{BuilderDefaults, OperatorConfig};
pub use crd::{Querier, QuerierSpec, Receiver, ReceiverSpec, Role, Store, StoreSpec};
pub use error::{OperatorError, OperatorResult};
