//! Error types for the Thanos Kubernetes operator.

use thiserror::Error;

/// Errors that can occur during operator operations.
#[derive(Debug, Error)]
pub enum OperatorError {
    /// Kubernetes API error.
    #[error("Kubernetes API error: {0}")]
    KubeError(#[from] kube::Error),

    /// Resource not found.
    #[error("Resource not found: {kind}/{name} in namespace {namespace}")]
    NotFound {
        /// Resource kind.
        kind: String,
        /// Resource name.
        name: String,
        /// Resource namespace.
        namespace: String,
    },

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Spec validation error.
    #[error("Spec validation failed: {0}")]
    ValidationError(String),

    /// Creating or replacing a child resource failed.
    #[error("Failed to apply {kind}/{name}: {cause}")]
    ApplyError {
        /// Child resource kind.
        kind: String,
        /// Child resource name.
        name: String,
        /// Error cause.
        cause: String,
    },

    /// Re-reading an applied child resource failed.
    #[error("Failed to read back {kind}/{name}: {cause}")]
    ReadBackError {
        /// Child resource kind.
        kind: String,
        /// Child resource name.
        name: String,
        /// Error cause.
        cause: String,
    },

    /// Persisting the parent status failed.
    #[error("Failed to update status of {kind}/{name}: {cause}")]
    StatusUpdateError {
        /// Parent resource kind.
        kind: String,
        /// Parent resource name.
        name: String,
        /// Error cause.
        cause: String,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

/// Result type for operator operations.
pub type OperatorResult<T> = Result<T, OperatorError>;

impl OperatorError {
    /// Whether this error means the addressed object does not exist.
    pub fn is_not_found(&self) -> bool {
        match self {
            OperatorError::NotFound { .. } => true,
            OperatorError::KubeError(err) => is_kube_not_found(err),
            _ => false,
        }
    }
}

/// Classify a raw kube error as "object absent".
pub fn is_kube_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(resp) if resp.code == 404)
}

impl From<serde_json::Error> for OperatorError {
    fn from(err: serde_json::Error) -> Self {
        OperatorError::SerializationError(err.to_string())
    }
}

impl From<serde_yaml::Error> for OperatorError {
    fn from(err: serde_yaml::Error) -> Self {
        OperatorError::SerializationError(err.to_string())
    }
}
