//! Error types for meridian-deploy.

use std::sync::Arc;

use meridian_model::{DeploymentRef, ModelError};

/// Result type alias using [`DeployError`].
pub type DeployResult<T> = Result<T, DeployError>;

/// Errors that can occur while executing a deployment graph.
///
/// Errors observed by multiple waiters (everything published through a
/// deployment's completion latches) are shared as `Arc<DeployError>`; the
/// wrapping variants here carry those shared causes as sources.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// An illegal state-machine transition was attempted.
    #[error("deployment is not ready or has already started")]
    BadState,

    /// The worker pool size is zero.
    #[error("worker pool size must be at least one")]
    NoWorkers,

    /// The framework adapter failed or refused the deploy request.
    #[error("failed to deploy {target} to framework: {reason}")]
    Deploy {
        /// The deployment being submitted.
        target: DeploymentRef,
        /// What the adapter reported.
        reason: String,
    },

    /// The framework adapter failed while waiting for health.
    #[error("failed waiting for framework to consider {target} healthy: {reason}")]
    Health {
        /// The deployment being watched.
        target: DeploymentRef,
        /// What the adapter reported.
        reason: String,
    },

    /// A dependency never finished its deploy phase successfully.
    #[error("dependency {dependency} failed to deploy")]
    DependencyFailed {
        /// The failed provider.
        dependency: DeploymentRef,
        /// The provider's own failure.
        #[source]
        source: Arc<DeployError>,
    },

    /// A dependency deployed but never became healthy.
    #[error("dependency {dependency} failed to become healthy")]
    DependencyUnhealthy {
        /// The unhealthy provider.
        dependency: DeploymentRef,
        /// The provider's own failure.
        #[source]
        source: Arc<DeployError>,
    },

    /// Per-deployment failure as reported back to the caller.
    #[error("deploying {target}")]
    Failed {
        /// The deployment that failed.
        target: DeploymentRef,
        /// What went wrong.
        #[source]
        source: Arc<DeployError>,
    },

    /// A resolved dependency has no per-node state object.
    #[error("no deployment state exists for dependency {0}")]
    MissingDependency(DeploymentRef),

    /// A deploy or health phase panicked; the run is being torn down.
    #[error("deployment task panicked")]
    Panicked,

    /// A graph analysis operation failed.
    #[error(transparent)]
    Model(#[from] ModelError),
}
