//! The event stream produced by the executor for observers.

use std::sync::Arc;

use meridian_model::{DeploymentRef, DependencyRef};

use crate::error::DeployError;

/// What happened to a deployment.
///
/// For a single deployment, events follow this shape (with possible
/// repetition of the dependency pair):
///
/// ```text
///             Enqueued
///                |
///             Dequeued
///                |
///        DependenciesResolved
///        /                  \
///  {DependencySuccess}   DependencyFailure
///        |                       |
///  DeploymentStarted             |
///   /            \               |
///  DeploymentSuccess   DeploymentFailure
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// The deployment was placed on the work queue.
    Enqueued,
    /// A worker picked the deployment up.
    Dequeued,
    /// The worker resolved the deployment's outgoing dependencies.
    DependenciesResolved,
    /// A dependency failed; the deployment will be canceled.
    DependencyFailure,
    /// A dependency barrier was satisfied.
    DependencySuccess,
    /// The deploy phase is starting.
    DeploymentStarted,
    /// Both phases completed successfully.
    DeploymentSuccess,
    /// The deployment failed or was canceled.
    DeploymentFailure,
}

impl EventKind {
    /// Stable name for logs.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Enqueued => "enqueued",
            Self::Dequeued => "dequeued",
            Self::DependenciesResolved => "dependencies_resolved",
            Self::DependencyFailure => "dependency_failure",
            Self::DependencySuccess => "dependency_success",
            Self::DeploymentStarted => "deployment_started",
            Self::DeploymentSuccess => "deployment_success",
            Self::DeploymentFailure => "deployment_failure",
        }
    }
}

/// One observation from the executor.
///
/// `worker` is zero for events emitted by the executor itself (enqueueing)
/// and the worker's id (starting from one) otherwise.
#[derive(Debug, Clone)]
pub struct Event {
    /// What happened.
    pub kind: EventKind,
    /// Which worker it happened on.
    pub worker: usize,
    /// The deployment it happened to.
    pub target: DeploymentRef,
    /// The dependency involved, for dependency events.
    pub dependency: Option<DependencyRef>,
    /// The failure involved, for failure events.
    pub error: Option<Arc<DeployError>>,
}
