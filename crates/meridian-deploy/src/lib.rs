//! Concurrent, dependency-conscious deployment execution.
//!
//! Given a built [`meridian_model::DependencyGraph`], the
//! [`GraphExecutor`] deploys every node with a bounded worker pool while
//! honoring per-edge barriers: a deployment starts only once each of its
//! dependencies has finished its deploy phase (and, where an edge says so,
//! its health phase too). Failures propagate forward: dependents of a failed
//! deployment are canceled without ever touching the framework.
//!
//! The actual framework calls go through the [`Deployer`] trait; a
//! [`MockDeployer`] is provided for tests and dry runs against nothing.

pub mod deployer;
pub mod deployment;
pub mod error;
pub mod event;
pub mod executor;
mod latch;
mod queue;

pub use deployer::{Deployer, MockDeployer};
pub use deployment::{DeploymentHandle, Status};
pub use error::{DeployError, DeployResult};
pub use event::{Event, EventKind};
pub use executor::{DeployStats, GraphExecutor};
