//! Declarative deployment model for Mesos frameworks.
//!
//! This crate owns everything that happens before a single framework call is
//! made: the data model for deployment definitions, parsing the definition
//! file (with `${var}` interpolation), pre-build validation, filter matching,
//! dependency resolution, and the dependency graph with its analysis
//! operations (cycle detection, deploy ordering, per-node dependencies).
//!
//! The graph is built once from the validated records and queried read-only
//! afterwards; execution lives in `meridian-deploy`.

pub mod config;
pub mod error;
pub mod filter;
pub mod graph;
pub mod resolve;
pub mod types;
pub mod validate;

pub use error::{ModelError, ModelResult};
pub use graph::DependencyGraph;
pub use types::{
    is_valid_identifier, Deployment, DeploymentRef, DeploymentType, DependencyRef, DependencySpec,
    Filter, Framework, FrameworkRef, FrameworkType, Mesos, Root,
};
pub use validate::validate;
