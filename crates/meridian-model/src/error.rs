//! Error types for meridian-model.

use crate::types::{DeploymentRef, FrameworkRef};

/// Result type alias using [`ModelError`].
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while parsing, validating, resolving, or analysing a
/// deployment configuration.
#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    /// Definition file could not be parsed.
    #[error("parsing definition file: {0}")]
    Parse(#[from] toml::de::Error),

    /// A `${name}` interpolation referenced a variable that is not in scope.
    #[error("undefined variable \"{0}\"")]
    UndefinedVariable(String),

    /// A framework or deployment name is not a valid identifier.
    #[error("invalid {kind} name {name:?}")]
    InvalidName {
        /// What the name belongs to ("framework" or "deployment").
        kind: &'static str,
        /// The offending name.
        name: String,
    },

    /// Two framework blocks share the same (type, name).
    #[error("duplicate framework {0}")]
    DuplicateFramework(FrameworkRef),

    /// Two deployment blocks share the same (type, name).
    #[error("duplicate deployment {0}")]
    DuplicateDeployment(DeploymentRef),

    /// A deployment references a framework that is not declared.
    #[error("no framework {framework} defined for deployment {deployment}")]
    MissingFramework {
        /// The framework the deployment resolves to.
        framework: FrameworkRef,
        /// The deployment that referenced it.
        deployment: DeploymentRef,
    },

    /// A `created_by_deployment` block references an unknown deployment.
    #[error("framework {framework} references unknown deployment {deployment}")]
    UnknownCreatedBy {
        /// The framework carrying the reference.
        framework: FrameworkRef,
        /// The missing deployment.
        deployment: DeploymentRef,
    },

    /// A filter is structurally invalid.
    #[error("malformed filter: {0}")]
    FilterMalformed(&'static str),

    /// A filter key other than `name` or `labels`.
    #[error("unknown filter key {0:?}, only \"name\" and \"labels\" are supported")]
    UnknownFilterKey(String),

    /// A regexp filter value (or a compiled glob) failed to compile.
    #[error("invalid regexp pattern {pattern:?}")]
    InvalidRegexp {
        /// The pattern that failed to compile.
        pattern: String,
        /// The compiler's complaint.
        #[source]
        source: regex::Error,
    },

    /// A glob filter value uses grammar this tool does not support.
    #[error("unsupported glob pattern {pattern:?}: {detail}")]
    UnsupportedGlob {
        /// The offending glob.
        pattern: String,
        /// Which rule it broke.
        detail: String,
    },

    /// A dependency spec sets both a name and filter blocks.
    #[error("dependency can have a name attribute or filter blocks, but not both")]
    AmbiguousForm,

    /// A dependency spec sets a name together with the wildcard type.
    #[error("dependency type cannot be \"*\" when a name is given")]
    WildcardWithName,

    /// A dependency spec names a type other than `*`, `marathon_app`, or
    /// `chronos_job`.
    #[error("unknown dependency type {0:?}, only \"*\", \"marathon_app\", and \"chronos_job\" are supported")]
    UnknownDependencyType(String),

    /// A named dependency matched no deployment.
    #[error("dependent deployment {0} not found")]
    NameNotFound(DeploymentRef),

    /// A named dependency matched more than one deployment.
    #[error("dependent deployment {0} matches more than one deployment")]
    NameAmbiguous(DeploymentRef),

    /// Resolution of a deployment's dependency specs failed.
    #[error("resolving dependencies of deployment {deployment}")]
    Resolve {
        /// The deployment whose specs were being resolved.
        deployment: DeploymentRef,
        /// The underlying resolver or filter error.
        #[source]
        source: Box<ModelError>,
    },

    /// The graph contains dependency cycles and has no deploy order.
    #[error("dependency cycles exist in the deployment graph")]
    Cycles,

    /// A graph query referenced a deployment that was never added.
    #[error("deployment {0} not in graph")]
    NotInGraph(DeploymentRef),
}
