//! Core types for the declarative deployment model.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Returns true if and only if `s` is a valid identifier
/// (`[A-Za-z_][A-Za-z0-9_]*`).
#[must_use]
pub fn is_valid_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// The kind of resource a deployment describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentType {
    /// A long-running Marathon application.
    MarathonApp,
    /// A scheduled Chronos job.
    ChronosJob,
}

impl DeploymentType {
    /// Get the type name as it appears in definition files.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MarathonApp => "marathon_app",
            Self::ChronosJob => "chronos_job",
        }
    }

    /// The framework type that owns deployments of this type.
    #[must_use]
    pub const fn framework(&self) -> FrameworkType {
        match self {
            Self::MarathonApp => FrameworkType::Marathon,
            Self::ChronosJob => FrameworkType::Chronos,
        }
    }
}

impl fmt::Display for DeploymentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for DeploymentType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "marathon_app" => Ok(Self::MarathonApp),
            "chronos_job" => Ok(Self::ChronosJob),
            _ => Err(format!("unknown deployment type: {s}")),
        }
    }
}

/// The kind of Mesos framework a deployment is submitted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FrameworkType {
    /// Marathon, for long-running applications.
    Marathon,
    /// Chronos, for scheduled jobs.
    Chronos,
}

impl FrameworkType {
    /// Get the type name as it appears in definition files.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Marathon => "marathon",
            Self::Chronos => "chronos",
        }
    }
}

impl fmt::Display for FrameworkType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The identity of a deployment: its type and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct DeploymentRef {
    /// The deployment type.
    #[serde(rename = "type")]
    pub kind: DeploymentType,
    /// The deployment name.
    pub name: String,
}

impl DeploymentRef {
    /// Create a new deployment ref.
    #[must_use]
    pub fn new(kind: DeploymentType, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for DeploymentRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.kind, self.name)
    }
}

/// The identity of a framework: its type and name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize)]
pub struct FrameworkRef {
    /// The framework type.
    #[serde(rename = "type")]
    pub kind: FrameworkType,
    /// The framework name.
    pub name: String,
}

impl FrameworkRef {
    /// Create a new framework ref.
    #[must_use]
    pub fn new(kind: FrameworkType, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }
}

impl fmt::Display for FrameworkRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.kind, self.name)
    }
}

/// A resolved edge endpoint: the provider deployment plus whether the
/// dependent must wait for its health phase, not merely its deploy phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DependencyRef {
    /// The deployment this edge points at.
    pub target: DeploymentRef,
    /// Whether the dependent waits for the provider to become healthy.
    pub wait_for_healthy: bool,
}

/// The root of a declarative configuration: a mesos block, framework blocks,
/// and deployment blocks.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Root {
    /// Cluster parameters.
    pub mesos: Option<Mesos>,
    /// Declared frameworks.
    #[serde(default, rename = "framework")]
    pub frameworks: Vec<Framework>,
    /// Declared deployments.
    #[serde(default, rename = "deployment")]
    pub deployments: Vec<Deployment>,
}

/// Parameters of the Apache Mesos cluster itself.
#[derive(Debug, Clone, Deserialize)]
pub struct Mesos {
    /// ZooKeeper connection string.
    pub zookeepers: String,
    /// Mesos master addresses.
    pub masters: Vec<String>,
}

/// A Mesos framework instance, such as a Marathon or Chronos deployment.
#[derive(Debug, Clone, Deserialize)]
pub struct Framework {
    /// The framework type.
    #[serde(rename = "type")]
    pub kind: FrameworkType,
    /// The framework name, referenced by deployments.
    pub name: String,
    /// The name the framework registers with Mesos under.
    pub mesos_name: String,
    /// Framework master addresses.
    pub masters: Vec<String>,
    /// The deployment that brings this framework up, if it is itself
    /// deployed through another framework.
    pub created_by_deployment: Option<DeploymentRef>,
}

impl Framework {
    /// The ref identifying this framework.
    #[must_use]
    pub fn to_ref(&self) -> FrameworkRef {
        FrameworkRef::new(self.kind, self.name.clone())
    }
}

/// A deployment into a Mesos framework.
///
/// If `framework` is not specified it is identical to the value `"default"`.
#[derive(Debug, Clone, Deserialize)]
pub struct Deployment {
    /// The deployment type.
    #[serde(rename = "type")]
    pub kind: DeploymentType,
    /// The deployment name.
    pub name: String,
    /// The framework instance to deploy into.
    pub framework: Option<String>,
    /// Opaque payload reference consumed by the framework adapter.
    pub deploy: String,
    /// Labels for filter-based dependency targeting.
    #[serde(default)]
    pub labels: Vec<String>,
    /// Forward dependencies: deployments that must come up before this one.
    #[serde(default, rename = "dependency")]
    pub dependencies: Vec<DependencySpec>,
    /// Inverse dependencies: deployments that must come up after this one.
    #[serde(default, rename = "dependency_of")]
    pub dependency_of: Vec<DependencySpec>,
}

impl Deployment {
    /// The ref identifying this deployment.
    #[must_use]
    pub fn to_ref(&self) -> DeploymentRef {
        DeploymentRef::new(self.kind, self.name.clone())
    }

    /// The name of the framework this deployment targets.
    #[must_use]
    pub fn framework_name(&self) -> &str {
        self.framework.as_deref().unwrap_or("default")
    }
}

/// An abstract dependency relationship to zero or more deployments.
///
/// A spec takes one of two forms: named (`name` set, no filters, a concrete
/// type) resolving to exactly one deployment, or filtered (`name` empty,
/// filters authoritative) resolving to any number of them. In the filtered
/// form the type may be `"*"` to target all deployment types.
///
/// The type is kept as a raw string so that the resolver owns the
/// unknown-type error rather than the file parser.
#[derive(Debug, Clone, Deserialize)]
pub struct DependencySpec {
    /// `"*"`, `"marathon_app"`, or `"chronos_job"`.
    #[serde(rename = "type")]
    pub target_type: String,
    /// The target name, for the named form.
    pub name: Option<String>,
    /// Whether the dependent waits for the provider's health phase.
    #[serde(default)]
    pub wait_for_healthy: bool,
    /// Filters narrowing the targets, for the filtered form.
    #[serde(default, rename = "filter")]
    pub filters: Vec<Filter>,
}

/// A predicate narrowing the targets of a dependency relationship.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Filter {
    /// The record field to compare against: `name` or `labels`.
    pub key: String,
    /// A single candidate value.
    pub value: Option<String>,
    /// Multiple candidate values; takes precedence over `value` if non-empty.
    pub values: Option<Vec<String>>,
    /// Interpret candidate values as glob patterns.
    #[serde(default)]
    pub glob: bool,
    /// Interpret candidate values as regular expressions.
    #[serde(default)]
    pub regexp: bool,
    /// Invert the match result.
    #[serde(default)]
    pub negate: bool,
}

impl Filter {
    /// An exact-equality filter on the deployment name.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            key: "name".to_owned(),
            value: Some(name.into()),
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identifier_validation() {
        assert!(is_valid_identifier("web_api"));
        assert!(is_valid_identifier("_private"));
        assert!(is_valid_identifier("A1"));
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier("1abc"));
        assert!(!is_valid_identifier("web-api"));
        assert!(!is_valid_identifier("web api"));
    }

    #[test]
    fn deployment_type_roundtrip() {
        assert_eq!(DeploymentType::MarathonApp.as_str(), "marathon_app");
        assert_eq!(
            "chronos_job".parse::<DeploymentType>().unwrap(),
            DeploymentType::ChronosJob
        );
        assert!("frobnicator".parse::<DeploymentType>().is_err());
    }

    #[test]
    fn type_to_framework_mapping() {
        assert_eq!(
            DeploymentType::MarathonApp.framework(),
            FrameworkType::Marathon
        );
        assert_eq!(DeploymentType::ChronosJob.framework(), FrameworkType::Chronos);
    }

    #[test]
    fn ref_display() {
        let r = DeploymentRef::new(DeploymentType::MarathonApp, "web");
        assert_eq!(r.to_string(), "marathon_app.web");
        let f = FrameworkRef::new(FrameworkType::Chronos, "default");
        assert_eq!(f.to_string(), "chronos.default");
    }

    #[test]
    fn framework_name_defaults() {
        let deployment = Deployment {
            kind: DeploymentType::MarathonApp,
            name: "web".to_owned(),
            framework: None,
            deploy: "web.json".to_owned(),
            labels: Vec::new(),
            dependencies: Vec::new(),
            dependency_of: Vec::new(),
        };
        assert_eq!(deployment.framework_name(), "default");
    }
}
