//! Wire types for the Marathon HTTP API.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// A Marathon application definition, submitted as the deployment payload.
///
/// This covers the fields the deployment definitions in this tool actually
/// set; Marathon tolerates the rest being absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppDefinition {
    /// Application id, e.g. `/web/api`.
    pub id: String,
    /// Command to run.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cmd: Option<String>,
    /// Arguments, used instead of `cmd` for containerised apps.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
    /// CPU shares per instance.
    #[serde(default)]
    pub cpus: f64,
    /// Memory per instance, in MiB.
    #[serde(default)]
    pub mem: f64,
    /// Scratch disk per instance, in MiB.
    #[serde(default)]
    pub disk: f64,
    /// Number of instances to run.
    #[serde(default)]
    pub instances: i32,
    /// Environment variables.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub env: HashMap<String, String>,
    /// Labels, also visible to dependency filters upstream.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub labels: HashMap<String, String>,
    /// Container specification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub container: Option<Container>,
    /// Health checks; an app without any has no health phase to wait for.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub health_checks: Vec<HealthCheck>,
    /// Artifact URIs fetched before launch.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub uris: Vec<String>,
}

/// Container specification for an app.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Container {
    /// Container type, usually `DOCKER`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Docker-specific settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub docker: Option<Docker>,
    /// Volume mounts.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub volumes: Vec<Volume>,
}

/// Docker settings within a container specification.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Docker {
    /// Image to run.
    pub image: String,
    /// Always pull the image before launching.
    #[serde(default)]
    pub force_pull_image: bool,
    /// Docker network mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network: Option<String>,
    /// Port mappings for bridged networking.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub port_mappings: Vec<PortMapping>,
}

/// A container port mapping.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PortMapping {
    /// Port inside the container.
    pub container_port: i32,
    /// Port on the host; zero for dynamic allocation.
    #[serde(default)]
    pub host_port: i32,
    /// Service port for discovery.
    #[serde(default)]
    pub service_port: i32,
    /// Protocol, `tcp` or `udp`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
}

/// A volume mount.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    /// Mount path inside the container.
    pub container_path: String,
    /// Path on the host.
    pub host_path: String,
    /// Mount mode, `RO` or `RW`.
    pub mode: String,
}

/// A Marathon health check.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthCheck {
    /// Check protocol, e.g. `HTTP` or `TCP`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    /// Path for HTTP checks.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Grace period before the first check, in seconds.
    #[serde(default)]
    pub grace_period_seconds: i32,
    /// Interval between checks, in seconds.
    #[serde(default)]
    pub interval_seconds: i32,
    /// Per-check timeout, in seconds.
    #[serde(default)]
    pub timeout_seconds: i32,
    /// Failures tolerated before the task is killed.
    #[serde(default)]
    pub max_consecutive_failures: i32,
    /// Which port definition the check targets.
    #[serde(default)]
    pub port_index: i32,
}

/// Response to a successful app submission.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployResponse {
    /// The Marathon deployment id tracking the rollout.
    pub deployment_id: String,
    /// The app version created by the submission.
    #[serde(default)]
    pub version: String,
}

/// The payload of deployment lifecycle events on the event stream.
#[derive(Debug, Clone, Deserialize)]
pub struct DeploymentEventPayload {
    /// The Marathon deployment id the event refers to.
    pub id: String,
}
