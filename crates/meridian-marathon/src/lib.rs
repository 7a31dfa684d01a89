//! Marathon framework client and deployment adapter.
//!
//! [`Client`] speaks the two corners of the Marathon HTTP API this tool
//! needs: submitting app definitions (`POST /v2/apps`) and streaming
//! server-sent events (`GET /v2/events`) for health observation.
//! [`MarathonDeployer`] wires both behind the `meridian-deploy`
//! [`Deployer`](meridian_deploy::Deployer) contract.

pub mod client;
pub mod deployer;
pub mod error;
pub mod sse;
pub mod types;

pub use client::Client;
pub use deployer::MarathonDeployer;
pub use error::{MarathonError, MarathonResult};
pub use sse::{EventParser, StreamEvent};
pub use types::{AppDefinition, DeployResponse};
