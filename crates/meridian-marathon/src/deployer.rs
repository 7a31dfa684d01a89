//! The Marathon-backed implementation of the deployment adapter contract.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use meridian_deploy::{DeployError, Deployer, DeployResult};
use meridian_model::DeploymentRef;

use crate::client::Client;
use crate::error::MarathonResult;
use crate::sse::StreamEvent;
use crate::types::{AppDefinition, DeploymentEventPayload};

const EVENT_FANOUT_CAPACITY: usize = 256;

/// Deploys Marathon apps and observes their health through the event
/// stream.
///
/// Each deployment's app definition is looked up by ref. `deploy` submits
/// the definition and remembers the Marathon deployment id;
/// `wait_until_healthy` then waits for a `deployment_success` or
/// `deployment_failed` event carrying that id. The subscription to the
/// event fan-out is taken before submission, so a completion event that
/// arrives between the two calls is buffered rather than missed.
pub struct MarathonDeployer {
    client: Client,
    apps: HashMap<DeploymentRef, AppDefinition>,
    wait_timeout: Duration,
    events: broadcast::Sender<StreamEvent>,
    deployments: DashMap<DeploymentRef, String>,
    subscriptions: DashMap<DeploymentRef, broadcast::Receiver<StreamEvent>>,
}

impl MarathonDeployer {
    /// Creates a deployer over `client` for the given app definitions.
    #[must_use]
    pub fn new(
        client: Client,
        apps: HashMap<DeploymentRef, AppDefinition>,
        wait_timeout: Duration,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_FANOUT_CAPACITY);
        Self {
            client,
            apps,
            wait_timeout,
            events,
            deployments: DashMap::new(),
            subscriptions: DashMap::new(),
        }
    }

    /// Starts forwarding the Marathon event stream into the internal
    /// fan-out. Returns the task driving the stream; cancel `stop` to end
    /// it.
    pub fn start_event_stream(&self, stop: CancellationToken) -> JoinHandle<MarathonResult<()>> {
        let client = self.client.clone();
        let fanout = self.events.clone();
        tokio::spawn(async move {
            let (tx, mut rx) = mpsc::channel(EVENT_FANOUT_CAPACITY);
            let forwarder = tokio::spawn(async move {
                while let Some(event) = rx.recv().await {
                    // A send error only means no subscriber is currently
                    // listening, which is fine between deployments.
                    let _ = fanout.send(event);
                }
            });
            let result = client.stream_events(tx, stop).await;
            let _ = forwarder.await;
            result
        })
    }

    fn app_for(&self, target: &DeploymentRef) -> DeployResult<&AppDefinition> {
        self.apps.get(target).ok_or_else(|| DeployError::Deploy {
            target: target.clone(),
            reason: "no app definition for deployment".to_owned(),
        })
    }
}

#[async_trait]
impl Deployer for MarathonDeployer {
    async fn deploy(&self, target: &DeploymentRef) -> DeployResult<()> {
        let app = self.app_for(target)?;
        // Subscribe before submitting so the completion event cannot slip
        // past between submission and the health wait.
        self.subscriptions.insert(target.clone(), self.events.subscribe());
        let response = self
            .client
            .deploy_app(app)
            .await
            .map_err(|error| DeployError::Deploy {
                target: target.clone(),
                reason: error.to_string(),
            })?;
        debug!(
            target = %target,
            deployment_id = %response.deployment_id,
            "app submitted"
        );
        self.deployments
            .insert(target.clone(), response.deployment_id);
        Ok(())
    }

    async fn wait_until_healthy(&self, target: &DeploymentRef) -> DeployResult<()> {
        let app = self.app_for(target).map_err(|_| DeployError::Health {
            target: target.clone(),
            reason: "no app definition for deployment".to_owned(),
        })?;
        if app.health_checks.is_empty() {
            // Nothing to observe; the app has no health concept.
            return Ok(());
        }
        let deployment_id = self
            .deployments
            .get(target)
            .map(|id| id.value().clone())
            .ok_or_else(|| DeployError::Health {
                target: target.clone(),
                reason: "deployment was never submitted".to_owned(),
            })?;
        let (_, mut subscription) =
            self.subscriptions
                .remove(target)
                .ok_or_else(|| DeployError::Health {
                    target: target.clone(),
                    reason: "no event subscription for deployment".to_owned(),
                })?;

        let health_error = |reason: String| DeployError::Health {
            target: target.clone(),
            reason,
        };
        let wait = async {
            loop {
                match subscription.recv().await {
                    Ok(event) => {
                        let concluded = match event.kind.as_str() {
                            "deployment_success" => Ok(()),
                            "deployment_failed" => Err("framework reported deployment failed"),
                            _ => continue,
                        };
                        match serde_json::from_str::<DeploymentEventPayload>(&event.data) {
                            Ok(payload) if payload.id == deployment_id => {
                                return concluded
                                    .map_err(|reason| health_error(reason.to_owned()));
                            }
                            Ok(_) => {}
                            Err(error) => {
                                warn!(kind = %event.kind, error = %error, "undecodable deployment event");
                            }
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        warn!(target = %target, missed, "event subscription lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        return Err(health_error("event stream closed".to_owned()));
                    }
                }
            }
        };
        tokio::time::timeout(self.wait_timeout, wait)
            .await
            .map_err(|_| {
                health_error(format!(
                    "timed out after {:?} waiting for deployment {deployment_id}",
                    self.wait_timeout
                ))
            })?
    }
}

impl std::fmt::Debug for MarathonDeployer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarathonDeployer")
            .field("apps", &self.apps.len())
            .field("wait_timeout", &self.wait_timeout)
            .finish_non_exhaustive()
    }
}
