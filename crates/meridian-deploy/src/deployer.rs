//! The framework adapter contract and its mock implementation.

use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use meridian_model::DeploymentRef;

use crate::error::{DeployError, DeployResult};

/// Implemented by any mechanism capable of deploying a resource to a
/// framework and checking its health.
#[async_trait]
pub trait Deployer: Send + Sync {
    /// Submits the deployment of `target`, blocking until the framework
    /// acknowledges completion of the submission.
    async fn deploy(&self, target: &DeploymentRef) -> DeployResult<()>;

    /// Blocks until the framework reports the deployed resources of `target`
    /// healthy. Frameworks or resources without a health concept should
    /// return quickly with no error.
    async fn wait_until_healthy(&self, target: &DeploymentRef) -> DeployResult<()>;
}

/// A deployer that deploys to nothing, with configurable latency and failure
/// injection. Used by tests and by the CLI's simulated execution run.
#[derive(Debug, Default)]
pub struct MockDeployer {
    deploy_latency: Option<(Duration, Duration)>,
    healthy_latency: Option<(Duration, Duration)>,
    deploy_error_chance: f32,
    healthy_error_chance: f32,
    deploy_deadline: Option<Duration>,
    healthy_deadline: Option<Duration>,
    fail_deploy: Mutex<HashSet<DeploymentRef>>,
    fail_healthy: Mutex<HashSet<DeploymentRef>>,
    active: AtomicUsize,
    peak_active: AtomicUsize,
}

impl MockDeployer {
    /// A mock with no latency and no failures.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep a random duration in `[min, max]` during each deploy call.
    #[must_use]
    pub fn with_deploy_latency(mut self, min: Duration, max: Duration) -> Self {
        self.deploy_latency = Some((min, max));
        self
    }

    /// Sleep a random duration in `[min, max]` during each health call.
    #[must_use]
    pub fn with_healthy_latency(mut self, min: Duration, max: Duration) -> Self {
        self.healthy_latency = Some((min, max));
        self
    }

    /// Fail each phase independently with the given probabilities.
    #[must_use]
    pub fn with_error_chances(mut self, deploy: f32, healthy: f32) -> Self {
        self.deploy_error_chance = deploy;
        self.healthy_error_chance = healthy;
        self
    }

    /// Honor per-call deadlines: a phase that outlasts its deadline fails.
    #[must_use]
    pub fn with_deadlines(mut self, deploy: Duration, healthy: Duration) -> Self {
        self.deploy_deadline = Some(deploy);
        self.healthy_deadline = Some(healthy);
        self
    }

    /// Script the deploy phase of `target` to fail.
    pub fn fail_deploy_of(&self, target: DeploymentRef) {
        self.fail_deploy
            .lock()
            .expect("mock deployer lock poisoned")
            .insert(target);
    }

    /// Script the health phase of `target` to fail.
    pub fn fail_health_of(&self, target: DeploymentRef) {
        self.fail_healthy
            .lock()
            .expect("mock deployer lock poisoned")
            .insert(target);
    }

    /// The largest number of deploy calls that were ever in flight at once.
    #[must_use]
    pub fn peak_concurrency(&self) -> usize {
        self.peak_active.load(Ordering::SeqCst)
    }

    async fn simulate(
        &self,
        latency: Option<(Duration, Duration)>,
        deadline: Option<Duration>,
        error_chance: f32,
        scripted_failure: bool,
        failure: impl FnOnce() -> DeployError,
    ) -> DeployResult<()> {
        if let Some((min, max)) = latency {
            let mut rng = SmallRng::from_entropy();
            let wait = if max > min { rng.gen_range(min..=max) } else { min };
            match deadline {
                Some(deadline) if wait > deadline => {
                    tokio::time::sleep(deadline).await;
                    return Err(failure());
                }
                _ => tokio::time::sleep(wait).await,
            }
        }
        if scripted_failure {
            return Err(failure());
        }
        if error_chance > 0.0 && SmallRng::from_entropy().gen::<f32>() < error_chance {
            return Err(failure());
        }
        Ok(())
    }
}

#[async_trait]
impl Deployer for MockDeployer {
    async fn deploy(&self, target: &DeploymentRef) -> DeployResult<()> {
        let active = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_active.fetch_max(active, Ordering::SeqCst);
        let scripted = self
            .fail_deploy
            .lock()
            .expect("mock deployer lock poisoned")
            .contains(target);
        let result = self
            .simulate(
                self.deploy_latency,
                self.deploy_deadline,
                self.deploy_error_chance,
                scripted,
                || DeployError::Deploy {
                    target: target.clone(),
                    reason: "mock deploy failure".to_owned(),
                },
            )
            .await;
        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn wait_until_healthy(&self, target: &DeploymentRef) -> DeployResult<()> {
        let scripted = self
            .fail_healthy
            .lock()
            .expect("mock deployer lock poisoned")
            .contains(target);
        self.simulate(
            self.healthy_latency,
            self.healthy_deadline,
            self.healthy_error_chance,
            scripted,
            || DeployError::Health {
                target: target.clone(),
                reason: "mock health failure".to_owned(),
            },
        )
        .await
    }
}
