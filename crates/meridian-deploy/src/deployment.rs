//! Per-node deployment state machine.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use futures::FutureExt;

use meridian_model::DeploymentRef;

use crate::deployer::Deployer;
use crate::error::{DeployError, DeployResult};
use crate::latch::Latch;

/// The current state of a deployment.
///
/// States are used according to the following diagram:
///
/// ```text
///                        NotReady
///                           | ready()
///                         Ready
///                 deploy() /   \ cancel()
///                 Deploying     Canceled
///                /          \
///   WaitingUntilHealthy      DeployError
///        /          \
///    Healthy     HealthError
/// ```
///
/// A panic inside either phase parks the deployment in `Panic`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Status {
    /// Created but not yet handed to the executor.
    NotReady = 0,
    /// Waiting in the work queue.
    Ready = 1,
    /// Canceled before starting, usually because a dependency failed.
    Canceled = 2,
    /// The deploy phase is running.
    Deploying = 3,
    /// Deployed; the health phase is running.
    WaitingUntilHealthy = 4,
    /// Both phases completed successfully.
    Healthy = 5,
    /// The deploy phase failed.
    DeployError = 6,
    /// The health phase failed.
    HealthError = 7,
    /// A phase panicked.
    Panic = 8,
}

impl Status {
    fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::NotReady,
            1 => Self::Ready,
            2 => Self::Canceled,
            3 => Self::Deploying,
            4 => Self::WaitingUntilHealthy,
            5 => Self::Healthy,
            6 => Self::DeployError,
            7 => Self::HealthError,
            8 => Self::Panic,
            // Raw values only ever originate from Status casts.
            _ => unreachable!("invalid status value {raw}"),
        }
    }

    /// Whether this state has no outgoing transitions.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Canceled | Self::Healthy | Self::DeployError | Self::HealthError | Self::Panic
        )
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NotReady => "not_ready",
            Self::Ready => "ready",
            Self::Canceled => "canceled",
            Self::Deploying => "deploying",
            Self::WaitingUntilHealthy => "waiting_until_healthy",
            Self::Healthy => "healthy",
            Self::DeployError => "deploy_error",
            Self::HealthError => "health_error",
            Self::Panic => "panic",
        };
        write!(f, "{name}")
    }
}

/// The state of one active deployment.
///
/// A deployment has two phases: the actual submission to the framework
/// (deploy phase), then waiting for the deployed resources to become healthy
/// (health phase). Completion of each phase is published through a one-shot
/// latch that any number of dependents can wait on; if the deploy phase
/// fails, both latches release with the same error so that dependents
/// blocked on the health barrier cannot hang.
///
/// All methods are safe to call from multiple tasks concurrently.
pub struct DeploymentHandle {
    target: DeploymentRef,
    deployer: Arc<dyn Deployer>,
    status: AtomicU8,
    deploy_done: Latch,
    healthy_done: Latch,
}

impl DeploymentHandle {
    /// Creates a handle in the `NotReady` state.
    #[must_use]
    pub fn new(target: DeploymentRef, deployer: Arc<dyn Deployer>) -> Self {
        Self {
            target,
            deployer,
            status: AtomicU8::new(Status::NotReady as u8),
            deploy_done: Latch::new(),
            healthy_done: Latch::new(),
        }
    }

    /// The deployment this handle drives.
    #[must_use]
    pub fn target(&self) -> &DeploymentRef {
        &self.target
    }

    /// The current state.
    #[must_use]
    pub fn status(&self) -> Status {
        Status::from_raw(self.status.load(Ordering::SeqCst))
    }

    /// Moves the handle from `NotReady` to `Ready`.
    pub fn ready(&self) -> DeployResult<()> {
        if !self.swap_status(Status::NotReady, Status::Ready) {
            return Err(DeployError::BadState);
        }
        Ok(())
    }

    /// Cancels a deployment that has not started, releasing both latches
    /// with the propagated error.
    ///
    /// Only legal from `Ready`; a deployment that has already begun its
    /// deploy phase cannot be canceled and its outcome will come from the
    /// adapter instead.
    pub fn cancel(&self, error: Arc<DeployError>) -> DeployResult<()> {
        if !self.swap_status(Status::Ready, Status::Canceled) {
            return Err(DeployError::BadState);
        }
        self.deploy_done.release(Err(Arc::clone(&error)));
        self.healthy_done.release(Err(error));
        Ok(())
    }

    /// Runs the deploy phase and, if it succeeds, the health phase.
    ///
    /// Only legal from `Ready`. Returns the shared error that was published
    /// to dependents, if any phase failed.
    pub async fn deploy(&self) -> Result<(), Arc<DeployError>> {
        if !self.swap_status(Status::Ready, Status::Deploying) {
            return Err(Arc::new(DeployError::BadState));
        }

        if let Err(error) = self.run_phase(self.deployer.deploy(&self.target)).await {
            let shared = Arc::new(error);
            self.set_status(Status::DeployError);
            self.deploy_done.release(Err(Arc::clone(&shared)));
            // Dependents blocked on the health barrier observe the deploy
            // failure rather than waiting forever for a phase that will
            // never run.
            self.healthy_done.release(Err(Arc::clone(&shared)));
            return Err(shared);
        }
        self.set_status(Status::WaitingUntilHealthy);
        self.deploy_done.release(Ok(()));

        if let Err(error) = self
            .run_phase(self.deployer.wait_until_healthy(&self.target))
            .await
        {
            let shared = Arc::new(error);
            self.set_status(Status::HealthError);
            self.healthy_done.release(Err(Arc::clone(&shared)));
            return Err(shared);
        }
        self.set_status(Status::Healthy);
        self.healthy_done.release(Ok(()));
        Ok(())
    }

    /// Blocks until the deploy phase has completed, returning its result.
    ///
    /// Can be called any number of times, before or after the phase runs.
    pub async fn wait_deployed(&self) -> Result<(), Arc<DeployError>> {
        self.deploy_done.wait().await
    }

    /// Blocks until the health phase has completed, returning its result.
    /// If the deploy phase failed, this resolves with that same error.
    pub async fn wait_healthy(&self) -> Result<(), Arc<DeployError>> {
        self.healthy_done.wait().await
    }

    /// Runs one adapter phase, converting a panic into the `Panic` state
    /// before re-raising it. Both latches release so that sibling workers
    /// waiting on this node can drain while the executor tears down.
    async fn run_phase(
        &self,
        phase: impl std::future::Future<Output = DeployResult<()>>,
    ) -> DeployResult<()> {
        match AssertUnwindSafe(phase).catch_unwind().await {
            Ok(result) => result,
            Err(panic) => {
                self.set_status(Status::Panic);
                let error = Arc::new(DeployError::Panicked);
                self.deploy_done.release(Err(Arc::clone(&error)));
                self.healthy_done.release(Err(error));
                std::panic::resume_unwind(panic);
            }
        }
    }

    fn set_status(&self, status: Status) {
        self.status.store(status as u8, Ordering::SeqCst);
    }

    fn swap_status(&self, from: Status, to: Status) -> bool {
        self.status
            .compare_exchange(from as u8, to as u8, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok()
    }
}

impl fmt::Debug for DeploymentHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeploymentHandle")
            .field("target", &self.target)
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}
