//! The worker-pool scheduler that deploys a whole graph.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tracing::{debug, info};

use meridian_model::{DependencyGraph, DeploymentRef, DependencyRef};

use crate::deployer::Deployer;
use crate::deployment::DeploymentHandle;
use crate::error::{DeployError, DeployResult};
use crate::event::{Event, EventKind};
use crate::queue::WorkQueue;

/// Statistics on the results of a deployment run.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeployStats {
    /// How many deployments the graph contained.
    pub total: u32,
    /// How many completed both phases successfully.
    pub successful: u32,
    /// How many failed or were canceled.
    pub failed: u32,
    /// Wall-clock time from start to worker-pool drain.
    pub elapsed: Duration,
}

/// Executes the ordered, dependency-conscious deployment of every resource
/// in a graph using a fixed pool of workers.
///
/// A single executor is meant to execute a single run.
pub struct GraphExecutor {
    graph: Arc<DependencyGraph>,
    deployer: Arc<dyn Deployer>,
    max_deploy: usize,
    stats: DeployStats,
}

/// State shared by the executor and its workers for one run.
struct RunShared {
    graph: Arc<DependencyGraph>,
    queue: WorkQueue<Arc<DeploymentHandle>>,
    handles: HashMap<DeploymentRef, Arc<DeploymentHandle>>,
    events: Option<mpsc::Sender<Event>>,
    successful: AtomicU32,
    failed: AtomicU32,
    first_error: Mutex<Option<DeployError>>,
}

impl RunShared {
    /// Sends an event to the observer, if one is attached. A slow observer
    /// blocks the sender; backpressure is intentional and preserves event
    /// ordering per worker.
    async fn emit(
        &self,
        worker: usize,
        kind: EventKind,
        target: DeploymentRef,
        dependency: Option<DependencyRef>,
        error: Option<Arc<DeployError>>,
    ) {
        if let Some(events) = &self.events {
            let _ = events
                .send(Event {
                    kind,
                    worker,
                    target,
                    dependency,
                    error,
                })
                .await;
        }
    }

    /// Retains the first reported failure; later failures are counted but
    /// not stored.
    fn record_error(&self, error: DeployError) {
        let mut slot = self.first_error.lock().expect("error slot poisoned");
        if slot.is_none() {
            *slot = Some(error);
        }
    }
}

impl GraphExecutor {
    /// Creates an executor for the given graph, adapter, and worker count.
    pub fn new(
        graph: Arc<DependencyGraph>,
        deployer: Arc<dyn Deployer>,
        max_deploy: usize,
    ) -> DeployResult<Self> {
        if max_deploy == 0 {
            return Err(DeployError::NoWorkers);
        }
        Ok(Self {
            graph,
            deployer,
            max_deploy,
            stats: DeployStats::default(),
        })
    }

    /// Statistics on the run; only meaningful after [`GraphExecutor::run`]
    /// has returned.
    #[must_use]
    pub fn stats(&self) -> DeployStats {
        self.stats
    }

    /// Executes the deployment, blocking until every worker has drained.
    ///
    /// Provide an events channel to observe progress; it closes once the run
    /// returns. The returned error is the first failure of the run, if any.
    pub async fn run(&mut self, events: Option<mpsc::Sender<Event>>) -> DeployResult<()> {
        let started = Instant::now();
        let order = self.graph.deploy_order()?;
        self.stats.total = order.len() as u32;

        let mut handles = HashMap::with_capacity(order.len());
        let mut pending = Vec::with_capacity(order.len());
        for target in order {
            let handle = Arc::new(DeploymentHandle::new(target, Arc::clone(&self.deployer)));
            handle.ready()?;
            handles.insert(handle.target().clone(), Arc::clone(&handle));
            pending.push(handle);
        }

        let shared = Arc::new(RunShared {
            graph: Arc::clone(&self.graph),
            queue: WorkQueue::new(self.max_deploy),
            handles,
            events,
            successful: AtomicU32::new(0),
            failed: AtomicU32::new(0),
            first_error: Mutex::new(None),
        });

        info!(
            total = self.stats.total,
            workers = self.max_deploy,
            "starting graph deployment"
        );
        let workers: Vec<_> = (1..=self.max_deploy)
            .map(|worker| {
                let shared = Arc::clone(&shared);
                tokio::spawn(worker_main(shared, worker))
            })
            .collect();

        // Emit-then-push: observers always see Enqueued before the work can
        // be dequeued. Reverse-topological push order means a worker never
        // picks up a node before its dependencies are at least enqueued.
        for handle in pending {
            shared
                .emit(0, EventKind::Enqueued, handle.target().clone(), None, None)
                .await;
            shared.queue.push(handle).await;
        }
        shared.queue.close();

        let mut panic = None;
        for worker in workers {
            if let Err(join_error) = worker.await {
                if join_error.is_panic() && panic.is_none() {
                    panic = Some(join_error.into_panic());
                }
            }
        }
        if let Some(panic) = panic {
            std::panic::resume_unwind(panic);
        }

        self.stats.successful = shared.successful.load(Ordering::SeqCst);
        self.stats.failed = shared.failed.load(Ordering::SeqCst);
        self.stats.elapsed = started.elapsed();
        info!(
            successful = self.stats.successful,
            failed = self.stats.failed,
            elapsed = ?self.stats.elapsed,
            "graph deployment finished"
        );

        let first_error = shared
            .first_error
            .lock()
            .expect("error slot poisoned")
            .take();
        match first_error {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

impl std::fmt::Debug for GraphExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GraphExecutor")
            .field("max_deploy", &self.max_deploy)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

/// Worker loop: drain the queue until it is closed and empty.
async fn worker_main(shared: Arc<RunShared>, worker: usize) {
    while let Some(deployment) = shared.queue.next().await {
        let target = deployment.target().clone();
        shared
            .emit(worker, EventKind::Dequeued, target.clone(), None, None)
            .await;
        debug!(worker, target = %target, "deployment dequeued");

        match deploy_one(&shared, worker, &deployment).await {
            Ok(()) => {
                shared.successful.fetch_add(1, Ordering::SeqCst);
                shared
                    .emit(worker, EventKind::DeploymentSuccess, target, None, None)
                    .await;
            }
            Err(cause) => {
                // If it is too late to cancel, the error came from the
                // deployment itself and the latches already carry it.
                let _ = deployment.cancel(Arc::clone(&cause));
                shared.failed.fetch_add(1, Ordering::SeqCst);
                shared.record_error(DeployError::Failed {
                    target: target.clone(),
                    source: Arc::clone(&cause),
                });
                shared
                    .emit(
                        worker,
                        EventKind::DeploymentFailure,
                        target,
                        None,
                        Some(cause),
                    )
                    .await;
            }
        }
    }
    debug!(worker, "worker drained");
}

/// Waits out the dependency barriers of one deployment, then runs it.
async fn deploy_one(
    shared: &RunShared,
    worker: usize,
    deployment: &Arc<DeploymentHandle>,
) -> Result<(), Arc<DeployError>> {
    let target = deployment.target();
    let dependencies = shared
        .graph
        .dependencies(target)
        .map_err(|error| Arc::new(DeployError::Model(error)))?;
    shared
        .emit(
            worker,
            EventKind::DependenciesResolved,
            target.clone(),
            None,
            None,
        )
        .await;

    for dependency in dependencies {
        let provider = shared
            .handles
            .get(&dependency.target)
            .ok_or_else(|| Arc::new(DeployError::MissingDependency(dependency.target.clone())))?;

        if let Err(source) = provider.wait_deployed().await {
            shared
                .emit(
                    worker,
                    EventKind::DependencyFailure,
                    target.clone(),
                    Some(dependency.clone()),
                    Some(Arc::clone(&source)),
                )
                .await;
            return Err(Arc::new(DeployError::DependencyFailed {
                dependency: dependency.target,
                source,
            }));
        }
        if dependency.wait_for_healthy {
            if let Err(source) = provider.wait_healthy().await {
                shared
                    .emit(
                        worker,
                        EventKind::DependencyFailure,
                        target.clone(),
                        Some(dependency.clone()),
                        Some(Arc::clone(&source)),
                    )
                    .await;
                return Err(Arc::new(DeployError::DependencyUnhealthy {
                    dependency: dependency.target,
                    source,
                }));
            }
        }
        shared
            .emit(
                worker,
                EventKind::DependencySuccess,
                target.clone(),
                Some(dependency),
                None,
            )
            .await;
    }

    shared
        .emit(
            worker,
            EventKind::DeploymentStarted,
            target.clone(),
            None,
            None,
        )
        .await;
    deployment.deploy().await
}
