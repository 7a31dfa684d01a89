//! Shared fixtures for executor integration tests.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use meridian_deploy::{Deployer, DeployResult, Event};
use meridian_model::{Deployment, DeploymentRef, DeploymentType, DependencySpec};
use tokio::sync::mpsc;

/// Builder for deployment records in tests.
pub struct RecordBuilder {
    record: Deployment,
}

impl RecordBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            record: Deployment {
                kind: DeploymentType::MarathonApp,
                name: name.to_owned(),
                framework: None,
                deploy: format!("{name}.json"),
                labels: Vec::new(),
                dependencies: Vec::new(),
                dependency_of: Vec::new(),
            },
        }
    }

    pub fn depends_on(mut self, name: &str, wait_for_healthy: bool) -> Self {
        self.record.dependencies.push(DependencySpec {
            target_type: "marathon_app".to_owned(),
            name: Some(name.to_owned()),
            wait_for_healthy,
            filters: Vec::new(),
        });
        self
    }

    pub fn build(self) -> Deployment {
        self.record
    }
}

pub fn record(name: &str) -> RecordBuilder {
    RecordBuilder::new(name)
}

pub fn target(name: &str) -> DeploymentRef {
    DeploymentRef::new(DeploymentType::MarathonApp, name)
}

/// A deployer that records the interleaving of phase boundaries, for
/// happens-before assertions.
pub struct RecordingDeployer {
    inner: Arc<dyn Deployer>,
    log: Mutex<Vec<String>>,
}

impl RecordingDeployer {
    pub fn new(inner: Arc<dyn Deployer>) -> Self {
        Self {
            inner,
            log: Mutex::new(Vec::new()),
        }
    }

    pub fn log(&self) -> Vec<String> {
        self.log.lock().unwrap().clone()
    }

    fn push(&self, entry: String) {
        self.log.lock().unwrap().push(entry);
    }

    /// Index of `entry` in the log; panics if absent.
    pub fn position(&self, entry: &str) -> usize {
        self.log()
            .iter()
            .position(|e| e == entry)
            .unwrap_or_else(|| panic!("{entry} not in log"))
    }
}

#[async_trait]
impl Deployer for RecordingDeployer {
    async fn deploy(&self, target: &DeploymentRef) -> DeployResult<()> {
        self.push(format!("deploy_start:{}", target.name));
        let result = self.inner.deploy(target).await;
        self.push(format!("deploy_end:{}", target.name));
        result
    }

    async fn wait_until_healthy(&self, target: &DeploymentRef) -> DeployResult<()> {
        self.push(format!("healthy_start:{}", target.name));
        let result = self.inner.wait_until_healthy(target).await;
        self.push(format!("healthy_end:{}", target.name));
        result
    }
}

/// A deployer that panics while deploying one specific target.
pub struct PanickingDeployer {
    pub panic_on: DeploymentRef,
}

#[async_trait]
impl Deployer for PanickingDeployer {
    async fn deploy(&self, target: &DeploymentRef) -> DeployResult<()> {
        assert!(
            target != &self.panic_on,
            "injected panic deploying {target}"
        );
        Ok(())
    }

    async fn wait_until_healthy(&self, _target: &DeploymentRef) -> DeployResult<()> {
        Ok(())
    }
}

/// Spawns a collector draining an event channel into a Vec.
pub fn collect_events(
    capacity: usize,
) -> (mpsc::Sender<Event>, tokio::task::JoinHandle<Vec<Event>>) {
    let (tx, mut rx) = mpsc::channel(capacity);
    let collector = tokio::spawn(async move {
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        events
    });
    (tx, collector)
}
