//! The deployment dependency graph and its analysis operations.

use std::collections::{BTreeMap, HashMap, VecDeque};

use crate::error::{ModelError, ModelResult};
use crate::resolve;
use crate::types::{Deployment, DeploymentRef, DependencyRef, DependencySpec};

/// A directed graph of deployments connected by their dependencies.
///
/// An edge `i -> k` means deployment `i` depends on deployment `k`: `k` must
/// deploy before `i`. Each edge carries whether the dependent additionally
/// waits for the provider's health phase; inserting the same edge twice keeps
/// the stronger requirement.
///
/// The graph is constructed once from a record list and queried read-only.
/// Ideally it is a DAG; [`DependencyGraph::deploy_order`] refuses to produce
/// an order otherwise, while [`DependencyGraph::cycles`] reports what went
/// wrong.
#[derive(Debug)]
pub struct DependencyGraph {
    deployments: Vec<DeploymentRef>,
    index: HashMap<DeploymentRef, usize>,
    /// Outgoing edges per vertex: target index -> wait_for_healthy.
    edges: Vec<BTreeMap<usize, bool>>,
}

impl DependencyGraph {
    /// Builds a graph from the given deployment records.
    ///
    /// Records are assigned dense indices in list order. Forward
    /// (`dependency`) specs insert edges from the declaring record to each
    /// resolved target; inverse (`dependency_of`) specs insert edges from
    /// each resolved target back to the declaring record, carrying the
    /// spec's `wait_for_healthy` either way.
    pub fn build(deployments: &[Deployment]) -> ModelResult<Self> {
        let mut graph = Self {
            deployments: deployments.iter().map(Deployment::to_ref).collect(),
            index: HashMap::with_capacity(deployments.len()),
            edges: vec![BTreeMap::new(); deployments.len()],
        };
        for (i, target) in graph.deployments.iter().enumerate() {
            graph.index.insert(target.clone(), i);
        }
        for (i, deployment) in deployments.iter().enumerate() {
            let resolve_all = |spec: &DependencySpec| {
                resolve::targets(spec, deployments).map_err(|source| ModelError::Resolve {
                    deployment: deployment.to_ref(),
                    source: Box::new(source),
                })
            };
            for spec in &deployment.dependencies {
                for k in resolve_all(spec)? {
                    graph.insert_edge(i, k, spec.wait_for_healthy);
                }
            }
            for spec in &deployment.dependency_of {
                for k in resolve_all(spec)? {
                    graph.insert_edge(k, i, spec.wait_for_healthy);
                }
            }
        }
        Ok(graph)
    }

    fn insert_edge(&mut self, from: usize, to: usize, wait_for_healthy: bool) {
        // Healthy wins when the same pair is inserted more than once.
        self.edges[from]
            .entry(to)
            .and_modify(|healthy| *healthy |= wait_for_healthy)
            .or_insert(wait_for_healthy);
    }

    /// The number of deployments in the graph.
    #[must_use]
    pub fn len(&self) -> usize {
        self.deployments.len()
    }

    /// Whether the graph is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.deployments.is_empty()
    }

    /// The refs of all deployments, in record order.
    #[must_use]
    pub fn refs(&self) -> &[DeploymentRef] {
        &self.deployments
    }

    /// Returns every dependency cycle in the graph: the strongly-connected
    /// components of size two or more.
    #[must_use]
    pub fn cycles(&self) -> Vec<Vec<DeploymentRef>> {
        self.strong_components()
            .into_iter()
            .filter(|component| component.len() >= 2)
            .map(|component| {
                component
                    .into_iter()
                    .map(|v| self.deployments[v].clone())
                    .collect()
            })
            .collect()
    }

    /// Returns all deployments sorted in the order they would be deployed:
    /// the reverse of a topological sort, so every deployment appears after
    /// the deployments it depends on.
    ///
    /// Fails if and only if the graph has cycles.
    pub fn deploy_order(&self) -> ModelResult<Vec<DeploymentRef>> {
        let n = self.deployments.len();
        let mut indegree = vec![0usize; n];
        for targets in &self.edges {
            for &to in targets.keys() {
                indegree[to] += 1;
            }
        }
        let mut queue: VecDeque<usize> = (0..n).filter(|&v| indegree[v] == 0).collect();
        let mut sorted = Vec::with_capacity(n);
        while let Some(v) = queue.pop_front() {
            sorted.push(v);
            for &to in self.edges[v].keys() {
                indegree[to] -= 1;
                if indegree[to] == 0 {
                    queue.push_back(to);
                }
            }
        }
        if sorted.len() != n {
            return Err(ModelError::Cycles);
        }
        Ok(sorted
            .into_iter()
            .rev()
            .map(|v| self.deployments[v].clone())
            .collect())
    }

    /// Returns the resolved dependencies of a deployment: its outgoing
    /// neighbors with the health flag each edge carries.
    ///
    /// Fails if and only if the deployment is not in the graph.
    pub fn dependencies(&self, deployment: &DeploymentRef) -> ModelResult<Vec<DependencyRef>> {
        let v = *self
            .index
            .get(deployment)
            .ok_or_else(|| ModelError::NotInGraph(deployment.clone()))?;
        Ok(self.edges[v]
            .iter()
            .map(|(&to, &wait_for_healthy)| DependencyRef {
                target: self.deployments[to].clone(),
                wait_for_healthy,
            })
            .collect())
    }

    /// Tarjan's strongly-connected components, iterative with an explicit
    /// stack so deep graphs cannot overflow the call stack.
    fn strong_components(&self) -> Vec<Vec<usize>> {
        const UNVISITED: usize = usize::MAX;
        let n = self.deployments.len();
        let neighbors: Vec<Vec<usize>> = self
            .edges
            .iter()
            .map(|targets| targets.keys().copied().collect())
            .collect();

        let mut discovery = vec![UNVISITED; n];
        let mut low = vec![0usize; n];
        let mut on_stack = vec![false; n];
        let mut stack: Vec<usize> = Vec::new();
        let mut next_discovery = 0usize;
        let mut components = Vec::new();
        // (vertex, next neighbor offset) frames of the simulated recursion.
        let mut frames: Vec<(usize, usize)> = Vec::new();

        for start in 0..n {
            if discovery[start] != UNVISITED {
                continue;
            }
            frames.push((start, 0));
            while let Some(top) = frames.len().checked_sub(1) {
                let (v, offset) = frames[top];
                if offset == 0 {
                    discovery[v] = next_discovery;
                    low[v] = next_discovery;
                    next_discovery += 1;
                    stack.push(v);
                    on_stack[v] = true;
                }
                if let Some(&w) = neighbors[v].get(offset) {
                    frames[top].1 = offset + 1;
                    if discovery[w] == UNVISITED {
                        frames.push((w, 0));
                    } else if on_stack[w] {
                        low[v] = low[v].min(discovery[w]);
                    }
                    continue;
                }
                frames.pop();
                if let Some(&(parent, _)) = frames.last() {
                    low[parent] = low[parent].min(low[v]);
                }
                if low[v] == discovery[v] {
                    let mut component = Vec::new();
                    while let Some(w) = stack.pop() {
                        on_stack[w] = false;
                        component.push(w);
                        if w == v {
                            break;
                        }
                    }
                    components.push(component);
                }
            }
        }
        components
    }
}
