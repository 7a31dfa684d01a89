//! Plain-text rendering of deploy plans and cycle reports.

use std::fmt::Write as _;

use meridian_model::{DependencyGraph, DeploymentRef, ModelResult};

/// Renders the deploy order with dependency annotations: one line per
/// deployment, then one indented line per outgoing dependency.
pub fn deploy_plan(graph: &DependencyGraph) -> ModelResult<String> {
    let mut out = String::new();
    for target in graph.deploy_order()? {
        let _ = writeln!(out, "{target}");
        for dependency in graph.dependencies(&target)? {
            let prefix = if dependency.wait_for_healthy {
                "after waiting for"
            } else {
                "immediately after"
            };
            let _ = writeln!(out, "\t{prefix} {}", dependency.target);
        }
    }
    Ok(out)
}

/// Renders detected dependency cycles, one line per cycle.
pub fn cycle_report(cycles: &[Vec<DeploymentRef>]) -> String {
    let mut out = String::from("dependency cycle(s) detected:\n");
    for cycle in cycles {
        let members: Vec<String> = cycle.iter().map(ToString::to_string).collect();
        let _ = writeln!(out, "\t=> {} <=", members.join(" <==> "));
    }
    out
}
