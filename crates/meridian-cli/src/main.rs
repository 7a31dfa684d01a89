//! Meridian CLI - resolve declarative deployment definitions and run them
//! against cluster frameworks in dependency order.

mod observer;
mod render;
mod vars;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;

use meridian_deploy::{GraphExecutor, MockDeployer};
use meridian_model::DependencyGraph;

#[derive(Parser)]
#[command(name = "meridian")]
#[command(about = "Declarative deployment orchestration for Mesos frameworks")]
#[command(version)]
struct Cli {
    /// Deployment definition file to load
    #[arg(short, long)]
    file: PathBuf,

    /// Resolve and print the deploy order without deploying anything
    #[arg(long)]
    dry_run: bool,

    /// Maximum number of simultaneous deployments
    #[arg(long, default_value_t = 5)]
    max_deploy: usize,

    /// Timeout for framework deploy requests, in seconds
    #[arg(long, default_value_t = 30)]
    deploy_timeout: u64,

    /// Timeout for waiting until a deployment is healthy, in seconds
    #[arg(long, default_value_t = 300)]
    wait_timeout: u64,

    /// Do not read variables from the environment
    #[arg(long)]
    no_env: bool,

    /// Set a variable as KEY=VALUE; may be repeated
    #[arg(long = "var", value_name = "KEY=VALUE")]
    vars: Vec<String>,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let variables = vars::collect(&cli.vars, !cli.no_env)?;
    let source = tokio::fs::read_to_string(&cli.file)
        .await
        .with_context(|| format!("reading {}", cli.file.display()))?;
    let root = meridian_model::config::parse(&source, &variables)
        .with_context(|| format!("decoding {}", cli.file.display()))?;
    meridian_model::validate(&root)?;

    let graph = DependencyGraph::build(&root.deployments)?;
    let cycles = graph.cycles();
    if !cycles.is_empty() {
        bail!("{}", render::cycle_report(&cycles));
    }

    if cli.dry_run {
        print!("{}", render::deploy_plan(&graph)?);
        return Ok(());
    }

    // There is no real cluster wired up yet; exercise the plan against the
    // mock adapter with the latency and failure profile of a small cluster.
    let deployer = Arc::new(
        MockDeployer::new()
            .with_deploy_latency(Duration::from_millis(50), Duration::from_millis(250))
            .with_healthy_latency(Duration::from_millis(200), Duration::from_millis(700))
            .with_error_chances(0.01, 0.01)
            .with_deadlines(
                Duration::from_secs(cli.deploy_timeout),
                Duration::from_secs(cli.wait_timeout),
            ),
    );

    let (events_tx, events_rx) = mpsc::channel(100);
    let printer = tokio::spawn(observer::log_events(events_rx));
    let mut executor = GraphExecutor::new(Arc::new(graph), deployer, cli.max_deploy)?;
    let result = executor.run(Some(events_tx)).await;
    printer.await.context("event observer failed")?;

    let stats = executor.stats();
    println!(
        "Result: {} successful and {} failed deployments of {} resources in {:.3?}",
        stats.successful, stats.failed, stats.total, stats.elapsed
    );
    result.context("deploying graph")?;
    Ok(())
}
