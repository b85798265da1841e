//! ordo-run: plan and execute a manifest of simulated systems.
//!
//! Each `[[systems]]` entry becomes a body that sleeps for `cost_ms` and
//! optionally fails, so a manifest can be used to inspect ordering,
//! concurrency and failure propagation without real workloads.
//!
//! # Usage
//!
//! ```bash
//! # Plan and run the default manifest
//! ordo-run
//!
//! # Print the plan only, as JSON
//! ordo-run --manifest config/ordo.toml --plan-only --json
//!
//! # Via environment variables
//! ORDO_MANIFEST=game.toml ORDO_WORKER_THREADS=2 ordo-run
//! ```
//!
//! Exit status: 0 on success, 1 if any system failed or was skipped, 2 if the
//! manifest cannot be ordered.

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use ordo_scheduler::{
    ExecutionPlan, Manifest, RunReport, Scheduler, SchedulerError, SchedulerMetrics, SystemError,
};

/// Plan and execute a manifest of simulated systems.
#[derive(Parser, Debug)]
#[command(name = "ordo-run", version, about)]
struct Cli {
    /// Path to the TOML manifest.
    #[arg(long, env = "ORDO_MANIFEST", default_value = "config/ordo.toml")]
    manifest: PathBuf,

    /// Worker threads, overriding the manifest (0 = available parallelism).
    #[arg(long)]
    workers: Option<usize>,

    /// Print the plan and exit without running anything.
    #[arg(long)]
    plan_only: bool,

    /// Emit JSON instead of text.
    #[arg(long)]
    json: bool,
}

fn main() -> anyhow::Result<ExitCode> {
    ordo_core::config::load_dotenv();

    // Logs go to stderr so --json output stays machine readable.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    tracing::info!(?cli, "starting ordo-run");

    let mut manifest = Manifest::from_file(&cli.manifest)
        .with_context(|| format!("loading manifest {}", cli.manifest.display()))?;
    if let Some(workers) = cli.workers {
        manifest.scheduler.worker_threads = workers;
    }

    let scheduler = build_scheduler(&manifest)?;
    let plan = match scheduler.plan() {
        Ok(plan) => plan,
        Err(SchedulerError::Cycle(cycle)) => {
            if cli.json {
                println!("{}", serde_json::to_string_pretty(&cycle)?);
            } else {
                eprintln!("error: {cycle}");
                if !cycle.blocked.is_empty() {
                    eprintln!("blocked behind the cycle: {}", cycle.blocked.join(", "));
                }
            }
            return Ok(ExitCode::from(2));
        }
        Err(e) => return Err(e.into()),
    };

    if cli.plan_only {
        print_plan(&plan, cli.json)?;
        return Ok(ExitCode::SUCCESS);
    }
    if !cli.json {
        print_plan(&plan, false)?;
    }

    let pool = scheduler.build_pool()?;
    let report = scheduler.execute(&plan, &pool)?;
    pool.shutdown();

    print_report(&report, &scheduler.metrics(), cli.json)?;
    Ok(if report.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(1)
    })
}

/// Register one simulated body per manifest entry.
fn build_scheduler(manifest: &Manifest) -> anyhow::Result<Scheduler> {
    let mut scheduler = Scheduler::new(manifest.scheduler.clone());
    for decl in &manifest.systems {
        let cost = Duration::from_millis(decl.cost_ms);
        let fail = decl.fail;
        let name = decl.name.clone();
        scheduler.add_system(&decl.name, &decl.reads, &decl.writes, move || {
            if !cost.is_zero() {
                std::thread::sleep(cost);
            }
            if fail {
                return Err(SystemError::Failed(format!("{name} is configured to fail")));
            }
            Ok(())
        })?;
    }
    Ok(scheduler)
}

fn print_plan(plan: &ExecutionPlan, json: bool) -> anyhow::Result<()> {
    let summary = plan.summary();
    if json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("order: {}", summary.order.join(" -> "));
    for (i, stage) in summary.stages.iter().enumerate() {
        println!("  stage {i}: {}", stage.join(", "));
    }
    for edge in &summary.edges {
        println!(
            "  {} -> {} ({} on '{}')",
            edge.from, edge.to, edge.kind, edge.resource
        );
    }
    Ok(())
}

fn print_report(
    report: &RunReport,
    metrics: &SchedulerMetrics,
    json: bool,
) -> anyhow::Result<()> {
    if json {
        let out = serde_json::json!({ "report": report, "metrics": metrics });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    println!("run {} finished in {:?}", report.run_id, report.elapsed);
    for o in &report.outcomes {
        println!("  {:<16} {}", o.system, o.outcome);
    }
    println!("peak concurrency: {}", metrics.peak_concurrency);
    Ok(())
}
