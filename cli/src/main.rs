//! Ignite CLI - run a boot manifest and print its timeline.
//!
//! ```text
//! ignite [--deadline-ms N] [MANIFEST]
//! ```
//!
//! `MANIFEST` defaults to `ignite.toml` in the working directory. Settings
//! come from the Ignite config file (see [`ignite_config`]); logs go to
//! stderr, filtered by `RUST_LOG`, then `log.filter`, then `info`.

use std::io::{self, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use ignite_cli::{Manifest, RunOutcome, RunReport, TimedEvent};
use ignite_config::IgniteConfig;
use ignite_engine::BootEvent;
use ignite_types::SchedulerId;

#[derive(Debug, Parser)]
#[command(name = "ignite")]
#[command(about = "Run a staged bootstrap from a boot manifest")]
struct Args {
    /// Stop waiting after this many milliseconds.
    #[arg(long = "deadline-ms", value_name = "N")]
    deadline_ms: Option<u64>,
    /// Boot manifest to run.
    #[arg(value_name = "MANIFEST", default_value = "ignite.toml")]
    manifest: PathBuf,
}

impl Args {
    fn deadline(&self) -> Option<Duration> {
        self.deadline_ms.map(Duration::from_millis)
    }
}

fn init_tracing(config_filter: Option<&str>) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config_filter.unwrap_or("info")))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(env_filter)
        .init();
}

fn describe(event: &BootEvent) -> String {
    match event {
        BootEvent::WarmupStarted { delay } => {
            format!("warm-up ({}ms)", delay.as_millis())
        }
        BootEvent::PhaseStarted(phase) => format!("phase {phase} started"),
        BootEvent::ItemStarted { key, .. } => format!("  start    {key}"),
        BootEvent::ItemCompleted { key, .. } => format!("  done     {key}"),
        BootEvent::WatchdogExpired { key, timeout, .. } => {
            format!("  overrun  {key} (timeout {}ms)", timeout.as_millis())
        }
        BootEvent::Stalled { key, .. } => format!("  stalled  {key} (no such method)"),
        BootEvent::PhaseDrained(phase) => format!("phase {phase} drained"),
        BootEvent::Finished => "finished".to_string(),
        BootEvent::Failed(err) => format!("failed: {err}"),
    }
}

fn print_report(out: &mut impl Write, report: &RunReport) -> io::Result<()> {
    for TimedEvent { at, event } in &report.events {
        writeln!(out, "{:>7}ms  {}", at.as_millis(), describe(event))?;
    }
    writeln!(
        out,
        "{} after {}ms",
        report.outcome,
        report.elapsed.as_millis()
    )
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let args = Args::parse();

    let config = IgniteConfig::load()
        .context("failed to load Ignite config")?
        .unwrap_or_default();
    init_tracing(config.log.filter.as_deref());
    if let Some(path) = IgniteConfig::path() {
        tracing::debug!(path = %path.display(), "Config path");
    }

    let manifest = Manifest::load(&args.manifest)
        .with_context(|| format!("failed to load manifest {}", args.manifest.display()))?;

    let id = SchedulerId::new("ignite")?;
    let report = ignite_cli::run(id, &manifest, config.boot, args.deadline()).await;

    print_report(&mut io::stdout().lock(), &report).context("failed to write report")?;

    Ok(match report.outcome {
        RunOutcome::Finished => ExitCode::SUCCESS,
        RunOutcome::Failed(_) | RunOutcome::DeadlineExceeded(_) => ExitCode::FAILURE,
    })
}
