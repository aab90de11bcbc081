//! Headless scheduler runner.
//!
//! Drives the scheduler against a mock world, without a game attached.
//! Designed for CI checks and tuning.
//!
//! # Usage
//!
//! ```bash
//! # Run one scenario, JSON lines on stdout
//! cargo run -p sched_headless -- run --scenario scenarios/standard_opening.ron
//!
//! # Check a config file
//! cargo run -p sched_headless -- validate-config tuning.ron
//!
//! # Run every scenario in a directory
//! cargo run -p sched_headless -- batch --dir scenarios --parallel
//! ```
//!
//! Logs go to stderr; stdout carries JSON only.

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sched_core::config::SchedulerConfig;
use sched_headless::batch::{run_batch, BatchConfig};
use sched_headless::runner::{load_config, run_file, write_json_lines, write_summary_line};

#[derive(Parser)]
#[command(name = "sched_headless")]
#[command(about = "Headless production scheduler runner for testing and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single scenario and print per-tick reports
    Run {
        /// Scenario file to load
        #[arg(short, long)]
        scenario: PathBuf,

        /// Ticks to run (defaults to the scenario's own length)
        #[arg(short, long)]
        ticks: Option<u64>,

        /// Scheduler config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Print only the final summary
        #[arg(long)]
        summary_only: bool,
    },

    /// Load a config file and print what validation replaced
    ValidateConfig {
        /// Config file to check
        path: PathBuf,
    },

    /// Run every scenario in a directory
    Batch {
        /// Directory of scenario files
        #[arg(short, long, default_value = "scenarios")]
        dir: PathBuf,

        /// Run scenarios in parallel
        #[arg(long)]
        parallel: bool,

        /// Ticks per scenario (defaults to each scenario's own length)
        #[arg(short, long)]
        ticks: Option<u64>,

        /// Scheduler config file
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output file for results
        #[arg(short, long, default_value = "results/batch.json")]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging to stderr (stdout is for JSON); RUST_LOG overrides --verbose
    let level = if cli.verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(
            EnvFilter::builder()
                .with_default_directive(level.into())
                .from_env_lossy(),
        )
        .init();

    match cli.command {
        Commands::Run {
            scenario,
            ticks,
            config,
            summary_only,
        } => cmd_run(scenario, ticks, config, summary_only),
        Commands::ValidateConfig { path } => cmd_validate_config(path),
        Commands::Batch {
            dir,
            parallel,
            ticks,
            config,
            output,
        } => cmd_batch(dir, parallel, ticks, config, output),
    }
}

fn config_or_exit(path: Option<PathBuf>) -> SchedulerConfig {
    match load_config(path.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, "Failed to load config");
            std::process::exit(1);
        }
    }
}

/// Run one scenario
fn cmd_run(scenario: PathBuf, ticks: Option<u64>, config: Option<PathBuf>, summary_only: bool) {
    let config = config_or_exit(config);

    let result = match run_file(&scenario, config, ticks) {
        Ok(result) => result,
        Err(e) => {
            tracing::error!(error = %e, path = %scenario.display(), "Failed to run scenario");
            std::process::exit(1);
        }
    };

    let stdout = std::io::stdout();
    let written = if summary_only {
        write_summary_line(&result, stdout.lock())
    } else {
        write_json_lines(&result, stdout.lock())
    };
    if let Err(e) = written {
        tracing::error!(error = %e, "Failed to write output");
        std::process::exit(1);
    }
}

/// Check a config file
fn cmd_validate_config(path: PathBuf) {
    let config = match SchedulerConfig::load(&path) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!(error = %e, path = %path.display(), "Failed to load config");
            std::process::exit(1);
        }
    };

    let (_, issues) = config.validated();
    if issues.is_empty() {
        tracing::info!(path = %path.display(), "Config is valid");
    }

    let report = serde_json::json!({
        "path": path.display().to_string(),
        "valid": issues.is_empty(),
        "issues": issues,
    });
    let mut stdout = std::io::stdout().lock();
    if let Err(e) = writeln!(stdout, "{report}") {
        tracing::error!(error = %e, "Failed to write output");
        std::process::exit(1);
    }
}

/// Run a directory of scenarios
fn cmd_batch(
    dir: PathBuf,
    parallel: bool,
    ticks: Option<u64>,
    config: Option<PathBuf>,
    output: PathBuf,
) {
    let mut batch = BatchConfig::new(dir)
        .parallel(parallel)
        .with_scheduler(config_or_exit(config));
    batch.ticks = ticks;

    let results = match run_batch(&batch) {
        Ok(results) => results,
        Err(e) => {
            tracing::error!(error = %e, dir = %batch.dir.display(), "Failed to start batch");
            std::process::exit(1);
        }
    };

    if let Err(e) = results.save(&output) {
        tracing::error!(error = %e, path = %output.display(), "Failed to save results");
        std::process::exit(1);
    }
    tracing::info!(path = %output.display(), "Results saved");

    let summary = serde_json::json!({
        "output": output.display().to_string(),
        "ran": results.outcomes.len(),
        "failed": results.errors.len(),
        "duration_seconds": results.duration_seconds,
    });
    let mut stdout = std::io::stdout().lock();
    if let Err(e) = writeln!(stdout, "{summary}") {
        tracing::error!(error = %e, "Failed to write output");
        std::process::exit(1);
    }

    if !results.errors.is_empty() {
        std::process::exit(2);
    }
}
