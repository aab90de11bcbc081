//! Runs one scenario against the scheduler and writes JSON.
//!
//! # Tick Loop
//!
//! 1. Apply the scenario's scripted losses for this tick
//! 2. Tick the scheduler against the world and the current opponent estimate
//! 3. Apply the commands it issued (cancellations refund into the world)
//! 4. Start what the queue front can pay for
//! 5. Advance the world one tick
//!
//! # Output
//!
//! JSON lines on the given writer: one `tick` object per tick, then one
//! `summary` object.

use std::io::Write;
use std::path::Path;

use sched_core::config::SchedulerConfig;
use sched_core::error::SchedulerError;
use sched_core::production::ItemTag;
use sched_core::resources::ResourceState;
use sched_core::scheduler::{Scheduler, SchedulerSummary, TickReport};
use sched_core::world::{CommandLog, SimCommand};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::mock_world::MockWorld;
use crate::scenario::{Scenario, ScenarioError};

/// Error type for headless runs.
#[derive(Error, Debug)]
pub enum RunError {
    /// The scenario could not be loaded.
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    /// The scheduler config could not be loaded.
    #[error(transparent)]
    Config(#[from] SchedulerError),
    /// JSON output failed.
    #[error("Failed to encode output: {0}")]
    Json(#[from] serde_json::Error),
    /// Writing output failed.
    #[error("Failed to write output: {0}")]
    Io(#[from] std::io::Error),
}

/// One tick as seen from outside the scheduler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TickRecord {
    /// What the scheduler did.
    pub report: TickReport,
    /// Commands it issued to the world.
    pub commands: Vec<SimCommand>,
    /// Items the world started off the queue front afterwards.
    pub started: Vec<ItemTag>,
}

/// A finished run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunResult {
    /// Scenario name.
    pub scenario: String,
    /// Ticks run.
    pub ticks: u64,
    /// Per-tick records, in order.
    pub records: Vec<TickRecord>,
    /// Scheduler summary at the end.
    pub summary: SchedulerSummary,
    /// World state at the end.
    pub final_state: ResourceState,
}

impl RunResult {
    /// Total items the world started.
    #[must_use]
    pub fn items_started(&self) -> usize {
        self.records.iter().map(|r| r.started.len()).sum()
    }

    /// How many times `tag` was started.
    #[must_use]
    pub fn started_count(&self, tag: ItemTag) -> usize {
        self.records
            .iter()
            .flat_map(|r| r.started.iter())
            .filter(|t| **t == tag)
            .count()
    }
}

#[derive(Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OutputLine<'a> {
    Tick(&'a TickRecord),
    Summary {
        scenario: &'a str,
        ticks: u64,
        items_started: usize,
        summary: &'a SchedulerSummary,
        final_state: &'a ResourceState,
    },
}

/// Load the config at `path`, or the default when there is none.
pub fn load_config(path: Option<&Path>) -> Result<SchedulerConfig, RunError> {
    match path {
        Some(path) => Ok(SchedulerConfig::load(path)?),
        None => Ok(SchedulerConfig::default()),
    }
}

/// Run `scenario` for `ticks` ticks, or the scenario's own length.
#[must_use]
pub fn run_scenario(scenario: &Scenario, config: SchedulerConfig, ticks: Option<u64>) -> RunResult {
    let ticks = ticks.unwrap_or(scenario.ticks);
    let refund_percent = config.emergency.refund_percent;
    let mut scheduler = Scheduler::new(config);
    let mut world = MockWorld::new(scenario.start.clone(), scenario.income, refund_percent);
    let mut log = CommandLog::new();
    let mut records = Vec::with_capacity(usize::try_from(ticks).unwrap_or(0));

    info!(scenario = %scenario.name, ticks, "Starting run");

    for _ in 0..ticks {
        let tick = world.tick();
        for loss in scenario.losses_at(tick) {
            world.apply_loss(loss);
        }
        let opponent = scenario.opponent_at(tick);

        let report = scheduler.tick(&world, &opponent, &mut log);
        let commands = log.take();
        world.apply(&commands);
        let started = world.execute_front(scheduler.queue_mut());
        world.advance();

        if report.sustained_crisis {
            warn!(tick, "Emergency has not cleared");
        }
        debug!(tick, started = started.len(), queue = report.queue_len, "Tick done");
        records.push(TickRecord {
            report,
            commands,
            started,
        });
    }

    let summary = scheduler.summary();
    info!(
        scenario = %scenario.name,
        ticks,
        hash = summary.state_hash,
        target = ?summary.target,
        "Run complete"
    );

    RunResult {
        scenario: scenario.name.clone(),
        ticks,
        records,
        summary,
        final_state: world.state().clone(),
    }
}

/// Load a scenario file and run it.
pub fn run_file(path: &Path, config: SchedulerConfig, ticks: Option<u64>) -> Result<RunResult, RunError> {
    let scenario = Scenario::load(path)?;
    Ok(run_scenario(&scenario, config, ticks))
}

/// Write the run as JSON lines: every tick, then the summary.
pub fn write_json_lines<W: Write>(result: &RunResult, mut out: W) -> Result<(), RunError> {
    for record in &result.records {
        serde_json::to_writer(&mut out, &OutputLine::Tick(record))?;
        out.write_all(b"\n")?;
    }
    write_summary_line(result, &mut out)
}

/// Write only the summary line.
pub fn write_summary_line<W: Write>(result: &RunResult, mut out: W) -> Result<(), RunError> {
    let line = OutputLine::Summary {
        scenario: &result.scenario,
        ticks: result.ticks,
        items_started: result.items_started(),
        summary: &result.summary,
        final_state: &result.final_state,
    };
    serde_json::to_writer(&mut out, &line)?;
    out.write_all(b"\n")?;
    out.flush()?;
    Ok(())
}
