//! Batch runner for whole scenario directories.
//!
//! Every `*.ron` file in a directory is one scenario. Scenarios are
//! independent, so with `parallel` set they run on the rayon pool; a single
//! run is always sequential.

use std::path::{Path, PathBuf};
use std::time::Instant;

use rayon::prelude::*;
use sched_core::config::SchedulerConfig;
use sched_core::scheduler::SchedulerStats;
use sched_core::tech::TechTarget;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::runner::{run_file, RunError};
use crate::scenario::ScenarioError;

/// Configuration for a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchConfig {
    /// Directory holding the scenario files.
    pub dir: PathBuf,
    /// Run scenarios on the rayon pool.
    pub parallel: bool,
    /// Tick override for every scenario.
    pub ticks: Option<u64>,
    /// Scheduler config shared by every run.
    pub scheduler: SchedulerConfig,
}

impl BatchConfig {
    /// Batch over `dir` with the default scheduler config.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            parallel: false,
            ticks: None,
            scheduler: SchedulerConfig::default(),
        }
    }

    /// Run in parallel.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Override every scenario's length.
    pub fn with_ticks(mut self, ticks: u64) -> Self {
        self.ticks = Some(ticks);
        self
    }

    /// Use a different scheduler config.
    pub fn with_scheduler(mut self, scheduler: SchedulerConfig) -> Self {
        self.scheduler = scheduler;
        self
    }
}

/// The outcome of one scenario in a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioOutcome {
    /// Scenario file.
    pub file: PathBuf,
    /// Scenario name.
    pub scenario: String,
    /// Ticks run.
    pub ticks: u64,
    /// Items the world started.
    pub items_started: usize,
    /// Economy units at the end.
    pub workers: u32,
    /// Tech target at the end.
    pub target: TechTarget,
    /// Scheduler counters.
    pub stats: SchedulerStats,
    /// Scheduler state hash at the end.
    pub state_hash: u64,
}

/// A scenario that failed to run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchError {
    /// Scenario file.
    pub file: PathBuf,
    /// Error message.
    pub message: String,
}

/// Results from a batch run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchResults {
    /// Scenarios that ran, in file name order.
    pub outcomes: Vec<ScenarioOutcome>,
    /// Scenarios that did not.
    pub errors: Vec<BatchError>,
    /// Wall time in seconds.
    pub duration_seconds: f64,
}

impl BatchResults {
    /// Save results to a JSON file.
    pub fn save(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Load results from a JSON file.
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(std::io::Error::other)
    }
}

/// Every `*.ron` file directly under `dir`, sorted by name.
pub fn discover_scenarios(dir: &Path) -> Result<Vec<PathBuf>, ScenarioError> {
    if !dir.is_dir() {
        return Err(ScenarioError::FileNotFound(dir.display().to_string()));
    }
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "ron") {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

fn run_one(path: &Path, config: &BatchConfig) -> Result<ScenarioOutcome, BatchError> {
    let result = run_file(path, config.scheduler.clone(), config.ticks).map_err(|e: RunError| {
        warn!(file = %path.display(), error = %e, "Scenario failed");
        BatchError {
            file: path.to_path_buf(),
            message: e.to_string(),
        }
    })?;
    Ok(ScenarioOutcome {
        file: path.to_path_buf(),
        items_started: result.items_started(),
        scenario: result.scenario,
        ticks: result.ticks,
        workers: result.final_state.workers(),
        target: result.summary.target,
        stats: result.summary.stats,
        state_hash: result.summary.state_hash,
    })
}

/// Run every scenario in `config.dir`.
pub fn run_batch(config: &BatchConfig) -> Result<BatchResults, ScenarioError> {
    let start = Instant::now();
    let files = discover_scenarios(&config.dir)?;
    info!(dir = %config.dir.display(), scenarios = files.len(), parallel = config.parallel, "Starting batch");

    let results: Vec<Result<ScenarioOutcome, BatchError>> = if config.parallel {
        files.par_iter().map(|path| run_one(path, config)).collect()
    } else {
        files.iter().map(|path| run_one(path, config)).collect()
    };

    let (outcomes, errors): (Vec<_>, Vec<_>) = results.into_iter().partition(Result::is_ok);
    let outcomes: Vec<ScenarioOutcome> = outcomes.into_iter().filter_map(Result::ok).collect();
    let errors: Vec<BatchError> = errors.into_iter().filter_map(Result::err).collect();
    let duration_seconds = start.elapsed().as_secs_f64();

    info!(
        ran = outcomes.len(),
        failed = errors.len(),
        seconds = duration_seconds,
        "Batch complete"
    );

    Ok(BatchResults {
        outcomes,
        errors,
        duration_seconds,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::Scenario;

    fn write_scenario(dir: &Path, file: &str, scenario: &Scenario) {
        let text = ron::ser::to_string_pretty(scenario, ron::ser::PrettyConfig::default()).unwrap();
        std::fs::write(dir.join(file), text).unwrap();
    }

    #[test]
    fn test_batch_config_builder() {
        let config = BatchConfig::new("scenarios").parallel(true).with_ticks(50);
        assert!(config.parallel);
        assert_eq!(config.ticks, Some(50));
        assert_eq!(config.dir, PathBuf::from("scenarios"));
    }

    #[test]
    fn test_discover_only_ron_sorted() {
        let dir = tempfile::tempdir().unwrap();
        write_scenario(dir.path(), "b.ron", &Scenario::standard_opening());
        write_scenario(dir.path(), "a.ron", &Scenario::zealot_rush());
        std::fs::write(dir.path().join("notes.txt"), "skip me").unwrap();

        let files = discover_scenarios(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|f| f.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.ron", "b.ron"]);
    }

    #[test]
    fn test_missing_dir() {
        assert!(matches!(
            discover_scenarios(Path::new("no/such/dir")),
            Err(ScenarioError::FileNotFound(_))
        ));
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let dir = tempfile::tempdir().unwrap();
        write_scenario(dir.path(), "opening.ron", &Scenario::standard_opening());
        write_scenario(dir.path(), "rush.ron", &Scenario::zealot_rush());
        std::fs::write(dir.path().join("broken.ron"), "(name: ").unwrap();

        let config = BatchConfig::new(dir.path()).with_ticks(120);
        let sequential = run_batch(&config).unwrap();
        let parallel = run_batch(&config.clone().parallel(true)).unwrap();

        assert_eq!(sequential.outcomes.len(), 2);
        assert_eq!(sequential.errors.len(), 1);
        assert_eq!(sequential.outcomes, parallel.outcomes);
    }

    #[test]
    fn test_results_save_load() {
        let dir = tempfile::tempdir().unwrap();
        write_scenario(dir.path(), "opening.ron", &Scenario::standard_opening());
        let results = run_batch(&BatchConfig::new(dir.path()).with_ticks(20)).unwrap();

        let path = dir.path().join("out").join("batch.json");
        results.save(&path).unwrap();
        let loaded = BatchResults::load(&path).unwrap();
        assert_eq!(loaded.outcomes, results.outcomes);
    }
}
