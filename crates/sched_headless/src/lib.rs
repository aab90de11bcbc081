//! Headless scenario runner for scheduler testing and CI verification.
//!
//! Runs the scheduler against [`MockWorld`], a small deterministic
//! simulation driven by a RON [`Scenario`]. This enables:
//!
//! - **CI verification**: scripted games must end with the same state hash
//! - **Tuning**: compare configs across a directory of scenarios
//! - **Config checks**: report what validation would replace
//!
//! # Output
//!
//! - **stdout**: JSON lines (per-tick records, then a summary)
//! - **stderr**: logs (human-readable)
//!
//! # Example
//!
//! ```bash
//! cargo run -p sched_headless -- run --scenario scenarios/zealot_rush.ron --ticks 300
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod batch;
pub mod mock_world;
pub mod runner;
pub mod scenario;

pub use batch::{run_batch, BatchConfig, BatchResults, ScenarioOutcome};
pub use mock_world::MockWorld;
pub use runner::{run_scenario, RunError, RunResult, TickRecord};
pub use scenario::{IncomeModel, Scenario, ScenarioError};
