//! Scenario loading and configuration.
//!
//! A scenario is a starting snapshot plus everything the mock world needs
//! to move it forward: an income model, what the opponent looks like over
//! time, and losses inflicted at fixed ticks.

use std::path::Path;

use sched_core::catalog::UnitKind;
use sched_core::opponent::{EnemyKind, OpeningPlan, OpponentSnapshot};
use sched_core::resources::{Gathering, MapInfo, ResourcePool, ResourceState};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error type for scenario operations.
#[derive(Error, Debug)]
pub enum ScenarioError {
    /// File not found.
    #[error("Scenario file not found: {0}")]
    FileNotFound(String),
    /// Failed to read file.
    #[error("Failed to read scenario file: {0}")]
    ReadError(#[from] std::io::Error),
    /// Failed to parse RON.
    #[error("Failed to parse scenario: {0}")]
    ParseError(#[from] ron::error::SpannedError),
}

/// How the mock world pays out resources and production slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IncomeModel {
    /// Primary paid per primary gatherer every `period` ticks.
    pub primary_per_worker: u32,
    /// Secondary paid per secondary gatherer every `period` ticks.
    pub secondary_per_worker: u32,
    /// Ticks between payouts.
    pub period: u32,
    /// Build frames that pass per tick.
    pub frames_per_tick: u32,
    /// Ticks between slot spawns at each base.
    pub slot_period: u32,
    /// Slots a base holds at most.
    pub slots_per_base: u32,
    /// Gatherers sent to each staffed gas site.
    pub workers_per_gas_site: u32,
}

impl Default for IncomeModel {
    fn default() -> Self {
        Self {
            primary_per_worker: 5,
            secondary_per_worker: 4,
            period: 4,
            frames_per_tick: 24,
            slot_period: 14,
            slots_per_base: 3,
            workers_per_gas_site: 3,
        }
    }
}

/// The opponent estimate from `from_tick` onwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpponentPhase {
    /// First tick this estimate applies to.
    pub from_tick: u64,
    /// The estimate itself.
    pub snapshot: OpponentSnapshot,
}

/// Completed units destroyed at a fixed tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptedLoss {
    /// Tick the loss happens on, before the scheduler runs.
    pub tick: u64,
    /// Kind destroyed.
    pub kind: UnitKind,
    /// How many; clamped to what is owned.
    pub count: u32,
}

/// A complete scenario.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scenario {
    /// Scenario name.
    pub name: String,
    /// Human-readable description.
    #[serde(default)]
    pub description: String,
    /// Ticks to run unless overridden on the command line.
    #[serde(default = "default_ticks")]
    pub ticks: u64,
    /// Snapshot at tick zero.
    pub start: ResourceState,
    /// Payout rules.
    #[serde(default)]
    pub income: IncomeModel,
    /// Opponent estimates, sorted by `from_tick`.
    #[serde(default)]
    pub opponent: Vec<OpponentPhase>,
    /// Losses applied as their tick comes up.
    #[serde(default)]
    pub losses: Vec<ScriptedLoss>,
}

const fn default_ticks() -> u64 {
    600
}

impl Default for Scenario {
    fn default() -> Self {
        Self::standard_opening()
    }
}

impl Scenario {
    /// Load a scenario from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ScenarioError::FileNotFound(path.display().to_string()));
        }
        let contents = std::fs::read_to_string(path)?;
        Self::from_ron_str(&contents)
    }

    /// Load from a RON string (useful for embedded scenarios).
    pub fn from_ron_str(ron: &str) -> Result<Self, ScenarioError> {
        let mut scenario: Scenario = ron::from_str(ron)?;
        scenario.opponent.sort_by_key(|phase| phase.from_tick);
        Ok(scenario)
    }

    /// One base, four drones, one overlord, nobody in sight.
    #[must_use]
    pub fn standard_opening() -> Self {
        let mut start = ResourceState {
            pool: ResourcePool {
                primary: 50,
                secondary: 0,
                capacity_used: 8,
                capacity_pending: 0,
                capacity_max: 18,
            },
            slots: 3,
            gathering: Gathering {
                primary_workers: 4,
                secondary_workers: 0,
                collecting_secondary: false,
                gathering_points: 8,
            },
            map: MapInfo {
                free_bases: 3,
                gas_sites_free: 1,
                island: false,
            },
            ..ResourceState::default()
        };
        for (kind, n) in [
            (UnitKind::Hatchery, 1),
            (UnitKind::Drone, 4),
            (UnitKind::Overlord, 1),
        ] {
            start.all.insert(kind, n);
            start.completed.insert(kind, n);
        }

        Self {
            name: "standard_opening".to_string(),
            description: "Default start against an unscouted opponent".to_string(),
            ticks: default_ticks(),
            start,
            income: IncomeModel::default(),
            opponent: Vec::new(),
            losses: Vec::new(),
        }
    }

    /// The standard opening against a zealot rush that arrives at tick 150.
    #[must_use]
    pub fn zealot_rush() -> Self {
        let mut seen = OpponentSnapshot::from_counts(&[(EnemyKind::Zealot, 2)]);
        seen.scouted = true;
        seen.plan = OpeningPlan::FastRush;

        let mut arrived = OpponentSnapshot::from_counts(&[(EnemyKind::Zealot, 6)]);
        arrived.scouted = true;
        arrived.plan = OpeningPlan::FastRush;
        arrived.nearby.insert(EnemyKind::Zealot, 6);

        Self {
            name: "zealot_rush".to_string(),
            description: "Early zealots scouted, then at the door".to_string(),
            opponent: vec![
                OpponentPhase {
                    from_tick: 40,
                    snapshot: seen,
                },
                OpponentPhase {
                    from_tick: 150,
                    snapshot: arrived,
                },
            ],
            ..Self::standard_opening()
        }
    }

    /// The opponent estimate in effect at `tick`.
    #[must_use]
    pub fn opponent_at(&self, tick: u64) -> OpponentSnapshot {
        self.opponent
            .iter()
            .take_while(|phase| phase.from_tick <= tick)
            .last()
            .map(|phase| phase.snapshot.clone())
            .unwrap_or_default()
    }

    /// Losses scheduled for exactly `tick`.
    pub fn losses_at(&self, tick: u64) -> impl Iterator<Item = &ScriptedLoss> {
        self.losses.iter().filter(move |loss| loss.tick == tick)
    }
}
