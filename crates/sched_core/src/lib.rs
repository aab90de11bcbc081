//! # Sched Core
//!
//! Deterministic reactive production scheduler for a swarm-race RTS macro
//! layer.
//!
//! Each tick the scheduler looks at one resource snapshot and the opponent
//! estimate, and keeps a production queue that an execution layer consumes:
//! - Drops queued items that no longer make sense
//! - Answers crises by cancelling and reprioritising
//! - Keeps capacity providers ahead of demand
//! - Chooses a tech target and unit mix, and spends the budget on it
//!
//! This crate contains **only** deterministic logic:
//! - No rendering
//! - No IO beyond loading config files
//! - No randomness
//! - No floating-point math in decisions (uses fixed-point)
//!
//! ## Crate Structure
//!
//! - [`scheduler`] - The scheduler context and tick loop
//! - [`catalog`] - Static unit, tech and upgrade data
//! - [`resources`] - Per-tick resource snapshot and budget
//! - [`production`] - Production items and the queue
//! - [`sanitizer`] - Useless-item rules
//! - [`emergency`] - Crisis detection and cancellation
//! - [`tech`] / [`tech_path`] - Tech target scoring and steps toward it
//! - [`unit_mix`] / [`filler`] - Unit mix selection and batch filling
//! - [`supply`] - Capacity provider planning
//! - [`reactions`] - Throttled corrections
//! - [`config`] - Tunables and presets
//! - [`math`] - Fixed-point ratio helpers

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic)]

pub mod catalog;
pub mod config;
pub mod emergency;
pub mod error;
pub mod filler;
pub mod math;
pub mod opponent;
pub mod production;
pub mod reactions;
pub mod resources;
pub mod sanitizer;
pub mod scheduler;
pub mod supply;
pub mod tech;
pub mod tech_path;
pub mod unit_mix;
pub mod world;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::catalog::{KindTraits, MacroCommand, TechKind, UnitKind, UpgradeKind};
    pub use crate::config::{ConfigIssue, SchedulerConfig};
    pub use crate::emergency::{CancellationShortfall, CrisisKind, EmergencyState};
    pub use crate::error::{Result, SchedulerError};
    pub use crate::filler::EconomyTracker;
    pub use crate::math::Fixed;
    pub use crate::opponent::{EnemyKind, OpeningPlan, OpponentSnapshot, Race};
    pub use crate::production::{
        ItemKind, ItemTag, ProductionItem, ProductionQueue, QueueEntry, QueueError,
    };
    pub use crate::resources::{
        Budget, Gathering, InProgress, ItemHandle, MapInfo, Research, ResourcePool, ResourceState,
    };
    pub use crate::sanitizer::UselessReason;
    pub use crate::scheduler::{Scheduler, SchedulerStats, SchedulerSummary, TickReport};
    pub use crate::tech::TechTarget;
    pub use crate::unit_mix::UnitMixPlan;
    pub use crate::world::{CommandLog, CommandSink, SimCommand, WorldView};
}
