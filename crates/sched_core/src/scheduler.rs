//! The scheduler context.
//!
//! [`Scheduler`] owns the queue and every planning component and advances
//! them together, one tick at a time.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::catalog::UnitKind;
use crate::config::SchedulerConfig;
use crate::emergency::{
    recover_entry, CancellationShortfall, CrisisKind, EmergencyController, EmergencyState,
};
use crate::error::{Result, SchedulerError};
use crate::filler::{EconomyTracker, ProductionFiller};
use crate::opponent::OpponentSnapshot;
use crate::production::{ItemTag, ProductionItem, ProductionQueue};
use crate::reactions::{ReactionOutcome, Reactions};
use crate::resources::{Budget, ResourceState};
use crate::sanitizer::{QueueSanitizer, UselessReason};
use crate::supply::SupplyPlanner;
use crate::tech::{ruled_out, TechPlanner, TechTarget};
use crate::tech_path::TechPath;
use crate::unit_mix::{UnitMixPlan, UnitMixSelector};
use crate::world::{CommandSink, WorldView};

/// Everything one tick did.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TickReport {
    /// Tick of the snapshot.
    pub tick: u64,
    /// Items dropped from the front, with the rule they broke.
    pub drained: Vec<(ItemTag, UselessReason)>,
    /// Crisis detected this tick.
    pub emergency: Option<CrisisKind>,
    /// Whether the emergency state machine is active after this tick.
    pub emergency_active: bool,
    /// Cancellation that recovered less than needed.
    pub shortfall: Option<CancellationShortfall>,
    /// The emergency has lasted past the sustained-crisis threshold.
    pub sustained_crisis: bool,
    /// A capacity provider was put at the front.
    pub provider_inserted: bool,
    /// Throttled reactions, when they ran.
    pub reactions: Option<ReactionOutcome>,
    /// Target and mix were recomputed.
    pub replanned: bool,
    /// Items appended by the refill.
    pub appended: usize,
    /// Queue length at the end of the tick.
    pub queue_len: usize,
}

/// Running counters over a whole game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct SchedulerStats {
    /// Ticks run.
    pub ticks: u64,
    /// Refills.
    pub replans: u64,
    /// Tech target switches.
    pub target_changes: u64,
    /// Items appended by refills.
    pub appended: u64,
    /// Items dropped by the sanitizer.
    pub drained: u64,
    /// Providers inserted by the supply planner.
    pub providers: u64,
    /// Ticks with a crisis detected.
    pub crisis_ticks: u64,
    /// Cancellations that fell short.
    pub shortfalls: u64,
    /// Snapshots whose pool had to be clamped.
    pub clamped_pools: u64,
}

/// Post-game summary.
///
/// Carries no live state; it exists for determinism checks and history
/// export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchedulerSummary {
    /// Tick of the last snapshot seen.
    pub final_tick: u64,
    /// Final tech target.
    pub target: TechTarget,
    /// Final unit mix.
    pub plan: UnitMixPlan,
    /// Game counters.
    pub stats: SchedulerStats,
    /// Economy share bookkeeping.
    pub economy: EconomyTracker,
    /// Emergency state machine at the end.
    pub emergency: EmergencyState,
    /// Queued items, front first.
    pub queue: Vec<ItemTag>,
    /// Hash of the scheduler state.
    pub state_hash: u64,
}

impl SchedulerSummary {
    /// Encode with bincode.
    ///
    /// # Errors
    /// Returns [`SchedulerError::Codec`] if encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        bincode::serialize(self)
            .map_err(|e| SchedulerError::Codec(format!("Failed to serialize summary: {e}")))
    }

    /// Decode from bincode.
    ///
    /// # Errors
    /// Returns [`SchedulerError::Codec`] if the bytes are not a summary.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        bincode::deserialize(bytes)
            .map_err(|e| SchedulerError::Codec(format!("Failed to deserialize summary: {e}")))
    }
}

/// The reactive production scheduler.
///
/// Owns the production queue for the whole game. The execution layer pops
/// and reserves through [`queue_mut`](Self::queue_mut); everything else is
/// decided in [`tick`](Self::tick).
///
/// # Tick Order
///
/// 1. **Snapshot** - read the world, clamp an inconsistent pool
/// 2. **Drain** - drop useless items from the queue front
/// 3. **Emergency** - detect and answer crises
/// 4. **Supply** - keep a provider ahead of capacity deficits
/// 5. **Reactions** - throttled corrections
///
/// A collapse other than too few workers short-circuits steps 4 and 5.
/// 6. **Refill** - when the queue is empty, plan tech and append a batch
#[derive(Debug, Clone)]
pub struct Scheduler {
    config: SchedulerConfig,
    queue: ProductionQueue,
    sanitizer: QueueSanitizer,
    emergency: EmergencyController,
    planner: TechPlanner,
    tech_path: TechPath,
    mix: UnitMixSelector,
    supply: SupplyPlanner,
    filler: ProductionFiller,
    reactions: Reactions,
    economy: EconomyTracker,
    target: TechTarget,
    plan: UnitMixPlan,
    force_replan: bool,
    last_tick: u64,
    stats: SchedulerStats,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new(SchedulerConfig::default())
    }
}

impl Scheduler {
    /// Create a scheduler. Out-of-range config values are replaced and
    /// logged.
    #[must_use]
    pub fn new(config: SchedulerConfig) -> Self {
        let (config, issues) = config.validated();
        if !issues.is_empty() {
            tracing::warn!(issues = issues.len(), "Scheduler config repaired");
        }
        Self {
            queue: ProductionQueue::with_max_len(config.queue.max_len),
            sanitizer: QueueSanitizer::new(&config),
            emergency: EmergencyController::new(config.emergency),
            planner: TechPlanner::new(config.tech),
            tech_path: TechPath::new(&config),
            mix: UnitMixSelector::new(config.filler),
            supply: SupplyPlanner::new(config.supply.clone()),
            filler: ProductionFiller::new(&config),
            reactions: Reactions::new(&config),
            economy: EconomyTracker::new(),
            target: TechTarget::None,
            plan: UnitMixPlan::primary_only(UnitKind::Drone),
            force_replan: false,
            last_tick: 0,
            stats: SchedulerStats::default(),
            config,
        }
    }

    /// Active configuration, after validation.
    #[must_use]
    pub const fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    /// The production queue.
    #[must_use]
    pub const fn queue(&self) -> &ProductionQueue {
        &self.queue
    }

    /// Mutable queue access for the execution layer.
    pub fn queue_mut(&mut self) -> &mut ProductionQueue {
        &mut self.queue
    }

    /// Current tech target.
    #[must_use]
    pub const fn tech_target(&self) -> TechTarget {
        self.target
    }

    /// Current unit mix.
    #[must_use]
    pub const fn unit_mix(&self) -> &UnitMixPlan {
        &self.plan
    }

    /// Emergency state machine.
    #[must_use]
    pub const fn emergency_state(&self) -> &EmergencyState {
        self.emergency.state()
    }

    /// Game counters so far.
    #[must_use]
    pub const fn stats(&self) -> &SchedulerStats {
        &self.stats
    }

    /// Recompute target and mix on the next tick even if the queue is not
    /// empty.
    pub fn force_replan(&mut self) {
        self.force_replan = true;
    }

    /// Run one tick.
    ///
    /// Never fails; everything that can go wrong is reported in the
    /// returned [`TickReport`].
    pub fn tick(
        &mut self,
        world: &dyn WorldView,
        opponent: &OpponentSnapshot,
        sink: &mut dyn CommandSink,
    ) -> TickReport {
        let mut state = world.snapshot();
        if !state.pool.is_consistent() {
            tracing::warn!(
                tick = state.tick,
                used = state.pool.capacity_used,
                pending = state.pool.capacity_pending,
                max = state.pool.capacity_max,
                "Inconsistent resource pool, clamping"
            );
            state.pool.clamp_pending();
            self.stats.clamped_pools += 1;
        }
        self.last_tick = state.tick;
        self.stats.ticks += 1;

        let mut report = TickReport {
            tick: state.tick,
            ..TickReport::default()
        };
        let mut budget = Budget::from_pool(&state.pool);

        report.drained = self.sanitizer.drain(&mut self.queue, &state, &mut budget, sink);
        self.stats.drained += report.drained.len() as u64;

        let outcome = self
            .emergency
            .handle(&mut self.queue, &state, opponent, &mut budget, sink);
        report.emergency = outcome.crisis;
        report.shortfall = outcome.cancellation.and_then(|c| c.shortfall);
        report.emergency_active = self.emergency.state().active;
        report.sustained_crisis = self.emergency.sustained_crisis(state.tick);
        if outcome.crisis.is_some() {
            self.stats.crisis_ticks += 1;
        }
        if report.shortfall.is_some() {
            self.stats.shortfalls += 1;
        }

        // A collapse recovery owns the front of the queue.
        if !outcome.short_circuit {
            if let Some(provider) = self.supply.ensure_capacity(&self.queue, &state) {
                if let Some(evicted) = self.queue.push_front(provider) {
                    recover_entry(&evicted, self.config.emergency.refund_percent, &mut budget, sink);
                }
                report.provider_inserted = true;
                self.stats.providers += 1;
            }

            let reactions = self.reactions.run(
                &mut self.queue,
                &state,
                opponent,
                &self.plan,
                &mut budget,
                sink,
            );
            if reactions != ReactionOutcome::default() {
                report.reactions = Some(reactions);
            }
        }

        if self.queue.is_empty() || self.force_replan {
            report.appended = self.refill(&state, opponent, budget);
            report.replanned = true;
            self.force_replan = false;
        }

        report.queue_len = self.queue.len();
        #[cfg(feature = "debug-validation")]
        self.validate(&report);
        report
    }

    fn refill(
        &mut self,
        state: &ResourceState,
        opponent: &OpponentSnapshot,
        mut budget: Budget,
    ) -> usize {
        let scores = self.planner.score(state, opponent, self.target);
        let excluded = ruled_out(state, opponent);
        let target = self
            .planner
            .choose_from_scores(state, &scores, self.target, &excluded);
        if target != self.target {
            tracing::info!(from = %self.target, to = %target, tick = state.tick, "Tech target changed");
            self.target = target;
            self.stats.target_changes += 1;
        }
        self.plan = self.mix.choose_mix(target, state, &scores);

        // Committed work keeps its claim on the budget.
        for item in self.queue.iter() {
            budget.spend_saturating(item.primary_cost, item.secondary_cost);
        }

        let mut items = if self.queue.is_empty() {
            self.tech_path.critical_steps(state, opponent)
        } else {
            Vec::new()
        };
        if items.is_empty() {
            items = self.tech_path.next_steps(target, state, &self.queue, &mut budget);
            let batch = self
                .filler
                .fill(state, &self.plan, state.slots, budget, &mut self.economy);
            items.extend(batch.items);
        }

        let appended = self.append(&items);
        self.stats.replans += 1;
        self.stats.appended += appended as u64;
        tracing::info!(
            tick = state.tick,
            target = %self.target,
            primary = %self.plan.primary,
            appended,
            "Replanned"
        );
        appended
    }

    fn append(&mut self, items: &[ProductionItem]) -> usize {
        let mut appended = 0;
        for item in items {
            if let Err(err) = self.queue.push_back(*item) {
                tracing::debug!(item = %item.tag, %err, "Refill stopped");
                break;
            }
            appended += 1;
        }
        appended
    }

    /// Hash of everything that steers future decisions.
    ///
    /// Two schedulers fed the same inputs produce the same hash.
    #[must_use]
    pub fn state_hash(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        self.last_tick.hash(&mut hasher);
        self.target.hash(&mut hasher);
        self.plan.hash(&mut hasher);
        self.economy.hash(&mut hasher);
        self.emergency.state().hash(&mut hasher);
        self.stats.hash(&mut hasher);
        self.queue.len().hash(&mut hasher);
        for entry in self.queue.entries() {
            entry.hash(&mut hasher);
        }
        hasher.finish()
    }

    /// Build the post-game summary.
    #[must_use]
    pub fn summary(&self) -> SchedulerSummary {
        SchedulerSummary {
            final_tick: self.last_tick,
            target: self.target,
            plan: self.plan,
            stats: self.stats,
            economy: self.economy,
            emergency: *self.emergency.state(),
            queue: self.queue.iter().map(|i| i.tag).collect(),
            state_hash: self.state_hash(),
        }
    }

    #[cfg(feature = "debug-validation")]
    fn validate(&self, report: &TickReport) {
        debug_assert!(self.queue.len() <= self.queue.max_len, "queue over its bound");
        debug_assert_eq!(report.queue_len, self.queue.len());
        debug_assert!(!self.force_replan, "force_replan not consumed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::ResourcePool;
    use crate::world::CommandLog;

    fn opening() -> ResourceState {
        let mut state = ResourceState {
            pool: ResourcePool {
                primary: 50,
                secondary: 0,
                capacity_used: 8,
                capacity_pending: 0,
                capacity_max: 18,
            },
            slots: 3,
            ..ResourceState::default()
        };
        for (kind, n) in [(UnitKind::Hatchery, 1), (UnitKind::Drone, 4), (UnitKind::Overlord, 1)] {
            state.all.insert(kind, n);
            state.completed.insert(kind, n);
        }
        state.gathering.primary_workers = 4;
        state.gathering.gathering_points = 8;
        state
    }

    #[test]
    fn test_opening_queues_rebuild() {
        let mut scheduler = Scheduler::default();
        let mut log = CommandLog::new();
        let report = scheduler.tick(&opening(), &OpponentSnapshot::default(), &mut log);

        assert!(report.replanned);
        let queued: Vec<_> = scheduler.queue().iter().map(|i| i.tag).collect();
        let drones = queued
            .iter()
            .filter(|t| **t == ItemTag::Unit(UnitKind::Drone))
            .count();
        assert_eq!(drones, 5);
        assert_eq!(queued.last(), Some(&ItemTag::Unit(UnitKind::SpawningPool)));
    }

    #[test]
    fn test_collapse_skips_supply() {
        let state = ResourceState::default();
        let mut scheduler = Scheduler::default();
        let mut log = CommandLog::new();
        for _ in 0..2 {
            let report = scheduler.tick(&state, &OpponentSnapshot::default(), &mut log);
            assert_eq!(report.emergency, Some(CrisisKind::Collapse));
            assert!(!report.provider_inserted);
        }
        let queued: Vec<_> = scheduler.queue().iter().map(|i| i.tag).collect();
        assert_eq!(queued[0], ItemTag::Unit(UnitKind::Drone));
        assert_eq!(queued.len(), 3);
    }

    #[test]
    fn test_few_workers_still_gets_provider() {
        let mut state = opening();
        state.all.insert(UnitKind::Drone, 2);
        state.completed.insert(UnitKind::Drone, 2);
        state.pool.capacity_used = 18;
        let mut scheduler = Scheduler::default();
        let report = scheduler.tick(&state, &OpponentSnapshot::default(), &mut CommandLog::new());

        assert_eq!(report.emergency, Some(CrisisKind::Collapse));
        assert!(report.provider_inserted);
        let queued: Vec<_> = scheduler.queue().iter().map(|i| i.tag).collect();
        assert_eq!(
            &queued[..2],
            &[ItemTag::Unit(UnitKind::Overlord), ItemTag::Unit(UnitKind::Drone)]
        );
    }

    #[test]
    fn test_no_replan_while_queue_has_work() {
        let mut scheduler = Scheduler::default();
        let mut log = CommandLog::new();
        let opponent = OpponentSnapshot::default();
        scheduler.tick(&opening(), &opponent, &mut log);
        let len = scheduler.queue().len();

        let mut state = opening();
        state.tick = 1;
        let report = scheduler.tick(&state, &opponent, &mut log);
        assert!(!report.replanned);
        assert_eq!(scheduler.queue().len(), len);
        assert_eq!(scheduler.stats().replans, 1);
    }

    #[test]
    fn test_force_replan_is_consumed() {
        let mut scheduler = Scheduler::default();
        let mut log = CommandLog::new();
        let opponent = OpponentSnapshot::default();
        scheduler.tick(&opening(), &opponent, &mut log);

        scheduler.force_replan();
        let report = scheduler.tick(&opening(), &opponent, &mut log);
        assert!(report.replanned);
        let report = scheduler.tick(&opening(), &opponent, &mut log);
        assert!(!report.replanned);
    }

    #[test]
    fn test_inconsistent_pool_is_clamped() {
        let mut state = opening();
        state.pool.capacity_pending = 30;
        let mut scheduler = Scheduler::default();
        scheduler.tick(&state, &OpponentSnapshot::default(), &mut CommandLog::new());
        assert_eq!(scheduler.stats().clamped_pools, 1);
    }

    #[test]
    fn test_summary_round_trip() {
        let mut scheduler = Scheduler::default();
        scheduler.tick(&opening(), &OpponentSnapshot::default(), &mut CommandLog::new());
        let summary = scheduler.summary();
        let bytes = summary.to_bytes().unwrap();
        assert_eq!(SchedulerSummary::from_bytes(&bytes).unwrap(), summary);
        assert_eq!(summary.state_hash, scheduler.state_hash());
    }

    #[test]
    fn test_summary_rejects_garbage() {
        assert!(matches!(
            SchedulerSummary::from_bytes(&[1, 2]),
            Err(SchedulerError::Codec(_))
        ));
    }
}
