//! Crisis detection and response.
//!
//! Three crises are recognised: economic collapse, a ground threat the army
//! cannot hold, and a queue stuck on secondary resource it can never get.
//! While any of them holds the controller is in its emergency state; it
//! leaves once no crisis has been seen for the grace window.

use serde::{Deserialize, Serialize};

use crate::catalog::{KindTraits, UnitKind};
use crate::config::EmergencyConfig;
use crate::opponent::OpponentSnapshot;
use crate::production::{ItemTag, ProductionItem, ProductionQueue, QueueEntry};
use crate::resources::{Budget, ItemHandle, ResourceState};
use crate::world::CommandSink;

/// Which crisis triggered the emergency state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrisisKind {
    /// Economy or production destroyed.
    Collapse,
    /// Enemy ground force at our bases outweighs our defence.
    Threat,
    /// Front item starved of secondary resource.
    Deadlock,
}

impl std::fmt::Display for CrisisKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Collapse => write!(f, "collapse"),
            Self::Threat => write!(f, "threat"),
            Self::Deadlock => write!(f, "deadlock"),
        }
    }
}

/// Emergency state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct EmergencyState {
    /// In the emergency state.
    pub active: bool,
    /// Tick the current emergency began.
    pub start_tick: u64,
    /// Last tick any crisis was observed.
    pub last_trigger_tick: u64,
    /// The most recent crisis.
    pub trigger: Option<CrisisKind>,
}

/// Cancellation fell short of what was needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CancellationShortfall {
    /// Primary resource requested.
    pub needed: u32,
    /// Primary resource actually recovered.
    pub recovered: u32,
    /// `needed - recovered`.
    pub shortfall: u32,
}

/// What a cancellation pass did.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CancellationReport {
    /// Items cancelled, in cancellation order.
    pub cancelled: Vec<(ItemHandle, UnitKind)>,
    /// Primary resource refunded.
    pub recovered: u32,
    /// Secondary resource refunded.
    pub recovered_secondary: u32,
    /// Set when the refund did not cover the request.
    pub shortfall: Option<CancellationShortfall>,
}

/// What one emergency pass did.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EmergencyOutcome {
    /// Crisis observed this tick.
    pub crisis: Option<CrisisKind>,
    /// Skip reactions and planning this tick.
    pub short_circuit: bool,
    /// Items inserted at the front.
    pub inserted: usize,
    /// Cancellation performed, if any.
    pub cancellation: Option<CancellationReport>,
}

/// Refund for `cost` at `percent`, floored.
#[must_use]
pub const fn refund(cost: u32, percent: u32) -> u32 {
    cost * percent / 100
}

/// Give back a dropped entry's reservation.
///
/// Unreserved entries hold nothing; reserved ones are cancelled in the world
/// and the refund is credited to `budget`.
pub fn recover_entry(
    entry: &QueueEntry,
    percent: u32,
    budget: &mut Budget,
    sink: &mut dyn CommandSink,
) {
    if let Some(handle) = entry.reservation {
        sink.cancel(handle);
        budget.credit(
            refund(entry.item.primary_cost, percent),
            refund(entry.item.secondary_cost, percent),
        );
        tracing::debug!(item = %entry.item.tag, ?handle, "Recovered reservation");
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Collapse {
    Total,
    NoWorkers,
    NoBase,
    FewWorkers,
}

const TOTAL_RECOVERY: [UnitKind; 3] = [UnitKind::Drone, UnitKind::Drone, UnitKind::Hatchery];

/// Detects crises and reacts to them.
#[derive(Debug, Clone, Default)]
pub struct EmergencyController {
    config: EmergencyConfig,
    state: EmergencyState,
    starved: Option<(ItemTag, u64)>,
}

impl EmergencyController {
    /// Create a controller.
    #[must_use]
    pub fn new(config: EmergencyConfig) -> Self {
        Self {
            config,
            state: EmergencyState::default(),
            starved: None,
        }
    }

    /// Current state machine.
    #[must_use]
    pub const fn state(&self) -> &EmergencyState {
        &self.state
    }

    /// Restore a state machine, e.g. from a saved run.
    pub fn restore(&mut self, state: EmergencyState) {
        self.state = state;
    }

    /// Whether the emergency has lasted long enough to report upstream.
    #[must_use]
    pub const fn sustained_crisis(&self, tick: u64) -> bool {
        self.state.active
            && tick.saturating_sub(self.state.start_tick) >= self.config.sustained_crisis_ticks
    }

    /// Run one detection and response pass.
    pub fn handle(
        &mut self,
        queue: &mut ProductionQueue,
        state: &ResourceState,
        opponent: &OpponentSnapshot,
        budget: &mut Budget,
        sink: &mut dyn CommandSink,
    ) -> EmergencyOutcome {
        let mut outcome = EmergencyOutcome::default();

        if let Some(collapse) = self.collapse(state) {
            self.respond_to_collapse(collapse, queue, state, budget, sink, &mut outcome);
            outcome.crisis = Some(CrisisKind::Collapse);
        } else if self.is_threatened(state, opponent) {
            outcome.inserted = self.defend(queue, state, budget, sink);
            outcome.crisis = Some(CrisisKind::Threat);
        } else if self.resolve_deadlock(queue, state, budget, sink) {
            outcome.crisis = Some(CrisisKind::Deadlock);
        }

        self.advance(state.tick, outcome.crisis);
        outcome
    }

    fn advance(&mut self, tick: u64, crisis: Option<CrisisKind>) {
        match crisis {
            Some(kind) => {
                if !self.state.active {
                    tracing::info!(%kind, tick, "Entering emergency");
                    self.state.active = true;
                    self.state.start_tick = tick;
                }
                self.state.last_trigger_tick = tick;
                self.state.trigger = Some(kind);
            }
            None => {
                if self.state.active
                    && tick.saturating_sub(self.state.last_trigger_tick) >= self.config.grace_ticks
                {
                    tracing::info!(
                        tick,
                        lasted = tick.saturating_sub(self.state.start_tick),
                        "Emergency over"
                    );
                    self.state.active = false;
                    self.state.trigger = None;
                }
            }
        }
    }

    fn collapse(&self, state: &ResourceState) -> Option<Collapse> {
        let drones = state.count(UnitKind::Drone);
        let bases = state.count_line(UnitKind::Hatchery);
        match (drones, bases) {
            (0, 0) => Some(Collapse::Total),
            (0, _) => Some(Collapse::NoWorkers),
            (_, 0) => Some(Collapse::NoBase),
            _ if drones < self.config.min_workers => Some(Collapse::FewWorkers),
            _ => None,
        }
    }

    fn respond_to_collapse(
        &self,
        collapse: Collapse,
        queue: &mut ProductionQueue,
        state: &ResourceState,
        budget: &mut Budget,
        sink: &mut dyn CommandSink,
        outcome: &mut EmergencyOutcome,
    ) {
        let percent = self.config.refund_percent;
        let needed = match collapse {
            Collapse::Total => {
                if !starts_with(queue, &TOTAL_RECOVERY) {
                    for entry in queue.drain_all() {
                        recover_entry(&entry, percent, budget, sink);
                    }
                    let items = TOTAL_RECOVERY.map(ProductionItem::unit);
                    queue.push_front_all(&items);
                    outcome.inserted = items.len();
                    tracing::warn!("Economy destroyed, queueing recovery");
                }
                if state.gathering.collecting_secondary {
                    sink.set_gas_collection(false);
                }
                TOTAL_RECOVERY.iter().map(|k| k.spec().primary).sum()
            }
            Collapse::NoWorkers => {
                if !starts_with(queue, &[UnitKind::Drone]) {
                    for entry in queue.drain_all() {
                        recover_entry(&entry, percent, budget, sink);
                    }
                    queue.push_front(ProductionItem::unit(UnitKind::Drone));
                    outcome.inserted = 1;
                    tracing::warn!("No economy units left, queueing one");
                }
                UnitKind::Drone.spec().primary
            }
            Collapse::NoBase => {
                if !queue.contains(ItemTag::Unit(UnitKind::Hatchery)) {
                    if let Some(evicted) = queue.push_front(ProductionItem::unit(UnitKind::Hatchery)) {
                        recover_entry(&evicted, percent, budget, sink);
                    }
                    outcome.inserted = 1;
                    tracing::warn!("No base left, queueing one");
                }
                UnitKind::Hatchery.spec().primary
            }
            Collapse::FewWorkers => {
                if !starts_with(queue, &[UnitKind::Drone]) {
                    if let Some(evicted) = queue.push_front(ProductionItem::unit(UnitKind::Drone)) {
                        recover_entry(&evicted, percent, budget, sink);
                    }
                    outcome.inserted = 1;
                }
                if state.gathering.primary_workers == 0
                    && state.gathering.secondary_workers > 0
                    && state.gathering.collecting_secondary
                {
                    sink.set_gas_collection(false);
                }
                0
            }
        };

        outcome.short_circuit = collapse != Collapse::FewWorkers;
        if needed > budget.primary {
            let report = self.cancel_for_resources(needed - budget.primary, state, sink);
            budget.credit(report.recovered, report.recovered_secondary);
            outcome.cancellation = Some(report);
        }
    }

    fn is_threatened(&self, state: &ResourceState, opponent: &OpponentSnapshot) -> bool {
        let sunkens = state.completed(UnitKind::SunkenColony) as i32;
        let defence = state.army_capacity() as i32
            + 10 * sunkens
            + self.config.threat_margin
            + 2 * state.bases() as i32;
        let enemy = opponent.nearby_ground_power();
        if enemy > defence {
            tracing::debug!(enemy, defence, "Ground threat");
            return true;
        }

        let static_defence = state.count(UnitKind::SunkenColony) + state.count(UnitKind::CreepColony);
        opponent.plan.is_rush()
            && static_defence == 0
            && state.has_or_building(UnitKind::SpawningPool)
            && state.completed(UnitKind::Zergling) < 6
    }

    /// Front-insert static defence and fighters. Returns items inserted.
    fn defend(
        &self,
        queue: &mut ProductionQueue,
        state: &ResourceState,
        budget: &mut Budget,
        sink: &mut dyn CommandSink,
    ) -> usize {
        let mut items = Vec::new();
        if state.has(UnitKind::SpawningPool)
            && state.slots > 0
            && !starts_with(queue, &[UnitKind::Zergling])
        {
            items.push(ProductionItem::unit(UnitKind::Zergling));
        }

        let static_defence = state.count(UnitKind::SunkenColony) + state.count(UnitKind::CreepColony);
        let defence_queued = queue.contains(ItemTag::Unit(UnitKind::CreepColony))
            || queue.contains(ItemTag::Unit(UnitKind::SunkenColony));
        if !defence_queued
            && static_defence < self.config.max_static_defense
            && state.has_or_building(UnitKind::SpawningPool)
            && state.workers() > self.config.min_workers
        {
            items.push(ProductionItem::unit(UnitKind::CreepColony));
            items.push(ProductionItem::unit(UnitKind::SunkenColony));
        }

        for evicted in queue.push_front_all(&items) {
            recover_entry(&evicted, self.config.refund_percent, budget, sink);
        }
        if !items.is_empty() {
            tracing::info!(inserted = items.len(), "Queued defence");
        }
        items.len()
    }

    /// Abandon a front item starved of secondary resource. Returns whether it fired.
    fn resolve_deadlock(
        &mut self,
        queue: &mut ProductionQueue,
        state: &ResourceState,
        budget: &mut Budget,
        sink: &mut dyn CommandSink,
    ) -> bool {
        // A gas site under construction is a source on its way.
        let source_pending = state.in_progress_count(UnitKind::Extractor) > 0;
        let starving = queue.front_item().filter(|item| {
            item.secondary_cost > state.pool.secondary
                && !source_pending
                && (state.gas_sites_taken() == 0
                    || state.gathering.secondary_workers == 0
                    || !state.gathering.collecting_secondary)
        });
        let Some(item) = starving.copied() else {
            self.starved = None;
            return false;
        };

        let since = match self.starved {
            Some((tag, since)) if tag == item.tag => since,
            _ => {
                self.starved = Some((item.tag, state.tick));
                state.tick
            }
        };
        if state.tick.saturating_sub(since) < self.config.deadlock_ticks {
            return false;
        }

        if let Ok(entry) = queue.pop_front() {
            recover_entry(&entry, self.config.refund_percent, budget, sink);
        }
        sink.set_gas_collection(false);
        sink.set_gas_collection(true);
        self.starved = None;
        tracing::warn!(item = %item.tag, "Abandoned item starved of secondary resource");
        true
    }

    /// Cancel in-progress items, least valuable first, until `needed`
    /// primary resource has been recovered or nothing eligible is left.
    ///
    /// Never cancels economy units, providers while capacity is short, or
    /// the last base.
    pub fn cancel_for_resources(
        &self,
        needed: u32,
        state: &ResourceState,
        sink: &mut dyn CommandSink,
    ) -> CancellationReport {
        let mut report = CancellationReport::default();
        if needed == 0 {
            return report;
        }

        let mut candidates: Vec<_> = state
            .in_progress
            .iter()
            .filter(|p| self.may_cancel(p.kind, state))
            .copied()
            .collect();
        candidates.sort_by_key(|p| (p.kind.spec().military_value, p.handle));

        let mut bases_left = state.count_line(UnitKind::Hatchery);
        for item in candidates {
            if report.recovered >= needed {
                break;
            }
            if item.kind.traits().contains(KindTraits::BASE) && item.kind.morphs_from().is_none() {
                if bases_left <= 1 {
                    continue;
                }
                bases_left -= 1;
            }
            sink.cancel(item.handle);
            let spec = item.kind.spec();
            report.recovered += refund(spec.primary, self.config.refund_percent);
            report.recovered_secondary += refund(spec.secondary, self.config.refund_percent);
            report.cancelled.push((item.handle, item.kind));
        }

        if report.recovered < needed {
            let shortfall = CancellationShortfall {
                needed,
                recovered: report.recovered,
                shortfall: needed - report.recovered,
            };
            tracing::warn!(
                needed,
                recovered = report.recovered,
                shortfall = shortfall.shortfall,
                "Cancellation fell short"
            );
            report.shortfall = Some(shortfall);
        } else {
            tracing::debug!(needed, recovered = report.recovered, "Cancelled for resources");
        }
        report
    }

    fn may_cancel(&self, kind: UnitKind, state: &ResourceState) -> bool {
        if !kind.spec().cancellable {
            return false;
        }
        if kind.traits().contains(KindTraits::PROVIDER) {
            return state.capacity_excess() >= self.config.min_surplus_to_cancel_provider;
        }
        true
    }
}

fn starts_with(queue: &ProductionQueue, kinds: &[UnitKind]) -> bool {
    queue.len() >= kinds.len()
        && queue
            .iter()
            .zip(kinds)
            .all(|(item, kind)| item.is_unit(*kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opponent::{EnemyKind, OpeningPlan};
    use crate::resources::{InProgress, ResourcePool};
    use crate::world::{CommandLog, SimCommand};

    fn controller() -> EmergencyController {
        EmergencyController::new(EmergencyConfig::default())
    }

    fn healthy() -> ResourceState {
        let mut state = ResourceState::default();
        for (kind, n) in [
            (UnitKind::Hatchery, 1),
            (UnitKind::Drone, 9),
            (UnitKind::Overlord, 1),
        ] {
            state.all.insert(kind, n);
            state.completed.insert(kind, n);
        }
        state.pool = ResourcePool {
            capacity_used: 18,
            capacity_max: 18,
            ..ResourcePool::new(50, 0)
        };
        state
    }

    fn in_progress(state: &mut ResourceState, id: u32, kind: UnitKind) {
        state.in_progress.push(InProgress {
            handle: ItemHandle::new(id),
            kind,
        });
        *state.all.entry(kind).or_default() += 1;
    }

    #[test]
    fn test_refund_floors() {
        assert_eq!(refund(200, 75), 150);
        assert_eq!(refund(75, 75), 56);
    }

    #[test]
    fn test_total_collapse_recovery() {
        let mut state = ResourceState::default();
        state.gathering.collecting_secondary = true;
        let mut queue = ProductionQueue::new();
        queue.push_back(ProductionItem::unit(UnitKind::Mutalisk)).unwrap();
        queue.push_back(ProductionItem::unit(UnitKind::Spire)).unwrap();
        let mut log = CommandLog::new();
        let mut budget = Budget::from_pool(&state.pool);
        let mut ctl = controller();

        let outcome = ctl.handle(&mut queue, &state, &OpponentSnapshot::default(), &mut budget, &mut log);
        assert_eq!(outcome.crisis, Some(CrisisKind::Collapse));
        assert!(outcome.short_circuit);
        let kinds: Vec<_> = queue.iter().filter_map(ProductionItem::unit_kind).collect();
        assert_eq!(kinds, TOTAL_RECOVERY.to_vec());
        assert!(log.commands.contains(&SimCommand::SetGasCollection(false)));
        assert!(ctl.state().active);

        // Retried next tick without clearing again.
        let outcome = ctl.handle(&mut queue, &state, &OpponentSnapshot::default(), &mut budget, &mut log);
        assert_eq!(outcome.inserted, 0);
        assert_eq!(queue.len(), 3);
    }

    #[test]
    fn test_drained_reservations_are_cancelled() {
        let state = ResourceState::default();
        let mut queue = ProductionQueue::new();
        queue.push_back(ProductionItem::unit(UnitKind::Spire)).unwrap();
        queue.mark_reserved(ItemHandle::new(4)).unwrap();
        let mut log = CommandLog::new();
        let mut budget = Budget::default();
        controller().handle(&mut queue, &state, &OpponentSnapshot::default(), &mut budget, &mut log);
        assert_eq!(log.cancelled(), vec![ItemHandle::new(4)]);
        assert_eq!(budget.primary, 150);
    }

    #[test]
    fn test_no_workers_queues_one_drone() {
        let mut state = healthy();
        state.all.remove(&UnitKind::Drone);
        state.completed.remove(&UnitKind::Drone);
        let mut queue = ProductionQueue::new();
        queue.push_back(ProductionItem::unit(UnitKind::Zergling)).unwrap();
        let mut budget = Budget::from_pool(&state.pool);
        let outcome = controller().handle(
            &mut queue,
            &state,
            &OpponentSnapshot::default(),
            &mut budget,
            &mut CommandLog::new(),
        );
        assert!(outcome.short_circuit);
        assert_eq!(queue.len(), 1);
        assert!(queue.front_item().unwrap().is_unit(UnitKind::Drone));
        assert!(outcome.cancellation.is_none());
    }

    #[test]
    fn test_few_workers_does_not_short_circuit() {
        let mut state = healthy();
        state.all.insert(UnitKind::Drone, 2);
        state.completed.insert(UnitKind::Drone, 2);
        let mut queue = ProductionQueue::new();
        let mut budget = Budget::default();
        let outcome = controller().handle(
            &mut queue,
            &state,
            &OpponentSnapshot::default(),
            &mut budget,
            &mut CommandLog::new(),
        );
        assert_eq!(outcome.crisis, Some(CrisisKind::Collapse));
        assert!(!outcome.short_circuit);
        assert!(queue.front_item().unwrap().is_unit(UnitKind::Drone));
    }

    #[test]
    fn test_cancellation_shortfall() {
        let mut state = healthy();
        in_progress(&mut state, 1, UnitKind::SpawningPool);
        let report = controller().cancel_for_resources(200, &state, &mut CommandLog::new());
        assert_eq!(report.recovered, 150);
        assert_eq!(
            report.shortfall,
            Some(CancellationShortfall {
                needed: 200,
                recovered: 150,
                shortfall: 50
            })
        );
    }

    #[test]
    fn test_cancels_least_valuable_first() {
        let mut state = healthy();
        in_progress(&mut state, 1, UnitKind::SpawningPool);
        in_progress(&mut state, 2, UnitKind::Extractor);
        in_progress(&mut state, 3, UnitKind::EvolutionChamber);
        let mut log = CommandLog::new();
        let report = controller().cancel_for_resources(80, &state, &mut log);
        assert_eq!(log.cancelled(), vec![ItemHandle::new(2), ItemHandle::new(3)]);
        assert_eq!(report.recovered, 37 + 56);
        assert!(report.shortfall.is_none());
    }

    #[test]
    fn test_protected_items_survive() {
        let mut state = healthy();
        in_progress(&mut state, 1, UnitKind::Drone);
        in_progress(&mut state, 2, UnitKind::Overlord);
        state.completed.remove(&UnitKind::Hatchery);
        state.all.remove(&UnitKind::Hatchery);
        in_progress(&mut state, 3, UnitKind::Hatchery);
        let mut log = CommandLog::new();
        let report = controller().cancel_for_resources(1000, &state, &mut log);
        // Incoming providers leave enough surplus to drop one; the worker
        // and the last base stay.
        assert_eq!(report.cancelled, vec![(ItemHandle::new(2), UnitKind::Overlord)]);
        assert_eq!(log.cancelled(), vec![ItemHandle::new(2)]);
        assert!(report.shortfall.is_some());
    }

    #[test]
    fn test_threat_inserts_defence() {
        let mut state = healthy();
        state.all.insert(UnitKind::SpawningPool, 1);
        state.completed.insert(UnitKind::SpawningPool, 1);
        state.slots = 2;
        let mut opponent = OpponentSnapshot::default();
        opponent.nearby.insert(EnemyKind::Zealot, 4);
        let mut queue = ProductionQueue::new();
        queue.push_back(ProductionItem::unit(UnitKind::Drone)).unwrap();
        let mut ctl = controller();
        let outcome = ctl.handle(&mut queue, &state, &opponent, &mut Budget::default(), &mut CommandLog::new());
        assert_eq!(outcome.crisis, Some(CrisisKind::Threat));
        let kinds: Vec<_> = queue.iter().filter_map(ProductionItem::unit_kind).collect();
        assert_eq!(
            kinds,
            vec![
                UnitKind::Zergling,
                UnitKind::CreepColony,
                UnitKind::SunkenColony,
                UnitKind::Drone
            ]
        );

        // Defence already queued: only fighters again, and not twice in a row.
        let outcome = ctl.handle(&mut queue, &state, &opponent, &mut Budget::default(), &mut CommandLog::new());
        assert_eq!(outcome.inserted, 0);
    }

    #[test]
    fn test_rush_plan_without_defence_is_a_threat() {
        let mut state = healthy();
        state.all.insert(UnitKind::SpawningPool, 1);
        let opponent = OpponentSnapshot {
            plan: OpeningPlan::FastRush,
            ..OpponentSnapshot::default()
        };
        assert!(controller().is_threatened(&state, &opponent));
        state.all.insert(UnitKind::CreepColony, 1);
        assert!(!controller().is_threatened(&state, &opponent));
    }

    #[test]
    fn test_deadlock_abandons_front_after_window() {
        let mut state = healthy();
        state.all.insert(UnitKind::Extractor, 1);
        state.completed.insert(UnitKind::Extractor, 1);
        let mut queue = ProductionQueue::new();
        queue.push_back(ProductionItem::unit(UnitKind::Mutalisk)).unwrap();
        queue.push_back(ProductionItem::unit(UnitKind::Drone)).unwrap();
        let mut ctl = controller();
        let mut log = CommandLog::new();

        for tick in 0..48 {
            state.tick = tick;
            let outcome = ctl.handle(&mut queue, &state, &OpponentSnapshot::default(), &mut Budget::default(), &mut log);
            assert_eq!(outcome.crisis, None);
        }
        state.tick = 48;
        let outcome = ctl.handle(&mut queue, &state, &OpponentSnapshot::default(), &mut Budget::default(), &mut log);
        assert_eq!(outcome.crisis, Some(CrisisKind::Deadlock));
        assert!(queue.front_item().unwrap().is_unit(UnitKind::Drone));
        assert_eq!(
            log.take(),
            vec![SimCommand::SetGasCollection(false), SimCommand::SetGasCollection(true)]
        );
    }

    #[test]
    fn test_deadlock_waits_for_building_gas_site() {
        let mut state = healthy();
        in_progress(&mut state, 3, UnitKind::Extractor);
        let mut queue = ProductionQueue::new();
        queue.push_back(ProductionItem::unit(UnitKind::Mutalisk)).unwrap();
        let mut ctl = controller();
        let mut log = CommandLog::new();

        for tick in 0..100 {
            state.tick = tick;
            let outcome = ctl.handle(&mut queue, &state, &OpponentSnapshot::default(), &mut Budget::default(), &mut log);
            assert_eq!(outcome.crisis, None);
        }
        assert!(queue.front_item().unwrap().is_unit(UnitKind::Mutalisk));
        assert!(log.take().is_empty());
    }

    #[test]
    fn test_grace_window_and_sustained_crisis() {
        let config = EmergencyConfig {
            grace_ticks: 10,
            sustained_crisis_ticks: 5,
            ..EmergencyConfig::default()
        };
        let mut ctl = EmergencyController::new(config);
        ctl.advance(100, Some(CrisisKind::Threat));
        ctl.advance(104, Some(CrisisKind::Threat));
        assert!(!ctl.sustained_crisis(104));
        assert!(ctl.sustained_crisis(105));
        ctl.advance(113, None);
        assert!(ctl.state().active);
        ctl.advance(114, None);
        assert!(!ctl.state().active);
        assert_eq!(ctl.state().trigger, None);
    }
}
