//! A small deterministic stand-in for the game simulation.
//!
//! [`MockWorld`] owns a [`ResourceState`] and moves it forward one tick at a
//! time: it starts whatever the queue front can pay for, counts down build
//! timers, pays income and spawns production slots. It is both the
//! scheduler's [`WorldView`] and its [`CommandSink`].

use sched_core::catalog::{KindTraits, MacroCommand, Producer, TechKind, UnitKind, UpgradeKind};
use sched_core::production::{ItemTag, ProductionItem, ProductionQueue};
use sched_core::resources::{InProgress, ItemHandle, ResourceState};
use sched_core::world::{CommandSink, SimCommand, WorldView};
use tracing::{debug, trace};

use crate::scenario::{IncomeModel, ScriptedLoss};

/// Upper bound on capacity, in half-units.
pub const MAX_CAPACITY: u32 = 400;

/// Gathering points added by each completed base.
pub const POINTS_PER_BASE: u32 = 8;

/// Most queue items the world starts in one tick.
pub const MAX_STARTS_PER_TICK: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum JobKind {
    Unit(ItemHandle, UnitKind),
    Tech(TechKind),
    Upgrade(UpgradeKind),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Job {
    kind: JobKind,
    remaining: u32,
}

/// Deterministic simulation driven by a scenario.
#[derive(Debug, Clone)]
pub struct MockWorld {
    state: ResourceState,
    income: IncomeModel,
    refund_percent: u32,
    jobs: Vec<Job>,
    next_handle: u32,
}

impl MockWorld {
    /// Start from `start`. Anything already in progress gets a full build timer.
    #[must_use]
    pub fn new(start: ResourceState, income: IncomeModel, refund_percent: u32) -> Self {
        let mut jobs: Vec<Job> = start
            .in_progress
            .iter()
            .map(|p| Job {
                kind: JobKind::Unit(p.handle, p.kind),
                remaining: p.kind.spec().build_duration,
            })
            .collect();
        jobs.extend(start.research.researching.iter().map(|t| Job {
            kind: JobKind::Tech(*t),
            remaining: t.spec().build_duration,
        }));
        jobs.extend(start.research.upgrading.iter().map(|u| Job {
            kind: JobKind::Upgrade(*u),
            remaining: u.spec().build_duration,
        }));
        let next_handle = start
            .in_progress
            .iter()
            .map(|p| p.handle.0 + 1)
            .max()
            .unwrap_or(0);

        let mut world = Self {
            state: start,
            income,
            refund_percent: refund_percent.min(100),
            jobs,
            next_handle,
        };
        world.rebalance_gatherers();
        world
    }

    /// The current state.
    #[must_use]
    pub fn state(&self) -> &ResourceState {
        &self.state
    }

    /// Current tick.
    #[must_use]
    pub fn tick(&self) -> u64 {
        self.state.tick
    }

    /// Apply commands recorded during a scheduler tick.
    pub fn apply(&mut self, commands: &[SimCommand]) {
        for command in commands {
            match *command {
                SimCommand::Cancel(handle) => self.cancel(handle),
                SimCommand::SetGasCollection(on) => self.set_gas_collection(on),
            }
        }
    }

    /// Destroy completed units.
    pub fn apply_loss(&mut self, loss: &ScriptedLoss) {
        let lost = self.remove_completed(loss.kind, loss.count);
        if lost > 0 {
            debug!(tick = self.state.tick, kind = %loss.kind, lost, "Scripted loss");
            self.rebalance_gatherers();
        }
    }

    /// Start items off the queue front while they can be paid for.
    ///
    /// Returns the tags started, in order. The first item that cannot
    /// start blocks the rest.
    pub fn execute_front(&mut self, queue: &mut ProductionQueue) -> Vec<ItemTag> {
        let mut started = Vec::new();
        while started.len() < MAX_STARTS_PER_TICK {
            let Some(item) = queue.front_item().copied() else {
                break;
            };
            if !self.try_start(&item) {
                break;
            }
            let _ = queue.pop_front();
            trace!(tick = self.state.tick, tag = ?item.tag, "Started");
            started.push(item.tag);
        }
        started
    }

    /// Try to start one item. Pays for it on success.
    pub fn try_start(&mut self, item: &ProductionItem) -> bool {
        if !self
            .state
            .pool
            .can_afford(item.primary_cost, item.secondary_cost)
        {
            return false;
        }
        let started = match item.tag {
            ItemTag::Unit(kind) => self.start_unit(kind),
            ItemTag::Tech(tech) => self.start_tech(tech),
            ItemTag::Upgrade(upgrade) => self.start_upgrade(upgrade),
            ItemTag::Command(MacroCommand::StartGas) => {
                self.set_gas_collection(true);
                true
            }
            ItemTag::Command(MacroCommand::StopGas) => {
                self.set_gas_collection(false);
                true
            }
        };
        if started {
            self.state.pool.primary -= item.primary_cost;
            self.state.pool.secondary -= item.secondary_cost;
        }
        started
    }

    /// Advance one tick: build timers, income, slots.
    pub fn advance(&mut self) {
        let frames = self.income.frames_per_tick;
        let mut finished = Vec::new();
        self.jobs.retain_mut(|job| {
            job.remaining = job.remaining.saturating_sub(frames);
            if job.remaining == 0 {
                finished.push(job.kind);
                false
            } else {
                true
            }
        });
        for kind in finished {
            self.finish(kind);
        }

        self.state.tick += 1;
        let tick = self.state.tick;

        if tick % u64::from(self.income.period.max(1)) == 0 {
            let gathering = self.state.gathering;
            let mining = gathering
                .primary_workers
                .min(gathering.gathering_points * 2);
            self.state.pool.primary += mining * self.income.primary_per_worker;
            if gathering.collecting_secondary {
                self.state.pool.secondary +=
                    gathering.secondary_workers * self.income.secondary_per_worker;
            }
        }

        if tick % u64::from(self.income.slot_period.max(1)) == 0 {
            let bases = self.state.bases();
            self.state.slots = (self.state.slots + bases).min(self.income.slots_per_base * bases);
        }
    }

    fn requirements_met(&self, requires: &[UnitKind]) -> bool {
        requires.is_empty() || requires.iter().any(|k| self.state.has(*k))
    }

    fn start_unit(&mut self, kind: UnitKind) -> bool {
        let spec = kind.spec();
        if !self.requirements_met(spec.requires) {
            return false;
        }
        if spec
            .requires_tech
            .is_some_and(|tech| !self.state.has_researched(tech))
        {
            return false;
        }
        let pool = self.state.pool;
        let headroom = pool
            .capacity_max
            .saturating_sub(pool.capacity_used + pool.capacity_pending);

        match spec.producer {
            Producer::Larva => {
                if self.state.slots == 0 || spec.capacity > headroom {
                    return false;
                }
                self.state.slots -= 1;
                self.state.pool.capacity_pending += spec.capacity;
            }
            Producer::Worker => {
                if self.state.workers() == 0 {
                    return false;
                }
                if kind.traits().contains(KindTraits::BASE) {
                    if self.state.map.free_bases == 0 {
                        return false;
                    }
                    self.state.map.free_bases -= 1;
                }
                if kind.traits().contains(KindTraits::GAS_SITE) {
                    if self.state.map.gas_sites_free == 0 {
                        return false;
                    }
                    self.state.map.gas_sites_free -= 1;
                }
                self.remove_completed(UnitKind::Drone, 1);
                self.rebalance_gatherers();
            }
            Producer::Morph(precursor) if kind.is_building() => {
                // The old building keeps working until the morph lands.
                let morphing: u32 = self
                    .state
                    .in_progress
                    .iter()
                    .filter(|p| p.kind.morphs_from() == Some(precursor))
                    .count() as u32;
                if self.state.completed(precursor) <= morphing {
                    return false;
                }
            }
            Producer::Morph(precursor) => {
                let freed = precursor.spec().capacity;
                if self.state.completed(precursor) == 0 || spec.capacity > headroom + freed {
                    return false;
                }
                self.remove_completed(precursor, 1);
                self.state.pool.capacity_pending += spec.capacity;
            }
            Producer::Building(_) | Producer::World => return false,
        }

        let handle = ItemHandle::new(self.next_handle);
        self.next_handle += 1;
        *self.state.all.entry(kind).or_insert(0) += 1;
        self.state.in_progress.push(InProgress { handle, kind });
        self.jobs.push(Job {
            kind: JobKind::Unit(handle, kind),
            remaining: spec.build_duration,
        });
        true
    }

    fn start_tech(&mut self, tech: TechKind) -> bool {
        let spec = tech.spec();
        if !self.state.has(spec.producer)
            || !self.requirements_met(spec.requires)
            || self.state.has_or_researching(tech)
        {
            return false;
        }
        self.state.research.researching.insert(tech);
        self.jobs.push(Job {
            kind: JobKind::Tech(tech),
            remaining: spec.build_duration,
        });
        true
    }

    fn start_upgrade(&mut self, upgrade: UpgradeKind) -> bool {
        let spec = upgrade.spec();
        if !self.state.has(spec.producer)
            || !self.requirements_met(spec.requires)
            || self.state.is_upgrading(upgrade)
            || self.state.upgrade_level(upgrade) >= spec.max_level
        {
            return false;
        }
        self.state.research.upgrading.insert(upgrade);
        self.jobs.push(Job {
            kind: JobKind::Upgrade(upgrade),
            remaining: spec.build_duration,
        });
        true
    }

    fn finish(&mut self, job: JobKind) {
        match job {
            JobKind::Unit(handle, kind) => {
                self.state.in_progress.retain(|p| p.handle != handle);
                let spec = kind.spec();
                if let Producer::Morph(precursor) = spec.producer {
                    if kind.is_building() {
                        // Capacity and gathering points carry over to the new form.
                        for counts in [&mut self.state.completed, &mut self.state.all] {
                            if let Some(n) = counts.get_mut(&precursor) {
                                *n = n.saturating_sub(1);
                            }
                        }
                    }
                }
                if matches!(spec.producer, Producer::Larva | Producer::Morph(_)) {
                    let pool = &mut self.state.pool;
                    pool.capacity_pending = pool.capacity_pending.saturating_sub(spec.capacity);
                    pool.capacity_used += spec.capacity;
                }
                *self.state.completed.entry(kind).or_insert(0) += 1;
                if spec.provides > 0 {
                    let pool = &mut self.state.pool;
                    pool.capacity_max = (pool.capacity_max + spec.provides).min(MAX_CAPACITY);
                }
                if kind.traits().contains(KindTraits::BASE) && kind.morphs_from().is_none() {
                    self.state.gathering.gathering_points += POINTS_PER_BASE;
                }
                self.rebalance_gatherers();
            }
            JobKind::Tech(tech) => {
                self.state.research.researching.remove(&tech);
                self.state.research.researched.insert(tech);
            }
            JobKind::Upgrade(upgrade) => {
                self.state.research.upgrading.remove(&upgrade);
                *self.state.research.levels.entry(upgrade).or_insert(0) += 1;
            }
        }
    }

    /// Remove up to `n` completed `kind`, with their capacity. Returns how many went.
    fn remove_completed(&mut self, kind: UnitKind, n: u32) -> u32 {
        let n = n.min(self.state.completed(kind));
        if n == 0 {
            return 0;
        }
        if let Some(c) = self.state.completed.get_mut(&kind) {
            *c -= n;
        }
        if let Some(a) = self.state.all.get_mut(&kind) {
            *a = a.saturating_sub(n);
        }
        let spec = kind.spec();
        let pool = &mut self.state.pool;
        pool.capacity_used = pool.capacity_used.saturating_sub(spec.capacity * n);
        pool.capacity_max = pool.capacity_max.saturating_sub(spec.provides * n);
        if kind.traits().contains(KindTraits::BASE) {
            let gathering = &mut self.state.gathering;
            gathering.gathering_points = gathering
                .gathering_points
                .saturating_sub(POINTS_PER_BASE * n);
        }
        n
    }

    /// Split the completed economy units between the two resources.
    fn rebalance_gatherers(&mut self) {
        let total = self.state.workers();
        let on_gas = if self.state.gathering.collecting_secondary {
            (self.income.workers_per_gas_site * self.state.gas_sites_taken()).min(total)
        } else {
            0
        };
        self.state.gathering.secondary_workers = on_gas;
        self.state.gathering.primary_workers = total - on_gas;
    }

    fn refund(&self, primary: u32, secondary: u32) -> (u32, u32) {
        (
            primary * self.refund_percent / 100,
            secondary * self.refund_percent / 100,
        )
    }
}

impl WorldView for MockWorld {
    fn snapshot(&self) -> ResourceState {
        self.state.clone()
    }
}

impl CommandSink for MockWorld {
    fn cancel(&mut self, handle: ItemHandle) {
        let Some(index) = self.state.in_progress.iter().position(|p| p.handle == handle) else {
            // Reservations the world never saw.
            trace!(handle = handle.0, "Cancel for unknown handle ignored");
            return;
        };
        let kind = self.state.in_progress.remove(index).kind;
        self.jobs
            .retain(|job| !matches!(job.kind, JobKind::Unit(h, _) if h == handle));
        if let Some(a) = self.state.all.get_mut(&kind) {
            *a = a.saturating_sub(1);
        }

        let spec = kind.spec();
        let (primary, secondary) = self.refund(spec.primary, spec.secondary);
        self.state.pool.primary += primary;
        self.state.pool.secondary += secondary;

        match spec.producer {
            Producer::Larva => {
                let pool = &mut self.state.pool;
                pool.capacity_pending = pool.capacity_pending.saturating_sub(spec.capacity);
            }
            Producer::Worker => {
                *self.state.all.entry(UnitKind::Drone).or_insert(0) += 1;
                *self.state.completed.entry(UnitKind::Drone).or_insert(0) += 1;
                self.state.pool.capacity_used += UnitKind::Drone.spec().capacity;
                if kind.traits().contains(KindTraits::BASE) {
                    self.state.map.free_bases += 1;
                }
                if kind.traits().contains(KindTraits::GAS_SITE) {
                    self.state.map.gas_sites_free += 1;
                }
                self.rebalance_gatherers();
            }
            Producer::Morph(precursor) if !kind.is_building() => {
                *self.state.all.entry(precursor).or_insert(0) += 1;
                *self.state.completed.entry(precursor).or_insert(0) += 1;
                let pool = &mut self.state.pool;
                pool.capacity_pending = pool.capacity_pending.saturating_sub(spec.capacity);
                pool.capacity_used += precursor.spec().capacity;
            }
            Producer::Morph(_) | Producer::Building(_) | Producer::World => {}
        }
        debug!(handle = handle.0, kind = %kind, refunded = primary, "Cancelled");
    }

    fn set_gas_collection(&mut self, on: bool) {
        if self.state.gathering.collecting_secondary != on {
            debug!(tick = self.state.tick, on, "Gas collection switched");
        }
        self.state.gathering.collecting_secondary = on;
        self.rebalance_gatherers();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sched_test_utils::fixtures::StateBuilder;

    fn world(state: ResourceState) -> MockWorld {
        MockWorld::new(state, IncomeModel::default(), 75)
    }

    fn run_until_idle(world: &mut MockWorld) {
        for _ in 0..200 {
            world.advance();
        }
    }

    #[test]
    fn test_larva_unit_takes_slot_and_capacity() {
        let mut world = world(StateBuilder::opening().build());
        assert!(world.try_start(&ProductionItem::unit(UnitKind::Drone)));
        let state = world.state();
        assert_eq!(state.slots, 2);
        assert_eq!(state.pool.primary, 0);
        assert_eq!(state.pool.capacity_pending, 2);
        assert_eq!(state.in_progress_count(UnitKind::Drone), 1);

        run_until_idle(&mut world);
        let state = world.state();
        assert_eq!(state.workers(), 5);
        assert_eq!(state.pool.capacity_pending, 0);
        assert_eq!(state.pool.capacity_used, 10);
    }

    #[test]
    fn test_unaffordable_front_blocks() {
        let mut world = world(StateBuilder::opening().build());
        let mut queue = ProductionQueue::new();
        queue
            .push_back(ProductionItem::unit(UnitKind::SpawningPool))
            .unwrap();
        queue.push_back(ProductionItem::unit(UnitKind::Drone)).unwrap();

        assert!(world.execute_front(&mut queue).is_empty());
        assert_eq!(queue.len(), 2);
    }

    #[test]
    fn test_worker_building_consumes_drone() {
        let mut world = world(StateBuilder::opening().resources(200, 0).build());
        assert!(world.try_start(&ProductionItem::unit(UnitKind::SpawningPool)));
        assert_eq!(world.state().workers(), 3);
        assert_eq!(world.state().pool.capacity_used, 6);
        assert_eq!(world.state().gathering.primary_workers, 3);
    }

    #[test]
    fn test_cancel_refunds_and_returns_drone() {
        let mut world = world(StateBuilder::opening().resources(200, 0).build());
        assert!(world.try_start(&ProductionItem::unit(UnitKind::SpawningPool)));
        let handle = world.state().in_progress[0].handle;

        world.apply(&[SimCommand::Cancel(handle)]);

        let state = world.state();
        assert_eq!(state.pool.primary, 150);
        assert_eq!(state.workers(), 4);
        assert_eq!(state.count(UnitKind::SpawningPool), 0);
        assert!(state.in_progress.is_empty());
    }

    #[test]
    fn test_cancel_unknown_handle_is_ignored() {
        let mut world = world(StateBuilder::opening().build());
        let before = world.state().clone();
        world.cancel(ItemHandle::new(99));
        assert_eq!(world.state(), &before);
    }

    #[test]
    fn test_provider_raises_capacity_on_completion() {
        let mut world = world(StateBuilder::opening().resources(100, 0).build());
        assert!(world.try_start(&ProductionItem::unit(UnitKind::Overlord)));
        assert_eq!(world.state().capacity_incoming(), 16);
        run_until_idle(&mut world);
        assert_eq!(world.state().pool.capacity_max, 34);
    }

    #[test]
    fn test_gas_toggle_moves_gatherers() {
        let mut world = world(StateBuilder::two_base().collecting_gas(false).build());
        assert_eq!(world.state().gathering.secondary_workers, 0);
        world.apply(&[SimCommand::SetGasCollection(true)]);
        assert_eq!(world.state().gathering.secondary_workers, 3);
        assert_eq!(world.state().gathering.primary_workers, 21);
        world.apply(&[SimCommand::SetGasCollection(false)]);
        assert_eq!(world.state().gathering.primary_workers, 24);
    }

    #[test]
    fn test_income_and_slots() {
        let mut world = world(StateBuilder::opening().resources(0, 0).slots(0).build());
        for _ in 0..14 {
            world.advance();
        }
        let state = world.state();
        assert_eq!(state.tick, 14);
        // Payouts on ticks 4, 8 and 12: four miners at five each.
        assert_eq!(state.pool.primary, 60);
        assert_eq!(state.slots, 1);
    }

    #[test]
    fn test_scripted_loss_removes_capacity() {
        let mut world = world(StateBuilder::opening().build());
        world.apply_loss(&ScriptedLoss {
            tick: 0,
            kind: UnitKind::Overlord,
            count: 3,
        });
        let state = world.state();
        assert_eq!(state.count(UnitKind::Overlord), 0);
        assert_eq!(state.pool.capacity_max, 2);
    }

    #[test]
    fn test_base_morph_keeps_base_working() {
        let mut world = world(
            StateBuilder::opening()
                .with(UnitKind::SpawningPool, 1)
                .resources(500, 500)
                .build(),
        );
        assert!(world.try_start(&ProductionItem::unit(UnitKind::Lair)));
        assert_eq!(world.state().bases(), 1);
        // One hatchery, already morphing.
        assert!(!world.try_start(&ProductionItem::unit(UnitKind::Lair)));
        run_until_idle(&mut world);
        let state = world.state();
        assert!(state.has(UnitKind::Lair));
        assert_eq!(state.completed(UnitKind::Hatchery), 0);
        assert_eq!(state.bases(), 1);
    }
}
