//! Test fixtures and helpers.
//!
//! Pre-built resource states and opponent snapshots for consistent
//! testing.

use fixed::types::I32F32;
use sched_core::catalog::{TechKind, UnitKind, UpgradeKind};
use sched_core::opponent::{EnemyKind, OpeningPlan, OpponentSnapshot};
use sched_core::resources::{InProgress, ItemHandle, ResourcePool, ResourceState};

/// Create a fixed-point number from an integer.
#[must_use]
pub fn fixed(n: i32) -> I32F32 {
    I32F32::from_num(n)
}

/// Parse a [`ResourceState`] written in RON.
///
/// # Panics
///
/// Panics if the text is not a valid state; fixtures are test input.
#[must_use]
pub fn state_from_ron(text: &str) -> ResourceState {
    match ron::from_str(text) {
        Ok(state) => state,
        Err(e) => panic!("bad state fixture: {e}"),
    }
}

/// Builder for [`ResourceState`] fixtures.
///
/// Owned kinds added with [`with`](Self::with) are complete; kinds added
/// with [`building`](Self::building) are in progress and cancellable.
#[derive(Debug, Clone, Default)]
pub struct StateBuilder {
    state: ResourceState,
    next_handle: u32,
}

impl StateBuilder {
    /// Empty state: nothing owned, no resources.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard game start: one base, four economy units, one
    /// provider, three slots.
    #[must_use]
    pub fn opening() -> Self {
        Self::new()
            .with(UnitKind::Hatchery, 1)
            .with(UnitKind::Drone, 4)
            .with(UnitKind::Overlord, 1)
            .resources(50, 0)
            .capacity(8, 18)
            .slots(3)
            .gathering_points(8)
            .free_bases(3)
            .gas_sites_free(1)
    }

    /// A settled two-base economy with a pool and a gas site.
    #[must_use]
    pub fn two_base() -> Self {
        Self::new()
            .with(UnitKind::Hatchery, 2)
            .with(UnitKind::Drone, 24)
            .with(UnitKind::Overlord, 4)
            .with(UnitKind::SpawningPool, 1)
            .with(UnitKind::Extractor, 1)
            .with(UnitKind::Zergling, 6)
            .resources(400, 100)
            .capacity(60, 74)
            .slots(4)
            .gathering_points(16)
            .collecting_gas(true)
            .free_bases(2)
            .gas_sites_free(1)
    }

    /// Set the tick.
    #[must_use]
    pub fn tick(mut self, tick: u64) -> Self {
        self.state.tick = tick;
        self
    }

    /// Set resources on hand.
    #[must_use]
    pub fn resources(mut self, primary: u32, secondary: u32) -> Self {
        self.state.pool.primary = primary;
        self.state.pool.secondary = secondary;
        self
    }

    /// Set used and maximum capacity.
    #[must_use]
    pub fn capacity(mut self, used: u32, max: u32) -> Self {
        self.state.pool.capacity_used = used;
        self.state.pool.capacity_max = max;
        self
    }

    /// Set pending capacity.
    #[must_use]
    pub fn pending(mut self, pending: u32) -> Self {
        self.state.pool.capacity_pending = pending;
        self
    }

    /// Replace the whole pool.
    #[must_use]
    pub fn pool(mut self, pool: ResourcePool) -> Self {
        self.state.pool = pool;
        self
    }

    /// Set available production slots.
    #[must_use]
    pub fn slots(mut self, slots: u32) -> Self {
        self.state.slots = slots;
        self
    }

    /// Add `n` completed `kind`.
    #[must_use]
    pub fn with(mut self, kind: UnitKind, n: u32) -> Self {
        *self.state.all.entry(kind).or_insert(0) += n;
        *self.state.completed.entry(kind).or_insert(0) += n;
        if kind == UnitKind::Drone {
            self.state.gathering.primary_workers += n;
        }
        self
    }

    /// Add one in-progress `kind` with the next free handle.
    #[must_use]
    pub fn building(mut self, kind: UnitKind) -> Self {
        let handle = ItemHandle::new(self.next_handle);
        self.next_handle += 1;
        *self.state.all.entry(kind).or_insert(0) += 1;
        self.state.in_progress.push(InProgress { handle, kind });
        self
    }

    /// Set the number of primary gathering points.
    #[must_use]
    pub fn gathering_points(mut self, points: u32) -> Self {
        self.state.gathering.gathering_points = points;
        self
    }

    /// Move `n` economy units from primary to secondary gathering.
    #[must_use]
    pub fn gas_workers(mut self, n: u32) -> Self {
        let gathering = &mut self.state.gathering;
        gathering.primary_workers = gathering.primary_workers.saturating_sub(n);
        gathering.secondary_workers += n;
        self
    }

    /// Switch secondary collection.
    #[must_use]
    pub fn collecting_gas(mut self, on: bool) -> Self {
        self.state.gathering.collecting_secondary = on;
        self
    }

    /// Set free expansion sites.
    #[must_use]
    pub fn free_bases(mut self, n: u32) -> Self {
        self.state.map.free_bases = n;
        self
    }

    /// Set free gas sites.
    #[must_use]
    pub fn gas_sites_free(mut self, n: u32) -> Self {
        self.state.map.gas_sites_free = n;
        self
    }

    /// Mark the map as an island map.
    #[must_use]
    pub fn island(mut self) -> Self {
        self.state.map.island = true;
        self
    }

    /// Mark research as finished.
    #[must_use]
    pub fn researched(mut self, tech: TechKind) -> Self {
        self.state.research.researched.insert(tech);
        self
    }

    /// Set an owned upgrade level.
    #[must_use]
    pub fn upgrade(mut self, upgrade: UpgradeKind, level: u8) -> Self {
        self.state.research.levels.insert(upgrade, level);
        self
    }

    /// Finish the state.
    #[must_use]
    pub fn build(self) -> ResourceState {
        self.state
    }
}

/// An opponent that has been scouted with the given composition.
#[must_use]
pub fn scouted(counts: &[(EnemyKind, u32)]) -> OpponentSnapshot {
    OpponentSnapshot {
        scouted: true,
        ..OpponentSnapshot::from_counts(counts)
    }
}

/// An opponent massing flyers.
#[must_use]
pub fn air_heavy() -> OpponentSnapshot {
    scouted(&[
        (EnemyKind::Wraith, 8),
        (EnemyKind::Battlecruiser, 3),
        (EnemyKind::Marine, 4),
    ])
}

/// An opponent rushing with melee units already near our base.
#[must_use]
pub fn rushing() -> OpponentSnapshot {
    let mut opponent = scouted(&[(EnemyKind::Zealot, 4)]);
    opponent.nearby.insert(EnemyKind::Zealot, 4);
    opponent.plan = OpeningPlan::FastRush;
    opponent
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_opening_is_consistent() {
        let state = StateBuilder::opening().build();
        assert!(state.pool.is_consistent());
        assert_eq!(state.workers(), 4);
        assert_eq!(state.bases(), 1);
    }

    #[test]
    fn test_building_is_in_progress() {
        let state = StateBuilder::new()
            .building(UnitKind::SpawningPool)
            .building(UnitKind::Overlord)
            .build();
        assert_eq!(state.in_progress_count(UnitKind::SpawningPool), 1);
        assert!(!state.has(UnitKind::SpawningPool));
        assert_eq!(state.in_progress[1].handle, ItemHandle::new(1));
    }

    #[test]
    fn test_state_from_ron() {
        let state = state_from_ron("(tick: 7, pool: (primary: 10, secondary: 0, capacity_used: 0, capacity_pending: 0, capacity_max: 0), slots: 1)");
        assert_eq!(state.tick, 7);
        assert_eq!(state.slots, 1);
    }
}
