//! Per-tick resource snapshot.
//!
//! [`ResourceState`] is rebuilt from the world every tick and never mutated
//! by the scheduler. Everything downstream reads it.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::catalog::{KindTraits, TechKind, UnitKind, UpgradeKind};

/// Arena handle for an in-progress item owned by the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ItemHandle(pub u32);

impl ItemHandle {
    /// Create a new handle.
    #[must_use]
    pub const fn new(id: u32) -> Self {
        Self(id)
    }
}

/// Spendable resources and capacity.
///
/// Capacity is in half-units (see [`crate::catalog`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct ResourcePool {
    /// Primary resource on hand.
    pub primary: u32,
    /// Secondary resource on hand.
    pub secondary: u32,
    /// Capacity taken by existing units.
    pub capacity_used: u32,
    /// Capacity reserved by units in production.
    pub capacity_pending: u32,
    /// Capacity supplied by completed providers.
    pub capacity_max: u32,
}

impl ResourcePool {
    /// Create a pool with the given resources and no capacity in use.
    #[must_use]
    pub const fn new(primary: u32, secondary: u32) -> Self {
        Self {
            primary,
            secondary,
            capacity_used: 0,
            capacity_pending: 0,
            capacity_max: 0,
        }
    }

    /// `capacity_used + capacity_pending <= capacity_max`.
    #[must_use]
    pub const fn is_consistent(&self) -> bool {
        self.capacity_used.saturating_add(self.capacity_pending) <= self.capacity_max
    }

    /// Clamp the pending reservation so the pool is consistent again.
    ///
    /// Used capacity can legitimately exceed the maximum after providers die;
    /// only the reservation is trimmed.
    pub fn clamp_pending(&mut self) {
        self.capacity_pending = self
            .capacity_pending
            .min(self.capacity_max.saturating_sub(self.capacity_used));
    }

    /// Check affordability of a cost pair.
    #[must_use]
    pub const fn can_afford(&self, primary: u32, secondary: u32) -> bool {
        self.primary >= primary && self.secondary >= secondary
    }
}

/// Spendable resources for one tick's planning.
///
/// Starts from the snapshot pool; refunds are credited as items are
/// cancelled and planned items are debited as they are emitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Budget {
    /// Primary resource left.
    pub primary: u32,
    /// Secondary resource left.
    pub secondary: u32,
}

impl Budget {
    /// Budget with the given amounts.
    #[must_use]
    pub const fn new(primary: u32, secondary: u32) -> Self {
        Self { primary, secondary }
    }

    /// Budget holding everything in the pool.
    #[must_use]
    pub const fn from_pool(pool: &ResourcePool) -> Self {
        Self::new(pool.primary, pool.secondary)
    }

    /// Check affordability of a cost pair.
    #[must_use]
    pub const fn can_afford(&self, primary: u32, secondary: u32) -> bool {
        self.primary >= primary && self.secondary >= secondary
    }

    /// Debit if affordable. Returns whether the debit happened.
    pub fn try_spend(&mut self, primary: u32, secondary: u32) -> bool {
        if !self.can_afford(primary, secondary) {
            return false;
        }
        self.primary -= primary;
        self.secondary -= secondary;
        true
    }

    /// Debit as much as is there.
    pub fn spend_saturating(&mut self, primary: u32, secondary: u32) {
        self.primary = self.primary.saturating_sub(primary);
        self.secondary = self.secondary.saturating_sub(secondary);
    }

    /// Credit a refund.
    pub fn credit(&mut self, primary: u32, secondary: u32) {
        self.primary = self.primary.saturating_add(primary);
        self.secondary = self.secondary.saturating_add(secondary);
    }
}

/// Gathering activity, as reported by the world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Gathering {
    /// Economy units on the primary resource.
    pub primary_workers: u32,
    /// Economy units on the secondary resource.
    pub secondary_workers: u32,
    /// Whether secondary collection is switched on.
    pub collecting_secondary: bool,
    /// Controllable primary gathering points at our bases.
    pub gathering_points: u32,
}

/// Map and base information from the terrain collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct MapInfo {
    /// Claimable expansion sites with no owner.
    pub free_bases: u32,
    /// Secondary-resource sites at our bases with no gas site on them.
    pub gas_sites_free: u32,
    /// Our bases are cut off from the enemy by ground.
    #[serde(default)]
    pub island: bool,
}

/// Research and upgrade progress.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Research {
    /// Finished research.
    pub researched: BTreeSet<TechKind>,
    /// Research underway.
    pub researching: BTreeSet<TechKind>,
    /// Owned upgrade levels (absent = 0).
    pub levels: BTreeMap<UpgradeKind, u8>,
    /// Upgrades underway.
    pub upgrading: BTreeSet<UpgradeKind>,
}

/// A cancellable item the world is currently producing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InProgress {
    /// World handle used for the cancel command.
    pub handle: ItemHandle,
    /// What is being made.
    pub kind: UnitKind,
}

/// Snapshot of everything the scheduler needs to know about our side.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ResourceState {
    /// Simulation tick this snapshot was taken at.
    pub tick: u64,
    /// Resources and capacity.
    pub pool: ResourcePool,
    /// Owned kinds, complete and in progress.
    #[serde(default)]
    pub all: BTreeMap<UnitKind, u32>,
    /// Owned kinds, complete only.
    #[serde(default)]
    pub completed: BTreeMap<UnitKind, u32>,
    /// Available production slots.
    pub slots: u32,
    /// Gathering activity.
    #[serde(default)]
    pub gathering: Gathering,
    /// Map information.
    #[serde(default)]
    pub map: MapInfo,
    /// Research progress.
    #[serde(default)]
    pub research: Research,
    /// In-progress items, in world order.
    #[serde(default)]
    pub in_progress: Vec<InProgress>,
}

impl ResourceState {
    /// Owned count of `kind`, including in progress.
    #[must_use]
    pub fn count(&self, kind: UnitKind) -> u32 {
        self.all.get(&kind).copied().unwrap_or(0)
    }

    /// Completed count of `kind`.
    #[must_use]
    pub fn completed(&self, kind: UnitKind) -> u32 {
        self.completed.get(&kind).copied().unwrap_or(0)
    }

    /// In-progress count of `kind`.
    #[must_use]
    pub fn in_progress_count(&self, kind: UnitKind) -> u32 {
        self.count(kind).saturating_sub(self.completed(kind))
    }

    /// Owned count of `kind` and of everything that counts as it.
    #[must_use]
    pub fn count_line(&self, kind: UnitKind) -> u32 {
        self.all
            .iter()
            .filter(|(k, _)| k.counts_as(kind))
            .map(|(_, n)| *n)
            .sum()
    }

    /// Completed count of `kind` and of everything that counts as it.
    #[must_use]
    pub fn completed_line(&self, kind: UnitKind) -> u32 {
        self.completed
            .iter()
            .filter(|(k, _)| k.counts_as(kind))
            .map(|(_, n)| *n)
            .sum()
    }

    /// Whether a completed `kind` (or upgraded form) exists.
    #[must_use]
    pub fn has(&self, kind: UnitKind) -> bool {
        self.completed_line(kind) > 0
    }

    /// Whether `kind` (or an upgraded form) exists or is being made.
    #[must_use]
    pub fn has_or_building(&self, kind: UnitKind) -> bool {
        self.count_line(kind) > 0
    }

    /// Whether any of `kinds` exists or is being made. Empty means yes.
    #[must_use]
    pub fn meets(&self, kinds: &[UnitKind]) -> bool {
        kinds.is_empty() || kinds.iter().any(|k| self.has_or_building(*k))
    }

    /// Completed economy units.
    #[must_use]
    pub fn workers(&self) -> u32 {
        self.completed(UnitKind::Drone)
    }

    /// Completed bases of any tier.
    #[must_use]
    pub fn bases(&self) -> u32 {
        self.completed_line(UnitKind::Hatchery)
    }

    /// Tech tier: 3 with a hive, 2 with a lair, 1 otherwise.
    #[must_use]
    pub fn tier(&self) -> u8 {
        if self.has(UnitKind::Hive) {
            3
        } else if self.has(UnitKind::Lair) {
            2
        } else {
            1
        }
    }

    /// Completed gas sites.
    #[must_use]
    pub fn gas_sites_taken(&self) -> u32 {
        self.completed(UnitKind::Extractor)
    }

    /// Whether secondary resource can be obtained now or soon.
    #[must_use]
    pub fn has_secondary_source(&self) -> bool {
        self.count(UnitKind::Extractor) > 0
    }

    /// Capacity that in-progress providers will add.
    #[must_use]
    pub fn capacity_incoming(&self) -> u32 {
        UnitKind::ALL
            .iter()
            .filter(|k| k.spec().provides > 0)
            .map(|k| self.in_progress_count(*k) * k.spec().provides)
            .sum()
    }

    /// Current plus incoming capacity.
    #[must_use]
    pub fn capacity_total(&self) -> u32 {
        self.pool.capacity_max + self.capacity_incoming()
    }

    /// Signed headroom: total minus used minus pending.
    #[must_use]
    pub fn capacity_excess(&self) -> i32 {
        self.capacity_total() as i32
            - self.pool.capacity_used as i32
            - self.pool.capacity_pending as i32
    }

    /// How many economy units the gathering points can use.
    #[must_use]
    pub fn worker_demand(&self) -> u32 {
        self.gathering.gathering_points * 2 + self.gas_sites_taken() * 3
    }

    /// Economy unit cap: what the gathering points can use, within `hard_max`.
    ///
    /// With no gathering points reported the hard maximum applies.
    #[must_use]
    pub fn worker_cap(&self, hard_max: u32) -> u32 {
        match self.worker_demand() {
            0 => hard_max,
            demand => demand.min(hard_max),
        }
    }

    /// Owned upgrade level.
    #[must_use]
    pub fn upgrade_level(&self, upgrade: UpgradeKind) -> u8 {
        self.research.levels.get(&upgrade).copied().unwrap_or(0)
    }

    /// Whether the upgrade is underway.
    #[must_use]
    pub fn is_upgrading(&self, upgrade: UpgradeKind) -> bool {
        self.research.upgrading.contains(&upgrade)
    }

    /// Whether the research is finished.
    #[must_use]
    pub fn has_researched(&self, tech: TechKind) -> bool {
        self.research.researched.contains(&tech)
    }

    /// Whether the research is finished or underway.
    #[must_use]
    pub fn has_or_researching(&self, tech: TechKind) -> bool {
        self.has_researched(tech) || self.research.researching.contains(&tech)
    }

    /// Research and upgrade jobs currently running in buildings of `producer`.
    #[must_use]
    pub fn research_jobs_at(&self, producer: UnitKind) -> u32 {
        let techs = self
            .research
            .researching
            .iter()
            .filter(|t| t.spec().producer == producer)
            .count();
        let ups = self
            .research
            .upgrading
            .iter()
            .filter(|u| u.spec().producer == producer)
            .count();
        (techs + ups) as u32
    }

    /// Capacity taken by our completed fighting units.
    #[must_use]
    pub fn army_capacity(&self) -> u32 {
        self.completed
            .iter()
            .filter(|(k, _)| {
                k.traits().contains(KindTraits::COMBATANT) && !k.is_building()
            })
            .map(|(k, n)| k.spec().capacity * n)
            .sum()
    }

    /// Whether the workers can staff another gas site.
    #[must_use]
    pub fn can_staff_gas_site(&self, workers_per_site: u32) -> bool {
        self.workers() >= 1 + workers_per_site * (self.count(UnitKind::Extractor) + 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state() -> ResourceState {
        let mut s = ResourceState::default();
        s.all.insert(UnitKind::Hatchery, 1);
        s.all.insert(UnitKind::Lair, 1);
        s.all.insert(UnitKind::Overlord, 3);
        s.all.insert(UnitKind::Drone, 10);
        s.completed.insert(UnitKind::Hatchery, 1);
        s.completed.insert(UnitKind::Lair, 1);
        s.completed.insert(UnitKind::Overlord, 2);
        s.completed.insert(UnitKind::Drone, 9);
        s.pool = ResourcePool {
            primary: 100,
            secondary: 50,
            capacity_used: 20,
            capacity_pending: 2,
            capacity_max: 36,
        };
        s
    }

    #[test]
    fn test_counts_and_lines() {
        let s = state();
        assert_eq!(s.count(UnitKind::Drone), 10);
        assert_eq!(s.workers(), 9);
        assert_eq!(s.in_progress_count(UnitKind::Overlord), 1);
        assert_eq!(s.count_line(UnitKind::Hatchery), 2);
        assert_eq!(s.bases(), 2);
        assert_eq!(s.tier(), 2);
        assert!(!s.has(UnitKind::Hive));
    }

    #[test]
    fn test_capacity_includes_incoming_providers() {
        let s = state();
        assert_eq!(s.capacity_incoming(), 16);
        assert_eq!(s.capacity_total(), 52);
        assert_eq!(s.capacity_excess(), 30);
    }

    #[test]
    fn test_pool_consistency() {
        let mut pool = ResourcePool {
            capacity_used: 30,
            capacity_pending: 10,
            capacity_max: 34,
            ..ResourcePool::default()
        };
        assert!(!pool.is_consistent());
        pool.clamp_pending();
        assert!(pool.is_consistent());
        assert_eq!(pool.capacity_pending, 4);

        // Used beyond max: pending drops to zero, used untouched.
        let mut over = ResourcePool {
            capacity_used: 40,
            capacity_pending: 2,
            capacity_max: 34,
            ..ResourcePool::default()
        };
        over.clamp_pending();
        assert_eq!(over.capacity_pending, 0);
        assert_eq!(over.capacity_used, 40);
    }

    #[test]
    fn test_budget_never_goes_negative() {
        let mut budget = Budget::new(100, 25);
        assert!(budget.try_spend(75, 25));
        assert!(!budget.try_spend(50, 0));
        assert_eq!(budget, Budget::new(25, 0));
        budget.spend_saturating(100, 100);
        assert_eq!(budget, Budget::new(0, 0));
        budget.credit(150, 0);
        assert_eq!(budget.primary, 150);
    }

    #[test]
    fn test_meets_any_of() {
        let s = state();
        assert!(s.meets(&[]));
        assert!(s.meets(&[UnitKind::Lair, UnitKind::Hive]));
        assert!(!s.meets(&[UnitKind::Spire]));
    }

    #[test]
    fn test_research_jobs() {
        let mut s = state();
        s.research.upgrading.insert(UpgradeKind::MeleeAttacks);
        s.research.upgrading.insert(UpgradeKind::Carapace);
        s.research.researching.insert(TechKind::LurkerAspect);
        assert_eq!(s.research_jobs_at(UnitKind::EvolutionChamber), 2);
        assert_eq!(s.research_jobs_at(UnitKind::HydraliskDen), 1);
        assert!(s.has_or_researching(TechKind::LurkerAspect));
        assert!(!s.has_researched(TechKind::LurkerAspect));
    }
}
