//! Queue front sanitation.
//!
//! The world changes under the queue: buildings die, research finishes,
//! workers get pulled. Every tick the front item is checked against a closed
//! set of rules and dropped while it can no longer be made or no longer
//! serves a purpose.

use serde::{Deserialize, Serialize};

use crate::catalog::{KindTraits, TechKind, UnitKind, UpgradeKind};
use crate::config::{SanitizerConfig, SchedulerConfig};
use crate::emergency::recover_entry;
use crate::production::{ItemTag, ProductionItem, ProductionQueue};
use crate::resources::{Budget, ResourceState};
use crate::world::CommandSink;

/// Why an item was dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UselessReason {
    /// Needs secondary resource we hold too little of and cannot collect.
    NoSecondarySource,
    /// Already owned, maxed or underway.
    AlreadySatisfied,
    /// A required building, precursor, research or tier is gone.
    PrerequisiteLost,
    /// Every producer of this research is busy.
    ProducerBusy,
    /// Not enough economy units to spare one.
    TooFewWorkers,
    /// No free site for another gas site.
    NoGasSite,
    /// Economy units are at their cap.
    WorkerCap,
    /// Capacity already covers everything queued.
    CapacitySurplus,
}

impl std::fmt::Display for UselessReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::NoSecondarySource => "no secondary source",
            Self::AlreadySatisfied => "already satisfied",
            Self::PrerequisiteLost => "prerequisite lost",
            Self::ProducerBusy => "producer busy",
            Self::TooFewWorkers => "too few workers",
            Self::NoGasSite => "no gas site",
            Self::WorkerCap => "worker cap",
            Self::CapacitySurplus => "capacity surplus",
        };
        f.write_str(text)
    }
}

/// Buildings we only ever want one of.
const SINGLETONS: [UnitKind; 8] = [
    UnitKind::SpawningPool,
    UnitKind::HydraliskDen,
    UnitKind::Spire,
    UnitKind::GreaterSpire,
    UnitKind::QueensNest,
    UnitKind::UltraliskCavern,
    UnitKind::Lair,
    UnitKind::Hive,
];

/// Drops infeasible or pointless items from the queue front.
#[derive(Debug, Clone, Default)]
pub struct QueueSanitizer {
    config: SanitizerConfig,
    hard_cap: u32,
    surplus_divisor: i32,
    surplus_offset: i32,
    refund_percent: u32,
}

impl QueueSanitizer {
    /// Create a sanitizer from the scheduler configuration.
    #[must_use]
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            config: config.sanitizer,
            hard_cap: config.supply.hard_cap,
            surplus_divisor: config.supply.surplus_divisor,
            surplus_offset: config.supply.surplus_offset,
            refund_percent: config.emergency.refund_percent,
        }
    }

    /// Whether `item` should be dropped.
    ///
    /// `rest` is the queue the item sits in front of; it is only used to
    /// size the capacity a provider still has to cover.
    #[must_use]
    pub fn is_useless<'a>(
        &self,
        item: &ProductionItem,
        state: &ResourceState,
        rest: impl IntoIterator<Item = &'a ProductionItem>,
    ) -> bool {
        self.useless_reason(item, state, rest).is_some()
    }

    /// The first rule `item` breaks, if any.
    #[must_use]
    pub fn useless_reason<'a>(
        &self,
        item: &ProductionItem,
        state: &ResourceState,
        rest: impl IntoIterator<Item = &'a ProductionItem>,
    ) -> Option<UselessReason> {
        let reason = match item.tag {
            ItemTag::Command(_) => return None,
            ItemTag::Upgrade(upgrade) => self.check_upgrade(upgrade, state),
            ItemTag::Tech(tech) => self.check_tech(tech, state),
            ItemTag::Unit(kind) => self.check_unit(kind, state, rest),
        };
        reason.or_else(|| {
            (item.secondary_cost > state.pool.secondary && !state.has_secondary_source())
                .then_some(UselessReason::NoSecondarySource)
        })
    }

    /// Drop useless front entries until the front is sound.
    ///
    /// Reserved entries are cancelled and their refund credited to `budget`.
    /// A reserved entry is only dropped as already satisfied when the
    /// finished result is owned, since in-progress counts include its own
    /// work. Bounded by the queue length.
    pub fn drain(
        &self,
        queue: &mut ProductionQueue,
        state: &ResourceState,
        budget: &mut Budget,
        sink: &mut dyn CommandSink,
    ) -> Vec<(ItemTag, UselessReason)> {
        let mut dropped = Vec::new();
        for _ in 0..queue.len() {
            let Some(front) = queue.front() else {
                break;
            };
            let reason = self
                .useless_reason(&front.item, state, queue.iter().skip(1))
                // A reserved entry may itself be the one underway.
                .filter(|r| {
                    *r != UselessReason::AlreadySatisfied
                        || front.reservation.is_none()
                        || owned_outright(&front.item, state)
                });
            let Some(reason) = reason else {
                break;
            };
            let Ok(entry) = queue.pop_front() else {
                break;
            };
            tracing::debug!(item = %entry.item.tag, %reason, "Dropped useless item");
            recover_entry(&entry, self.refund_percent, budget, sink);
            dropped.push((entry.item.tag, reason));
        }
        dropped
    }

    fn check_upgrade(&self, upgrade: UpgradeKind, state: &ResourceState) -> Option<UselessReason> {
        let spec = upgrade.spec();
        let level = state.upgrade_level(upgrade);
        if state.is_upgrading(upgrade) || level >= spec.max_level {
            return Some(UselessReason::AlreadySatisfied);
        }
        if !state.has_or_building(spec.producer)
            || !state.meets(spec.requires)
            || (spec.tier_gated && level >= state.tier())
        {
            return Some(UselessReason::PrerequisiteLost);
        }
        self.check_producer(spec.producer, state)
    }

    fn check_tech(&self, tech: TechKind, state: &ResourceState) -> Option<UselessReason> {
        let spec = tech.spec();
        if state.has_or_researching(tech) {
            return Some(UselessReason::AlreadySatisfied);
        }
        if !state.has_or_building(spec.producer) || !state.meets(spec.requires) {
            return Some(UselessReason::PrerequisiteLost);
        }
        self.check_producer(spec.producer, state)
    }

    fn check_producer(&self, producer: UnitKind, state: &ResourceState) -> Option<UselessReason> {
        let owned = state.completed_line(producer);
        (owned > 0 && state.research_jobs_at(producer) >= owned)
            .then_some(UselessReason::ProducerBusy)
    }

    fn check_unit<'a>(
        &self,
        kind: UnitKind,
        state: &ResourceState,
        rest: impl IntoIterator<Item = &'a ProductionItem>,
    ) -> Option<UselessReason> {
        let spec = kind.spec();
        if SINGLETONS.contains(&kind) && state.count_line(kind) > 0 {
            return Some(UselessReason::AlreadySatisfied);
        }
        if !state.meets(spec.requires) {
            return Some(UselessReason::PrerequisiteLost);
        }
        if spec
            .requires_tech
            .is_some_and(|tech| !state.has_or_researching(tech))
        {
            return Some(UselessReason::PrerequisiteLost);
        }
        if kind.morphs_from().is_some_and(|precursor| state.count(precursor) == 0) {
            return Some(UselessReason::PrerequisiteLost);
        }

        if kind.is_building() {
            return self.check_building(kind, state);
        }
        if kind == UnitKind::Drone
            && state.count(UnitKind::Drone) >= state.worker_cap(self.config.max_workers)
        {
            return Some(UselessReason::WorkerCap);
        }
        if spec.traits.contains(KindTraits::PROVIDER) {
            return self.check_provider(state, rest);
        }
        None
    }

    fn check_building(&self, kind: UnitKind, state: &ResourceState) -> Option<UselessReason> {
        let workers = state.workers();
        let bases = state.bases();
        let first_base = kind.traits().contains(KindTraits::BASE)
            && state.count_line(UnitKind::Hatchery) == 0;
        if kind.consumes_worker() && !first_base && workers <= self.config.min_workers_for_buildings {
            return Some(UselessReason::TooFewWorkers);
        }
        match kind {
            UnitKind::Hatchery
                if bases > 0
                    && workers + 1 < 3 * (bases + 1)
                    && state.pool.primary <= self.config.expansion_float + 150 * bases =>
            {
                Some(UselessReason::TooFewWorkers)
            }
            UnitKind::Extractor if state.map.gas_sites_free == 0 => Some(UselessReason::NoGasSite),
            UnitKind::Extractor if !state.can_staff_gas_site(self.config.workers_per_gas_site) => {
                Some(UselessReason::TooFewWorkers)
            }
            _ => None,
        }
    }

    fn check_provider<'a>(
        &self,
        state: &ResourceState,
        rest: impl IntoIterator<Item = &'a ProductionItem>,
    ) -> Option<UselessReason> {
        let total = state.capacity_total();
        if total >= self.hard_cap {
            return Some(UselessReason::CapacitySurplus);
        }
        let consumption: i32 = rest
            .into_iter()
            .map(|item| item.capacity_delta.max(0))
            .sum();
        let margin = total as i32 / self.surplus_divisor.max(1) + self.surplus_offset;
        (state.capacity_excess() - consumption >= margin).then_some(UselessReason::CapacitySurplus)
    }
}

/// Whether the result of `item` is finished and owned, ignoring anything
/// still in progress.
fn owned_outright(item: &ProductionItem, state: &ResourceState) -> bool {
    match item.tag {
        ItemTag::Command(_) => false,
        ItemTag::Unit(kind) => state.completed_line(kind) > 0,
        ItemTag::Tech(tech) => state.has_researched(tech),
        ItemTag::Upgrade(upgrade) => state.upgrade_level(upgrade) >= upgrade.spec().max_level,
    }
}
