//! Throttled secondary reactions.
//!
//! Small corrections that do not need to run every tick: gas collection
//! toggles, spending floating primary, static defence morphs, anti-air and
//! queue trimming once capacity is maxed. Each group runs when
//! `tick % period` hits its offset.

use serde::{Deserialize, Serialize};

use crate::catalog::UnitKind;
use crate::config::{CadenceConfig, SchedulerConfig};
use crate::emergency::recover_entry;
use crate::opponent::OpponentSnapshot;
use crate::production::{ItemTag, ProductionItem, ProductionQueue};
use crate::resources::{Budget, ResourceState};
use crate::unit_mix::UnitMixPlan;
use crate::world::CommandSink;

/// What a reaction pass did.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ReactionOutcome {
    /// Items inserted at the front, in insertion order.
    pub inserted: Vec<ItemTag>,
    /// Entries removed by trimming.
    pub trimmed: usize,
    /// Gas collection switched to this value.
    pub gas: Option<bool>,
}

/// Cadenced reactions.
#[derive(Debug, Clone, Default)]
pub struct Reactions {
    config: CadenceConfig,
    hard_cap: u32,
    max_workers: u32,
    refund_percent: u32,
}

impl Reactions {
    /// Create the reaction set.
    #[must_use]
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            config: config.cadence,
            hard_cap: config.supply.hard_cap,
            max_workers: config.sanitizer.max_workers,
            refund_percent: config.emergency.refund_percent,
        }
    }

    /// Run whichever groups are due this tick.
    pub fn run(
        &self,
        queue: &mut ProductionQueue,
        state: &ResourceState,
        opponent: &OpponentSnapshot,
        plan: &UnitMixPlan,
        budget: &mut Budget,
        sink: &mut dyn CommandSink,
    ) -> ReactionOutcome {
        let mut outcome = ReactionOutcome::default();
        let phase = state.tick % self.config.period.max(1);

        if phase == self.config.resource_offset {
            outcome.gas = self.toggle_gas(queue, state, sink);
            if let Some(item) = self.spend_float(queue, state, plan) {
                outcome.inserted.push(self.insert(queue, item, budget, sink));
            }
        }
        if phase == self.config.defense_offset {
            for item in self.defense(queue, state, opponent) {
                outcome.inserted.push(self.insert(queue, item, budget, sink));
            }
        }
        if phase == self.config.trim_offset
            && state.pool.capacity_used + 4 >= self.hard_cap
            && queue.len() > self.config.maxed_queue_len
        {
            let trimmed = queue.truncate(self.config.maxed_queue_len);
            for entry in &trimmed {
                recover_entry(entry, self.refund_percent, budget, sink);
            }
            tracing::debug!(trimmed = trimmed.len(), "Trimmed queue at max capacity");
            outcome.trimmed = trimmed.len();
        }
        outcome
    }

    fn insert(
        &self,
        queue: &mut ProductionQueue,
        item: ProductionItem,
        budget: &mut Budget,
        sink: &mut dyn CommandSink,
    ) -> ItemTag {
        if let Some(evicted) = queue.push_front(item) {
            recover_entry(&evicted, self.refund_percent, budget, sink);
        }
        item.tag
    }

    fn toggle_gas(
        &self,
        queue: &ProductionQueue,
        state: &ResourceState,
        sink: &mut dyn CommandSink,
    ) -> Option<bool> {
        let needed: u32 = queue.iter().map(|i| i.secondary_cost).sum();
        let held = state.pool.secondary;
        let collecting = state.gathering.collecting_secondary;
        if collecting && held > self.config.gas_float && needed < held {
            tracing::debug!(held, needed, "Secondary floating, stopping collection");
            sink.set_gas_collection(false);
            Some(false)
        } else if !collecting && state.gas_sites_taken() > 0 && needed > held {
            tracing::debug!(held, needed, "Secondary needed, resuming collection");
            sink.set_gas_collection(true);
            Some(true)
        } else {
            None
        }
    }

    /// Something cheap to make while the front waits on secondary.
    fn spend_float(
        &self,
        queue: &ProductionQueue,
        state: &ResourceState,
        plan: &UnitMixPlan,
    ) -> Option<ProductionItem> {
        let pool = &state.pool;
        if state.slots == 0 {
            return self.macro_base(queue, state);
        }
        let front = queue.front_item()?;
        if front.secondary_cost <= pool.secondary {
            return None;
        }
        let under_cap = state.count(UnitKind::Drone) < state.worker_cap(self.max_workers);
        let kind = if under_cap { UnitKind::Drone } else { plan.primary };
        let item = ProductionItem::unit(kind);
        (pool.primary >= front.primary_cost + 2 * item.primary_cost).then_some(item)
    }

    fn macro_base(&self, queue: &ProductionQueue, state: &ResourceState) -> Option<ProductionItem> {
        let idle = state.pool.primary > self.config.macro_base_float
            && !queue.contains(ItemTag::Unit(UnitKind::Hatchery))
            && state.in_progress_count(UnitKind::Hatchery) == 0;
        idle.then(|| {
            tracing::debug!(primary = state.pool.primary, "No slots and primary floating, adding a base");
            ProductionItem::unit(UnitKind::Hatchery)
        })
    }

    fn defense(
        &self,
        queue: &ProductionQueue,
        state: &ResourceState,
        opponent: &OpponentSnapshot,
    ) -> Vec<ProductionItem> {
        let mut items = Vec::new();

        let creeps = state.completed(UnitKind::CreepColony) as usize;
        let morphs = queue.count_of(ItemTag::Unit(UnitKind::SunkenColony))
            + queue.count_of(ItemTag::Unit(UnitKind::SporeColony));
        if creeps > morphs {
            if opponent.has_air_army() && state.has(UnitKind::EvolutionChamber) {
                items.push(ProductionItem::unit(UnitKind::SporeColony));
            } else if state.has(UnitKind::SpawningPool) {
                items.push(ProductionItem::unit(UnitKind::SunkenColony));
            }
        }

        if opponent.has_air_army()
            && state.has(UnitKind::Spire)
            && state.slots > 0
            && !queue.contains(ItemTag::Unit(UnitKind::Scourge))
        {
            let flyers: u32 = opponent
                .counts
                .iter()
                .filter(|(k, _)| k.is_air())
                .map(|(_, n)| *n)
                .sum();
            if state.count(UnitKind::Scourge) < flyers.min(8) {
                items.push(ProductionItem::unit(UnitKind::Scourge));
            }
        }
        items
    }
}
