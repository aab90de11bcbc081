//! Turning a unit mix into a concrete batch.
//!
//! One production slot makes one item. The filler spends the tick budget on
//! the plan's units without ever letting either resource go negative, and
//! mixes in economy units to hold the configured economy share.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::catalog::UnitKind;
use crate::config::{FillerConfig, SchedulerConfig};
use crate::math::{from_permille, ratio, Fixed};
use crate::production::ProductionItem;
use crate::resources::{Budget, ResourceState};
use crate::unit_mix::UnitMixPlan;

/// Running share of economy units among slot-made units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct EconomyTracker {
    /// Economy units emitted.
    pub economy: u32,
    /// All slot-made units emitted.
    pub total: u32,
}

impl EconomyTracker {
    /// Create an empty tracker.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            economy: 0,
            total: 0,
        }
    }

    /// Current economy share.
    #[must_use]
    pub fn share(&self) -> Fixed {
        ratio(self.economy, self.total.max(1))
    }

    /// Whether the share is below `target_permille`.
    #[must_use]
    pub fn wants_economy(&self, target_permille: u32) -> bool {
        self.share() < from_permille(target_permille)
    }

    /// Count one emitted item.
    pub fn record(&mut self, item: &ProductionItem) {
        if !item.uses_slot() {
            return;
        }
        self.total = self.total.saturating_add(1);
        if item.is_unit(UnitKind::Drone) {
            self.economy = self.economy.saturating_add(1);
        }
    }
}

/// One fill's output.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FillBatch {
    /// Items in emission order.
    pub items: Vec<ProductionItem>,
    /// Primary resource not spent.
    pub primary_left: u32,
    /// Secondary resource not spent.
    pub secondary_left: u32,
}

/// Fills production slots from a [`UnitMixPlan`].
#[derive(Debug, Clone, Default)]
pub struct ProductionFiller {
    config: FillerConfig,
    max_workers: u32,
}

/// Mutable state of one fill.
struct Run<'a> {
    state: &'a ResourceState,
    budget: Budget,
    slots: u32,
    items: Vec<ProductionItem>,
    drones: u32,
    morphs: BTreeMap<UnitKind, u32>,
}

impl Run<'_> {
    /// Swap a morph for its precursor when no precursor is left to morph.
    fn resolve(&self, kind: UnitKind) -> UnitKind {
        match kind.morphs_from() {
            Some(precursor) if !precursor.is_building() => {
                let used = self.morphs.get(&precursor).copied().unwrap_or(0);
                if self.state.completed(precursor) > used {
                    kind
                } else {
                    precursor
                }
            }
            _ => kind,
        }
    }

    /// Emit if a slot and the budget allow it.
    fn emit(&mut self, kind: UnitKind, economy: &mut EconomyTracker) -> bool {
        let item = ProductionItem::unit(kind);
        if self.slots == 0 || !self.budget.try_spend(item.primary_cost, item.secondary_cost) {
            return false;
        }
        self.slots -= 1;
        if kind == UnitKind::Drone {
            self.drones += 1;
        }
        if let Some(precursor) = kind.morphs_from() {
            *self.morphs.entry(precursor).or_default() += 1;
        }
        economy.record(&item);
        self.items.push(item);
        true
    }
}

impl ProductionFiller {
    /// Create a filler.
    #[must_use]
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            config: config.filler,
            max_workers: config.sanitizer.max_workers,
        }
    }

    /// Spend `budget` and up to `slots` slots on `plan`.
    ///
    /// At most one aux item comes first. Then either primary only, or
    /// secondary units first, alternating with primary units while the
    /// secondary still to make leaves slots and primary to spare. Leftover
    /// primary above the threshold buys a capped number of extra primary
    /// units.
    pub fn fill(
        &self,
        state: &ResourceState,
        plan: &UnitMixPlan,
        slots: u32,
        budget: Budget,
        economy: &mut EconomyTracker,
    ) -> FillBatch {
        let mut run = Run {
            state,
            budget,
            slots,
            items: Vec::new(),
            drones: 0,
            morphs: BTreeMap::new(),
        };

        if plan.aux_unmet(state) {
            if let Some(aux) = plan.aux {
                let kind = run.resolve(aux);
                run.emit(kind, economy);
            }
        }

        match self.secondary_unit(state, plan, &run.budget) {
            None => {
                while run.slots > 0 {
                    let Some(kind) = self.primary_kind(plan, &run, economy) else {
                        break;
                    };
                    if !run.emit(kind, economy) {
                        break;
                    }
                }
            }
            Some(secondary) => {
                let spec = secondary.spec();
                let mut remaining = 1 + run.budget.secondary / spec.secondary.max(1);
                let mut secondary_next = true;
                while run.slots > 0 {
                    if remaining > 0 && secondary_next {
                        // Mix in primary units while they fit beside the rest.
                        if remaining < run.slots
                            && remaining.saturating_mul(spec.primary) < run.budget.primary
                        {
                            secondary_next = false;
                        }
                        remaining -= 1;
                        let kind = run.resolve(secondary);
                        if !run.emit(kind, economy) {
                            remaining = 0;
                        }
                        continue;
                    }
                    secondary_next = true;
                    let Some(kind) = self.primary_kind(plan, &run, economy) else {
                        break;
                    };
                    if !run.emit(kind, economy) {
                        break;
                    }
                }
            }
        }

        let leftover = run.budget.primary > self.config.leftover_threshold
            || (run.budget.secondary < 100 && run.budget.primary >= 100);
        if leftover {
            for _ in 0..self.config.leftover_cap {
                let Some(kind) = self.primary_kind(plan, &run, economy) else {
                    break;
                };
                if !run.emit(kind, economy) {
                    break;
                }
            }
        }

        tracing::debug!(
            items = run.items.len(),
            primary_left = run.budget.primary,
            secondary_left = run.budget.secondary,
            slots_left = run.slots,
            "Fill batch"
        );
        FillBatch {
            items: run.items,
            primary_left: run.budget.primary,
            secondary_left: run.budget.secondary,
        }
    }

    /// The secondary unit, unless it should sit this fill out.
    fn secondary_unit(
        &self,
        state: &ResourceState,
        plan: &UnitMixPlan,
        budget: &Budget,
    ) -> Option<UnitKind> {
        let secondary = plan.secondary?;
        if budget.secondary < secondary.spec().secondary {
            return None;
        }
        let built_secondary = state.count(secondary);
        if built_secondary > 0
            && ratio(state.count(plan.primary), built_secondary)
                < from_permille(self.config.ratio_floor_permille)
        {
            return None;
        }
        Some(secondary)
    }

    /// The primary-role unit, with economy units substituted to hold the share.
    fn primary_kind(
        &self,
        plan: &UnitMixPlan,
        run: &Run<'_>,
        economy: &EconomyTracker,
    ) -> Option<UnitKind> {
        let workers = run.state.count(UnitKind::Drone) + run.drones;
        let can_drone = workers < run.state.worker_cap(self.max_workers);
        if plan.primary == UnitKind::Drone {
            return can_drone.then_some(UnitKind::Drone);
        }
        if can_drone && economy.wants_economy(self.config.economy_share_permille) {
            Some(UnitKind::Drone)
        } else {
            Some(plan.primary)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with(kinds: &[(UnitKind, u32)]) -> ResourceState {
        let mut state = ResourceState::default();
        for (kind, n) in kinds {
            state.all.insert(*kind, *n);
            state.completed.insert(*kind, *n);
        }
        state
    }

    fn filler(share: u32) -> ProductionFiller {
        let mut config = SchedulerConfig::default();
        config.filler.economy_share_permille = share;
        ProductionFiller::new(&config)
    }

    fn cost(items: &[ProductionItem]) -> (u32, u32) {
        items
            .iter()
            .fold((0, 0), |(p, s), i| (p + i.primary_cost, s + i.secondary_cost))
    }

    #[test]
    fn test_exact_spend_on_primary() {
        let state = with(&[(UnitKind::SpawningPool, 1)]);
        let plan = UnitMixPlan::primary_only(UnitKind::Zergling);
        let batch = filler(0).fill(&state, &plan, 4, Budget::new(200, 0), &mut EconomyTracker::new());
        assert_eq!(batch.items.len(), 4);
        assert!(batch.items.iter().all(|i| i.is_unit(UnitKind::Zergling)));
        assert_eq!(batch.primary_left, 0);
    }

    #[test]
    fn test_slots_bound_the_batch() {
        let state = with(&[(UnitKind::SpawningPool, 1)]);
        let plan = UnitMixPlan::primary_only(UnitKind::Zergling);
        let batch = filler(0).fill(&state, &plan, 2, Budget::new(1000, 0), &mut EconomyTracker::new());
        assert_eq!(batch.items.len(), 2);
        assert_eq!(batch.primary_left, 900);
    }

    #[test]
    fn test_economy_share_substitutes_workers() {
        let state = with(&[(UnitKind::SpawningPool, 1), (UnitKind::Drone, 10)]);
        let plan = UnitMixPlan::primary_only(UnitKind::Zergling);
        let mut economy = EconomyTracker::new();
        let batch = filler(500).fill(&state, &plan, 4, Budget::new(200, 0), &mut economy);
        let drones = batch.items.iter().filter(|i| i.is_unit(UnitKind::Drone)).count();
        assert_eq!(drones, 2);
        assert_eq!(economy, EconomyTracker { economy: 2, total: 4 });
    }

    #[test]
    fn test_worker_cap_stops_worker_only_plan() {
        let mut state = with(&[(UnitKind::Drone, 3)]);
        state.gathering.gathering_points = 2;
        let plan = UnitMixPlan::primary_only(UnitKind::Drone);
        let batch = filler(0).fill(&state, &plan, 4, Budget::new(500, 0), &mut EconomyTracker::new());
        assert_eq!(batch.items.len(), 1);
    }

    #[test]
    fn test_secondary_first_then_interleaved() {
        let state = with(&[(UnitKind::SpawningPool, 1), (UnitKind::HydraliskDen, 1)]);
        let plan = UnitMixPlan {
            secondary: Some(UnitKind::Hydralisk),
            ..UnitMixPlan::primary_only(UnitKind::Zergling)
        };
        let batch = filler(0).fill(&state, &plan, 6, Budget::new(500, 50), &mut EconomyTracker::new());
        let kinds: Vec<_> = batch.items.iter().filter_map(ProductionItem::unit_kind).collect();
        assert_eq!(
            kinds,
            vec![
                UnitKind::Hydralisk,
                UnitKind::Zergling,
                UnitKind::Hydralisk,
                UnitKind::Zergling,
                UnitKind::Zergling,
                UnitKind::Zergling,
            ]
        );
        let (p, s) = cost(&batch.items);
        assert!(p <= 500 && s <= 50);
        assert_eq!(batch.secondary_left, 0);
    }

    #[test]
    fn test_secondary_only_while_slots_are_short() {
        let state = with(&[(UnitKind::SpawningPool, 1), (UnitKind::HydraliskDen, 1)]);
        let plan = UnitMixPlan {
            secondary: Some(UnitKind::Hydralisk),
            ..UnitMixPlan::primary_only(UnitKind::Zergling)
        };
        let batch = filler(0).fill(&state, &plan, 3, Budget::new(500, 100), &mut EconomyTracker::new());
        let kinds: Vec<_> = batch.items.iter().filter_map(ProductionItem::unit_kind).collect();
        assert_eq!(kinds, vec![UnitKind::Hydralisk; 3]);
    }

    #[test]
    fn test_low_ratio_forces_primary() {
        let state = with(&[
            (UnitKind::SpawningPool, 1),
            (UnitKind::HydraliskDen, 1),
            (UnitKind::Hydralisk, 20),
            (UnitKind::Zergling, 2),
        ]);
        let plan = UnitMixPlan {
            secondary: Some(UnitKind::Hydralisk),
            ..UnitMixPlan::primary_only(UnitKind::Zergling)
        };
        let batch = filler(0).fill(&state, &plan, 3, Budget::new(500, 500), &mut EconomyTracker::new());
        assert!(batch.items.iter().all(|i| i.is_unit(UnitKind::Zergling)));
    }

    #[test]
    fn test_aux_first_with_morph_precursor() {
        let state = with(&[(UnitKind::SpawningPool, 1), (UnitKind::HydraliskDen, 1)]);
        let plan = UnitMixPlan {
            aux: Some(UnitKind::Lurker),
            aux_quota: 2,
            ..UnitMixPlan::primary_only(UnitKind::Zergling)
        };
        let batch = filler(0).fill(&state, &plan, 2, Budget::new(200, 100), &mut EconomyTracker::new());
        assert!(batch.items[0].is_unit(UnitKind::Hydralisk));
        assert!(batch.items[1].is_unit(UnitKind::Zergling));
    }

    #[test]
    fn test_dregs_capped() {
        let state = with(&[(UnitKind::SpawningPool, 1), (UnitKind::HydraliskDen, 1)]);
        let plan = UnitMixPlan {
            secondary: Some(UnitKind::Hydralisk),
            ..UnitMixPlan::primary_only(UnitKind::Zergling)
        };
        // One secondary unit is all the secondary buys; primary takes the rest.
        let batch = filler(0).fill(&state, &plan, 20, Budget::new(2000, 25), &mut EconomyTracker::new());
        let hydras = batch.items.iter().filter(|i| i.is_unit(UnitKind::Hydralisk)).count();
        assert_eq!(hydras, 1);
        let (p, s) = cost(&batch.items);
        assert!(p <= 2000 && s <= 25);
        assert_eq!(batch.primary_left, 2000 - p);
    }

    #[test]
    fn test_tracker_share() {
        let mut tracker = EconomyTracker::new();
        assert!(tracker.wants_economy(200));
        assert!(!tracker.wants_economy(0));
        tracker.record(&ProductionItem::unit(UnitKind::Drone));
        tracker.record(&ProductionItem::unit(UnitKind::Zergling));
        tracker.record(&ProductionItem::unit(UnitKind::Spire));
        assert_eq!(tracker.total, 2);
        assert_eq!(tracker.share(), from_permille(500));
    }
}
