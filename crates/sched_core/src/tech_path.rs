//! Buildings, research and upgrades on the way to a tech target.
//!
//! When the queue is refilled, the next steps toward the target go in ahead
//! of the unit batch. A step is only offered once everything it needs is
//! complete, and never when it is already owned, underway or queued.

use crate::catalog::{TechKind, UnitKind, UpgradeKind};
use crate::config::SchedulerConfig;
use crate::opponent::OpponentSnapshot;
use crate::production::{ItemTag, ProductionItem, ProductionQueue};
use crate::resources::{Budget, ResourceState};
use crate::tech::TechTarget;

/// Steps offered per refill.
pub const MAX_STEPS: usize = 2;

/// Generates tech steps and the critical-loss rebuild.
#[derive(Debug, Clone, Default)]
pub struct TechPath {
    rebuild_workers: u32,
    workers_per_gas_site: u32,
}

impl TechPath {
    /// Create a generator.
    #[must_use]
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            rebuild_workers: config.cadence.rebuild_workers,
            workers_per_gas_site: config.sanitizer.workers_per_gas_site,
        }
    }

    /// Rebuild after heavy losses, or open the game.
    ///
    /// Below the rebuild threshold, workers are queued up to it; with no
    /// pool, a pool follows them. Against a rush the pool comes first.
    /// Empty when neither applies.
    #[must_use]
    pub fn critical_steps(
        &self,
        state: &ResourceState,
        opponent: &OpponentSnapshot,
    ) -> Vec<ProductionItem> {
        if state.count_line(UnitKind::Hatchery) == 0 {
            return Vec::new();
        }
        let workers = state.count(UnitKind::Drone);
        let needs_pool = !state.has_or_building(UnitKind::SpawningPool);
        let rushed = opponent.plan.is_rush();

        let mut items = Vec::new();
        if needs_pool && rushed {
            items.push(ProductionItem::unit(UnitKind::SpawningPool));
        }
        for _ in workers..self.rebuild_workers {
            items.push(ProductionItem::unit(UnitKind::Drone));
        }
        if needs_pool && !rushed {
            items.push(ProductionItem::unit(UnitKind::SpawningPool));
        }
        if !items.is_empty() {
            tracing::info!(workers, needs_pool, rushed, steps = items.len(), "Critical rebuild");
        }
        items
    }

    /// Next steps toward `target`, cost reserved from `budget`.
    #[must_use]
    pub fn next_steps(
        &self,
        target: TechTarget,
        state: &ResourceState,
        queue: &ProductionQueue,
        budget: &mut Budget,
    ) -> Vec<ProductionItem> {
        let mut steps = Steps {
            state,
            queue,
            items: Vec::new(),
        };

        if target != TechTarget::None && target != TechTarget::Zerglings {
            self.gas(&mut steps, target);
        }
        match target {
            TechTarget::None => {}
            TechTarget::Zerglings => {
                steps.upgrade(UpgradeKind::MetabolicBoost);
                steps.upgrade(UpgradeKind::AdrenalGlands);
            }
            TechTarget::Hydralisks => {
                steps.unit(UnitKind::HydraliskDen);
                steps.upgrade(UpgradeKind::GroovedSpines);
                steps.upgrade(UpgradeKind::MuscularAugments);
            }
            TechTarget::Lurkers => {
                steps.unit(UnitKind::HydraliskDen);
                steps.unit(UnitKind::Lair);
                steps.tech(TechKind::LurkerAspect);
            }
            TechTarget::Mutalisks => {
                steps.unit(UnitKind::Lair);
                steps.unit(UnitKind::Spire);
                steps.upgrade(UpgradeKind::FlyerAttacks);
            }
            TechTarget::Ultralisks => {
                steps.hive_path();
                steps.unit(UnitKind::UltraliskCavern);
                steps.upgrade(UpgradeKind::AnabolicSynthesis);
                steps.upgrade(UpgradeKind::ChitinousPlating);
            }
            TechTarget::Guardians | TechTarget::Devourers => {
                steps.hive_path();
                steps.unit(UnitKind::Spire);
                steps.unit(UnitKind::GreaterSpire);
                steps.upgrade(UpgradeKind::FlyerAttacks);
            }
        }
        if state.bases() >= 2 && state.workers() >= 20 && target.tier() >= 1 {
            steps.unit(UnitKind::EvolutionChamber);
            steps.upgrade(UpgradeKind::Carapace);
            match target {
                TechTarget::Zerglings | TechTarget::Ultralisks => {
                    steps.upgrade(UpgradeKind::MeleeAttacks);
                }
                TechTarget::Hydralisks | TechTarget::Lurkers => {
                    steps.upgrade(UpgradeKind::MissileAttacks);
                }
                _ => {}
            }
        }

        let mut items = steps.items;
        items.truncate(MAX_STEPS);
        for item in &items {
            budget.spend_saturating(item.primary_cost, item.secondary_cost);
        }
        if !items.is_empty() {
            tracing::debug!(
                %target,
                steps = ?items.iter().map(|i| i.tag).collect::<Vec<_>>(),
                "Tech steps"
            );
        }
        items
    }

    fn gas(&self, steps: &mut Steps<'_>, target: TechTarget) {
        let state = steps.state;
        let wanted = if target.tier() >= 2 {
            state.bases().clamp(1, 2)
        } else {
            1
        };
        if state.count(UnitKind::Extractor) < wanted
            && state.map.gas_sites_free > 0
            && state.can_staff_gas_site(self.workers_per_gas_site)
        {
            steps.push(ProductionItem::unit(UnitKind::Extractor));
        }
    }
}

/// Steps collected for one refill.
struct Steps<'a> {
    state: &'a ResourceState,
    queue: &'a ProductionQueue,
    items: Vec<ProductionItem>,
}

impl Steps<'_> {
    fn pending(&self, tag: ItemTag) -> bool {
        self.queue.contains(tag) || self.items.iter().any(|i| i.tag == tag)
    }

    /// Research queued or collected for buildings of `producer`.
    fn planned_jobs_at(&self, producer: UnitKind) -> u32 {
        let at_producer = |item: &ProductionItem| match item.tag {
            ItemTag::Tech(tech) => tech.spec().producer == producer,
            ItemTag::Upgrade(upgrade) => upgrade.spec().producer == producer,
            _ => false,
        };
        let queued = self.queue.iter().filter(|i| at_producer(*i)).count();
        let collected = self.items.iter().filter(|i| at_producer(*i)).count();
        (queued + collected) as u32
    }

    fn push(&mut self, item: ProductionItem) {
        if !self.pending(item.tag) {
            self.items.push(item);
        }
    }

    /// Prerequisites complete, not a duplicate.
    fn unit(&mut self, kind: UnitKind) {
        let state = self.state;
        let spec = kind.spec();
        let ready = spec.requires.is_empty() || spec.requires.iter().any(|k| state.has(*k));
        let precursor_ready = kind
            .morphs_from()
            .map_or(true, |precursor| state.completed(precursor) > 0);
        if ready && precursor_ready && !state.has_or_building(kind) {
            self.push(ProductionItem::unit(kind));
        }
    }

    fn tech(&mut self, tech: TechKind) {
        let state = self.state;
        let spec = tech.spec();
        let ready = state.has(spec.producer)
            && (spec.requires.is_empty() || spec.requires.iter().any(|k| state.has(*k)));
        if ready && !state.has_or_researching(tech) {
            self.push(ProductionItem::tech(tech));
        }
    }

    fn upgrade(&mut self, upgrade: UpgradeKind) {
        let state = self.state;
        let spec = upgrade.spec();
        let level = state.upgrade_level(upgrade);
        let ready = state.has(spec.producer)
            && (spec.requires.is_empty() || spec.requires.iter().any(|k| state.has(*k)))
            && (!spec.tier_gated || level < state.tier());
        let free = state.research_jobs_at(spec.producer) + self.planned_jobs_at(spec.producer)
            < state.completed_line(spec.producer);
        if ready && free && level < spec.max_level && !state.is_upgrading(upgrade) {
            self.push(ProductionItem::upgrade(upgrade, level));
        }
    }

    /// Lair, queens nest, hive.
    fn hive_path(&mut self) {
        self.unit(UnitKind::Lair);
        self.unit(UnitKind::QueensNest);
        self.unit(UnitKind::Hive);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::opponent::OpeningPlan;

    fn with(kinds: &[(UnitKind, u32)]) -> ResourceState {
        let mut state = ResourceState::default();
        for (kind, n) in kinds {
            state.all.insert(*kind, *n);
            state.completed.insert(*kind, *n);
        }
        state
    }

    fn path() -> TechPath {
        TechPath::new(&SchedulerConfig::default())
    }

    fn kinds(items: &[ProductionItem]) -> Vec<ItemTag> {
        items.iter().map(|i| i.tag).collect()
    }

    #[test]
    fn test_opening_workers_then_pool() {
        let state = with(&[(UnitKind::Hatchery, 1), (UnitKind::Drone, 4)]);
        let items = path().critical_steps(&state, &OpponentSnapshot::default());
        assert_eq!(items.len(), 6);
        assert!(items[..5].iter().all(|i| i.is_unit(UnitKind::Drone)));
        assert!(items[5].is_unit(UnitKind::SpawningPool));
    }

    #[test]
    fn test_rush_puts_pool_first() {
        let state = with(&[(UnitKind::Hatchery, 1), (UnitKind::Drone, 8)]);
        let opponent = OpponentSnapshot {
            plan: OpeningPlan::Proxy,
            ..OpponentSnapshot::default()
        };
        let items = path().critical_steps(&state, &opponent);
        assert_eq!(
            kinds(&items),
            vec![ItemTag::Unit(UnitKind::SpawningPool), ItemTag::Unit(UnitKind::Drone)]
        );
    }

    #[test]
    fn test_healthy_economy_needs_no_rebuild() {
        let state = with(&[
            (UnitKind::Hatchery, 1),
            (UnitKind::Drone, 12),
            (UnitKind::SpawningPool, 1),
        ]);
        assert!(path().critical_steps(&state, &OpponentSnapshot::default()).is_empty());
    }

    #[test]
    fn test_gas_then_den_for_hydras() {
        let mut state = with(&[
            (UnitKind::Hatchery, 1),
            (UnitKind::Drone, 12),
            (UnitKind::SpawningPool, 1),
        ]);
        state.map.gas_sites_free = 1;
        let mut budget = Budget::new(300, 0);
        let items = path().next_steps(TechTarget::Hydralisks, &state, &ProductionQueue::new(), &mut budget);
        assert_eq!(
            kinds(&items),
            vec![ItemTag::Unit(UnitKind::Extractor), ItemTag::Unit(UnitKind::HydraliskDen)]
        );
        assert_eq!(budget, Budget::new(150, 0));
    }

    #[test]
    fn test_queued_steps_not_repeated() {
        let state = with(&[
            (UnitKind::Hatchery, 1),
            (UnitKind::Drone, 12),
            (UnitKind::SpawningPool, 1),
            (UnitKind::Extractor, 1),
        ]);
        let mut queue = ProductionQueue::new();
        queue.push_back(ProductionItem::unit(UnitKind::HydraliskDen)).unwrap();
        let items = path().next_steps(TechTarget::Hydralisks, &state, &queue, &mut Budget::default());
        assert!(items.is_empty());
    }

    #[test]
    fn test_mutalisk_path_waits_for_lair() {
        let mut state = with(&[
            (UnitKind::Hatchery, 1),
            (UnitKind::Drone, 12),
            (UnitKind::SpawningPool, 1),
            (UnitKind::Extractor, 1),
        ]);
        let items = path().next_steps(TechTarget::Mutalisks, &state, &ProductionQueue::new(), &mut Budget::default());
        assert_eq!(kinds(&items), vec![ItemTag::Unit(UnitKind::Lair)]);

        // Lair underway: the spire waits for it to finish.
        state.all.insert(UnitKind::Lair, 1);
        let items = path().next_steps(TechTarget::Mutalisks, &state, &ProductionQueue::new(), &mut Budget::default());
        assert!(items.is_empty());

        state.completed.insert(UnitKind::Lair, 1);
        let items = path().next_steps(TechTarget::Mutalisks, &state, &ProductionQueue::new(), &mut Budget::default());
        assert_eq!(kinds(&items), vec![ItemTag::Unit(UnitKind::Spire)]);
    }

    #[test]
    fn test_lurker_research_after_lair() {
        let state = with(&[
            (UnitKind::Lair, 1),
            (UnitKind::Drone, 12),
            (UnitKind::SpawningPool, 1),
            (UnitKind::Extractor, 1),
            (UnitKind::HydraliskDen, 1),
        ]);
        let items = path().next_steps(TechTarget::Lurkers, &state, &ProductionQueue::new(), &mut Budget::default());
        assert_eq!(kinds(&items), vec![ItemTag::Tech(TechKind::LurkerAspect)]);
    }

    #[test]
    fn test_evolution_upgrades_late() {
        let mut state = with(&[
            (UnitKind::Hatchery, 2),
            (UnitKind::Drone, 24),
            (UnitKind::SpawningPool, 1),
            (UnitKind::EvolutionChamber, 1),
        ]);
        state.research.levels.insert(UpgradeKind::MetabolicBoost, 1);
        // One chamber: carapace only, melee waits.
        let items = path().next_steps(TechTarget::Zerglings, &state, &ProductionQueue::new(), &mut Budget::default());
        assert_eq!(kinds(&items), vec![ItemTag::Upgrade(UpgradeKind::Carapace)]);
    }
}
