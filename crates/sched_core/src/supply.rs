//! Capacity planning.
//!
//! Runs every tick. Walks the queue projecting capacity use item by item;
//! a provider found before any deficit means the queue already covers
//! itself. Otherwise the phase bands decide whether the current surplus is
//! thin enough to want another provider.

use crate::catalog::{KindTraits, UnitKind};
use crate::config::SupplyConfig;
use crate::production::{ProductionItem, ProductionQueue};
use crate::resources::ResourceState;

/// Result of the forward scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Projection {
    /// A provider is queued before capacity runs out.
    Covered,
    /// Capacity runs out at the given queue position.
    DeficitAt(usize),
    /// The scan finished without a deficit or a provider.
    Open {
        /// Excess left after every queued item.
        excess: i32,
    },
}

/// Decides when to queue a capacity provider.
#[derive(Debug, Clone, Default)]
pub struct SupplyPlanner {
    config: SupplyConfig,
}

impl SupplyPlanner {
    /// Create a planner.
    #[must_use]
    pub const fn new(config: SupplyConfig) -> Self {
        Self { config }
    }

    /// Project capacity through the queue.
    #[must_use]
    pub fn project(&self, queue: &ProductionQueue, state: &ResourceState) -> Projection {
        let mut excess = state.capacity_excess();
        for (position, item) in queue.iter().enumerate() {
            if item
                .unit_kind()
                .is_some_and(|k| k.traits().contains(KindTraits::PROVIDER))
            {
                return Projection::Covered;
            }
            excess -= item.capacity_delta;
            if excess < 0 {
                return Projection::DeficitAt(position);
            }
        }
        Projection::Open { excess }
    }

    /// The provider to insert at the front, if one is needed.
    ///
    /// Returns at most one item per call; never one once total capacity
    /// reaches the hard cap.
    #[must_use]
    pub fn ensure_capacity(
        &self,
        queue: &ProductionQueue,
        state: &ResourceState,
    ) -> Option<ProductionItem> {
        let total = state.capacity_total();
        if total >= self.config.hard_cap {
            return None;
        }
        let provider = ProductionItem::unit(UnitKind::Overlord);

        match self.project(queue, state) {
            Projection::Covered => None,
            Projection::DeficitAt(position) => {
                tracing::debug!(position, total, "Capacity deficit ahead, queueing provider");
                Some(provider)
            }
            Projection::Open { .. } => {
                let total = total as i32;
                let band = self
                    .config
                    .bands
                    .iter()
                    .rev()
                    .find(|band| total > band.min_total)?;
                let excess = state.capacity_excess();
                if excess <= band.threshold(total) {
                    tracing::debug!(total, excess, "Capacity surplus thin, queueing provider");
                    Some(provider)
                } else {
                    None
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::ResourcePool;

    fn state(used: u32, max: u32) -> ResourceState {
        ResourceState {
            pool: ResourcePool {
                capacity_used: used,
                capacity_max: max,
                ..ResourcePool::new(500, 0)
            },
            ..ResourceState::default()
        }
    }

    fn queue_of(kinds: &[UnitKind]) -> ProductionQueue {
        let mut queue = ProductionQueue::new();
        for kind in kinds {
            queue.push_back(ProductionItem::unit(*kind)).unwrap();
        }
        queue
    }

    fn planner() -> SupplyPlanner {
        SupplyPlanner::new(SupplyConfig::default())
    }

    #[test]
    fn test_projected_deficit_inserts_provider() {
        // Excess 2, two workers queued.
        let s = state(16, 18);
        let queue = queue_of(&[UnitKind::Drone, UnitKind::Drone]);
        assert_eq!(planner().project(&queue, &s), Projection::DeficitAt(1));
        let item = planner().ensure_capacity(&queue, &s).unwrap();
        assert!(item.is_unit(UnitKind::Overlord));
    }

    #[test]
    fn test_queued_provider_covers_deficit() {
        let s = state(16, 18);
        let queue = queue_of(&[UnitKind::Drone, UnitKind::Overlord, UnitKind::Drone, UnitKind::Drone]);
        assert_eq!(planner().project(&queue, &s), Projection::Covered);
        assert!(planner().ensure_capacity(&queue, &s).is_none());
    }

    #[test]
    fn test_worker_buildings_release_capacity() {
        // Excess 0; the pool frees a worker before the drone needs it.
        let s = state(18, 18);
        let queue = queue_of(&[UnitKind::SpawningPool, UnitKind::Drone]);
        assert_eq!(planner().project(&queue, &s), Projection::Open { excess: 0 });
    }

    #[test]
    fn test_early_game_has_no_band() {
        // Total 18 is below every band; no deficit either.
        let s = state(10, 18);
        assert!(planner().ensure_capacity(&ProductionQueue::new(), &s).is_none());
    }

    #[test]
    fn test_band_threshold_triggers() {
        // Total 80 uses the 32 band: 80 / 8 - 2 = 8.
        let s = state(72, 80);
        assert!(planner().ensure_capacity(&ProductionQueue::new(), &s).is_some());
        let s = state(71, 80);
        assert!(planner().ensure_capacity(&ProductionQueue::new(), &s).is_none());
    }

    #[test]
    fn test_late_band() {
        // Total 200: 200 / 8 + 8 = 33.
        let s = state(167, 200);
        assert!(planner().ensure_capacity(&ProductionQueue::new(), &s).is_some());
        let s = state(166, 200);
        assert!(planner().ensure_capacity(&ProductionQueue::new(), &s).is_none());
    }

    #[test]
    fn test_incoming_providers_count() {
        let mut s = state(72, 80);
        s.all.insert(UnitKind::Overlord, 1);
        assert!(planner().ensure_capacity(&ProductionQueue::new(), &s).is_none());
    }

    #[test]
    fn test_hard_cap() {
        let s = state(400, 400);
        let queue = queue_of(&[UnitKind::Ultralisk]);
        assert!(planner().ensure_capacity(&queue, &s).is_none());
    }
}
