//! Property tests over random snapshots.

use proptest::prelude::*;
use sched_core::config::SchedulerConfig;
use sched_core::filler::{EconomyTracker, ProductionFiller};
use sched_core::prelude::*;
use sched_core::sanitizer::QueueSanitizer;
use sched_core::supply::{Projection, SupplyPlanner};
use sched_core::tech::TechPlanner;
use sched_core::unit_mix::UnitMixSelector;
use sched_test_utils::determinism::strategies::{arb_opponent, arb_queue, arb_resource_state};
use sched_test_utils::determinism::{run_determinism_test, WorldScript};

proptest! {
    #![proptest_config(ProptestConfig::with_cases(128))]

    /// A batch never costs more than the budget it was given.
    #[test]
    fn prop_fill_never_overspends(
        state in arb_resource_state(),
        opponent in arb_opponent(),
    ) {
        let config = SchedulerConfig::default();
        let planner = TechPlanner::new(config.tech);
        let scores = planner.score(&state, &opponent, TechTarget::None);
        let target = planner.choose_from_scores(&state, &scores, TechTarget::None, &[]);
        let plan = UnitMixSelector::new(config.filler).choose_mix(target, &state, &scores);
        let budget = Budget::from_pool(&state.pool);

        let batch = ProductionFiller::new(&config).fill(
            &state,
            &plan,
            state.slots,
            budget,
            &mut EconomyTracker::new(),
        );

        let primary: u32 = batch.items.iter().map(|i| i.primary_cost).sum();
        let secondary: u32 = batch.items.iter().map(|i| i.secondary_cost).sum();
        prop_assert!(primary <= budget.primary);
        prop_assert!(secondary <= budget.secondary);
        prop_assert_eq!(batch.primary_left, budget.primary - primary);
        prop_assert_eq!(batch.secondary_left, budget.secondary - secondary);
        prop_assert!(batch.items.iter().filter(|i| i.uses_slot()).count() as u32 <= state.slots);
    }

    /// After a drain the front is sound, and a second drain removes nothing.
    #[test]
    fn prop_drain_is_idempotent(
        state in arb_resource_state(),
        mut queue in arb_queue(16),
    ) {
        let sanitizer = QueueSanitizer::new(&SchedulerConfig::default());
        let mut budget = Budget::from_pool(&state.pool);
        let mut log = CommandLog::new();

        sanitizer.drain(&mut queue, &state, &mut budget, &mut log);
        if let Some(front) = queue.front_item() {
            prop_assert!(!sanitizer.is_useless(front, &state, queue.iter().skip(1)));
        }
        let len = queue.len();
        let second = sanitizer.drain(&mut queue, &state, &mut budget, &mut log);
        prop_assert!(second.is_empty());
        prop_assert_eq!(queue.len(), len);
    }

    /// Choosing twice with the first answer as current gives the same answer.
    #[test]
    fn prop_tech_choice_is_stable(
        state in arb_resource_state(),
        opponent in arb_opponent(),
    ) {
        let planner = TechPlanner::new(SchedulerConfig::default().tech);
        let first = planner.choose_tech_target(&state, &opponent, TechTarget::None);
        let second = planner.choose_tech_target(&state, &opponent, first);
        prop_assert_eq!(first, second);
        let third = planner.choose_tech_target(&state, &opponent, second);
        prop_assert_eq!(second, third);
    }

    /// A forward-scan deficit always produces a provider.
    #[test]
    fn prop_deficit_inserts_provider(
        state in arb_resource_state(),
        queue in arb_queue(16),
    ) {
        let config = SchedulerConfig::default();
        let planner = SupplyPlanner::new(config.supply.clone());
        if matches!(planner.project(&queue, &state), Projection::DeficitAt(_))
            && state.capacity_total() < config.supply.hard_cap
        {
            let provider = planner.ensure_capacity(&queue, &state);
            prop_assert_eq!(provider.map(|p| p.tag), Some(ItemTag::Unit(UnitKind::Overlord)));
        }
    }

    /// A whole tick never leaves the queue over its bound.
    #[test]
    fn prop_tick_respects_queue_bound(
        state in arb_resource_state(),
        opponent in arb_opponent(),
        queue in arb_queue(16),
    ) {
        let mut scheduler = Scheduler::default();
        for item in queue.iter() {
            let _ = scheduler.queue_mut().push_back(*item);
        }
        let report = scheduler.tick(&state, &opponent, &mut CommandLog::new());
        prop_assert!(scheduler.queue().len() <= scheduler.queue().max_len);
        prop_assert_eq!(report.queue_len, scheduler.queue().len());
    }

    /// Two schedulers fed the same script end with the same hash.
    #[test]
    fn prop_scripts_are_deterministic(
        state in arb_resource_state(),
        opponent in arb_opponent(),
        income in 0u32..12,
    ) {
        let script = WorldScript::growing(&state, 64, income).against(opponent);
        let result = run_determinism_test(&SchedulerConfig::default(), &script, 2);
        prop_assert!(result.is_deterministic);
    }
}
