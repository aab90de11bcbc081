//! Unit mix selection.
//!
//! Given the tech target and the current scores, decide which unit soaks up
//! primary resource, which unit spends secondary resource, and which extra
//! unit (if any) gets topped up to a quota.

use serde::{Deserialize, Serialize};

use crate::catalog::{TechKind, UnitKind};
use crate::config::FillerConfig;
use crate::resources::ResourceState;
use crate::tech::{ScoreTable, TechTarget};

/// Units the filler should produce, in roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UnitMixPlan {
    /// Always affordable from primary alone and made by the basic producer.
    pub primary: UnitKind,
    /// Spends secondary resource, when there is a use for it.
    pub secondary: Option<UnitKind>,
    /// Topped up to `aux_quota` before anything else.
    pub aux: Option<UnitKind>,
    /// Owned count the aux unit is topped up to.
    pub aux_quota: u32,
}

impl Default for UnitMixPlan {
    fn default() -> Self {
        Self::primary_only(UnitKind::Drone)
    }
}

impl UnitMixPlan {
    /// Plan with only a primary unit.
    #[must_use]
    pub const fn primary_only(primary: UnitKind) -> Self {
        Self {
            primary,
            secondary: None,
            aux: None,
            aux_quota: 0,
        }
    }

    /// Whether the aux unit is still below its quota.
    #[must_use]
    pub fn aux_unmet(&self, state: &ResourceState) -> bool {
        self.aux
            .is_some_and(|aux| state.count(aux) < self.aux_quota)
    }
}

/// Chooses the [`UnitMixPlan`] for a target.
#[derive(Debug, Clone, Default)]
pub struct UnitMixSelector {
    config: FillerConfig,
}

impl UnitMixSelector {
    /// Create a selector.
    #[must_use]
    pub const fn new(config: FillerConfig) -> Self {
        Self { config }
    }

    /// Pick the mix for `target`.
    ///
    /// The secondary unit follows the target once the target is unlocked;
    /// until then the best-scoring unlocked tech stands in for it.
    #[must_use]
    pub fn choose_mix(
        &self,
        target: TechTarget,
        state: &ResourceState,
        scores: &ScoreTable,
    ) -> UnitMixPlan {
        let anchor = if target.is_unlocked(state) {
            target
        } else {
            best_unlocked(state, scores)
        };

        let primary = if state.has(UnitKind::SpawningPool) {
            UnitKind::Zergling
        } else {
            UnitKind::Drone
        };

        let secondary = match anchor {
            TechTarget::None | TechTarget::Zerglings => None,
            other => other.unit(),
        };

        let (aux, aux_quota) = self
            .precursor_aux(target, state, secondary)
            .or_else(|| self.secondary_tech_aux(anchor, state, scores, primary))
            .map_or((None, 0), |(kind, quota)| (Some(kind), quota));

        let plan = UnitMixPlan {
            primary,
            secondary,
            aux,
            aux_quota,
        };
        tracing::trace!(?plan, %target, %anchor, "Unit mix");
        plan
    }

    /// Stock precursors for a morph we are about to unlock.
    fn precursor_aux(
        &self,
        target: TechTarget,
        state: &ResourceState,
        secondary: Option<UnitKind>,
    ) -> Option<(UnitKind, u32)> {
        let wants_lurkers = target == TechTarget::Lurkers
            || state.research.researching.contains(&TechKind::LurkerAspect);
        if wants_lurkers
            && state.has(UnitKind::HydraliskDen)
            && state.count(UnitKind::Hydralisk) == 0
            && secondary != Some(UnitKind::Hydralisk)
        {
            return Some((UnitKind::Hydralisk, self.config.hydra_precursor_quota));
        }

        let wants_flyer_morphs = matches!(target, TechTarget::Guardians | TechTarget::Devourers);
        if wants_flyer_morphs
            && state.has_or_building(UnitKind::GreaterSpire)
            && state.count(UnitKind::Mutalisk) < self.config.flyer_precursor_quota
            && secondary != Some(UnitKind::Mutalisk)
        {
            return Some((UnitKind::Mutalisk, self.config.flyer_precursor_quota));
        }
        None
    }

    /// Mix in a second unlocked tech that still scores well.
    fn secondary_tech_aux(
        &self,
        anchor: TechTarget,
        state: &ResourceState,
        scores: &ScoreTable,
        primary: UnitKind,
    ) -> Option<(UnitKind, u32)> {
        let divisor = self.config.aux_divisor.max(1);
        let capped = |target: TechTarget, cap: u32| -> Option<(UnitKind, u32)> {
            let score = scores.get(target);
            if anchor == target || score <= 0 || !target.is_unlocked(state) {
                return None;
            }
            let quota = ((score / divisor) as u32).min(cap);
            let unit = target.unit()?;
            (quota > 0).then_some((unit, quota))
        };

        if let Some(aux) = capped(TechTarget::Guardians, self.config.guardian_cap)
            .or_else(|| capped(TechTarget::Devourers, self.config.devourer_cap))
        {
            return Some(aux);
        }

        if anchor != TechTarget::Lurkers
            && scores.get(TechTarget::Lurkers) > 0
            && TechTarget::Lurkers.is_unlocked(state)
        {
            let quota = state.count(primary) / self.config.primary_per_lurker.max(1);
            if quota > 0 {
                return Some((UnitKind::Lurker, quota));
            }
        }
        None
    }
}

/// Highest-scoring unlocked candidate; ties go to enumeration order.
fn best_unlocked(state: &ResourceState, scores: &ScoreTable) -> TechTarget {
    let mut best = TechTarget::None;
    let mut best_score = i32::MIN;
    for (target, score) in scores.iter() {
        if target.is_unlocked(state) && score > best_score {
            best = target;
            best_score = score;
        }
    }
    best
}
