//! Tech target scoring and selection.
//!
//! Each candidate is scored against the opponent's estimated composition,
//! then the planner picks the next untaken candidate with tier gating:
//! stay at (or drop below) the current tier while that beats the best tech
//! already owned, and only reach up a tier otherwise. Matchup and map rules
//! rule some candidates out before the pick.

use serde::{Deserialize, Serialize};

use crate::catalog::{TechKind, UnitKind, UpgradeKind};
use crate::config::TechConfig;
use crate::opponent::{EnemyKind, EnemyTraits, OpponentSnapshot, Race};
use crate::resources::ResourceState;

/// The advanced unit the planner is working toward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize)]
pub enum TechTarget {
    /// No active tech goal.
    #[default]
    None,
    /// Melee swarm.
    Zerglings,
    /// Ranged ground and anti-air.
    Hydralisks,
    /// Burrowed splash.
    Lurkers,
    /// Flyers.
    Mutalisks,
    /// Heavy melee.
    Ultralisks,
    /// Air-to-ground siege.
    Guardians,
    /// Air-to-air.
    Devourers,
}

impl TechTarget {
    /// Number of variants, including `None`.
    pub const COUNT: usize = 8;

    /// Every real candidate, in tie-break order.
    pub const CANDIDATES: [TechTarget; 7] = [
        TechTarget::Zerglings,
        TechTarget::Hydralisks,
        TechTarget::Lurkers,
        TechTarget::Mutalisks,
        TechTarget::Ultralisks,
        TechTarget::Guardians,
        TechTarget::Devourers,
    ];

    /// Tech tier: 1 base, 2 mid, 3 top; 0 for `None`.
    #[must_use]
    pub const fn tier(self) -> u8 {
        match self {
            TechTarget::None => 0,
            TechTarget::Zerglings | TechTarget::Hydralisks => 1,
            TechTarget::Lurkers | TechTarget::Mutalisks => 2,
            TechTarget::Ultralisks | TechTarget::Guardians | TechTarget::Devourers => 3,
        }
    }

    /// The unit this target unlocks.
    #[must_use]
    pub const fn unit(self) -> Option<UnitKind> {
        match self {
            TechTarget::None => None,
            TechTarget::Zerglings => Some(UnitKind::Zergling),
            TechTarget::Hydralisks => Some(UnitKind::Hydralisk),
            TechTarget::Lurkers => Some(UnitKind::Lurker),
            TechTarget::Mutalisks => Some(UnitKind::Mutalisk),
            TechTarget::Ultralisks => Some(UnitKind::Ultralisk),
            TechTarget::Guardians => Some(UnitKind::Guardian),
            TechTarget::Devourers => Some(UnitKind::Devourer),
        }
    }

    /// Target associated with a unit kind, if any.
    #[must_use]
    pub fn for_unit(kind: UnitKind) -> TechTarget {
        Self::CANDIDATES
            .into_iter()
            .find(|t| t.unit() == Some(kind))
            .unwrap_or(TechTarget::None)
    }

    /// Whether the tech is already available to us.
    #[must_use]
    pub fn is_unlocked(self, state: &ResourceState) -> bool {
        match self {
            TechTarget::None => false,
            TechTarget::Zerglings => state.has(UnitKind::SpawningPool),
            TechTarget::Hydralisks => state.has(UnitKind::HydraliskDen),
            TechTarget::Lurkers => {
                state.has(UnitKind::HydraliskDen) && state.has_researched(TechKind::LurkerAspect)
            }
            TechTarget::Mutalisks => state.has(UnitKind::Spire),
            TechTarget::Ultralisks => state.has(UnitKind::UltraliskCavern),
            TechTarget::Guardians | TechTarget::Devourers => state.has(UnitKind::GreaterSpire),
        }
    }

    const fn index(self) -> usize {
        self as usize
    }
}

impl std::fmt::Display for TechTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// Score per target. Rebuilt from scratch on every scoring run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoreTable {
    scores: [i32; TechTarget::COUNT],
}

impl ScoreTable {
    /// Score of one target.
    #[must_use]
    pub const fn get(&self, target: TechTarget) -> i32 {
        self.scores[target.index()]
    }

    /// Overwrite one score.
    pub fn set(&mut self, target: TechTarget, score: i32) {
        self.scores[target.index()] = score;
    }

    /// Add to one score.
    pub fn add(&mut self, target: TechTarget, delta: i32) {
        self.scores[target.index()] += delta;
    }

    /// `(target, score)` for every candidate in enumeration order.
    pub fn iter(&self) -> impl Iterator<Item = (TechTarget, i32)> + '_ {
        TechTarget::CANDIDATES.into_iter().map(|t| (t, self.get(t)))
    }
}

/// Chooses the next tech target.
#[derive(Debug, Clone, Default)]
pub struct TechPlanner {
    config: TechConfig,
}

impl TechPlanner {
    /// Create a planner.
    #[must_use]
    pub const fn new(config: TechConfig) -> Self {
        Self { config }
    }

    /// Score every candidate.
    ///
    /// Bias, plus per-enemy-kind counter terms, plus owned upgrade bonuses,
    /// plus the hysteresis bonus for `current`.
    #[must_use]
    pub fn score(
        &self,
        state: &ResourceState,
        opponent: &OpponentSnapshot,
        current: TechTarget,
    ) -> ScoreTable {
        let mut table = ScoreTable::default();
        for target in TechTarget::CANDIDATES {
            table.set(target, self.config.bias.get(target));
        }
        if current != TechTarget::None {
            table.add(current, self.config.hysteresis);
        }

        // Finished ranged upgrades make the lurker morph better value.
        let mut lurker_bonus = 0;
        if state.upgrade_level(UpgradeKind::GroovedSpines) > 0 {
            lurker_bonus += 1;
            if state.tier() >= 2 {
                lurker_bonus += 1;
            }
        }

        for (kind, count) in &opponent.counts {
            if *count > 0 {
                opponent_terms(&mut table, *kind, *count as i32, lurker_bonus);
            }
        }

        if opponent.scouted && !opponent.has_detection() {
            table.add(TechTarget::Lurkers, self.config.undetected_lurker_bonus);
        }

        upgrade_bonus(&mut table, state);

        if opponent.looks_eliminated() {
            table.set(TechTarget::Mutalisks, self.config.eliminated_flyer_score);
        }

        table
    }

    /// Pick the next target.
    #[must_use]
    pub fn choose_tech_target(
        &self,
        state: &ResourceState,
        opponent: &OpponentSnapshot,
        current: TechTarget,
    ) -> TechTarget {
        let scores = self.score(state, opponent, current);
        let excluded = ruled_out(state, opponent);
        let chosen = self.choose_from_scores(state, &scores, current, &excluded);
        tracing::debug!(
            target = %chosen,
            zerglings = scores.get(TechTarget::Zerglings),
            hydralisks = scores.get(TechTarget::Hydralisks),
            lurkers = scores.get(TechTarget::Lurkers),
            mutalisks = scores.get(TechTarget::Mutalisks),
            ultralisks = scores.get(TechTarget::Ultralisks),
            guardians = scores.get(TechTarget::Guardians),
            devourers = scores.get(TechTarget::Devourers),
            "Tech scores"
        );
        chosen
    }

    /// Selection step on precomputed scores.
    ///
    /// Targets in `ruled_out` are never picked.
    #[must_use]
    pub fn choose_from_scores(
        &self,
        state: &ResourceState,
        scores: &ScoreTable,
        current: TechTarget,
        ruled_out: &[TechTarget],
    ) -> TechTarget {
        // Melee is useless and ranged is good, with mid tier far away.
        if scores.get(TechTarget::Zerglings) <= 0
            && scores.get(TechTarget::Hydralisks) > 0
            && !ruled_out.contains(&TechTarget::Hydralisks)
            && !state.has(UnitKind::HydraliskDen)
            && !state.has_or_building(UnitKind::Lair)
        {
            return TechTarget::Hydralisks;
        }

        let tier = state.tier();
        let mut taken = [false; TechTarget::COUNT];
        for target in TechTarget::CANDIDATES {
            taken[target.index()] = target.is_unlocked(state);
        }

        let max_taken_score = TechTarget::CANDIDATES
            .into_iter()
            .filter(|t| taken[t.index()] && t.tier() <= tier)
            .map(|t| scores.get(t))
            .filter(|s| *s > 0)
            .max()
            .unwrap_or(0);

        // Mid tier before top tier while a mid-tier option is still useful.
        let mid_tier = [TechTarget::Lurkers, TechTarget::Mutalisks];
        if mid_tier.iter().all(|t| !taken[t.index()])
            && mid_tier
                .iter()
                .any(|t| scores.get(*t) > 0 && scores.get(*t) >= max_taken_score)
        {
            for target in TechTarget::CANDIDATES {
                if target.tier() == 3 {
                    taken[target.index()] = true;
                }
            }
        }
        for target in ruled_out {
            taken[target.index()] = true;
        }

        let untaken_above = |t: &TechTarget| !taken[t.index()] && scores.get(*t) > max_taken_score;

        if tier < 3 {
            let pick = best_of(
                TechTarget::CANDIDATES
                    .into_iter()
                    .filter(untaken_above)
                    .filter(|t| t.tier() <= tier),
                scores,
                current,
            );
            if pick != TechTarget::None {
                return pick;
            }
        }

        best_of(
            TechTarget::CANDIDATES.into_iter().filter(untaken_above),
            scores,
            current,
        )
    }
}

/// Targets the matchup or the map rules out, whatever they score.
///
/// Against zerg, hydralisks never pay off and lurkers only with top-tier
/// tech. On an island map only air can reach the enemy.
#[must_use]
pub fn ruled_out(state: &ResourceState, opponent: &OpponentSnapshot) -> Vec<TechTarget> {
    let mut out = Vec::new();
    if opponent.race() == Some(Race::Zerg) {
        out.push(TechTarget::Hydralisks);
        if state.tier() < 3 {
            out.push(TechTarget::Lurkers);
        }
    }
    if state.map.island {
        out.extend([TechTarget::Hydralisks, TechTarget::Lurkers, TechTarget::Ultralisks]);
    }
    out.sort();
    out.dedup();
    out
}

/// Strict greatest score; ties keep `current`, else enumeration order.
fn best_of(
    eligible: impl Iterator<Item = TechTarget>,
    scores: &ScoreTable,
    current: TechTarget,
) -> TechTarget {
    let eligible: Vec<TechTarget> = eligible.collect();
    let Some(best) = eligible.iter().map(|t| scores.get(*t)).max() else {
        return TechTarget::None;
    };
    if eligible.contains(&current) && scores.get(current) == best {
        return current;
    }
    eligible
        .into_iter()
        .find(|t| scores.get(*t) == best)
        .unwrap_or(TechTarget::None)
}

/// Counter terms for `count` enemies of one kind.
fn opponent_terms(table: &mut ScoreTable, kind: EnemyKind, count: i32, lurker_bonus: i32) {
    let traits = kind.traits();
    let supply = kind.supply() * count;

    if traits.contains(EnemyTraits::BUILDING) {
        if traits.contains(EnemyTraits::ANTI_GROUND) {
            // Static ground defence: outrange it or tank it.
            table.add(TechTarget::Hydralisks, count * 2);
            table.add(TechTarget::Lurkers, -count * 3);
            table.add(TechTarget::Ultralisks, count * 6);
            table.add(TechTarget::Guardians, count * 6);
        }
        if traits.contains(EnemyTraits::ANTI_AIR) {
            table.add(TechTarget::Mutalisks, -count * 3);
        }
        return;
    }
    if traits.contains(EnemyTraits::WORKER) {
        return;
    }

    table.add(TechTarget::Hydralisks, supply);

    if kind.is_air() {
        if kind.is_anti_air() {
            table.add(TechTarget::Mutalisks, -(supply + 2 * count));
            table.add(TechTarget::Guardians, -(supply + 2 * count));
            table.add(TechTarget::Devourers, 2 * (supply + 4 * count));
        } else {
            table.add(TechTarget::Devourers, supply);
        }
    } else {
        if !traits.contains(EnemyTraits::CLOAKED) {
            table.add(TechTarget::Zerglings, supply);
        }
        table.add(TechTarget::Lurkers, supply + count * lurker_bonus);
        table.add(TechTarget::Ultralisks, supply + count);
        table.add(TechTarget::Guardians, supply);
    }

    if !kind.is_anti_air() && !traits.contains(EnemyTraits::DETECTOR) {
        // Cannot shoot up.
        table.add(TechTarget::Mutalisks, supply + 3 * count);
        table.add(TechTarget::Guardians, supply);
        if traits.contains(EnemyTraits::SPLASH) && !kind.is_air() {
            table.add(TechTarget::Mutalisks, 2 * supply);
            table.add(TechTarget::Hydralisks, -supply);
            table.add(TechTarget::Zerglings, -2 * count);
        }
    } else if !kind.is_air() && kind.is_anti_air() {
        // Ground anti-air that suffers against ranged ground.
        table.add(TechTarget::Hydralisks, supply);
        table.add(TechTarget::Mutalisks, -supply);
        if traits.contains(EnemyTraits::SPLASH) {
            table.add(TechTarget::Zerglings, -4 * count);
        }
    }
}

/// Bonuses for upgrades that amplify a candidate.
fn upgrade_bonus(table: &mut ScoreTable, state: &ResourceState) {
    if state.upgrade_level(UpgradeKind::MetabolicBoost) > 0 {
        table.add(TechTarget::Zerglings, 5);
    }
    if state.upgrade_level(UpgradeKind::AdrenalGlands) > 0 {
        table.add(TechTarget::Zerglings, 15);
    }
    let ultra_ups = i32::from(state.upgrade_level(UpgradeKind::AnabolicSynthesis))
        + i32::from(state.upgrade_level(UpgradeKind::ChitinousPlating));
    table.add(TechTarget::Ultralisks, 12 * ultra_ups);

    let melee = i32::from(state.upgrade_level(UpgradeKind::MeleeAttacks));
    table.add(TechTarget::Zerglings, 2 * melee);
    table.add(TechTarget::Ultralisks, 2 * melee);

    let missile = i32::from(state.upgrade_level(UpgradeKind::MissileAttacks));
    table.add(TechTarget::Hydralisks, 2 * missile);
    table.add(TechTarget::Lurkers, 2 * missile);

    let flyer = i32::from(state.upgrade_level(UpgradeKind::FlyerAttacks));
    table.add(TechTarget::Mutalisks, 2 * flyer);
    table.add(TechTarget::Guardians, 2 * flyer);
    table.add(TechTarget::Devourers, 2 * flyer);
}
