//! Opponent intelligence as seen by the scheduler.
//!
//! The opponent model is an external collaborator. It hands us an
//! [`OpponentSnapshot`]: estimated counts per [`EnemyKind`], the subset seen
//! near our bases, and the opening plan it recognised.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Bitflags describing an enemy kind.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct EnemyTraits(u16);

impl EnemyTraits {
    /// Flies.
    pub const AIR: Self = Self(1 << 0);
    /// Can shoot air targets.
    pub const ANTI_AIR: Self = Self(1 << 1);
    /// Can shoot ground targets.
    pub const ANTI_GROUND: Self = Self(1 << 2);
    /// Gathers resources.
    pub const WORKER: Self = Self(1 << 3);
    /// Immobile.
    pub const BUILDING: Self = Self(1 << 4);
    /// Reveals cloaked units.
    pub const DETECTOR: Self = Self(1 << 5);
    /// Area damage.
    pub const SPLASH: Self = Self(1 << 6);
    /// Permanently or optionally cloaked.
    pub const CLOAKED: Self = Self(1 << 7);

    /// Empty set.
    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Check if all flags in `other` are set in `self`.
    #[inline]
    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        (self.0 & other.0) == other.0
    }

    /// Union of flags.
    #[inline]
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// The opponent's race.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Race {
    /// Mechanical infantry and vehicles.
    Terran,
    /// Shielded psionic units.
    Protoss,
    /// The swarm; a mirror matchup.
    Zerg,
}

/// Enemy unit and structure kinds the opponent model reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[allow(missing_docs)]
pub enum EnemyKind {
    // Terran
    Scv,
    Marine,
    Firebat,
    Medic,
    Ghost,
    Vulture,
    SiegeTank,
    Goliath,
    Wraith,
    Dropship,
    Valkyrie,
    ScienceVessel,
    Battlecruiser,
    Bunker,
    MissileTurret,
    // Protoss
    Probe,
    Zealot,
    Dragoon,
    HighTemplar,
    DarkTemplar,
    Archon,
    Reaver,
    Observer,
    Shuttle,
    Corsair,
    Scout,
    Carrier,
    Arbiter,
    PhotonCannon,
    // Zerg
    Drone,
    Zergling,
    Hydralisk,
    Lurker,
    Mutalisk,
    Scourge,
    Ultralisk,
    Guardian,
    Devourer,
    Overlord,
    SunkenColony,
    SporeColony,
}

const G: EnemyTraits = EnemyTraits::ANTI_GROUND;
const GA: EnemyTraits = EnemyTraits::ANTI_GROUND.union(EnemyTraits::ANTI_AIR);
const FLY: EnemyTraits = EnemyTraits::AIR;
const BLD: EnemyTraits = EnemyTraits::BUILDING;
const SPLASH: EnemyTraits = EnemyTraits::SPLASH;
const CLOAK: EnemyTraits = EnemyTraits::CLOAKED;
const DET: EnemyTraits = EnemyTraits::DETECTOR;

impl EnemyKind {
    /// Race that fields this kind.
    #[must_use]
    pub const fn race(self) -> Race {
        match self {
            EnemyKind::Scv
            | EnemyKind::Marine
            | EnemyKind::Firebat
            | EnemyKind::Medic
            | EnemyKind::Ghost
            | EnemyKind::Vulture
            | EnemyKind::SiegeTank
            | EnemyKind::Goliath
            | EnemyKind::Wraith
            | EnemyKind::Dropship
            | EnemyKind::Valkyrie
            | EnemyKind::ScienceVessel
            | EnemyKind::Battlecruiser
            | EnemyKind::Bunker
            | EnemyKind::MissileTurret => Race::Terran,
            EnemyKind::Probe
            | EnemyKind::Zealot
            | EnemyKind::Dragoon
            | EnemyKind::HighTemplar
            | EnemyKind::DarkTemplar
            | EnemyKind::Archon
            | EnemyKind::Reaver
            | EnemyKind::Observer
            | EnemyKind::Shuttle
            | EnemyKind::Corsair
            | EnemyKind::Scout
            | EnemyKind::Carrier
            | EnemyKind::Arbiter
            | EnemyKind::PhotonCannon => Race::Protoss,
            EnemyKind::Drone
            | EnemyKind::Zergling
            | EnemyKind::Hydralisk
            | EnemyKind::Lurker
            | EnemyKind::Mutalisk
            | EnemyKind::Scourge
            | EnemyKind::Ultralisk
            | EnemyKind::Guardian
            | EnemyKind::Devourer
            | EnemyKind::Overlord
            | EnemyKind::SunkenColony
            | EnemyKind::SporeColony => Race::Zerg,
        }
    }

    /// Capacity the kind consumes, in the same half-units as our own.
    ///
    /// Static defence gets a nominal weight so it can be scored.
    #[must_use]
    pub const fn supply(self) -> i32 {
        match self {
            EnemyKind::Zergling | EnemyKind::Scourge => 1,
            EnemyKind::Scv
            | EnemyKind::Marine
            | EnemyKind::Firebat
            | EnemyKind::Medic
            | EnemyKind::Ghost
            | EnemyKind::Probe
            | EnemyKind::Drone
            | EnemyKind::Hydralisk
            | EnemyKind::MissileTurret
            | EnemyKind::SporeColony
            | EnemyKind::Observer => 2,
            EnemyKind::Vulture
            | EnemyKind::SiegeTank
            | EnemyKind::Goliath
            | EnemyKind::Wraith
            | EnemyKind::Dropship
            | EnemyKind::Valkyrie
            | EnemyKind::ScienceVessel
            | EnemyKind::Zealot
            | EnemyKind::Dragoon
            | EnemyKind::HighTemplar
            | EnemyKind::DarkTemplar
            | EnemyKind::Reaver
            | EnemyKind::Shuttle
            | EnemyKind::Corsair
            | EnemyKind::Lurker
            | EnemyKind::Mutalisk
            | EnemyKind::Guardian
            | EnemyKind::Devourer
            | EnemyKind::Bunker
            | EnemyKind::PhotonCannon
            | EnemyKind::SunkenColony => 4,
            EnemyKind::Scout | EnemyKind::Arbiter => 6,
            EnemyKind::Archon | EnemyKind::Carrier | EnemyKind::Ultralisk => 8,
            EnemyKind::Battlecruiser => 12,
            EnemyKind::Overlord => 0,
        }
    }

    /// Classification flags.
    #[must_use]
    pub const fn traits(self) -> EnemyTraits {
        match self {
            EnemyKind::Scv | EnemyKind::Probe | EnemyKind::Drone => {
                EnemyTraits::WORKER.union(G)
            }
            EnemyKind::Marine | EnemyKind::Goliath | EnemyKind::Dragoon | EnemyKind::Hydralisk => GA,
            EnemyKind::Ghost => GA.union(CLOAK),
            EnemyKind::Firebat => G.union(SPLASH),
            EnemyKind::Medic => EnemyTraits::empty(),
            EnemyKind::Vulture | EnemyKind::Zealot | EnemyKind::Zergling | EnemyKind::Ultralisk => G,
            EnemyKind::SiegeTank | EnemyKind::Reaver => G.union(SPLASH),
            EnemyKind::HighTemplar => SPLASH,
            EnemyKind::DarkTemplar => G.union(CLOAK),
            EnemyKind::Archon => GA.union(SPLASH),
            EnemyKind::Lurker => G.union(SPLASH).union(CLOAK),
            EnemyKind::Wraith | EnemyKind::Battlecruiser | EnemyKind::Scout | EnemyKind::Mutalisk => {
                FLY.union(GA)
            }
            EnemyKind::Valkyrie | EnemyKind::Corsair | EnemyKind::Devourer => {
                FLY.union(EnemyTraits::ANTI_AIR).union(SPLASH)
            }
            EnemyKind::Scourge => FLY.union(EnemyTraits::ANTI_AIR),
            EnemyKind::Carrier => FLY.union(GA),
            EnemyKind::Guardian => FLY.union(G),
            EnemyKind::Dropship | EnemyKind::Shuttle | EnemyKind::Overlord => FLY,
            EnemyKind::ScienceVessel | EnemyKind::Observer => FLY.union(DET),
            EnemyKind::Arbiter => FLY.union(GA).union(CLOAK),
            EnemyKind::Bunker => BLD.union(GA),
            EnemyKind::MissileTurret | EnemyKind::SporeColony => {
                BLD.union(EnemyTraits::ANTI_AIR).union(DET)
            }
            EnemyKind::PhotonCannon => BLD.union(GA).union(DET),
            EnemyKind::SunkenColony => BLD.union(G),
        }
    }

    /// Whether the kind flies.
    #[must_use]
    pub const fn is_air(self) -> bool {
        self.traits().contains(EnemyTraits::AIR)
    }

    /// Whether the kind can shoot air targets.
    #[must_use]
    pub const fn is_anti_air(self) -> bool {
        self.traits().contains(EnemyTraits::ANTI_AIR)
    }

    /// Mobile, non-worker unit.
    #[must_use]
    pub const fn is_army(self) -> bool {
        let t = self.traits();
        !t.contains(EnemyTraits::WORKER) && !t.contains(EnemyTraits::BUILDING)
    }
}

/// Recognised enemy opening plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum OpeningPlan {
    /// Nothing recognised yet.
    #[default]
    Unknown,
    /// Workers sent to attack.
    WorkerRush,
    /// Production built near our base.
    Proxy,
    /// Very early fighting units.
    FastRush,
    /// Large early attack.
    HeavyRush,
    /// Early expansion.
    FastExpand,
    /// Defensive tech play.
    Turtle,
}

impl OpeningPlan {
    /// Plans that call for early static defence.
    #[must_use]
    pub const fn is_rush(self) -> bool {
        matches!(
            self,
            OpeningPlan::WorkerRush | OpeningPlan::Proxy | OpeningPlan::FastRush | OpeningPlan::HeavyRush
        )
    }
}

/// Estimated enemy composition.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct OpponentSnapshot {
    /// Estimated counts per kind.
    #[serde(default)]
    pub counts: BTreeMap<EnemyKind, u32>,
    /// Units seen near our bases.
    #[serde(default)]
    pub nearby: BTreeMap<EnemyKind, u32>,
    /// Recognised opening plan.
    #[serde(default)]
    pub plan: OpeningPlan,
    /// Whether anything of the enemy has been seen at all.
    #[serde(default)]
    pub scouted: bool,
}

impl OpponentSnapshot {
    /// Snapshot from `(kind, count)` pairs.
    #[must_use]
    pub fn from_counts(counts: &[(EnemyKind, u32)]) -> Self {
        Self {
            counts: counts.iter().copied().collect(),
            scouted: true,
            ..Self::default()
        }
    }

    /// Estimated count of `kind`.
    #[must_use]
    pub fn count(&self, kind: EnemyKind) -> u32 {
        self.counts.get(&kind).copied().unwrap_or(0)
    }

    /// Race of the most numerous kinds seen; `None` before anything is seen.
    #[must_use]
    pub fn race(&self) -> Option<Race> {
        let mut totals: BTreeMap<Race, u32> = BTreeMap::new();
        for (kind, n) in &self.counts {
            if *n > 0 {
                *totals.entry(kind.race()).or_default() += n;
            }
        }
        // Ties go to the first race in enum order.
        totals
            .into_iter()
            .fold(None, |best: Option<(Race, u32)>, (race, n)| match best {
                Some((_, top)) if top >= n => best,
                _ => Some((race, n)),
            })
            .map(|(race, _)| race)
    }

    /// Whether the enemy has any flyer that can fight.
    #[must_use]
    pub fn has_air_army(&self) -> bool {
        self.counts
            .iter()
            .any(|(k, n)| *n > 0 && k.is_air() && (k.is_anti_air() || k.traits().contains(G)))
    }

    /// Whether the enemy can see cloaked units.
    #[must_use]
    pub fn has_detection(&self) -> bool {
        self.counts
            .iter()
            .any(|(k, n)| *n > 0 && k.traits().contains(EnemyTraits::DETECTOR))
    }

    /// Scouted and nothing left.
    #[must_use]
    pub fn looks_eliminated(&self) -> bool {
        self.scouted && self.counts.values().all(|n| *n == 0)
    }

    /// Fighting strength of ground units near our bases.
    ///
    /// Supply of every ground unit that can hit ground; workers count only
    /// when part of a rush.
    #[must_use]
    pub fn nearby_ground_power(&self) -> i32 {
        let worker_rush = self.plan == OpeningPlan::WorkerRush;
        self.nearby
            .iter()
            .filter(|(k, _)| {
                let t = k.traits();
                !k.is_air()
                    && !t.contains(EnemyTraits::BUILDING)
                    && t.contains(G)
                    && (worker_rush || !t.contains(EnemyTraits::WORKER))
            })
            .map(|(k, n)| k.supply() * *n as i32)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_traits() {
        assert!(EnemyKind::Wraith.is_air());
        assert!(EnemyKind::Wraith.is_anti_air());
        assert!(!EnemyKind::Zealot.is_anti_air());
        assert!(!EnemyKind::Probe.is_army());
        assert!(!EnemyKind::PhotonCannon.is_army());
        assert!(EnemyKind::Reaver.is_army());
    }

    #[test]
    fn test_air_and_detection() {
        let snap = OpponentSnapshot::from_counts(&[(EnemyKind::Zealot, 4), (EnemyKind::Shuttle, 1)]);
        assert!(!snap.has_air_army());
        assert!(!snap.has_detection());

        let snap = OpponentSnapshot::from_counts(&[(EnemyKind::Corsair, 2), (EnemyKind::Observer, 1)]);
        assert!(snap.has_air_army());
        assert!(snap.has_detection());
    }

    #[test]
    fn test_race_from_counts() {
        assert_eq!(OpponentSnapshot::default().race(), None);
        let snap = OpponentSnapshot::from_counts(&[(EnemyKind::Zergling, 6), (EnemyKind::Drone, 9)]);
        assert_eq!(snap.race(), Some(Race::Zerg));
        let snap = OpponentSnapshot::from_counts(&[(EnemyKind::Marine, 4), (EnemyKind::Zergling, 0)]);
        assert_eq!(snap.race(), Some(Race::Terran));
        let snap = OpponentSnapshot::from_counts(&[(EnemyKind::Zealot, 2), (EnemyKind::Marine, 2)]);
        assert_eq!(snap.race(), Some(Race::Terran));
    }

    #[test]
    fn test_eliminated_requires_scouting() {
        assert!(!OpponentSnapshot::default().looks_eliminated());
        let snap = OpponentSnapshot::from_counts(&[(EnemyKind::Marine, 0)]);
        assert!(snap.looks_eliminated());
    }

    #[test]
    fn test_nearby_ground_power() {
        let mut snap = OpponentSnapshot::default();
        snap.nearby.insert(EnemyKind::Zealot, 3);
        snap.nearby.insert(EnemyKind::Probe, 4);
        snap.nearby.insert(EnemyKind::Corsair, 2);
        assert_eq!(snap.nearby_ground_power(), 12);

        snap.plan = OpeningPlan::WorkerRush;
        assert_eq!(snap.nearby_ground_power(), 20);
    }
}
