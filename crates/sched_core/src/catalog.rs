//! Static catalog of everything the scheduler can ask for.
//!
//! Every producible thing is a closed enum variant with a row in a static
//! table:
//! - [`UnitKind`]: units and buildings, looked up through [`UnitKind::spec`]
//! - [`TechKind`]: one-shot research
//! - [`UpgradeKind`]: leveled upgrades whose cost grows per level
//! - [`MacroCommand`]: queue entries that toggle world behaviour
//!
//! Config and scenario files deserialize straight into these enums, so no
//! name lookup ever happens while scheduling.
//!
//! Capacity is counted in half-units: an economy unit costs 2, a capacity
//! provider supplies 16.

use serde::{Deserialize, Serialize};

/// Capacity consumed by one economy unit.
pub const WORKER_CAPACITY: u32 = 2;

/// Bitflags for fast kind classification queries.
///
/// # Example
///
/// ```
/// use sched_core::catalog::KindTraits;
///
/// let traits = KindTraits::BUILDING.union(KindTraits::BASE);
/// assert!(traits.contains(KindTraits::BASE));
/// assert!(!traits.intersects(KindTraits::AIR));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct KindTraits(u16);

impl KindTraits {
    /// Gathers resources.
    pub const ECONOMY: Self = Self(1 << 0);
    /// Supplies capacity.
    pub const PROVIDER: Self = Self(1 << 1);
    /// Immobile structure.
    pub const BUILDING: Self = Self(1 << 2);
    /// Base that spawns production slots.
    pub const BASE: Self = Self(1 << 3);
    /// Harvests the secondary resource.
    pub const GAS_SITE: Self = Self(1 << 4);
    /// Static defence.
    pub const STATIC_DEFENSE: Self = Self(1 << 5);
    /// Flies.
    pub const AIR: Self = Self(1 << 6);
    /// Fights.
    pub const COMBATANT: Self = Self(1 << 7);

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

    /// Check if any flags in `other` are set in `self`.
    #[inline]
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        (self.0 & other.0) != 0
    }

    /// Union of flags.
    #[inline]
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }
}

/// What consumes a production resource to make an item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Producer {
    /// Consumes one production slot.
    Larva,
    /// Consumes an economy unit, which becomes the building.
    Worker,
    /// Transforms an existing unit or building of the given kind.
    Morph(UnitKind),
    /// Researched inside a completed building of the given kind.
    Building(UnitKind),
    /// Executed by the world directly.
    World,
}

/// Static data row for a [`UnitKind`].
#[derive(Debug, Clone, Copy)]
pub struct KindSpec {
    /// Primary resource cost.
    pub primary: u32,
    /// Secondary resource cost.
    pub secondary: u32,
    /// Capacity consumed once built.
    pub capacity: u32,
    /// Capacity supplied once built.
    pub provides: u32,
    /// Build duration in ticks.
    pub build_duration: u32,
    /// What makes it.
    pub producer: Producer,
    /// Any one of these must exist (complete or in progress).
    pub requires: &'static [UnitKind],
    /// Research that must be done or underway.
    pub requires_tech: Option<TechKind>,
    /// Ordering key for cancellation: lowest is cancelled first.
    pub military_value: u32,
    /// Whether an in-progress instance may be cancelled to recover resources.
    pub cancellable: bool,
    /// Classification flags.
    pub traits: KindTraits,
}

/// Every unit and building kind the scheduler reasons about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UnitKind {
    /// Economy unit; also builds structures.
    Drone,
    /// Capacity provider.
    Overlord,
    /// Cheap melee pair.
    Zergling,
    /// Ranged anti-air/ground unit.
    Hydralisk,
    /// Burrowed splash unit morphed from a hydralisk.
    Lurker,
    /// Flying harasser.
    Mutalisk,
    /// Suicide anti-air pair.
    Scourge,
    /// Heavy melee unit.
    Ultralisk,
    /// Long-range air-to-ground, morphed from a mutalisk.
    Guardian,
    /// Air-to-air, morphed from a mutalisk.
    Devourer,
    /// Base; spawns production slots.
    Hatchery,
    /// Mid-tier base morph.
    Lair,
    /// Top-tier base morph.
    Hive,
    /// Secondary resource site.
    Extractor,
    /// Unlocks melee units and static defence.
    SpawningPool,
    /// Ground upgrades.
    EvolutionChamber,
    /// Unlocks hydralisks and lurker research.
    HydraliskDen,
    /// Unlocks flyers.
    Spire,
    /// Unlocks guardians and devourers.
    GreaterSpire,
    /// Unlocks the top-tier base.
    QueensNest,
    /// Unlocks ultralisks.
    UltraliskCavern,
    /// Static defence precursor.
    CreepColony,
    /// Ground static defence.
    SunkenColony,
    /// Air static defence and detection.
    SporeColony,
}

const NOTHING: &[UnitKind] = &[];
const POOL: &[UnitKind] = &[UnitKind::SpawningPool];
const LAIR_TECH: &[UnitKind] = &[UnitKind::Lair, UnitKind::Hive];
const HIVE_TECH: &[UnitKind] = &[UnitKind::Hive];
const ANY_SPIRE: &[UnitKind] = &[UnitKind::Spire, UnitKind::GreaterSpire];

const fn unit(
    primary: u32,
    secondary: u32,
    capacity: u32,
    build_duration: u32,
    producer: Producer,
    requires: &'static [UnitKind],
    military_value: u32,
    traits: KindTraits,
) -> KindSpec {
    KindSpec {
        primary,
        secondary,
        capacity,
        provides: 0,
        build_duration,
        producer,
        requires,
        requires_tech: None,
        military_value,
        cancellable: true,
        traits,
    }
}

const fn building(
    primary: u32,
    secondary: u32,
    build_duration: u32,
    producer: Producer,
    requires: &'static [UnitKind],
    military_value: u32,
    traits: KindTraits,
) -> KindSpec {
    unit(
        primary,
        secondary,
        0,
        build_duration,
        producer,
        requires,
        military_value,
        traits.union(KindTraits::BUILDING),
    )
}

const COMBAT: KindTraits = KindTraits::COMBATANT;
const AIR_COMBAT: KindTraits = KindTraits::COMBATANT.union(KindTraits::AIR);

const DRONE: KindSpec = KindSpec {
    cancellable: false,
    ..unit(50, 0, WORKER_CAPACITY, 300, Producer::Larva, NOTHING, 0, KindTraits::ECONOMY)
};
const OVERLORD: KindSpec = KindSpec {
    capacity: 0,
    provides: 16,
    ..unit(100, 0, 0, 600, Producer::Larva, NOTHING, 20, KindTraits::PROVIDER.union(KindTraits::AIR))
};
const HATCHERY: KindSpec = KindSpec {
    provides: 2,
    ..building(300, 0, 1800, Producer::Worker, NOTHING, 25, KindTraits::BASE)
};
const LURKER: KindSpec = KindSpec {
    requires_tech: Some(TechKind::LurkerAspect),
    ..unit(50, 100, 4, 600, Producer::Morph(UnitKind::Hydralisk), NOTHING, 85, COMBAT)
};

impl UnitKind {
    /// All kinds in enumeration order.
    pub const ALL: [UnitKind; 24] = [
        UnitKind::Drone,
        UnitKind::Overlord,
        UnitKind::Zergling,
        UnitKind::Hydralisk,
        UnitKind::Lurker,
        UnitKind::Mutalisk,
        UnitKind::Scourge,
        UnitKind::Ultralisk,
        UnitKind::Guardian,
        UnitKind::Devourer,
        UnitKind::Hatchery,
        UnitKind::Lair,
        UnitKind::Hive,
        UnitKind::Extractor,
        UnitKind::SpawningPool,
        UnitKind::EvolutionChamber,
        UnitKind::HydraliskDen,
        UnitKind::Spire,
        UnitKind::GreaterSpire,
        UnitKind::QueensNest,
        UnitKind::UltraliskCavern,
        UnitKind::CreepColony,
        UnitKind::SunkenColony,
        UnitKind::SporeColony,
    ];

    /// Static data for this kind.
    #[must_use]
    pub const fn spec(self) -> KindSpec {
        match self {
            UnitKind::Drone => DRONE,
            UnitKind::Overlord => OVERLORD,
            UnitKind::Zergling => unit(50, 0, 2, 420, Producer::Larva, POOL, 70, COMBAT),
            UnitKind::Hydralisk => {
                unit(75, 25, 2, 420, Producer::Larva, &[UnitKind::HydraliskDen], 75, COMBAT)
            }
            UnitKind::Lurker => LURKER,
            UnitKind::Mutalisk => unit(100, 100, 4, 600, Producer::Larva, ANY_SPIRE, 80, AIR_COMBAT),
            UnitKind::Scourge => unit(25, 75, 2, 450, Producer::Larva, ANY_SPIRE, 76, AIR_COMBAT),
            UnitKind::Ultralisk => unit(
                200,
                200,
                8,
                900,
                Producer::Larva,
                &[UnitKind::UltraliskCavern],
                90,
                COMBAT,
            ),
            UnitKind::Guardian => unit(
                50,
                100,
                4,
                600,
                Producer::Morph(UnitKind::Mutalisk),
                &[UnitKind::GreaterSpire],
                86,
                AIR_COMBAT,
            ),
            UnitKind::Devourer => unit(
                150,
                50,
                4,
                600,
                Producer::Morph(UnitKind::Mutalisk),
                &[UnitKind::GreaterSpire],
                87,
                AIR_COMBAT,
            ),
            UnitKind::Hatchery => HATCHERY,
            UnitKind::Lair => building(
                150,
                100,
                1500,
                Producer::Morph(UnitKind::Hatchery),
                POOL,
                45,
                KindTraits::BASE,
            ),
            UnitKind::Hive => building(
                200,
                150,
                1800,
                Producer::Morph(UnitKind::Lair),
                &[UnitKind::QueensNest],
                50,
                KindTraits::BASE,
            ),
            UnitKind::Extractor => {
                building(50, 0, 600, Producer::Worker, NOTHING, 10, KindTraits::GAS_SITE)
            }
            UnitKind::SpawningPool => {
                building(200, 0, 1200, Producer::Worker, NOTHING, 65, KindTraits::empty())
            }
            UnitKind::EvolutionChamber => {
                building(75, 0, 600, Producer::Worker, NOTHING, 15, KindTraits::empty())
            }
            UnitKind::HydraliskDen => {
                building(100, 50, 600, Producer::Worker, POOL, 35, KindTraits::empty())
            }
            UnitKind::Spire => {
                building(200, 150, 1800, Producer::Worker, LAIR_TECH, 40, KindTraits::empty())
            }
            UnitKind::GreaterSpire => building(
                100,
                150,
                1800,
                Producer::Morph(UnitKind::Spire),
                HIVE_TECH,
                55,
                KindTraits::empty(),
            ),
            UnitKind::QueensNest => {
                building(150, 100, 900, Producer::Worker, LAIR_TECH, 30, KindTraits::empty())
            }
            UnitKind::UltraliskCavern => {
                building(150, 200, 1200, Producer::Worker, HIVE_TECH, 32, KindTraits::empty())
            }
            UnitKind::CreepColony => {
                building(75, 0, 300, Producer::Worker, NOTHING, 60, KindTraits::empty())
            }
            UnitKind::SunkenColony => building(
                50,
                0,
                300,
                Producer::Morph(UnitKind::CreepColony),
                POOL,
                95,
                KindTraits::STATIC_DEFENSE.union(KindTraits::COMBATANT),
            ),
            UnitKind::SporeColony => building(
                50,
                0,
                300,
                Producer::Morph(UnitKind::CreepColony),
                &[UnitKind::EvolutionChamber],
                95,
                KindTraits::STATIC_DEFENSE,
            ),
        }
    }

    /// Classification flags.
    #[must_use]
    pub const fn traits(self) -> KindTraits {
        self.spec().traits
    }

    /// Whether this kind is a structure.
    #[must_use]
    pub const fn is_building(self) -> bool {
        self.traits().contains(KindTraits::BUILDING)
    }

    /// The kind this one is morphed from, if any.
    #[must_use]
    pub const fn morphs_from(self) -> Option<UnitKind> {
        match self.spec().producer {
            Producer::Morph(precursor) => Some(precursor),
            _ => None,
        }
    }

    /// Whether building this consumes an economy unit.
    #[must_use]
    pub const fn consumes_worker(self) -> bool {
        matches!(self.spec().producer, Producer::Worker)
    }

    /// Whether `self` satisfies a requirement for `other`.
    ///
    /// Upgraded forms keep the abilities of what they morphed from: a hive
    /// is also a lair and a hatchery, a greater spire is also a spire.
    #[must_use]
    pub fn counts_as(self, other: UnitKind) -> bool {
        if self == other {
            return true;
        }
        matches!(
            (self, other),
            (UnitKind::Lair, UnitKind::Hatchery)
                | (UnitKind::Hive, UnitKind::Hatchery)
                | (UnitKind::Hive, UnitKind::Lair)
                | (UnitKind::GreaterSpire, UnitKind::Spire)
        )
    }

    /// Capacity change caused by queueing one of these.
    ///
    /// Providers report their supply as a negative delta; worker-built
    /// structures release the worker; morphs release the precursor.
    #[must_use]
    pub fn capacity_delta(self) -> i32 {
        let spec = self.spec();
        if spec.traits.contains(KindTraits::PROVIDER) {
            return -(spec.provides as i32);
        }
        let released = match spec.producer {
            Producer::Worker => WORKER_CAPACITY,
            Producer::Morph(precursor) => precursor.spec().capacity,
            _ => 0,
        };
        spec.capacity as i32 - released as i32
    }
}

impl std::fmt::Display for UnitKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

/// One-shot research.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum TechKind {
    /// Enables the hydralisk to lurker morph.
    LurkerAspect,
}

/// Static data row for a [`TechKind`].
#[derive(Debug, Clone, Copy)]
pub struct TechSpec {
    /// Primary cost.
    pub primary: u32,
    /// Secondary cost.
    pub secondary: u32,
    /// Research duration in ticks.
    pub build_duration: u32,
    /// Building that performs the research.
    pub producer: UnitKind,
    /// Any one of these must exist.
    pub requires: &'static [UnitKind],
}

impl TechKind {
    /// All research in enumeration order.
    pub const ALL: [TechKind; 1] = [TechKind::LurkerAspect];

    /// Static data.
    #[must_use]
    pub const fn spec(self) -> TechSpec {
        match self {
            TechKind::LurkerAspect => TechSpec {
                primary: 200,
                secondary: 200,
                build_duration: 1800,
                producer: UnitKind::HydraliskDen,
                requires: LAIR_TECH,
            },
        }
    }
}

/// Leveled upgrades.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum UpgradeKind {
    /// Melee speed.
    MetabolicBoost,
    /// Melee attack rate.
    AdrenalGlands,
    /// Ranged speed.
    MuscularAugments,
    /// Ranged range.
    GroovedSpines,
    /// Melee damage.
    MeleeAttacks,
    /// Ranged damage.
    MissileAttacks,
    /// Ground armor.
    Carapace,
    /// Flyer damage.
    FlyerAttacks,
    /// Flyer armor.
    FlyerCarapace,
    /// Heavy melee speed.
    AnabolicSynthesis,
    /// Heavy melee armor.
    ChitinousPlating,
}

/// Static data row for an [`UpgradeKind`].
#[derive(Debug, Clone, Copy)]
pub struct UpgradeSpec {
    /// Primary cost of the first level.
    pub primary: u32,
    /// Secondary cost of the first level.
    pub secondary: u32,
    /// Added to both costs for every level already owned.
    pub per_level: u32,
    /// Highest level.
    pub max_level: u8,
    /// Research duration in ticks.
    pub build_duration: u32,
    /// Building that performs the research.
    pub producer: UnitKind,
    /// Any one of these must exist.
    pub requires: &'static [UnitKind],
    /// Level `n` needs tier `n`.
    pub tier_gated: bool,
}

const fn upgrade(
    primary: u32,
    per_level: u32,
    max_level: u8,
    producer: UnitKind,
    requires: &'static [UnitKind],
    tier_gated: bool,
) -> UpgradeSpec {
    UpgradeSpec {
        primary,
        secondary: primary,
        per_level,
        max_level,
        build_duration: 1500,
        producer,
        requires,
        tier_gated,
    }
}

impl UpgradeKind {
    /// All upgrades in enumeration order.
    pub const ALL: [UpgradeKind; 11] = [
        UpgradeKind::MetabolicBoost,
        UpgradeKind::AdrenalGlands,
        UpgradeKind::MuscularAugments,
        UpgradeKind::GroovedSpines,
        UpgradeKind::MeleeAttacks,
        UpgradeKind::MissileAttacks,
        UpgradeKind::Carapace,
        UpgradeKind::FlyerAttacks,
        UpgradeKind::FlyerCarapace,
        UpgradeKind::AnabolicSynthesis,
        UpgradeKind::ChitinousPlating,
    ];

    /// Static data.
    #[must_use]
    pub const fn spec(self) -> UpgradeSpec {
        let evo = UnitKind::EvolutionChamber;
        match self {
            UpgradeKind::MetabolicBoost => upgrade(100, 0, 1, UnitKind::SpawningPool, NOTHING, false),
            UpgradeKind::AdrenalGlands => upgrade(200, 0, 1, UnitKind::SpawningPool, HIVE_TECH, false),
            UpgradeKind::MuscularAugments => {
                upgrade(150, 0, 1, UnitKind::HydraliskDen, LAIR_TECH, false)
            }
            UpgradeKind::GroovedSpines => upgrade(150, 0, 1, UnitKind::HydraliskDen, NOTHING, false),
            UpgradeKind::MeleeAttacks => upgrade(100, 50, 3, evo, NOTHING, true),
            UpgradeKind::MissileAttacks => upgrade(100, 50, 3, evo, NOTHING, true),
            UpgradeKind::Carapace => upgrade(150, 75, 3, evo, NOTHING, true),
            UpgradeKind::FlyerAttacks => upgrade(100, 75, 3, UnitKind::Spire, NOTHING, true),
            UpgradeKind::FlyerCarapace => upgrade(150, 75, 3, UnitKind::Spire, NOTHING, true),
            UpgradeKind::AnabolicSynthesis => {
                upgrade(200, 0, 1, UnitKind::UltraliskCavern, NOTHING, false)
            }
            UpgradeKind::ChitinousPlating => {
                upgrade(150, 0, 1, UnitKind::UltraliskCavern, NOTHING, false)
            }
        }
    }

    /// Cost of buying the level after `current_level`.
    #[must_use]
    pub const fn cost_at(self, current_level: u8) -> (u32, u32) {
        let spec = self.spec();
        let extra = spec.per_level * current_level as u32;
        (spec.primary + extra, spec.secondary + extra)
    }
}

/// Queue entries that ask the world to change behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MacroCommand {
    /// Resume collecting the secondary resource.
    StartGas,
    /// Stop collecting the secondary resource.
    StopGas,
}
