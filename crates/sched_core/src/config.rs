//! Scheduler tunables.
//!
//! Every threshold, bias and window the scheduler uses lives here so it can
//! be tuned from a RON file without touching code. Missing fields fall back
//! to [`Default`]; out-of-range fields are replaced by
//! [`SchedulerConfig::validated`], which reports each replacement.
//!
//! # Example
//!
//! ```
//! use sched_core::config::SchedulerConfig;
//!
//! let config = SchedulerConfig::from_ron_str("(filler: (economy_share_permille: 350))").unwrap();
//! let (config, issues) = config.validated();
//! assert!(issues.is_empty());
//! assert_eq!(config.filler.economy_share_permille, 350);
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchedulerError};
use crate::opponent::Race;
use crate::tech::TechTarget;

/// Fixed per-candidate score offsets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
#[allow(missing_docs)]
pub struct TechBias {
    pub zerglings: i32,
    pub hydralisks: i32,
    pub lurkers: i32,
    pub mutalisks: i32,
    pub ultralisks: i32,
    pub guardians: i32,
    pub devourers: i32,
}

impl TechBias {
    /// Bias for one candidate.
    #[must_use]
    pub const fn get(&self, target: TechTarget) -> i32 {
        match target {
            TechTarget::None => 0,
            TechTarget::Zerglings => self.zerglings,
            TechTarget::Hydralisks => self.hydralisks,
            TechTarget::Lurkers => self.lurkers,
            TechTarget::Mutalisks => self.mutalisks,
            TechTarget::Ultralisks => self.ultralisks,
            TechTarget::Guardians => self.guardians,
            TechTarget::Devourers => self.devourers,
        }
    }
}

/// Tech planner tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TechConfig {
    /// Per-candidate bias.
    pub bias: TechBias,
    /// Bonus added to the current target.
    pub hysteresis: i32,
    /// Bonus for lurkers while the enemy has no detection.
    pub undetected_lurker_bonus: i32,
    /// Flyer score forced when the enemy looks eliminated.
    pub eliminated_flyer_score: i32,
}

impl Default for TechConfig {
    fn default() -> Self {
        Self {
            bias: TechBias {
                hydralisks: 11,
                ultralisks: 25,
                guardians: 6,
                ..TechBias::default()
            },
            hysteresis: 11,
            undetected_lurker_bonus: 8,
            eliminated_flyer_score: 100,
        }
    }
}

/// Emergency controller tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmergencyConfig {
    /// Ticks after the last trigger before returning to normal.
    pub grace_ticks: u64,
    /// Consecutive starved ticks before the front item counts as deadlocked.
    pub deadlock_ticks: u64,
    /// Extra enemy strength tolerated before declaring a threat.
    pub threat_margin: i32,
    /// Refund for cancelling an in-progress item, percent of primary cost.
    pub refund_percent: u32,
    /// Ticks in emergency before the sustained-crisis indicator is raised.
    pub sustained_crisis_ticks: u64,
    /// Capacity surplus needed before a provider may be cancelled.
    pub min_surplus_to_cancel_provider: i32,
    /// Maximum static defences built in response to threats.
    pub max_static_defense: u32,
    /// Below this many workers, more are queued urgently.
    pub min_workers: u32,
}

impl Default for EmergencyConfig {
    fn default() -> Self {
        Self {
            grace_ticks: 15 * 24,
            deadlock_ticks: 48,
            threat_margin: 0,
            refund_percent: 75,
            sustained_crisis_ticks: 120 * 24,
            min_surplus_to_cancel_provider: 6,
            max_static_defense: 5,
            min_workers: 3,
        }
    }
}

/// One game-phase capacity band.
///
/// Once total capacity is above `min_total`, a provider is queued whenever
/// the surplus is at or below `total / divisor + offset` (the proportional
/// term is skipped when `divisor` is 0).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhaseBand {
    /// Band applies above this total capacity.
    pub min_total: i32,
    /// Proportional margin divisor; 0 disables it.
    pub divisor: i32,
    /// Fixed margin.
    pub offset: i32,
}

impl PhaseBand {
    /// Surplus at or below which a provider is needed.
    #[must_use]
    pub const fn threshold(&self, total: i32) -> i32 {
        if self.divisor > 0 {
            total / self.divisor + self.offset
        } else {
            self.offset
        }
    }
}

/// Supply planner tunables.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SupplyConfig {
    /// Total capacity beyond which providers are pointless.
    pub hard_cap: u32,
    /// Early/mid/late bands, ascending by `min_total`.
    pub bands: Vec<PhaseBand>,
    /// A queued provider is redundant above `total / divisor + offset` surplus.
    pub surplus_divisor: i32,
    /// See `surplus_divisor`.
    pub surplus_offset: i32,
}

impl Default for SupplyConfig {
    fn default() -> Self {
        Self {
            hard_cap: 400,
            bands: vec![
                PhaseBand {
                    min_total: 20,
                    divisor: 0,
                    offset: 0,
                },
                PhaseBand {
                    min_total: 32,
                    divisor: 8,
                    offset: -2,
                },
                PhaseBand {
                    min_total: 120,
                    divisor: 8,
                    offset: 8,
                },
            ],
            surplus_divisor: 8,
            surplus_offset: 16,
        }
    }
}

/// Production filler and unit mix tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FillerConfig {
    /// Below this primary/secondary built ratio only primary units are made.
    pub ratio_floor_permille: u32,
    /// Leftover primary above this is spent on extra primary units.
    pub leftover_threshold: u32,
    /// Maximum extra primary units per fill.
    pub leftover_cap: u32,
    /// Share of larva-made units that should be economy units.
    pub economy_share_permille: u32,
    /// Aux quota is `score / aux_divisor`.
    pub aux_divisor: i32,
    /// Cap on the guardian aux quota.
    pub guardian_cap: u32,
    /// Cap on the devourer aux quota.
    pub devourer_cap: u32,
    /// Precursors stocked while a morph tech is pending.
    pub hydra_precursor_quota: u32,
    /// Flyers stocked while a flyer morph building is pending.
    pub flyer_precursor_quota: u32,
    /// One lurker per this many primary units.
    pub primary_per_lurker: u32,
}

impl Default for FillerConfig {
    fn default() -> Self {
        Self {
            ratio_floor_permille: 200,
            leftover_threshold: 300,
            leftover_cap: 6,
            economy_share_permille: 200,
            aux_divisor: 3,
            guardian_cap: 8,
            devourer_cap: 4,
            hydra_precursor_quota: 4,
            flyer_precursor_quota: 6,
            primary_per_lurker: 12,
        }
    }
}

/// Queue sanitizer tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SanitizerConfig {
    /// At or below this many workers, worker-built structures are dropped.
    pub min_workers_for_buildings: u32,
    /// Hard cap on economy units.
    pub max_workers: u32,
    /// Workers needed per gas site.
    pub workers_per_gas_site: u32,
    /// Primary float that justifies an expansion despite few workers.
    pub expansion_float: u32,
}

impl Default for SanitizerConfig {
    fn default() -> Self {
        Self {
            min_workers_for_buildings: 3,
            max_workers: 75,
            workers_per_gas_site: 3,
            expansion_float: 300,
        }
    }
}

/// Throttled reaction cadence and thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CadenceConfig {
    /// Reactions run when `tick % period` hits an offset.
    pub period: u64,
    /// Offset for resource reactions.
    pub resource_offset: u64,
    /// Offset for defence reactions.
    pub defense_offset: u64,
    /// Offset for queue trimming.
    pub trim_offset: u64,
    /// Secondary above this with nothing queued to spend it on stops gas.
    pub gas_float: u32,
    /// Primary above this with no slots queues a macro base.
    pub macro_base_float: u32,
    /// Queue length kept when capacity is maxed.
    pub maxed_queue_len: usize,
    /// Minimum workers kept by the critical-loss rebuild.
    pub rebuild_workers: u32,
}

impl Default for CadenceConfig {
    fn default() -> Self {
        Self {
            period: 32,
            resource_offset: 0,
            defense_offset: 16,
            trim_offset: 25,
            gas_float: 400,
            macro_base_float: 500,
            maxed_queue_len: 4,
            rebuild_workers: 9,
        }
    }
}

/// Queue limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Maximum queued entries.
    pub max_len: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { max_len: 64 }
    }
}

/// Complete scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Tech planner.
    pub tech: TechConfig,
    /// Emergency controller.
    pub emergency: EmergencyConfig,
    /// Supply planner.
    pub supply: SupplyConfig,
    /// Production filler.
    pub filler: FillerConfig,
    /// Queue sanitizer.
    pub sanitizer: SanitizerConfig,
    /// Reaction cadence and thresholds.
    pub cadence: CadenceConfig,
    /// Queue limits.
    pub queue: QueueConfig,
}

/// A config value that was replaced during validation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigIssue {
    /// Dotted field path.
    pub field: String,
    /// Rejected value.
    pub rejected: String,
    /// Value used instead.
    pub replacement: String,
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} is out of range, using {}",
            self.field, self.rejected, self.replacement
        )
    }
}

fn replace<T: Copy + std::fmt::Display>(
    issues: &mut Vec<ConfigIssue>,
    field: &str,
    value: &mut T,
    fallback: T,
) {
    tracing::warn!(field = field, rejected = %value, replacement = %fallback, "Invalid config value replaced");
    issues.push(ConfigIssue {
        field: field.to_string(),
        rejected: value.to_string(),
        replacement: fallback.to_string(),
    });
    *value = fallback;
}

impl SchedulerConfig {
    /// Load a config from a RON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SchedulerError::ConfigNotFound(path.display().to_string()));
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_ron_str(&content)
    }

    /// Parse a config from a RON string.
    pub fn from_ron_str(ron: &str) -> Result<Self> {
        Ok(ron::from_str(ron)?)
    }

    /// The preset for `race`, or the defaults while it is unknown.
    #[must_use]
    pub fn for_race(race: Option<Race>) -> Self {
        match race {
            Some(Race::Protoss) => Self::versus_protoss(),
            Some(Race::Terran) => Self::versus_terran(),
            Some(Race::Zerg) => Self::versus_zerg(),
            None => Self::default(),
        }
    }

    /// Tuning for protoss opponents: hydralisks early, ultralisks late.
    #[must_use]
    pub fn versus_protoss() -> Self {
        let mut config = Self::default();
        config.filler.economy_share_permille = 350;
        config
    }

    /// Tuning for terran opponents: mutalisks early, ultralisks late.
    #[must_use]
    pub fn versus_terran() -> Self {
        let mut config = Self::default();
        config.tech.bias = TechBias {
            mutalisks: 11,
            ultralisks: 25,
            guardians: 7,
            devourers: 3,
            ..TechBias::default()
        };
        config.tech.hysteresis = 13;
        config.filler.economy_share_permille = 450;
        config
    }

    /// Tuning for zerg opponents: lings and mutalisks, thin economy.
    #[must_use]
    pub fn versus_zerg() -> Self {
        let mut config = Self::default();
        config.tech.bias = TechBias {
            zerglings: 5,
            mutalisks: 15,
            ultralisks: 10,
            ..TechBias::default()
        };
        config.filler.economy_share_permille = 150;
        config
    }

    /// Replace every out-of-range value with its default.
    ///
    /// Returns the repaired config and one [`ConfigIssue`] per replacement.
    #[must_use]
    pub fn validated(mut self) -> (Self, Vec<ConfigIssue>) {
        let defaults = Self::default();
        let mut issues = Vec::new();

        if self.filler.economy_share_permille >= 1000 {
            replace(
                &mut issues,
                "filler.economy_share_permille",
                &mut self.filler.economy_share_permille,
                defaults.filler.economy_share_permille,
            );
        }
        if self.filler.ratio_floor_permille > 1000 {
            replace(
                &mut issues,
                "filler.ratio_floor_permille",
                &mut self.filler.ratio_floor_permille,
                defaults.filler.ratio_floor_permille,
            );
        }
        if self.filler.aux_divisor <= 0 {
            replace(
                &mut issues,
                "filler.aux_divisor",
                &mut self.filler.aux_divisor,
                defaults.filler.aux_divisor,
            );
        }
        if self.filler.primary_per_lurker == 0 {
            replace(
                &mut issues,
                "filler.primary_per_lurker",
                &mut self.filler.primary_per_lurker,
                defaults.filler.primary_per_lurker,
            );
        }
        if self.emergency.refund_percent > 100 {
            replace(
                &mut issues,
                "emergency.refund_percent",
                &mut self.emergency.refund_percent,
                defaults.emergency.refund_percent,
            );
        }
        if self.emergency.grace_ticks == 0 {
            replace(
                &mut issues,
                "emergency.grace_ticks",
                &mut self.emergency.grace_ticks,
                defaults.emergency.grace_ticks,
            );
        }
        if self.emergency.deadlock_ticks == 0 {
            replace(
                &mut issues,
                "emergency.deadlock_ticks",
                &mut self.emergency.deadlock_ticks,
                defaults.emergency.deadlock_ticks,
            );
        }
        if self.cadence.period == 0 {
            replace(
                &mut issues,
                "cadence.period",
                &mut self.cadence.period,
                defaults.cadence.period,
            );
        }
        let period = self.cadence.period;
        for (field, offset, fallback) in [
            (
                "cadence.resource_offset",
                &mut self.cadence.resource_offset,
                defaults.cadence.resource_offset,
            ),
            (
                "cadence.defense_offset",
                &mut self.cadence.defense_offset,
                defaults.cadence.defense_offset,
            ),
            (
                "cadence.trim_offset",
                &mut self.cadence.trim_offset,
                defaults.cadence.trim_offset,
            ),
        ] {
            if *offset >= period {
                replace(&mut issues, field, offset, fallback % period);
            }
        }
        if self.queue.max_len == 0 {
            replace(
                &mut issues,
                "queue.max_len",
                &mut self.queue.max_len,
                defaults.queue.max_len,
            );
        }
        if self.supply.surplus_divisor <= 0 {
            replace(
                &mut issues,
                "supply.surplus_divisor",
                &mut self.supply.surplus_divisor,
                defaults.supply.surplus_divisor,
            );
        }
        if self.supply.hard_cap < crate::catalog::UnitKind::Overlord.spec().provides {
            replace(
                &mut issues,
                "supply.hard_cap",
                &mut self.supply.hard_cap,
                defaults.supply.hard_cap,
            );
        }
        if self.supply.bands.iter().any(|b| b.divisor < 0) {
            tracing::warn!("Negative band divisor, using default supply bands");
            issues.push(ConfigIssue {
                field: "supply.bands".to_string(),
                rejected: format!("{:?}", self.supply.bands),
                replacement: format!("{:?}", defaults.supply.bands),
            });
            self.supply.bands = defaults.supply.bands;
        }
        self.supply.bands.sort_by_key(|b| b.min_total);

        (self, issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let (config, issues) = SchedulerConfig::default().validated();
        assert!(issues.is_empty(), "{issues:?}");
        assert_eq!(config, SchedulerConfig::default());
    }

    #[test]
    fn test_presets_are_valid() {
        for config in [
            SchedulerConfig::versus_protoss(),
            SchedulerConfig::versus_terran(),
            SchedulerConfig::versus_zerg(),
        ] {
            let (_, issues) = config.validated();
            assert!(issues.is_empty());
        }
    }

    #[test]
    fn test_preset_for_race() {
        assert_eq!(SchedulerConfig::for_race(Some(Race::Zerg)), SchedulerConfig::versus_zerg());
        assert_eq!(
            SchedulerConfig::for_race(Some(Race::Terran)),
            SchedulerConfig::versus_terran()
        );
        assert_eq!(SchedulerConfig::for_race(None), SchedulerConfig::default());
    }

    #[test]
    fn test_out_of_range_ratio_replaced() {
        let mut config = SchedulerConfig::default();
        config.filler.economy_share_permille = 1000;
        config.emergency.refund_percent = 150;
        let (config, issues) = config.validated();
        assert_eq!(issues.len(), 2);
        assert_eq!(config.filler.economy_share_permille, 200);
        assert_eq!(config.emergency.refund_percent, 75);
        assert_eq!(issues[0].field, "filler.economy_share_permille");
    }

    #[test]
    fn test_zero_period_and_offsets() {
        let mut config = SchedulerConfig::default();
        config.cadence.period = 0;
        config.cadence.trim_offset = 40;
        let (config, issues) = config.validated();
        assert_eq!(config.cadence.period, 32);
        assert_eq!(config.cadence.trim_offset, 25);
        assert_eq!(issues.len(), 2);
    }

    #[test]
    fn test_bad_bands_replaced_and_sorted() {
        let mut config = SchedulerConfig::default();
        config.supply.bands = vec![
            PhaseBand {
                min_total: 100,
                divisor: 4,
                offset: 0,
            },
            PhaseBand {
                min_total: 10,
                divisor: 0,
                offset: 2,
            },
        ];
        let (sorted, issues) = config.clone().validated();
        assert!(issues.is_empty());
        assert_eq!(sorted.supply.bands[0].min_total, 10);

        config.supply.bands[0].divisor = -1;
        let (fixed, issues) = config.validated();
        assert_eq!(issues.len(), 1);
        assert_eq!(fixed.supply.bands, SupplyConfig::default().bands);
    }

    #[test]
    fn test_band_threshold() {
        let early = PhaseBand {
            min_total: 20,
            divisor: 0,
            offset: 0,
        };
        let mid = PhaseBand {
            min_total: 32,
            divisor: 8,
            offset: -2,
        };
        assert_eq!(early.threshold(100), 0);
        assert_eq!(mid.threshold(80), 8);
    }

    #[test]
    fn test_partial_ron() {
        let config =
            SchedulerConfig::from_ron_str("(tech: (hysteresis: 20), queue: (max_len: 8))").unwrap();
        assert_eq!(config.tech.hysteresis, 20);
        assert_eq!(config.queue.max_len, 8);
        assert_eq!(config.filler, FillerConfig::default());
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            SchedulerConfig::from_ron_str("(tech: oops"),
            Err(SchedulerError::ConfigParse(_))
        ));
    }

    #[test]
    fn test_load_missing_file() {
        assert!(matches!(
            SchedulerConfig::load("/nonexistent/sched.ron"),
            Err(SchedulerError::ConfigNotFound(_))
        ));
    }
}
