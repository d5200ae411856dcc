//! Tunable parameters.
//!
//! Every balance constant lives here under a name so hosts can override it
//! from configuration instead of patching code.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// World generation parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldGenParams {
    pub world_seed: u64,
    /// Minimum horizontal distance between any two entrances, in blocks.
    pub min_spacing: f64,
    /// Entrances requested per region, inclusive range.
    pub dungeons_per_region: CountRange,
    /// Candidate draws allowed per requested entrance before giving up.
    pub attempts_per_placement: u32,
}

impl Default for WorldGenParams {
    fn default() -> Self {
        Self {
            world_seed: 0,
            min_spacing: 500.0,
            dungeons_per_region: CountRange { min: 3, max: 5 },
            attempts_per_placement: 64,
        }
    }
}

impl WorldGenParams {
    pub fn with_seed(world_seed: u64) -> Self {
        Self {
            world_seed,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.min_spacing.is_finite() || self.min_spacing <= 0.0 {
            return Err(ConfigError::InvalidSpacing(self.min_spacing));
        }
        self.dungeons_per_region.validate()
    }
}

/// Inclusive `min..=max` count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountRange {
    pub min: u32,
    pub max: u32,
}

impl CountRange {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min > self.max {
            return Err(ConfigError::InvalidCountRange {
                min: self.min,
                max: self.max,
            });
        }
        Ok(())
    }
}

/// Apex chance per rarity bracket.
///
/// Brackets are keyed on the chosen type's rarity weight: `>= 80` common,
/// `>= 50` uncommon, `>= 20` rare, otherwise very rare.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApexChance {
    pub common: f64,
    pub uncommon: f64,
    pub rare: f64,
    pub very_rare: f64,
}

impl Default for ApexChance {
    fn default() -> Self {
        Self {
            common: 0.10,
            uncommon: 0.15,
            rare: 0.25,
            very_rare: 0.35,
        }
    }
}

impl ApexChance {
    pub const COMMON_WEIGHT: u32 = 80;
    pub const UNCOMMON_WEIGHT: u32 = 50;
    pub const RARE_WEIGHT: u32 = 20;

    /// Apex probability for a type with `rarity_weight`.
    pub fn for_weight(&self, rarity_weight: u32) -> f64 {
        match rarity_weight {
            w if w >= Self::COMMON_WEIGHT => self.common,
            w if w >= Self::UNCOMMON_WEIGHT => self.uncommon,
            w if w >= Self::RARE_WEIGHT => self.rare,
            _ => self.very_rare,
        }
    }
}

/// Game-balance constants used by the instance factory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BalanceParams {
    pub apex_chance: ApexChance,
    /// Chance an apex reward is drawn from the type's thematic rewards.
    pub thematic_reward_chance: f64,
}

impl Default for BalanceParams {
    fn default() -> Self {
        Self {
            apex_chance: ApexChance::default(),
            thematic_reward_chance: 0.7,
        }
    }
}

impl BalanceParams {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let a = &self.apex_chance;
        for (name, value) in [
            ("apex_chance.common", a.common),
            ("apex_chance.uncommon", a.uncommon),
            ("apex_chance.rare", a.rare),
            ("apex_chance.very_rare", a.very_rare),
            ("thematic_reward_chance", self.thematic_reward_chance),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidProbability { name, value });
            }
        }
        Ok(())
    }
}

/// Portal timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PortalParams {
    /// Shared per-player cooldown across every portal kind.
    pub cooldown_ms: u64,
}

impl Default for PortalParams {
    fn default() -> Self {
        Self { cooldown_ms: 1000 }
    }
}

/// Reward gate settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GateParams {
    /// Distinct rewards needed to pass the gate.
    pub threshold: u32,
}

impl Default for GateParams {
    fn default() -> Self {
        Self { threshold: 3 }
    }
}
