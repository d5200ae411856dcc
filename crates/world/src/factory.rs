//! Turns accepted placements into dungeon instances.

use crate::catalog::{ContentCatalog, DungeonTypeDef};
use crate::error::{ConfigError, InstanceError};
use crate::instance::{DungeonInstance, APEX_LEVELS, ORDINARY_LEVELS};
use crate::params::BalanceParams;
use crate::region::Region;
use crate::theme::ThemeTags;
use delve_core::{BlockPos, ContentKey, DungeonId};
use rand::Rng;
use std::sync::Arc;

/// Rolls type, depth, apex status and reward for new instances.
///
/// All randomness comes from the caller's rng, so a seeded rng fed the same
/// placements in the same order reproduces the same instances.
#[derive(Debug, Clone)]
pub struct DungeonInstanceFactory {
    catalog: Arc<ContentCatalog>,
    balance: BalanceParams,
}

impl DungeonInstanceFactory {
    pub fn new(catalog: Arc<ContentCatalog>, balance: BalanceParams) -> Result<Self, ConfigError> {
        catalog.validate()?;
        balance.validate()?;
        Ok(Self { catalog, balance })
    }

    pub fn catalog(&self) -> &Arc<ContentCatalog> {
        &self.catalog
    }

    pub fn balance(&self) -> &BalanceParams {
        &self.balance
    }

    pub fn build<R: Rng + ?Sized>(
        &self,
        position: BlockPos,
        region: &Region,
        rng: &mut R,
    ) -> Result<DungeonInstance, InstanceError> {
        let def = self.choose_type(region.themes, rng);
        let apex = rng.gen_bool(self.balance.apex_chance.for_weight(def.rarity_weight));
        let level_count = Self::roll_level_count(apex, rng);

        let mut builder = DungeonInstance::builder()
            .kind(def.key.clone())
            .entrance(position)
            .level_count(level_count);
        if apex {
            builder = builder.apex_reward(self.choose_reward(&def.key, rng));
        }
        builder.id(DungeonId(rng.gen())).build()
    }

    /// Weighted pick among the types eligible for `themes`.
    pub fn choose_type<R: Rng + ?Sized>(&self, themes: ThemeTags, rng: &mut R) -> &DungeonTypeDef {
        let eligible = self.catalog.eligible_types(themes);
        let total: u64 = eligible
            .iter()
            .map(|def| u64::from(def.rarity_weight))
            .sum();
        let mut roll = rng.gen_range(0..total.max(1));
        for def in &eligible {
            let weight = u64::from(def.rarity_weight);
            if roll < weight {
                return def;
            }
            roll -= weight;
        }
        // Unreachable for a validated catalog; the first type keeps this total.
        eligible
            .last()
            .copied()
            .unwrap_or(&self.catalog.dungeon_types[0])
    }

    /// Apex: uniform in 10..=15. Ordinary: `min(a, b) + 1` of two draws in
    /// 1..=10, capped at the ordinary maximum.
    fn roll_level_count<R: Rng + ?Sized>(apex: bool, rng: &mut R) -> u8 {
        if apex {
            return rng.gen_range(APEX_LEVELS);
        }
        let a = rng.gen_range(ORDINARY_LEVELS);
        let b = rng.gen_range(ORDINARY_LEVELS);
        (a.min(b) + 1).min(*ORDINARY_LEVELS.end())
    }

    fn choose_reward<R: Rng + ?Sized>(&self, dungeon_type: &ContentKey, rng: &mut R) -> ContentKey {
        let thematic = self.catalog.rewards_for(dungeon_type);
        let prefer_thematic = rng.gen_bool(self.balance.thematic_reward_chance);
        if prefer_thematic && !thematic.is_empty() {
            return thematic[rng.gen_range(0..thematic.len())].key.clone();
        }
        let all = &self.catalog.rewards;
        all[rng.gen_range(0..all.len())].key.clone()
    }
}
