//! Dungeon and reward type tables.
//!
//! The catalog is immutable configuration owned by the factory. It is plain
//! serde data so hosts can ship their own tables; [`ContentCatalog::wasteland`]
//! is the built-in default.

use crate::error::ConfigError;
use crate::theme::ThemeTags;
use delve_core::ContentKey;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A category of dungeon.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DungeonTypeDef {
    pub key: ContentKey,
    pub display_name: String,
    /// Relative spawn weight; higher is more common.
    pub rarity_weight: u32,
    /// Preferred themes. Empty means the type spawns anywhere.
    #[serde(default)]
    pub themes: ThemeTags,
}

impl DungeonTypeDef {
    pub fn is_untagged(&self) -> bool {
        self.themes.is_empty()
    }
}

/// A distinct collectible carried by apex dungeons.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardTypeDef {
    pub key: ContentKey,
    pub display_name: String,
    #[serde(default)]
    pub description: String,
    /// Dungeon types this reward thematically belongs to.
    #[serde(default)]
    pub affinity: Vec<ContentKey>,
}

/// Immutable dungeon/reward configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentCatalog {
    pub dungeon_types: Vec<DungeonTypeDef>,
    pub rewards: Vec<RewardTypeDef>,
}

impl ContentCatalog {
    /// Build and validate a catalog.
    pub fn new(
        dungeon_types: Vec<DungeonTypeDef>,
        rewards: Vec<RewardTypeDef>,
    ) -> Result<Self, ConfigError> {
        let catalog = Self {
            dungeon_types,
            rewards,
        };
        catalog.validate()?;
        Ok(catalog)
    }

    /// Reject tables that could strand type selection or reward assignment.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dungeon_types.is_empty() {
            return Err(ConfigError::EmptyCatalog);
        }
        if self.rewards.is_empty() {
            return Err(ConfigError::NoRewards);
        }

        let mut type_keys = BTreeSet::new();
        for def in &self.dungeon_types {
            if !type_keys.insert(&def.key) {
                return Err(ConfigError::DuplicateType(def.key.clone()));
            }
            if def.rarity_weight == 0 {
                return Err(ConfigError::ZeroWeight(def.key.clone()));
            }
        }
        if !self.dungeon_types.iter().any(DungeonTypeDef::is_untagged) {
            return Err(ConfigError::MissingFallbackType);
        }

        let mut reward_keys = BTreeSet::new();
        for reward in &self.rewards {
            if !reward_keys.insert(&reward.key) {
                return Err(ConfigError::DuplicateReward(reward.key.clone()));
            }
            if let Some(missing) = reward.affinity.iter().find(|k| !type_keys.contains(k)) {
                return Err(ConfigError::UnknownAffinity {
                    reward: reward.key.clone(),
                    dungeon_type: missing.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn dungeon_type(&self, key: &ContentKey) -> Option<&DungeonTypeDef> {
        self.dungeon_types.iter().find(|def| &def.key == key)
    }

    pub fn reward(&self, key: &ContentKey) -> Option<&RewardTypeDef> {
        self.rewards.iter().find(|reward| &reward.key == key)
    }

    /// Types eligible in a region with `themes`, in table order.
    ///
    /// Never empty for a validated catalog: untagged types always qualify.
    pub fn eligible_types(&self, themes: ThemeTags) -> Vec<&DungeonTypeDef> {
        self.dungeon_types
            .iter()
            .filter(|def| def.themes.eligible_in(themes))
            .collect()
    }

    /// Rewards with thematic affinity to `dungeon_type`, in table order.
    pub fn rewards_for(&self, dungeon_type: &ContentKey) -> Vec<&RewardTypeDef> {
        self.rewards
            .iter()
            .filter(|reward| reward.affinity.contains(dungeon_type))
            .collect()
    }

    /// The built-in wasteland content.
    pub fn wasteland() -> Self {
        use ThemeTags as T;
        let ty = |path: &str, name: &str, weight: u32, themes: ThemeTags| DungeonTypeDef {
            key: ContentKey::builtin(path),
            display_name: name.to_string(),
            rarity_weight: weight,
            themes,
        };
        let dungeon_types = vec![
            ty("lair", "Lair of Beasts", 100, T::FOREST),
            ty("orc_mines", "Orcish Mines", 100, T::MOUNTAIN),
            ty("swamp", "Swamp", 80, T::SWAMP),
            ty("shoals", "Shoals", 80, T::COASTAL),
            ty("snake_pit", "Snake Pit", 80, T::DESERT),
            ty("spider_nest", "Spider Nest", 80, T::FOREST),
            ty("elf_halls", "Elven Halls", 50, T::FOREST),
            ty("vaults", "Vaults", 50, T::empty()),
            ty("crypt", "Crypt", 50, T::empty()),
            ty("tomb", "Tomb of the Ancients", 30, T::DESERT),
            ty("depths", "Depths", 15, T::empty()),
            ty("realm_of_zot", "Realm of Zot", 5, T::empty()),
        ];

        let reward = |path: &str, name: &str, description: &str, affinity: &[&str]| {
            RewardTypeDef {
                key: ContentKey::builtin(path),
                display_name: name.to_string(),
                description: description.to_string(),
                affinity: affinity.iter().map(|p| ContentKey::builtin(p)).collect(),
            }
        };
        let rewards = vec![
            reward(
                "rune/slimy",
                "Slimy Rune",
                "A rune covered in acidic slime",
                &["swamp", "lair"],
            ),
            reward(
                "rune/serpentine",
                "Serpentine Rune",
                "A rune shaped like a coiled snake",
                &["snake_pit", "lair"],
            ),
            reward(
                "rune/barnacled",
                "Barnacled Rune",
                "A rune encrusted with sea barnacles",
                &["shoals"],
            ),
            reward(
                "rune/gossamer",
                "Gossamer Rune",
                "A rune wrapped in spider silk",
                &["spider_nest", "lair"],
            ),
            reward("rune/iron", "Iron Rune", "A heavy iron rune", &["orc_mines"]),
            reward(
                "rune/silver",
                "Silver Rune",
                "An elegant silver rune",
                &["elf_halls"],
            ),
            reward(
                "rune/golden",
                "Golden Rune",
                "A gleaming golden rune",
                &["vaults"],
            ),
            reward(
                "rune/bone",
                "Bone Rune",
                "A rune carved from ancient bone",
                &["crypt"],
            ),
            reward("rune/dark", "Dark Rune", "A rune that absorbs light", &["tomb"]),
            reward(
                "rune/abyssal",
                "Abyssal Rune",
                "A rune from the deepest depths",
                &["depths"],
            ),
            reward(
                "rune/glowing",
                "Glowing Rune",
                "A rune that pulses with radiation",
                &[],
            ),
            reward(
                "rune/rusted",
                "Rusted Rune",
                "A rune corroded by the wasteland",
                &[],
            ),
        ];

        Self {
            dungeon_types,
            rewards,
        }
    }
}

impl Default for ContentCatalog {
    fn default() -> Self {
        Self::wasteland()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(path: &str) -> ContentKey {
        ContentKey::builtin(path)
    }

    #[test]
    fn wasteland_catalog_is_valid() {
        let catalog = ContentCatalog::wasteland();
        catalog.validate().unwrap();
        assert_eq!(catalog.dungeon_types.len(), 12);
        assert_eq!(catalog.rewards.len(), 12);
    }

    #[test]
    fn eligibility_includes_untagged_fallbacks() {
        let catalog = ContentCatalog::wasteland();
        let swamp: Vec<String> = catalog
            .eligible_types(ThemeTags::SWAMP)
            .iter()
            .map(|def| def.key.path().to_string())
            .collect();
        assert_eq!(swamp, vec!["swamp", "vaults", "crypt", "depths", "realm_of_zot"]);

        let nowhere = catalog.eligible_types(ThemeTags::empty());
        assert!(nowhere.iter().all(|def| def.is_untagged()));
        assert!(!nowhere.is_empty());
    }

    #[test]
    fn lair_has_three_thematic_rewards() {
        let catalog = ContentCatalog::wasteland();
        let rewards: Vec<&str> = catalog
            .rewards_for(&key("lair"))
            .iter()
            .map(|r| r.key.path())
            .collect();
        assert_eq!(rewards, vec!["rune/slimy", "rune/serpentine", "rune/gossamer"]);
        assert!(catalog.rewards_for(&key("nonexistent")).is_empty());
    }

    #[test]
    fn validation_catches_defects() {
        let base = ContentCatalog::wasteland();

        let mut no_fallback = base.clone();
        no_fallback.dungeon_types.retain(|def| !def.is_untagged());
        assert_eq!(no_fallback.validate(), Err(ConfigError::MissingFallbackType));

        let mut zero = base.clone();
        zero.dungeon_types[0].rarity_weight = 0;
        assert_eq!(zero.validate(), Err(ConfigError::ZeroWeight(key("lair"))));

        let mut dup = base.clone();
        let first = dup.dungeon_types[0].clone();
        dup.dungeon_types.push(first);
        assert_eq!(dup.validate(), Err(ConfigError::DuplicateType(key("lair"))));

        let mut dangling = base.clone();
        dangling.rewards[0].affinity.push(key("atlantis"));
        assert!(matches!(
            dangling.validate(),
            Err(ConfigError::UnknownAffinity { .. })
        ));

        let mut empty = base;
        empty.rewards.clear();
        assert_eq!(empty.validate(), Err(ConfigError::NoRewards));
    }

    #[test]
    fn catalog_loads_from_json() {
        let json = r#"{
            "dungeon_types": [
                {"key": "bog", "display_name": "Bog", "rarity_weight": 80, "themes": "SWAMP"},
                {"key": "ruin", "display_name": "Ruin", "rarity_weight": 100}
            ],
            "rewards": [
                {"key": "rune/peat", "display_name": "Peat Rune", "affinity": ["bog"]}
            ]
        }"#;
        let catalog: ContentCatalog = serde_json::from_str(json).unwrap();
        catalog.validate().unwrap();
        assert_eq!(catalog.dungeon_types[0].themes, ThemeTags::SWAMP);
        assert!(catalog.dungeon_types[1].is_untagged());
    }
}
