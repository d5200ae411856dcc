//! Catalog of generated dungeon instances.
//!
//! Populated once during world generation, then read-mostly. The only runtime
//! mutation is reward collection, which is an atomic flag on the instance, so
//! lookups never take a lock.

use crate::error::RegistryError;
use crate::instance::{CollectOutcome, DungeonInstance};
use delve_core::{BlockPos, ContentKey, DungeonId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use tracing::debug;

#[derive(Debug, Default, Clone)]
pub struct DungeonRegistry {
    by_id: HashMap<DungeonId, DungeonInstance>,
    by_position: HashMap<BlockPos, DungeonId>,
}

impl DungeonRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an instance. Both keys are checked before either index changes.
    pub fn register(&mut self, instance: DungeonInstance) -> Result<(), RegistryError> {
        if self.by_id.contains_key(&instance.id()) {
            return Err(RegistryError::DuplicateId(instance.id()));
        }
        if self.by_position.contains_key(&instance.entrance()) {
            return Err(RegistryError::DuplicatePosition(instance.entrance()));
        }
        debug!(
            id = %instance.id(),
            kind = %instance.kind(),
            entrance = %instance.entrance(),
            levels = instance.level_count(),
            apex = instance.is_apex(),
            "Registered dungeon"
        );
        self.by_position.insert(instance.entrance(), instance.id());
        self.by_id.insert(instance.id(), instance);
        Ok(())
    }

    pub fn get_by_id(&self, id: DungeonId) -> Option<&DungeonInstance> {
        self.by_id.get(&id)
    }

    pub fn get_by_position(&self, pos: BlockPos) -> Option<&DungeonInstance> {
        self.by_position
            .get(&pos)
            .and_then(|id| self.by_id.get(id))
    }

    pub fn contains(&self, id: DungeonId) -> bool {
        self.by_id.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// All instances ordered by id.
    pub fn iter_sorted(&self) -> Vec<&DungeonInstance> {
        let mut all: Vec<&DungeonInstance> = self.by_id.values().collect();
        all.sort_by_key(|inst| inst.id());
        all
    }

    /// Apex instances whose reward has not been collected, ordered by id.
    pub fn list_apex_with_uncollected_reward(&self) -> Vec<&DungeonInstance> {
        let mut out: Vec<&DungeonInstance> = self
            .by_id
            .values()
            .filter(|inst| inst.has_uncollected_reward())
            .collect();
        out.sort_by_key(|inst| inst.id());
        out
    }

    pub fn apex_count(&self) -> usize {
        self.by_id.values().filter(|inst| inst.is_apex()).count()
    }

    /// Rewards collected so far across the world.
    pub fn collected_count(&self) -> usize {
        self.by_id
            .values()
            .filter(|inst| inst.reward_collected())
            .count()
    }

    /// Atomically mark `id`'s reward collected.
    ///
    /// Returns [`CollectOutcome::Collected`] only to the single call that
    /// performed the transition.
    pub fn mark_reward_collected(&self, id: DungeonId) -> CollectOutcome {
        match self.by_id.get(&id) {
            Some(instance) => instance.try_collect_reward(),
            None => CollectOutcome::NotFound,
        }
    }

    pub fn statistics(&self) -> RegistryStats {
        let mut stats = RegistryStats {
            total: self.by_id.len(),
            ..RegistryStats::default()
        };
        for inst in self.by_id.values() {
            *stats.by_type.entry(inst.kind().clone()).or_default() += 1;
            if let Some(reward) = inst.reward() {
                stats.apex += 1;
                *stats.rewards.entry(reward.clone()).or_default() += 1;
                if inst.reward_collected() {
                    stats.collected += 1;
                }
            }
        }
        stats
    }
}

/// Summary counts for diagnostics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegistryStats {
    pub total: usize,
    pub apex: usize,
    pub collected: usize,
    pub by_type: BTreeMap<ContentKey, usize>,
    /// Apex instances carrying each reward.
    pub rewards: BTreeMap<ContentKey, usize>,
}

impl RegistryStats {
    pub fn uncollected(&self) -> usize {
        self.apex - self.collected
    }
}

impl fmt::Display for RegistryStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} dungeons, {} apex ({} rewards uncollected)",
            self.total,
            self.apex,
            self.uncollected()
        )?;
        for (kind, count) in &self.by_type {
            writeln!(f, "  {kind}: {count}")?;
        }
        if !self.rewards.is_empty() {
            writeln!(f, "rewards:")?;
            for (reward, count) in &self.rewards {
                writeln!(f, "  {reward}: {count}")?;
            }
        }
        Ok(())
    }
}
