//! Generated dungeon instances.

use crate::error::InstanceError;
use delve_core::{BlockPos, ContentKey, DungeonId};
use std::ops::RangeInclusive;
use std::sync::atomic::{AtomicBool, Ordering};

/// Level counts allowed for ordinary instances.
pub const ORDINARY_LEVELS: RangeInclusive<u8> = 1..=10;
/// Level counts allowed for apex instances.
pub const APEX_LEVELS: RangeInclusive<u8> = 10..=15;

/// Result of trying to collect an instance's reward.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectOutcome {
    /// This call flipped the flag; the caller owns the reward.
    Collected(ContentKey),
    /// Someone collected it first.
    AlreadyCollected,
    /// The instance is not apex and carries nothing.
    NoReward,
    /// No instance with that id is registered.
    NotFound,
}

impl CollectOutcome {
    pub fn is_collected(&self) -> bool {
        matches!(self, CollectOutcome::Collected(_))
    }
}

/// One generated dungeon.
///
/// Immutable after construction except for the reward-collected flag, which
/// only ever goes from `false` to `true`.
#[derive(Debug)]
pub struct DungeonInstance {
    id: DungeonId,
    kind: ContentKey,
    entrance: BlockPos,
    level_count: u8,
    apex: bool,
    reward: Option<ContentKey>,
    reward_collected: AtomicBool,
}

impl DungeonInstance {
    pub fn builder() -> DungeonInstanceBuilder {
        DungeonInstanceBuilder::default()
    }

    pub fn id(&self) -> DungeonId {
        self.id
    }

    /// Dungeon type key.
    pub fn kind(&self) -> &ContentKey {
        &self.kind
    }

    pub fn entrance(&self) -> BlockPos {
        self.entrance
    }

    pub fn level_count(&self) -> u8 {
        self.level_count
    }

    pub fn is_apex(&self) -> bool {
        self.apex
    }

    pub fn reward(&self) -> Option<&ContentKey> {
        self.reward.as_ref()
    }

    pub fn reward_collected(&self) -> bool {
        self.reward_collected.load(Ordering::SeqCst)
    }

    /// True for apex instances whose reward is still waiting.
    pub fn has_uncollected_reward(&self) -> bool {
        self.reward.is_some() && !self.reward_collected()
    }

    /// Flip the collected flag with a single compare-and-set.
    ///
    /// Of any number of racing callers exactly one sees `Collected`.
    pub fn try_collect_reward(&self) -> CollectOutcome {
        let Some(reward) = &self.reward else {
            return CollectOutcome::NoReward;
        };
        let claimed = self
            .reward_collected
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_ok();
        if claimed {
            CollectOutcome::Collected(reward.clone())
        } else {
            CollectOutcome::AlreadyCollected
        }
    }
}

impl Clone for DungeonInstance {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            kind: self.kind.clone(),
            entrance: self.entrance,
            level_count: self.level_count,
            apex: self.apex,
            reward: self.reward.clone(),
            reward_collected: AtomicBool::new(self.reward_collected()),
        }
    }
}

impl PartialEq for DungeonInstance {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.kind == other.kind
            && self.entrance == other.entrance
            && self.level_count == other.level_count
            && self.apex == other.apex
            && self.reward == other.reward
            && self.reward_collected() == other.reward_collected()
    }
}

impl Eq for DungeonInstance {}

/// Validating builder for [`DungeonInstance`].
///
/// `id`, `kind`, `entrance` and `level_count` are required.
#[derive(Debug, Clone, Default)]
pub struct DungeonInstanceBuilder {
    id: Option<DungeonId>,
    kind: Option<ContentKey>,
    entrance: Option<BlockPos>,
    level_count: Option<u8>,
    apex: bool,
    reward: Option<ContentKey>,
    reward_collected: bool,
}

impl DungeonInstanceBuilder {
    pub fn id(mut self, id: DungeonId) -> Self {
        self.id = Some(id);
        self
    }

    pub fn kind(mut self, kind: ContentKey) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn entrance(mut self, entrance: BlockPos) -> Self {
        self.entrance = Some(entrance);
        self
    }

    pub fn level_count(mut self, level_count: u8) -> Self {
        self.level_count = Some(level_count);
        self
    }

    /// Mark the instance apex with its reward.
    pub fn apex_reward(mut self, reward: ContentKey) -> Self {
        self.apex = true;
        self.reward = Some(reward);
        self
    }

    /// Raw apex/reward pair, as read back from a snapshot.
    pub fn apex(mut self, apex: bool, reward: Option<ContentKey>) -> Self {
        self.apex = apex;
        self.reward = reward;
        self
    }

    pub fn reward_collected(mut self, collected: bool) -> Self {
        self.reward_collected = collected;
        self
    }

    pub fn build(self) -> Result<DungeonInstance, InstanceError> {
        let id = self.id.ok_or(InstanceError::MissingField("id"))?;
        let kind = self.kind.ok_or(InstanceError::MissingField("kind"))?;
        let entrance = self.entrance.ok_or(InstanceError::MissingField("entrance"))?;
        let level_count = self
            .level_count
            .ok_or(InstanceError::MissingField("level_count"))?;

        let allowed = if self.apex {
            APEX_LEVELS
        } else {
            ORDINARY_LEVELS
        };
        if !allowed.contains(&level_count) {
            return Err(InstanceError::LevelCountOutOfRange {
                level_count,
                apex: self.apex,
            });
        }
        if self.apex != self.reward.is_some() {
            return Err(InstanceError::RewardMismatch {
                apex: self.apex,
                has_reward: self.reward.is_some(),
            });
        }
        if self.reward_collected && self.reward.is_none() {
            return Err(InstanceError::CollectedWithoutReward);
        }

        Ok(DungeonInstance {
            id,
            kind,
            entrance,
            level_count,
            apex: self.apex,
            reward: self.reward,
            reward_collected: AtomicBool::new(self.reward_collected),
        })
    }
}
