//! Error types.
//!
//! Only configuration defects and malformed inputs are errors. Runtime results
//! such as "no portal here" or "already collected" are ordinary enum values in
//! their own modules.

use crate::portal::PortalKind;
use delve_core::{BlockPos, ContentKey, DungeonId, PlayerId};
use thiserror::Error;

/// A world configuration that can never produce a valid world.
///
/// Detected once during generation and never retried.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    /// The catalog has no dungeon types.
    #[error("content catalog defines no dungeon types")]
    EmptyCatalog,
    /// The catalog has no reward types.
    #[error("content catalog defines no reward types")]
    NoRewards,
    /// No dungeon type without themes exists, so some regions may have no candidates.
    #[error("content catalog needs at least one untagged fallback dungeon type")]
    MissingFallbackType,
    /// A dungeon type can never be chosen.
    #[error("dungeon type {0} has zero rarity weight")]
    ZeroWeight(ContentKey),
    /// Two dungeon types share a key.
    #[error("dungeon type {0} is defined twice")]
    DuplicateType(ContentKey),
    /// Two reward types share a key.
    #[error("reward type {0} is defined twice")]
    DuplicateReward(ContentKey),
    /// A reward names a dungeon type that does not exist.
    #[error("reward {reward} declares affinity to unknown dungeon type {dungeon_type}")]
    UnknownAffinity {
        /// Reward carrying the affinity.
        reward: ContentKey,
        /// Missing dungeon type.
        dungeon_type: ContentKey,
    },
    /// No regions were configured.
    #[error("no regions configured")]
    NoRegions,
    /// Region bounds or name are unusable.
    #[error("region {name:?} is invalid: {reason}")]
    InvalidRegion {
        /// Region name.
        name: String,
        /// What is wrong with it.
        reason: &'static str,
    },
    /// Minimum spacing must be a finite positive distance.
    #[error("minimum spacing {0} must be finite and positive")]
    InvalidSpacing(f64),
    /// The region cannot hold the requested number of entrances at this spacing.
    #[error(
        "region {region:?} fits at most {capacity} entrances at spacing {spacing}, {target} requested"
    )]
    SpacingTooLarge {
        /// Region name.
        region: String,
        /// Configured spacing.
        spacing: f64,
        /// Requested entrance count.
        target: u32,
        /// Upper bound of entrances the region can hold.
        capacity: u64,
    },
    /// A probability parameter is outside `[0, 1]`.
    #[error("{name} = {value} is not a probability")]
    InvalidProbability {
        /// Parameter name.
        name: &'static str,
        /// Rejected value.
        value: f64,
    },
    /// The per-region dungeon count range is reversed.
    #[error("dungeons_per_region range {min}..={max} is empty")]
    InvalidCountRange {
        /// Lower bound.
        min: u32,
        /// Upper bound.
        max: u32,
    },
    /// Too few apex dungeons were generated for the gate to ever open.
    #[error("world has {apex} apex dungeons but the gate needs {threshold} distinct rewards")]
    InsufficientApex {
        /// Apex instances generated.
        apex: usize,
        /// Gate threshold.
        threshold: u32,
    },
    /// Generated instances collided in the registry.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// The factory produced an instance that breaks an invariant.
    #[error(transparent)]
    Instance(#[from] InstanceError),
}

/// Registry key conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// An instance with this id is already registered.
    #[error("dungeon {0} is already registered")]
    DuplicateId(DungeonId),
    /// An instance already has its entrance here.
    #[error("an entrance already exists at {0}")]
    DuplicatePosition(BlockPos),
}

/// A dungeon instance record that breaks an invariant.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstanceError {
    /// A required builder field was never set.
    #[error("dungeon instance is missing required field `{0}`")]
    MissingField(&'static str),
    /// Level count outside the range allowed for this apex status.
    #[error("level count {level_count} is out of range for apex = {apex}")]
    LevelCountOutOfRange {
        /// Offending level count.
        level_count: u8,
        /// Apex flag of the record.
        apex: bool,
    },
    /// Apex instances carry exactly one reward, ordinary ones none.
    #[error("apex = {apex} but reward present = {has_reward}")]
    RewardMismatch {
        /// Apex flag of the record.
        apex: bool,
        /// Whether a reward was set.
        has_reward: bool,
    },
    /// Only instances with a reward can have it collected.
    #[error("reward marked collected on an instance without a reward")]
    CollectedWithoutReward,
}

/// Portal marker registration failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PortalError {
    /// A marker already occupies this position.
    #[error("a portal marker already exists at {0}")]
    DuplicateMarker(BlockPos),
    /// Only entrances may be bound to an instance.
    #[error("{kind:?} marker at {position} cannot be bound to a dungeon")]
    BindingOnNonEntrance {
        /// Marker position.
        position: BlockPos,
        /// Marker kind.
        kind: PortalKind,
    },
    /// The bound instance is not in the registry.
    #[error("marker bound to unknown dungeon {0}")]
    UnknownDungeon(DungeonId),
}

/// A persisted snapshot that cannot be imported.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SnapshotError {
    /// The snapshot was written by a schema this build cannot read.
    #[error("snapshot schema version {found} is not supported (max {supported})")]
    UnsupportedVersion {
        /// Version found in the snapshot.
        found: u32,
        /// Newest version this build understands.
        supported: u32,
    },
    /// The snapshot references content this build's catalog does not define.
    #[error("snapshot references unknown dungeon type {0}")]
    UnknownDungeonType(ContentKey),
    /// The snapshot references a reward this build's catalog does not define.
    #[error("snapshot references unknown reward {0}")]
    UnknownReward(ContentKey),
    /// A dungeon record breaks an invariant.
    #[error("dungeon record {id} is invalid: {source}")]
    Instance {
        /// Record id.
        id: DungeonId,
        /// Violated invariant.
        source: InstanceError,
    },
    /// A player record points at a dungeon that is not in the snapshot.
    #[error("{player} is bound to unknown dungeon {dungeon}")]
    UnknownPlayerDungeon {
        /// Player record.
        player: PlayerId,
        /// Missing dungeon.
        dungeon: DungeonId,
    },
    /// Two player records share an id.
    #[error("{0} appears twice in the snapshot")]
    DuplicatePlayer(PlayerId),
    /// Dungeon records collide.
    #[error(transparent)]
    Registry(#[from] RegistryError),
    /// Portal records collide or reference missing dungeons.
    #[error(transparent)]
    Portal(#[from] PortalError),
    /// The embedded configuration is itself defective.
    #[error(transparent)]
    Config(#[from] ConfigError),
}
