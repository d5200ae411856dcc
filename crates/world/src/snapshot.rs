//! Versioned state snapshots.
//!
//! Schema history:
//! - v1: dungeons, markers, player depth/instance/cooldown.
//! - v2: adds the configuration reference, per-player reward ledgers and the
//!   apex-area flag.
//!
//! Older schemas are upgraded through `From` impls; only the current schema is
//! ever written.

use crate::error::{InstanceError, SnapshotError};
use crate::instance::DungeonInstance;
use crate::portal::PortalMarker;
use crate::progression::PlayerProgressionState;
use anyhow::{Context, Result};
use delve_core::{BlockPos, ContentKey, DungeonId, PlayerId};
use serde::{Deserialize, Serialize};

/// Schema written by this build.
pub const SNAPSHOT_SCHEMA_VERSION: u32 = 2;

/// Everything needed to rebuild a world session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub schema_version: u32,
    pub config: ConfigRef,
    pub dungeons: Vec<DungeonRecord>,
    pub markers: Vec<PortalMarker>,
    pub players: Vec<PlayerRecord>,
    pub rewards: Vec<RewardLedgerRecord>,
}

/// Which configuration the snapshot was taken under.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigRef {
    pub world_seed: u64,
    pub regions: Vec<String>,
    pub dungeon_types: Vec<ContentKey>,
    pub rewards: Vec<ContentKey>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DungeonRecord {
    pub id: DungeonId,
    pub kind: ContentKey,
    pub entrance: BlockPos,
    pub level_count: u8,
    pub apex: bool,
    pub reward: Option<ContentKey>,
    pub reward_collected: bool,
}

impl DungeonRecord {
    /// Rebuild the instance, re-checking every invariant.
    pub fn to_instance(&self) -> Result<DungeonInstance, InstanceError> {
        DungeonInstance::builder()
            .id(self.id)
            .kind(self.kind.clone())
            .entrance(self.entrance)
            .level_count(self.level_count)
            .apex(self.apex, self.reward.clone())
            .reward_collected(self.reward_collected)
            .build()
    }
}

impl From<&DungeonInstance> for DungeonRecord {
    fn from(inst: &DungeonInstance) -> Self {
        Self {
            id: inst.id(),
            kind: inst.kind().clone(),
            entrance: inst.entrance(),
            level_count: inst.level_count(),
            apex: inst.is_apex(),
            reward: inst.reward().cloned(),
            reward_collected: inst.reward_collected(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub player: PlayerId,
    pub depth: u32,
    pub instance: Option<DungeonId>,
    pub in_apex_area: bool,
    pub last_portal_use_ms: Option<u64>,
}

impl PlayerRecord {
    pub fn new(player: PlayerId, state: &PlayerProgressionState) -> Self {
        Self {
            player,
            depth: state.depth,
            instance: state.instance,
            in_apex_area: state.in_apex_area,
            last_portal_use_ms: state.last_portal_use_ms,
        }
    }

    pub fn state(&self) -> PlayerProgressionState {
        PlayerProgressionState {
            depth: self.depth,
            instance: self.instance,
            in_apex_area: self.in_apex_area,
            last_portal_use_ms: self.last_portal_use_ms,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardLedgerRecord {
    pub player: PlayerId,
    pub rewards: Vec<ContentKey>,
}

/// Schema v1, kept for reading old saves.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotV1 {
    pub schema_version: u32,
    pub world_seed: u64,
    pub dungeons: Vec<DungeonRecord>,
    pub markers: Vec<PortalMarker>,
    pub players: Vec<PlayerRecordV1>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerRecordV1 {
    pub player: PlayerId,
    pub depth: u32,
    pub instance: Option<DungeonId>,
    pub last_portal_use_ms: Option<u64>,
}

impl From<SnapshotV1> for StateSnapshot {
    fn from(old: SnapshotV1) -> Self {
        let players = old
            .players
            .into_iter()
            .map(|p| PlayerRecord {
                player: p.player,
                depth: p.depth,
                instance: p.instance,
                in_apex_area: false,
                last_portal_use_ms: p.last_portal_use_ms,
            })
            .collect();
        Self {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            config: ConfigRef {
                world_seed: old.world_seed,
                ..ConfigRef::default()
            },
            dungeons: old.dungeons,
            markers: old.markers,
            players,
            rewards: Vec::new(),
        }
    }
}

#[derive(Deserialize)]
struct VersionProbe {
    schema_version: u32,
}

impl StateSnapshot {
    /// Check the schema version is one this build writes.
    pub fn check_version(&self) -> Result<(), SnapshotError> {
        if self.schema_version != SNAPSHOT_SCHEMA_VERSION {
            return Err(SnapshotError::UnsupportedVersion {
                found: self.schema_version,
                supported: SNAPSHOT_SCHEMA_VERSION,
            });
        }
        Ok(())
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("Failed to serialize snapshot to JSON")
    }

    /// Parse any supported schema version, migrating old ones.
    pub fn from_json(json: &str) -> Result<Self> {
        let probe: VersionProbe =
            serde_json::from_str(json).context("Snapshot JSON has no schema_version")?;
        match probe.schema_version {
            1 => {
                let old: SnapshotV1 =
                    serde_json::from_str(json).context("Failed to parse v1 snapshot")?;
                Ok(old.into())
            }
            SNAPSHOT_SCHEMA_VERSION => {
                serde_json::from_str(json).context("Failed to parse snapshot")
            }
            found => Err(SnapshotError::UnsupportedVersion {
                found,
                supported: SNAPSHOT_SCHEMA_VERSION,
            }
            .into()),
        }
    }
}
