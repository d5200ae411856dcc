//! Host-facing facade for the delve dungeon system.
//!
//! Loads a [`DelveConfig`] from TOML and hands out a [`WorldSession`]. The
//! component crates are re-exported for hosts that need finer control.

mod config;

pub use config::DelveConfig;
pub use delve_core;
pub use delve_world;

pub use delve_core::{BlockPos, ContentKey, DungeonId, PlayerId, TerrainSample, TerrainSampler};
pub use delve_world::{
    Destination, ManualClock, MonotonicClock, Outcome, PortalKind, PortalMarker, SystemClock,
    VaultResolver, WorldSession,
};
