//! Dungeon placement, instance generation and player progression.
//!
//! World generation runs once per world: [`SpatialPlacer`] scatters entrances,
//! [`DungeonInstanceFactory`] rolls each instance and [`DungeonRegistry`]
//! stores them. At runtime [`PortalGraph`] moves players between the surface,
//! dungeon depths and the gated apex area. [`WorldSession`] owns all of it.

mod catalog;
mod clock;
mod error;
mod factory;
mod gate;
mod instance;
mod ledger;
mod params;
mod placement;
mod portal;
mod progression;
mod region;
mod registry;
mod session;
mod snapshot;
mod theme;
mod worldgen;

pub mod persist;

pub use catalog::*;
pub use clock::*;
pub use error::*;
pub use factory::*;
pub use gate::*;
pub use instance::*;
pub use ledger::*;
pub use params::*;
pub use placement::*;
pub use portal::*;
pub use progression::{PlayerProgressionState, PlayerProgressionTracker, Tier};
pub use region::*;
pub use registry::*;
pub use session::*;
pub use snapshot::*;
pub use theme::*;
pub use worldgen::*;
