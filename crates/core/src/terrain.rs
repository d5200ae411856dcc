//! Terrain sampling boundary.
//!
//! World generation never reads voxels itself. The host supplies a pure
//! function from a column `(x, z)` to its ground height and whether a dungeon
//! entrance may sit there (not water, not a cliff face, ...).

/// Result of sampling one terrain column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TerrainSample {
    /// Y of the topmost solid block.
    pub ground_y: i32,
    /// Whether an entrance can be built on this column.
    pub suitable: bool,
}

impl TerrainSample {
    /// A buildable column at `ground_y`.
    pub const fn suitable(ground_y: i32) -> Self {
        Self {
            ground_y,
            suitable: true,
        }
    }

    /// A column that must be rejected.
    pub const fn unsuitable(ground_y: i32) -> Self {
        Self {
            ground_y,
            suitable: false,
        }
    }
}

/// Pure terrain query used by placement.
///
/// Implementations must return the same sample for the same column on every
/// call; placement determinism depends on it.
pub trait TerrainSampler {
    /// Sample the column at world `(x, z)`.
    fn sample(&self, x: i32, z: i32) -> TerrainSample;
}

impl<F> TerrainSampler for F
where
    F: Fn(i32, i32) -> TerrainSample,
{
    fn sample(&self, x: i32, z: i32) -> TerrainSample {
        self(x, z)
    }
}
