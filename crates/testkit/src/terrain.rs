//! Terrain fixtures for placement tests.

use delve_core::{derive_seed, TerrainSample, TerrainSampler};
use std::sync::atomic::{AtomicU64, Ordering};

/// Every column is buildable at the same height.
#[derive(Debug, Clone, Copy)]
pub struct FlatTerrain {
    /// Ground height reported for every column.
    pub ground_y: i32,
}

impl FlatTerrain {
    /// Flat terrain at sea level plus a little.
    pub const fn new(ground_y: i32) -> Self {
        Self { ground_y }
    }
}

impl Default for FlatTerrain {
    fn default() -> Self {
        Self::new(64)
    }
}

impl TerrainSampler for FlatTerrain {
    fn sample(&self, _x: i32, _z: i32) -> TerrainSample {
        TerrainSample::suitable(self.ground_y)
    }
}

/// No column is buildable.
#[derive(Debug, Clone, Copy, Default)]
pub struct FloodedTerrain;

impl TerrainSampler for FloodedTerrain {
    fn sample(&self, _x: i32, _z: i32) -> TerrainSample {
        TerrainSample::unsuitable(62)
    }
}

/// Pseudo-random mix of land and water with rolling heights.
///
/// Pure in `(seed, x, z)`; roughly `water_percent` of columns are rejected.
#[derive(Debug, Clone, Copy)]
pub struct PatchyTerrain {
    /// Seed for the column hash.
    pub seed: u64,
    /// Share of unsuitable columns, 0..=100.
    pub water_percent: u8,
}

impl PatchyTerrain {
    /// Terrain with the given seed and water share.
    pub const fn new(seed: u64, water_percent: u8) -> Self {
        Self {
            seed,
            water_percent,
        }
    }
}

impl TerrainSampler for PatchyTerrain {
    fn sample(&self, x: i32, z: i32) -> TerrainSample {
        let h = mix(derive_seed(self.seed, i64::from(x), i64::from(z), 0x7e77a1));
        let ground_y = 60 + (h % 24) as i32;
        if (h >> 32) % 100 < u64::from(self.water_percent) {
            TerrainSample::unsuitable(ground_y)
        } else {
            TerrainSample::suitable(ground_y)
        }
    }
}

/// Wraps a sampler and counts how many columns were queried.
#[derive(Debug, Default)]
pub struct CountingSampler<S> {
    inner: S,
    calls: AtomicU64,
}

impl<S> CountingSampler<S> {
    /// Wrap `inner`.
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            calls: AtomicU64::new(0),
        }
    }

    /// Columns sampled so far.
    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }
}

impl<S: TerrainSampler> TerrainSampler for CountingSampler<S> {
    fn sample(&self, x: i32, z: i32) -> TerrainSample {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.inner.sample(x, z)
    }
}

// splitmix64 finalizer
fn mix(mut z: u64) -> u64 {
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}
