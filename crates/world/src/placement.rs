//! Spacing-constrained entrance placement.
//!
//! A [`SpatialPlacer`] remembers every entrance it has accepted, across all
//! regions, so the spacing constraint holds world-wide. Accepted points are
//! bucketed on a grid with cell size equal to the spacing; a candidate only
//! needs to be checked against its own and the eight surrounding cells.

use crate::error::ConfigError;
use crate::region::Region;
use delve_core::{seeded_rng, BlockPos, TerrainSampler};
use rand::Rng;
use std::collections::HashMap;
use tracing::{debug, instrument, warn};

/// An accepted entrance position and the region it was drawn for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub position: BlockPos,
    pub region: String,
}

/// Result of one [`SpatialPlacer::place`] call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlacementRun {
    /// Accepted placements, in acceptance order.
    pub placements: Vec<Placement>,
    pub target: u32,
    /// Candidates drawn.
    pub attempts: u64,
    pub rejected_terrain: u64,
    pub rejected_spacing: u64,
}

impl PlacementRun {
    /// How many requested entrances could not be placed.
    pub fn shortfall(&self) -> u32 {
        self.target
            .saturating_sub(self.placements.len().min(u32::MAX as usize) as u32)
    }
}

pub struct SpatialPlacer {
    min_spacing: f64,
    attempts_per_placement: u32,
    accepted: Vec<BlockPos>,
    grid: HashMap<(i64, i64), Vec<usize>>,
}

impl SpatialPlacer {
    pub fn new(min_spacing: f64, attempts_per_placement: u32) -> Result<Self, ConfigError> {
        if !min_spacing.is_finite() || min_spacing <= 0.0 {
            return Err(ConfigError::InvalidSpacing(min_spacing));
        }
        Ok(Self {
            min_spacing,
            attempts_per_placement: attempts_per_placement.max(1),
            accepted: Vec::new(),
            grid: HashMap::new(),
        })
    }

    pub fn min_spacing(&self) -> f64 {
        self.min_spacing
    }

    /// Every position accepted so far, in acceptance order.
    pub fn accepted(&self) -> &[BlockPos] {
        &self.accepted
    }

    /// Draw up to `target` entrances inside `region`.
    ///
    /// Running out of attempts is not an error: the run comes back short and
    /// a warning is logged. A malformed region, or a target the region can
    /// never hold at this spacing, is rejected.
    #[instrument(skip(self, sampler), fields(region = %region.name))]
    pub fn place(
        &mut self,
        region: &Region,
        target: u32,
        seed: u64,
        sampler: &dyn TerrainSampler,
    ) -> Result<PlacementRun, ConfigError> {
        region.validate()?;
        let mut run = PlacementRun {
            target,
            ..PlacementRun::default()
        };
        if target == 0 {
            return Ok(run);
        }

        let capacity = region.bounds.packing_capacity(self.min_spacing);
        if u64::from(target) > capacity {
            return Err(ConfigError::SpacingTooLarge {
                region: region.name.clone(),
                spacing: self.min_spacing,
                target,
                capacity,
            });
        }

        let bounds = region.bounds;
        let max_attempts = u64::from(target) * u64::from(self.attempts_per_placement);
        let mut rng = seeded_rng(seed);

        while run.placements.len() < target as usize && run.attempts < max_attempts {
            run.attempts += 1;
            let x = rng.gen_range(bounds.min_x..=bounds.max_x);
            let z = rng.gen_range(bounds.min_z..=bounds.max_z);

            let sample = sampler.sample(x, z);
            if !sample.suitable {
                run.rejected_terrain += 1;
                continue;
            }

            let candidate = BlockPos::new(x, sample.ground_y, z);
            if self.too_close(candidate) {
                run.rejected_spacing += 1;
                continue;
            }

            self.insert(candidate);
            debug!(position = %candidate, "Accepted entrance");
            run.placements.push(Placement {
                position: candidate,
                region: region.name.clone(),
            });
        }

        if run.shortfall() > 0 {
            warn!(
                target,
                accepted = run.placements.len(),
                attempts = run.attempts,
                rejected_terrain = run.rejected_terrain,
                rejected_spacing = run.rejected_spacing,
                "Placement attempts exhausted before reaching target"
            );
        }
        Ok(run)
    }

    fn cell_of(&self, pos: BlockPos) -> (i64, i64) {
        (
            (f64::from(pos.x) / self.min_spacing).floor() as i64,
            (f64::from(pos.z) / self.min_spacing).floor() as i64,
        )
    }

    fn too_close(&self, candidate: BlockPos) -> bool {
        let (cx, cz) = self.cell_of(candidate);
        for dx in -1..=1 {
            for dz in -1..=1 {
                let Some(indices) = self.grid.get(&(cx + dx, cz + dz)) else {
                    continue;
                };
                if indices.iter().any(|&i| {
                    self.accepted[i].horizontal_distance(candidate) < self.min_spacing
                }) {
                    return true;
                }
            }
        }
        false
    }

    fn insert(&mut self, pos: BlockPos) {
        let cell = self.cell_of(pos);
        self.grid.entry(cell).or_default().push(self.accepted.len());
        self.accepted.push(pos);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::region::RegionBounds;
    use crate::theme::ThemeTags;
    use delve_core::TerrainSample;
    use proptest::prelude::*;

    fn flat(_x: i32, _z: i32) -> TerrainSample {
        TerrainSample::suitable(64)
    }

    fn region(size: i32) -> Region {
        Region::new(
            "test",
            RegionBounds::new(0, size, 0, size),
            ThemeTags::empty(),
        )
    }

    #[test]
    fn respects_spacing_and_uses_ground_height() {
        let mut placer = SpatialPlacer::new(100.0, 64).unwrap();
        let run = placer.place(&region(2000), 20, 7, &flat).unwrap();
        assert_eq!(run.placements.len(), 20);
        for (i, a) in run.placements.iter().enumerate() {
            assert_eq!(a.position.y, 64);
            for b in &run.placements[i + 1..] {
                assert!(a.position.horizontal_distance(b.position) >= 100.0);
            }
        }
    }

    #[test]
    fn spacing_holds_across_regions() {
        let mut placer = SpatialPlacer::new(300.0, 64).unwrap();
        let a = Region::new("a", RegionBounds::new(0, 1000, 0, 1000), ThemeTags::empty());
        let b = Region::new("b", RegionBounds::new(500, 1500, 0, 1000), ThemeTags::empty());
        placer.place(&a, 4, 1, &flat).unwrap();
        placer.place(&b, 4, 2, &flat).unwrap();
        let all = placer.accepted();
        for (i, p) in all.iter().enumerate() {
            for q in &all[i + 1..] {
                assert!(p.horizontal_distance(*q) >= 300.0);
            }
        }
    }

    #[test]
    fn unsuitable_terrain_yields_shortfall_not_error() {
        let mut placer = SpatialPlacer::new(50.0, 8).unwrap();
        let water = |_x: i32, _z: i32| TerrainSample::unsuitable(40);
        let run = placer.place(&region(1000), 3, 1, &water).unwrap();
        assert!(run.placements.is_empty());
        assert_eq!(run.attempts, 24);
        assert_eq!(run.rejected_terrain, 24);
        assert_eq!(run.shortfall(), 3);
    }

    #[test]
    fn impossible_target_is_a_config_error() {
        let mut placer = SpatialPlacer::new(500.0, 64).unwrap();
        let err = placer.place(&region(100), 10, 1, &flat).unwrap_err();
        assert!(matches!(err, ConfigError::SpacingTooLarge { target: 10, .. }));
        assert!(SpatialPlacer::new(-1.0, 1).is_err());
    }

    #[test]
    fn reversed_bounds_are_a_config_error() {
        let mut placer = SpatialPlacer::new(10.0, 64).unwrap();
        let backwards = Region::new(
            "Backwards",
            RegionBounds::new(100, 0, 0, 100),
            ThemeTags::empty(),
        );
        let err = placer.place(&backwards, 1, 1, &flat).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidRegion { ref name, .. } if name == "Backwards"));
        assert!(placer.accepted().is_empty());
    }

    #[test]
    fn zero_target_draws_nothing() {
        let mut placer = SpatialPlacer::new(10.0, 64).unwrap();
        let run = placer.place(&region(10), 0, 1, &flat).unwrap();
        assert_eq!(run.attempts, 0);
    }

    proptest! {
        #[test]
        fn same_seed_same_placements(seed in any::<u64>(), spacing in 20.0f64..200.0) {
            let bumpy = |x: i32, z: i32| {
                if (x ^ z) & 7 == 0 {
                    TerrainSample::unsuitable(0)
                } else {
                    TerrainSample::suitable(60 + (x & 3))
                }
            };
            let mut a = SpatialPlacer::new(spacing, 16).unwrap();
            let mut b = SpatialPlacer::new(spacing, 16).unwrap();
            let ra = a.place(&region(1000), 8, seed, &bumpy).unwrap();
            let rb = b.place(&region(1000), 8, seed, &bumpy).unwrap();
            prop_assert_eq!(&ra, &rb);

            for (i, p) in ra.placements.iter().enumerate() {
                for q in &ra.placements[i + 1..] {
                    prop_assert!(p.position.horizontal_distance(q.position) >= spacing);
                }
            }
        }
    }
}
