//! Geographic regions.
//!
//! Regions are static configuration: a named bounding box on the x/z plane and
//! the themes that bias which dungeon types spawn inside it.

use crate::error::ConfigError;
use crate::theme::ThemeTags;
use serde::{Deserialize, Serialize};

/// Inclusive x/z bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegionBounds {
    pub min_x: i32,
    pub max_x: i32,
    pub min_z: i32,
    pub max_z: i32,
}

impl RegionBounds {
    pub const fn new(min_x: i32, max_x: i32, min_z: i32, max_z: i32) -> Self {
        Self {
            min_x,
            max_x,
            min_z,
            max_z,
        }
    }

    pub fn contains(&self, x: i32, z: i32) -> bool {
        (self.min_x..=self.max_x).contains(&x) && (self.min_z..=self.max_z).contains(&z)
    }

    /// Extent along x, in blocks.
    pub fn width(&self) -> i64 {
        i64::from(self.max_x) - i64::from(self.min_x)
    }

    /// Extent along z, in blocks.
    pub fn depth(&self) -> i64 {
        i64::from(self.max_z) - i64::from(self.min_z)
    }

    /// Upper bound on how many points can be packed at `spacing` apart.
    ///
    /// Points at least `spacing` apart each own a disjoint disc of radius
    /// `spacing / 2`; the discs fit inside the box grown by that radius.
    pub fn packing_capacity(&self, spacing: f64) -> u64 {
        let r = spacing / 2.0;
        let area = (self.width() as f64 + spacing) * (self.depth() as f64 + spacing);
        let disc = std::f64::consts::PI * r * r;
        (area / disc).floor().max(1.0) as u64
    }
}

/// A named geographic partition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub name: String,
    pub bounds: RegionBounds,
    #[serde(default)]
    pub themes: ThemeTags,
}

impl Region {
    pub fn new(name: impl Into<String>, bounds: RegionBounds, themes: ThemeTags) -> Self {
        Self {
            name: name.into(),
            bounds,
            themes,
        }
    }

    pub fn contains(&self, x: i32, z: i32) -> bool {
        self.bounds.contains(x, z)
    }

    pub fn center(&self) -> (i32, i32) {
        let b = &self.bounds;
        (
            ((i64::from(b.min_x) + i64::from(b.max_x)) / 2) as i32,
            ((i64::from(b.min_z) + i64::from(b.max_z)) / 2) as i32,
        )
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |reason| ConfigError::InvalidRegion {
            name: self.name.clone(),
            reason,
        };
        if self.name.trim().is_empty() {
            return Err(invalid("name is empty"));
        }
        if self.bounds.min_x > self.bounds.max_x || self.bounds.min_z > self.bounds.max_z {
            return Err(invalid("bounds are reversed"));
        }
        Ok(())
    }
}

/// Check a region table before generation.
pub fn validate_regions(regions: &[Region]) -> Result<(), ConfigError> {
    if regions.is_empty() {
        return Err(ConfigError::NoRegions);
    }
    for (i, region) in regions.iter().enumerate() {
        region.validate()?;
        if regions[..i].iter().any(|other| other.name == region.name) {
            return Err(ConfigError::InvalidRegion {
                name: region.name.clone(),
                reason: "name is used twice",
            });
        }
    }
    Ok(())
}

/// First region in table order containing `(x, z)`.
///
/// Regions may overlap; put the ones that should win (coasts, say) first.
pub fn region_at(regions: &[Region], x: i32, z: i32) -> Option<&Region> {
    regions.iter().find(|region| region.contains(x, z))
}

/// Default stylized-continent layout, coasts first so they win overlaps.
pub fn wasteland_regions() -> Vec<Region> {
    use ThemeTags as T;
    vec![
        Region::new(
            "Atlantic Coast",
            RegionBounds::new(1500, 2500, -2000, 4000),
            T::COASTAL,
        ),
        Region::new(
            "Pacific Coast",
            RegionBounds::new(-5000, -4500, -2000, 4000),
            T::COASTAL,
        ),
        Region::new(
            "Gulf Coast",
            RegionBounds::new(-1000, 1000, -5000, -3000),
            T::COASTAL | T::SWAMP,
        ),
        Region::new(
            "Northeast",
            RegionBounds::new(-2000, 2000, 2000, 5000),
            T::FOREST | T::MOUNTAIN,
        ),
        Region::new(
            "Southeast",
            RegionBounds::new(-2000, 2000, -5000, 0),
            T::COASTAL | T::SWAMP,
        ),
        Region::new(
            "Midwest",
            RegionBounds::new(-1000, 1500, -1000, 3000),
            T::empty(),
        ),
        Region::new(
            "Southwest",
            RegionBounds::new(-5000, -1000, -3000, 1000),
            T::DESERT,
        ),
        Region::new(
            "Rockies",
            RegionBounds::new(-3000, -1000, 0, 3000),
            T::MOUNTAIN,
        ),
        Region::new(
            "West Coast",
            RegionBounds::new(-5000, -3000, 1000, 5000),
            T::COASTAL | T::FOREST,
        ),
        Region::new(
            "Northwest",
            RegionBounds::new(-4000, -2000, 3000, 5000),
            T::FOREST,
        ),
        Region::new(
            "Great Lakes",
            RegionBounds::new(500, 2500, 1000, 3500),
            T::empty(),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_regions_validate() {
        let regions = wasteland_regions();
        assert_eq!(regions.len(), 11);
        validate_regions(&regions).unwrap();
    }

    #[test]
    fn coasts_win_overlaps() {
        let regions = wasteland_regions();
        // Inside both Atlantic Coast and Great Lakes.
        let region = region_at(&regions, 2000, 2000).unwrap();
        assert_eq!(region.name, "Atlantic Coast");
        assert!(region_at(&regions, 90_000, 0).is_none());
    }

    #[test]
    fn center_is_midpoint() {
        let region = Region::new("r", RegionBounds::new(-10, 30, 0, 100), ThemeTags::empty());
        assert_eq!(region.center(), (10, 50));
    }

    #[test]
    fn rejects_reversed_and_duplicate_regions() {
        let reversed = vec![Region::new(
            "bad",
            RegionBounds::new(10, 0, 0, 10),
            ThemeTags::empty(),
        )];
        assert!(matches!(
            validate_regions(&reversed),
            Err(ConfigError::InvalidRegion { .. })
        ));

        let twice = vec![
            Region::new("a", RegionBounds::new(0, 1, 0, 1), ThemeTags::empty()),
            Region::new("a", RegionBounds::new(5, 6, 5, 6), ThemeTags::empty()),
        ];
        assert!(validate_regions(&twice).is_err());
        assert_eq!(validate_regions(&[]), Err(ConfigError::NoRegions));
    }

    #[test]
    fn packing_capacity_shrinks_with_spacing() {
        let bounds = RegionBounds::new(0, 1000, 0, 1000);
        assert!(bounds.packing_capacity(100.0) > bounds.packing_capacity(500.0));
        assert_eq!(RegionBounds::new(0, 0, 0, 0).packing_capacity(10.0), 1);
    }
}
