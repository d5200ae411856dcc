//! One-pass world generation: placement, instance rolls, registration.

use crate::catalog::ContentCatalog;
use crate::error::ConfigError;
use crate::factory::DungeonInstanceFactory;
use crate::gate::RewardGate;
use crate::params::{BalanceParams, WorldGenParams};
use crate::placement::SpatialPlacer;
use crate::region::{validate_regions, Region};
use crate::registry::DungeonRegistry;
use delve_core::{derive_seed, seeded_rng, TerrainSampler};
use rand::Rng;
use std::sync::Arc;
use tracing::{info, instrument};

const COUNT_SALT: u64 = 0x6463_6E74_0000_0001;
const PLACEMENT_SALT: u64 = 0x6470_6C63_0000_0002;
const FACTORY_SALT: u64 = 0x6466_6374_0000_0003;

/// Per-region placement outcome.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionReport {
    pub region: String,
    pub target: u32,
    pub placed: usize,
    pub attempts: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorldGenReport {
    pub regions: Vec<RegionReport>,
    pub total: usize,
    pub apex: usize,
}

impl WorldGenReport {
    /// Regions that came back with fewer entrances than requested.
    pub fn short_regions(&self) -> impl Iterator<Item = &RegionReport> {
        self.regions
            .iter()
            .filter(|r| r.placed < r.target as usize)
    }
}

#[derive(Debug)]
pub struct GeneratedWorld {
    pub registry: DungeonRegistry,
    pub report: WorldGenReport,
}

/// Generate every dungeon instance for a world.
///
/// Deterministic for a given seed, content and terrain sampler. Fails only on
/// configuration defects, including a world with fewer apex dungeons than the
/// gate threshold.
#[instrument(skip_all, fields(world_seed = params.world_seed, regions = regions.len()))]
pub fn generate_world(
    catalog: Arc<ContentCatalog>,
    regions: &[Region],
    params: &WorldGenParams,
    balance: &BalanceParams,
    gate: &RewardGate,
    sampler: &dyn TerrainSampler,
) -> Result<GeneratedWorld, ConfigError> {
    validate_regions(regions)?;
    params.validate()?;
    let factory = DungeonInstanceFactory::new(catalog, *balance)?;
    let mut placer = SpatialPlacer::new(params.min_spacing, params.attempts_per_placement)?;

    let seed = params.world_seed;
    let mut count_rng = seeded_rng(derive_seed(seed, 0, 0, COUNT_SALT));
    let mut factory_rng = seeded_rng(derive_seed(seed, 0, 0, FACTORY_SALT));
    let range = params.dungeons_per_region;

    let mut registry = DungeonRegistry::new();
    let mut report = WorldGenReport::default();

    for (idx, region) in regions.iter().enumerate() {
        let target = count_rng.gen_range(range.min..=range.max);
        let region_seed = derive_seed(seed, idx as i64, 0, PLACEMENT_SALT);
        let run = placer.place(region, target, region_seed, sampler)?;

        for placement in &run.placements {
            let instance = factory.build(placement.position, region, &mut factory_rng)?;
            registry.register(instance)?;
        }

        report.regions.push(RegionReport {
            region: region.name.clone(),
            target,
            placed: run.placements.len(),
            attempts: run.attempts,
        });
    }

    report.total = registry.len();
    report.apex = registry.apex_count();
    gate.validate_world(report.apex)?;

    let stats = registry.statistics();
    info!(
        total = report.total,
        apex = report.apex,
        short_regions = report.short_regions().count(),
        "World generation complete"
    );
    for (reward, count) in &stats.rewards {
        info!(%reward, count, "Reward distribution");
    }

    Ok(GeneratedWorld { registry, report })
}
