use anyhow::{Context, Result};
use delve_core::TerrainSampler;
use delve_world::{
    wasteland_regions, BalanceParams, ConfigError, ContentCatalog, GateParams, MonotonicClock,
    PortalParams, Region, SessionParams, WorldGenParams, WorldSession,
};
use serde::{Deserialize, Serialize};
use std::{fs, path::Path, sync::Arc};
use tracing::warn;

const DEFAULT_CONFIG_PATH: &str = "config/delve.toml";

/// Everything a host needs to stand up a world, loadable from TOML.
///
/// Missing sections fall back to their defaults. When `content` or
/// `regions` are absent the built-in wasteland tables are used.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DelveConfig {
    pub worldgen: WorldGenParams,
    pub balance: BalanceParams,
    pub portals: PortalParams,
    pub gate: GateParams,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<ContentCatalog>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regions: Option<Vec<Region>>,
}

impl DelveConfig {
    /// Load configuration from the default path.
    pub fn load() -> Self {
        Self::load_from_path(Path::new(DEFAULT_CONFIG_PATH))
    }

    /// Load configuration from an explicit path, falling back to defaults on errors.
    pub fn load_from_path(path: &Path) -> Self {
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<DelveConfig>(&contents) {
                Ok(cfg) => cfg,
                Err(err) => {
                    warn!("Failed to parse {}: {err}. Using defaults", path.display());
                    DelveConfig::default()
                }
            },
            Err(err) => {
                if err.kind() == std::io::ErrorKind::NotFound {
                    warn!("Delve config not found at {}. Using defaults", path.display());
                } else {
                    warn!("Failed to read {}: {err}. Using defaults", path.display());
                }
                DelveConfig::default()
            }
        }
    }

    /// Load and validate configuration, returning errors to the caller.
    pub fn try_load_from_path(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let cfg: DelveConfig = toml::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        cfg.validate()
            .with_context(|| format!("Invalid configuration in {}", path.display()))?;
        Ok(cfg)
    }

    /// Save configuration to an explicit path.
    pub fn save_to_path(&self, path: &Path) -> Result<()> {
        let toml = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, toml)?;
        Ok(())
    }

    /// Check every table and parameter without generating anything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.worldgen.validate()?;
        self.balance.validate()?;
        if let Some(content) = &self.content {
            content.validate()?;
        }
        if let Some(regions) = &self.regions {
            delve_world::validate_regions(regions)?;
        }
        Ok(())
    }

    pub fn session_params(&self) -> SessionParams {
        SessionParams {
            worldgen: self.worldgen.clone(),
            balance: self.balance,
            portals: self.portals,
            gate: self.gate,
        }
    }

    pub fn catalog(&self) -> Arc<ContentCatalog> {
        Arc::new(self.content.clone().unwrap_or_else(ContentCatalog::wasteland))
    }

    pub fn region_table(&self) -> Vec<Region> {
        self.regions.clone().unwrap_or_else(wasteland_regions)
    }

    /// Generate a fresh world from this configuration.
    pub fn generate_session(
        &self,
        sampler: &dyn TerrainSampler,
        clock: Arc<dyn MonotonicClock>,
    ) -> Result<WorldSession, ConfigError> {
        WorldSession::generate(
            self.catalog(),
            self.region_table(),
            self.session_params(),
            sampler,
            clock,
        )
    }

    /// Restore a world from a snapshot file written by [`WorldSession::save_to_path`].
    pub fn load_session(
        &self,
        snapshot_path: &Path,
        clock: Arc<dyn MonotonicClock>,
    ) -> Result<WorldSession> {
        WorldSession::load_from_path(
            snapshot_path,
            self.catalog(),
            self.region_table(),
            self.session_params(),
            clock,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use delve_testkit::{temp_path, FlatTerrain};
    use delve_world::{ManualClock, RegionBounds, ThemeTags};

    #[test]
    fn partial_toml_keeps_other_defaults() {
        let cfg: DelveConfig = toml::from_str(
            r#"
            [worldgen]
            world_seed = 1234

            [gate]
            threshold = 5
            "#,
        )
        .unwrap();

        assert_eq!(cfg.worldgen.world_seed, 1234);
        assert_eq!(cfg.worldgen.min_spacing, 500.0);
        assert_eq!(cfg.gate.threshold, 5);
        assert_eq!(cfg.portals.cooldown_ms, 1000);
        assert_eq!(cfg.balance, BalanceParams::default());
        assert!(cfg.content.is_none());
    }

    #[test]
    fn save_and_reload_roundtrip() {
        let path = temp_path("config", "toml");
        let mut cfg = DelveConfig::default();
        cfg.worldgen.world_seed = 99;
        cfg.portals.cooldown_ms = 250;
        cfg.regions = Some(vec![Region::new(
            "Marsh",
            RegionBounds::new(0, 4000, 0, 4000),
            ThemeTags::SWAMP | ThemeTags::FOREST,
        )]);

        cfg.save_to_path(&path).unwrap();
        let loaded = DelveConfig::try_load_from_path(&path).unwrap();
        assert_eq!(loaded, cfg);

        fs::remove_file(&path).ok();
    }

    #[test]
    fn broken_file_falls_back_to_defaults() {
        let path = temp_path("config-broken", "toml");
        fs::write(&path, "worldgen = [not toml").unwrap();

        assert_eq!(DelveConfig::load_from_path(&path), DelveConfig::default());
        assert!(DelveConfig::try_load_from_path(&path).is_err());

        fs::remove_file(&path).ok();
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let path = temp_path("config-missing", "toml");
        assert_eq!(DelveConfig::load_from_path(&path), DelveConfig::default());
    }

    #[test]
    fn invalid_values_are_rejected_by_strict_load() {
        let path = temp_path("config-invalid", "toml");
        fs::write(&path, "[worldgen]\nmin_spacing = -5.0\n").unwrap();

        let err = DelveConfig::try_load_from_path(&path).unwrap_err();
        assert!(format!("{err:#}").contains("Invalid configuration"));

        fs::remove_file(&path).ok();
    }

    #[test]
    fn default_config_generates_a_world() {
        let mut cfg = DelveConfig::default();
        cfg.worldgen.world_seed = 7;
        let certain = delve_world::ApexChance {
            common: 1.0,
            uncommon: 1.0,
            rare: 1.0,
            very_rare: 1.0,
        };
        cfg.balance.apex_chance = certain;
        let session = cfg
            .generate_session(&FlatTerrain::default(), Arc::new(ManualClock::new(0)))
            .unwrap();

        let report = session.generation_report().unwrap();
        assert_eq!(report.regions.len(), cfg.region_table().len());
        assert_eq!(session.registry().len(), report.total);
        assert_eq!(session.registry().apex_count(), report.total);
    }
}
