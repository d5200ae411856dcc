//! A running world: every registry and tracker for one save, owned together.
//!
//! Nothing here is process-global. Hosts and tests can keep as many sessions
//! side by side as they like.

use crate::catalog::ContentCatalog;
use crate::clock::MonotonicClock;
use crate::error::{ConfigError, PortalError, SnapshotError};
use crate::gate::{GateDecision, RewardGate, RewardInventory};
use crate::ledger::RewardLedger;
use crate::params::{BalanceParams, GateParams, PortalParams, WorldGenParams};
use crate::persist;
use crate::portal::{Outcome, PortalContext, PortalGraph, PortalMarker, VaultResolver};
use crate::progression::PlayerProgressionTracker;
use crate::region::{region_at, validate_regions, Region};
use crate::registry::DungeonRegistry;
use crate::snapshot::{
    ConfigRef, DungeonRecord, PlayerRecord, RewardLedgerRecord, StateSnapshot,
    SNAPSHOT_SCHEMA_VERSION,
};
use crate::worldgen::{generate_world, WorldGenReport};
use delve_core::{BlockPos, PlayerId, TerrainSampler};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// All tunables a session needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionParams {
    pub worldgen: WorldGenParams,
    pub balance: BalanceParams,
    pub portals: PortalParams,
    pub gate: GateParams,
}

pub struct WorldSession {
    catalog: Arc<ContentCatalog>,
    regions: Vec<Region>,
    params: SessionParams,
    registry: DungeonRegistry,
    portals: PortalGraph,
    tracker: PlayerProgressionTracker,
    ledger: RewardLedger,
    gate: RewardGate,
    clock: Arc<dyn MonotonicClock>,
    report: Option<WorldGenReport>,
}

impl WorldSession {
    /// Generate a fresh world.
    pub fn generate(
        catalog: Arc<ContentCatalog>,
        regions: Vec<Region>,
        params: SessionParams,
        sampler: &dyn TerrainSampler,
        clock: Arc<dyn MonotonicClock>,
    ) -> Result<Self, ConfigError> {
        let gate = RewardGate::new(params.gate);
        let world = generate_world(
            catalog.clone(),
            &regions,
            &params.worldgen,
            &params.balance,
            &gate,
            sampler,
        )?;
        Ok(Self {
            portals: PortalGraph::new(params.portals.cooldown_ms),
            catalog,
            regions,
            params,
            registry: world.registry,
            tracker: PlayerProgressionTracker::new(),
            ledger: RewardLedger::new(),
            gate,
            clock,
            report: Some(world.report),
        })
    }

    pub fn catalog(&self) -> &ContentCatalog {
        &self.catalog
    }

    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    pub fn params(&self) -> &SessionParams {
        &self.params
    }

    pub fn registry(&self) -> &DungeonRegistry {
        &self.registry
    }

    pub fn portals(&self) -> &PortalGraph {
        &self.portals
    }

    pub fn tracker(&self) -> &PlayerProgressionTracker {
        &self.tracker
    }

    pub fn ledger(&self) -> &RewardLedger {
        &self.ledger
    }

    pub fn gate(&self) -> &RewardGate {
        &self.gate
    }

    /// Generation summary; `None` for sessions restored from a snapshot.
    pub fn generation_report(&self) -> Option<&WorldGenReport> {
        self.report.as_ref()
    }

    pub fn region_at(&self, x: i32, z: i32) -> Option<&Region> {
        region_at(&self.regions, x, z)
    }

    /// Called by the structure builder once a portal physically exists.
    pub fn register_marker(&self, marker: PortalMarker) -> Result<(), PortalError> {
        self.portals.register_marker(marker, &self.registry)
    }

    /// Register an entrance marker for every generated instance.
    pub fn register_entrances(&self) -> Result<(), PortalError> {
        for inst in self.registry.iter_sorted() {
            self.register_marker(PortalMarker::entrance(inst.entrance(), inst.id()))?;
        }
        Ok(())
    }

    pub fn can_enter_gate(&self, player: PlayerId) -> GateDecision {
        self.gate.can_enter(player, &self.ledger)
    }

    /// Activate a portal, counting rewards from the session's own ledger.
    pub fn activate(&self, position: BlockPos, player: PlayerId) -> Outcome {
        self.activate_with_inventory(position, player, &self.ledger)
    }

    /// Activate a portal, asking the gate to count rewards from `inventory`.
    ///
    /// Rewards won on the way are always recorded in the session ledger.
    pub fn activate_with_inventory(
        &self,
        position: BlockPos,
        player: PlayerId,
        inventory: &dyn RewardInventory,
    ) -> Outcome {
        let ctx = PortalContext {
            registry: &self.registry,
            tracker: &self.tracker,
            gate: &self.gate,
            inventory,
            clock: self.clock.as_ref(),
        };
        let outcome = self.portals.activate(position, player, ctx);
        if let Outcome::Descended {
            claim: Some(claim), ..
        } = &outcome
        {
            self.ledger.add(player, claim.reward.clone());
            info!(%player, reward = %claim.reward, dungeon = %claim.instance, "Reward claimed");
        }
        outcome
    }

    /// Activate a portal and hand any destination to `resolver`.
    pub fn activate_and_resolve<V: VaultResolver>(
        &self,
        position: BlockPos,
        player: PlayerId,
        resolver: &V,
    ) -> (Outcome, Option<V::Room>) {
        let outcome = self.activate(position, player);
        let room = outcome.destination().map(|dest| resolver.resolve(dest));
        (outcome, room)
    }

    /// Capture every record needed to rebuild this session.
    pub fn export_state(&self) -> StateSnapshot {
        StateSnapshot {
            schema_version: SNAPSHOT_SCHEMA_VERSION,
            config: ConfigRef {
                world_seed: self.params.worldgen.world_seed,
                regions: self.regions.iter().map(|r| r.name.clone()).collect(),
                dungeon_types: self
                    .catalog
                    .dungeon_types
                    .iter()
                    .map(|def| def.key.clone())
                    .collect(),
                rewards: self
                    .catalog
                    .rewards
                    .iter()
                    .map(|reward| reward.key.clone())
                    .collect(),
            },
            dungeons: self
                .registry
                .iter_sorted()
                .into_iter()
                .map(DungeonRecord::from)
                .collect(),
            markers: self.portals.markers(),
            players: self
                .tracker
                .snapshot()
                .iter()
                .map(|(player, state)| PlayerRecord::new(*player, state))
                .collect(),
            rewards: self
                .ledger
                .snapshot()
                .into_iter()
                .filter(|(_, rewards)| !rewards.is_empty())
                .map(|(player, rewards)| RewardLedgerRecord {
                    player,
                    rewards: rewards.into_iter().collect(),
                })
                .collect(),
        }
    }

    /// Rebuild a session from a snapshot, validating every record.
    ///
    /// Cooldown stamps are kept as written and compared against `clock`.
    /// They only mean something if `clock` continues the timeline the
    /// snapshot was taken on; a [`SystemClock`](crate::SystemClock) restarts
    /// at zero in every process, so call [`WorldSession::clear_cooldowns`]
    /// after importing under a fresh one.
    pub fn import_state(
        snapshot: StateSnapshot,
        catalog: Arc<ContentCatalog>,
        regions: Vec<Region>,
        mut params: SessionParams,
        clock: Arc<dyn MonotonicClock>,
    ) -> Result<Self, SnapshotError> {
        snapshot.check_version()?;
        catalog.validate()?;
        validate_regions(&regions)?;

        let config = &snapshot.config;
        if config.world_seed != params.worldgen.world_seed {
            warn!(
                snapshot_seed = config.world_seed,
                configured_seed = params.worldgen.world_seed,
                "Snapshot was taken under a different world seed; keeping the snapshot's"
            );
            params.worldgen.world_seed = config.world_seed;
        }
        let names: Vec<&str> = regions.iter().map(|r| r.name.as_str()).collect();
        if !config.regions.is_empty() && config.regions != names {
            warn!("Snapshot region table differs from the configured regions");
        }

        let mut registry = DungeonRegistry::new();
        for record in &snapshot.dungeons {
            if catalog.dungeon_type(&record.kind).is_none() {
                return Err(SnapshotError::UnknownDungeonType(record.kind.clone()));
            }
            if let Some(reward) = &record.reward {
                if catalog.reward(reward).is_none() {
                    return Err(SnapshotError::UnknownReward(reward.clone()));
                }
            }
            let instance = record
                .to_instance()
                .map_err(|source| SnapshotError::Instance {
                    id: record.id,
                    source,
                })?;
            registry.register(instance)?;
        }

        let portals = PortalGraph::new(params.portals.cooldown_ms);
        for marker in snapshot.markers {
            portals.register_marker(marker, &registry)?;
        }

        let mut seen = HashSet::new();
        let mut players = Vec::with_capacity(snapshot.players.len());
        for record in &snapshot.players {
            if !seen.insert(record.player) {
                return Err(SnapshotError::DuplicatePlayer(record.player));
            }
            if let Some(dungeon) = record.instance {
                if !registry.contains(dungeon) {
                    return Err(SnapshotError::UnknownPlayerDungeon {
                        player: record.player,
                        dungeon,
                    });
                }
            }
            players.push((record.player, record.state()));
        }
        let tracker = PlayerProgressionTracker::new();
        tracker.restore(players);

        let mut seen = HashSet::new();
        let mut ledgers = Vec::with_capacity(snapshot.rewards.len());
        for record in snapshot.rewards {
            if !seen.insert(record.player) {
                return Err(SnapshotError::DuplicatePlayer(record.player));
            }
            if let Some(unknown) = record.rewards.iter().find(|r| catalog.reward(r).is_none()) {
                return Err(SnapshotError::UnknownReward(unknown.clone()));
            }
            ledgers.push((record.player, record.rewards.into_iter().collect::<BTreeSet<_>>()));
        }
        let ledger = RewardLedger::new();
        ledger.restore(ledgers);

        info!(
            dungeons = registry.len(),
            markers = portals.len(),
            players = tracker.player_count(),
            "Imported world state"
        );

        Ok(Self {
            gate: RewardGate::new(params.gate),
            catalog,
            regions,
            params,
            registry,
            portals,
            tracker,
            ledger,
            clock,
            report: None,
        })
    }

    /// Drop every player's cooldown stamp, keeping depth and instance.
    pub fn clear_cooldowns(&self) {
        self.tracker.clear_cooldowns();
        debug!(players = self.tracker.player_count(), "Cleared portal cooldowns");
    }

    /// Write the current state to a snapshot file.
    pub fn save_to_path(&self, path: impl AsRef<Path>) -> anyhow::Result<()> {
        persist::save_snapshot(path, &self.export_state())
    }

    /// Restore a session from a snapshot file.
    pub fn load_from_path(
        path: impl AsRef<Path>,
        catalog: Arc<ContentCatalog>,
        regions: Vec<Region>,
        params: SessionParams,
        clock: Arc<dyn MonotonicClock>,
    ) -> anyhow::Result<Self> {
        let snapshot = persist::load_snapshot(path)?;
        Ok(Self::import_state(snapshot, catalog, regions, params, clock)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::portal::{Destination, PortalKind};
    use crate::region::RegionBounds;
    use crate::theme::ThemeTags;
    use delve_core::{DungeonId, TerrainSample};

    fn session() -> WorldSession {
        let mut params = SessionParams::default();
        params.worldgen.world_seed = 42;
        params.worldgen.min_spacing = 100.0;
        params.worldgen.dungeons_per_region = crate::params::CountRange { min: 20, max: 20 };
        params.balance.apex_chance.common = 0.5;
        params.balance.apex_chance.uncommon = 0.5;
        params.balance.apex_chance.rare = 0.5;
        params.balance.apex_chance.very_rare = 0.5;
        let regions = vec![Region::new(
            "Plains",
            RegionBounds::new(0, 3000, 0, 3000),
            ThemeTags::FOREST,
        )];
        WorldSession::generate(
            Arc::new(ContentCatalog::wasteland()),
            regions,
            params,
            &|_x: i32, _z: i32| TerrainSample::suitable(64),
            Arc::new(ManualClock::new(0)),
        )
        .unwrap()
    }

    #[test]
    fn generated_session_has_entrances() {
        let session = session();
        assert_eq!(session.registry().len(), 20);
        session.register_entrances().unwrap();
        assert_eq!(session.portals().len(), 20);
        assert!(session.generation_report().is_some());
        assert_eq!(session.region_at(10, 10).unwrap().name, "Plains");
    }

    struct Echo;

    impl VaultResolver for Echo {
        type Room = String;

        fn resolve(&self, destination: &Destination) -> String {
            format!("room@{}", destination.depth())
        }
    }

    #[test]
    fn resolver_sees_destinations() {
        let session = session();
        session.register_entrances().unwrap();
        let first = session.registry().iter_sorted()[0].entrance();
        let (outcome, room) = session.activate_and_resolve(first, PlayerId(1), &Echo);
        assert!(matches!(outcome, Outcome::Entered { depth: 1, .. }));
        assert_eq!(room.as_deref(), Some("room@1"));

        let (outcome, room) =
            session.activate_and_resolve(BlockPos::new(-1, -1, -1), PlayerId(1), &Echo);
        assert_eq!(outcome, Outcome::NoPortalHere);
        assert!(room.is_none());
    }

    #[test]
    fn cleared_cooldowns_let_a_fresh_clock_proceed() {
        let session = session();
        session.register_entrances().unwrap();
        let first = session.registry().iter_sorted()[0].entrance();
        let player = PlayerId(3);
        session.tracker().with_player(player, |state| {
            state.depth = 0;
            state.last_portal_use_ms = Some(400);
        });

        let clock = Arc::new(ManualClock::new(500));
        let restored = WorldSession::import_state(
            session.export_state(),
            Arc::new(ContentCatalog::wasteland()),
            session.regions().to_vec(),
            session.params().clone(),
            clock,
        )
        .unwrap();
        assert!(matches!(
            restored.activate(first, player),
            Outcome::OnCooldown { .. }
        ));

        restored.clear_cooldowns();
        assert!(matches!(
            restored.activate(first, player),
            Outcome::Entered { depth: 1, .. }
        ));
    }

    #[test]
    fn import_rejects_inconsistent_snapshots() {
        let session = session();
        session.register_entrances().unwrap();
        let params = session.params().clone();
        let catalog = Arc::new(ContentCatalog::wasteland());
        let regions = session.regions().to_vec();
        let clock: Arc<dyn MonotonicClock> = Arc::new(ManualClock::new(0));

        let mut snap = session.export_state();
        snap.players.push(PlayerRecord {
            player: PlayerId(5),
            depth: 2,
            instance: Some(DungeonId(12345)),
            in_apex_area: false,
            last_portal_use_ms: None,
        });
        assert!(matches!(
            WorldSession::import_state(snap, catalog.clone(), regions.clone(), params.clone(), clock.clone()),
            Err(SnapshotError::UnknownPlayerDungeon { .. })
        ));

        let mut snap = session.export_state();
        snap.markers.push(snap.markers[0].clone());
        assert!(matches!(
            WorldSession::import_state(snap, catalog.clone(), regions.clone(), params.clone(), clock.clone()),
            Err(SnapshotError::Portal(PortalError::DuplicateMarker(_)))
        ));

        let mut snap = session.export_state();
        snap.markers[0].kind = PortalKind::Exit;
        assert!(matches!(
            WorldSession::import_state(snap, catalog.clone(), regions.clone(), params.clone(), clock.clone()),
            Err(SnapshotError::Portal(PortalError::BindingOnNonEntrance { .. }))
        ));

        let mut snap = session.export_state();
        snap.schema_version = 7;
        assert!(matches!(
            WorldSession::import_state(snap, catalog, regions, params, clock),
            Err(SnapshotError::UnsupportedVersion { found: 7, .. })
        ));
    }
}
