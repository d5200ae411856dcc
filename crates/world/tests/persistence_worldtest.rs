//! Snapshot persistence worldtest.
//!
//! Saves a session mid-progression, restores it through the snapshot file and
//! checks nothing moved: dungeons, collected rewards, markers, player depth,
//! cooldown stamps and reward ledgers. Also covers schema v1 files and
//! corrupted files.

use delve_core::{BlockPos, DungeonId, PlayerId};
use delve_testkit::{
    assert_json_eq, init_test_tracing, temp_path, FlatTerrain, MetricsReportBuilder, MetricsSink,
    PersistenceMetrics, TestExecutionMetrics, TestResult,
};
use delve_world::persist::{encode_snapshot_v1, load_snapshot, save_snapshot};
use delve_world::{
    ApexChance, ContentCatalog, CountRange, ManualClock, MonotonicClock, Outcome, PlayerRecordV1,
    PortalKind, PortalMarker, Region, RegionBounds, SessionParams, SnapshotV1, StateSnapshot,
    ThemeTags, WorldSession,
};
use proptest::prelude::*;
use std::fs;
use std::sync::Arc;
use std::time::Instant;

const DESCEND: BlockPos = BlockPos::new(0, -64, 0);

fn params() -> SessionParams {
    let mut params = SessionParams::default();
    params.worldgen.world_seed = 2024;
    params.worldgen.min_spacing = 150.0;
    params.worldgen.dungeons_per_region = CountRange { min: 8, max: 8 };
    params.balance.apex_chance = ApexChance {
        common: 1.0,
        uncommon: 1.0,
        rare: 1.0,
        very_rare: 1.0,
    };
    params
}

fn regions() -> Vec<Region> {
    vec![Region::new(
        "Highlands",
        RegionBounds::new(-2000, 2000, -2000, 2000),
        ThemeTags::MOUNTAIN | ThemeTags::FOREST,
    )]
}

fn catalog() -> Arc<ContentCatalog> {
    Arc::new(ContentCatalog::wasteland())
}

fn generated() -> (WorldSession, Arc<ManualClock>) {
    let clock = Arc::new(ManualClock::new(0));
    let session = WorldSession::generate(
        catalog(),
        regions(),
        params(),
        &FlatTerrain::default(),
        clock.clone(),
    )
    .expect("session generates");
    session.register_entrances().unwrap();
    session
        .register_marker(PortalMarker::new(DESCEND, PortalKind::Descend))
        .unwrap();
    (session, clock)
}

/// Walk `player` to the bottom of the first apex dungeon, claiming its reward.
fn claim_first_reward(session: &WorldSession, clock: &ManualClock, player: PlayerId) -> DungeonId {
    let (id, entrance, levels) = {
        let apex = session.registry().list_apex_with_uncollected_reward();
        let first = apex.first().expect("apex dungeon");
        (first.id(), first.entrance(), first.level_count())
    };
    clock.advance(1_001);
    assert!(matches!(
        session.activate(entrance, player),
        Outcome::Entered { .. }
    ));
    for _ in 1..levels {
        clock.advance(1_001);
        session.activate(DESCEND, player);
    }
    id
}

#[test]
fn session_survives_save_and_load() {
    init_test_tracing();
    let test_start = Instant::now();
    let (session, clock) = generated();
    let explorer = PlayerId(1);
    let visitor = PlayerId(2);

    let claimed = claim_first_reward(&session, &clock, explorer);
    clock.advance(1_001);
    session.activate(session.registry().iter_sorted()[0].entrance(), visitor);

    let before = session.export_state();
    let path = temp_path("session", "dlvs");

    let save_start = Instant::now();
    session.save_to_path(&path).unwrap();
    let save_time = save_start.elapsed();
    let bytes_written = fs::metadata(&path).unwrap().len();

    let load_start = Instant::now();
    let restored = WorldSession::load_from_path(
        &path,
        catalog(),
        regions(),
        params(),
        Arc::new(ManualClock::new(clock.now_ms())),
    )
    .unwrap();
    let load_time = load_start.elapsed();

    assert_json_eq(&before, &restored.export_state()).unwrap();
    assert!(restored
        .registry()
        .get_by_id(claimed)
        .unwrap()
        .reward_collected());
    assert_eq!(restored.ledger().rewards(explorer).len(), 1);
    assert_eq!(
        restored.tracker().state(explorer),
        session.tracker().state(explorer)
    );
    assert_eq!(restored.portals().len(), session.portals().len());

    // The visitor is still inside the cooldown window after the restore.
    assert!(matches!(
        restored.activate(DESCEND, visitor),
        Outcome::OnCooldown { .. }
    ));

    let json_len = before.to_json_pretty().unwrap().len() as f64;
    let report = MetricsReportBuilder::new("session_survives_save_and_load")
        .result(TestResult::Pass)
        .persistence(PersistenceMetrics {
            snapshots_saved: 1,
            snapshots_loaded: 1,
            avg_save_time_us: save_time.as_secs_f64() * 1e6,
            avg_load_time_us: load_time.as_secs_f64() * 1e6,
            bytes_written,
            compression_ratio: json_len / bytes_written as f64,
        })
        .execution(TestExecutionMetrics {
            duration_seconds: test_start.elapsed().as_secs_f64(),
            ..TestExecutionMetrics::default()
        })
        .build();
    let metrics_path = temp_path("persistence-metrics", "json");
    MetricsSink::create(&metrics_path)
        .and_then(|sink| sink.write(&report))
        .unwrap();

    fs::remove_file(&path).ok();
    fs::remove_file(&metrics_path).ok();
}

#[test]
fn v1_snapshot_file_is_migrated_on_load() {
    let (session, clock) = generated();
    let player = PlayerId(5);
    clock.advance(1_001);
    let entrance = session.registry().iter_sorted()[0].entrance();
    session.activate(entrance, player);

    let current = session.export_state();
    let old = SnapshotV1 {
        schema_version: 1,
        world_seed: current.config.world_seed,
        dungeons: current.dungeons.clone(),
        markers: current.markers.clone(),
        players: current
            .players
            .iter()
            .map(|p| PlayerRecordV1 {
                player: p.player,
                depth: p.depth,
                instance: p.instance,
                last_portal_use_ms: p.last_portal_use_ms,
            })
            .collect(),
    };

    let path = temp_path("session-v1", "dlvs");
    fs::write(&path, encode_snapshot_v1(&old).unwrap()).unwrap();

    let migrated = load_snapshot(&path).unwrap();
    assert_eq!(migrated.schema_version, delve_world::SNAPSHOT_SCHEMA_VERSION);
    assert!(migrated.rewards.is_empty());

    let restored = WorldSession::import_state(
        migrated,
        catalog(),
        regions(),
        params(),
        Arc::new(ManualClock::new(clock.now_ms())),
    )
    .unwrap();
    let state = restored.tracker().state(player).unwrap();
    assert_eq!(state.depth, 1);
    assert!(!state.in_apex_area);
    assert_eq!(restored.registry().len(), session.registry().len());

    fs::remove_file(&path).ok();
}

#[test]
fn corrupted_snapshot_file_is_rejected() {
    let (session, _clock) = generated();
    let path = temp_path("session-corrupt", "dlvs");
    save_snapshot(&path, &session.export_state()).unwrap();

    let mut bytes = fs::read(&path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xFF;
    fs::write(&path, &bytes).unwrap();

    let err = WorldSession::load_from_path(
        &path,
        catalog(),
        regions(),
        params(),
        Arc::new(ManualClock::new(0)),
    )
    .err()
    .expect("corruption detected");
    assert!(format!("{err:#}").to_lowercase().contains("crc"), "{err:#}");

    fs::remove_file(&path).ok();
}

#[derive(Debug, Clone)]
struct PlayerSetup {
    depth: u32,
    dungeon: Option<usize>,
    in_apex_area: bool,
    last_use: Option<u64>,
    rewards: Vec<usize>,
}

fn player_setup() -> impl Strategy<Value = PlayerSetup> {
    (
        0u32..40,
        proptest::option::of(0usize..8),
        any::<bool>(),
        proptest::option::of(0u64..1_000_000),
        proptest::collection::vec(0usize..12, 0..5),
    )
        .prop_map(|(depth, dungeon, in_apex_area, last_use, rewards)| PlayerSetup {
            depth,
            dungeon,
            in_apex_area,
            last_use,
            rewards,
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    /// Any mix of player states survives export, JSON and import unchanged.
    #[test]
    fn player_states_roundtrip_through_json(
        setups in proptest::collection::vec(player_setup(), 0..6),
    ) {
        let (session, clock) = generated();
        let ids: Vec<DungeonId> = session.registry().iter_sorted().iter().map(|i| i.id()).collect();
        let rewards: Vec<_> = session.catalog().rewards.iter().map(|r| r.key.clone()).collect();

        for (n, setup) in setups.iter().enumerate() {
            let player = PlayerId(n as u64 + 1);
            session.tracker().with_player(player, |state| {
                state.depth = setup.depth;
                state.instance = setup.dungeon.map(|i| ids[i % ids.len()]);
                state.in_apex_area = setup.in_apex_area;
                state.last_portal_use_ms = setup.last_use;
            });
            for &r in &setup.rewards {
                session.ledger().add(player, rewards[r % rewards.len()].clone());
            }
        }

        let before = session.export_state();
        let json = before.to_json_pretty().unwrap();
        let parsed = StateSnapshot::from_json(&json).unwrap();
        prop_assert_eq!(&parsed, &before);

        let restored = WorldSession::import_state(
            parsed,
            catalog(),
            regions(),
            params(),
            Arc::new(ManualClock::new(clock.now_ms())),
        )
        .unwrap();
        prop_assert_eq!(restored.export_state(), before);
    }
}
