//! End-to-end tests of the event loop thread against an in-memory backend.

use std::sync::mpsc::Receiver;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use propviz_app::backend::Backend;
use propviz_app::state::AppState;
use propviz_core::commands::ClientCommand;
use propviz_core::enums::{CoordinateMode, EntityKind, NoticeLevel, StopReason};
use propviz_core::error::BackendError;
use propviz_core::events::{ClientEvent, Notice};
use propviz_core::results::{
    InterferenceItem, InterferenceKind, InterferenceResult, LosProfile, StatsOverview,
};
use propviz_core::state::ClientSnapshot;
use propviz_core::types::{Entity, GeoPoint, HeatPoint, Position, Scene, SceneBounds, Viewport};
use propviz_sim::{EngineConfig, HeatmapQuery, InterferenceQuery, ProfileQuery};

const TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Default)]
struct Shared {
    scene: Scene,
    moves: Vec<(String, Position)>,
    fail_scene: bool,
}

/// Backend double. Clones share state so a test can inspect what the
/// network worker did.
#[derive(Clone, Default)]
struct MemoryBackend {
    shared: Arc<Mutex<Shared>>,
}

impl MemoryBackend {
    fn with_scene(scene: Scene) -> Self {
        let backend = Self::default();
        backend.shared.lock().unwrap().scene = scene;
        backend
    }

    fn moves(&self) -> Vec<(String, Position)> {
        self.shared.lock().unwrap().moves.clone()
    }
}

impl Backend for MemoryBackend {
    fn fetch_scene(&self) -> Result<Scene, BackendError> {
        let shared = self.shared.lock().unwrap();
        if shared.fail_scene {
            return Err(BackendError::Status {
                path: "/scene".into(),
                status: 503,
                body: "unavailable".into(),
            });
        }
        Ok(shared.scene.clone())
    }

    fn fetch_stats(&self) -> Result<StatsOverview, BackendError> {
        let shared = self.shared.lock().unwrap();
        Ok(StatsOverview {
            count: shared
                .scene
                .of_kind(EntityKind::Transmitter)
                .count() as u32,
            ..Default::default()
        })
    }

    fn commit_move(&self, id: &str, position: Position) -> Result<(), BackendError> {
        let mut shared = self.shared.lock().unwrap();
        let entity = shared
            .scene
            .find_mut(id)
            .ok_or_else(|| BackendError::Status {
                path: "/entity/move".into(),
                status: 404,
                body: "Entity not found".into(),
            })?;
        entity.position = position;
        shared.moves.push((id.to_string(), position));
        Ok(())
    }

    fn fetch_heatmap(&self, query: &HeatmapQuery) -> Result<Vec<HeatPoint>, BackendError> {
        let c = query.center;
        Ok(vec![
            HeatPoint::new(Position::Geo(c), -60.0),
            HeatPoint::new(Position::geo(c.lat + 0.002, c.lon), -85.0),
            HeatPoint::new(Position::geo(c.lat, c.lon + 0.002), -110.0),
        ])
    }

    fn fetch_profile(&self, _query: &ProfileQuery) -> Result<LosProfile, BackendError> {
        Ok(LosProfile {
            distance_m: 5200.0,
            has_los: true,
            ..Default::default()
        })
    }

    /// One carrier per transmitter plus a third-order product of the first two.
    fn fetch_interference(
        &self,
        query: &InterferenceQuery,
    ) -> Result<InterferenceResult, BackendError> {
        let level = |f_mhz: f64, kind, ids: Vec<String>| InterferenceItem {
            kind,
            f_mhz,
            contributor_ids: ids,
            raw_level_dbm: -70.0,
            after_filter_dbm: -90.0,
            offset_khz: (f_mhz - query.f_rx_mhz) * 1000.0,
        };
        let mut items: Vec<_> = query
            .transmitters
            .iter()
            .map(|t| {
                level(
                    t.frequency_mhz.unwrap_or_default(),
                    InterferenceKind::Carrier,
                    vec![t.id.clone()],
                )
            })
            .collect();
        if let [a, b, ..] = query.transmitters.as_slice() {
            let f = 2.0 * a.frequency_mhz.unwrap_or_default() - b.frequency_mhz.unwrap_or_default();
            items.push(level(f, InterferenceKind::Im3, vec![a.id.clone(), b.id.clone()]));
        }
        Ok(InterferenceResult {
            fspl_tx_rx: vec![90.0; query.transmitters.len()],
            rx_power_sum_dbm: -68.0,
            items,
        })
    }
}

fn grid_scene() -> Scene {
    let mut scene = Scene::new(SceneBounds::new(100.0, 60.0));
    scene.entities = vec![
        Entity::new("FM_1", EntityKind::Transmitter, Position::grid(30.0, 15.0)).with_radio(100.0, 70.0),
        Entity::new("AVION1", EntityKind::Aircraft, Position::grid(50.0, 30.0)),
    ];
    scene
}

fn map_scene() -> Scene {
    let mut scene = Scene::default();
    scene.entities = vec![
        Entity::new("fm2", EntityKind::Transmitter, Position::geo(10.4236, -75.5253)).with_radio(101.3, 68.0),
        Entity::new("av1", EntityKind::Aircraft, Position::geo(10.455, -75.51)),
    ];
    scene
}

/// Read snapshots until one has an event matching `pred`.
fn wait_for(
    snapshots: &Receiver<ClientSnapshot>,
    mut pred: impl FnMut(&ClientEvent) -> bool,
) -> (ClientSnapshot, Vec<Notice>) {
    let deadline = Instant::now() + TIMEOUT;
    let mut notices = Vec::new();
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        let snapshot = snapshots
            .recv_timeout(remaining)
            .expect("timed out waiting for event");
        notices.extend(snapshot.notices.iter().cloned());
        if snapshot.events.iter().any(&mut pred) {
            return (snapshot, notices);
        }
    }
}

fn load(state: &AppState, snapshots: &Receiver<ClientSnapshot>) -> ClientSnapshot {
    state.send(ClientCommand::Refresh).unwrap();
    wait_for(snapshots, |e| matches!(e, ClientEvent::SceneLoaded { .. })).0
}

#[test]
fn test_drag_commit_reaches_backend() {
    let backend = MemoryBackend::with_scene(grid_scene());
    let state = AppState::new();
    let snapshots = state
        .start(
            EngineConfig {
                viewport: Viewport::new(1040.0, 640.0),
                ..Default::default()
            },
            backend.clone(),
        )
        .unwrap();
    load(&state, &snapshots);

    state
        .send_all([
            ClientCommand::PointerDown {
                entity_id: "FM_1".into(),
                pointer_id: 7,
                client_x: 300.0,
                client_y: 450.0,
            },
            ClientCommand::PointerMove {
                pointer_id: 7,
                client_x: 350.0,
                client_y: 400.0,
            },
            ClientCommand::PointerUp {
                pointer_id: 7,
                client_x: 350.0,
                client_y: 400.0,
            },
        ])
        .unwrap();
    wait_for(&snapshots, |e| matches!(e, ClientEvent::MoveCommitted { .. }));

    // 10 px per km: +5 km East, +5 km North
    assert_eq!(
        backend.moves(),
        vec![("FM_1".to_string(), Position::grid(35.0, 20.0))]
    );
    let (snapshot, _) = wait_for(&snapshots, |e| matches!(e, ClientEvent::StatsRefreshed));
    assert_eq!(snapshot.stats.unwrap().count, 1);

    state.stop().unwrap();
    assert!(!state.is_running());
}

#[test]
fn test_backend_failure_becomes_notice() {
    let backend = MemoryBackend::with_scene(grid_scene());
    backend.shared.lock().unwrap().fail_scene = true;
    let state = AppState::new();
    let snapshots = state.start(EngineConfig::default(), backend).unwrap();

    state.send(ClientCommand::Refresh).unwrap();
    let (snapshot, notices) = wait_for(&snapshots, |e| matches!(e, ClientEvent::StatsRefreshed));
    assert!(snapshot.scene.is_none());
    let error = notices
        .iter()
        .find(|n| n.level == NoticeLevel::Error)
        .expect("scene failure reported");
    assert!(error.message.contains("HTTP 503"));
}

#[test]
fn test_playback_runs_on_event_loop() {
    let backend = MemoryBackend::with_scene(map_scene());
    let state = AppState::new();
    let snapshots = state
        .start(
            EngineConfig {
                mode: CoordinateMode::Map,
                playback_period: Duration::from_millis(20),
                ..Default::default()
            },
            backend,
        )
        .unwrap();
    load(&state, &snapshots);

    let route: Vec<GeoPoint> = (0..6)
        .map(|i| GeoPoint::new(10.40 + i as f64 * 0.005, -75.52))
        .collect();
    state
        .send_all([
            ClientCommand::LoadRoute {
                points: route.clone(),
            },
            ClientCommand::StartPlayback {
                speed: 1.0,
                snap: false,
            },
        ])
        .unwrap();

    let mut moved = Vec::new();
    let (snapshot, _) = wait_for(&snapshots, |e| match e {
        ClientEvent::EntityMoved { id, position } => {
            moved.push((id.clone(), *position));
            false
        }
        ClientEvent::PlaybackStopped { .. } => true,
        _ => false,
    });
    assert!(snapshot.events.contains(&ClientEvent::PlaybackStopped {
        index: 4,
        reason: StopReason::RouteEnd
    }));
    let positions: Vec<Position> = moved.iter().map(|(_, p)| *p).collect();
    let expected: Vec<Position> = route[1..=4].iter().map(|g| Position::Geo(*g)).collect();
    assert_eq!(positions, expected);
    assert!(moved.iter().all(|(id, _)| id == "av1"));
}

#[test]
fn test_heatmap_and_profile_round_trip() {
    let backend = MemoryBackend::with_scene(map_scene());
    let state = AppState::new();
    let snapshots = state
        .start(
            EngineConfig {
                mode: CoordinateMode::Map,
                viewport: Viewport::new(640.0, 480.0),
                ..Default::default()
            },
            backend,
        )
        .unwrap();
    load(&state, &snapshots);

    state
        .send(ClientCommand::RequestHeatmap {
            center: GeoPoint::new(10.4236, -75.5253),
            radius_km: 3.0,
            step_m: 200,
            f_rx_mhz: 118.1,
            window_khz: 150.0,
        })
        .unwrap();
    let (snapshot, _) = wait_for(&snapshots, |e| matches!(e, ClientEvent::HeatmapDrawn { .. }));
    assert_eq!(snapshot.heatmap.cached_samples, 3);
    assert!(snapshot.heatmap.painted_pixels > 0);

    state
        .send(ClientCommand::RequestProfile {
            tx_id: "fm2".into(),
            rx_id: "av1".into(),
            frequency_mhz: 118.1,
            k_factor: 1.33,
        })
        .unwrap();
    let (snapshot, _) = wait_for(&snapshots, |e| matches!(e, ClientEvent::ProfileReady));
    assert_eq!(snapshot.profile.unwrap().distance_m, 5200.0);

    let polled = state.snapshot().unwrap().expect("latest snapshot stored");
    assert!(polled.scene.is_some());
}

#[test]
fn test_start_twice_rejected() {
    let state = AppState::new();
    let _snapshots = state
        .start(EngineConfig::default(), MemoryBackend::default())
        .unwrap();
    assert!(state.is_running());
    assert!(state
        .start(EngineConfig::default(), MemoryBackend::default())
        .is_err());
}

#[test]
fn test_interference_tables_reach_snapshot() {
    let mut scene = map_scene();
    scene.entities.push(
        Entity::new("fm3", EntityKind::Transmitter, Position::geo(10.43, -75.54)).with_radio(104.5, 65.0),
    );
    let backend = MemoryBackend::with_scene(scene);
    let state = AppState::new();
    let snapshots = state
        .start(
            EngineConfig {
                mode: CoordinateMode::Map,
                ..Default::default()
            },
            backend,
        )
        .unwrap();
    load(&state, &snapshots);

    state
        .send(ClientCommand::RequestInterference {
            receiver_id: "av1".into(),
            f_rx_mhz: 98.1,
            window_khz: 500.0,
            max_order: 3,
        })
        .unwrap();
    let (snapshot, _) = wait_for(&snapshots, |e| {
        matches!(e, ClientEvent::InterferenceReady { items: 3, .. })
    });
    let tables = snapshot.interference.unwrap();
    assert_eq!(tables.receiver_id, "av1");
    assert_eq!(tables.carriers.len(), 2);
    assert_eq!(tables.im3.len(), 1);
    // 2 * 101.3 - 104.5
    assert!((tables.im3[0].f_mhz - 98.1).abs() < 1e-9);
    assert_eq!(tables.im3[0].contributor_ids, ["fm2", "fm3"]);
}
