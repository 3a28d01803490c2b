//! Client engine: the interactive core of propviz.
//!
//! `ClientEngine` owns the scene directory, the interaction controllers,
//! the heatmap compositor and the active transform. It processes operator
//! commands, fires playback ticks and produces `ClientSnapshot`s.
//! Completely headless; backend traffic is exchanged as data.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use glam::DVec2;
use tracing::{debug, info, warn};

use propviz_core::commands::ClientCommand;
use propviz_core::constants::{
    DEFAULT_MOVING_ENTITY_ID, FIT_MARGIN_PX, INTERFERENCE_MAX_ORDER_LIMIT, INTERFERENCE_MIN_ORDER,
    MAX_NOTICES, PLAYBACK_PERIOD_MS, PROFILE_SAMPLES,
};
use propviz_core::enums::{ControlHolder, CoordinateMode, NoticeLevel, StopReason};
use propviz_core::error::{BackendError, PreconditionError};
use propviz_core::events::{ClientEvent, Notice};
use propviz_core::results::{InterferenceTables, LosProfile, StatsOverview};
use propviz_core::state::{ClientSnapshot, DragView, HeatmapView};
use propviz_core::types::{GeoPoint, HeatPoint, Position, Route, Scene, SceneBounds, Viewport};
use propviz_geo::{GridTransform, MapTransform, RouteSnapper, SceneTransform, SurfaceTransform};
use propviz_render::{DrawList, DrawOutcome, HeatmapCompositor, HeatmapParams};

use crate::directory::{EntityDirectory, SceneDirectory};
use crate::drag::{DragController, HeadlessSurface, PointerSurface};
use crate::playback::{PlaybackScheduler, TickOutcome};
use crate::requests::{BackendReply, BackendRequest, HeatmapQuery, InterferenceQuery, ProfileQuery};

/// Configuration for a client engine.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub mode: CoordinateMode,
    pub viewport: Viewport,
    /// Initial map view (map mode).
    pub map_center: GeoPoint,
    pub map_zoom: f64,
    pub playback_period: Duration,
    /// Entity animated by playback when present.
    pub moving_entity_id: String,
    /// Restore the pre-drag position when the backend rejects a move.
    pub rollback_on_commit_failure: bool,
    pub heatmap: HeatmapParams,
    pub profile_samples: u32,
    pub show_lines: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            mode: CoordinateMode::Grid,
            viewport: Viewport::new(1024.0, 640.0),
            map_center: GeoPoint::new(10.4236, -75.5253),
            map_zoom: 13.0,
            playback_period: Duration::from_millis(PLAYBACK_PERIOD_MS),
            moving_entity_id: DEFAULT_MOVING_ENTITY_ID.to_string(),
            rollback_on_commit_failure: false,
            heatmap: HeatmapParams::default(),
            profile_samples: PROFILE_SAMPLES,
            show_lines: true,
        }
    }
}

pub struct ClientEngine {
    config: EngineConfig,
    step: u64,
    directory: SceneDirectory,
    drag: DragController,
    playback: PlaybackScheduler,
    snapper: RouteSnapper,
    heatmap: HeatmapCompositor,
    surface: SurfaceTransform,
    pointer_surface: Box<dyn PointerSurface + Send>,
    viewport: Viewport,
    map_center: GeoPoint,
    map_zoom: f64,
    transform: SceneTransform,
    show_lines: bool,
    stats: Option<StatsOverview>,
    profile: Option<LosProfile>,
    interference: Option<InterferenceTables>,

    draw_list: DrawList,
    rendered_revision: Option<u64>,
    render_dirty: bool,

    command_queue: VecDeque<ClientCommand>,
    outbox: Vec<BackendRequest>,
    notices: Vec<Notice>,
    events: Vec<ClientEvent>,
}

impl ClientEngine {
    pub fn new(config: EngineConfig) -> Self {
        let heatmap = HeatmapCompositor::new(config.viewport).with_params(config.heatmap);
        let mut engine = Self {
            step: 0,
            directory: SceneDirectory::new(),
            drag: DragController::new(),
            playback: PlaybackScheduler::new(config.playback_period, config.moving_entity_id.clone()),
            snapper: RouteSnapper::default(),
            heatmap,
            surface: SurfaceTransform::default(),
            pointer_surface: Box::new(HeadlessSurface),
            viewport: config.viewport,
            map_center: config.map_center,
            map_zoom: config.map_zoom,
            transform: SceneTransform::Grid(GridTransform::fit(
                config.viewport,
                SceneBounds::default(),
                FIT_MARGIN_PX,
            )),
            show_lines: config.show_lines,
            stats: None,
            profile: None,
            interference: None,
            draw_list: DrawList::default(),
            rendered_revision: None,
            render_dirty: true,
            command_queue: VecDeque::new(),
            outbox: Vec::new(),
            notices: Vec::new(),
            events: Vec::new(),
            config,
        };
        engine.refit();
        engine
    }

    /// Route pointer capture to a real surface.
    pub fn with_pointer_surface(mut self, surface: Box<dyn PointerSurface + Send>) -> Self {
        self.pointer_surface = surface;
        self
    }

    /// Queue a command for processing at the next step.
    pub fn queue_command(&mut self, command: ClientCommand) {
        self.command_queue.push_back(command);
    }

    pub fn queue_commands(&mut self, commands: impl IntoIterator<Item = ClientCommand>) {
        self.command_queue.extend(commands);
    }

    /// Process queued commands, fire a due playback tick, retry a deferred
    /// heatmap draw, re-render if anything changed, and snapshot.
    pub fn step(&mut self, now: Instant) -> ClientSnapshot {
        self.process_commands(now);
        self.poll_playback(now);

        if self.heatmap.is_deferred() && !self.heatmap.raster().is_empty() {
            self.redraw_heatmap();
        }
        self.render_if_dirty();
        self.step += 1;
        self.snapshot()
    }

    /// Drain the backend requests issued since the last call.
    pub fn take_requests(&mut self) -> Vec<BackendRequest> {
        std::mem::take(&mut self.outbox)
    }

    /// Earliest instant at which `step` has time-driven work to do.
    pub fn next_wakeup(&self) -> Option<Instant> {
        self.playback.next_due()
    }

    /// Apply a backend reply. Failures become notices; state is kept.
    pub fn apply_reply(&mut self, reply: BackendReply) {
        match reply {
            BackendReply::Scene(Ok(scene)) => self.install_scene(scene),
            BackendReply::Stats(Ok(stats)) => {
                self.stats = Some(stats);
                self.events.push(ClientEvent::StatsRefreshed);
            }
            BackendReply::MoveCommitted {
                id,
                previous,
                result,
            } => match result {
                Ok(()) => {
                    debug!(%id, "move committed");
                    self.events.push(ClientEvent::MoveCommitted { id });
                    self.request_stats();
                }
                Err(err) => {
                    warn!(%id, %err, "move commit failed");
                    self.notice(NoticeLevel::Error, format!("could not save position of '{id}': {err}"));
                    if self.config.rollback_on_commit_failure {
                        self.rollback(&id, previous);
                    }
                }
            },
            BackendReply::Heatmap(Ok(points)) => self.draw_heatmap(points),
            BackendReply::Profile(Ok(profile)) => {
                info!("{}", profile.summary());
                self.profile = Some(profile);
                self.events.push(ClientEvent::ProfileReady);
            }
            BackendReply::Interference {
                receiver_id,
                result: Ok(result),
            } => {
                let tables = result.into_tables(receiver_id.clone());
                info!(
                    receiver = %receiver_id,
                    items = tables.total_items,
                    rx_power_dbm = tables.rx_power_sum_dbm,
                    "interference analysed"
                );
                self.events.push(ClientEvent::InterferenceReady {
                    receiver_id,
                    items: tables.total_items,
                });
                self.interference = Some(tables);
            }
            BackendReply::Interference { result: Err(err), .. } => self.backend_failed(err),
            BackendReply::Scene(Err(err))
            | BackendReply::Stats(Err(err))
            | BackendReply::Heatmap(Err(err))
            | BackendReply::Profile(Err(err)) => self.backend_failed(err),
        }
    }

    // --- Accessors ---

    pub fn mode(&self) -> CoordinateMode {
        self.config.mode
    }

    pub fn directory(&self) -> &SceneDirectory {
        &self.directory
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.directory.scene()
    }

    pub fn transform(&self) -> &SceneTransform {
        &self.transform
    }

    pub fn draw_list(&self) -> &DrawList {
        &self.draw_list
    }

    pub fn heatmap(&self) -> &HeatmapCompositor {
        &self.heatmap
    }

    pub fn playback(&self) -> &PlaybackScheduler {
        &self.playback
    }

    pub fn drag(&self) -> &DragController {
        &self.drag
    }

    pub fn stats(&self) -> Option<&StatsOverview> {
        self.stats.as_ref()
    }

    pub fn profile(&self) -> Option<&LosProfile> {
        self.profile.as_ref()
    }

    pub fn interference(&self) -> Option<&InterferenceTables> {
        self.interference.as_ref()
    }

    pub fn step_count(&self) -> u64 {
        self.step
    }

    // --- Commands ---

    fn process_commands(&mut self, now: Instant) {
        while let Some(command) = self.command_queue.pop_front() {
            self.handle_command(command, now);
        }
    }

    fn handle_command(&mut self, command: ClientCommand, now: Instant) {
        match command {
            ClientCommand::PointerDown {
                entity_id,
                pointer_id,
                client_x,
                client_y,
            } => {
                let result = self.drag.begin_drag(
                    &mut self.directory,
                    self.pointer_surface.as_mut(),
                    &self.surface,
                    &entity_id,
                    pointer_id,
                    DVec2::new(client_x, client_y),
                );
                match result {
                    Ok(()) => self.events.push(ClientEvent::DragStarted { id: entity_id }),
                    Err(err) => self.rejected(err),
                }
            }
            ClientCommand::PointerMove {
                pointer_id,
                client_x,
                client_y,
            } => {
                let moved = self.drag.on_move(
                    &mut self.directory,
                    &self.transform,
                    &self.surface,
                    pointer_id,
                    DVec2::new(client_x, client_y),
                );
                match moved {
                    Some(Ok(position)) => {
                        if let Some(id) = self.drag.active_entity() {
                            self.events.push(ClientEvent::EntityMoved {
                                id: id.to_string(),
                                position,
                            });
                        }
                        // Drag feedback is synchronous with the pointer
                        self.render();
                    }
                    Some(Err(err)) => debug!(%err, "drag move refused"),
                    None => {}
                }
            }
            ClientCommand::PointerUp { pointer_id, .. } => {
                if let Some(commit) =
                    self.drag
                        .end_drag(&mut self.directory, self.pointer_surface.as_mut(), pointer_id)
                {
                    self.events.push(ClientEvent::DragEnded {
                        id: commit.id.clone(),
                        position: commit.position,
                    });
                    self.outbox.push(BackendRequest::CommitMove {
                        id: commit.id,
                        position: commit.position,
                        previous: commit.previous,
                    });
                }
            }
            ClientCommand::PointerCancel { pointer_id } => {
                if self.drag.session().is_some_and(|s| s.pointer_id == pointer_id) {
                    self.drag
                        .cancel_drag(&mut self.directory, self.pointer_surface.as_mut());
                }
            }
            ClientCommand::Resize { width, height } => {
                self.viewport = Viewport::new(width, height);
                self.heatmap.resize(self.viewport);
                self.refit();
                self.redraw_heatmap();
            }
            ClientCommand::SetSurfaceTransform { matrix } => {
                self.surface = SurfaceTransform::from_matrix(matrix);
            }
            ClientCommand::SetMapView { center, zoom } => {
                if center.is_finite() && zoom.is_finite() {
                    self.map_center = center;
                    self.map_zoom = zoom;
                    self.refit();
                    self.redraw_heatmap();
                }
            }
            ClientCommand::ToggleLines => {
                self.show_lines = !self.show_lines;
                self.render_dirty = true;
            }
            ClientCommand::Refresh => {
                self.outbox.push(BackendRequest::FetchScene);
                self.request_stats();
            }
            ClientCommand::ReplaceScene { scene } => self.install_scene(scene),
            ClientCommand::DeleteEntity { id } => match self.directory.delete(&id) {
                Ok(_) => self.events.push(ClientEvent::EntityDeleted { id }),
                Err(err) => self.rejected(err),
            },
            ClientCommand::LoadRoute { points } => {
                match self.playback.load_route(Route::new(points)) {
                    Ok(()) => self.render_dirty = true,
                    Err(err) => self.rejected(err),
                }
            }
            ClientCommand::LoadAirways { airways } => {
                info!(airways = airways.len(), "airways loaded");
                self.snapper.set_airways(airways);
            }
            ClientCommand::StartPlayback { speed, snap } => {
                if self.config.mode != CoordinateMode::Map {
                    self.rejected(PreconditionError::WrongCoordinateMode);
                    return;
                }
                match self.playback.start(now, speed, snap) {
                    Ok(()) => self.events.push(ClientEvent::PlaybackStarted {
                        index: self.playback.index(),
                    }),
                    Err(err) => self.rejected(err),
                }
            }
            ClientCommand::PausePlayback => {
                if self.playback.is_playing() {
                    self.playback.pause(&mut self.directory);
                    self.events.push(ClientEvent::PlaybackStopped {
                        index: self.playback.index(),
                        reason: StopReason::Paused,
                    });
                }
            }
            ClientCommand::RequestHeatmap {
                center,
                radius_km,
                step_m,
                f_rx_mhz,
                window_khz,
            } => {
                // Samples come back as lat/lon and only project on the map
                if self.config.mode != CoordinateMode::Map {
                    self.rejected(PreconditionError::WrongCoordinateMode);
                    return;
                }
                let transmitters = self.directory.transmitters();
                if transmitters.is_empty() {
                    self.rejected(PreconditionError::NoTransmitters);
                    return;
                }
                self.outbox.push(BackendRequest::Heatmap(HeatmapQuery {
                    center,
                    radius_km,
                    step_m,
                    f_rx_mhz,
                    window_khz,
                    transmitters,
                }));
            }
            ClientCommand::SetHeatOpacity { max_alpha } => {
                let outcome = self.heatmap.set_max_alpha(max_alpha, &self.transform);
                self.heatmap_outcome(outcome);
            }
            ClientCommand::ClearHeatmap => {
                self.heatmap.clear();
                self.events.push(ClientEvent::HeatmapCleared);
            }
            ClientCommand::RequestProfile {
                tx_id,
                rx_id,
                frequency_mhz,
                k_factor,
            } => match self.profile_query(&tx_id, &rx_id, frequency_mhz, k_factor) {
                Ok(query) => self.outbox.push(BackendRequest::Profile(query)),
                Err(err) => self.rejected(err),
            },
            ClientCommand::RequestInterference {
                receiver_id,
                f_rx_mhz,
                window_khz,
                max_order,
            } => match self.interference_query(&receiver_id, f_rx_mhz, window_khz, max_order) {
                Ok(query) => self.outbox.push(BackendRequest::Interference(query)),
                Err(err) => self.rejected(err),
            },
        }
    }

    /// Link statistics exist for the km-grid service only.
    fn request_stats(&mut self) {
        if self.config.mode == CoordinateMode::Grid {
            self.outbox.push(BackendRequest::FetchStats);
        }
    }

    fn profile_query(
        &self,
        tx_id: &str,
        rx_id: &str,
        frequency_mhz: f64,
        k_factor: f64,
    ) -> Result<ProfileQuery, PreconditionError> {
        if tx_id.is_empty() || rx_id.is_empty() {
            return Err(PreconditionError::MissingSelection);
        }
        let find = |id: &str| {
            self.directory
                .find(id)
                .cloned()
                .ok_or_else(|| PreconditionError::UnknownEntity(id.to_string()))
        };
        Ok(ProfileQuery {
            tx: find(tx_id)?,
            rx: find(rx_id)?,
            frequency_mhz,
            k_factor,
            samples: self.config.profile_samples,
        })
    }

    /// The interference service models components by lat/lon, so the
    /// receiver must sit on the map.
    fn interference_query(
        &self,
        receiver_id: &str,
        f_rx_mhz: f64,
        window_khz: f64,
        max_order: u32,
    ) -> Result<InterferenceQuery, PreconditionError> {
        if self.config.mode != CoordinateMode::Map {
            return Err(PreconditionError::WrongCoordinateMode);
        }
        if receiver_id.is_empty() {
            return Err(PreconditionError::MissingSelection);
        }
        let receiver = self
            .directory
            .find(receiver_id)
            .cloned()
            .ok_or_else(|| PreconditionError::UnknownEntity(receiver_id.to_string()))?;
        let transmitters: Vec<_> = self
            .directory
            .transmitters()
            .into_iter()
            .filter(|e| e.id != receiver.id)
            .collect();
        if transmitters.is_empty() {
            return Err(PreconditionError::NoTransmitters);
        }
        Ok(InterferenceQuery {
            receiver,
            transmitters,
            f_rx_mhz,
            window_khz,
            max_order: max_order.clamp(INTERFERENCE_MIN_ORDER, INTERFERENCE_MAX_ORDER_LIMIT),
        })
    }

    // --- Playback ---

    fn poll_playback(&mut self, now: Instant) {
        let Some(outcome) =
            self.playback
                .poll(now, &mut self.directory, &self.snapper, &self.transform)
        else {
            return;
        };
        match outcome {
            TickOutcome::Moved(step) => {
                self.events.push(ClientEvent::EntityMoved {
                    id: step.entity_id,
                    position: Position::Geo(step.position),
                });
            }
            TickOutcome::Finished(step) => {
                self.events.push(ClientEvent::EntityMoved {
                    id: step.entity_id,
                    position: Position::Geo(step.position),
                });
                self.events.push(ClientEvent::PlaybackStopped {
                    index: step.index,
                    reason: StopReason::RouteEnd,
                });
            }
            TickOutcome::Stopped { index, reason } => {
                let message = match reason {
                    StopReason::NoMovingEntity => "playback stopped: no moving entity".to_string(),
                    StopReason::ControlHeld => {
                        "playback stopped: the moving entity is being dragged".to_string()
                    }
                    StopReason::WrongCoordinateMode => {
                        "playback stopped: the moving entity has no geographic position".to_string()
                    }
                    other => format!("playback stopped: {other:?}"),
                };
                self.notice(NoticeLevel::Warning, message);
                self.events.push(ClientEvent::PlaybackStopped { index, reason });
            }
        }
    }

    // --- Scene ---

    fn install_scene(&mut self, scene: Scene) {
        let entities = scene.entities.len();
        self.directory.load(scene);
        let orphaned = self
            .drag
            .active_entity()
            .is_some_and(|id| self.directory.find(id).is_none());
        if orphaned {
            self.drag
                .cancel_drag(&mut self.directory, self.pointer_surface.as_mut());
        }
        self.refit();
        self.events.push(ClientEvent::SceneLoaded { entities });
    }

    fn rollback(&mut self, id: &str, previous: Position) {
        let restored = self
            .directory
            .acquire(id, ControlHolder::Drag)
            .and_then(|token| {
                let result = self.directory.apply_drag(&token, previous);
                self.directory.release(token);
                result
            });
        match restored {
            Ok(position) => self.events.push(ClientEvent::EntityMoved {
                id: id.to_string(),
                position,
            }),
            Err(err) => debug!(%err, id, "rollback skipped"),
        }
    }

    /// Recompute the active transform from the viewport, the scene bounds
    /// and the map view.
    fn refit(&mut self) {
        self.transform = match self.config.mode {
            CoordinateMode::Grid => {
                let bounds = self.directory.scene().map(|s| s.bounds).unwrap_or_default();
                SceneTransform::Grid(GridTransform::fit(self.viewport, bounds, FIT_MARGIN_PX))
            }
            CoordinateMode::Map => SceneTransform::Map(MapTransform::new(
                self.map_center,
                self.map_zoom,
                self.viewport,
            )),
        };
        self.render_dirty = true;
    }

    // --- Rendering ---

    fn render_if_dirty(&mut self) {
        if self.render_dirty || self.rendered_revision != Some(self.directory.revision()) {
            self.render();
        }
    }

    fn render(&mut self) {
        self.draw_list = match self.directory.scene() {
            Some(scene) => {
                let route = Some(self.playback.route())
                    .filter(|r| !r.is_empty() && self.config.mode == CoordinateMode::Map);
                DrawList::build(scene, &self.transform, self.show_lines, route)
            }
            None => DrawList::default(),
        };
        self.rendered_revision = Some(self.directory.revision());
        self.render_dirty = false;
    }

    fn draw_heatmap(&mut self, points: Vec<HeatPoint>) {
        let params = self.heatmap.params();
        let outcome = self.heatmap.render(points, params, &self.transform);
        self.heatmap_outcome(Some(outcome));
    }

    fn redraw_heatmap(&mut self) {
        let outcome = self.heatmap.redraw(&self.transform);
        self.heatmap_outcome(outcome);
    }

    fn heatmap_outcome(&mut self, outcome: Option<DrawOutcome>) {
        match outcome {
            Some(DrawOutcome::Drawn { samples }) => {
                self.events.push(ClientEvent::HeatmapDrawn { samples });
            }
            Some(DrawOutcome::Deferred) => debug!("heatmap draw deferred: surface has zero size"),
            None => {}
        }
    }

    // --- Notices ---

    fn rejected(&mut self, err: PreconditionError) {
        debug!(%err, "action rejected");
        self.notice(NoticeLevel::Warning, err.to_string());
    }

    fn backend_failed(&mut self, err: BackendError) {
        warn!(%err, "backend request failed");
        self.notice(NoticeLevel::Error, err.to_string());
    }

    fn notice(&mut self, level: NoticeLevel, message: String) {
        if self.notices.len() >= MAX_NOTICES {
            self.notices.remove(0);
        }
        self.notices.push(Notice {
            level,
            message,
            step: self.step,
        });
    }

    fn snapshot(&mut self) -> ClientSnapshot {
        ClientSnapshot {
            step: self.step,
            mode: self.config.mode,
            scene: self.directory.scene().cloned(),
            drag: DragView {
                phase: self.drag.phase(),
                entity_id: self.drag.active_entity().map(str::to_string),
            },
            playback: self.playback.view(),
            heatmap: HeatmapView {
                cached_samples: self.heatmap.cached_samples(),
                max_alpha: self.heatmap.params().max_alpha,
                radius_px: self.heatmap.params().radius_px,
                deferred: self.heatmap.is_deferred(),
                painted_pixels: self.heatmap.raster().painted_pixels(),
            },
            stats: self.stats.clone(),
            profile: self.profile.clone(),
            interference: self.interference.clone(),
            show_lines: self.show_lines,
            notices: std::mem::take(&mut self.notices),
            events: std::mem::take(&mut self.events),
        }
    }
}
