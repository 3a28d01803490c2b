//! PlaybackScheduler: moves the designated entity along a loaded route on
//! a fixed period.
//!
//! The timer is a deadline polled with the current time. A poll that finds
//! the deadline passed fires exactly one tick and re-arms from `now`, so a
//! stalled loop never bursts through the route.

use std::time::{Duration, Instant};

use tracing::{debug, info};

use propviz_core::constants::{DEFAULT_MOVING_ENTITY_ID, PLAYBACK_MIN_SPEED, PLAYBACK_PERIOD_MS};
use propviz_core::enums::{ControlHolder, PlaybackState, StopReason};
use propviz_core::error::PreconditionError;
use propviz_core::state::PlaybackView;
use propviz_core::types::{GeoPoint, Route};
use propviz_geo::{glyph_heading_deg, CoordinateTransform, RouteSnapper};

use crate::directory::{ControlToken, EntityDirectory};

/// One applied playback step.
#[derive(Debug, Clone, PartialEq)]
pub struct PlaybackStep {
    pub entity_id: String,
    pub index: usize,
    pub position: GeoPoint,
    pub heading_deg: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    /// Entity advanced; playback continues.
    Moved(PlaybackStep),
    /// Entity advanced onto the last segment; playback stopped.
    Finished(PlaybackStep),
    /// Tick could not run; playback stopped.
    Stopped { index: usize, reason: StopReason },
}

#[derive(Debug)]
pub struct PlaybackScheduler {
    route: Route,
    index: usize,
    speed: f64,
    snap: bool,
    period: Duration,
    preferred_id: String,
    next_due: Option<Instant>,
    token: Option<ControlToken>,
}

impl Default for PlaybackScheduler {
    fn default() -> Self {
        Self::new(
            Duration::from_millis(PLAYBACK_PERIOD_MS),
            DEFAULT_MOVING_ENTITY_ID.to_string(),
        )
    }
}

impl PlaybackScheduler {
    pub fn new(period: Duration, preferred_id: String) -> Self {
        Self {
            route: Route::default(),
            index: 0,
            speed: 1.0,
            snap: false,
            period,
            preferred_id,
            next_due: None,
            token: None,
        }
    }

    pub fn state(&self) -> PlaybackState {
        if self.next_due.is_some() {
            PlaybackState::Playing
        } else {
            PlaybackState::Stopped
        }
    }

    pub fn is_playing(&self) -> bool {
        self.next_due.is_some()
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn next_due(&self) -> Option<Instant> {
        self.next_due
    }

    pub fn view(&self) -> PlaybackView {
        PlaybackView {
            state: self.state(),
            index: self.index,
            route_len: self.route.len(),
            snap: self.snap,
            speed: self.speed,
        }
    }

    /// Replace the route and rewind. A route shorter than two points is
    /// rejected and the current one kept.
    pub fn load_route(&mut self, route: Route) -> Result<(), PreconditionError> {
        if route.len() < 2 {
            return Err(PreconditionError::RouteTooShort(route.len()));
        }
        info!(points = route.len(), "route loaded");
        self.route = route;
        self.index = 0;
        Ok(())
    }

    /// Arm the timer; the first tick fires one period after `now`.
    /// Restarting while playing re-arms without rewinding.
    pub fn start(&mut self, now: Instant, speed: f64, snap: bool) -> Result<(), PreconditionError> {
        if self.route.len() < 2 {
            return Err(PreconditionError::RouteTooShort(self.route.len()));
        }
        self.speed = speed;
        self.snap = snap;
        self.next_due = Some(now + self.period);
        debug!(index = self.index, speed, snap, "playback started");
        Ok(())
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed;
    }

    pub fn set_snap(&mut self, snap: bool) {
        self.snap = snap;
    }

    /// Cancel the timer, keeping the index.
    pub fn pause<D>(&mut self, directory: &mut D)
    where
        D: EntityDirectory + ?Sized,
    {
        if self.next_due.is_some() {
            debug!(index = self.index, "playback paused");
        }
        self.stop(directory);
    }

    /// Index increment for the current speed: `max(1, round(max(0.5, speed)))`.
    /// A missing or non-finite speed counts as 1.
    pub fn stride(&self) -> usize {
        let speed = if self.speed.is_finite() && self.speed != 0.0 {
            self.speed
        } else {
            1.0
        };
        (speed.max(PLAYBACK_MIN_SPEED).round() as usize).max(1)
    }

    /// Fire a tick if the deadline has passed.
    pub fn poll<D, T>(
        &mut self,
        now: Instant,
        directory: &mut D,
        snapper: &RouteSnapper,
        transform: &T,
    ) -> Option<TickOutcome>
    where
        D: EntityDirectory + ?Sized,
        T: CoordinateTransform + ?Sized,
    {
        let due = self.next_due?;
        if now < due {
            return None;
        }
        self.next_due = Some(now + self.period);
        Some(self.tick(directory, snapper, transform))
    }

    /// Advance one step immediately.
    pub fn tick<D, T>(&mut self, directory: &mut D, snapper: &RouteSnapper, transform: &T) -> TickOutcome
    where
        D: EntityDirectory + ?Sized,
        T: CoordinateTransform + ?Sized,
    {
        let Some(entity_id) = directory.moving_entity(&self.preferred_id).map(|e| e.id.clone()) else {
            return self.halt(directory, StopReason::NoMovingEntity);
        };

        if self.token.as_ref().is_some_and(|t| t.entity_id() != entity_id) {
            if let Some(old) = self.token.take() {
                directory.release(old);
            }
        }
        if self.token.is_none() {
            match directory.acquire(&entity_id, ControlHolder::Playback) {
                Ok(token) => self.token = Some(token),
                Err(_) => return self.halt(directory, StopReason::ControlHeld),
            }
        }

        let last = self.route.len().saturating_sub(2);
        self.index = (self.index + self.stride()).min(last);
        let (Some(a), Some(b)) = (self.route.get(self.index), self.route.get(self.index + 1)) else {
            return self.halt(directory, StopReason::RouteEnd);
        };
        let position = if self.snap { snapper.snap(a, transform) } else { a };
        let heading_deg = glyph_heading_deg(a, b);

        let applied = match &self.token {
            Some(token) => directory.apply_playback(token, position, heading_deg),
            None => Err(PreconditionError::NoMovingEntity),
        };
        if let Err(err) = applied {
            debug!(%err, "playback write refused");
            let reason = match err {
                PreconditionError::WrongCoordinateMode => StopReason::WrongCoordinateMode,
                PreconditionError::ControlHeld { .. } => StopReason::ControlHeld,
                _ => StopReason::NoMovingEntity,
            };
            return self.halt(directory, reason);
        }

        let step = PlaybackStep {
            entity_id,
            index: self.index,
            position,
            heading_deg,
        };
        if self.index >= last {
            info!(index = self.index, "route finished");
            self.stop(directory);
            TickOutcome::Finished(step)
        } else {
            TickOutcome::Moved(step)
        }
    }

    fn halt<D>(&mut self, directory: &mut D, reason: StopReason) -> TickOutcome
    where
        D: EntityDirectory + ?Sized,
    {
        debug!(index = self.index, ?reason, "playback stopped");
        self.stop(directory);
        TickOutcome::Stopped {
            index: self.index,
            reason,
        }
    }

    fn stop<D>(&mut self, directory: &mut D)
    where
        D: EntityDirectory + ?Sized,
    {
        self.next_due = None;
        if let Some(token) = self.token.take() {
            directory.release(token);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory::SceneDirectory;
    use propviz_core::enums::EntityKind;
    use propviz_core::types::{Airway, Entity, Position, Scene, Viewport};
    use propviz_geo::MapTransform;

    fn directory() -> SceneDirectory {
        let mut scene = Scene::default();
        scene.entities = vec![
            Entity::new("tx", EntityKind::Transmitter, Position::geo(10.0, 0.0)),
            Entity::new("plane", EntityKind::Aircraft, Position::geo(0.0, 0.0)),
        ];
        let mut dir = SceneDirectory::new();
        dir.load(scene);
        dir
    }

    /// Eastbound route along the equator, one point per 0.1 degree.
    fn route(n: usize) -> Route {
        Route::new((0..n).map(|i| GeoPoint::new(0.0, i as f64 * 0.1)).collect())
    }

    fn map() -> MapTransform {
        MapTransform::new(GeoPoint::new(0.0, 0.5), 8.0, Viewport::new(800.0, 600.0))
    }

    fn scheduler(n: usize) -> PlaybackScheduler {
        let mut s = PlaybackScheduler::default();
        s.load_route(route(n)).unwrap();
        s
    }

    #[test]
    fn test_start_requires_route() {
        let mut s = PlaybackScheduler::default();
        assert_eq!(
            s.start(Instant::now(), 1.0, false),
            Err(PreconditionError::RouteTooShort(0))
        );
        assert_eq!(s.state(), PlaybackState::Stopped);
        assert_eq!(
            s.load_route(route(1)),
            Err(PreconditionError::RouteTooShort(1))
        );
    }

    #[test]
    fn test_stride() {
        let mut s = PlaybackScheduler::default();
        for (speed, stride) in [(1.0, 1), (0.1, 1), (2.4, 2), (2.5, 3), (f64::NAN, 1), (0.0, 1), (-3.0, 1)] {
            s.set_speed(speed);
            assert_eq!(s.stride(), stride, "speed {speed}");
        }
    }

    #[test]
    fn test_ticks_advance_and_finish() {
        let mut dir = directory();
        let mut s = scheduler(5);
        let t0 = Instant::now();
        s.start(t0, 1.0, false).unwrap();
        let snapper = RouteSnapper::default();

        assert!(s.poll(t0, &mut dir, &snapper, &map()).is_none());

        let mut t = t0;
        let mut indices = Vec::new();
        let outcome = loop {
            t += s.period();
            match s.poll(t, &mut dir, &snapper, &map()).unwrap() {
                TickOutcome::Moved(step) => indices.push(step.index),
                other => break other,
            }
        };
        assert_eq!(indices, [1, 2]);
        let TickOutcome::Finished(step) = outcome else {
            panic!("expected finish, got {outcome:?}");
        };
        assert_eq!(step.index, 3);
        assert_eq!(step.entity_id, "plane");
        assert!((step.heading_deg - 0.0).abs() < 1e-9);
        assert_eq!(dir.find("plane").unwrap().position, Position::geo(0.0, 0.30000000000000004));
        assert_eq!(s.state(), PlaybackState::Stopped);
        assert_eq!(dir.holder("plane"), None);
    }

    #[test]
    fn test_fast_speed_clamps_to_last_segment() {
        let mut dir = directory();
        let mut s = scheduler(4);
        s.start(Instant::now(), 10.0, false).unwrap();
        let outcome = s.tick(&mut dir, &RouteSnapper::default(), &map());
        assert!(matches!(outcome, TickOutcome::Finished(ref step) if step.index == 2));
    }

    #[test]
    fn test_late_poll_fires_once_and_rearms() {
        let mut dir = directory();
        let mut s = scheduler(10);
        let t0 = Instant::now();
        s.start(t0, 1.0, false).unwrap();
        let late = t0 + s.period() * 5;
        assert!(s.poll(late, &mut dir, &RouteSnapper::default(), &map()).is_some());
        assert_eq!(s.index(), 1);
        assert_eq!(s.next_due(), Some(late + s.period()));
        assert!(s.poll(late, &mut dir, &RouteSnapper::default(), &map()).is_none());
    }

    #[test]
    fn test_pause_keeps_index_and_releases() {
        let mut dir = directory();
        let mut s = scheduler(10);
        s.start(Instant::now(), 2.0, false).unwrap();
        s.tick(&mut dir, &RouteSnapper::default(), &map());
        assert_eq!(dir.holder("plane"), Some(ControlHolder::Playback));
        s.pause(&mut dir);
        assert_eq!(s.index(), 2);
        assert_eq!(s.state(), PlaybackState::Stopped);
        assert_eq!(dir.holder("plane"), None);
    }

    #[test]
    fn test_load_route_rewinds() {
        let mut dir = directory();
        let mut s = scheduler(10);
        s.start(Instant::now(), 3.0, false).unwrap();
        s.tick(&mut dir, &RouteSnapper::default(), &map());
        assert_eq!(s.index(), 3);
        s.load_route(route(6)).unwrap();
        assert_eq!(s.index(), 0);
    }

    #[test]
    fn test_missing_moving_entity_stops() {
        let mut dir = SceneDirectory::new();
        dir.load(Scene::default());
        let mut s = scheduler(5);
        s.start(Instant::now(), 1.0, false).unwrap();
        let outcome = s.tick(&mut dir, &RouteSnapper::default(), &map());
        assert_eq!(
            outcome,
            TickOutcome::Stopped {
                index: 0,
                reason: StopReason::NoMovingEntity
            }
        );
        assert!(!s.is_playing());
    }

    #[test]
    fn test_drag_lease_stops_playback() {
        let mut dir = directory();
        let _drag = dir.acquire("plane", ControlHolder::Drag).unwrap();
        let mut s = scheduler(5);
        s.start(Instant::now(), 1.0, false).unwrap();
        let outcome = s.tick(&mut dir, &RouteSnapper::default(), &map());
        assert!(matches!(
            outcome,
            TickOutcome::Stopped {
                reason: StopReason::ControlHeld,
                ..
            }
        ));
        assert_eq!(dir.find("plane").unwrap().position, Position::geo(0.0, 0.0));
    }

    #[test]
    fn test_grid_positioned_aircraft_stops_with_mode_reason() {
        let mut scene = Scene::default();
        scene.entities = vec![Entity::new("plane", EntityKind::Aircraft, Position::grid(5.0, 5.0))];
        let mut dir = SceneDirectory::new();
        dir.load(scene);
        let mut s = scheduler(5);
        s.start(Instant::now(), 1.0, false).unwrap();
        let outcome = s.tick(&mut dir, &RouteSnapper::default(), &map());
        assert_eq!(
            outcome,
            TickOutcome::Stopped {
                index: 1,
                reason: StopReason::WrongCoordinateMode
            }
        );
        assert_eq!(dir.find("plane").unwrap().position, Position::grid(5.0, 5.0));
        assert_eq!(dir.holder("plane"), None);
    }

    #[test]
    fn test_snap_applies_to_position_not_heading() {
        let mut dir = directory();
        // Airway runs 0.05 degrees north of the route
        let snapper = RouteSnapper::new(vec![Airway::new(
            "north",
            vec![GeoPoint::new(0.05, 0.0), GeoPoint::new(0.05, 2.0)],
        )]);
        let mut s = scheduler(5);
        s.start(Instant::now(), 1.0, true).unwrap();
        let TickOutcome::Moved(step) = s.tick(&mut dir, &snapper, &map()) else {
            panic!("expected a move");
        };
        assert!((step.position.lat - 0.05).abs() < 1e-9);
        assert!((step.position.lon - 0.1).abs() < 1e-9);
        // Heading still follows the raw route: due East
        assert!(step.heading_deg.abs() < 1e-9);
    }

    #[test]
    fn test_preferred_id_wins_over_first_aircraft() {
        let mut dir = directory();
        let mut s = PlaybackScheduler::new(Duration::from_millis(10), "tx".into());
        s.load_route(route(4)).unwrap();
        s.start(Instant::now(), 1.0, false).unwrap();
        let TickOutcome::Moved(step) = s.tick(&mut dir, &RouteSnapper::default(), &map()) else {
            panic!("expected a move");
        };
        assert_eq!(step.entity_id, "tx");
    }
}
