//! Domain-to-screen coordinate transforms.
//!
//! The km grid and the geographic map share one interface so drawing,
//! dragging, snapping and heatmap stamping never branch on the scene's
//! coordinate convention. A transform returns `None` for positions in the
//! other convention.

use glam::DVec2;

use propviz_core::constants::{MAX_MERCATOR_LAT, MIN_VIEWPORT_PX, TILE_SIZE_PX};
use propviz_core::enums::CoordinateMode;
use propviz_core::types::{GeoPoint, KmPoint, Position, SceneBounds, ScreenPoint, Viewport};

/// Smallest scale a transform will hold (px per km).
const MIN_SCALE: f64 = 1e-6;

/// Bidirectional mapping between a domain coordinate space and screen pixels.
pub trait CoordinateTransform {
    fn mode(&self) -> CoordinateMode;

    /// Domain position to surface pixels. `None` if the position is in the
    /// other convention.
    fn to_screen(&self, position: &Position) -> Option<ScreenPoint>;

    /// Surface pixels to a domain position.
    fn to_domain(&self, screen: ScreenPoint) -> Position;

    /// `start` shifted by a pixel delta, expressed in domain units.
    fn offset(&self, start: &Position, delta_px: DVec2) -> Option<Position>;
}

/// Scale that fits `bounds` inside `viewport` with `margin` on every side.
///
/// Each usable extent is floored at [`MIN_VIEWPORT_PX`] so a collapsed
/// container never yields a zero or negative scale, and a degenerate
/// domain dimension is treated as 1 km.
pub fn fit_scale(viewport: Viewport, bounds: SceneBounds, margin: f64) -> f64 {
    let usable = |extent: f64| {
        let px = extent - 2.0 * margin;
        if px.is_finite() {
            px.max(MIN_VIEWPORT_PX)
        } else {
            MIN_VIEWPORT_PX
        }
    };
    let domain = |extent: f64| {
        if extent.is_finite() && extent > 0.0 {
            extent
        } else {
            1.0
        }
    };
    let scale = (usable(viewport.width) / domain(bounds.width_km))
        .min(usable(viewport.height) / domain(bounds.height_km));
    sanitize_scale(scale)
}

fn sanitize_scale(scale: f64) -> f64 {
    if scale.is_finite() && scale > MIN_SCALE {
        scale
    } else {
        MIN_SCALE
    }
}

// ---- Grid ----

/// Km grid to pixels with a single scale for both axes and an inverted Y.
///
/// Domain y grows upward, screen y grows downward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridTransform {
    /// Pixels per km.
    scale: f64,
    /// Scene height in km, the pivot of the Y inversion.
    domain_height: f64,
}

impl GridTransform {
    pub fn new(scale: f64, domain_height: f64) -> Self {
        Self {
            scale: sanitize_scale(scale),
            domain_height,
        }
    }

    /// Transform fitted to the viewport, recomputed on every resize or bounds change.
    pub fn fit(viewport: Viewport, bounds: SceneBounds, margin: f64) -> Self {
        Self::new(fit_scale(viewport, bounds, margin), bounds.height_km)
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn domain_height(&self) -> f64 {
        self.domain_height
    }

    pub fn km_to_screen(&self, p: KmPoint) -> ScreenPoint {
        DVec2::new(p.x_km * self.scale, (self.domain_height - p.y_km) * self.scale)
    }

    pub fn screen_to_km(&self, s: ScreenPoint) -> KmPoint {
        KmPoint::new(s.x / self.scale, self.domain_height - s.y / self.scale)
    }

    /// Pixel delta to a km delta through the inverse scale (y flipped).
    pub fn delta_to_km(&self, delta_px: DVec2) -> DVec2 {
        DVec2::new(delta_px.x / self.scale, -delta_px.y / self.scale)
    }

    /// Scene size in pixels, used as the drawing's view box.
    pub fn extent_px(&self, bounds: SceneBounds) -> DVec2 {
        DVec2::new(bounds.width_km * self.scale, bounds.height_km * self.scale)
    }
}

impl CoordinateTransform for GridTransform {
    fn mode(&self) -> CoordinateMode {
        CoordinateMode::Grid
    }

    fn to_screen(&self, position: &Position) -> Option<ScreenPoint> {
        position.as_grid().map(|p| self.km_to_screen(p))
    }

    fn to_domain(&self, screen: ScreenPoint) -> Position {
        Position::Grid(self.screen_to_km(screen))
    }

    fn offset(&self, start: &Position, delta_px: DVec2) -> Option<Position> {
        let p = start.as_grid()?;
        let d = self.delta_to_km(delta_px);
        Some(Position::grid(p.x_km + d.x, p.y_km + d.y))
    }
}

// ---- Map ----

/// Web-Mercator projection to viewport ("container") pixels.
///
/// The view center sits at the middle of the viewport; the world is
/// `256 * 2^zoom` pixels wide.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MapTransform {
    pub center: GeoPoint,
    pub zoom: f64,
    pub viewport: Viewport,
}

impl MapTransform {
    pub fn new(center: GeoPoint, zoom: f64, viewport: Viewport) -> Self {
        Self {
            center,
            zoom,
            viewport,
        }
    }

    /// World width in pixels at the current zoom.
    pub fn world_size(&self) -> f64 {
        TILE_SIZE_PX * self.zoom.exp2()
    }

    /// Geographic point to absolute world pixels.
    pub fn project(&self, p: GeoPoint) -> DVec2 {
        let size = self.world_size();
        let lat = p.lat.clamp(-MAX_MERCATOR_LAT, MAX_MERCATOR_LAT).to_radians();
        let sin = lat.sin();
        let x = (p.lon + 180.0) / 360.0 * size;
        let y = (0.5 - ((1.0 + sin) / (1.0 - sin)).ln() / (4.0 * std::f64::consts::PI)) * size;
        DVec2::new(x, y)
    }

    /// Absolute world pixels back to a geographic point.
    pub fn unproject(&self, world: DVec2) -> GeoPoint {
        let size = self.world_size();
        let lon = world.x / size * 360.0 - 180.0;
        let n = std::f64::consts::PI * (1.0 - 2.0 * world.y / size);
        let lat = n.sinh().atan().to_degrees();
        GeoPoint::new(lat, lon)
    }

    /// World pixel of the viewport's top-left corner.
    fn pixel_origin(&self) -> DVec2 {
        self.project(self.center) - self.viewport.size() * 0.5
    }

    pub fn geo_to_screen(&self, p: GeoPoint) -> ScreenPoint {
        self.project(p) - self.pixel_origin()
    }

    pub fn screen_to_geo(&self, s: ScreenPoint) -> GeoPoint {
        self.unproject(s + self.pixel_origin())
    }
}

impl CoordinateTransform for MapTransform {
    fn mode(&self) -> CoordinateMode {
        CoordinateMode::Map
    }

    fn to_screen(&self, position: &Position) -> Option<ScreenPoint> {
        position.as_geo().map(|p| self.geo_to_screen(p))
    }

    fn to_domain(&self, screen: ScreenPoint) -> Position {
        Position::Geo(self.screen_to_geo(screen))
    }

    fn offset(&self, start: &Position, delta_px: DVec2) -> Option<Position> {
        let p = start.as_geo()?;
        Some(Position::Geo(self.screen_to_geo(self.geo_to_screen(p) + delta_px)))
    }
}

// ---- Active transform ----

/// The transform currently driving the scene.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SceneTransform {
    Grid(GridTransform),
    Map(MapTransform),
}

impl SceneTransform {
    fn inner(&self) -> &dyn CoordinateTransform {
        match self {
            SceneTransform::Grid(t) => t,
            SceneTransform::Map(t) => t,
        }
    }

    pub fn as_grid(&self) -> Option<&GridTransform> {
        match self {
            SceneTransform::Grid(t) => Some(t),
            SceneTransform::Map(_) => None,
        }
    }
}

impl CoordinateTransform for SceneTransform {
    fn mode(&self) -> CoordinateMode {
        self.inner().mode()
    }

    fn to_screen(&self, position: &Position) -> Option<ScreenPoint> {
        self.inner().to_screen(position)
    }

    fn to_domain(&self, screen: ScreenPoint) -> Position {
        self.inner().to_domain(screen)
    }

    fn offset(&self, start: &Position, delta_px: DVec2) -> Option<Position> {
        self.inner().offset(start, delta_px)
    }
}
