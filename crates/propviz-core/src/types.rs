//! Fundamental geometric and scene types.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use crate::enums::EntityKind;

/// A point on the rendering surface, in pixels. x grows right, y grows down.
pub type ScreenPoint = DVec2;

/// Point on the abstract km grid. x = East, y = North (y grows upward).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct KmPoint {
    pub x_km: f64,
    pub y_km: f64,
}

/// Geographic point in degrees.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// Entity position in one of the two coordinate conventions.
///
/// Untagged on the wire: `{x_km, y_km}` or `{lat, lon}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Position {
    Grid(KmPoint),
    Geo(GeoPoint),
}

impl KmPoint {
    pub fn new(x_km: f64, y_km: f64) -> Self {
        Self { x_km, y_km }
    }
}

impl GeoPoint {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    pub fn is_finite(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

impl Position {
    pub fn grid(x_km: f64, y_km: f64) -> Self {
        Position::Grid(KmPoint::new(x_km, y_km))
    }

    pub fn geo(lat: f64, lon: f64) -> Self {
        Position::Geo(GeoPoint::new(lat, lon))
    }

    pub fn as_grid(&self) -> Option<KmPoint> {
        match self {
            Position::Grid(p) => Some(*p),
            Position::Geo(_) => None,
        }
    }

    pub fn as_geo(&self) -> Option<GeoPoint> {
        match self {
            Position::Geo(p) => Some(*p),
            Position::Grid(_) => None,
        }
    }

    pub fn is_finite(&self) -> bool {
        match self {
            Position::Grid(p) => p.x_km.is_finite() && p.y_km.is_finite(),
            Position::Geo(p) => p.is_finite(),
        }
    }
}

/// Scene extent in kilometers. The grid spans `[0, width] x [0, height]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SceneBounds {
    pub width_km: f64,
    pub height_km: f64,
}

impl Default for SceneBounds {
    fn default() -> Self {
        Self {
            width_km: crate::constants::DEFAULT_SCENE_WIDTH_KM,
            height_km: crate::constants::DEFAULT_SCENE_HEIGHT_KM,
        }
    }
}

impl SceneBounds {
    pub fn new(width_km: f64, height_km: f64) -> Self {
        Self {
            width_km,
            height_km,
        }
    }

    /// Clamp a grid point into the scene rectangle.
    pub fn clamp(&self, p: KmPoint) -> KmPoint {
        KmPoint {
            x_km: p.x_km.clamp(0.0, self.width_km.max(0.0)),
            y_km: p.y_km.clamp(0.0, self.height_km.max(0.0)),
        }
    }

    pub fn contains(&self, p: &KmPoint) -> bool {
        (0.0..=self.width_km).contains(&p.x_km) && (0.0..=self.height_km).contains(&p.y_km)
    }
}

/// A placed transmitter, tower, aircraft or receiver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub id: String,
    #[serde(default)]
    pub name: String,
    pub kind: EntityKind,
    pub position: Position,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frequency_mhz: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub power_dbm: Option<f64>,
    /// Glyph heading in degrees, East-zero convention.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_deg: Option<f64>,
}

impl Entity {
    pub fn new(id: impl Into<String>, kind: EntityKind, position: Position) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            kind,
            position,
            frequency_mhz: None,
            power_dbm: None,
            heading_deg: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_radio(mut self, frequency_mhz: f64, power_dbm: f64) -> Self {
        self.frequency_mhz = Some(frequency_mhz);
        self.power_dbm = Some(power_dbm);
        self
    }

    pub fn with_heading(mut self, heading_deg: f64) -> Self {
        self.heading_deg = Some(heading_deg);
        self
    }

    /// Display label: the name, or the id when the name is empty.
    pub fn label(&self) -> &str {
        if self.name.is_empty() {
            &self.id
        } else {
            &self.name
        }
    }
}

/// The abstract-grid scene: bounds plus ordered entities.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    pub bounds: SceneBounds,
    pub entities: Vec<Entity>,
}

impl Scene {
    pub fn new(bounds: SceneBounds) -> Self {
        Self {
            bounds,
            entities: Vec::new(),
        }
    }

    pub fn find(&self, id: &str) -> Option<&Entity> {
        self.entities.iter().find(|e| e.id == id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Entity> {
        self.entities.iter_mut().find(|e| e.id == id)
    }

    pub fn first_of(&self, kind: EntityKind) -> Option<&Entity> {
        self.entities.iter().find(|e| e.kind == kind)
    }

    pub fn of_kind(&self, kind: EntityKind) -> impl Iterator<Item = &Entity> {
        self.entities.iter().filter(move |e| e.kind == kind)
    }
}

/// One sample of the signal-level field returned by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatPoint {
    pub position: Position,
    pub level_dbm: f64,
}

impl HeatPoint {
    pub fn new(position: Position, level_dbm: f64) -> Self {
        Self {
            position,
            level_dbm,
        }
    }
}

/// Ordered track loaded from a route file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub points: Vec<GeoPoint>,
}

impl Route {
    pub fn new(points: Vec<GeoPoint>) -> Self {
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<GeoPoint> {
        self.points.get(index).copied()
    }
}

/// A named reference polyline used for snapping.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Airway {
    pub name: String,
    pub points: Vec<GeoPoint>,
}

impl Airway {
    pub fn new(name: impl Into<String>, points: Vec<GeoPoint>) -> Self {
        Self {
            name: name.into(),
            points,
        }
    }

    /// Consecutive point pairs of the polyline.
    pub fn segments(&self) -> impl Iterator<Item = (GeoPoint, GeoPoint)> + '_ {
        self.points.windows(2).map(|w| (w[0], w[1]))
    }
}

/// All loaded airways.
pub type AirwaySet = Vec<Airway>;

/// Surface size in pixels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        !(self.width >= 1.0 && self.height >= 1.0)
    }

    pub fn size(&self) -> DVec2 {
        DVec2::new(self.width, self.height)
    }
}
