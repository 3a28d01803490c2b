//! JSON shapes spoken by the physics backend.
//!
//! The grid service and the map service name things differently (Spanish
//! keys, Hz and W on one side, MHz and dBm on the other). Everything is
//! translated to and from the core types here so nothing else in the
//! client sees the wire vocabulary.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use propviz_core::constants::{DEFAULT_SCENE_HEIGHT_KM, DEFAULT_SCENE_WIDTH_KM};
use propviz_core::enums::EntityKind;
use propviz_core::types::{Entity, HeatPoint, Position, Scene, SceneBounds};
use propviz_sim::{HeatmapQuery, InterferenceQuery, ProfileQuery};

// ---- Grid scene: GET /scene ----

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridSceneDto {
    #[serde(default)]
    pub scene: GridBoundsDto,
    #[serde(default)]
    pub entities: Vec<GridEntityDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridBoundsDto {
    #[serde(default = "default_width")]
    pub ancho_km: f64,
    #[serde(default = "default_height")]
    pub alto_km: f64,
}

fn default_width() -> f64 {
    DEFAULT_SCENE_WIDTH_KM
}

fn default_height() -> f64 {
    DEFAULT_SCENE_HEIGHT_KM
}

impl Default for GridBoundsDto {
    fn default() -> Self {
        Self {
            ancho_km: DEFAULT_SCENE_WIDTH_KM,
            alto_km: DEFAULT_SCENE_HEIGHT_KM,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridEntityDto {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub id: String,
    #[serde(default)]
    pub nombre: String,
    #[serde(default)]
    pub x_km: f64,
    #[serde(default)]
    pub y_km: f64,
    #[serde(rename = "f_Hz", default, skip_serializing_if = "Option::is_none")]
    pub f_hz: Option<f64>,
    #[serde(rename = "potencia_W", default, skip_serializing_if = "Option::is_none")]
    pub potencia_w: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_deg: Option<f64>,
}

fn grid_kind(tag: &str) -> EntityKind {
    match tag {
        "FMTransmitter" => EntityKind::Transmitter,
        "ControlTower" => EntityKind::ControlTower,
        "Aircraft" => EntityKind::Aircraft,
        _ => EntityKind::Receiver,
    }
}

/// Transmit power in watts to dBm. Non-positive power has no level.
pub fn watts_to_dbm(watts: f64) -> Option<f64> {
    (watts.is_finite() && watts > 0.0).then(|| 10.0 * watts.log10() + 30.0)
}

impl From<GridEntityDto> for Entity {
    fn from(dto: GridEntityDto) -> Self {
        let mut entity = Entity::new(dto.id, grid_kind(&dto.kind), Position::grid(dto.x_km, dto.y_km))
            .with_name(dto.nombre);
        entity.frequency_mhz = dto.f_hz.map(|hz| hz / 1e6);
        entity.power_dbm = dto.potencia_w.and_then(watts_to_dbm);
        entity.heading_deg = dto.heading_deg;
        entity
    }
}

impl From<GridSceneDto> for Scene {
    fn from(dto: GridSceneDto) -> Self {
        let mut scene = Scene::new(SceneBounds::new(dto.scene.ancho_km, dto.scene.alto_km));
        scene.entities = dto.entities.into_iter().map(Entity::from).collect();
        scene
    }
}

// ---- Map components: GET /scenario/{id}, heatmap and LOS bodies ----

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentDto {
    pub id: String,
    #[serde(default)]
    pub nombre: String,
    pub tipo: String,
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub alt_terreno_m: f64,
    #[serde(default)]
    pub alt_sobre_terreno_m: f64,
    #[serde(rename = "frecuencia_MHz", default)]
    pub frecuencia_mhz: Option<f64>,
    #[serde(rename = "potencia_dBm", default)]
    pub potencia_dbm: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub heading_deg: Option<f64>,
}

fn map_kind(tipo: &str) -> EntityKind {
    match tipo {
        "antena" => EntityKind::Transmitter,
        "torre" => EntityKind::ControlTower,
        "avion" => EntityKind::Aircraft,
        _ => EntityKind::Receiver,
    }
}

fn map_tipo(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Transmitter => "antena",
        EntityKind::ControlTower => "torre",
        EntityKind::Aircraft => "avion",
        EntityKind::Receiver => "receptor",
    }
}

impl ComponentDto {
    /// Wire form of a geo-positioned entity. `None` for grid positions.
    pub fn from_entity(entity: &Entity) -> Option<Self> {
        let geo = entity.position.as_geo()?;
        Some(Self {
            id: entity.id.clone(),
            nombre: entity.name.clone(),
            tipo: map_tipo(entity.kind).to_string(),
            lat: geo.lat,
            lon: geo.lon,
            alt_terreno_m: 0.0,
            alt_sobre_terreno_m: 0.0,
            frecuencia_mhz: entity.frequency_mhz,
            potencia_dbm: entity.power_dbm,
            heading_deg: entity.heading_deg,
        })
    }
}

impl From<ComponentDto> for Entity {
    fn from(dto: ComponentDto) -> Self {
        let mut entity = Entity::new(dto.id, map_kind(&dto.tipo), Position::geo(dto.lat, dto.lon))
            .with_name(dto.nombre);
        entity.frequency_mhz = dto.frecuencia_mhz;
        entity.power_dbm = dto.potencia_dbm;
        entity.heading_deg = dto.heading_deg;
        entity
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioDto {
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub objetos: Vec<ComponentDto>,
}

impl From<ScenarioDto> for Scene {
    fn from(dto: ScenarioDto) -> Self {
        let mut scene = Scene::default();
        scene.entities = dto.objetos.into_iter().map(Entity::from).collect();
        scene
    }
}

// ---- POST /entity/move ----

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum MoveDto<'a> {
    Grid { id: &'a str, x_km: f64, y_km: f64 },
    Geo { id: &'a str, lat: f64, lon: f64 },
}

impl<'a> MoveDto<'a> {
    pub fn new(id: &'a str, position: Position) -> Self {
        match position {
            Position::Grid(p) => MoveDto::Grid {
                id,
                x_km: p.x_km,
                y_km: p.y_km,
            },
            Position::Geo(g) => MoveDto::Geo {
                id,
                lat: g.lat,
                lon: g.lon,
            },
        }
    }
}

// ---- Receiver filter curves ----

/// Receiver front-end filter sent with heatmap and interference requests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
pub enum FilterPreset {
    /// 8-pole cavity (VHF COM).
    #[serde(rename = "cavity_8p")]
    #[value(name = "cavity_8p")]
    Cavity8p,
    /// Commercial band-pass, 200 kHz wide.
    #[default]
    #[serde(rename = "bpf_200k")]
    #[value(name = "bpf_200k")]
    Bpf200k,
    /// FM notch centered on 100 MHz.
    #[serde(rename = "notch_fm_100")]
    #[value(name = "notch_fm_100")]
    NotchFm100,
}

const CAVITY_8P: &[(&str, f64)] = &[
    ("0", 0.0),
    ("12.5", 12.0),
    ("25", 25.0),
    ("50", 48.0),
    ("75", 60.0),
    ("100", 72.0),
    ("150", 85.0),
    ("200", 95.0),
    ("300", 110.0),
    ("500", 120.0),
];

const BPF_200K: &[(&str, f64)] = &[
    ("0", 0.0),
    ("25", 8.0),
    ("50", 14.0),
    ("100", 24.0),
    ("150", 35.0),
    ("200", 45.0),
    ("300", 60.0),
    ("500", 80.0),
];

const NOTCH_FM_100: &[(&str, f64)] = &[
    ("0", 80.0),
    ("50", 60.0),
    ("100", 40.0),
    ("200", 20.0),
    ("400", 8.0),
    ("800", 2.0),
];

fn curve(points: &[(&str, f64)]) -> BTreeMap<String, f64> {
    points.iter().map(|(k, v)| (k.to_string(), *v)).collect()
}

impl FilterPreset {
    /// Rejection curve (offset kHz -> dB) as the backend expects it.
    pub fn rejection(&self) -> serde_json::Value {
        match self {
            FilterPreset::Cavity8p => serde_json::json!(curve(CAVITY_8P)),
            FilterPreset::Bpf200k => serde_json::json!(curve(BPF_200K)),
            FilterPreset::NotchFm100 => serde_json::json!({
                "center_MHz": 100.0,
                "curve": curve(NOTCH_FM_100),
            }),
        }
    }
}

// ---- POST /radio/heatmap ----

#[derive(Debug, Clone, Serialize)]
pub struct HeatmapRequestDto {
    pub center_lat: f64,
    pub center_lon: f64,
    pub radius_km: f64,
    pub step_m: u32,
    #[serde(rename = "f_rx_MHz")]
    pub f_rx_mhz: f64,
    #[serde(rename = "window_kHz")]
    pub window_khz: f64,
    pub transmitters: Vec<ComponentDto>,
    #[serde(rename = "filter_rejection_dB")]
    pub filter_rejection_db: serde_json::Value,
}

impl HeatmapRequestDto {
    /// Transmitters without a geographic position are left out.
    pub fn new(query: &HeatmapQuery, filter: FilterPreset) -> Self {
        Self {
            center_lat: query.center.lat,
            center_lon: query.center.lon,
            radius_km: query.radius_km,
            step_m: query.step_m,
            f_rx_mhz: query.f_rx_mhz,
            window_khz: query.window_khz,
            transmitters: query
                .transmitters
                .iter()
                .filter_map(ComponentDto::from_entity)
                .collect(),
            filter_rejection_db: filter.rejection(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeatPointDto {
    pub lat: f64,
    pub lon: f64,
    #[serde(rename = "score_dBm")]
    pub score_dbm: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HeatmapResponseDto {
    #[serde(default)]
    pub points: Vec<HeatPointDto>,
}

impl HeatmapResponseDto {
    pub fn into_points(self) -> Vec<HeatPoint> {
        self.points
            .into_iter()
            .map(|p| HeatPoint::new(Position::geo(p.lat, p.lon), p.score_dbm))
            .collect()
    }
}

// ---- POST /radio/los ----

#[derive(Debug, Clone, Serialize)]
pub struct LosRequestDto {
    pub tx: ComponentDto,
    pub rx: ComponentDto,
    #[serde(rename = "frecuencia_MHz")]
    pub frequency_mhz: f64,
    pub k_factor: f64,
    pub samples: u32,
}

impl LosRequestDto {
    /// `Err` carries the id of an endpoint without a geographic position.
    pub fn new(query: &ProfileQuery) -> Result<Self, String> {
        let component = |e: &Entity| ComponentDto::from_entity(e).ok_or_else(|| e.id.clone());
        Ok(Self {
            tx: component(&query.tx)?,
            rx: component(&query.rx)?,
            frequency_mhz: query.frequency_mhz,
            k_factor: query.k_factor,
            samples: query.samples,
        })
    }
}

// ---- POST /radio/interference ----

#[derive(Debug, Clone, Serialize)]
pub struct InterferenceRequestDto {
    pub receiver: ComponentDto,
    pub transmitters: Vec<ComponentDto>,
    pub max_order: u32,
    #[serde(rename = "window_kHz")]
    pub window_khz: f64,
    #[serde(rename = "filter_rejection_dB")]
    pub filter_rejection_db: serde_json::Value,
}

impl InterferenceRequestDto {
    /// The receiver is sent as a `receptor` tuned to the query frequency.
    /// `Err` carries the receiver id when it has no geographic position;
    /// transmitters without one are left out.
    pub fn new(query: &InterferenceQuery, filter: FilterPreset) -> Result<Self, String> {
        let mut receiver =
            ComponentDto::from_entity(&query.receiver).ok_or_else(|| query.receiver.id.clone())?;
        receiver.tipo = map_tipo(EntityKind::Receiver).to_string();
        receiver.frecuencia_mhz = Some(query.f_rx_mhz);
        Ok(Self {
            receiver,
            transmitters: query
                .transmitters
                .iter()
                .filter_map(ComponentDto::from_entity)
                .collect(),
            max_order: query.max_order,
            window_khz: query.window_khz,
            filter_rejection_db: filter.rejection(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use propviz_core::types::GeoPoint;

    #[test]
    fn test_grid_scene_from_wire() {
        let json = r#"{
            "scene": {"ancho_km": 80.0, "alto_km": 40.0, "frecuencia_Hz": 100000000.0},
            "entities": [
                {"type": "FMTransmitter", "id": "FM_1", "nombre": "FM_1", "x_km": 30.0, "y_km": 15.0,
                 "h_km": 0.1, "potencia_W": 10000.0, "f_Hz": 100000000.0},
                {"type": "Aircraft", "id": "AVION1", "nombre": "Avion", "x_km": 50.0, "y_km": 30.0},
                {"type": "ControlTower", "id": "TWR", "x_km": 60.0, "y_km": 50.0}
            ]
        }"#;
        let scene: Scene = serde_json::from_str::<GridSceneDto>(json).unwrap().into();
        assert_eq!(scene.bounds, SceneBounds::new(80.0, 40.0));
        assert_eq!(scene.entities.len(), 3);

        let fm = scene.find("FM_1").unwrap();
        assert_eq!(fm.kind, EntityKind::Transmitter);
        assert_eq!(fm.position, Position::grid(30.0, 15.0));
        assert!((fm.frequency_mhz.unwrap() - 100.0).abs() < 1e-9);
        // 10 kW = 70 dBm
        assert!((fm.power_dbm.unwrap() - 70.0).abs() < 1e-9);

        assert_eq!(scene.find("AVION1").unwrap().kind, EntityKind::Aircraft);
        assert_eq!(scene.find("TWR").unwrap().label(), "TWR");
    }

    #[test]
    fn test_grid_scene_defaults_bounds() {
        let scene: Scene = serde_json::from_str::<GridSceneDto>(r#"{"entities": []}"#)
            .unwrap()
            .into();
        assert_eq!(
            scene.bounds,
            SceneBounds::new(DEFAULT_SCENE_WIDTH_KM, DEFAULT_SCENE_HEIGHT_KM)
        );
    }

    #[test]
    fn test_scenario_components() {
        let json = r#"{"id": "demo", "name": "Demo", "objetos": [
            {"id": "twr1", "nombre": "Torre SKCG", "tipo": "torre", "lat": 10.4452, "lon": -75.5138,
             "frecuencia_MHz": 118.1, "potencia_dBm": 50},
            {"id": "av1", "nombre": "Avion", "tipo": "avion", "lat": 10.455, "lon": -75.51,
             "frecuencia_MHz": null, "potencia_dBm": null, "heading_deg": 190}
        ]}"#;
        let scene: Scene = serde_json::from_str::<ScenarioDto>(json).unwrap().into();
        let tower = scene.find("twr1").unwrap();
        assert_eq!(tower.kind, EntityKind::ControlTower);
        assert_eq!(tower.power_dbm, Some(50.0));
        let plane = scene.find("av1").unwrap();
        assert_eq!(plane.position, Position::geo(10.455, -75.51));
        assert_eq!(plane.heading_deg, Some(190.0));
        assert_eq!(plane.frequency_mhz, None);
    }

    #[test]
    fn test_move_body_follows_position() {
        let grid = serde_json::to_value(MoveDto::new("fm1", Position::grid(1.5, 2.0))).unwrap();
        assert_eq!(grid, serde_json::json!({"id": "fm1", "x_km": 1.5, "y_km": 2.0}));
        let geo = serde_json::to_value(MoveDto::new("av1", Position::geo(10.0, -75.0))).unwrap();
        assert_eq!(geo, serde_json::json!({"id": "av1", "lat": 10.0, "lon": -75.0}));
    }

    #[test]
    fn test_heatmap_request_body() {
        let query = HeatmapQuery {
            center: GeoPoint::new(10.41, -75.53),
            radius_km: 3.0,
            step_m: 200,
            f_rx_mhz: 118.1,
            window_khz: 150.0,
            transmitters: vec![
                Entity::new("fm2", EntityKind::Transmitter, Position::geo(10.41, -75.52))
                    .with_radio(101.3, 68.0),
                Entity::new("grid", EntityKind::Transmitter, Position::grid(1.0, 1.0))
                    .with_radio(99.0, 60.0),
            ],
        };
        let body = serde_json::to_value(HeatmapRequestDto::new(&query, FilterPreset::Bpf200k)).unwrap();
        assert_eq!(body["center_lat"], 10.41);
        assert_eq!(body["f_rx_MHz"], 118.1);
        assert_eq!(body["window_kHz"], 150.0);
        assert_eq!(body["transmitters"].as_array().unwrap().len(), 1);
        assert_eq!(body["transmitters"][0]["tipo"], "antena");
        assert_eq!(body["transmitters"][0]["potencia_dBm"], 68.0);
        assert_eq!(body["filter_rejection_dB"]["200"], 45.0);
    }

    #[test]
    fn test_notch_preset_has_center() {
        let value = FilterPreset::NotchFm100.rejection();
        assert_eq!(value["center_MHz"], 100.0);
        assert_eq!(value["curve"]["0"], 80.0);
    }

    #[test]
    fn test_heatmap_response_points() {
        let json = r#"{"points": [{"lat": 10.4, "lon": -75.5, "score_dBm": -72.5}], "grid_step_m": 200}"#;
        let points = serde_json::from_str::<HeatmapResponseDto>(json)
            .unwrap()
            .into_points();
        assert_eq!(points, vec![HeatPoint::new(Position::geo(10.4, -75.5), -72.5)]);
    }

    #[test]
    fn test_interference_request_body() {
        let query = InterferenceQuery {
            receiver: Entity::new("av1", EntityKind::Aircraft, Position::geo(10.455, -75.51))
                .with_heading(190.0),
            transmitters: vec![
                Entity::new("fm2", EntityKind::Transmitter, Position::geo(10.41, -75.52))
                    .with_radio(101.3, 68.0),
                Entity::new("grid", EntityKind::Transmitter, Position::grid(1.0, 1.0))
                    .with_radio(99.0, 60.0),
            ],
            f_rx_mhz: 118.1,
            window_khz: 500.0,
            max_order: 3,
        };
        let body =
            serde_json::to_value(InterferenceRequestDto::new(&query, FilterPreset::NotchFm100).unwrap())
                .unwrap();
        assert_eq!(body["receiver"]["id"], "av1");
        assert_eq!(body["receiver"]["tipo"], "receptor");
        assert_eq!(body["receiver"]["frecuencia_MHz"], 118.1);
        assert_eq!(body["transmitters"].as_array().unwrap().len(), 1);
        assert_eq!(body["transmitters"][0]["frecuencia_MHz"], 101.3);
        assert_eq!(body["max_order"], 3);
        assert_eq!(body["window_kHz"], 500.0);
        assert_eq!(body["filter_rejection_dB"]["center_MHz"], 100.0);

        let grid_rx = InterferenceQuery {
            receiver: Entity::new("rx", EntityKind::Receiver, Position::grid(2.0, 2.0)),
            ..query
        };
        assert_eq!(
            InterferenceRequestDto::new(&grid_rx, FilterPreset::default()).unwrap_err(),
            "rx"
        );
    }

    #[test]
    fn test_los_request_needs_geo_endpoints() {
        let tx = Entity::new("tx", EntityKind::Transmitter, Position::geo(10.0, -75.0));
        let rx = Entity::new("rx", EntityKind::Receiver, Position::grid(1.0, 1.0));
        let query = ProfileQuery {
            tx: tx.clone(),
            rx,
            frequency_mhz: 118.1,
            k_factor: 1.33,
            samples: 128,
        };
        assert_eq!(LosRequestDto::new(&query).unwrap_err(), "rx");

        let ok = ProfileQuery {
            rx: Entity::new("rx", EntityKind::Receiver, Position::geo(10.1, -75.0)),
            ..query
        };
        let body = serde_json::to_value(LosRequestDto::new(&ok).unwrap()).unwrap();
        assert_eq!(body["frecuencia_MHz"], 118.1);
        assert_eq!(body["samples"], 128);
        assert_eq!(body["rx"]["tipo"], "receptor");
    }
}
