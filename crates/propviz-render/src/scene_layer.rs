//! Scene draw list: grid, sight lines, route track and entity glyphs.
//!
//! Rebuilt from scratch whenever the scene or the transform changes;
//! "re-render" in the engine means exactly that.

use glam::DVec2;
use serde::{Deserialize, Serialize};

use propviz_core::constants::GRID_STEP_KM;
use propviz_core::enums::EntityKind;
use propviz_core::types::{Entity, KmPoint, Position, Route, Scene};
use propviz_geo::{CoordinateTransform, SceneTransform};

/// Label offset from the glyph center (px).
const LABEL_OFFSET: DVec2 = DVec2::new(8.0, -8.0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LineKind {
    Grid,
    /// Transmitter to aircraft.
    LineOfSight,
    Route,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SceneLine {
    pub kind: LineKind,
    pub from: DVec2,
    pub to: DVec2,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Glyph {
    pub id: String,
    pub kind: EntityKind,
    pub center: DVec2,
    pub radius: f64,
    /// Rotation in degrees, East = 0, clockwise.
    pub heading_deg: f64,
    pub label: String,
    pub label_anchor: DVec2,
}

/// Everything the presentation layer draws for one frame, in paint order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DrawList {
    /// Drawing extent in px (grid mode only; zero on the map).
    pub extent: DVec2,
    pub lines: Vec<SceneLine>,
    pub glyphs: Vec<Glyph>,
}

impl DrawList {
    /// Lay out `scene` under `transform`.
    ///
    /// Grid lines every 5 km are drawn only on the km grid. Sight lines run
    /// from every transmitter to the first aircraft when `show_lines` is set.
    /// Entities that do not project under the transform are skipped.
    pub fn build(
        scene: &Scene,
        transform: &SceneTransform,
        show_lines: bool,
        route: Option<&Route>,
    ) -> Self {
        let mut list = DrawList::default();

        if let Some(grid) = transform.as_grid() {
            let b = scene.bounds;
            list.extent = grid.extent_px(b);
            for x in grid_steps(b.width_km) {
                list.push_line(
                    LineKind::Grid,
                    grid.km_to_screen(KmPoint::new(x, 0.0)),
                    grid.km_to_screen(KmPoint::new(x, b.height_km)),
                );
            }
            for y in grid_steps(b.height_km) {
                list.push_line(
                    LineKind::Grid,
                    grid.km_to_screen(KmPoint::new(0.0, y)),
                    grid.km_to_screen(KmPoint::new(b.width_km, y)),
                );
            }
        }

        if let Some(route) = route {
            let pts: Vec<DVec2> = route
                .points
                .iter()
                .filter_map(|p| transform.to_screen(&Position::Geo(*p)))
                .collect();
            for w in pts.windows(2) {
                list.push_line(LineKind::Route, w[0], w[1]);
            }
        }

        let aircraft = scene.first_of(EntityKind::Aircraft);
        if show_lines {
            if let Some(b) = aircraft.and_then(|a| transform.to_screen(&a.position)) {
                for tx in scene.of_kind(EntityKind::Transmitter) {
                    if let Some(a) = transform.to_screen(&tx.position) {
                        list.push_line(LineKind::LineOfSight, a, b);
                    }
                }
            }
        }

        // Paint order: transmitters, towers, receivers, then the aircraft on top
        let order = [
            EntityKind::Transmitter,
            EntityKind::ControlTower,
            EntityKind::Receiver,
            EntityKind::Aircraft,
        ];
        for kind in order {
            for entity in scene.of_kind(kind) {
                if let Some(glyph) = glyph(entity, transform) {
                    list.glyphs.push(glyph);
                }
            }
        }
        list
    }

    fn push_line(&mut self, kind: LineKind, from: DVec2, to: DVec2) {
        self.lines.push(SceneLine { kind, from, to });
    }

    pub fn lines_of(&self, kind: LineKind) -> impl Iterator<Item = &SceneLine> {
        self.lines.iter().filter(move |l| l.kind == kind)
    }

    pub fn glyph(&self, id: &str) -> Option<&Glyph> {
        self.glyphs.iter().find(|g| g.id == id)
    }
}

fn glyph(entity: &Entity, transform: &SceneTransform) -> Option<Glyph> {
    let center = transform.to_screen(&entity.position)?;
    if !center.is_finite() {
        return None;
    }
    let radius = match entity.kind {
        EntityKind::Transmitter | EntityKind::Receiver => 6.0,
        EntityKind::ControlTower | EntityKind::Aircraft => 7.0,
    };
    Some(Glyph {
        id: entity.id.clone(),
        kind: entity.kind,
        center,
        radius,
        heading_deg: entity.heading_deg.unwrap_or(0.0),
        label: entity.label().to_string(),
        label_anchor: center + LABEL_OFFSET,
    })
}

/// `0, 5, 10, ...` up to and including `extent_km`.
fn grid_steps(extent_km: f64) -> impl Iterator<Item = f64> {
    let n = if extent_km.is_finite() && extent_km >= 0.0 {
        (extent_km / GRID_STEP_KM).floor() as usize
    } else {
        0
    };
    (0..=n).map(|i| i as f64 * GRID_STEP_KM)
}

#[cfg(test)]
mod tests {
    use super::*;
    use propviz_core::types::{GeoPoint, SceneBounds, Viewport};
    use propviz_geo::{GridTransform, MapTransform};

    fn scene() -> Scene {
        let mut scene = Scene::new(SceneBounds::new(20.0, 10.0));
        scene.entities = vec![
            Entity::new("av1", EntityKind::Aircraft, Position::grid(10.0, 5.0)).with_name("Plane"),
            Entity::new("fm1", EntityKind::Transmitter, Position::grid(0.0, 0.0)),
            Entity::new("fm2", EntityKind::Transmitter, Position::grid(20.0, 10.0)),
            Entity::new("twr", EntityKind::ControlTower, Position::grid(5.0, 5.0)),
        ];
        scene
    }

    fn grid() -> SceneTransform {
        SceneTransform::Grid(GridTransform::new(10.0, 10.0))
    }

    #[test]
    fn test_grid_lines_every_step() {
        let list = DrawList::build(&scene(), &grid(), false, None);
        // x = 0, 5, 10, 15, 20 and y = 0, 5, 10
        assert_eq!(list.lines_of(LineKind::Grid).count(), 8);
        assert_eq!(list.extent, DVec2::new(200.0, 100.0));
        let first = list.lines[0];
        assert_eq!(first.from, DVec2::new(0.0, 100.0));
        assert_eq!(first.to, DVec2::new(0.0, 0.0));
    }

    #[test]
    fn test_sight_lines_toggle() {
        let hidden = DrawList::build(&scene(), &grid(), false, None);
        assert_eq!(hidden.lines_of(LineKind::LineOfSight).count(), 0);

        let shown = DrawList::build(&scene(), &grid(), true, None);
        let los: Vec<_> = shown.lines_of(LineKind::LineOfSight).collect();
        assert_eq!(los.len(), 2);
        assert!(los.iter().all(|l| l.to == DVec2::new(100.0, 50.0)));
    }

    #[test]
    fn test_no_sight_lines_without_aircraft() {
        let mut s = scene();
        s.entities.retain(|e| e.kind != EntityKind::Aircraft);
        let list = DrawList::build(&s, &grid(), true, None);
        assert_eq!(list.lines_of(LineKind::LineOfSight).count(), 0);
    }

    #[test]
    fn test_glyph_order_and_labels() {
        let list = DrawList::build(&scene(), &grid(), false, None);
        let ids: Vec<_> = list.glyphs.iter().map(|g| g.id.as_str()).collect();
        assert_eq!(ids, ["fm1", "fm2", "twr", "av1"]);

        let plane = list.glyph("av1").unwrap();
        assert_eq!(plane.label, "Plane");
        assert_eq!(plane.center, DVec2::new(100.0, 50.0));
        assert_eq!(plane.label_anchor, DVec2::new(108.0, 42.0));
        assert_eq!(list.glyph("fm1").unwrap().radius, 6.0);
    }

    #[test]
    fn test_map_mode_skips_grid_and_grid_entities() {
        let map = SceneTransform::Map(MapTransform::new(
            GeoPoint::new(10.4, -75.5),
            12.0,
            Viewport::new(800.0, 600.0),
        ));
        let mut s = scene();
        s.entities
            .push(Entity::new("rx", EntityKind::Receiver, Position::geo(10.4, -75.5)).with_heading(45.0));
        let route = Route::new(vec![
            GeoPoint::new(10.40, -75.50),
            GeoPoint::new(10.41, -75.51),
            GeoPoint::new(10.42, -75.52),
        ]);
        let list = DrawList::build(&s, &map, true, Some(&route));
        assert_eq!(list.lines_of(LineKind::Grid).count(), 0);
        assert_eq!(list.lines_of(LineKind::Route).count(), 2);
        assert_eq!(list.glyphs.len(), 1);
        let rx = &list.glyphs[0];
        assert_eq!(rx.heading_deg, 45.0);
        assert!((rx.center - DVec2::new(400.0, 300.0)).length() < 1e-6);
    }

    #[test]
    fn test_grid_steps_include_far_edge() {
        assert_eq!(grid_steps(10.0).collect::<Vec<_>>(), [0.0, 5.0, 10.0]);
        assert_eq!(grid_steps(12.0).collect::<Vec<_>>(), [0.0, 5.0, 10.0]);
        assert_eq!(grid_steps(f64::NAN).collect::<Vec<_>>(), [0.0]);
    }

    #[test]
    fn test_draw_list_serializes() {
        let list = DrawList::build(&scene(), &grid(), true, None);
        let json = serde_json::to_string(&list).unwrap();
        assert!(json.contains("\"LineOfSight\""));
    }
}
