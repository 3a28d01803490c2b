//! Snapping points onto airway geometry.
//!
//! Each segment is projected in its own local planar frame; the winner
//! across all segments is the candidate closest to the query point on
//! screen, since the point of snapping is visual.

use propviz_core::types::{Airway, AirwaySet, GeoPoint, Position};

use crate::projection::LocalFrame;
use crate::transform::CoordinateTransform;

/// Closest point to `p` on the segment `a`–`b`.
///
/// The projection parameter is clamped to `[0, 1]`; a zero-length segment
/// returns `a`.
pub fn project_on_segment(p: GeoPoint, a: GeoPoint, b: GeoPoint) -> GeoPoint {
    let frame = LocalFrame::for_segment(a, b);
    let ab = frame.to_local(b);
    let ap = frame.to_local(p);

    let ab2 = ab.length_squared();
    let t = if ab2 > 0.0 {
        (ap.dot(ab) / ab2).clamp(0.0, 1.0)
    } else {
        0.0
    };
    frame.to_geo(ab * t)
}

/// Snaps query points to the nearest segment of the loaded airways.
#[derive(Debug, Clone, Default)]
pub struct RouteSnapper {
    airways: AirwaySet,
}

impl RouteSnapper {
    pub fn new(airways: AirwaySet) -> Self {
        Self { airways }
    }

    /// Replace the reference geometry.
    pub fn set_airways(&mut self, airways: AirwaySet) {
        self.airways = airways;
    }

    pub fn airways(&self) -> &[Airway] {
        &self.airways
    }

    pub fn is_empty(&self) -> bool {
        self.airways.iter().all(|a| a.points.len() < 2)
    }

    /// Nearest on-airway point to `p`, compared in screen pixels.
    ///
    /// Returns `p` unchanged when no airways are loaded or the transform
    /// cannot place geographic points.
    pub fn snap<T>(&self, p: GeoPoint, transform: &T) -> GeoPoint
    where
        T: CoordinateTransform + ?Sized,
    {
        let Some(query_px) = transform.to_screen(&Position::Geo(p)) else {
            return p;
        };

        let mut best: Option<(f64, GeoPoint)> = None;
        for airway in &self.airways {
            for (a, b) in airway.segments() {
                let q = project_on_segment(p, a, b);
                let Some(q_px) = transform.to_screen(&Position::Geo(q)) else {
                    continue;
                };
                let d2 = query_px.distance_squared(q_px);
                if best.is_none_or(|(best_d2, _)| d2 < best_d2) {
                    best = Some((d2, q));
                }
            }
        }

        best.map_or(p, |(_, q)| q)
    }
}
