//! Local planar frame: converts between lat/lon and East/North meters.
//!
//! Equirectangular approximation anchored at an origin point, good enough
//! over the length of a single airway segment.

use glam::DVec2;

use propviz_core::constants::EARTH_RADIUS_M;
use propviz_core::types::GeoPoint;

/// East/North frame anchored at a geographic origin.
///
/// The origin maps to (0, 0). x = East, y = North, in meters.
#[derive(Debug, Clone, Copy)]
pub struct LocalFrame {
    origin: GeoPoint,
    /// cos of the reference latitude, scales longitude differences.
    cos_ref_lat: f64,
}

impl LocalFrame {
    /// Frame at `origin` whose longitude scale is taken at `ref_lat` (degrees).
    pub fn new(origin: GeoPoint, ref_lat: f64) -> Self {
        Self {
            origin,
            cos_ref_lat: ref_lat.to_radians().cos(),
        }
    }

    /// Frame anchored at `a`, scaled at the mean latitude of `a` and `b`.
    pub fn for_segment(a: GeoPoint, b: GeoPoint) -> Self {
        Self::new(a, (a.lat + b.lat) * 0.5)
    }

    /// Geographic point to local meters.
    pub fn to_local(&self, p: GeoPoint) -> DVec2 {
        DVec2::new(
            (p.lon - self.origin.lon).to_radians() * self.cos_ref_lat * EARTH_RADIUS_M,
            (p.lat - self.origin.lat).to_radians() * EARTH_RADIUS_M,
        )
    }

    /// Local meters back to a geographic point.
    pub fn to_geo(&self, v: DVec2) -> GeoPoint {
        let lat = self.origin.lat + (v.y / EARTH_RADIUS_M).to_degrees();
        let lon = if self.cos_ref_lat.abs() > f64::EPSILON {
            self.origin.lon + (v.x / (EARTH_RADIUS_M * self.cos_ref_lat)).to_degrees()
        } else {
            self.origin.lon
        };
        GeoPoint::new(lat, lon)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_frame_roundtrip() {
        let frame = LocalFrame::new(GeoPoint::new(10.42, -75.52), 10.43);
        let p = GeoPoint::new(10.455, -75.51);

        let v = frame.to_local(p);
        let back = frame.to_geo(v);

        assert!((p.lat - back.lat).abs() < 1e-10, "lat roundtrip: {} vs {}", p.lat, back.lat);
        assert!((p.lon - back.lon).abs() < 1e-10, "lon roundtrip: {} vs {}", p.lon, back.lon);
    }

    #[test]
    fn test_local_frame_distances() {
        // At the equator one degree spans R * pi / 180 ≈ 111,195 m
        let frame = LocalFrame::new(GeoPoint::new(0.0, 0.0), 0.0);
        let one_deg = EARTH_RADIUS_M * std::f64::consts::PI / 180.0;

        let v = frame.to_local(GeoPoint::new(1.0, 0.0));
        assert!((v.y - one_deg).abs() < 1e-6, "1 degree lat: {} vs {one_deg}", v.y);
        assert!(v.x.abs() < 1e-9, "no east offset");

        let v = frame.to_local(GeoPoint::new(0.0, 1.0));
        assert!((v.x - one_deg).abs() < 1e-6, "1 degree lon: {} vs {one_deg}", v.x);

        // At 60°N longitude shrinks by cos(60°)
        let frame60 = LocalFrame::new(GeoPoint::new(60.0, 0.0), 60.0);
        let v = frame60.to_local(GeoPoint::new(60.0, 1.0));
        assert!((v.x - one_deg * 0.5).abs() < 1e-6, "1 degree lon at 60N: {}", v.x);
    }

    #[test]
    fn test_origin_maps_to_zero() {
        let a = GeoPoint::new(10.42, -75.52);
        let frame = LocalFrame::for_segment(a, GeoPoint::new(10.5, -75.4));
        let v = frame.to_local(a);
        assert!(v.x.abs() < 1e-9);
        assert!(v.y.abs() < 1e-9);
    }
}
