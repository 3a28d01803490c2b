//! Great-circle bearings rebased to the glyph convention.
//!
//! Glyphs are drawn pointing East, so a heading of 0° means East and
//! headings grow clockwise like compass bearings.

use propviz_core::constants::GLYPH_BEARING_OFFSET_DEG;
use propviz_core::types::GeoPoint;

/// Normalize degrees into `[0, 360)`.
pub fn normalize_deg(deg: f64) -> f64 {
    let d = deg.rem_euclid(360.0);
    // rem_euclid rounds tiny negatives up to exactly 360.0
    if d >= 360.0 {
        0.0
    } else {
        d
    }
}

/// Initial great-circle bearing from `from` to `to`, degrees clockwise from North.
pub fn initial_bearing_deg(from: GeoPoint, to: GeoPoint) -> f64 {
    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();
    let d_lon = (to.lon - from.lon).to_radians();

    let y = d_lon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * d_lon.cos();

    normalize_deg(y.atan2(x).to_degrees())
}

/// Compass bearing to glyph rotation (East = 0°).
pub fn rebase_to_glyph(bearing_deg: f64) -> f64 {
    normalize_deg(bearing_deg - GLYPH_BEARING_OFFSET_DEG)
}

/// Glyph heading for travel from `from` to `to`.
pub fn glyph_heading_deg(from: GeoPoint, to: GeoPoint) -> f64 {
    rebase_to_glyph(initial_bearing_deg(from, to))
}
