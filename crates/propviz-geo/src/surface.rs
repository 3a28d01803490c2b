//! On-screen transform of the rendering surface.
//!
//! Pointer events arrive in client coordinates; the surface may be panned
//! or zoomed inside its container, so the inverse is taken on every call.

use glam::{DAffine2, DVec2};

use propviz_core::types::ScreenPoint;

/// Determinant below which the surface transform is treated as collapsed.
const MIN_DETERMINANT: f64 = 1e-12;

/// Surface-local to client affine transform (the SVG "screen CTM").
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SurfaceTransform {
    ctm: DAffine2,
}

impl Default for SurfaceTransform {
    fn default() -> Self {
        Self {
            ctm: DAffine2::IDENTITY,
        }
    }
}

impl SurfaceTransform {
    pub fn new(ctm: DAffine2) -> Self {
        Self { ctm }
    }

    /// From an SVG-style `[a b c d e f]` matrix:
    /// `x' = a*x + c*y + e`, `y' = b*x + d*y + f`.
    pub fn from_matrix(m: [f64; 6]) -> Self {
        Self::new(DAffine2::from_cols_array(&m))
    }

    /// Uniform zoom followed by a pan, in client pixels.
    pub fn from_pan_zoom(pan: DVec2, zoom: f64) -> Self {
        Self::new(DAffine2::from_translation(pan) * DAffine2::from_scale(DVec2::splat(zoom)))
    }

    pub fn ctm(&self) -> DAffine2 {
        self.ctm
    }

    /// Raw client coordinates to surface-local pixels.
    ///
    /// A collapsed (non-invertible) transform passes coordinates through.
    pub fn screen_to_local(&self, client: DVec2) -> ScreenPoint {
        let det = self.ctm.matrix2.determinant();
        if !det.is_finite() || det.abs() < MIN_DETERMINANT {
            return client;
        }
        self.ctm.inverse().transform_point2(client)
    }

    /// Surface-local pixels to client coordinates.
    pub fn local_to_screen(&self, local: ScreenPoint) -> DVec2 {
        self.ctm.transform_point2(local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_passes_through() {
        let s = SurfaceTransform::default();
        assert_eq!(s.screen_to_local(DVec2::new(12.0, 34.0)), DVec2::new(12.0, 34.0));
    }

    #[test]
    fn test_pan_zoom_inverse() {
        let s = SurfaceTransform::from_pan_zoom(DVec2::new(100.0, 50.0), 2.0);
        let local = DVec2::new(30.0, 40.0);
        let client = s.local_to_screen(local);
        assert_eq!(client, DVec2::new(160.0, 130.0));
        let back = s.screen_to_local(client);
        assert!((back - local).length() < 1e-9);
    }

    #[test]
    fn test_svg_matrix_layout() {
        // Pure translation by (e, f)
        let s = SurfaceTransform::from_matrix([1.0, 0.0, 0.0, 1.0, 8.0, -4.0]);
        assert_eq!(s.screen_to_local(DVec2::new(10.0, 10.0)), DVec2::new(2.0, 14.0));
        // 90° rotation: x' = -y, y' = x
        let r = SurfaceTransform::from_matrix([0.0, 1.0, -1.0, 0.0, 0.0, 0.0]);
        assert_eq!(r.local_to_screen(DVec2::new(1.0, 0.0)), DVec2::new(0.0, 1.0));
        let back = r.screen_to_local(DVec2::new(0.0, 1.0));
        assert!((back - DVec2::new(1.0, 0.0)).length() < 1e-12);
    }

    #[test]
    fn test_collapsed_transform_is_ignored() {
        let s = SurfaceTransform::from_matrix([0.0, 0.0, 0.0, 0.0, 5.0, 5.0]);
        assert_eq!(s.screen_to_local(DVec2::new(7.0, 9.0)), DVec2::new(7.0, 9.0));
    }
}
