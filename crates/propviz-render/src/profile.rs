//! Line-of-sight profile view.
//!
//! Maps a backend [`LosProfile`] into a fixed-size chart: terrain, the
//! direct ray, the first Fresnel zone as a closed band, a baseline axis
//! and the path length label.

use std::fmt::Write as _;

use glam::DVec2;

use propviz_core::constants::{
    PROFILE_HEIGHT_PX, PROFILE_PAD_BOTTOM_PX, PROFILE_PAD_LEFT_PX, PROFILE_PAD_RIGHT_PX,
    PROFILE_PAD_TOP_PX, PROFILE_RANGE_EPSILON, PROFILE_WIDTH_PX,
};
use propviz_core::results::LosProfile;

/// Chart size and padding in px.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileLayout {
    pub width: f64,
    pub height: f64,
    pub pad_left: f64,
    pub pad_right: f64,
    pub pad_top: f64,
    pub pad_bottom: f64,
}

impl Default for ProfileLayout {
    fn default() -> Self {
        Self {
            width: PROFILE_WIDTH_PX,
            height: PROFILE_HEIGHT_PX,
            pad_left: PROFILE_PAD_LEFT_PX,
            pad_right: PROFILE_PAD_RIGHT_PX,
            pad_top: PROFILE_PAD_TOP_PX,
            pad_bottom: PROFILE_PAD_BOTTOM_PX,
        }
    }
}

/// Screen-space geometry of a profile chart.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfilePaths {
    pub layout: ProfileLayout,
    pub ground: Vec<DVec2>,
    pub ray: Vec<DVec2>,
    /// Closed polygon: upper Fresnel edge forward, lower edge backward.
    pub fresnel: Vec<DVec2>,
    pub axis: (DVec2, DVec2),
    pub label: String,
    pub label_anchor: DVec2,
}

impl ProfilePaths {
    /// Lay out `profile`. `None` for an empty profile or a non-positive path length.
    pub fn build(profile: &LosProfile, layout: ProfileLayout) -> Option<Self> {
        let distance = profile.distance_m;
        if profile.samples.is_empty() || !distance.is_finite() || distance <= 0.0 {
            return None;
        }

        let (min_v, max_v) = profile
            .samples
            .iter()
            .flat_map(|s| [s.elev_m, s.ray_h_m])
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
                (lo.min(v), hi.max(v))
            });
        let plot_w = layout.width - layout.pad_left - layout.pad_right;
        let plot_h = layout.height - layout.pad_top - layout.pad_bottom;
        let range = max_v - min_v + PROFILE_RANGE_EPSILON;

        let xs = |d: f64| layout.pad_left + d / distance * plot_w;
        let ys = |v: f64| layout.pad_top + (1.0 - (v - min_v) / range) * plot_h;

        let ground = profile
            .samples
            .iter()
            .map(|s| DVec2::new(xs(s.d_m), ys(s.elev_m)))
            .collect();
        let ray = profile
            .samples
            .iter()
            .map(|s| DVec2::new(xs(s.d_m), ys(s.ray_h_m)))
            .collect();
        let fresnel = profile
            .samples
            .iter()
            .map(|s| DVec2::new(xs(s.d_m), ys(s.ray_h_m + s.f1_m)))
            .chain(
                profile
                    .samples
                    .iter()
                    .rev()
                    .map(|s| DVec2::new(xs(s.d_m), ys(s.ray_h_m - s.f1_m))),
            )
            .collect();

        let base_y = layout.height - layout.pad_bottom;
        Some(Self {
            layout,
            ground,
            ray,
            fresnel,
            axis: (
                DVec2::new(layout.pad_left, base_y),
                DVec2::new(layout.width - layout.pad_right, base_y),
            ),
            label: format!("{:.2} km", distance / 1000.0),
            label_anchor: DVec2::new(layout.width - layout.pad_right - 40.0, layout.height - 10.0),
        })
    }

    pub fn ground_path(&self) -> String {
        path_data(&self.ground, false)
    }

    pub fn ray_path(&self) -> String {
        path_data(&self.ray, false)
    }

    pub fn fresnel_path(&self) -> String {
        path_data(&self.fresnel, true)
    }

    /// Standalone SVG document of the chart.
    pub fn to_svg(&self) -> String {
        let l = &self.layout;
        let (a0, a1) = self.axis;
        let mut svg = String::new();
        let _ = writeln!(
            svg,
            r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {} {}">"#,
            l.width, l.height
        );
        let _ = writeln!(
            svg,
            r##"  <path d="{}" stroke="#6b7280" fill="none" stroke-width="1.5"/>"##,
            self.ground_path()
        );
        let _ = writeln!(
            svg,
            r##"  <path d="{}" stroke="#2563eb" fill="none" stroke-width="2"/>"##,
            self.ray_path()
        );
        let _ = writeln!(
            svg,
            r#"  <path d="{}" fill="rgba(37,99,235,0.15)" stroke="none"/>"#,
            self.fresnel_path()
        );
        let _ = writeln!(
            svg,
            r##"  <line x1="{}" y1="{}" x2="{}" y2="{}" stroke="#e5e7eb"/>"##,
            num(a0.x),
            num(a0.y),
            num(a1.x),
            num(a1.y)
        );
        let _ = writeln!(
            svg,
            r##"  <text x="{}" y="{}" fill="#111827" font-size="12">{}</text>"##,
            num(self.label_anchor.x),
            num(self.label_anchor.y),
            self.label
        );
        svg.push_str("</svg>\n");
        svg
    }
}

/// `M x,y L x,y ...`, optionally closed with `Z`.
pub fn path_data(points: &[DVec2], close: bool) -> String {
    let mut d = String::new();
    for (i, p) in points.iter().enumerate() {
        let cmd = if i == 0 { 'M' } else { 'L' };
        let _ = write!(d, "{cmd}{},{}", num(p.x), num(p.y));
    }
    if close && !points.is_empty() {
        d.push('Z');
    }
    d
}

fn num(v: f64) -> String {
    let s = format!("{v:.2}");
    let s = s.trim_end_matches('0').trim_end_matches('.');
    if s == "-0" {
        "0".to_string()
    } else {
        s.to_string()
    }
}
