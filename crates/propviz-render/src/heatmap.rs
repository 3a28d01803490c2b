//! HeatmapCompositor: turns sparse signal-level samples into a colored
//! raster aligned with the current view.
//!
//! Each sample stamps a radial falloff into an alpha-only accumulation
//! buffer; a post-pass maps accumulated alpha to a five-band palette. The
//! last sample set is cached so view changes and opacity edits redraw
//! without another backend round trip.

use serde::{Deserialize, Serialize};

use propviz_core::constants::{
    HEAT_GAMMA, HEAT_LEVEL_CEIL_DBM, HEAT_LEVEL_FLOOR_DBM, HEAT_MAX_ALPHA, HEAT_RADIUS_PX,
};
use propviz_core::types::{HeatPoint, Viewport};
use propviz_geo::CoordinateTransform;

use crate::raster::Raster;

/// Stamp radius and opacity ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatmapParams {
    pub radius_px: u32,
    pub max_alpha: f64,
}

impl Default for HeatmapParams {
    fn default() -> Self {
        Self {
            radius_px: HEAT_RADIUS_PX,
            max_alpha: HEAT_MAX_ALPHA,
        }
    }
}

impl HeatmapParams {
    /// Same radius, different ceiling. Non-finite input falls back to the default ceiling.
    pub fn with_max_alpha(self, max_alpha: f64) -> Self {
        let max_alpha = if max_alpha.is_finite() {
            max_alpha.clamp(0.0, 1.0)
        } else {
            HEAT_MAX_ALPHA
        };
        Self { max_alpha, ..self }
    }
}

/// Per-sample opacity in `[0, 1]` before the ceiling is applied.
pub fn level_to_alpha(level_dbm: f64) -> f64 {
    if level_dbm.is_nan() {
        return 0.0;
    }
    let clamped = level_dbm.clamp(HEAT_LEVEL_FLOOR_DBM, HEAT_LEVEL_CEIL_DBM);
    let t = (clamped - HEAT_LEVEL_FLOOR_DBM) / (HEAT_LEVEL_CEIL_DBM - HEAT_LEVEL_FLOOR_DBM);
    t.powf(HEAT_GAMMA)
}

/// Color band selected by accumulated alpha.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeatBand {
    Green,
    YellowGreen,
    Amber,
    Orange,
    Red,
}

impl HeatBand {
    pub fn for_alpha(a: f64) -> Self {
        if a < 0.25 {
            HeatBand::Green
        } else if a < 0.5 {
            HeatBand::YellowGreen
        } else if a < 0.7 {
            HeatBand::Amber
        } else if a < 0.85 {
            HeatBand::Orange
        } else {
            HeatBand::Red
        }
    }

    pub fn rgb(self) -> [u8; 3] {
        match self {
            HeatBand::Green => [34, 197, 94],
            HeatBand::YellowGreen => [132, 204, 22],
            HeatBand::Amber => [245, 158, 11],
            HeatBand::Orange => [249, 115, 22],
            HeatBand::Red => [239, 68, 68],
        }
    }
}

/// Result of a draw request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrawOutcome {
    /// Raster repainted; `samples` is the number of samples that projected.
    Drawn { samples: usize },
    /// Surface has zero size; the draw is retried on the next frame.
    Deferred,
}

#[derive(Debug, Clone, Default)]
pub struct HeatmapCompositor {
    raster: Raster,
    params: HeatmapParams,
    cache: Option<Vec<HeatPoint>>,
    deferred: bool,
}

impl HeatmapCompositor {
    pub fn new(viewport: Viewport) -> Self {
        let mut compositor = Self::default();
        compositor.resize(viewport);
        compositor
    }

    pub fn with_params(mut self, params: HeatmapParams) -> Self {
        self.params = params.with_max_alpha(params.max_alpha);
        self
    }

    /// Match the raster to the surface. Contents are dropped until the next draw.
    pub fn resize(&mut self, viewport: Viewport) {
        let (w, h) = if viewport.is_empty() {
            (0, 0)
        } else {
            (viewport.width as u32, viewport.height as u32)
        };
        self.raster.resize(w, h);
    }

    /// Cache `points` with `params` and paint them.
    pub fn render<T>(
        &mut self,
        points: Vec<HeatPoint>,
        params: HeatmapParams,
        transform: &T,
    ) -> DrawOutcome
    where
        T: CoordinateTransform + ?Sized,
    {
        self.params = params;
        self.cache = Some(points);
        self.draw(transform)
    }

    /// Repaint the cached samples, e.g. after a resize, pan or zoom.
    /// `None` when nothing is cached.
    pub fn redraw<T>(&mut self, transform: &T) -> Option<DrawOutcome>
    where
        T: CoordinateTransform + ?Sized,
    {
        self.cache.as_ref()?;
        Some(self.draw(transform))
    }

    /// Change the opacity ceiling; the cached samples are repainted with it.
    pub fn set_max_alpha<T>(&mut self, max_alpha: f64, transform: &T) -> Option<DrawOutcome>
    where
        T: CoordinateTransform + ?Sized,
    {
        self.params = self.params.with_max_alpha(max_alpha);
        self.redraw(transform)
    }

    /// Empty the raster and forget the cached samples.
    pub fn clear(&mut self) {
        self.raster.clear();
        self.cache = None;
        self.deferred = false;
    }

    pub fn params(&self) -> HeatmapParams {
        self.params
    }

    pub fn raster(&self) -> &Raster {
        &self.raster
    }

    pub fn cached_samples(&self) -> usize {
        self.cache.as_ref().map_or(0, Vec::len)
    }

    pub fn has_cache(&self) -> bool {
        self.cache.is_some()
    }

    /// A draw is waiting for a non-empty surface.
    pub fn is_deferred(&self) -> bool {
        self.deferred
    }

    fn draw<T>(&mut self, transform: &T) -> DrawOutcome
    where
        T: CoordinateTransform + ?Sized,
    {
        if self.raster.is_empty() {
            self.deferred = true;
            return DrawOutcome::Deferred;
        }
        self.deferred = false;
        self.raster.clear();

        let Some(points) = self.cache.as_ref() else {
            return DrawOutcome::Drawn { samples: 0 };
        };
        let r = self.params.radius_px;
        let kernel = radial_kernel(r);
        let mut drawn = 0;

        for point in points {
            let Some(p) = transform.to_screen(&point.position) else {
                continue;
            };
            if !p.is_finite() {
                continue;
            }
            drawn += 1;
            let alpha = (level_to_alpha(point.level_dbm) * self.params.max_alpha) as f32;
            if alpha <= 0.0 {
                continue;
            }
            let ox = (p.x - f64::from(r)).round() as i64;
            let oy = (p.y - f64::from(r)).round() as i64;
            let side = 2 * r as usize;
            for (j, row) in kernel.chunks_exact(side.max(1)).enumerate() {
                for (i, &k) in row.iter().enumerate() {
                    if k > 0.0 {
                        self.raster.blend(ox + i as i64, oy + j as i64, k * alpha);
                    }
                }
            }
        }

        self.raster.colorize(|a| HeatBand::for_alpha(a).rgb());
        DrawOutcome::Drawn { samples: drawn }
    }
}

/// `2r x 2r` falloff from 1 at the center to 0 at distance `r`, sampled at pixel centers.
fn radial_kernel(r: u32) -> Vec<f32> {
    let side = 2 * r as usize;
    let rf = f64::from(r);
    let mut kernel = Vec::with_capacity(side * side);
    for j in 0..side {
        for i in 0..side {
            let dx = i as f64 + 0.5 - rf;
            let dy = j as f64 + 0.5 - rf;
            let d = dx.hypot(dy);
            kernel.push((1.0 - d / rf).max(0.0) as f32);
        }
    }
    kernel
}
