//! Rendering for propviz.
//!
//! Everything here is pure: inputs are scene data plus the active
//! coordinate transform, outputs are rasters, draw lists and path data
//! that a presentation layer blits or strokes as-is.

pub mod heatmap;
pub mod profile;
pub mod raster;
pub mod scene_layer;

pub use heatmap::{DrawOutcome, HeatBand, HeatmapCompositor, HeatmapParams};
pub use profile::{ProfileLayout, ProfilePaths};
pub use raster::Raster;
pub use scene_layer::{DrawList, Glyph, LineKind, SceneLine};
