//! Geometry for propviz.
//!
//! Domain-to-screen transforms for the km grid and the geographic map,
//! the surface transform used to localize pointer input, great-circle
//! bearings, airway snapping and route/airway file loading.

pub use propviz_core as core;

pub mod bearing;
pub mod projection;
pub mod snap;
pub mod surface;
pub mod tracks;
pub mod transform;

// Re-export key types for convenience.
pub use bearing::{glyph_heading_deg, initial_bearing_deg};
pub use projection::LocalFrame;
pub use snap::RouteSnapper;
pub use surface::SurfaceTransform;
pub use transform::{CoordinateTransform, GridTransform, MapTransform, SceneTransform};
