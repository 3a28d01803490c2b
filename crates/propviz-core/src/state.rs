//! Client state snapshot, published after each engine step.

use serde::{Deserialize, Serialize};

use crate::enums::{CoordinateMode, DragPhase, PlaybackState};
use crate::events::{ClientEvent, Notice};
use crate::results::{InterferenceTables, LosProfile, StatsOverview};
use crate::types::Scene;

/// Complete visible state after an engine step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClientSnapshot {
    pub step: u64,
    pub mode: CoordinateMode,
    pub scene: Option<Scene>,
    pub drag: DragView,
    pub playback: PlaybackView,
    pub heatmap: HeatmapView,
    pub stats: Option<StatsOverview>,
    pub profile: Option<LosProfile>,
    pub interference: Option<InterferenceTables>,
    pub show_lines: bool,
    pub notices: Vec<Notice>,
    pub events: Vec<ClientEvent>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DragView {
    pub phase: DragPhase,
    pub entity_id: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlaybackView {
    pub state: PlaybackState,
    pub index: usize,
    pub route_len: usize,
    pub snap: bool,
    pub speed: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HeatmapView {
    /// Samples held for redraw, 0 when nothing is cached.
    pub cached_samples: usize,
    pub max_alpha: f64,
    pub radius_px: u32,
    /// A draw is waiting for a non-empty surface.
    pub deferred: bool,
    /// Non-transparent pixels in the current raster.
    pub painted_pixels: usize,
}
