//! Events emitted by the engine for UI feedback.

use serde::{Deserialize, Serialize};

use crate::enums::{NoticeLevel, StopReason};
use crate::types::Position;

/// Things that happened during an engine step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// A drag started on an entity.
    DragStarted { id: String },
    /// Live position update from a drag or playback tick.
    EntityMoved { id: String, position: Position },
    /// Drag released; a commit request was issued.
    DragEnded { id: String, position: Position },
    /// Backend acknowledged a moved position.
    MoveCommitted { id: String },
    PlaybackStarted { index: usize },
    PlaybackStopped { index: usize, reason: StopReason },
    /// Heatmap raster redrawn with the given sample count.
    HeatmapDrawn { samples: usize },
    HeatmapCleared,
    SceneLoaded { entities: usize },
    StatsRefreshed,
    ProfileReady,
    InterferenceReady { receiver_id: String, items: usize },
    EntityDeleted { id: String },
}

/// Operator-visible, non-fatal message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    /// Engine step at which the notice was raised.
    pub step: u64,
}
