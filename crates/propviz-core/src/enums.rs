//! Enumeration types used throughout the client.

use serde::{Deserialize, Serialize};

/// What an entity represents on the scene.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    /// Broadcast or generic transmitter (FM antenna and the like).
    #[default]
    Transmitter,
    ControlTower,
    /// The moving entity animated by playback.
    Aircraft,
    Receiver,
}

impl EntityKind {
    /// Whether the backend treats this kind as a signal source.
    pub fn is_emitter(&self) -> bool {
        !matches!(self, EntityKind::Receiver)
    }
}

/// Which coordinate convention the scene is displayed in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum CoordinateMode {
    /// Abstract km rectangle.
    #[default]
    Grid,
    /// Latitude/longitude on a Web-Mercator map.
    Map,
}

/// Drag controller state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum DragPhase {
    #[default]
    Idle,
    Dragging,
}

/// Playback scheduler state. A paused scheduler reports `Stopped`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackState {
    #[default]
    Stopped,
    Playing,
}

/// Why playback stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// Operator pressed pause.
    Paused,
    /// The index reached the last segment.
    RouteEnd,
    /// No moving entity existed when a tick fired.
    NoMovingEntity,
    /// The moving entity is under another controller (a drag).
    ControlHeld,
    /// The moving entity has a km-grid position and cannot follow a geographic route.
    WrongCoordinateMode,
}

/// Severity of an operator-visible notice.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum NoticeLevel {
    #[default]
    Info,
    Warning,
    Error,
}

/// Who holds the write lease on an entity's position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControlHolder {
    Drag,
    Playback,
}
