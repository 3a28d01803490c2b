//! Backend traffic as data.
//!
//! The engine never performs I/O. It queues [`BackendRequest`]s in its
//! outbox; whoever owns the network answers each one with a
//! [`BackendReply`] fed back through `ClientEngine::apply_reply`.

use serde::{Deserialize, Serialize};

use propviz_core::error::BackendError;
use propviz_core::results::{InterferenceResult, LosProfile, StatsOverview};
use propviz_core::types::{Entity, GeoPoint, HeatPoint, Position, Scene};

/// Signal-level field request around a center.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HeatmapQuery {
    pub center: GeoPoint,
    pub radius_km: f64,
    pub step_m: u32,
    pub f_rx_mhz: f64,
    pub window_khz: f64,
    pub transmitters: Vec<Entity>,
}

/// Terrain profile request between two entities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileQuery {
    pub tx: Entity,
    pub rx: Entity,
    pub frequency_mhz: f64,
    pub k_factor: f64,
    pub samples: u32,
}

/// Carrier and intermodulation analysis at one receiver.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterferenceQuery {
    pub receiver: Entity,
    /// Every modelled transmitter except the receiver itself.
    pub transmitters: Vec<Entity>,
    pub f_rx_mhz: f64,
    pub window_khz: f64,
    pub max_order: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BackendRequest {
    FetchScene,
    FetchStats,
    CommitMove {
        id: String,
        position: Position,
        /// Position before the drag, restored if the commit fails and rollback is enabled.
        previous: Position,
    },
    Heatmap(HeatmapQuery),
    Profile(ProfileQuery),
    Interference(InterferenceQuery),
}

impl BackendRequest {
    /// Short name for logs and notices.
    pub fn label(&self) -> &'static str {
        match self {
            BackendRequest::FetchScene => "scene",
            BackendRequest::FetchStats => "stats",
            BackendRequest::CommitMove { .. } => "entity/move",
            BackendRequest::Heatmap(_) => "radio/heatmap",
            BackendRequest::Profile(_) => "radio/los",
            BackendRequest::Interference(_) => "radio/interference",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum BackendReply {
    Scene(Result<Scene, BackendError>),
    Stats(Result<StatsOverview, BackendError>),
    MoveCommitted {
        id: String,
        previous: Position,
        result: Result<(), BackendError>,
    },
    Heatmap(Result<Vec<HeatPoint>, BackendError>),
    Profile(Result<LosProfile, BackendError>),
    Interference {
        receiver_id: String,
        result: Result<InterferenceResult, BackendError>,
    },
}
