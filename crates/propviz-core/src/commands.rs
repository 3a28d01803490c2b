//! Operator commands sent from the input layer to the engine.
//!
//! Commands are queued and processed in order at the next engine step.

use serde::{Deserialize, Serialize};

use crate::types::{AirwaySet, GeoPoint, Scene};

/// All possible operator actions.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClientCommand {
    // --- Pointer ---
    /// Pointer pressed on an entity glyph. Coordinates are raw client coordinates.
    PointerDown {
        entity_id: String,
        pointer_id: i32,
        client_x: f64,
        client_y: f64,
    },
    PointerMove {
        pointer_id: i32,
        client_x: f64,
        client_y: f64,
    },
    PointerUp {
        pointer_id: i32,
        client_x: f64,
        client_y: f64,
    },
    PointerCancel { pointer_id: i32 },

    // --- Surface ---
    /// Rendering surface resized (px).
    Resize { width: f64, height: f64 },
    /// Surface's on-screen transform changed, as an SVG-style `[a b c d e f]` matrix.
    SetSurfaceTransform { matrix: [f64; 6] },
    /// Map recentered or zoomed.
    SetMapView { center: GeoPoint, zoom: f64 },
    /// Show or hide the transmitter-to-aircraft lines.
    ToggleLines,

    // --- Scene ---
    /// Re-fetch scene and statistics from the backend.
    Refresh,
    /// Replace the scene wholesale (scenario load).
    ReplaceScene { scene: Scene },
    DeleteEntity { id: String },

    // --- Routes ---
    LoadRoute { points: Vec<GeoPoint> },
    LoadAirways { airways: AirwaySet },
    StartPlayback { speed: f64, snap: bool },
    PausePlayback,

    // --- Heatmap ---
    RequestHeatmap {
        center: GeoPoint,
        radius_km: f64,
        step_m: u32,
        f_rx_mhz: f64,
        window_khz: f64,
    },
    SetHeatOpacity { max_alpha: f64 },
    ClearHeatmap,

    // --- Line of sight ---
    RequestProfile {
        tx_id: String,
        rx_id: String,
        frequency_mhz: f64,
        k_factor: f64,
    },

    // --- Interference ---
    /// Analyse carriers and intermodulation products reaching `receiver_id`
    /// when tuned to `f_rx_mhz`.
    RequestInterference {
        receiver_id: String,
        f_rx_mhz: f64,
        window_khz: f64,
        max_order: u32,
    },
}
