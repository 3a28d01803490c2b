//! Interaction engine for propviz.
//!
//! Owns the scene directory, the drag controller, the playback scheduler
//! and the heatmap compositor, processes operator commands and produces
//! `ClientSnapshot`s. Completely headless: backend traffic leaves through
//! an outbox of requests and comes back as replies, so every interaction
//! path is testable without a network.

pub mod directory;
pub mod drag;
pub mod engine;
pub mod playback;
pub mod requests;

pub use propviz_core as core;
pub use directory::{ControlToken, EntityDirectory, SceneDirectory};
pub use drag::{CommitRequest, DragController, PointerSurface};
pub use engine::{ClientEngine, EngineConfig};
pub use playback::PlaybackScheduler;
pub use requests::{BackendReply, BackendRequest, HeatmapQuery, InterferenceQuery, ProfileQuery};
