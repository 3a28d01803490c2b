//! Error taxonomy shared by the engine and the application layer.
//!
//! Transform degeneracies are clamped and never appear here.

use thiserror::Error;

use crate::enums::ControlHolder;

/// A requested action cannot proceed. Reported immediately to the operator.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PreconditionError {
    #[error("no entity with id '{0}'")]
    UnknownEntity(String),
    #[error("a drag on '{0}' is already in progress")]
    DragActive(String),
    #[error("entity '{id}' is controlled by {holder:?}")]
    ControlHeld { id: String, holder: ControlHolder },
    #[error("route needs at least 2 points, got {0}")]
    RouteTooShort(usize),
    #[error("no moving entity to animate")]
    NoMovingEntity,
    #[error("select a transmitter and a receiver")]
    MissingSelection,
    #[error("no transmitter with frequency and power set")]
    NoTransmitters,
    #[error("position is not finite")]
    NonFinitePosition,
    #[error("position does not match the active coordinate mode")]
    WrongCoordinateMode,
    #[error("no scene loaded")]
    NoScene,
}

/// Failure talking to the physics backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    #[error("{path} -> HTTP {status}: {body}")]
    Status {
        path: String,
        status: u16,
        body: String,
    },
    #[error("{path}: transport error: {message}")]
    Transport { path: String, message: String },
    #[error("{path}: invalid response: {message}")]
    Decode { path: String, message: String },
    #[error("{path}: cannot encode request: {message}")]
    Encode { path: String, message: String },
}
