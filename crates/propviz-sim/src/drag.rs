//! DragController: pointer-driven repositioning of one entity at a time.
//!
//! `Idle -> Dragging -> Idle`. Positions are derived from the pixel delta
//! since the press, applied to the position at press time through the
//! active transform's inverse scale. Every move is written through the
//! directory immediately; the backend only hears about the final position.

use glam::DVec2;
use tracing::debug;

use propviz_core::enums::{ControlHolder, DragPhase};
use propviz_core::error::PreconditionError;
use propviz_core::types::{Position, ScreenPoint};
use propviz_geo::{CoordinateTransform, SurfaceTransform};

use crate::directory::{ControlToken, EntityDirectory};

/// Pointer capture on the rendering surface.
pub trait PointerSurface {
    fn capture_pointer(&mut self, pointer_id: i32);
    fn release_pointer(&mut self, pointer_id: i32);
}

/// Surface that does not track capture (headless use).
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessSurface;

impl PointerSurface for HeadlessSurface {
    fn capture_pointer(&mut self, _pointer_id: i32) {}
    fn release_pointer(&mut self, _pointer_id: i32) {}
}

#[derive(Debug)]
pub struct DragSession {
    pub entity_id: String,
    pub pointer_id: i32,
    pub start_screen: ScreenPoint,
    pub start_position: Position,
    token: ControlToken,
}

/// Final position to persist after a drag.
#[derive(Debug, Clone, PartialEq)]
pub struct CommitRequest {
    pub id: String,
    pub position: Position,
    pub previous: Position,
}

#[derive(Debug, Default)]
pub struct DragController {
    session: Option<DragSession>,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn phase(&self) -> DragPhase {
        if self.session.is_some() {
            DragPhase::Dragging
        } else {
            DragPhase::Idle
        }
    }

    pub fn session(&self) -> Option<&DragSession> {
        self.session.as_ref()
    }

    pub fn active_entity(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.entity_id.as_str())
    }

    /// Start dragging `entity_id` with the pointer pressed at client coordinates `client`.
    pub fn begin_drag<D, S>(
        &mut self,
        directory: &mut D,
        surface: &mut S,
        surface_transform: &SurfaceTransform,
        entity_id: &str,
        pointer_id: i32,
        client: DVec2,
    ) -> Result<(), PreconditionError>
    where
        D: EntityDirectory + ?Sized,
        S: PointerSurface + ?Sized,
    {
        if let Some(active) = &self.session {
            return Err(PreconditionError::DragActive(active.entity_id.clone()));
        }
        let start_position = directory
            .find(entity_id)
            .map(|e| e.position)
            .ok_or_else(|| PreconditionError::UnknownEntity(entity_id.to_string()))?;
        let token = directory.acquire(entity_id, ControlHolder::Drag)?;

        surface.capture_pointer(pointer_id);
        let start_screen = surface_transform.screen_to_local(client);
        debug!(id = entity_id, pointer_id, "drag started");
        self.session = Some(DragSession {
            entity_id: entity_id.to_string(),
            pointer_id,
            start_screen,
            start_position,
            token,
        });
        Ok(())
    }

    /// Apply a pointer move. `None` when idle or for a foreign pointer;
    /// otherwise the applied (clamped) position or why it was refused.
    pub fn on_move<D, T>(
        &mut self,
        directory: &mut D,
        transform: &T,
        surface_transform: &SurfaceTransform,
        pointer_id: i32,
        client: DVec2,
    ) -> Option<Result<Position, PreconditionError>>
    where
        D: EntityDirectory + ?Sized,
        T: CoordinateTransform + ?Sized,
    {
        let session = self.session.as_ref().filter(|s| s.pointer_id == pointer_id)?;
        let delta = surface_transform.screen_to_local(client) - session.start_screen;
        let result = transform
            .offset(&session.start_position, delta)
            .ok_or(PreconditionError::WrongCoordinateMode)
            .and_then(|candidate| directory.apply_drag(&session.token, candidate));
        Some(result)
    }

    /// Release the pointer and end the session. Returns the position to
    /// commit, read back from the directory.
    pub fn end_drag<D, S>(
        &mut self,
        directory: &mut D,
        surface: &mut S,
        pointer_id: i32,
    ) -> Option<CommitRequest>
    where
        D: EntityDirectory + ?Sized,
        S: PointerSurface + ?Sized,
    {
        if self.session.as_ref()?.pointer_id != pointer_id {
            return None;
        }
        let session = self.session.take()?;
        surface.release_pointer(session.pointer_id);
        let position = directory.find(&session.entity_id).map(|e| e.position);
        directory.release(session.token);
        debug!(id = %session.entity_id, "drag ended");

        position.map(|position| CommitRequest {
            id: session.entity_id,
            position,
            previous: session.start_position,
        })
    }

    /// Abandon the session without committing. The entity keeps its last applied position.
    pub fn cancel_drag<D, S>(&mut self, directory: &mut D, surface: &mut S) -> Option<String>
    where
        D: EntityDirectory + ?Sized,
        S: PointerSurface + ?Sized,
    {
        let session = self.session.take()?;
        surface.release_pointer(session.pointer_id);
        directory.release(session.token);
        debug!(id = %session.entity_id, "drag cancelled");
        Some(session.entity_id)
    }
}
