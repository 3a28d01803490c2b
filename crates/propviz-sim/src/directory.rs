//! Owned scene state and per-entity control leases.
//!
//! All position writes go through [`EntityDirectory`]. A writer must hold
//! the entity's [`ControlToken`]; at most one token exists per entity, so
//! a drag and a playback tick can never write the same entity.

use std::collections::HashMap;

use tracing::debug;

use propviz_core::enums::{ControlHolder, EntityKind};
use propviz_core::error::PreconditionError;
use propviz_core::types::{Entity, GeoPoint, Position, Scene};

/// Write lease on one entity's position. Not `Clone`: returning it to the
/// directory is the only way to give the lease up.
#[derive(Debug, PartialEq, Eq)]
pub struct ControlToken {
    entity_id: String,
    holder: ControlHolder,
}

impl ControlToken {
    pub fn entity_id(&self) -> &str {
        &self.entity_id
    }

    pub fn holder(&self) -> ControlHolder {
        self.holder
    }
}

/// Lookup and mutation surface used by the drag controller and the
/// playback scheduler.
pub trait EntityDirectory {
    fn find(&self, id: &str) -> Option<&Entity>;

    /// Entity animated by playback: `preferred` if present, else the first aircraft.
    fn moving_entity(&self, preferred: &str) -> Option<&Entity>;

    /// Take the write lease on `id`. Fails if the entity is unknown or already leased.
    fn acquire(&mut self, id: &str, holder: ControlHolder) -> Result<ControlToken, PreconditionError>;

    /// Give a lease back.
    fn release(&mut self, token: ControlToken);

    fn holder(&self, id: &str) -> Option<ControlHolder>;

    /// Write a dragged position. Grid positions are clamped to the scene
    /// bounds; the applied position is returned.
    fn apply_drag(&mut self, token: &ControlToken, position: Position) -> Result<Position, PreconditionError>;

    /// Write a playback position and glyph heading.
    fn apply_playback(
        &mut self,
        token: &ControlToken,
        position: GeoPoint,
        heading_deg: f64,
    ) -> Result<(), PreconditionError>;
}

#[derive(Debug, Default)]
pub struct SceneDirectory {
    scene: Option<Scene>,
    leases: HashMap<String, ControlHolder>,
    revision: u64,
}

impl SceneDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scene(&self) -> Option<&Scene> {
        self.scene.as_ref()
    }

    /// Bumped on every mutation; observers compare it to decide whether to re-render.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Install a scene fetched from the backend or loaded from a scenario.
    /// Leases on entities that no longer exist are dropped.
    pub fn load(&mut self, scene: Scene) {
        self.leases
            .retain(|id, _| scene.entities.iter().any(|e| &e.id == id));
        debug!(entities = scene.entities.len(), "scene loaded");
        self.scene = Some(scene);
        self.revision += 1;
    }

    /// Remove an entity. Rejected while it is leased.
    pub fn delete(&mut self, id: &str) -> Result<Entity, PreconditionError> {
        if let Some(holder) = self.leases.get(id) {
            return Err(PreconditionError::ControlHeld {
                id: id.to_string(),
                holder: *holder,
            });
        }
        let scene = self.scene.as_mut().ok_or(PreconditionError::NoScene)?;
        let idx = scene
            .entities
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| PreconditionError::UnknownEntity(id.to_string()))?;
        self.revision += 1;
        Ok(scene.entities.remove(idx))
    }

    /// Transmitters the backend can model: emitters with both frequency and power set.
    pub fn transmitters(&self) -> Vec<Entity> {
        self.scene
            .iter()
            .flat_map(|s| s.entities.iter())
            .filter(|e| {
                e.kind.is_emitter()
                    && e.kind != EntityKind::Aircraft
                    && e.frequency_mhz.is_some()
                    && e.power_dbm.is_some()
            })
            .cloned()
            .collect()
    }

    fn entity_for(&mut self, token: &ControlToken) -> Result<&mut Entity, PreconditionError> {
        match self.leases.get(&token.entity_id) {
            Some(h) if *h == token.holder => {}
            Some(h) => {
                return Err(PreconditionError::ControlHeld {
                    id: token.entity_id.clone(),
                    holder: *h,
                })
            }
            None => return Err(PreconditionError::UnknownEntity(token.entity_id.clone())),
        }
        self.scene
            .as_mut()
            .and_then(|s| s.find_mut(&token.entity_id))
            .ok_or_else(|| PreconditionError::UnknownEntity(token.entity_id.clone()))
    }
}

impl EntityDirectory for SceneDirectory {
    fn find(&self, id: &str) -> Option<&Entity> {
        self.scene.as_ref()?.find(id)
    }

    fn moving_entity(&self, preferred: &str) -> Option<&Entity> {
        let scene = self.scene.as_ref()?;
        scene
            .find(preferred)
            .or_else(|| scene.first_of(EntityKind::Aircraft))
    }

    fn acquire(&mut self, id: &str, holder: ControlHolder) -> Result<ControlToken, PreconditionError> {
        if self.find(id).is_none() {
            return Err(PreconditionError::UnknownEntity(id.to_string()));
        }
        if let Some(current) = self.leases.get(id) {
            return Err(PreconditionError::ControlHeld {
                id: id.to_string(),
                holder: *current,
            });
        }
        self.leases.insert(id.to_string(), holder);
        debug!(id, ?holder, "control acquired");
        Ok(ControlToken {
            entity_id: id.to_string(),
            holder,
        })
    }

    fn release(&mut self, token: ControlToken) {
        if self.leases.get(&token.entity_id) == Some(&token.holder) {
            self.leases.remove(&token.entity_id);
            debug!(id = %token.entity_id, holder = ?token.holder, "control released");
        }
    }

    fn holder(&self, id: &str) -> Option<ControlHolder> {
        self.leases.get(id).copied()
    }

    fn apply_drag(&mut self, token: &ControlToken, position: Position) -> Result<Position, PreconditionError> {
        if !position.is_finite() {
            return Err(PreconditionError::NonFinitePosition);
        }
        let bounds = self
            .scene
            .as_ref()
            .map(|s| s.bounds)
            .ok_or(PreconditionError::NoScene)?;
        let entity = self.entity_for(token)?;
        let applied = match (entity.position, position) {
            (Position::Grid(_), Position::Grid(p)) => Position::Grid(bounds.clamp(p)),
            (Position::Geo(_), Position::Geo(p)) => Position::Geo(p),
            _ => return Err(PreconditionError::WrongCoordinateMode),
        };
        entity.position = applied;
        self.revision += 1;
        Ok(applied)
    }

    fn apply_playback(
        &mut self,
        token: &ControlToken,
        position: GeoPoint,
        heading_deg: f64,
    ) -> Result<(), PreconditionError> {
        if !position.is_finite() {
            return Err(PreconditionError::NonFinitePosition);
        }
        let entity = self.entity_for(token)?;
        if entity.position.as_geo().is_none() {
            return Err(PreconditionError::WrongCoordinateMode);
        }
        entity.position = Position::Geo(position);
        entity.heading_deg = Some(heading_deg);
        self.revision += 1;
        Ok(())
    }
}
