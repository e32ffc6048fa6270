//! ECS components for the server world.
//!
//! Networked entities carry a [`NetworkId`], a [`Position`] and a
//! [`VisibleRange`]; connected players are entities with a
//! [`PlayerConnection`]. Ownership is an [`OwnedBy`] on the owned entity.

use crate::projection::Vec3;
use crate::roster::PlayerId;
use crate::spatial::EntityId;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

// ============================================================================
// IDENTITY COMPONENTS
// ============================================================================

/// Replication id of a networked entity.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NetworkId(pub EntityId);

/// The player controlling this entity.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OwnedBy(pub PlayerId);

/// A connected client. Only ready players receive subscriptions.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerConnection {
    pub id: PlayerId,
    pub ready: bool,
}

impl PlayerConnection {
    pub fn new(id: PlayerId) -> Self {
        Self { id, ready: false }
    }
}

// ============================================================================
// SPATIAL COMPONENTS
// ============================================================================

/// World-space position.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Position {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn to_vec3(self) -> Vec3 {
        Vec3::new(self.x, self.y, self.z)
    }
}

impl From<Vec3> for Position {
    fn from(v: Vec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

/// Visibility radius in world units.
#[derive(Component, Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VisibleRange(pub f32);

impl Default for VisibleRange {
    fn default() -> Self {
        Self(100.0)
    }
}

// ============================================================================
// RESOURCES
// ============================================================================

/// ECS entity to replication id, for entities indexed in a dynamic grid.
/// Needed to find the id once a [`NetworkId`] has been removed.
#[derive(Resource, Debug, Default)]
pub struct TrackedEntities {
    ids: HashMap<Entity, EntityId>,
}

impl TrackedEntities {
    pub fn insert(&mut self, entity: Entity, id: EntityId) {
        self.ids.insert(entity, id);
    }

    pub fn remove(&mut self, entity: Entity) -> Option<EntityId> {
        self.ids.remove(&entity)
    }

    pub fn get(&self, entity: Entity) -> Option<EntityId> {
        self.ids.get(&entity).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

// ============================================================================
// BUNDLES
// ============================================================================

/// Bundle for spawning a networked entity.
#[derive(Bundle, Debug, Clone, Copy)]
pub struct NetworkedBundle {
    pub id: NetworkId,
    pub position: Position,
    pub range: VisibleRange,
}

impl NetworkedBundle {
    pub fn new(id: EntityId, position: Vec3, range: f32) -> Self {
        Self {
            id: NetworkId(id),
            position: position.into(),
            range: VisibleRange(range),
        }
    }
}
