//! What the interest core reads from the surrounding game world.
//!
//! The core never owns entities or sessions. Each scan it asks a [`Roster`]
//! for the live entities, the connected players and (for a world-sized
//! static grid) the world bounding box. [`RosterSnapshot`] is a plain
//! in-memory roster, used by the ECS systems and in tests.

use crate::spatial::EntityId;
use crate::projection::Vec3;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Opaque identifier of a connected player (its connection id).
pub type PlayerId = u64;

/// A spawned entity as seen at scan time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: EntityId,
    pub position: Vec3,
    /// Visibility radius in world units.
    pub range: f32,
}

impl EntityRecord {
    pub fn new(id: EntityId, position: Vec3, range: f32) -> Self {
        Self { id, position, range }
    }
}

/// A connected player and the entities it owns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerRecord {
    pub id: PlayerId,
    /// Only ready players (session handshake done) receive subscriptions.
    pub ready: bool,
    pub owned: Vec<EntityId>,
}

impl PlayerRecord {
    pub fn new(id: PlayerId, ready: bool, owned: Vec<EntityId>) -> Self {
        Self { id, ready, owned }
    }
}

/// World-space box, minimum corner plus size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WorldBox {
    pub min: Vec3,
    pub size: Vec3,
}

impl WorldBox {
    pub fn new(min: Vec3, size: Vec3) -> Self {
        Self { min, size }
    }

    pub fn max(&self) -> Vec3 {
        Vec3::new(self.min.x + self.size.x, self.min.y + self.size.y, self.min.z + self.size.z)
    }
}

/// Source of entity and player state, implemented by the game layer.
///
/// Lookups for ids that no longer exist return `None`; the core treats that
/// as "not visible".
pub trait Roster {
    /// All currently spawned entities.
    fn spawned_entities(&self) -> Vec<EntityRecord>;

    /// All connected players, ready or not.
    fn players(&self) -> Vec<PlayerRecord>;

    fn lookup_entity(&self, id: EntityId) -> Option<EntityRecord>;

    /// Bounding box of the world geometry, used to size a static grid once.
    fn world_bounds(&self) -> Option<WorldBox> {
        None
    }
}

/// In-memory roster.
#[derive(Resource, Debug, Clone, Default)]
pub struct RosterSnapshot {
    entities: HashMap<EntityId, EntityRecord>,
    players: BTreeMap<PlayerId, PlayerRecord>,
    world_bounds: Option<WorldBox>,
}

impl RosterSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entity.
    pub fn upsert_entity(&mut self, record: EntityRecord) {
        self.entities.insert(record.id, record);
    }

    /// Despawn an entity and drop it from its owner's list.
    pub fn remove_entity(&mut self, id: EntityId) -> Option<EntityRecord> {
        for player in self.players.values_mut() {
            player.owned.retain(|&e| e != id);
        }
        self.entities.remove(&id)
    }

    pub fn set_position(&mut self, id: EntityId, position: Vec3) {
        if let Some(record) = self.entities.get_mut(&id) {
            record.position = position;
        }
    }

    pub fn set_range(&mut self, id: EntityId, range: f32) {
        if let Some(record) = self.entities.get_mut(&id) {
            record.range = range;
        }
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Insert or replace a player.
    pub fn upsert_player(&mut self, record: PlayerRecord) {
        self.players.insert(record.id, record);
    }

    pub fn remove_player(&mut self, id: PlayerId) -> Option<PlayerRecord> {
        self.players.remove(&id)
    }

    pub fn set_ready(&mut self, id: PlayerId, ready: bool) {
        if let Some(player) = self.players.get_mut(&id) {
            player.ready = ready;
        }
    }

    /// Hand `entity` to `player`. The player must already be connected.
    pub fn give(&mut self, player: PlayerId, entity: EntityId) {
        for p in self.players.values_mut() {
            p.owned.retain(|&e| e != entity);
        }
        if let Some(p) = self.players.get_mut(&player) {
            p.owned.push(entity);
        }
    }

    pub fn set_world_bounds(&mut self, bounds: Option<WorldBox>) {
        self.world_bounds = bounds;
    }

    /// Drop all entities and players, keeping world bounds.
    pub fn clear(&mut self) {
        self.entities.clear();
        self.players.clear();
    }
}

impl Roster for RosterSnapshot {
    fn spawned_entities(&self) -> Vec<EntityRecord> {
        let mut out: Vec<EntityRecord> = self.entities.values().copied().collect();
        out.sort_unstable_by_key(|r| r.id);
        out
    }

    fn players(&self) -> Vec<PlayerRecord> {
        self.players.values().cloned().collect()
    }

    fn lookup_entity(&self, id: EntityId) -> Option<EntityRecord> {
        self.entities.get(&id).copied()
    }

    fn world_bounds(&self) -> Option<WorldBox> {
        self.world_bounds
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remove_entity_drops_ownership() {
        let mut roster = RosterSnapshot::new();
        roster.upsert_entity(EntityRecord::new(1, Vec3::ZERO, 10.0));
        roster.upsert_player(PlayerRecord::new(7, true, vec![1]));

        assert!(roster.remove_entity(1).is_some());
        assert!(roster.lookup_entity(1).is_none());
        assert!(roster.players()[0].owned.is_empty());
    }

    #[test]
    fn test_give_moves_ownership() {
        let mut roster = RosterSnapshot::new();
        roster.upsert_player(PlayerRecord::new(1, true, vec![5]));
        roster.upsert_player(PlayerRecord::new(2, true, vec![]));
        roster.give(2, 5);

        let players = roster.players();
        assert!(players[0].owned.is_empty());
        assert_eq!(players[1].owned, vec![5]);
    }

    #[test]
    fn test_spawned_entities_sorted() {
        let mut roster = RosterSnapshot::new();
        for id in [9, 3, 5] {
            roster.upsert_entity(EntityRecord::new(id, Vec3::ZERO, 1.0));
        }
        let ids: Vec<EntityId> = roster.spawned_entities().iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 5, 9]);
    }
}
