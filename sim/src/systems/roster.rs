//! Mirrors ECS state into the [`RosterSnapshot`] the interest manager reads.

use crate::components::*;
use crate::roster::{EntityRecord, PlayerId, PlayerRecord, RosterSnapshot};
use crate::spatial::EntityId;
use bevy_ecs::prelude::*;
use std::collections::BTreeMap;

/// System that rebuilds the roster snapshot from components.
///
/// ## Data Access
/// - Reads: NetworkId, Position, VisibleRange, OwnedBy, PlayerConnection
/// - Writes: RosterSnapshot
///
/// World bounds on the snapshot are left alone.
pub fn roster_snapshot_system(
    entities: Query<(&NetworkId, &Position, &VisibleRange, Option<&OwnedBy>)>,
    players: Query<&PlayerConnection>,
    mut roster: ResMut<RosterSnapshot>,
) {
    roster.clear();

    let mut owned: BTreeMap<PlayerId, Vec<EntityId>> = BTreeMap::new();
    for (id, pos, range, owner) in entities.iter() {
        roster.upsert_entity(EntityRecord::new(id.0, pos.to_vec3(), range.0));
        if let Some(owner) = owner {
            owned.entry(owner.0).or_default().push(id.0);
        }
    }

    for conn in players.iter() {
        let mut list = owned.remove(&conn.id).unwrap_or_default();
        list.sort_unstable();
        roster.upsert_player(PlayerRecord::new(conn.id, conn.ready, list));
    }
    // Whatever is left in `owned` belongs to players that are not connected.
}
