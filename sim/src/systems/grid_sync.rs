//! Keeps a dynamic grid in step with spawns, moves and despawns.

use crate::components::*;
use crate::interest::InterestManager;
use crate::visibility::VisibilityPolicy;
use bevy_ecs::prelude::*;
use tracing::debug;

/// System that forwards component changes to a dynamic grid.
///
/// ## Data Access
/// - Reads: NetworkId, Position, VisibleRange (added/changed/removed)
/// - Writes: InterestManager, TrackedEntities
///
/// Does nothing for static grids, which are rebuilt on every scan.
pub fn dynamic_grid_sync_system<P: VisibilityPolicy + 'static>(
    added: Query<(Entity, &NetworkId, &Position, &VisibleRange), Added<NetworkId>>,
    changed: Query<(Entity, &NetworkId, &Position, &VisibleRange), Or<(Changed<Position>, Changed<VisibleRange>)>>,
    mut removed: RemovedComponents<NetworkId>,
    mut tracked: ResMut<TrackedEntities>,
    mut manager: ResMut<InterestManager<P>>,
) {
    if !manager.config().grid_mode.is_dynamic() {
        return;
    }

    // Removals first so a recycled id can be re-added this frame.
    for entity in removed.read() {
        if let Some(id) = tracked.remove(entity) {
            manager.remove(id);
        }
    }

    for (entity, id, pos, range) in added.iter() {
        if manager.add(id.0, pos.to_vec3(), range.0).is_ok() {
            tracked.insert(entity, id.0);
        }
    }

    // Freshly added entities show up here too; their update is a no-op.
    // Entities whose add was rejected must not move the indexed original.
    for (entity, id, pos, range) in changed.iter() {
        if tracked.get(entity) != Some(id.0) {
            continue;
        }
        if let Err(err) = manager.update(id.0, pos.to_vec3(), range.0) {
            debug!(entity = id.0, %err, "grid update skipped");
        }
    }
}
