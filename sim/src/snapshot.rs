//! Serializable view of the interest manager for debug tooling.
//!
//! Grid geometry is reported in world space via the projector, so a
//! visualizer can draw cells without knowing which axis was dropped.

use crate::interest::InterestManager;
use crate::projection::Vec3;
use crate::roster::PlayerId;
use crate::spatial::{EntityId, SpatialGrid};
use crate::subscription::Subscriber;
use crate::visibility::VisibilityPolicy;
use serde::{Deserialize, Serialize};

/// One non-empty cell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellSnapshot {
    pub col: u32,
    pub row: u32,
    /// World-space corner of the cell.
    pub origin: Vec3,
    pub entities: Vec<EntityId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GridSnapshot {
    /// World-space grid origin.
    pub origin: Vec3,
    /// World-space cell extent (zero along the dropped axis).
    pub cell_size: Vec3,
    pub cols: u32,
    pub rows: u32,
    pub entity_count: usize,
    pub cells: Vec<CellSnapshot>,
}

impl GridSnapshot {
    fn capture<P: VisibilityPolicy>(manager: &InterestManager<P>, grid: &SpatialGrid) -> Self {
        let projector = manager.projector();
        let cell_size = grid.cell_size();
        let origin = projector.origin_world(grid.origin());

        let mut cells: Vec<CellSnapshot> = grid
            .occupied_cells()
            .map(|(coord, ids)| {
                let offset = projector.cell_offset_world(cell_size, coord.col, coord.row);
                let mut entities = ids.to_vec();
                entities.sort_unstable();
                CellSnapshot {
                    col: coord.col,
                    row: coord.row,
                    origin: Vec3::new(origin.x + offset.x, origin.y + offset.y, origin.z + offset.z),
                    entities,
                }
            })
            .collect();
        cells.sort_by_key(|c| (c.row, c.col));

        Self {
            origin,
            cell_size: projector.cell_size_world(cell_size),
            cols: grid.cols(),
            rows: grid.rows(),
            entity_count: grid.len(),
            cells,
        }
    }
}

/// Pull-mode subscription set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscriptionSnapshot {
    pub subscriber: Subscriber,
    pub entities: Vec<EntityId>,
}

/// Push-mode subscriber list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubscribersSnapshot {
    pub entity: EntityId,
    pub players: Vec<PlayerId>,
}

/// Complete interest state at one point in time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterestSnapshot {
    /// Server frame the snapshot was taken on.
    pub tick: u64,
    pub scans: u64,
    pub grid: Option<GridSnapshot>,
    pub subscriptions: Vec<SubscriptionSnapshot>,
    pub subscribers: Vec<SubscribersSnapshot>,
}

impl InterestSnapshot {
    pub fn from_manager<P: VisibilityPolicy>(manager: &InterestManager<P>, tick: u64) -> Self {
        let grid = manager.grid().map(|g| GridSnapshot::capture(manager, g));

        let mut subscriptions: Vec<SubscriptionSnapshot> = manager
            .subscription_sets()
            .map(|(subscriber, set)| {
                let mut entities: Vec<EntityId> = set.iter().copied().collect();
                entities.sort_unstable();
                SubscriptionSnapshot {
                    subscriber: *subscriber,
                    entities,
                }
            })
            .collect();
        subscriptions.sort_by_key(|s| s.subscriber);

        let mut subscribers: Vec<SubscribersSnapshot> = manager
            .subscribed_subjects()
            .map(|(entity, players)| {
                let mut players: Vec<PlayerId> = players.iter().copied().collect();
                players.sort_unstable();
                SubscribersSnapshot { entity, players }
            })
            .collect();
        subscribers.sort_by_key(|s| s.entity);

        Self {
            tick,
            scans: manager.scan_count(),
            grid,
            subscriptions,
            subscribers,
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(data)
    }
}
