//! ECS systems for the server world.
//!
//! ## Ordering
//!
//! The three systems run chained, once per fixed update:
//!
//! 1. `roster_snapshot_system` - mirrors components into the roster
//! 2. `dynamic_grid_sync_system` - applies spawns/moves/despawns to a dynamic grid
//! 3. `interest_tick_system` - advances the interest manager, filling the event log

pub mod grid_sync;
pub mod interest;
pub mod roster;

pub use grid_sync::*;
pub use interest::*;
pub use roster::*;
