//! Gridsight - spatial interest management for authoritative game servers.
//!
//! Decides, once per update interval, which networked entities each
//! connected player should receive. Entities are indexed in a uniform 2D
//! grid over a projection of world space; grid candidates are refined by a
//! pluggable visibility policy and only the subscription changes are
//! emitted.
//!
//! The core ([`InterestManager`]) works with any [`Roster`] and
//! [`SubscriptionSink`]. [`ServerWorld`] hosts it in a `bevy_ecs` world
//! with a fixed-timestep schedule.

pub mod api;
pub mod components;
pub mod config;
pub mod error;
pub mod interest;
pub mod profiler;
pub mod projection;
pub mod roster;
pub mod snapshot;
pub mod spatial;
pub mod subscription;
pub mod systems;
pub mod visibility;

pub use api::ServerWorld;
pub use components::*;
pub use config::{GridMode, InterestConfig, QueryMode, Role, ServerConfig, StaticBounds, SubscriptionScope};
pub use error::{ConfigError, GridError, InterestError};
pub use interest::{InterestManager, TickPhase, TickReport};
pub use profiler::Profiler;
pub use projection::{AxisMode, CoordinateProjector, Vec2, Vec3};
pub use roster::{EntityRecord, PlayerId, PlayerRecord, Roster, RosterSnapshot, WorldBox};
pub use snapshot::InterestSnapshot;
pub use spatial::{Bounds, CellCoord, EntityId, GridDimensions, Shape, SpatialGrid};
pub use subscription::{EventLog, Subscriber, SubscriptionEvent, SubscriptionSink};
pub use systems::*;
pub use visibility::{DistanceMetric, RangePolicy, RangeRule, VisibilityPolicy};
