//! Public API for an ECS-hosted interest manager.
//!
//! [`ServerWorld`] owns a `bevy_ecs` world, spawns networked entities and
//! players as components, and runs the interest systems on a fixed
//! timestep. Subscription changes collect in an [`EventLog`] that the
//! transport drains after each step.
//!
//! ## Fixed Timestep
//!
//! `step(dt)` accumulates time and runs as many fixed updates as fit. The
//! interest manager sees the fixed timestep as its frame time, so scan
//! cadence does not depend on the caller's frame rate.

use crate::components::*;
use crate::config::ServerConfig;
use crate::error::{GridError, InterestError};
use crate::interest::{InterestManager, TickReport};
use crate::projection::Vec3;
use crate::roster::{PlayerId, RosterSnapshot, WorldBox};
use crate::snapshot::InterestSnapshot;
use crate::spatial::EntityId;
use crate::subscription::{EventLog, SubscriptionEvent};
use crate::systems::*;
use crate::visibility::{RangePolicy, VisibilityPolicy};
use bevy_ecs::prelude::*;
use std::collections::HashMap;
use tracing::{debug, info};

/// ECS world plus schedule, driving one [`InterestManager`].
pub struct ServerWorld<P: VisibilityPolicy + 'static = RangePolicy> {
    world: World,
    schedule: Schedule,
    tick: u64,
    time: f32,
    /// Accumulated time for fixed timestep.
    time_accumulator: f32,
    fixed_timestep: f32,
    entities: HashMap<EntityId, Entity>,
    players: HashMap<PlayerId, Entity>,
    _policy: std::marker::PhantomData<P>,
}

impl ServerWorld<RangePolicy> {
    pub fn new(config: ServerConfig) -> Result<Self, InterestError> {
        let policy = config.interest.range_policy();
        Self::with_policy(config, policy, None)
    }

    /// Server whose world geometry spans `bounds`. Used for dynamic grids
    /// without explicit bounds and for static grids sized to the world.
    pub fn with_world(config: ServerConfig, bounds: WorldBox) -> Result<Self, InterestError> {
        let policy = config.interest.range_policy();
        Self::with_policy(config, policy, Some(bounds))
    }
}

impl<P: VisibilityPolicy + 'static> ServerWorld<P> {
    pub fn with_policy(config: ServerConfig, policy: P, world_bounds: Option<WorldBox>) -> Result<Self, InterestError> {
        config.validate()?;

        let mut roster = RosterSnapshot::new();
        roster.set_world_bounds(world_bounds);
        let manager = InterestManager::with_policy_from_world(config.interest.clone(), policy, &roster)?;

        let mut world = World::new();
        world.insert_resource(DeltaTime(config.fixed_timestep));
        world.insert_resource(ServerTick(0));
        world.insert_resource(roster);
        world.insert_resource(manager);
        world.insert_resource(EventLog::new());
        world.insert_resource(TrackedEntities::default());
        world.insert_resource(LastTickReport::default());

        let mut schedule = Schedule::default();
        schedule.add_systems(
            (
                roster_snapshot_system,
                dynamic_grid_sync_system::<P>,
                interest_tick_system::<P>,
            )
                .chain(),
        );

        info!(
            fixed_timestep = config.fixed_timestep,
            grid_mode = ?config.interest.grid_mode,
            query_mode = ?config.interest.query_mode,
            "server world created"
        );

        let fixed_timestep = config.fixed_timestep;
        world.insert_resource(config);

        Ok(Self {
            world,
            schedule,
            tick: 0,
            time: 0.0,
            time_accumulator: 0.0,
            fixed_timestep,
            entities: HashMap::new(),
            players: HashMap::new(),
            _policy: std::marker::PhantomData,
        })
    }

    /// Step the server forward by `dt` seconds of wall time.
    pub fn step(&mut self, dt: f32) {
        self.time_accumulator += dt;
        while self.time_accumulator >= self.fixed_timestep {
            self.fixed_update(self.fixed_timestep);
            self.time_accumulator -= self.fixed_timestep;
        }
    }

    /// Run exactly one fixed update.
    pub fn fixed_update(&mut self, dt: f32) {
        if let Some(mut dt_res) = self.world.get_resource_mut::<DeltaTime>() {
            dt_res.0 = dt;
        }
        if let Some(mut tick_res) = self.world.get_resource_mut::<ServerTick>() {
            tick_res.increment();
        }

        self.schedule.run(&mut self.world);
        self.world.clear_trackers();

        self.tick += 1;
        self.time += dt;
    }

    // ------------------------------------------------------------------
    // Entities
    // ------------------------------------------------------------------

    /// Spawn a networked entity.
    pub fn spawn_entity(
        &mut self,
        id: EntityId,
        position: Vec3,
        range: f32,
        owner: Option<PlayerId>,
    ) -> Result<Entity, GridError> {
        if self.entities.contains_key(&id) {
            return Err(GridError::DuplicateId(id));
        }
        let mut spawned = self.world.spawn(NetworkedBundle::new(id, position, range));
        if let Some(owner) = owner {
            spawned.insert(OwnedBy(owner));
        }
        let entity = spawned.id();
        self.entities.insert(id, entity);
        debug!(entity = id, ?owner, "spawned");
        Ok(entity)
    }

    /// Returns false if the entity is unknown.
    pub fn move_entity(&mut self, id: EntityId, position: Vec3) -> bool {
        let Some(&entity) = self.entities.get(&id) else {
            return false;
        };
        match self.world.get_mut::<Position>(entity) {
            Some(mut pos) => {
                *pos = position.into();
                true
            }
            None => false,
        }
    }

    pub fn set_range(&mut self, id: EntityId, range: f32) -> bool {
        let Some(&entity) = self.entities.get(&id) else {
            return false;
        };
        match self.world.get_mut::<VisibleRange>(entity) {
            Some(mut r) => {
                r.0 = range;
                true
            }
            None => false,
        }
    }

    /// Hand an entity to a player, or take it away with `None`.
    pub fn set_owner(&mut self, id: EntityId, owner: Option<PlayerId>) -> bool {
        let Some(&entity) = self.entities.get(&id) else {
            return false;
        };
        let mut e = self.world.entity_mut(entity);
        match owner {
            Some(player) => {
                e.insert(OwnedBy(player));
            }
            None => {
                e.remove::<OwnedBy>();
            }
        }
        true
    }

    pub fn despawn_entity(&mut self, id: EntityId) -> bool {
        match self.entities.remove(&id) {
            Some(entity) => {
                debug!(entity = id, "despawned");
                self.world.despawn(entity)
            }
            None => false,
        }
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    // ------------------------------------------------------------------
    // Players
    // ------------------------------------------------------------------

    /// Register a connection. It receives nothing until marked ready.
    /// Returns false if the player is already connected.
    pub fn connect_player(&mut self, id: PlayerId) -> bool {
        if self.players.contains_key(&id) {
            return false;
        }
        let entity = self.world.spawn(PlayerConnection::new(id)).id();
        self.players.insert(id, entity);
        info!(player = id, "player connected");
        true
    }

    pub fn set_player_ready(&mut self, id: PlayerId, ready: bool) -> bool {
        let Some(&entity) = self.players.get(&id) else {
            return false;
        };
        match self.world.get_mut::<PlayerConnection>(entity) {
            Some(mut conn) => {
                conn.ready = ready;
                true
            }
            None => false,
        }
    }

    /// Drop a connection. Its subscription state is discarded without
    /// events; the entities it owned stay spawned.
    pub fn disconnect_player(&mut self, id: PlayerId) -> bool {
        let Some(entity) = self.players.remove(&id) else {
            return false;
        };
        self.world.despawn(entity);
        if let Some(mut manager) = self.world.get_resource_mut::<InterestManager<P>>() {
            manager.remove_player(id);
        }
        info!(player = id, "player disconnected");
        true
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    // ------------------------------------------------------------------
    // Output
    // ------------------------------------------------------------------

    /// Take all subscription events emitted since the last drain.
    pub fn drain_events(&mut self) -> Vec<SubscriptionEvent> {
        self.world
            .get_resource_mut::<EventLog>()
            .map(|mut log| log.drain())
            .unwrap_or_default()
    }

    pub fn last_report(&self) -> TickReport {
        self.world
            .get_resource::<LastTickReport>()
            .map(|r| r.0)
            .unwrap_or_default()
    }

    pub fn manager(&self) -> Option<&InterestManager<P>> {
        self.world.get_resource::<InterestManager<P>>()
    }

    pub fn snapshot(&self) -> InterestSnapshot {
        match self.manager() {
            Some(manager) => InterestSnapshot::from_manager(manager, self.tick),
            None => InterestSnapshot {
                tick: self.tick,
                ..Default::default()
            },
        }
    }

    pub fn snapshot_json(&self) -> String {
        self.snapshot().to_json().unwrap_or_else(|_| "{}".to_string())
    }

    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn current_time(&self) -> f32 {
        self.time
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut World {
        &mut self.world
    }
}
