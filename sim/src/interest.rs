//! The tick-driven interest manager.
//!
//! One manager owns one grid and all subscription state. Each server frame
//! the caller hands it the frame time, a [`Roster`] and a
//! [`SubscriptionSink`]; the manager decides whether this frame scans, runs
//! the scan and emits only the subscription changes.
//!
//! ## Modes
//!
//! Grid lifecycle and query direction are independent choices:
//!
//! - **Static** grids are rebuilt from `Roster::spawned_entities` on every
//!   scan. The grid mutation surface is a no-op.
//! - **Dynamic** grids have a fixed extent and are kept current by
//!   [`InterestManager::add`], [`InterestManager::update`] and
//!   [`InterestManager::remove`] as entities spawn, move and despawn.
//! - **Pull**: once per interval every ready player's entities query the
//!   grid for what they can see.
//! - **Push**: every indexed entity rebuilds its own subscriber list on a
//!   per-entity staggered cooldown, querying the grid for nearby entities
//!   owned by ready players.
//!
//! Stored footprints and queries are circles of the entity's visibility
//! radius, so the grid returns every pair within `r_observer + r_candidate`.
//! The [`VisibilityPolicy`] then makes the precise call.

use crate::config::{GridMode, InterestConfig, QueryMode, Role, StaticBounds, SubscriptionScope};
use crate::error::{GridError, InterestError};
use crate::profiler::Profiler;
use crate::projection::{CoordinateProjector, Vec2, Vec3};
use crate::roster::{EntityRecord, PlayerId, PlayerRecord, Roster, WorldBox};
use crate::spatial::{Bounds, EntityId, GridDimensions, Shape, SpatialGrid};
use crate::subscription::{diff_sets, Subscriber, SubscriptionSink};
use crate::visibility::{RangePolicy, VisibilityPolicy};
use bevy_ecs::prelude::*;
use std::collections::{HashMap, HashSet};
use std::time::Instant;
use tracing::{debug, debug_span, trace, warn};

/// Where the manager is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickPhase {
    /// Nothing has run yet, or the last frame completed a scan.
    #[default]
    Idle,
    /// Waiting for the cooldown to run out.
    Accumulating,
    Scanning,
    Diffing,
}

/// What a single [`InterestManager::tick`] did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// A scan (pull) or at least one subscriber rebuild (push) ran.
    pub scanned: bool,
    /// The static rebuild was skipped; previous state was kept.
    pub skipped_rebuild: bool,
    pub subscribed: usize,
    pub unsubscribed: usize,
    /// Push mode: entities whose subscriber list was rebuilt.
    pub rebuilt_subjects: usize,
}

#[derive(Debug, Clone)]
struct SubjectState {
    cooldown: f32,
    subscribers: HashSet<PlayerId>,
}

/// Spatial interest manager for the authoritative server.
#[derive(Resource)]
pub struct InterestManager<P: VisibilityPolicy = RangePolicy> {
    config: InterestConfig,
    projector: CoordinateProjector,
    policy: P,
    /// Static mode: `None` until the first successful rebuild.
    grid: Option<SpatialGrid>,
    /// Static mode with world bounds: resolved on the first rebuild.
    world_bounds: Option<Bounds>,
    world_bounds_checked: bool,
    cooldown: f32,
    phase: TickPhase,
    scans: u64,
    /// Pull mode state.
    subscriptions: HashMap<Subscriber, HashSet<EntityId>>,
    /// Push mode state, keyed by subject entity.
    subjects: HashMap<EntityId, SubjectState>,
    /// Dynamic mode: last position and radius written to the grid.
    last_applied: HashMap<EntityId, (Vec3, f32)>,
    profiler: Profiler,
}

impl InterestManager<RangePolicy> {
    /// Manager using the range policy described by `config`.
    pub fn new(config: InterestConfig) -> Result<Self, InterestError> {
        let policy = config.range_policy();
        Self::with_policy(config, policy)
    }

    /// Like [`InterestManager::new`], taking missing dynamic bounds from the
    /// roster's world bounds.
    pub fn from_world<R: Roster + ?Sized>(config: InterestConfig, roster: &R) -> Result<Self, InterestError> {
        let policy = config.range_policy();
        Self::with_policy_from_world(config, policy, roster)
    }
}

impl<P: VisibilityPolicy> InterestManager<P> {
    pub fn with_policy(config: InterestConfig, policy: P) -> Result<Self, InterestError> {
        Self::build(config, policy, None)
    }

    pub fn with_policy_from_world<R: Roster + ?Sized>(
        config: InterestConfig,
        policy: P,
        roster: &R,
    ) -> Result<Self, InterestError> {
        let world = roster.world_bounds();
        Self::build(config, policy, world)
    }

    fn build(config: InterestConfig, policy: P, world: Option<WorldBox>) -> Result<Self, InterestError> {
        config.validate()?;
        let projector = config.projector();

        let grid = match config.grid_mode {
            GridMode::Dynamic { bounds } => {
                let bounds = bounds
                    .or_else(|| world.and_then(|b| project_box(&projector, b)))
                    .ok_or(InterestError::MissingBounds)?;
                Some(SpatialGrid::new(bounds, config.cell_size)?)
            }
            GridMode::Static { .. } => None,
        };

        Ok(Self {
            config,
            projector,
            policy,
            grid,
            world_bounds: None,
            world_bounds_checked: false,
            // The first tick scans immediately.
            cooldown: 0.0,
            phase: TickPhase::Idle,
            scans: 0,
            subscriptions: HashMap::new(),
            subjects: HashMap::new(),
            last_applied: HashMap::new(),
            profiler: Profiler::new(),
        })
    }

    pub fn config(&self) -> &InterestConfig {
        &self.config
    }

    pub fn projector(&self) -> CoordinateProjector {
        self.projector
    }

    pub fn policy(&self) -> &P {
        &self.policy
    }

    /// The current grid, if one has been built.
    pub fn grid(&self) -> Option<&SpatialGrid> {
        self.grid.as_ref()
    }

    pub fn dimensions(&self) -> Option<GridDimensions> {
        self.grid.as_ref().map(SpatialGrid::dimensions)
    }

    pub fn phase(&self) -> TickPhase {
        self.phase
    }

    /// Completed scans.
    pub fn scan_count(&self) -> u64 {
        self.scans
    }

    pub fn profiler(&self) -> &Profiler {
        &self.profiler
    }

    /// Make the next tick scan regardless of the remaining cooldown.
    pub fn force_scan(&mut self) {
        self.cooldown = 0.0;
    }

    // ------------------------------------------------------------------
    // Grid mutation (dynamic mode)
    // ------------------------------------------------------------------

    /// Footprint written to a dynamic grid. Inflated by the movement
    /// threshold, since the stored center may lag the real one by that much.
    fn dynamic_footprint(&self, position: Vec3, range: f32) -> Shape {
        Shape::circle(
            self.projector.project(position),
            range.max(0.0) + self.config.movement_threshold,
        )
    }

    /// Index a newly spawned entity. No-op in static mode.
    pub fn add(&mut self, id: EntityId, position: Vec3, range: f32) -> Result<(), GridError> {
        if self.config.grid_mode.is_static() {
            debug!(entity = id, "add ignored: static grid is rebuilt every scan");
            return Ok(());
        }
        let shape = self.dynamic_footprint(position, range);
        let Some(grid) = self.grid.as_mut() else {
            return Ok(());
        };
        if let Err(err) = grid.add(id, shape) {
            warn!(entity = id, %err, "duplicate insert ignored; original entry kept");
            return Err(err);
        }
        self.last_applied.insert(id, (position, range));
        Ok(())
    }

    /// Move an indexed entity. Moves within the movement threshold are
    /// skipped. No-op in static mode.
    pub fn update(&mut self, id: EntityId, position: Vec3, range: f32) -> Result<(), GridError> {
        if self.config.grid_mode.is_static() {
            debug!(entity = id, "update ignored: static grid is rebuilt every scan");
            return Ok(());
        }
        if let Some(&(last, last_range)) = self.last_applied.get(&id) {
            if last_range == range && last.distance(position) <= self.config.movement_threshold {
                return Ok(());
            }
        }
        let shape = self.dynamic_footprint(position, range);
        let Some(grid) = self.grid.as_mut() else {
            return Ok(());
        };
        if let Err(err) = grid.update(id, shape) {
            debug!(entity = id, %err, "update of unindexed entity ignored");
            return Err(err);
        }
        self.last_applied.insert(id, (position, range));
        Ok(())
    }

    /// Drop a despawned entity from the grid. Returns whether it was indexed.
    /// Subscriptions to it are withdrawn on the next scan.
    pub fn remove(&mut self, id: EntityId) -> bool {
        if self.config.grid_mode.is_static() {
            debug!(entity = id, "remove ignored: static grid is rebuilt every scan");
            return false;
        }
        self.last_applied.remove(&id);
        self.grid.as_mut().and_then(|g| g.remove(id)).is_some()
    }

    /// Entities whose footprint touches a circle around a world position.
    pub fn query_near(&self, position: Vec3, radius: f32) -> Vec<EntityId> {
        match &self.grid {
            Some(grid) => grid.contact(&Shape::circle(self.projector.project(position), radius)),
            None => Vec::new(),
        }
    }

    // ------------------------------------------------------------------
    // Subscription state
    // ------------------------------------------------------------------

    /// Pull mode: the set stored under `subscriber`.
    pub fn subscriptions(&self, subscriber: &Subscriber) -> Option<&HashSet<EntityId>> {
        self.subscriptions.get(subscriber)
    }

    /// Everything currently replicated to `player`, over all modes and scopes.
    pub fn player_subscriptions(&self, player: PlayerId) -> HashSet<EntityId> {
        let mut out: HashSet<EntityId> = self
            .subscriptions
            .iter()
            .filter(|(key, _)| key.player == player)
            .flat_map(|(_, set)| set.iter().copied())
            .collect();
        out.extend(
            self.subjects
                .iter()
                .filter(|(_, state)| state.subscribers.contains(&player))
                .map(|(&id, _)| id),
        );
        out
    }

    /// Pull mode: all subscription sets.
    pub fn subscription_sets(&self) -> impl Iterator<Item = (&Subscriber, &HashSet<EntityId>)> {
        self.subscriptions.iter()
    }

    /// Push mode: players subscribed to `entity`, sorted.
    pub fn subscribers_of(&self, entity: EntityId) -> Vec<PlayerId> {
        let mut players: Vec<PlayerId> = self
            .subjects
            .get(&entity)
            .map(|s| s.subscribers.iter().copied().collect())
            .unwrap_or_default();
        players.sort_unstable();
        players
    }

    /// Push mode: subjects with at least one subscriber.
    pub fn subscribed_subjects(&self) -> impl Iterator<Item = (EntityId, &HashSet<PlayerId>)> {
        self.subjects
            .iter()
            .filter(|(_, s)| !s.subscribers.is_empty())
            .map(|(&id, s)| (id, &s.subscribers))
    }

    /// Forget a disconnected player without emitting events.
    pub fn remove_player(&mut self, player: PlayerId) {
        self.subscriptions.retain(|key, _| key.player != player);
        for state in self.subjects.values_mut() {
            state.subscribers.remove(&player);
        }
    }

    // ------------------------------------------------------------------
    // Tick
    // ------------------------------------------------------------------

    /// Advance by one server frame of `dt` seconds.
    pub fn tick<R, S>(&mut self, dt: f32, roster: &R, sink: &mut S) -> TickReport
    where
        R: Roster + Sync + ?Sized,
        S: SubscriptionSink + ?Sized,
    {
        let mut report = TickReport::default();
        if self.config.role != Role::Server {
            return report;
        }
        match self.config.query_mode {
            QueryMode::Pull => self.tick_pull(dt, roster, sink, &mut report),
            QueryMode::Push => self.tick_push(dt, roster, sink, &mut report),
        }
        self.phase = if report.scanned {
            TickPhase::Idle
        } else {
            TickPhase::Accumulating
        };
        report
    }

    /// Count down; true when this frame should scan.
    fn advance_cooldown(&mut self, dt: f32) -> bool {
        self.cooldown -= dt;
        if self.cooldown > 0.0 {
            self.phase = TickPhase::Accumulating;
            return false;
        }
        self.cooldown = self.config.update_interval;
        true
    }

    /// Rebuild a static grid from the roster. On failure the previous grid
    /// stays in place.
    fn rebuild_static<R: Roster + ?Sized>(&mut self, roster: &R) -> Result<usize, GridError> {
        let start = Instant::now();
        let records = roster.spawned_entities();
        let bounds = self.static_bounds(roster, &records);
        let reuse = self.world_bounds == Some(bounds);

        let mut grid = match self.grid.take() {
            Some(mut grid) if reuse => {
                grid.clear();
                grid
            }
            previous => match SpatialGrid::new(bounds, self.config.cell_size) {
                Ok(grid) => grid,
                Err(err) => {
                    self.grid = previous;
                    return Err(err);
                }
            },
        };

        for record in &records {
            let shape = Shape::circle(self.projector.project(record.position), record.range);
            if let Err(err) = grid.add(record.id, shape) {
                warn!(entity = record.id, %err, "roster listed an entity twice");
            }
        }

        let count = grid.len();
        self.grid = Some(grid);
        self.profiler.record("rebuild", start.elapsed());
        Ok(count)
    }

    fn static_bounds<R: Roster + ?Sized>(&mut self, roster: &R, records: &[EntityRecord]) -> Bounds {
        if let GridMode::Static { bounds: StaticBounds::World } = self.config.grid_mode {
            if !self.world_bounds_checked {
                self.world_bounds_checked = true;
                self.world_bounds = roster
                    .world_bounds()
                    .and_then(|b| project_box(&self.projector, b))
                    .filter(|b| !b.is_degenerate());
                if self.world_bounds.is_none() {
                    warn!("world bounds unavailable or degenerate; sizing static grid from live entities");
                }
            }
            if let Some(bounds) = self.world_bounds {
                return bounds;
            }
        }
        Bounds::enclosing(records.iter().map(|r| self.projector.project(r.position)))
            .unwrap_or(Bounds::new(Vec2::ZERO, Vec2::ZERO))
    }

    /// Rebuild a static grid, logging a skip. True if the grid is current.
    fn refresh_static<R: Roster + ?Sized>(&mut self, roster: &R, report: &mut TickReport) -> bool {
        match self.rebuild_static(roster) {
            Ok(count) => {
                trace!(entities = count, "static grid rebuilt");
                true
            }
            Err(err) => {
                debug!(%err, "static rebuild skipped; keeping previous grid and subscriptions");
                report.skipped_rebuild = true;
                false
            }
        }
    }

    fn tick_pull<R, S>(&mut self, dt: f32, roster: &R, sink: &mut S, report: &mut TickReport)
    where
        R: Roster + Sync + ?Sized,
        S: SubscriptionSink + ?Sized,
    {
        if !self.advance_cooldown(dt) {
            return;
        }
        let _span = debug_span!("interest_scan", scan = self.scans + 1, mode = "pull").entered();

        if self.config.grid_mode.is_static() && !self.refresh_static(roster, report) {
            return;
        }
        let Some(grid) = self.grid.as_ref() else {
            return;
        };

        self.phase = TickPhase::Scanning;
        let start = Instant::now();
        let players = roster.players();
        let scanned = scan_pull(
            grid,
            &self.projector,
            &self.policy,
            self.config.subscription_scope,
            roster,
            &players,
        );
        self.profiler.record("scan", start.elapsed());

        self.phase = TickPhase::Diffing;
        let start = Instant::now();
        self.commit_pull(&players, scanned, sink, report);
        self.profiler.record("diff", start.elapsed());

        self.scans += 1;
        self.profiler.tick();
        report.scanned = true;
        debug!(
            players = players.len(),
            subscribed = report.subscribed,
            unsubscribed = report.unsubscribed,
            "scan complete"
        );
    }

    /// Diff freshly scanned sets against the stored ones and emit events.
    fn commit_pull<S>(
        &mut self,
        players: &[PlayerRecord],
        scanned: Vec<(Subscriber, HashSet<EntityId>)>,
        sink: &mut S,
        report: &mut TickReport,
    ) where
        S: SubscriptionSink + ?Sized,
    {
        let present: HashSet<PlayerId> = players.iter().map(|p| p.id).collect();
        let ready: HashSet<PlayerId> = players.iter().filter(|p| p.ready).map(|p| p.id).collect();

        // Players that disconnected mid-tick: pending changes are discarded.
        self.subscriptions.retain(|key, _| {
            let keep = present.contains(&key.player);
            if !keep {
                debug!(player = key.player, "dropping stale subscription");
            }
            keep
        });

        let mut next: HashMap<Subscriber, HashSet<EntityId>> = scanned.into_iter().collect();

        // Ready players' stored sets that were not rescanned (their observer
        // entity is gone) diff against empty. Unready players keep theirs.
        let mut keys: Vec<Subscriber> = self
            .subscriptions
            .keys()
            .filter(|k| ready.contains(&k.player))
            .chain(next.keys())
            .copied()
            .collect();
        keys.sort_unstable();
        keys.dedup();

        for key in keys {
            let new = next.remove(&key).unwrap_or_default();
            let old = self.subscriptions.remove(&key).unwrap_or_default();
            let diff = diff_sets(&old, &new);
            for &entity in &diff.added {
                sink.subscribe_added(key, entity);
            }
            for &entity in &diff.removed {
                sink.subscribe_removed(key, entity);
            }
            report.subscribed += diff.added.len();
            report.unsubscribed += diff.removed.len();

            if key.observer.is_none() || !new.is_empty() {
                self.subscriptions.insert(key, new);
            }
        }
    }

    fn tick_push<R, S>(&mut self, dt: f32, roster: &R, sink: &mut S, report: &mut TickReport)
    where
        R: Roster + Sync + ?Sized,
        S: SubscriptionSink + ?Sized,
    {
        if self.config.grid_mode.is_static() && self.advance_cooldown(dt) {
            self.refresh_static(roster, report);
        }
        let Some(grid) = self.grid.as_ref() else {
            return;
        };
        let interval = self.config.update_interval;

        let players = roster.players();
        let present: HashSet<PlayerId> = players.iter().map(|p| p.id).collect();

        // Subjects that left the grid lose all subscribers. Disconnected
        // players are dropped without events.
        let mut gone: Vec<EntityId> = self.subjects.keys().filter(|id| !grid.contains(**id)).copied().collect();
        gone.sort_unstable();
        for id in gone {
            let Some(state) = self.subjects.remove(&id) else {
                continue;
            };
            let mut subscribers: Vec<PlayerId> = state
                .subscribers
                .into_iter()
                .filter(|p| {
                    let keep = present.contains(p);
                    if !keep {
                        debug!(player = *p, entity = id, "dropping stale subscription");
                    }
                    keep
                })
                .collect();
            subscribers.sort_unstable();
            for &player in &subscribers {
                sink.subscribe_removed(Subscriber::player(player), id);
            }
            report.unsubscribed += subscribers.len();
            if !subscribers.is_empty() {
                sink.subscribers_changed(id, &[]);
            }
        }

        for id in grid.ids() {
            self.subjects.entry(id).or_insert_with(|| SubjectState {
                cooldown: stagger(id, interval),
                subscribers: HashSet::new(),
            });
        }

        let mut due: Vec<EntityId> = Vec::new();
        for (&id, state) in self.subjects.iter_mut() {
            state.cooldown -= dt;
            if state.cooldown <= 0.0 {
                state.cooldown = interval;
                due.push(id);
            }
        }
        if due.is_empty() {
            return;
        }
        due.sort_unstable();

        let _span = debug_span!("interest_scan", scan = self.scans + 1, mode = "push").entered();
        self.phase = TickPhase::Scanning;
        let start = Instant::now();

        let unready: HashSet<PlayerId> = players.iter().filter(|p| !p.ready).map(|p| p.id).collect();
        let owners: HashMap<EntityId, PlayerId> = players
            .iter()
            .filter(|p| p.ready)
            .flat_map(|p| p.owned.iter().map(move |&e| (e, p.id)))
            .collect();

        for &id in &due {
            let mut new = match roster.lookup_entity(id) {
                Some(subject) => subscribers_for(grid, &self.projector, &self.policy, roster, &owners, &subject),
                None => {
                    trace!(entity = id, "subject no longer spawned; not visible");
                    HashSet::new()
                }
            };
            let Some(state) = self.subjects.get_mut(&id) else {
                continue;
            };

            // Disconnected players are dropped silently; unready ones keep
            // what they had.
            state.subscribers.retain(|p| present.contains(p));
            new.extend(state.subscribers.iter().filter(|p| unready.contains(*p)).copied());

            let diff = diff_sets(&state.subscribers, &new);
            if diff.is_empty() {
                continue;
            }
            for &player in &diff.added {
                sink.subscribe_added(Subscriber::player(player), id);
            }
            for &player in &diff.removed {
                sink.subscribe_removed(Subscriber::player(player), id);
            }
            report.subscribed += diff.added.len();
            report.unsubscribed += diff.removed.len();

            let mut list: Vec<PlayerId> = new.iter().copied().collect();
            list.sort_unstable();
            state.subscribers = new;
            sink.subscribers_changed(id, &list);
        }

        self.profiler.record("scan", start.elapsed());
        self.scans += 1;
        self.profiler.tick();
        report.scanned = true;
        report.rebuilt_subjects = due.len();
        debug!(
            subjects = due.len(),
            subscribed = report.subscribed,
            unsubscribed = report.unsubscribed,
            "subscriber rebuild complete"
        );
    }
}

/// Planar bounds of a world box.
fn project_box(projector: &CoordinateProjector, world: WorldBox) -> Option<Bounds> {
    Bounds::enclosing([projector.project(world.min), projector.project(world.max())])
}

/// First cooldown of a push-mode subject: a fraction of the interval picked
/// from its id, so rebuilds spread over frames.
fn stagger(id: EntityId, interval: f32) -> f32 {
    let slot = id.wrapping_mul(2_654_435_761) >> 22;
    interval * slot as f32 / 1024.0
}

/// Everything `observer` can see. Always contains the observer itself.
fn visible_from<P, R>(
    grid: &SpatialGrid,
    projector: &CoordinateProjector,
    policy: &P,
    roster: &R,
    observer: &EntityRecord,
) -> HashSet<EntityId>
where
    P: VisibilityPolicy,
    R: Roster + ?Sized,
{
    let mut visible = HashSet::new();
    visible.insert(observer.id);

    let query = Shape::circle(projector.project(observer.position), observer.range);
    for id in grid.contact(&query) {
        if id == observer.id {
            continue;
        }
        match roster.lookup_entity(id) {
            Some(candidate) => {
                if policy.should_subscribe(observer, &candidate) {
                    visible.insert(id);
                }
            }
            None => trace!(entity = id, "candidate no longer spawned; not visible"),
        }
    }
    visible
}

/// Ready players that should receive `subject`. The owner always does.
fn subscribers_for<P, R>(
    grid: &SpatialGrid,
    projector: &CoordinateProjector,
    policy: &P,
    roster: &R,
    owners: &HashMap<EntityId, PlayerId>,
    subject: &EntityRecord,
) -> HashSet<PlayerId>
where
    P: VisibilityPolicy,
    R: Roster + ?Sized,
{
    let mut players = HashSet::new();
    if let Some(&owner) = owners.get(&subject.id) {
        players.insert(owner);
    }

    let query = Shape::circle(projector.project(subject.position), subject.range);
    for id in grid.contact(&query) {
        let Some(&player) = owners.get(&id) else {
            continue;
        };
        if players.contains(&player) {
            continue;
        }
        match roster.lookup_entity(id) {
            Some(observer) => {
                if policy.should_subscribe(&observer, subject) {
                    players.insert(player);
                }
            }
            None => trace!(entity = id, "observer no longer spawned; not visible"),
        }
    }
    players
}

/// Compute new subscription sets for every ready player.
///
/// The grid and roster are only read here, so with the `parallel` feature
/// players are scanned concurrently; each player's sets are built in
/// isolation and merged by the single-threaded diff.
fn scan_pull<P, R>(
    grid: &SpatialGrid,
    projector: &CoordinateProjector,
    policy: &P,
    scope: SubscriptionScope,
    roster: &R,
    players: &[PlayerRecord],
) -> Vec<(Subscriber, HashSet<EntityId>)>
where
    P: VisibilityPolicy,
    R: Roster + Sync + ?Sized,
{
    let scan_player = |player: &PlayerRecord| -> Vec<(Subscriber, HashSet<EntityId>)> {
        let mut sets = Vec::new();
        if scope == SubscriptionScope::PerPlayer {
            sets.push((Subscriber::player(player.id), HashSet::new()));
        }
        for &owned in &player.owned {
            let Some(observer) = roster.lookup_entity(owned) else {
                trace!(entity = owned, player = player.id, "owned entity not spawned; skipped");
                continue;
            };
            let visible = visible_from(grid, projector, policy, roster, &observer);
            match scope {
                SubscriptionScope::PerPlayer => sets[0].1.extend(visible),
                SubscriptionScope::PerEntity => sets.push((Subscriber::entity(player.id, owned), visible)),
            }
        }
        sets
    };

    #[cfg(feature = "parallel")]
    {
        use rayon::prelude::*;
        players.par_iter().filter(|p| p.ready).flat_map_iter(scan_player).collect()
    }
    #[cfg(not(feature = "parallel"))]
    {
        players.iter().filter(|p| p.ready).flat_map(scan_player).collect()
    }
}
