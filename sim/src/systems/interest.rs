//! Drives the interest manager from the ECS schedule.

use crate::interest::{InterestManager, TickReport};
use crate::roster::RosterSnapshot;
use crate::subscription::EventLog;
use crate::visibility::VisibilityPolicy;
use bevy_ecs::prelude::*;

/// Delta time resource (seconds per fixed update).
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct DeltaTime(pub f32);

/// Fixed updates run so far.
#[derive(Resource, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ServerTick(pub u64);

impl ServerTick {
    pub fn increment(&mut self) {
        self.0 = self.0.wrapping_add(1);
    }
}

/// Outcome of the most recent interest tick.
#[derive(Resource, Debug, Clone, Copy, Default)]
pub struct LastTickReport(pub TickReport);

/// System that advances the interest manager by one fixed update.
///
/// ## Data Access
/// - Reads: DeltaTime, RosterSnapshot
/// - Writes: InterestManager, EventLog, LastTickReport
pub fn interest_tick_system<P: VisibilityPolicy + 'static>(
    dt: Res<DeltaTime>,
    roster: Res<RosterSnapshot>,
    mut manager: ResMut<InterestManager<P>>,
    mut log: ResMut<EventLog>,
    mut last: ResMut<LastTickReport>,
) {
    last.0 = manager.tick(dt.0, &*roster, &mut *log);
}
