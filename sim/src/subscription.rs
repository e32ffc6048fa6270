//! Subscription sets, their diff, and the events the diff produces.

use crate::roster::PlayerId;
use crate::spatial::EntityId;
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::hash::Hash;

/// Key of a subscription set.
///
/// With per-player scope `observer` is `None` and the set is the union over
/// the player's entities; with per-entity scope each owned entity keeps its
/// own set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Subscriber {
    pub player: PlayerId,
    pub observer: Option<EntityId>,
}

impl Subscriber {
    pub fn player(player: PlayerId) -> Self {
        Self { player, observer: None }
    }

    pub fn entity(player: PlayerId, observer: EntityId) -> Self {
        Self {
            player,
            observer: Some(observer),
        }
    }
}

/// A change to replicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubscriptionEvent {
    Added { subscriber: Subscriber, entity: EntityId },
    Removed { subscriber: Subscriber, entity: EntityId },
    /// Push model: the full new subscriber list of an entity.
    SubscribersChanged { entity: EntityId, players: Vec<PlayerId> },
}

/// Receives subscription changes; implemented by the transport layer.
pub trait SubscriptionSink {
    fn subscribe_added(&mut self, subscriber: Subscriber, entity: EntityId);

    fn subscribe_removed(&mut self, subscriber: Subscriber, entity: EntityId);

    /// Push model only. `players` is sorted.
    fn subscribers_changed(&mut self, _entity: EntityId, _players: &[PlayerId]) {}
}

/// Sink that records every event in order.
#[derive(Resource, Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<SubscriptionEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[SubscriptionEvent] {
        &self.events
    }

    pub fn drain(&mut self) -> Vec<SubscriptionEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }

    /// Entities added for `player`, in event order.
    pub fn added_for(&self, player: PlayerId) -> Vec<EntityId> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SubscriptionEvent::Added { subscriber, entity } if subscriber.player == player => Some(*entity),
                _ => None,
            })
            .collect()
    }

    /// Entities removed for `player`, in event order.
    pub fn removed_for(&self, player: PlayerId) -> Vec<EntityId> {
        self.events
            .iter()
            .filter_map(|e| match e {
                SubscriptionEvent::Removed { subscriber, entity } if subscriber.player == player => Some(*entity),
                _ => None,
            })
            .collect()
    }
}

impl SubscriptionSink for EventLog {
    fn subscribe_added(&mut self, subscriber: Subscriber, entity: EntityId) {
        self.events.push(SubscriptionEvent::Added { subscriber, entity });
    }

    fn subscribe_removed(&mut self, subscriber: Subscriber, entity: EntityId) {
        self.events.push(SubscriptionEvent::Removed { subscriber, entity });
    }

    fn subscribers_changed(&mut self, entity: EntityId, players: &[PlayerId]) {
        self.events.push(SubscriptionEvent::SubscribersChanged {
            entity,
            players: players.to_vec(),
        });
    }
}

/// Result of comparing a previous set with a new one. Both lists are sorted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetDiff<T> {
    /// In new, not in previous.
    pub added: Vec<T>,
    /// In previous, not in new.
    pub removed: Vec<T>,
}

impl<T> SetDiff<T> {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.removed.is_empty()
    }
}

/// `next - previous` and `previous - next`.
pub fn diff_sets<T>(previous: &HashSet<T>, next: &HashSet<T>) -> SetDiff<T>
where
    T: Copy + Eq + Hash + Ord,
{
    let mut added: Vec<T> = next.difference(previous).copied().collect();
    let mut removed: Vec<T> = previous.difference(next).copied().collect();
    added.sort_unstable();
    removed.sort_unstable();
    SetDiff { added, removed }
}
