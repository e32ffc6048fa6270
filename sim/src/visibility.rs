//! Pairwise visibility decisions.
//!
//! The grid only produces candidates. Whether an observer actually gets a
//! candidate replicated is up to a [`VisibilityPolicy`], so deployments can
//! swap range checks for line-of-sight or faction rules without touching the
//! grid or the tick loop. Any `Fn(&EntityRecord, &EntityRecord) -> bool`
//! closure is a policy.

use crate::projection::CoordinateProjector;
use crate::roster::EntityRecord;
use serde::{Deserialize, Serialize};

/// Decides whether `observer` should be subscribed to `candidate`.
pub trait VisibilityPolicy: Send + Sync {
    fn should_subscribe(&self, observer: &EntityRecord, candidate: &EntityRecord) -> bool;
}

impl<F> VisibilityPolicy for F
where
    F: Fn(&EntityRecord, &EntityRecord) -> bool + Send + Sync,
{
    fn should_subscribe(&self, observer: &EntityRecord, candidate: &EntityRecord) -> bool {
        self(observer, candidate)
    }
}

/// Whose visibility radius bounds the distance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RangeRule {
    /// The candidate is visible within its own radius.
    #[default]
    Candidate,
    /// The observer sees within its own radius.
    Observer,
    /// Both radii must reach (symmetric, the smaller one wins).
    Both,
    /// Either radius is enough (the larger one wins).
    Either,
}

impl RangeRule {
    /// Maximum distance at which the pair is visible.
    pub fn threshold(self, observer_range: f32, candidate_range: f32) -> f32 {
        match self {
            Self::Candidate => candidate_range,
            Self::Observer => observer_range,
            Self::Both => observer_range.min(candidate_range),
            Self::Either => observer_range.max(candidate_range),
        }
    }
}

/// How distance between two entities is measured.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DistanceMetric {
    /// Distance on the grid plane; the dropped axis is ignored.
    Planar,
    /// Full world-space distance.
    #[default]
    Full3d,
}

/// Default policy: visible iff the pair is within range.
///
/// An entity always sees itself.
#[derive(Debug, Clone, Copy, Default)]
pub struct RangePolicy {
    rule: RangeRule,
    metric: DistanceMetric,
    projector: CoordinateProjector,
}

impl RangePolicy {
    pub fn new(rule: RangeRule, metric: DistanceMetric, projector: CoordinateProjector) -> Self {
        Self { rule, metric, projector }
    }

    pub fn rule(&self) -> RangeRule {
        self.rule
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn distance_squared(&self, a: &EntityRecord, b: &EntityRecord) -> f32 {
        match self.metric {
            DistanceMetric::Planar => self
                .projector
                .project(a.position)
                .distance_squared(self.projector.project(b.position)),
            DistanceMetric::Full3d => a.position.distance_squared(b.position),
        }
    }

    /// Additionally require `filter` to pass (faction checks and the like).
    pub fn with_filter<F>(self, filter: F) -> Filtered<Self, F>
    where
        F: Fn(&EntityRecord, &EntityRecord) -> bool + Send + Sync,
    {
        Filtered { inner: self, filter }
    }
}

impl VisibilityPolicy for RangePolicy {
    fn should_subscribe(&self, observer: &EntityRecord, candidate: &EntityRecord) -> bool {
        if observer.id == candidate.id {
            return true;
        }
        let limit = self.rule.threshold(observer.range, candidate.range);
        // NaN or negative radius never sees anything.
        if !(limit >= 0.0) {
            return false;
        }
        self.distance_squared(observer, candidate) <= limit * limit
    }
}

/// A policy narrowed by an extra predicate.
#[derive(Debug, Clone, Copy)]
pub struct Filtered<P, F> {
    inner: P,
    filter: F,
}

impl<P, F> VisibilityPolicy for Filtered<P, F>
where
    P: VisibilityPolicy,
    F: Fn(&EntityRecord, &EntityRecord) -> bool + Send + Sync,
{
    fn should_subscribe(&self, observer: &EntityRecord, candidate: &EntityRecord) -> bool {
        self.inner.should_subscribe(observer, candidate) && (self.filter)(observer, candidate)
    }
}
