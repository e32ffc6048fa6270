//! Configuration for the interest manager and the ECS server wrapper.
//!
//! All fields have defaults, so a JSON config only needs the values it
//! changes:
//!
//! ```json
//! {
//!   "axis_mode": "XY",
//!   "cell_size": 50.0,
//!   "grid_mode": { "kind": "Dynamic", "bounds": { "min": { "x": -500.0, "y": -500.0 },
//!                                                  "size": { "x": 1000.0, "y": 1000.0 } } },
//!   "query_mode": "Push"
//! }
//! ```

use crate::error::ConfigError;
use crate::projection::{AxisMode, CoordinateProjector};
use crate::spatial::Bounds;
use crate::visibility::{DistanceMetric, RangePolicy, RangeRule};
use bevy_ecs::prelude::*;
use serde::{Deserialize, Serialize};

/// Network role of this process. Only the authoritative server scans.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Role {
    #[default]
    Server,
    Client,
}

/// Where a static grid takes its extent from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum StaticBounds {
    /// Bounding box of the live entities, recomputed every scan.
    #[default]
    LiveEntities,
    /// World geometry bounds, read from the roster once.
    World,
}

/// Grid lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum GridMode {
    /// Rebuilt wholesale from a roster snapshot every scan.
    Static {
        #[serde(default)]
        bounds: StaticBounds,
    },
    /// Fixed extent, kept current by add/update/remove between scans.
    /// Without explicit bounds the world bounds are used.
    Dynamic {
        #[serde(default)]
        bounds: Option<Bounds>,
    },
}

impl Default for GridMode {
    fn default() -> Self {
        Self::Static {
            bounds: StaticBounds::LiveEntities,
        }
    }
}

impl GridMode {
    pub fn is_static(&self) -> bool {
        matches!(self, Self::Static { .. })
    }

    pub fn is_dynamic(&self) -> bool {
        matches!(self, Self::Dynamic { .. })
    }
}

/// Which side initiates the query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QueryMode {
    /// Each observer queries for what it can see, once per interval.
    #[default]
    Pull,
    /// Each entity queries for the players that can see it, on its own
    /// staggered cooldown.
    Push,
}

/// Granularity of pull-mode subscription sets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SubscriptionScope {
    /// One set per player: the union over its owned entities.
    #[default]
    PerPlayer,
    /// One set per owned entity.
    PerEntity,
}

/// Interest manager configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InterestConfig {
    pub axis_mode: AxisMode,
    /// Cell edge length in world units.
    pub cell_size: f32,
    /// Seconds between scans (and between push-mode rebuilds per entity).
    pub update_interval: f32,
    pub grid_mode: GridMode,
    pub query_mode: QueryMode,
    pub subscription_scope: SubscriptionScope,
    pub range_rule: RangeRule,
    pub distance_metric: DistanceMetric,
    /// Dynamic mode: moves shorter than this (world units) skip the grid.
    pub movement_threshold: f32,
    pub role: Role,
}

impl Default for InterestConfig {
    fn default() -> Self {
        Self {
            axis_mode: AxisMode::XZ,
            cell_size: 100.0,
            update_interval: 1.0,
            grid_mode: GridMode::default(),
            query_mode: QueryMode::Pull,
            subscription_scope: SubscriptionScope::PerPlayer,
            range_rule: RangeRule::Candidate,
            distance_metric: DistanceMetric::Full3d,
            movement_threshold: 1.0,
            role: Role::Server,
        }
    }
}

impl InterestConfig {
    /// Parse and validate a JSON config.
    pub fn from_json(data: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.cell_size > 0.0 && self.cell_size.is_finite()) {
            return Err(invalid("cell_size", format!("must be positive and finite, got {}", self.cell_size)));
        }
        if !(self.update_interval >= 0.0 && self.update_interval.is_finite()) {
            return Err(invalid(
                "update_interval",
                format!("must be non-negative and finite, got {}", self.update_interval),
            ));
        }
        if !(self.movement_threshold >= 0.0) {
            return Err(invalid(
                "movement_threshold",
                format!("must be non-negative, got {}", self.movement_threshold),
            ));
        }
        if let GridMode::Dynamic { bounds: Some(bounds) } = self.grid_mode {
            if bounds.is_degenerate() {
                return Err(invalid(
                    "grid_mode.bounds",
                    format!("must have positive size, got {}x{}", bounds.width(), bounds.height()),
                ));
            }
        }
        Ok(())
    }

    pub fn projector(&self) -> CoordinateProjector {
        CoordinateProjector::new(self.axis_mode)
    }

    /// The default range policy for this configuration.
    pub fn range_policy(&self) -> RangePolicy {
        RangePolicy::new(self.range_rule, self.distance_metric, self.projector())
    }
}

fn invalid(field: &'static str, reason: String) -> ConfigError {
    ConfigError::Invalid { field, reason }
}

/// Configuration of the ECS [`crate::api::ServerWorld`].
#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Fixed timestep in seconds (e.g., 1/30 = 0.0333 for 30 Hz).
    pub fixed_timestep: f32,
    pub interest: InterestConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            fixed_timestep: 1.0 / 30.0,
            interest: InterestConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn from_json(data: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(data)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.fixed_timestep > 0.0 && self.fixed_timestep.is_finite()) {
            return Err(invalid(
                "fixed_timestep",
                format!("must be positive and finite, got {}", self.fixed_timestep),
            ));
        }
        self.interest.validate()
    }
}
