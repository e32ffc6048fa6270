//! Error types.
//!
//! Nothing here is fatal to a server. The interest manager absorbs these
//! during a tick and logs them; they only reach callers through the
//! explicit mutation surface.

use crate::spatial::EntityId;
use thiserror::Error;

/// Errors raised by [`crate::spatial::SpatialGrid`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum GridError {
    /// `add` was called with an id that is already indexed. The original
    /// entry is kept.
    #[error("entity {0} is already in the grid")]
    DuplicateId(EntityId),

    /// `update` referenced an id that is not indexed.
    #[error("entity {0} is not in the grid")]
    UnknownEntity(EntityId),

    /// A grid cannot be built over a zero or negative area.
    #[error("degenerate bounds {width}x{height}")]
    DegenerateBounds { width: f32, height: f32 },

    #[error("cell size must be positive and finite, got {0}")]
    InvalidCellSize(f32),

    /// Bounds / cell size would allocate more cells than the grid allows.
    #[error("grid of {cols}x{rows} cells exceeds the cell limit")]
    TooManyCells { cols: usize, rows: usize },
}

/// Invalid configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid config field `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },

    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Top-level error for constructing and driving an interest manager.
#[derive(Debug, Error)]
pub enum InterestError {
    #[error(transparent)]
    Grid(#[from] GridError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A dynamic grid needs bounds, from the config or the world.
    #[error("dynamic grid requires bounds but none were configured or reported by the world")]
    MissingBounds,
}
