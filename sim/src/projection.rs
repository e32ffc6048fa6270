//! Projection from 3D world space onto the 2D plane indexed by the grid.
//!
//! The grid only ever sees planar coordinates. Which two world axes form the
//! plane is chosen once per grid instance through [`AxisMode`]; switching the
//! mode means rebuilding the grid.

use serde::{Deserialize, Serialize};

/// A position on the grid plane.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec2 {
    pub x: f32,
    pub y: f32,
}

impl Vec2 {
    pub const ZERO: Vec2 = Vec2 { x: 0.0, y: 0.0 };

    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_squared(&self, other: Vec2) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        dx * dx + dy * dy
    }

    pub fn distance(&self, other: Vec2) -> f32 {
        self.distance_squared(other).sqrt()
    }
}

/// A position in 3D world space.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };

    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn distance_squared(&self, other: Vec3) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        let dz = self.z - other.z;
        dx * dx + dy * dy + dz * dz
    }

    pub fn distance(&self, other: Vec3) -> f32 {
        self.distance_squared(other).sqrt()
    }

    pub fn to_array(self) -> [f32; 3] {
        [self.x, self.y, self.z]
    }
}

impl From<[f32; 3]> for Vec3 {
    fn from(v: [f32; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }
}

/// Which pair of world axes becomes the grid plane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum AxisMode {
    /// Ground plane of a Y-up world (3D games). Drops Y.
    #[default]
    XZ,
    /// Screen plane of a 2D world. Drops Z.
    XY,
}

/// Maps world positions onto the grid plane and back.
///
/// Only `project` matters for correctness. The inverse helpers exist for
/// debug output, where grid geometry has to be drawn in world space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CoordinateProjector {
    mode: AxisMode,
}

impl CoordinateProjector {
    pub fn new(mode: AxisMode) -> Self {
        Self { mode }
    }

    pub fn mode(&self) -> AxisMode {
        self.mode
    }

    /// Project a world position onto the grid plane.
    #[inline]
    pub fn project(&self, world: Vec3) -> Vec2 {
        match self.mode {
            AxisMode::XZ => Vec2::new(world.x, world.z),
            AxisMode::XY => Vec2::new(world.x, world.y),
        }
    }

    /// Lift a plane position back into world space. The dropped axis is 0.
    pub fn unproject(&self, plane: Vec2) -> Vec3 {
        match self.mode {
            AxisMode::XZ => Vec3::new(plane.x, 0.0, plane.y),
            AxisMode::XY => Vec3::new(plane.x, plane.y, 0.0),
        }
    }

    /// World-space position of a grid origin (its minimum corner).
    pub fn origin_world(&self, origin: Vec2) -> Vec3 {
        self.unproject(origin)
    }

    /// World-space extent of a single cell.
    pub fn cell_size_world(&self, cell_size: f32) -> Vec3 {
        self.unproject(Vec2::new(cell_size, cell_size))
    }

    /// World-space offset of cell (`col`, `row`) from the grid origin.
    pub fn cell_offset_world(&self, cell_size: f32, col: u32, row: u32) -> Vec3 {
        self.unproject(Vec2::new(cell_size * col as f32, cell_size * row as f32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_project_xz_drops_height() {
        let p = CoordinateProjector::new(AxisMode::XZ);
        assert_eq!(p.project(Vec3::new(1.0, 99.0, 3.0)), Vec2::new(1.0, 3.0));
    }

    #[test]
    fn test_project_xy_drops_depth() {
        let p = CoordinateProjector::new(AxisMode::XY);
        assert_eq!(p.project(Vec3::new(1.0, 2.0, 99.0)), Vec2::new(1.0, 2.0));
    }

    #[test]
    fn test_unproject_inverts_project_on_plane() {
        for mode in [AxisMode::XZ, AxisMode::XY] {
            let p = CoordinateProjector::new(mode);
            let plane = Vec2::new(-4.5, 12.0);
            assert_eq!(p.project(p.unproject(plane)), plane);
        }
    }

    #[test]
    fn test_cell_helpers() {
        let p = CoordinateProjector::new(AxisMode::XZ);
        assert_eq!(p.cell_size_world(10.0), Vec3::new(10.0, 0.0, 10.0));
        assert_eq!(p.cell_offset_world(10.0, 2, 3), Vec3::new(20.0, 0.0, 30.0));

        let p = CoordinateProjector::new(AxisMode::XY);
        assert_eq!(p.cell_offset_world(10.0, 2, 3), Vec3::new(20.0, 30.0, 0.0));
    }
}
