//! Uniform-cell spatial index over the projected 2D plane.
//!
//! Every stored shape is listed in each cell its bounding box touches, and a
//! query scans each cell its own bounding box touches. The cell scan is only
//! a broad phase: candidates are deduplicated and then checked with the
//! exact circle-circle test, so results never depend on how many cells a
//! shape spans.
//!
//! Cell coordinates are clamped to the grid extent. Shapes outside the
//! extent land in the border cells, and queries outside the extent scan
//! those same border cells, so the index stays correct for stragglers at
//! the cost of a denser border.

use crate::error::GridError;
use crate::projection::Vec2;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// Opaque network identifier of a replicated entity.
pub type EntityId = u32;

/// Upper bound on `cols * rows` for a single grid.
pub const MAX_CELLS: usize = 1 << 22;

/// Footprint of a stored entity or of a query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Point(Vec2),
    Circle { center: Vec2, radius: f32 },
}

impl Shape {
    pub fn point(x: f32, y: f32) -> Self {
        Self::Point(Vec2::new(x, y))
    }

    /// Circle footprint. Negative radii are treated as zero.
    pub fn circle(center: Vec2, radius: f32) -> Self {
        Self::Circle {
            center,
            radius: radius.max(0.0),
        }
    }

    pub fn center(&self) -> Vec2 {
        match *self {
            Self::Point(p) => p,
            Self::Circle { center, .. } => center,
        }
    }

    pub fn radius(&self) -> f32 {
        match *self {
            Self::Point(_) => 0.0,
            Self::Circle { radius, .. } => radius,
        }
    }

    /// Minimum and maximum corners of the axis-aligned bounding box.
    pub fn aabb(&self) -> (Vec2, Vec2) {
        let c = self.center();
        let r = self.radius();
        (Vec2::new(c.x - r, c.y - r), Vec2::new(c.x + r, c.y + r))
    }

    /// `distance(c1, c2) <= r1 + r2`.
    #[inline]
    pub fn overlaps(&self, other: &Shape) -> bool {
        let reach = self.radius() + other.radius();
        self.center().distance_squared(other.center()) <= reach * reach
    }
}

/// Axis-aligned rectangle given by its minimum corner and size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: Vec2,
    pub size: Vec2,
}

impl Bounds {
    pub fn new(min: Vec2, size: Vec2) -> Self {
        Self { min, size }
    }

    pub fn from_min_max(min: Vec2, max: Vec2) -> Self {
        Self {
            min,
            size: Vec2::new(max.x - min.x, max.y - min.y),
        }
    }

    /// Smallest bounds containing every point, or `None` for no points.
    pub fn enclosing<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Vec2>,
    {
        let mut iter = points.into_iter();
        let first = iter.next()?;
        let (mut min, mut max) = (first, first);
        for p in iter {
            min.x = min.x.min(p.x);
            min.y = min.y.min(p.y);
            max.x = max.x.max(p.x);
            max.y = max.y.max(p.y);
        }
        Some(Self::from_min_max(min, max))
    }

    pub fn width(&self) -> f32 {
        self.size.x
    }

    pub fn height(&self) -> f32 {
        self.size.y
    }

    pub fn max(&self) -> Vec2 {
        Vec2::new(self.min.x + self.size.x, self.min.y + self.size.y)
    }

    /// True unless both width and height are strictly positive.
    pub fn is_degenerate(&self) -> bool {
        !(self.size.x > 0.0 && self.size.y > 0.0)
    }
}

/// Integer cell address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    pub col: u32,
    pub row: u32,
}

impl CellCoord {
    pub fn new(col: u32, row: u32) -> Self {
        Self { col, row }
    }
}

/// Inclusive rectangle of cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellRange {
    pub min: CellCoord,
    pub max: CellCoord,
}

impl CellRange {
    pub fn contains(&self, cell: CellCoord) -> bool {
        cell.col >= self.min.col
            && cell.col <= self.max.col
            && cell.row >= self.min.row
            && cell.row <= self.max.row
    }

    pub fn cell_count(&self) -> usize {
        (self.max.col - self.min.col + 1) as usize * (self.max.row - self.min.row + 1) as usize
    }

    /// Row-major iteration over the covered cells.
    pub fn iter(&self) -> impl Iterator<Item = CellCoord> {
        let (min, max) = (self.min, self.max);
        (min.row..=max.row).flat_map(move |row| (min.col..=max.col).map(move |col| CellCoord { col, row }))
    }
}

/// Geometry of a grid: where it starts, how big a cell is, how many cells.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridDimensions {
    pub origin: Vec2,
    pub cell_size: f32,
    pub cols: u32,
    pub rows: u32,
}

impl GridDimensions {
    /// Dimensions covering `bounds`, including its maximum corner.
    pub fn covering(bounds: Bounds, cell_size: f32) -> Result<Self, GridError> {
        if !(cell_size > 0.0 && cell_size.is_finite()) {
            return Err(GridError::InvalidCellSize(cell_size));
        }
        if bounds.is_degenerate() || !bounds.size.x.is_finite() || !bounds.size.y.is_finite() {
            return Err(GridError::DegenerateBounds {
                width: bounds.width(),
                height: bounds.height(),
            });
        }

        let cols = (bounds.width() / cell_size).floor() as usize + 1;
        let rows = (bounds.height() / cell_size).floor() as usize + 1;
        if cols.saturating_mul(rows) > MAX_CELLS {
            return Err(GridError::TooManyCells { cols, rows });
        }

        Ok(Self {
            origin: bounds.min,
            cell_size,
            cols: cols as u32,
            rows: rows as u32,
        })
    }

    pub fn cell_count(&self) -> usize {
        self.cols as usize * self.rows as usize
    }

    /// Cell holding a plane position, clamped to the extent.
    #[inline]
    pub fn cell_at(&self, p: Vec2) -> CellCoord {
        CellCoord {
            col: clamp_axis((p.x - self.origin.x) / self.cell_size, self.cols),
            row: clamp_axis((p.y - self.origin.y) / self.cell_size, self.rows),
        }
    }

    /// Cells touched by a shape's bounding box, clamped to the extent.
    pub fn cell_range(&self, shape: &Shape) -> CellRange {
        let (lo, hi) = shape.aabb();
        CellRange {
            min: self.cell_at(lo),
            max: self.cell_at(hi),
        }
    }
}

#[inline]
fn clamp_axis(scaled: f32, count: u32) -> u32 {
    let last = count.saturating_sub(1);
    let v = scaled.floor();
    // NaN fails every comparison and falls through to 0.
    if v >= last as f32 {
        last
    } else if v > 0.0 {
        v as u32
    } else {
        0
    }
}

#[derive(Debug, Clone, Copy)]
struct GridEntry {
    shape: Shape,
    cells: CellRange,
}

/// Uniform grid of cells, each holding the ids whose footprint touches it.
///
/// The same structure backs both grid lifecycles: a static grid is filled
/// with `add` and emptied with `clear` every scan, a dynamic grid is kept
/// current with `add`/`update`/`remove`.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    dims: GridDimensions,
    /// Row-major, `cols * rows` cells.
    cells: Vec<Vec<EntityId>>,
    entries: HashMap<EntityId, GridEntry>,
}

impl SpatialGrid {
    /// Create an empty grid covering `bounds`.
    pub fn new(bounds: Bounds, cell_size: f32) -> Result<Self, GridError> {
        let dims = GridDimensions::covering(bounds, cell_size)?;
        Ok(Self {
            dims,
            cells: vec![Vec::new(); dims.cell_count()],
            entries: HashMap::new(),
        })
    }

    pub fn dimensions(&self) -> GridDimensions {
        self.dims
    }

    pub fn origin(&self) -> Vec2 {
        self.dims.origin
    }

    pub fn cell_size(&self) -> f32 {
        self.dims.cell_size
    }

    pub fn cols(&self) -> u32 {
        self.dims.cols
    }

    pub fn rows(&self) -> u32 {
        self.dims.rows
    }

    /// Number of indexed entities.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn shape_of(&self, id: EntityId) -> Option<Shape> {
        self.entries.get(&id).map(|e| e.shape)
    }

    /// Cells currently holding `id`.
    pub fn cells_of(&self, id: EntityId) -> Option<CellRange> {
        self.entries.get(&id).map(|e| e.cells)
    }

    /// Indexed ids, in no particular order.
    pub fn ids(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.entries.keys().copied()
    }

    #[inline]
    fn index(&self, cell: CellCoord) -> usize {
        cell.row as usize * self.dims.cols as usize + cell.col as usize
    }

    /// Ids listed in a cell. Out-of-range coordinates yield nothing.
    pub fn cell(&self, cell: CellCoord) -> &[EntityId] {
        if cell.col >= self.dims.cols || cell.row >= self.dims.rows {
            return &[];
        }
        &self.cells[self.index(cell)]
    }

    /// Non-empty cells, row-major (for debugging/visualization).
    pub fn occupied_cells(&self) -> impl Iterator<Item = (CellCoord, &[EntityId])> + '_ {
        let cols = self.dims.cols;
        self.cells.iter().enumerate().filter(|(_, ids)| !ids.is_empty()).map(move |(i, ids)| {
            let cell = CellCoord::new(i as u32 % cols, i as u32 / cols);
            (cell, ids.as_slice())
        })
    }

    /// Insert `id` into every cell its shape overlaps.
    pub fn add(&mut self, id: EntityId, shape: Shape) -> Result<(), GridError> {
        if self.entries.contains_key(&id) {
            return Err(GridError::DuplicateId(id));
        }
        let cells = self.dims.cell_range(&shape);
        for cell in cells.iter() {
            let i = self.index(cell);
            self.cells[i].push(id);
        }
        self.entries.insert(id, GridEntry { shape, cells });
        Ok(())
    }

    /// Move `id` to a new footprint, touching only the cells that changed.
    pub fn update(&mut self, id: EntityId, shape: Shape) -> Result<(), GridError> {
        let old = match self.entries.get(&id) {
            Some(entry) => entry.cells,
            None => return Err(GridError::UnknownEntity(id)),
        };
        let new = self.dims.cell_range(&shape);

        if old != new {
            for cell in old.iter().filter(|c| !new.contains(*c)) {
                let i = self.index(cell);
                remove_id(&mut self.cells[i], id);
            }
            for cell in new.iter().filter(|c| !old.contains(*c)) {
                let i = self.index(cell);
                self.cells[i].push(id);
            }
        }

        self.entries.insert(id, GridEntry { shape, cells: new });
        Ok(())
    }

    /// Remove `id` from every cell it occupies. Returns its last shape.
    pub fn remove(&mut self, id: EntityId) -> Option<Shape> {
        let entry = self.entries.remove(&id)?;
        for cell in entry.cells.iter() {
            let i = self.index(cell);
            remove_id(&mut self.cells[i], id);
        }
        Some(entry.shape)
    }

    /// Empty every cell, keeping the allocation.
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
        self.entries.clear();
    }

    /// Ids whose stored shape overlaps `query`, ascending, without duplicates.
    pub fn contact(&self, query: &Shape) -> Vec<EntityId> {
        let range = self.dims.cell_range(query);
        let mut seen: HashSet<EntityId> = HashSet::new();
        let mut hits = Vec::new();

        for cell in range.iter() {
            for &id in &self.cells[self.index(cell)] {
                if !seen.insert(id) {
                    continue;
                }
                if let Some(entry) = self.entries.get(&id) {
                    if entry.shape.overlaps(query) {
                        hits.push(id);
                    }
                }
            }
        }

        hits.sort_unstable();
        hits
    }
}

fn remove_id(cell: &mut Vec<EntityId>, id: EntityId) {
    if let Some(pos) = cell.iter().position(|&e| e == id) {
        cell.swap_remove(pos);
    }
}
