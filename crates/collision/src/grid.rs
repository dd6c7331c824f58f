use std::collections::HashMap;

use frameguard_common::Aabb;

/// A 2D cell coordinate in the collision grid.
///
/// Stored as `i64` so that far-away or saturated positions never overflow
/// during neighbourhood arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellCoord {
    pub x: i64,
    pub y: i64,
}

impl CellCoord {
    pub fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }

    /// Chebyshev distance in cells.
    pub fn chebyshev(&self, other: CellCoord) -> u64 {
        self.x.abs_diff(other.x).max(self.y.abs_diff(other.y))
    }
}

/// Which input collection a grid entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Obstacle,
    Item,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridEntry {
    pub kind: EntityKind,
    /// Index into the slice the entity was bucketed from.
    pub index: usize,
}

/// Uniform grid bucketing entities by the cell containing their centre.
///
/// Rebuilt from scratch for every query cycle; nothing carries over between
/// ticks except the allocation.
#[derive(Debug)]
pub struct SpatialGrid {
    cell_size: f32,
    cells: HashMap<CellCoord, Vec<GridEntry>>,
    max_half_extent: f32,
    placements: usize,
}

impl SpatialGrid {
    /// Create a grid. Non-positive or non-finite sizes fall back to 128.
    pub fn new(cell_size: f32) -> Self {
        let cell_size = if cell_size.is_finite() && cell_size > 0.0 {
            cell_size
        } else {
            tracing::warn!(cell_size, "invalid cell size, using 128");
            128.0
        };
        Self {
            cell_size,
            cells: HashMap::new(),
            max_half_extent: 0.0,
            placements: 0,
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Drop every entry but keep the allocation.
    pub fn clear(&mut self) {
        self.cells.clear();
        self.max_half_extent = 0.0;
        self.placements = 0;
    }

    /// Bucket `entry` by the centre of `bounds` and widen the search radius if needed.
    pub fn insert(&mut self, bounds: &Aabb, entry: GridEntry) {
        let coord = self.cell_of(bounds.center().x, bounds.center().y);
        self.cells.entry(coord).or_default().push(entry);
        let half = bounds.half_extents();
        let extent = half.x.max(half.y);
        // A non-finite extent can reach any cell.
        self.max_half_extent = if !extent.is_finite() {
            f32::INFINITY
        } else {
            self.max_half_extent.max(extent)
        };
        self.placements += 1;
    }

    /// Convert a world position to a cell coordinate.
    pub fn cell_of(&self, x: f32, y: f32) -> CellCoord {
        CellCoord {
            x: (x / self.cell_size).floor() as i64,
            y: (y / self.cell_size).floor() as i64,
        }
    }

    /// Neighbourhood radius (in cells) that is guaranteed to contain every
    /// entity that can overlap a box with half-extent `probe_half_extent`.
    ///
    /// Radius 1 (a 3x3 block) whenever the combined extents fit in one cell.
    pub fn search_radius(&self, probe_half_extent: f32) -> u64 {
        let reach = probe_half_extent.max(0.0) + self.max_half_extent;
        if !reach.is_finite() {
            return u64::MAX;
        }
        ((reach / self.cell_size).floor() as u64).saturating_add(1)
    }

    /// Collect entries within `radius` cells of `center` into `out`.
    /// Returns the number of cells visited.
    pub fn collect_neighbourhood(&self, center: CellCoord, radius: u64, out: &mut Vec<GridEntry>) -> usize {
        let side = radius.saturating_mul(2).saturating_add(1);
        let block = side.saturating_mul(side);

        // Sparse grids with a huge radius are cheaper to scan cell by cell.
        if block > self.cells.len() as u64 {
            let mut visited = 0;
            for (coord, bucket) in &self.cells {
                if coord.chebyshev(center) <= radius {
                    out.extend_from_slice(bucket);
                    visited += 1;
                }
            }
            return visited;
        }

        let r = radius as i64;
        for dx in -r..=r {
            for dy in -r..=r {
                let coord = CellCoord::new(center.x.saturating_add(dx), center.y.saturating_add(dy));
                if let Some(bucket) = self.cells.get(&coord) {
                    out.extend_from_slice(bucket);
                }
            }
        }
        block as usize
    }

    /// Entries in a single cell.
    pub fn entries_in_cell(&self, coord: CellCoord) -> &[GridEntry] {
        self.cells.get(&coord).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of non-empty cells.
    pub fn cell_count(&self) -> usize {
        self.cells.values().filter(|b| !b.is_empty()).count()
    }

    /// Total number of entity placements across all cells.
    pub fn total_placements(&self) -> usize {
        self.placements
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    fn square(x: f32, y: f32, size: f32) -> Aabb {
        Aabb::from_center_size(Vec2::new(x, y), Vec2::splat(size))
    }

    fn obstacle(index: usize) -> GridEntry {
        GridEntry {
            kind: EntityKind::Obstacle,
            index,
        }
    }

    #[test]
    fn cell_of_basic() {
        let grid = SpatialGrid::new(128.0);
        assert_eq!(grid.cell_of(10.0, 10.0), CellCoord::new(0, 0));
        assert_eq!(grid.cell_of(130.0, -5.0), CellCoord::new(1, -1));
    }

    #[test]
    fn invalid_cell_size_falls_back() {
        assert_eq!(SpatialGrid::new(0.0).cell_size(), 128.0);
        assert_eq!(SpatialGrid::new(f32::NAN).cell_size(), 128.0);
    }

    #[test]
    fn insert_and_lookup() {
        let mut grid = SpatialGrid::new(128.0);
        grid.insert(&square(10.0, 10.0, 20.0), obstacle(0));
        grid.insert(&square(200.0, 10.0, 20.0), obstacle(1));
        assert_eq!(grid.cell_count(), 2);
        assert_eq!(grid.total_placements(), 2);
        assert_eq!(grid.entries_in_cell(CellCoord::new(1, 0)), &[obstacle(1)]);
        assert!(grid.entries_in_cell(CellCoord::new(9, 9)).is_empty());
    }

    #[test]
    fn small_entities_use_three_by_three() {
        let mut grid = SpatialGrid::new(128.0);
        grid.insert(&square(0.0, 0.0, 40.0), obstacle(0));
        assert_eq!(grid.search_radius(20.0), 1);
    }

    #[test]
    fn large_entities_widen_the_search() {
        let mut grid = SpatialGrid::new(128.0);
        grid.insert(&square(0.0, 0.0, 400.0), obstacle(0));
        assert_eq!(grid.search_radius(20.0), 2);
    }

    #[test]
    fn neighbourhood_collects_adjacent_cells_only() {
        let mut grid = SpatialGrid::new(128.0);
        grid.insert(&square(10.0, 10.0, 8.0), obstacle(0));
        grid.insert(&square(140.0, 140.0, 8.0), obstacle(1));
        grid.insert(&square(600.0, 600.0, 8.0), obstacle(2));

        let mut out = Vec::new();
        grid.collect_neighbourhood(CellCoord::new(0, 0), 1, &mut out);
        let mut indices: Vec<_> = out.iter().map(|e| e.index).collect();
        indices.sort();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn unbounded_extent_searches_everything() {
        let mut grid = SpatialGrid::new(128.0);
        grid.insert(
            &Aabb::new(Vec2::new(f32::NEG_INFINITY, -10.0), Vec2::new(f32::INFINITY, 10.0)),
            obstacle(0),
        );
        assert_eq!(grid.search_radius(16.0), u64::MAX);
    }

    #[test]
    fn huge_finite_extent_saturates_radius() {
        let mut grid = SpatialGrid::new(128.0);
        grid.insert(
            &Aabb::new(Vec2::new(-3.0e38, -10.0), Vec2::new(3.0e38, 10.0)),
            obstacle(0),
        );
        assert_eq!(grid.search_radius(16.0), u64::MAX);
    }

    #[test]
    fn clear_resets_counts() {
        let mut grid = SpatialGrid::new(64.0);
        grid.insert(&square(0.0, 0.0, 8.0), obstacle(0));
        grid.clear();
        assert_eq!(grid.cell_count(), 0);
        assert_eq!(grid.total_placements(), 0);
        assert_eq!(grid.search_radius(0.0), 1);
    }
}
