//! Uniform Spatial Grid
//!
//! Buckets items by the XZ cell their position falls in, so locality
//! queries only visit the handful of cells a query circle overlaps
//! instead of every registered item.
//!
//! The grid stores the position an item had when it was last inserted.
//! It does not track motion on its own; callers re-insert an item when
//! they want its bucket refreshed.
//!
//! ## Cells
//! Cell `(i, j)` covers `x ∈ [i·s, (i+1)·s)` and `z ∈ [j·s, (j+1)·s)` for
//! cell size `s`. Height (Y) is ignored: arenas are flat enough that a
//! column-per-cell layout keeps queries cheap.

use glam::Vec3;
use std::collections::HashMap;
use std::hash::Hash;

/// Default cell edge length in world units.
pub const DEFAULT_CELL_SIZE: f32 = 10.0;

/// Integer XZ cell coordinate.
pub type GridCell = (i32, i32);

/// Uniform XZ hash grid of `T` keys.
#[derive(Debug, Clone)]
pub struct SpatialGrid<T> {
    cell_size: f32,
    inv_cell_size: f32,
    cells: HashMap<GridCell, Vec<T>>,
    locations: HashMap<T, GridCell>,
}

impl<T: Copy + Eq + Hash> SpatialGrid<T> {
    /// Create an empty grid. Non-positive sizes fall back to [`DEFAULT_CELL_SIZE`].
    pub fn new(cell_size: f32) -> Self {
        let cell_size = if cell_size > 0.0 && cell_size.is_finite() {
            cell_size
        } else {
            DEFAULT_CELL_SIZE
        };
        Self {
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            cells: HashMap::new(),
            locations: HashMap::new(),
        }
    }

    /// Edge length of one cell.
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Cell containing `position`.
    #[inline]
    pub fn cell_of(&self, position: Vec3) -> GridCell {
        (
            (position.x * self.inv_cell_size).floor() as i32,
            (position.z * self.inv_cell_size).floor() as i32,
        )
    }

    /// Insert `item` at `position`, moving it if it is already present.
    pub fn insert(&mut self, item: T, position: Vec3) {
        let cell = self.cell_of(position);
        if let Some(&old) = self.locations.get(&item) {
            if old == cell {
                return;
            }
            self.detach(item, old);
        }
        self.cells.entry(cell).or_default().push(item);
        self.locations.insert(item, cell);
    }

    /// Remove `item`. Returns `false` if it was not present.
    pub fn remove(&mut self, item: T) -> bool {
        match self.locations.remove(&item) {
            Some(cell) => {
                self.detach(item, cell);
                true
            }
            None => false,
        }
    }

    fn detach(&mut self, item: T, cell: GridCell) {
        if let Some(bucket) = self.cells.get_mut(&cell) {
            if let Some(i) = bucket.iter().position(|&x| x == item) {
                bucket.swap_remove(i);
            }
            if bucket.is_empty() {
                self.cells.remove(&cell);
            }
        }
    }

    /// Whether `item` is stored in the grid.
    pub fn contains(&self, item: T) -> bool {
        self.locations.contains_key(&item)
    }

    /// Cell `item` was last bucketed in.
    pub fn location(&self, item: T) -> Option<GridCell> {
        self.locations.get(&item).copied()
    }

    /// Append every item whose cell overlaps the XZ square bounding the
    /// query circle. Results are candidates; callers filter by exact distance.
    ///
    /// When the square spans more cells than are occupied, the occupied
    /// cells are scanned instead, so wide queries cost at most one visit
    /// per non-empty cell. A NaN radius is treated as zero; an infinite
    /// one covers the whole grid.
    pub fn query_radius_into(&self, center: Vec3, radius: f32, out: &mut Vec<T>) {
        let radius = if radius.is_nan() { 0.0 } else { radius.max(0.0) };
        let (min_x, min_z) = self.cell_of(center - Vec3::new(radius, 0.0, radius));
        let (max_x, max_z) = self.cell_of(center + Vec3::new(radius, 0.0, radius));

        let span = (i64::from(max_x) - i64::from(min_x) + 1)
            .saturating_mul(i64::from(max_z) - i64::from(min_z) + 1);
        if span > self.cells.len() as i64 {
            for (&(i, j), bucket) in &self.cells {
                if (min_x..=max_x).contains(&i) && (min_z..=max_z).contains(&j) {
                    out.extend_from_slice(bucket);
                }
            }
            return;
        }

        for i in min_x..=max_x {
            for j in min_z..=max_z {
                if let Some(bucket) = self.cells.get(&(i, j)) {
                    out.extend_from_slice(bucket);
                }
            }
        }
    }

    /// Allocating convenience wrapper around [`Self::query_radius_into`].
    pub fn query_radius(&self, center: Vec3, radius: f32) -> Vec<T> {
        let mut out = Vec::new();
        self.query_radius_into(center, radius, &mut out);
        out
    }

    /// Number of stored items.
    pub fn len(&self) -> usize {
        self.locations.len()
    }

    /// Whether the grid holds no items.
    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }

    /// Number of non-empty cells.
    pub fn occupied_cells(&self) -> usize {
        self.cells.len()
    }

    /// Remove everything.
    pub fn clear(&mut self) {
        self.cells.clear();
        self.locations.clear();
    }
}

impl<T: Copy + Eq + Hash> Default for SpatialGrid<T> {
    fn default() -> Self {
        Self::new(DEFAULT_CELL_SIZE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cell_of_handles_negative_coordinates() {
        let grid: SpatialGrid<u32> = SpatialGrid::new(10.0);
        assert_eq!(grid.cell_of(Vec3::new(0.0, 0.0, 0.0)), (0, 0));
        assert_eq!(grid.cell_of(Vec3::new(9.99, 50.0, 10.0)), (0, 1));
        assert_eq!(grid.cell_of(Vec3::new(-0.01, 0.0, -10.0)), (-1, -1));
    }

    #[test]
    fn test_invalid_cell_size_falls_back() {
        let grid: SpatialGrid<u32> = SpatialGrid::new(0.0);
        assert_eq!(grid.cell_size(), DEFAULT_CELL_SIZE);
    }

    #[test]
    fn test_insert_and_query() {
        let mut grid = SpatialGrid::new(10.0);
        grid.insert(1u32, Vec3::new(5.0, 0.0, 5.0));
        grid.insert(2u32, Vec3::new(55.0, 0.0, 5.0));

        let near = grid.query_radius(Vec3::new(4.0, 0.0, 4.0), 3.0);
        assert_eq!(near, vec![1]);

        let wide = grid.query_radius(Vec3::new(30.0, 0.0, 5.0), 30.0);
        assert_eq!(wide.len(), 2);
    }

    #[test]
    fn test_reinsert_moves_item() {
        let mut grid = SpatialGrid::new(10.0);
        grid.insert(7u32, Vec3::new(1.0, 0.0, 1.0));
        grid.insert(7u32, Vec3::new(41.0, 0.0, 1.0));

        assert_eq!(grid.len(), 1);
        assert_eq!(grid.occupied_cells(), 1);
        assert_eq!(grid.location(7), Some((4, 0)));
        assert!(grid.query_radius(Vec3::new(1.0, 0.0, 1.0), 1.0).is_empty());
    }

    #[test]
    fn test_wide_query_scans_occupied_cells() {
        let mut grid = SpatialGrid::new(1.0);
        grid.insert(1u32, Vec3::new(2.5, 0.0, -3.5));
        grid.insert(2u32, Vec3::new(90_000.0, 0.0, 0.0));

        let mut found = grid.query_radius(Vec3::ZERO, 50_000.0);
        assert_eq!(found, vec![1]);

        found = grid.query_radius(Vec3::ZERO, f32::INFINITY);
        found.sort_unstable();
        assert_eq!(found, vec![1, 2]);

        assert!(grid.query_radius(Vec3::new(9.0, 0.0, 9.0), f32::NAN).is_empty());
    }

    #[test]
    fn test_remove_drops_empty_cells() {
        let mut grid = SpatialGrid::new(10.0);
        grid.insert(1u32, Vec3::ZERO);
        assert!(grid.remove(1));
        assert!(!grid.remove(1));
        assert!(grid.is_empty());
        assert_eq!(grid.occupied_cells(), 0);
    }
}
