//! The multi-level surface grid container.

use nalgebra::{Vector2, Vector3};

use crate::bounds::Aabb3;
use crate::cell::CellIndex;
use crate::patch::SurfacePatch;

/// Multi-level surface grid.
///
/// A dense 2D grid of cells, each holding a list of [`SurfacePatch`]es kept
/// sorted by their top height. Cells are square with side `resolution`; the
/// grid origin is the world position of cell `(0, 0)`'s minimum corner.
#[derive(Clone, Debug)]
pub struct MlsGrid {
    width: usize,
    height: usize,
    resolution: f64,
    origin: Vector2<f64>,
    cells: Vec<Vec<SurfacePatch>>,
}

impl MlsGrid {
    /// Create an empty grid of `width` x `height` cells.
    pub fn new(width: usize, height: usize, resolution: f64, origin: Vector2<f64>) -> Self {
        Self {
            width,
            height,
            resolution,
            origin,
            cells: vec![Vec::new(); width * height],
        }
    }

    /// Number of cells in x and y.
    #[inline]
    pub fn num_cells(&self) -> (usize, usize) {
        (self.width, self.height)
    }

    /// Cell side length in meters.
    #[inline]
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// World position of cell `(0, 0)`'s minimum corner.
    #[inline]
    pub fn origin(&self) -> Vector2<f64> {
        self.origin
    }

    /// Check whether an index addresses a cell inside the grid.
    #[inline]
    pub fn in_grid(&self, idx: CellIndex) -> bool {
        idx.x >= 0 && idx.y >= 0 && (idx.x as usize) < self.width && (idx.y as usize) < self.height
    }

    /// Convert a world position to the index of the cell containing its xy
    /// projection. Returns `None` outside the grid.
    pub fn to_grid(&self, world: &Vector3<f64>) -> Option<CellIndex> {
        let idx = CellIndex::new(
            ((world.x - self.origin.x) / self.resolution).floor() as i32,
            ((world.y - self.origin.y) / self.resolution).floor() as i32,
        );
        self.in_grid(idx).then_some(idx)
    }

    /// World position of a cell's center at z = 0. Returns `None` outside
    /// the grid.
    pub fn from_grid(&self, idx: CellIndex) -> Option<Vector3<f64>> {
        self.in_grid(idx).then(|| self.cell_center(idx))
    }

    /// World position of a cell's center at z = 0, without a bounds check.
    #[inline]
    pub fn cell_center(&self, idx: CellIndex) -> Vector3<f64> {
        Vector3::new(
            self.origin.x + (idx.x as f64 + 0.5) * self.resolution,
            self.origin.y + (idx.y as f64 + 0.5) * self.resolution,
            0.0,
        )
    }

    /// The patches of a cell, sorted by ascending top height. Out-of-grid
    /// indices yield an empty slice.
    pub fn patches(&self, idx: CellIndex) -> &[SurfacePatch] {
        if self.in_grid(idx) {
            &self.cells[idx.y as usize * self.width + idx.x as usize]
        } else {
            &[]
        }
    }

    /// Insert a patch into a cell, keeping the cell's list sorted by top
    /// height. Out-of-grid inserts are ignored.
    pub fn add_patch(&mut self, idx: CellIndex, patch: SurfacePatch) {
        if !self.in_grid(idx) {
            return;
        }
        let cell = &mut self.cells[idx.y as usize * self.width + idx.x as usize];
        let pos = cell.partition_point(|p| p.top() < patch.top());
        cell.insert(pos, patch);
    }

    /// Total number of patches in the grid.
    pub fn num_patches(&self) -> usize {
        self.cells.iter().map(Vec::len).sum()
    }

    /// Visit every patch whose cell lies under the box's xy footprint and
    /// whose vertical interval overlaps the box's z range.
    ///
    /// The callback returns `true` to abort the query early; the function
    /// returns whether it was aborted.
    pub fn intersect_aabb<F>(&self, aabb: &Aabb3, mut callback: F) -> bool
    where
        F: FnMut(CellIndex, &SurfacePatch) -> bool,
    {
        let lo_x = (((aabb.min.x - self.origin.x) / self.resolution).floor() as i64).max(0) as usize;
        let lo_y = (((aabb.min.y - self.origin.y) / self.resolution).floor() as i64).max(0) as usize;
        let hi_x = ((aabb.max.x - self.origin.x) / self.resolution).floor() as i64;
        let hi_y = ((aabb.max.y - self.origin.y) / self.resolution).floor() as i64;
        if hi_x < 0 || hi_y < 0 || lo_x >= self.width || lo_y >= self.height {
            return false;
        }
        let hi_x = (hi_x as usize).min(self.width - 1);
        let hi_y = (hi_y as usize).min(self.height - 1);

        for y in lo_y..=hi_y {
            for x in lo_x..=hi_x {
                let idx = CellIndex::new(x as i32, y as i32);
                for patch in &self.cells[y * self.width + x] {
                    if !aabb.overlaps_z(patch.bottom(), patch.top()) {
                        continue;
                    }
                    if callback(idx, patch) {
                        return true;
                    }
                }
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flat_grid(n: usize, z: f64) -> MlsGrid {
        let mut grid = MlsGrid::new(n, n, 0.1, Vector2::zeros());
        for y in 0..n as i32 {
            for x in 0..n as i32 {
                grid.add_patch(CellIndex::new(x, y), SurfacePatch::thin(z));
            }
        }
        grid
    }

    #[test]
    fn test_grid_conversion_roundtrip() {
        let grid = flat_grid(10, 0.0);
        let idx = grid.to_grid(&Vector3::new(0.35, 0.77, 0.0)).unwrap();
        assert_eq!(idx, CellIndex::new(3, 7));

        let center = grid.from_grid(idx).unwrap();
        assert!((center.x - 0.35).abs() < 1e-9);
        assert!((center.y - 0.75).abs() < 1e-9);
        assert_eq!(grid.to_grid(&center).unwrap(), idx);
    }

    #[test]
    fn test_to_grid_outside() {
        let grid = flat_grid(10, 0.0);
        assert!(grid.to_grid(&Vector3::new(-0.01, 0.5, 0.0)).is_none());
        assert!(grid.to_grid(&Vector3::new(0.5, 1.01, 0.0)).is_none());
    }

    #[test]
    fn test_patches_stay_sorted() {
        let mut grid = MlsGrid::new(2, 2, 0.5, Vector2::zeros());
        let idx = CellIndex::new(0, 0);
        grid.add_patch(idx, SurfacePatch::thin(2.0));
        grid.add_patch(idx, SurfacePatch::thin(0.5));
        grid.add_patch(idx, SurfacePatch::new(0.9, 1.1));
        let tops: Vec<f64> = grid.patches(idx).iter().map(|p| p.top()).collect();
        assert_eq!(tops, vec![0.5, 1.1, 2.0]);
    }

    #[test]
    fn test_intersect_aabb_selects_overlapping() {
        let mut grid = flat_grid(10, 0.0);
        // A raised slab outside the query's z range.
        grid.add_patch(CellIndex::new(5, 5), SurfacePatch::thin(2.0));

        let aabb = Aabb3::new(
            Vector3::new(0.42, 0.42, -0.2),
            Vector3::new(0.68, 0.68, 0.2),
        );
        let mut seen = Vec::new();
        let aborted = grid.intersect_aabb(&aabb, |idx, patch| {
            seen.push((idx, patch.top()));
            false
        });
        assert!(!aborted);
        // Cells 4..=6 in both axes, one flat patch each.
        assert_eq!(seen.len(), 9);
        assert!(seen.iter().all(|(_, top)| *top == 0.0));
    }

    #[test]
    fn test_intersect_aabb_abort() {
        let grid = flat_grid(10, 0.0);
        let aabb = Aabb3::new(Vector3::new(0.0, 0.0, -1.0), Vector3::new(1.0, 1.0, 1.0));
        let mut count = 0;
        let aborted = grid.intersect_aabb(&aabb, |_, _| {
            count += 1;
            count == 3
        });
        assert!(aborted);
        assert_eq!(count, 3);
    }

    #[test]
    fn test_intersect_aabb_clamps_to_grid() {
        let grid = flat_grid(3, 0.0);
        let aabb = Aabb3::new(
            Vector3::new(-5.0, -5.0, -1.0),
            Vector3::new(5.0, 5.0, 1.0),
        );
        let mut count = 0;
        grid.intersect_aabb(&aabb, |_, _| {
            count += 1;
            false
        });
        assert_eq!(count, 9);
    }
}
