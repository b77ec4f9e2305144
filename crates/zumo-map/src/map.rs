//! A rasterized map with its scene-to-grid transform.

use tracing::debug;
use zumo_geometry::{Coordinate, FloatCoordinate};

use crate::error::MapError;
use crate::grid::{Cell, OccupancyGrid};

/// An occupancy grid together with the metadata needed to place it in the scene.
///
/// Built once by [`OccupancyMapBuilder`](crate::OccupancyMapBuilder) and then
/// only read. Share it behind an `Arc` between the filter and any renderer.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OccupancyMap {
    grid: OccupancyGrid,
    /// Free cells added around the boundary's bounding box on every side
    margin: u32,
    /// Cells per metre
    resolution: f64,
    /// Minimum corner of the boundary, in scene cells
    origin: Coordinate,
}

impl OccupancyMap {
    pub(crate) fn new(grid: OccupancyGrid, margin: u32, resolution: f64, origin: Coordinate) -> Self {
        OccupancyMap {
            grid,
            margin,
            resolution,
            origin,
        }
    }

    /// The underlying grid.
    pub fn grid(&self) -> &OccupancyGrid {
        &self.grid
    }

    /// Width of the grid in cells.
    pub fn width(&self) -> usize {
        self.grid.width()
    }

    /// Height of the grid in cells.
    pub fn height(&self) -> usize {
        self.grid.height()
    }

    /// Margin in cells.
    pub fn margin(&self) -> u32 {
        self.margin
    }

    /// Cells per metre.
    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Boundary's minimum corner, in scene cells.
    pub fn origin(&self) -> Coordinate {
        self.origin
    }

    /// State of the cell at grid coordinate `p`.
    pub fn cell(&self, p: Coordinate) -> Result<Cell, MapError> {
        self.grid.get(p)
    }

    /// `true` only for an in-bounds free cell.
    pub fn is_free(&self, p: Coordinate) -> bool {
        self.grid.is_free(p)
    }

    /// `true` if the cell containing the sub-cell position `p` is in bounds and free.
    pub fn is_free_at(&self, p: FloatCoordinate) -> bool {
        self.grid.is_free(p.cell())
    }

    /// Converts a scene cell (as produced by `SceneBoundary::from_metres`) to a grid cell.
    pub fn scene_to_grid(&self, p: Coordinate) -> Coordinate {
        let m = self.margin as i32;
        Coordinate::new(p.x - self.origin.x + m, p.y - self.origin.y + m)
    }

    /// Converts a scene position in metres to a sub-cell grid position.
    ///
    /// # Arguments
    /// * `x` - Scene x in metres
    /// * `y` - Scene y in metres
    pub fn metres_to_grid(&self, x: f64, y: f64) -> FloatCoordinate {
        let m = self.margin as f64;
        FloatCoordinate::new(
            x * self.resolution - self.origin.x as f64 + m,
            y * self.resolution - self.origin.y as f64 + m,
        )
    }

    /// Converts a sub-cell grid position back to scene metres.
    pub fn grid_to_metres(&self, p: FloatCoordinate) -> (f64, f64) {
        let m = self.margin as f64;
        (
            (p.x + self.origin.x as f64 - m) / self.resolution,
            (p.y + self.origin.y as f64 - m) / self.resolution,
        )
    }

    /// Returns a copy of this map with `cells` (grid coordinates) marked occupied.
    ///
    /// Out-of-bounds cells are skipped. Nothing is rasterized or filled, so a
    /// closed ring of new cells does not occupy its interior.
    pub fn merge_occupied<I>(&self, cells: I) -> OccupancyMap
    where
        I: IntoIterator<Item = Coordinate>,
    {
        let mut grid = self.grid.clone();
        let mut skipped = 0usize;
        for p in cells {
            if grid.set(p, Cell::Occupied).is_err() {
                skipped += 1;
            }
        }
        if skipped > 0 {
            debug!(skipped, "Ignored out-of-bounds cells while merging obstacles");
        }
        OccupancyMap::new(grid, self.margin, self.resolution, self.origin)
    }
}

impl std::fmt::Display for OccupancyMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "OccupancyMap (margin: {}, resolution: {:.1} cells/m, origin: {})",
            self.margin, self.resolution, self.origin
        )?;
        write!(f, "{}", self.grid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn open_map() -> OccupancyMap {
        let grid = OccupancyGrid::new(8, 6).unwrap();
        OccupancyMap::new(grid, 2, 10.0, Coordinate::new(-5, 4))
    }

    #[test]
    fn test_scene_to_grid() {
        let map = open_map();
        // (-5, 4) is the origin, so it lands on (margin, margin)
        assert_eq!(map.scene_to_grid(Coordinate::new(-5, 4)), Coordinate::new(2, 2));
        assert_eq!(map.scene_to_grid(Coordinate::new(0, 7)), Coordinate::new(7, 5));
    }

    #[test]
    fn test_metre_conversion() {
        let map = open_map();
        // 0.1 m * 10 = 1 cell, minus origin -5, plus margin 2 -> 8
        let p = map.metres_to_grid(0.1, 0.4);
        assert!((p.x - 8.0).abs() < EPSILON);
        assert!((p.y - 2.0).abs() < EPSILON);

        let (x, y) = map.grid_to_metres(p);
        assert!((x - 0.1).abs() < EPSILON);
        assert!((y - 0.4).abs() < EPSILON);
    }

    #[test]
    fn test_is_free_at_floors_position() {
        let map = open_map().merge_occupied([Coordinate::new(3, 3)]);
        assert!(!map.is_free_at(FloatCoordinate::new(3.9, 3.1)));
        assert!(map.is_free_at(FloatCoordinate::new(4.0, 3.1)));
        assert!(!map.is_free_at(FloatCoordinate::new(-0.1, 1.0)));
        assert!(!map.is_free_at(FloatCoordinate::new(8.0, 1.0)));
    }

    #[test]
    fn test_merge_occupied_leaves_original_untouched() {
        let map = open_map();
        let merged = map.merge_occupied([Coordinate::new(1, 1), Coordinate::new(50, 50)]);
        assert_eq!(merged.cell(Coordinate::new(1, 1)).unwrap(), Cell::Occupied);
        assert_eq!(map.cell(Coordinate::new(1, 1)).unwrap(), Cell::Free);
        assert_eq!(merged.grid().free_count(), 47);
    }
}
