//! Rasterizing a scene polygon into an occupancy map.

use tracing::{debug, info};
use zumo_geometry::{Coordinate, SceneBoundary};

use crate::error::MapError;
use crate::grid::{Cell, OccupancyGrid};
use crate::map::OccupancyMap;

/// Smallest margin for which the exterior seed at `(1, 1)` lies strictly
/// outside the drawn boundary.
pub const MIN_MARGIN: u32 = 2;

/// Exterior flood fill seed, in grid coordinates.
const SEED: Coordinate = Coordinate::new(1, 1);

/// Rasterizes a closed polygon into an [`OccupancyMap`].
///
/// The boundary edges are drawn as occupied lines, then everything reachable
/// from the exterior seed is flooded occupied. Only the polygon's interior
/// stays free.
#[derive(Debug, Clone, Copy)]
pub struct OccupancyMapBuilder {
    margin: u32,
    resolution: f64,
}

impl OccupancyMapBuilder {
    /// # Arguments
    /// * `margin` - Cells added on every side of the boundary's bounding box
    /// * `resolution` - Cells per metre, recorded on the map for unit conversion
    pub fn new(margin: u32, resolution: f64) -> Self {
        OccupancyMapBuilder { margin, resolution }
    }

    /// Builds the map for `boundary`, whose vertices are already in cells.
    ///
    /// # Returns
    /// * `Result<OccupancyMap, MapError>` - The map, or an error for fewer than two
    ///   vertices, a margin below [`MIN_MARGIN`], or a non-positive resolution
    pub fn build(&self, boundary: &SceneBoundary) -> Result<OccupancyMap, MapError> {
        if boundary.len() < 2 {
            return Err(MapError::InvalidScene {
                vertices: boundary.len(),
            });
        }
        if self.margin < MIN_MARGIN {
            return Err(MapError::InsufficientMargin {
                margin: self.margin,
                minimum: MIN_MARGIN,
            });
        }
        if self.resolution <= 0.0 || !self.resolution.is_finite() {
            return Err(MapError::InvalidResolution(self.resolution));
        }

        let bbox = boundary.bounding_box().ok_or(MapError::InvalidScene { vertices: 0 })?;
        let pad = 2 * self.margin as usize;
        let width = bbox.width() as usize + pad;
        let height = bbox.height() as usize + pad;
        let mut grid = OccupancyGrid::new(width, height)?;

        let m = self.margin as i32;
        let to_grid = |p: Coordinate| Coordinate::new(p.x - bbox.min.x + m, p.y - bbox.min.y + m);

        for (from, to) in boundary.edges() {
            draw_line(&mut grid, to_grid(from), to_grid(to))?;
        }
        let filled = flood_fill(&mut grid, SEED)?;

        info!(
            width,
            height,
            margin = self.margin,
            resolution = self.resolution,
            free = grid.free_count(),
            "Occupancy map built"
        );
        debug!(filled, "Exterior flood fill complete");

        Ok(OccupancyMap::new(grid, self.margin, self.resolution, bbox.min))
    }
}

/// Marks every cell on the segment `from -> to` occupied, endpoints included.
///
/// Steps one cell at a time along the axis of greater extent and interpolates
/// the other axis, rounding half away from zero. Consecutive cells are
/// 8-connected.
fn draw_line(grid: &mut OccupancyGrid, from: Coordinate, to: Coordinate) -> Result<(), MapError> {
    let dx = (to.x - from.x) as f64;
    let dy = (to.y - from.y) as f64;
    let steps = (to.x - from.x).abs().max((to.y - from.y).abs());

    if steps == 0 {
        return grid.set(from, Cell::Occupied);
    }

    for i in 0..=steps {
        let t = i as f64 / steps as f64;
        let x = from.x + (dx * t).round() as i32;
        let y = from.y + (dy * t).round() as i32;
        grid.set(Coordinate::new(x, y), Cell::Occupied)?;
    }
    Ok(())
}

/// Floods every free cell 4-connected to `seed` as occupied.
///
/// Cells are marked when pushed so each enters the worklist at most once.
/// Returns the number of cells filled.
fn flood_fill(grid: &mut OccupancyGrid, seed: Coordinate) -> Result<usize, MapError> {
    if !grid.is_free(seed) {
        return Ok(0);
    }

    let mut worklist = vec![seed];
    grid.set(seed, Cell::Occupied)?;
    let mut filled = 1;

    while let Some(p) = worklist.pop() {
        for n in [p.offset(1, 0), p.offset(-1, 0), p.offset(0, 1), p.offset(0, -1)] {
            if grid.is_free(n) {
                grid.set(n, Cell::Occupied)?;
                worklist.push(n);
                filled += 1;
            }
        }
    }
    Ok(filled)
}
