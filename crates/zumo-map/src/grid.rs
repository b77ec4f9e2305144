//! Raw cell storage for occupancy maps.

use crate::error::MapError;
use zumo_geometry::Coordinate;

/// Occupancy state of a single grid cell.
#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Cell {
    /// Cell inside the environment, the robot may stand here
    #[default]
    Free = 0,
    /// Cell on or outside the environment boundary
    Occupied = 1,
}

impl Cell {
    /// Converts the Cell to its u8 representation
    pub fn as_u8(&self) -> u8 {
        *self as u8
    }

    /// Creates a Cell from a u8 value. Any non-zero value is occupied.
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Cell::Free,
            _ => Cell::Occupied,
        }
    }
}

impl std::fmt::Display for Cell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cell::Free => write!(f, "Free"),
            Cell::Occupied => write!(f, "Occupied"),
        }
    }
}

/// A row-major binary occupancy grid.
///
/// Cell `(x, y)` is column `x` of row `y`. Coordinates are signed so that
/// callers can probe positions left of or below the grid and get a clean
/// out-of-bounds answer instead of an underflow.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OccupancyGrid {
    /// Width of the grid in cells
    width: usize,
    /// Height of the grid in cells
    height: usize,
    /// Cell states, `height` rows of `width` cells
    data: Vec<Cell>,
}

impl OccupancyGrid {
    /// Creates a new grid with every cell free.
    ///
    /// # Arguments
    /// * `width` - Width of the grid in cells
    /// * `height` - Height of the grid in cells
    ///
    /// # Returns
    /// * `Result<Self, MapError>` - The grid, or an error if a dimension is zero or too large
    pub fn new(width: usize, height: usize) -> Result<Self, MapError> {
        if width == 0 || height == 0 {
            return Err(MapError::InvalidDimensions { width, height });
        }
        // Indices must also fit in i32 coordinates
        let len = width
            .checked_mul(height)
            .filter(|_| width <= i32::MAX as usize && height <= i32::MAX as usize)
            .ok_or(MapError::InvalidDimensions { width, height })?;

        Ok(OccupancyGrid {
            width,
            height,
            data: vec![Cell::Free; len],
        })
    }

    /// Width in cells.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in cells.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Index into `data`, or `None` if `p` is outside the grid.
    fn index(&self, p: Coordinate) -> Option<usize> {
        if self.contains(p) {
            Some(p.y as usize * self.width + p.x as usize)
        } else {
            None
        }
    }

    /// `true` if `p` lies inside the grid.
    pub fn contains(&self, p: Coordinate) -> bool {
        p.x >= 0 && p.y >= 0 && (p.x as usize) < self.width && (p.y as usize) < self.height
    }

    /// Gets the state of the cell at `p`.
    ///
    /// # Returns
    /// * `Result<Cell, MapError>` - The cell state or an error if out of bounds
    pub fn get(&self, p: Coordinate) -> Result<Cell, MapError> {
        self.index(p)
            .map(|i| self.data[i])
            .ok_or(MapError::OutOfBounds { x: p.x, y: p.y })
    }

    /// Sets the state of the cell at `p`.
    ///
    /// # Returns
    /// * `Result<(), MapError>` - Success or error if out of bounds
    pub fn set(&mut self, p: Coordinate, cell: Cell) -> Result<(), MapError> {
        let i = self.index(p).ok_or(MapError::OutOfBounds { x: p.x, y: p.y })?;
        self.data[i] = cell;
        Ok(())
    }

    /// `true` only for an in-bounds free cell.
    pub fn is_free(&self, p: Coordinate) -> bool {
        matches!(self.get(p), Ok(Cell::Free))
    }

    /// Gets a reference to the underlying cell data, row-major.
    pub fn cells(&self) -> &[Cell] {
        &self.data
    }

    /// The grid as raw 0/1 bytes, row-major.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.data.iter().map(Cell::as_u8).collect()
    }

    /// Number of free cells.
    pub fn free_count(&self) -> usize {
        self.data.iter().filter(|c| **c == Cell::Free).count()
    }
}

impl std::fmt::Display for OccupancyGrid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "OccupancyGrid ({}x{})", self.width, self.height)?;
        for row in self.data.chunks(self.width) {
            for cell in row {
                write!(f, "{}", cell.as_u8())?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
