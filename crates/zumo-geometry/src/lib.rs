#![cfg_attr(not(test), no_std)]
#![warn(missing_docs)]
#![doc = "A `no_std` library of grid coordinates and closed scene polygons."]
#![doc = ""]
#![doc = "This crate provides the integer and floating point cell coordinates shared by"]
#![doc = "the map builder and the particle filter, plus the polygon describing an environment boundary."]

extern crate alloc;

use alloc::vec::Vec;
use core::f64::consts::PI;
use core::fmt;
use libm::{cos, floor, sin, sqrt};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

pub mod error;
pub use error::GeometryError;

/// An integer `(x, y)` position in grid-cell units.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Coordinate {
    /// Column index (cells).
    pub x: i32,
    /// Row index (cells).
    pub y: i32,
}

impl Coordinate {
    /// Construct a new coordinate.
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Coordinate { x, y }
    }

    /// Shift the coordinate by `(dx, dy)` cells.
    #[must_use]
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Coordinate::new(self.x + dx, self.y + dy)
    }
}

impl From<Coordinate> for FloatCoordinate {
    fn from(c: Coordinate) -> Self {
        FloatCoordinate::new(c.x as f64, c.y as f64)
    }
}

impl fmt::Display for Coordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// A sub-cell `(x, y)` position in grid-cell units.
///
/// Particle positions live in this space: metres already multiplied by the map
/// resolution, so one unit is one cell.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Default, Clone, Copy, PartialEq)]
pub struct FloatCoordinate {
    /// x position (cells).
    pub x: f64,
    /// y position (cells).
    pub y: f64,
}

impl FloatCoordinate {
    /// Construct a new float coordinate.
    #[must_use]
    pub const fn new(x: f64, y: f64) -> Self {
        FloatCoordinate { x, y }
    }

    /// The cell containing this position.
    ///
    /// Uses `floor`, so `(-0.5, 2.7)` lands in cell `(-1, 2)`. Values outside
    /// the `i32` range saturate, which keeps them outside any grid.
    pub fn cell(&self) -> Coordinate {
        Coordinate::new(floor(self.x) as i32, floor(self.y) as i32)
    }

    /// Euclidean distance to `other`, in cells.
    pub fn distance(&self, other: &FloatCoordinate) -> f64 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        sqrt(dx * dx + dy * dy)
    }

    /// The point `distance` cells away along `heading` (radians, counter-clockwise from +x).
    pub fn project(&self, heading: f64, distance: f64) -> FloatCoordinate {
        FloatCoordinate::new(
            self.x + distance * cos(heading),
            self.y + distance * sin(heading),
        )
    }
}

impl fmt::Display for FloatCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.2}, {:.2})", self.x, self.y)
    }
}

/// Normalize an angle to be within `[-PI, PI)`.
///
/// Angles at `PI` will be normalized to `-PI`.
pub fn normalize_angle(angle: f64) -> f64 {
    let a = angle % (2.0 * PI);
    if a >= PI {
        a - 2.0 * PI
    } else if a < -PI {
        a + 2.0 * PI
    } else {
        a
    }
}

/// Axis-aligned bounds of a set of coordinates, inclusive on both ends.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    /// Minimum corner.
    pub min: Coordinate,
    /// Maximum corner.
    pub max: Coordinate,
}

impl BoundingBox {
    /// Extent along x (`max.x - min.x`).
    pub fn width(&self) -> u32 {
        self.max.x.abs_diff(self.min.x)
    }

    /// Extent along y (`max.y - min.y`).
    pub fn height(&self) -> u32 {
        self.max.y.abs_diff(self.min.y)
    }
}

/// One closed polygon, as an ordered list of vertices in grid-cell units.
///
/// The edge from the last vertex back to the first is implicit.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SceneBoundary {
    vertices: Vec<Coordinate>,
}

impl SceneBoundary {
    /// Wrap an ordered vertex list.
    pub fn new(vertices: Vec<Coordinate>) -> Self {
        SceneBoundary { vertices }
    }

    /// Build a boundary from vertices given in metres.
    ///
    /// Each component is multiplied by `resolution` (cells per metre) and
    /// truncated toward zero.
    ///
    /// # Arguments
    ///
    /// * `vertices`: `(x, y)` pairs in metres.
    /// * `resolution`: Cells per metre, must be positive.
    ///
    /// # Returns
    ///
    /// The boundary, or an error if the resolution is not positive or a vertex is not finite.
    pub fn from_metres(vertices: &[(f64, f64)], resolution: f64) -> Result<Self, GeometryError> {
        if resolution <= 0.0 || !resolution.is_finite() {
            return Err(GeometryError::InvalidResolution(
                "Resolution must be positive and finite",
            ));
        }

        let mut cells = Vec::with_capacity(vertices.len());
        for &(x, y) in vertices {
            if !x.is_finite() || !y.is_finite() {
                return Err(GeometryError::NonFiniteVertex(
                    "Vertex components must be finite",
                ));
            }
            cells.push(Coordinate::new((x * resolution) as i32, (y * resolution) as i32));
        }
        Ok(SceneBoundary::new(cells))
    }

    /// The ordered vertices.
    pub fn vertices(&self) -> &[Coordinate] {
        &self.vertices
    }

    /// Number of vertices.
    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    /// `true` if there are no vertices.
    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    /// Bounds of all vertices, or `None` for an empty boundary.
    pub fn bounding_box(&self) -> Option<BoundingBox> {
        let first = *self.vertices.first()?;
        let (min, max) = self.vertices.iter().fold((first, first), |(min, max), v| {
            (
                Coordinate::new(min.x.min(v.x), min.y.min(v.y)),
                Coordinate::new(max.x.max(v.x), max.y.max(v.y)),
            )
        });
        Some(BoundingBox { min, max })
    }

    /// All edges as `(from, to)` pairs, closing edge last.
    pub fn edges(&self) -> impl Iterator<Item = (Coordinate, Coordinate)> + '_ {
        let n = self.vertices.len();
        let count = if n < 2 { 0 } else { n };
        (0..count).map(move |i| (self.vertices[i], self.vertices[(i + 1) % n]))
    }
}
