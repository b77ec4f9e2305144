//! This module defines the error types used by the `zumo-map` crate.

use thiserror::Error;
use zumo_geometry::GeometryError;

/// Error type for map construction and access.
#[derive(Error, Debug, PartialEq)]
pub enum MapError {
    /// The scene polygon has fewer than two vertices.
    #[error("Invalid scene: {vertices} vertices given, at least 2 are required")]
    InvalidScene {
        /// Number of vertices supplied.
        vertices: usize,
    },

    /// The margin is too small for the exterior flood fill seed to sit outside the boundary.
    #[error("Insufficient margin: {margin} cells, at least {minimum} are required")]
    InsufficientMargin {
        /// Margin supplied.
        margin: u32,
        /// Smallest accepted margin.
        minimum: u32,
    },

    /// Cells per metre must be positive and finite.
    #[error("Invalid map resolution: {0}")]
    InvalidResolution(f64),

    /// Grid width or height is zero, or their product overflows.
    #[error("Invalid grid dimensions: {width}x{height}")]
    InvalidDimensions {
        /// Requested width in cells.
        width: usize,
        /// Requested height in cells.
        height: usize,
    },

    /// A cell lookup fell outside the grid.
    #[error("Map access out of bounds at ({x}, {y})")]
    OutOfBounds {
        /// Column requested.
        x: i32,
        /// Row requested.
        y: i32,
    },

    /// The scene description could not be converted to grid cells.
    #[error("Scene conversion failed: {0}")]
    Scene(#[from] GeometryError),
}
