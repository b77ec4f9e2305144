//! Occupancy maps for Monte Carlo localization.
//!
//! A [`SceneBoundary`](zumo_geometry::SceneBoundary) polygon is rasterized by
//! [`OccupancyMapBuilder`] into an [`OccupancyMap`]: every cell inside the
//! polygon is free, the boundary itself and everything outside it is occupied.

#![warn(missing_docs)]

pub mod builder;
pub mod error;
pub mod grid;
pub mod map;

pub use builder::{OccupancyMapBuilder, MIN_MARGIN};
pub use error::MapError;
pub use grid::{Cell, OccupancyGrid};
pub use map::OccupancyMap;
