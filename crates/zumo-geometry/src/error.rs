//! This module defines the error types used by the `zumo-geometry` crate.

#![warn(missing_docs)]

/// Error type for geometry operations.
#[derive(Debug, PartialEq)]
pub enum GeometryError {
    /// Error for a non-positive or non-finite cells-per-metre resolution.
    InvalidResolution(&'static str),
    /// Error for a scene vertex with a NaN or infinite component.
    NonFiniteVertex(&'static str),
}

impl core::fmt::Display for GeometryError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            GeometryError::InvalidResolution(msg) => write!(f, "Invalid resolution: {}", msg),
            GeometryError::NonFiniteVertex(msg) => write!(f, "Invalid scene vertex: {}", msg),
        }
    }
}

impl core::error::Error for GeometryError {}
