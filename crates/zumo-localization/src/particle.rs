//! Pose hypotheses and the estimate drawn from them.

use std::fmt;

use libm::{atan2, cos, sin};
use zumo_geometry::FloatCoordinate;

/// One pose hypothesis.
///
/// Position is in grid cells, heading in radians and never wrapped.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Particle {
    /// Position on the grid (cells).
    pub position: FloatCoordinate,
    /// Heading (rad), counter-clockwise from +x.
    pub heading: f64,
    /// Weight in `[0, 1]`.
    pub weight: f64,
}

impl Particle {
    /// Construct a particle with weight 1.
    pub const fn new(position: FloatCoordinate, heading: f64) -> Self {
        Particle {
            position,
            heading,
            weight: 1.0,
        }
    }

    /// Construct a particle with an explicit weight.
    pub const fn with_weight(position: FloatCoordinate, heading: f64, weight: f64) -> Self {
        Particle {
            position,
            heading,
            weight,
        }
    }
}

/// Summary of a particle set.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PoseEstimate {
    /// Weighted mean position (cells).
    pub position: FloatCoordinate,
    /// Weighted circular mean heading (rad), in `(-PI, PI]`.
    pub heading: f64,
    /// Sum of all weights. Zero means the mean is unweighted.
    pub total_weight: f64,
}

impl PoseEstimate {
    /// Weighted mean of `particles`, falling back to the plain mean when every weight is zero.
    ///
    /// Returns `None` for an empty slice.
    pub fn from_particles(particles: &[Particle]) -> Option<Self> {
        if particles.is_empty() {
            return None;
        }

        let total_weight: f64 = particles.iter().map(|p| p.weight).sum();
        let weighted = total_weight > 0.0 && total_weight.is_finite();
        let weight_of = |p: &Particle| if weighted { p.weight } else { 1.0 };
        let norm = if weighted {
            total_weight
        } else {
            particles.len() as f64
        };

        let (mut x, mut y, mut s, mut c) = (0.0, 0.0, 0.0, 0.0);
        for p in particles {
            let w = weight_of(p);
            x += w * p.position.x;
            y += w * p.position.y;
            s += w * sin(p.heading);
            c += w * cos(p.heading);
        }

        Some(PoseEstimate {
            position: FloatCoordinate::new(x / norm, y / norm),
            heading: atan2(s, c),
            total_weight: if weighted { total_weight } else { 0.0 },
        })
    }
}

impl fmt::Display for PoseEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} θ: {:.2} rad (weight {:.3})",
            self.position, self.heading, self.total_weight
        )
    }
}
