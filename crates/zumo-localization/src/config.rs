//! Filter parameters.
//!
//! Speeds and noise standard deviations are in metres (or radians) per
//! second. The filter scales them by the command duration and the map
//! resolution, so they never need to know about cells.

use core::f64::consts::TAU;

use crate::error::FilterError;

/// Along-heading and cross-heading noise standard deviations, m/s.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct NoisePair {
    /// Standard deviation along the heading.
    pub along: f64,
    /// Standard deviation perpendicular to the heading.
    pub cross: f64,
}

impl NoisePair {
    /// Construct a noise pair.
    pub const fn new(along: f64, cross: f64) -> Self {
        NoisePair { along, cross }
    }

    /// A pair with both deviations zero.
    pub const fn zero() -> Self {
        NoisePair::new(0.0, 0.0)
    }
}

/// Odometry motion model.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MotionConfig {
    /// Nominal forward speed (m/s).
    pub forward_speed: f64,
    /// Nominal backward speed (m/s).
    pub backward_speed: f64,
    /// Nominal turn rate (rad/s).
    pub angular_speed: f64,
    /// How long one command drives the motors (s).
    pub command_duration: f64,
    /// Positional noise while driving forward.
    pub forward_noise: NoisePair,
    /// Positional noise while driving backward.
    pub backward_noise: NoisePair,
    /// Turn rate noise (rad/s).
    pub angular_noise: f64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            forward_speed: 0.22,
            backward_speed: 0.2,
            angular_speed: TAU,
            command_duration: 1.0 / 20.0,
            forward_noise: NoisePair::new(0.03, 0.01),
            backward_noise: NoisePair::new(0.02, 0.01),
            angular_noise: 0.5,
        }
    }
}

/// Single-beam range sensor model.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SensorConfig {
    /// Measurement noise standard deviation (m).
    pub noise: f64,
    /// Shortest distance the sensor reports (m).
    pub min_range: f64,
    /// Longest distance the sensor reports (m).
    pub max_range: f64,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            noise: 0.2,
            min_range: 0.2,
            max_range: 2.0,
        }
    }
}

/// Everything a [`ParticleFilter`](crate::ParticleFilter) needs besides the map.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FilterConfig {
    /// Number of particles, fixed for the life of the filter.
    pub particles: usize,
    /// Master RNG seed. `0` draws one from OS entropy.
    pub seed: u64,
    /// Run per-particle work on the rayon pool.
    pub parallel: bool,
    /// Motion model.
    pub motion: MotionConfig,
    /// Sensor model.
    pub sensor: SensorConfig,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            particles: 1000,
            seed: 0,
            parallel: true,
            motion: MotionConfig::default(),
            sensor: SensorConfig::default(),
        }
    }
}

impl FilterConfig {
    /// Checks every parameter is in range.
    pub fn validate(&self) -> Result<(), FilterError> {
        if self.particles == 0 {
            return Err(FilterError::InvalidConfig("particle count must be positive"));
        }

        let m = &self.motion;
        let speeds = [m.forward_speed, m.backward_speed, m.angular_speed, m.command_duration];
        if speeds.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(FilterError::InvalidConfig(
                "speeds and command duration must be finite and non-negative",
            ));
        }
        let deviations = [
            m.forward_noise.along,
            m.forward_noise.cross,
            m.backward_noise.along,
            m.backward_noise.cross,
            m.angular_noise,
            self.sensor.noise,
        ];
        if deviations.iter().any(|v| !v.is_finite() || *v < 0.0) {
            return Err(FilterError::InvalidConfig(
                "noise standard deviations must be finite and non-negative",
            ));
        }

        let s = &self.sensor;
        if !s.min_range.is_finite() || !s.max_range.is_finite() || s.min_range < 0.0 {
            return Err(FilterError::InvalidConfig("sensor range must be finite and non-negative"));
        }
        if s.min_range >= s.max_range {
            return Err(FilterError::InvalidConfig("sensor min_range must be below max_range"));
        }
        Ok(())
    }
}
