//! Ray-cast range sensor model.

use core::f64::consts::SQRT_2;

use libm::erf;
use zumo_map::OccupancyMap;

use crate::config::SensorConfig;
use crate::particle::Particle;

/// Spacing between ray samples, in cells.
pub const RAY_STEP: usize = 2;

/// Distance from `particle` to the first blocked sample along its heading.
///
/// Samples sit at `2, 4, 6, ...` cells from the particle while the step is
/// shorter than `horizon`. A sample is blocked if the cell containing it is
/// occupied or outside the grid. Returns `None` when every sample within the
/// horizon is free.
pub fn ray_cast_distance(map: &OccupancyMap, particle: &Particle, horizon: f64) -> Option<f64> {
    (1..)
        .map(|i| (i * RAY_STEP) as f64)
        .take_while(|step| *step < horizon)
        .find(|step| !map.is_free_at(particle.position.project(particle.heading, *step)))
}

/// Probability of a sample from `N(mean, sigma)` landing at least as far from
/// the mean as `x`, on either side.
///
/// `2 * min(cdf, 1 - cdf)`, which is `1.0` at the mean. A zero `sigma` gives
/// `1.0` for an exact match and `0.0` otherwise.
pub fn normal_tail_probability(x: f64, mean: f64, sigma: f64) -> f64 {
    if sigma <= 0.0 {
        return if x == mean { 1.0 } else { 0.0 };
    }
    let cdf = 0.5 * (1.0 + erf((mean - x) / (sigma * SQRT_2)));
    (2.0 * cdf.min(1.0 - cdf)).clamp(0.0, 1.0)
}

/// New weight for `particle` after observing `reading` metres.
///
/// Particles off the free space get zero regardless of the reading. A reading
/// below the sensor minimum keeps only particles that see a wall within
/// `min_range`. A reading at or past the maximum keeps only particles that see
/// nothing within `max_range`. Anything in between scales the weight by how
/// plausible the reading is given the simulated distance, with a missed ray
/// treated as a wall at the horizon.
pub fn reweight_particle(
    map: &OccupancyMap,
    particle: &Particle,
    reading: Option<f64>,
    config: &SensorConfig,
) -> f64 {
    if !map.is_free_at(particle.position) {
        return 0.0;
    }
    let Some(reading) = reading else {
        return particle.weight;
    };

    let res = map.resolution();
    if reading < config.min_range {
        let horizon = config.min_range * res;
        match ray_cast_distance(map, particle, horizon) {
            Some(_) => particle.weight,
            None => 0.0,
        }
    } else if reading >= config.max_range {
        let horizon = config.max_range * res;
        match ray_cast_distance(map, particle, horizon) {
            Some(_) => 0.0,
            None => particle.weight,
        }
    } else {
        let horizon = config.max_range * res;
        let simulated = ray_cast_distance(map, particle, horizon).unwrap_or(horizon);
        particle.weight * normal_tail_probability(reading * res, simulated, config.noise * res)
    }
}
