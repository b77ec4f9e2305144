//! The particle filter itself.

use std::f64::consts::TAU;
use std::sync::Arc;

use rand::Rng;
use rand::rngs::SmallRng;
use rayon::prelude::*;
use tracing::{debug, info};
use zumo_geometry::FloatCoordinate;
use zumo_map::OccupancyMap;

use crate::action::Action;
use crate::config::FilterConfig;
use crate::error::FilterError;
use crate::motion;
use crate::noise::{FILTER_STREAM, gaussian, stream_rng};
use crate::particle::{Particle, PoseEstimate};
use crate::resample::{self, ResampleOutcome};
use crate::sensor;

/// Monte Carlo localization over a fixed occupancy map.
///
/// The particle set lives behind an `Arc`. [`snapshot`](Self::snapshot) hands
/// out a cheap clone of it, and every mutating step either copies on write or
/// swaps in a new set, so a snapshot never changes underneath its reader.
pub struct ParticleFilter {
    map: Arc<OccupancyMap>,
    config: FilterConfig,
    particles: Arc<Vec<Particle>>,
    /// Master seed actually in use, after resolving `0` to an entropy draw
    seed: u64,
    /// Number of `predict` calls so far, keys the per-particle streams
    epoch: u64,
    /// Sequential draws: initialization and resampling
    rng: SmallRng,
}

impl ParticleFilter {
    /// Creates a filter and spreads `config.particles` particles uniformly over the map.
    ///
    /// # Arguments
    /// * `map` - The map to localize in, shared with whoever renders it
    /// * `config` - Motion and sensor models plus particle count and seed
    ///
    /// # Returns
    /// * `Result<Self, FilterError>` - The filter, or an error if the configuration is out of range
    pub fn new(map: Arc<OccupancyMap>, config: FilterConfig) -> Result<Self, FilterError> {
        config.validate()?;

        let seed = if config.seed == 0 {
            rand::random::<u64>()
        } else {
            config.seed
        };
        info!(
            seed,
            particles = config.particles,
            parallel = config.parallel,
            "Particle filter created"
        );

        let count = config.particles;
        let mut filter = ParticleFilter {
            map,
            config,
            particles: Arc::new(Vec::new()),
            seed,
            epoch: 0,
            rng: stream_rng(seed, 0, FILTER_STREAM),
        };
        filter.initialize(count)?;
        Ok(filter)
    }

    /// Replaces the particle set with `n` particles drawn uniformly over the
    /// whole grid, occupied cells included, with uniform headings in `[0, 2π)`
    /// and weight 1.
    ///
    /// The first reweight zeroes any particle that landed off the free space.
    pub fn initialize(&mut self, n: usize) -> Result<(), FilterError> {
        if n == 0 {
            return Err(FilterError::InvalidConfig("particle count must be positive"));
        }
        let w = self.map.width() as f64;
        let h = self.map.height() as f64;
        let rng = &mut self.rng;
        let set = (0..n)
            .map(|_| {
                let position = FloatCoordinate::new(rng.random_range(0.0..w), rng.random_range(0.0..h));
                Particle::new(position, rng.random_range(0.0..TAU))
            })
            .collect();
        self.particles = Arc::new(set);
        self.config.particles = n;
        debug!(particles = n, "Particles spread uniformly over the grid");
        Ok(())
    }

    /// Replaces the particle set with a Gaussian cloud around a known pose.
    ///
    /// # Arguments
    /// * `position` - Cloud centre (cells)
    /// * `heading` - Mean heading (rad)
    /// * `spread` - Positional standard deviation (cells)
    /// * `heading_spread` - Heading standard deviation (rad)
    pub fn initialize_around(
        &mut self,
        position: FloatCoordinate,
        heading: f64,
        spread: f64,
        heading_spread: f64,
    ) {
        let n = self.config.particles;
        let rng = &mut self.rng;
        let set = (0..n)
            .map(|_| {
                let p = FloatCoordinate::new(
                    position.x + gaussian(rng, spread),
                    position.y + gaussian(rng, spread),
                );
                Particle::new(p, heading + gaussian(rng, heading_spread))
            })
            .collect();
        self.particles = Arc::new(set);
        debug!(%position, heading, spread, heading_spread, "Particles spread around pose");
    }

    /// Moves every particle as if the robot had executed `action`.
    ///
    /// Each particle draws its noise from its own stream, so the result is the
    /// same whether or not the work runs on the rayon pool.
    pub fn predict(&mut self, action: Action) {
        let epoch = self.epoch;
        self.epoch += 1;
        if action == Action::None {
            return;
        }

        let seed = self.seed;
        let model = &self.config.motion;
        let resolution = self.map.resolution();
        let set = Arc::make_mut(&mut self.particles);

        let step = |(i, p): (usize, &mut Particle)| {
            let mut rng = stream_rng(seed, epoch, i as u64);
            motion::apply(p, action, model, resolution, &mut rng);
        };
        if self.config.parallel {
            set.par_iter_mut().enumerate().for_each(step);
        } else {
            set.iter_mut().enumerate().for_each(step);
        }
    }

    /// Distance from `particle` to the first blocked ray sample within `horizon` cells.
    pub fn ray_cast_distance(&self, particle: &Particle, horizon: f64) -> Option<f64> {
        sensor::ray_cast_distance(&self.map, particle, horizon)
    }

    /// Updates every weight against `reading` (metres), or only zeroes
    /// particles off the free space when the reading is absent.
    pub fn reweight(&mut self, reading: Option<f64>) {
        let map = &*self.map;
        let model = &self.config.sensor;
        let set = Arc::make_mut(&mut self.particles);

        let update = |p: &mut Particle| {
            p.weight = sensor::reweight_particle(map, p, reading, model);
        };
        if self.config.parallel {
            set.par_iter_mut().for_each(update);
        } else {
            set.iter_mut().for_each(update);
        }
    }

    /// Draws a new set of the same size in proportion to squared weights and
    /// swaps it in.
    pub fn resample(&mut self) -> ResampleOutcome {
        let (next, outcome) = resample::resample(&self.particles, &mut self.rng);
        self.particles = Arc::new(next);
        debug!(?outcome, "Particles resampled");
        outcome
    }

    /// Weighted mean pose of the current set.
    pub fn estimate(&self) -> Option<PoseEstimate> {
        PoseEstimate::from_particles(&self.particles)
    }

    /// The current particles.
    pub fn particles(&self) -> &[Particle] {
        &self.particles
    }

    /// A shared handle to the current set, unaffected by later cycles.
    pub fn snapshot(&self) -> Arc<Vec<Particle>> {
        Arc::clone(&self.particles)
    }

    /// Number of particles.
    pub fn len(&self) -> usize {
        self.particles.len()
    }

    /// Always `false` for a constructed filter.
    pub fn is_empty(&self) -> bool {
        self.particles.is_empty()
    }

    /// The map being localized in.
    pub fn map(&self) -> &Arc<OccupancyMap> {
        &self.map
    }

    /// Swaps in a new map, typically one produced by
    /// [`OccupancyMap::merge_occupied`]. The particles are kept.
    pub fn replace_map(&mut self, map: Arc<OccupancyMap>) {
        self.map = map;
    }

    /// The filter's configuration.
    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// The master seed in use.
    pub fn seed(&self) -> u64 {
        self.seed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zumo_geometry::{Coordinate, SceneBoundary};
    use zumo_map::OccupancyMapBuilder;

    fn room() -> Arc<OccupancyMap> {
        let boundary = SceneBoundary::new(vec![
            Coordinate::new(0, 0),
            Coordinate::new(20, 0),
            Coordinate::new(20, 20),
            Coordinate::new(0, 20),
        ]);
        Arc::new(OccupancyMapBuilder::new(2, 1.0).build(&boundary).unwrap())
    }

    fn config(parallel: bool) -> FilterConfig {
        FilterConfig {
            particles: 200,
            seed: 1234,
            parallel,
            ..FilterConfig::default()
        }
    }

    #[test]
    fn test_rejects_invalid_config() {
        let bad = FilterConfig {
            particles: 0,
            ..FilterConfig::default()
        };
        assert!(matches!(
            ParticleFilter::new(room(), bad),
            Err(FilterError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_uniform_initialization() {
        let filter = ParticleFilter::new(room(), config(false)).unwrap();
        assert_eq!(filter.len(), 200);
        for p in filter.particles() {
            assert!(p.position.x >= 0.0 && p.position.x < 24.0);
            assert!(p.position.y >= 0.0 && p.position.y < 24.0);
            assert!(p.heading >= 0.0 && p.heading < TAU);
            assert_eq!(p.weight, 1.0);
        }
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut par = ParticleFilter::new(room(), config(true)).unwrap();
        let mut seq = ParticleFilter::new(room(), config(false)).unwrap();
        assert_eq!(par.particles(), seq.particles());

        for action in [Action::Forward, Action::TurnLeft, Action::Backward, Action::TurnRight] {
            par.predict(action);
            seq.predict(action);
            par.reweight(Some(0.8));
            seq.reweight(Some(0.8));
            par.resample();
            seq.resample();
        }
        assert_eq!(par.particles(), seq.particles());
    }

    #[test]
    fn test_snapshot_is_isolated() {
        let mut filter = ParticleFilter::new(room(), config(true)).unwrap();
        let before = filter.snapshot();
        let copy: Vec<Particle> = before.to_vec();

        filter.predict(Action::Forward);
        filter.reweight(Some(1.0));
        filter.resample();

        assert_eq!(*before, copy);
        assert_ne!(filter.particles(), copy.as_slice());
    }

    #[test]
    fn test_particles_off_free_space_get_zero() {
        let mut filter = ParticleFilter::new(room(), config(false)).unwrap();
        // Cell (2, 10) is the west wall
        filter.initialize_around(FloatCoordinate::new(2.5, 10.5), 0.0, 0.0, 0.0);
        filter.reweight(None);
        assert!(filter.particles().iter().all(|p| p.weight == 0.0));

        let outcome = filter.resample();
        assert!(outcome.is_degenerate());
        assert_eq!(filter.len(), 200);
    }

    #[test]
    fn test_resample_normalizes() {
        let mut filter = ParticleFilter::new(room(), config(false)).unwrap();
        filter.reweight(Some(5.0));
        let outcome = filter.resample();
        assert!(!outcome.is_degenerate());
        let max = filter.particles().iter().map(|p| p.weight).fold(0.0, f64::max);
        assert!((max - 1.0).abs() < 1e-12);
        assert_eq!(filter.len(), 200);
    }

    #[test]
    fn test_replace_map_with_obstacle() {
        let mut filter = ParticleFilter::new(room(), config(false)).unwrap();
        filter.initialize_around(FloatCoordinate::new(10.5, 10.5), 0.0, 0.0, 0.0);
        let blocked = filter.map().merge_occupied([Coordinate::new(10, 10)]);
        filter.replace_map(Arc::new(blocked));
        filter.reweight(None);
        assert!(filter.particles().iter().all(|p| p.weight == 0.0));
    }
}
