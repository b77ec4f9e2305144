//! Importance resampling.

use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;

use crate::particle::Particle;

/// What a resample produced.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResampleOutcome {
    /// Particles were drawn in proportion to their squared weights and the
    /// largest was rescaled to `1.0`. `max_weight` is the largest weight
    /// before rescaling.
    Resampled {
        /// Largest drawn weight before normalization.
        max_weight: f64,
    },
    /// Every weight was zero. Particles were drawn uniformly and still weigh zero.
    Degenerate,
}

impl ResampleOutcome {
    /// `true` for [`ResampleOutcome::Degenerate`].
    pub fn is_degenerate(&self) -> bool {
        matches!(self, ResampleOutcome::Degenerate)
    }
}

/// Draws `particles.len()` particles with replacement, each chosen with
/// probability proportional to its weight squared.
///
/// When the drawn set has a positive maximum weight every weight is divided
/// by it. When no weight is usable the draw is uniform and the outcome is
/// [`ResampleOutcome::Degenerate`].
pub fn resample<R: Rng + ?Sized>(particles: &[Particle], rng: &mut R) -> (Vec<Particle>, ResampleOutcome) {
    let n = particles.len();
    if n == 0 {
        return (Vec::new(), ResampleOutcome::Degenerate);
    }

    let squared = particles.iter().map(|p| {
        if p.weight.is_finite() && p.weight > 0.0 {
            p.weight * p.weight
        } else {
            0.0
        }
    });

    let mut drawn: Vec<Particle> = match WeightedIndex::<f64>::new(squared) {
        Ok(dist) => (0..n).map(|_| particles[dist.sample(rng)]).collect(),
        // All zero, or squares that underflowed
        Err(_) => (0..n).map(|_| particles[rng.random_range(0..n)]).collect(),
    };

    let max_weight = drawn
        .iter()
        .map(|p| p.weight)
        .filter(|w| w.is_finite())
        .fold(0.0_f64, f64::max);

    if max_weight > 0.0 {
        for p in drawn.iter_mut() {
            p.weight = if p.weight.is_finite() && p.weight > 0.0 {
                p.weight / max_weight
            } else {
                0.0
            };
        }
        (drawn, ResampleOutcome::Resampled { max_weight })
    } else {
        for p in drawn.iter_mut() {
            p.weight = 0.0;
        }
        (drawn, ResampleOutcome::Degenerate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::noise::stream_rng;
    use zumo_geometry::FloatCoordinate;

    const EPSILON: f64 = 1e-12;

    fn particles(weights: &[f64]) -> Vec<Particle> {
        weights
            .iter()
            .enumerate()
            .map(|(i, w)| Particle::with_weight(FloatCoordinate::new(i as f64, 0.0), 0.0, *w))
            .collect()
    }

    #[test]
    fn test_count_is_preserved() {
        let mut rng = stream_rng(11, 0, 0);
        for n in [1, 2, 7, 100, 1000] {
            let weights: Vec<f64> = (0..n).map(|i| (i % 5) as f64 * 0.1).collect();
            let weights = if weights.iter().all(|w| *w == 0.0) { vec![0.3; n] } else { weights };
            let (out, _) = resample(&particles(&weights), &mut rng);
            assert_eq!(out.len(), n);
        }
    }

    #[test]
    fn test_max_weight_is_one() {
        let mut rng = stream_rng(12, 0, 0);
        let (out, outcome) = resample(&particles(&[0.1, 0.0, 0.4, 0.2, 0.05]), &mut rng);
        let max = out.iter().map(|p| p.weight).fold(0.0, f64::max);
        assert!((max - 1.0).abs() < EPSILON);
        assert!(matches!(outcome, ResampleOutcome::Resampled { .. }));
        // Zero-weight particles are never drawn
        assert!(out.iter().all(|p| p.position.x != 1.0));
    }

    #[test]
    fn test_all_zero_is_degenerate() {
        let mut rng = stream_rng(13, 0, 0);
        let (out, outcome) = resample(&particles(&[0.0; 50]), &mut rng);
        assert_eq!(out.len(), 50);
        assert!(out.iter().all(|p| p.weight == 0.0));
        assert!(outcome.is_degenerate());
    }

    #[test]
    fn test_squared_weights_favour_heavy_particles() {
        let mut rng = stream_rng(14, 0, 0);
        // Squared: 1 vs 9, so roughly 90% of draws pick the second particle
        let source = particles(&[0.1, 0.3]);
        let mut heavy = 0;
        for _ in 0..2000 {
            let (out, _) = resample(&source, &mut rng);
            heavy += out.iter().filter(|p| p.position.x == 1.0).count();
        }
        let share = heavy as f64 / 4000.0;
        assert!((share - 0.9).abs() < 0.05, "share {}", share);
    }

    #[test]
    fn test_nan_weights_are_ignored() {
        let mut rng = stream_rng(15, 0, 0);
        let (out, outcome) = resample(&particles(&[f64::NAN, 0.5]), &mut rng);
        assert!(out.iter().all(|p| p.position.x == 1.0 && p.weight == 1.0));
        assert_eq!(outcome, ResampleOutcome::Resampled { max_weight: 0.5 });
    }
}
