//! Deterministic random streams for the filter.
//!
//! Every particle draws from its own generator, seeded from the filter's
//! master seed, the cycle epoch and the particle index. The draws a particle
//! sees therefore do not depend on which thread runs it or in what order.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Stream id reserved for the filter's own sequential draws.
pub const FILTER_STREAM: u64 = u64::MAX;

/// SplitMix64 finalizer.
fn mix(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Generator for stream `stream` of cycle `epoch` under `seed`.
pub fn stream_rng(seed: u64, epoch: u64, stream: u64) -> SmallRng {
    SmallRng::seed_from_u64(mix(seed ^ mix(epoch ^ mix(stream))))
}

/// Zero-mean Gaussian sample with standard deviation `stddev`.
///
/// Returns exactly `0.0` without drawing when `stddev` is zero.
#[inline]
pub fn gaussian<R: Rng + ?Sized>(rng: &mut R, stddev: f64) -> f64 {
    if stddev == 0.0 {
        return 0.0;
    }
    let n: f64 = rng.sample(StandardNormal);
    n * stddev
}
