//! Reducing a scan revolution to a single forward reading.

use crate::protocol::Measurement;

/// Picks the valid sample closest to a target angle in each revolution.
///
/// Samples stream in one at a time. When a sample with the start flag opens
/// the next revolution, the best candidate of the finished revolution is
/// emitted.
#[derive(Debug, Clone)]
pub struct BeamSelector {
    target_deg: f64,
    tolerance_deg: f64,
    /// `(angular offset, distance mm)` of the best sample so far
    best: Option<(f64, f64)>,
}

impl BeamSelector {
    /// # Arguments
    /// * `target_deg` - Beam direction to report, degrees clockwise from the sensor's front
    /// * `tolerance_deg` - Largest accepted offset from `target_deg`
    pub fn new(target_deg: f64, tolerance_deg: f64) -> Self {
        BeamSelector {
            target_deg,
            tolerance_deg,
            best: None,
        }
    }

    /// Feeds one sample.
    ///
    /// # Returns
    /// * `Option<f64>` - Distance in millimetres of the previous revolution's
    ///   best sample, once this sample starts a new revolution
    pub fn push(&mut self, m: Measurement) -> Option<f64> {
        let finished = if m.start {
            self.best.take().map(|(_, mm)| mm)
        } else {
            None
        };

        if m.quality > 0 && m.distance_mm > 0.0 {
            let offset = angular_offset(m.angle_deg, self.target_deg);
            let better = self.best.is_none_or(|(best, _)| offset < best);
            if offset <= self.tolerance_deg && better {
                self.best = Some((offset, m.distance_mm));
            }
        }
        finished
    }
}

/// Absolute difference of two angles in degrees, in `[0, 180]`.
fn angular_offset(a: f64, b: f64) -> f64 {
    let d = (a - b).rem_euclid(360.0);
    d.min(360.0 - d)
}
