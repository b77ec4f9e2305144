//! Frames handed to whatever draws the map and the particle cloud.
//!
//! Drawing itself happens outside this process. The in-process consumer
//! only logs what it would draw.

use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};
use zumo_geometry::Coordinate;
use zumo_localization::{Particle, PoseEstimate};
use zumo_map::OccupancyMap;

/// Frames between info-level summaries
const SUMMARY_EVERY: u64 = 20;

/// Maps a weight to a 0-255 alpha relative to the heaviest particle,
/// never dropping below `floor`.
pub fn opacity(weight: f64, max_weight: f64, floor: u8) -> u8 {
    let alpha = if max_weight > 0.0 && weight.is_finite() {
        (weight / max_weight * 255.0).clamp(0.0, 255.0) as u8
    } else {
        0
    };
    alpha.max(floor)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderParticle {
    /// Grid cells
    pub x: f64,
    pub y: f64,
    pub heading: f64,
    pub opacity: u8,
}

/// Everything needed to draw one cycle.
#[derive(Debug, Clone)]
pub struct RenderFrame {
    pub cycle: u64,
    pub width: usize,
    pub height: usize,
    pub margin: u32,
    pub resolution: f64,
    /// Scene boundary's minimum corner, scene cells
    pub origin: Coordinate,
    /// Row-major cells, 0 free and 1 occupied. Shared across frames.
    pub grid: Arc<Vec<u8>>,
    pub particles: Vec<RenderParticle>,
    pub estimate: Option<PoseEstimate>,
}

impl RenderFrame {
    /// # Arguments
    /// * `cycle` - Index of the cycle that produced `particles`
    /// * `map` - Map the particles live on
    /// * `grid` - `map`'s cells as bytes, built once with `OccupancyGrid::to_bytes`
    /// * `particles` - Particle set after resampling
    /// * `estimate` - Pose estimate of the same set
    /// * `floor` - Lowest opacity any particle is drawn with
    pub fn new(
        cycle: u64,
        map: &OccupancyMap,
        grid: Arc<Vec<u8>>,
        particles: &[Particle],
        estimate: Option<PoseEstimate>,
        floor: u8,
    ) -> Self {
        let max_weight = particles.iter().map(|p| p.weight).fold(0.0, f64::max);
        let particles = particles
            .iter()
            .map(|p| RenderParticle {
                x: p.position.x,
                y: p.position.y,
                heading: p.heading,
                opacity: opacity(p.weight, max_weight, floor),
            })
            .collect();

        RenderFrame {
            cycle,
            width: map.width(),
            height: map.height(),
            margin: map.margin(),
            resolution: map.resolution(),
            origin: map.origin(),
            grid,
            particles,
            estimate,
        }
    }

    /// Converts a grid position of this frame to scene metres.
    pub fn to_metres(&self, x: f64, y: f64) -> (f64, f64) {
        let m = self.margin as f64;
        (
            (x + self.origin.x as f64 - m) / self.resolution,
            (y + self.origin.y as f64 - m) / self.resolution,
        )
    }

    /// The most opaque particle, first one on ties.
    pub fn heaviest(&self) -> Option<&RenderParticle> {
        self.particles
            .iter()
            .reduce(|best, p| if p.opacity > best.opacity { p } else { best })
    }
}

/// Consumes frames until the topic closes.
pub async fn render_task(mut rx: broadcast::Receiver<Arc<RenderFrame>>) -> anyhow::Result<()> {
    info!("Render consumer started.");
    let mut frames: u64 = 0;
    loop {
        match rx.recv().await {
            Ok(frame) => {
                frames += 1;
                let opaque = frame.particles.iter().filter(|p| p.opacity == u8::MAX).count();
                debug!(
                    cycle = frame.cycle,
                    particles = frame.particles.len(),
                    opaque,
                    heading = frame.heaviest().map(|p| p.heading),
                    "Frame received"
                );
                if frames % SUMMARY_EVERY == 0 {
                    match &frame.estimate {
                        Some(est) => {
                            let (x, y) = frame.to_metres(est.position.x, est.position.y);
                            info!(cycle = frame.cycle, x, y, heading = est.heading, "Pose estimate (m)");
                        }
                        None => info!(cycle = frame.cycle, "No pose estimate"),
                    }
                }
            }
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "Render consumer lagged, skipping to latest frame");
            }
            Err(broadcast::error::RecvError::Closed) => {
                error!("Render topic closed. Exiting render consumer.");
                return Ok(());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zumo_geometry::{Coordinate, FloatCoordinate, SceneBoundary};
    use zumo_map::OccupancyMapBuilder;

    #[test]
    fn test_opacity_floor() {
        assert_eq!(opacity(1.0, 1.0, 100), 255);
        assert_eq!(opacity(0.5, 1.0, 100), 127);
        assert_eq!(opacity(0.1, 1.0, 100), 100);
        assert_eq!(opacity(0.0, 0.0, 100), 100);
        assert_eq!(opacity(0.1, 1.0, 0), 25);
        assert_eq!(opacity(f64::NAN, 1.0, 10), 10);
    }

    #[test]
    fn test_frame_from_particles() {
        let boundary = SceneBoundary::new(vec![
            Coordinate::new(0, 0),
            Coordinate::new(10, 0),
            Coordinate::new(10, 10),
            Coordinate::new(0, 10),
        ]);
        let map = OccupancyMapBuilder::new(2, 1.0).build(&boundary).unwrap();
        let grid = Arc::new(map.grid().to_bytes());
        let particles = [
            Particle::with_weight(FloatCoordinate::new(5.0, 5.0), 0.0, 0.5),
            Particle::with_weight(FloatCoordinate::new(6.0, 5.0), 0.0, 0.25),
            Particle::with_weight(FloatCoordinate::new(7.0, 5.0), 0.0, 0.0),
        ];

        let frame = RenderFrame::new(3, &map, Arc::clone(&grid), &particles, None, 100);
        assert_eq!(frame.width, 14);
        assert_eq!(frame.height, 14);
        assert_eq!(frame.grid.len(), 14 * 14);
        let alphas: Vec<u8> = frame.particles.iter().map(|p| p.opacity).collect();
        assert_eq!(alphas, vec![255, 127, 100]);
        assert_eq!(frame.heaviest().map(|p| p.x), Some(5.0));
    }

    #[test]
    fn test_frame_to_metres() {
        let boundary = SceneBoundary::new(vec![
            Coordinate::new(10, 20),
            Coordinate::new(30, 20),
            Coordinate::new(30, 40),
            Coordinate::new(10, 40),
        ]);
        let map = OccupancyMapBuilder::new(3, 10.0).build(&boundary).unwrap();
        let grid = Arc::new(map.grid().to_bytes());
        let particles = [Particle::with_weight(FloatCoordinate::new(8.0, 13.0), 1.5, 1.0)];
        let frame = RenderFrame::new(0, &map, grid, &particles, None, 100);

        let (x, y) = frame.to_metres(8.0, 13.0);
        assert!((x - 1.5).abs() < 1e-9);
        assert!((y - 3.0).abs() < 1e-9);
        assert_eq!(frame.to_metres(8.0, 13.0), map.grid_to_metres(FloatCoordinate::new(8.0, 13.0)));
        assert_eq!(frame.heaviest().map(|p| p.heading), Some(1.5));
        assert!(RenderFrame::new(0, &map, Arc::new(Vec::new()), &[], None, 100).heaviest().is_none());
    }
}
