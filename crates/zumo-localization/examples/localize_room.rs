use std::f64::consts::PI;
use std::sync::Arc;

use zumo_geometry::{Coordinate, FloatCoordinate, SceneBoundary};
use zumo_localization::sensor::ray_cast_distance;
use zumo_localization::{
    Action, FilterConfig, LocalizationCycle, MotionConfig, NoisePair, Particle, ParticleFilter,
    SensorConfig,
};
use zumo_map::OccupancyMapBuilder;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // A 30x20 cell room at one cell per metre
    let boundary = SceneBoundary::new(vec![
        Coordinate::new(0, 0),
        Coordinate::new(30, 0),
        Coordinate::new(30, 20),
        Coordinate::new(0, 20),
    ]);
    let map = Arc::new(OccupancyMapBuilder::new(2, 1.0).build(&boundary)?);

    let config = FilterConfig {
        particles: 2000,
        seed: 42,
        parallel: true,
        motion: MotionConfig {
            forward_speed: 1.0,
            backward_speed: 1.0,
            angular_speed: PI / 4.0,
            command_duration: 1.0,
            forward_noise: NoisePair::new(0.1, 0.05),
            backward_noise: NoisePair::new(0.1, 0.05),
            angular_noise: 0.02,
        },
        sensor: SensorConfig {
            noise: 1.0,
            min_range: 1.0,
            max_range: 40.0,
        },
    };
    let horizon = config.sensor.max_range * map.resolution();
    let mut cycle = LocalizationCycle::new(ParticleFilter::new(Arc::clone(&map), config)?, false);

    // Drive a loop around the room: forward along each wall, quarter turn right at the corners
    let mut truth = Particle::new(FloatCoordinate::new(6.5, 6.5), 0.0);
    let legs = [18, 8, 18, 8];
    for (leg, &steps) in legs.iter().cycle().take(8).enumerate() {
        for _ in 0..steps {
            truth.position = truth.position.project(truth.heading, 1.0);
            let reading = ray_cast_distance(&map, &truth, horizon).unwrap_or(horizon);
            let report = cycle.run(Action::Forward, Some(reading / map.resolution()));
            if let Some(est) = report.estimate {
                println!(
                    "leg {} cycle {:>3}: truth {} estimate {} error {:.2}",
                    leg,
                    report.index,
                    truth.position,
                    est,
                    est.position.distance(&truth.position)
                );
            }
        }
        for _ in 0..2 {
            truth.heading += PI / 4.0;
            cycle.run(Action::TurnRight, None);
        }
    }
    Ok(())
}
