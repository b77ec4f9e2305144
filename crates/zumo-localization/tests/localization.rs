use std::f64::consts::PI;
use std::sync::Arc;

use zumo_geometry::{Coordinate, FloatCoordinate, SceneBoundary};
use zumo_localization::sensor::ray_cast_distance;
use zumo_localization::{
    Action, FilterConfig, LocalizationCycle, MotionConfig, NoisePair, Particle, ParticleFilter,
    SensorConfig,
};
use zumo_map::{OccupancyMap, OccupancyMapBuilder};

/// Axis-aligned room at one cell per metre.
fn room(width: i32, height: i32) -> Arc<OccupancyMap> {
    let boundary = SceneBoundary::new(vec![
        Coordinate::new(0, 0),
        Coordinate::new(width, 0),
        Coordinate::new(width, height),
        Coordinate::new(0, height),
    ]);
    Arc::new(OccupancyMapBuilder::new(2, 1.0).build(&boundary).unwrap())
}

/// What the sensor would report from `truth`, in metres.
fn true_reading(map: &OccupancyMap, truth: &Particle, max_range: f64) -> f64 {
    let horizon = max_range * map.resolution();
    ray_cast_distance(map, truth, horizon).unwrap_or(horizon) / map.resolution()
}

#[test]
fn global_localization_converges_to_room_centre() {
    // 20x20 cell room: walls on grid 2 and 22, free space spans [3, 22)
    let map = room(20, 20);
    let config = FilterConfig {
        particles: 1000,
        seed: 2024,
        parallel: true,
        motion: MotionConfig {
            forward_speed: 0.0,
            backward_speed: 0.0,
            angular_speed: PI / 8.0,
            command_duration: 1.0,
            forward_noise: NoisePair::new(0.3, 0.3),
            backward_noise: NoisePair::zero(),
            angular_noise: 0.05,
        },
        sensor: SensorConfig {
            noise: 2.0,
            min_range: 1.0,
            max_range: 30.0,
        },
    };
    let sensor = config.sensor.clone();
    let filter = ParticleFilter::new(Arc::clone(&map), config).unwrap();
    let mut cycle = LocalizationCycle::new(filter, false);

    // The centre is the only position whose readings repeat every quarter turn,
    // so every surviving heading mode agrees on it.
    let mut truth = Particle::new(FloatCoordinate::new(12.5, 12.5), 0.0);
    for i in 0..50 {
        let action = if i % 2 == 0 { Action::TurnRight } else { Action::Forward };
        if action == Action::TurnRight {
            truth.heading += PI / 8.0;
        }
        let reading = true_reading(&map, &truth, sensor.max_range);
        let report = cycle.run(action, Some(reading));
        assert!(!report.degenerate(), "cycle {} collapsed", i);
    }

    let estimate = cycle.filter().estimate().unwrap();
    let error = estimate.position.distance(&truth.position);
    assert!(error < 1.0, "estimate {} is {:.2} cells from truth", estimate, error);
    assert_eq!(cycle.filter().len(), 1000);
}

#[test]
fn tracking_follows_robot_down_corridor() {
    // 80x20 cell corridor, driving toward the east wall at grid x = 82
    let map = room(80, 20);
    let config = FilterConfig {
        particles: 500,
        seed: 7,
        parallel: false,
        motion: MotionConfig {
            forward_speed: 1.0,
            backward_speed: 1.0,
            angular_speed: 0.0,
            command_duration: 1.0,
            forward_noise: NoisePair::new(0.1, 0.05),
            backward_noise: NoisePair::new(0.1, 0.05),
            angular_noise: 0.0,
        },
        sensor: SensorConfig {
            noise: 1.5,
            min_range: 1.0,
            max_range: 100.0,
        },
    };
    let sensor = config.sensor.clone();
    let mut filter = ParticleFilter::new(Arc::clone(&map), config).unwrap();

    let mut truth = Particle::new(FloatCoordinate::new(10.5, 12.5), 0.0);
    filter.initialize_around(truth.position, truth.heading, 0.5, 0.01);
    let mut cycle = LocalizationCycle::new(filter, false);

    for i in 0..50 {
        truth.position.x += 1.0;
        let reading = true_reading(&map, &truth, sensor.max_range);
        let report = cycle.run(Action::Forward, Some(reading));

        let estimate = report.estimate.unwrap();
        let error = estimate.position.distance(&truth.position);
        assert!(error < 1.0, "cycle {}: estimate {} is {:.2} cells off", i, estimate, error);
    }
}

#[test]
fn rejected_readings_do_not_stall_prediction() {
    let map = room(40, 20);
    let config = FilterConfig {
        particles: 200,
        seed: 3,
        parallel: true,
        ..FilterConfig::default()
    };
    let mut filter = ParticleFilter::new(Arc::clone(&map), config).unwrap();
    filter.initialize_around(FloatCoordinate::new(10.5, 12.5), 0.0, 0.0, 0.0);
    let mut cycle = LocalizationCycle::new(filter, false);

    // Zero readings are always rejected, so only motion and the free-space check apply
    for _ in 0..10 {
        cycle.run(Action::Forward, Some(0.0));
    }
    let estimate = cycle.filter().estimate().unwrap();
    // Ten commands of 0.22 m/s for 0.05 s at one cell per metre is 0.11 cells
    assert!((estimate.position.x - 10.61).abs() < 0.05, "{}", estimate);
}
