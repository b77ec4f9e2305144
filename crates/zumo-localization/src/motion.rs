//! Odometry motion model.

use core::f64::consts::FRAC_PI_2;

use libm::{cos, sin};
use rand::Rng;

use crate::action::Action;
use crate::config::MotionConfig;
use crate::noise::gaussian;
use crate::particle::Particle;

/// Moves `particle` as if the robot had executed `action`, with sampled noise.
///
/// For drives, the along-heading sample is added to the nominal speed and the
/// cross-heading sample pushes sideways. Both are rotated into the grid frame
/// by the particle's heading and scaled by `command_duration * resolution`.
/// Turns add (`TurnRight`) or subtract (`TurnLeft`) the noisy turn rate times
/// the command duration. Headings are left unwrapped.
pub fn apply<R: Rng + ?Sized>(
    particle: &mut Particle,
    action: Action,
    config: &MotionConfig,
    resolution: f64,
    rng: &mut R,
) {
    match action {
        Action::None => {}
        Action::Forward => {
            let along = config.forward_speed + gaussian(rng, config.forward_noise.along);
            let cross = gaussian(rng, config.forward_noise.cross);
            translate(particle, along, cross, config.command_duration * resolution);
        }
        Action::Backward => {
            let along = config.backward_speed + gaussian(rng, config.backward_noise.along);
            let cross = gaussian(rng, config.backward_noise.cross);
            translate(particle, -along, -cross, config.command_duration * resolution);
        }
        Action::TurnLeft => {
            let rate = config.angular_speed + gaussian(rng, config.angular_noise);
            particle.heading -= rate * config.command_duration;
        }
        Action::TurnRight => {
            let rate = config.angular_speed + gaussian(rng, config.angular_noise);
            particle.heading += rate * config.command_duration;
        }
    }
}

fn translate(particle: &mut Particle, along: f64, cross: f64, scale: f64) {
    let h = particle.heading;
    let dx = along * cos(h) + cross * cos(h + FRAC_PI_2);
    let dy = along * sin(h) + cross * sin(h + FRAC_PI_2);
    particle.position.x += dx * scale;
    particle.position.y += dy * scale;
}
