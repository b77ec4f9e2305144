//! Simulated robot standing in for the hardware source.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use anyhow::{Context, bail};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rand_distr::Normal;
use spin_sleep::SpinSleeper;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use zumo_geometry::FloatCoordinate;
use zumo_localization::sensor::ray_cast_distance;
use zumo_localization::{Action, MotionConfig, NoisePair, Particle, SensorConfig, motion};
use zumo_map::OccupancyMap;

use crate::config::SimulationSettings;
use crate::transport::WirePair;

/// Ground-truth robot that replays a command script and reports noisy ranges.
pub struct SimulatedRobot {
    map: Arc<OccupancyMap>,
    truth: Particle,
    /// Nominal motion without noise
    motion: MotionConfig,
    horizon: f64,
    script: Vec<Action>,
    step: usize,
    noise: Normal<f64>,
    rng: SmallRng,
}

impl SimulatedRobot {
    /// # Arguments
    /// * `map` - The map the robot drives in
    /// * `settings` - Start pose, script and reading noise
    /// * `motion` - Filter motion model; only its nominal speeds are used
    /// * `sensor` - Filter sensor model; its max range caps the reported distance
    pub fn new(
        map: Arc<OccupancyMap>,
        settings: &SimulationSettings,
        motion: &MotionConfig,
        sensor: &SensorConfig,
    ) -> anyhow::Result<Self> {
        let script = settings
            .script
            .iter()
            .map(|s| s.parse::<Action>())
            .collect::<Result<Vec<_>, _>>()
            .context("parsing simulation script")?;
        if script.is_empty() {
            bail!("simulation script is empty");
        }

        let start = map.metres_to_grid(settings.start.x, settings.start.y);
        if !map.is_free_at(start) {
            bail!("simulation start {} is not in free space", start);
        }
        let noise = Normal::new(0.0, settings.reading_noise).context("reading noise")?;
        let seed = if settings.seed == 0 {
            rand::random::<u64>()
        } else {
            settings.seed
        };
        info!(%start, seed, commands = script.len(), "Simulated robot created");

        let quiet = MotionConfig {
            forward_noise: NoisePair::zero(),
            backward_noise: NoisePair::zero(),
            angular_noise: 0.0,
            ..motion.clone()
        };
        let horizon = sensor.max_range * map.resolution();
        Ok(SimulatedRobot {
            map,
            truth: Particle::new(start, settings.start.heading),
            motion: quiet,
            horizon,
            script,
            step: 0,
            noise,
            rng: SmallRng::seed_from_u64(seed),
        })
    }

    /// Executes the next scripted command and returns what the source would send.
    ///
    /// A move that would leave free space is not executed, as if the robot
    /// had bumped into the wall.
    pub fn next_pair(&mut self) -> WirePair {
        let action = self.script[self.step % self.script.len()];
        self.step += 1;

        let mut moved = self.truth;
        motion::apply(&mut moved, action, &self.motion, self.map.resolution(), &mut self.rng);
        if self.map.is_free_at(moved.position) {
            self.truth = moved;
        } else {
            debug!(%action, "Simulated robot blocked");
        }

        let cells = ray_cast_distance(&self.map, &self.truth, self.horizon).unwrap_or(self.horizon);
        let metres = (cells / self.map.resolution() + self.rng.sample(self.noise)).max(0.0);
        WirePair {
            command: action.symbol().to_string(),
            reading: format!("{:.0}", metres * 1000.0),
        }
    }

    /// True position on the grid.
    pub fn position(&self) -> FloatCoordinate {
        self.truth.position
    }
}

/// Runs `robot` on its own thread, one pair per `period`, until the receiver closes.
pub fn spawn(
    mut robot: SimulatedRobot,
    period: Duration,
    tx: mpsc::Sender<WirePair>,
) -> std::io::Result<JoinHandle<()>> {
    info!("Spawning simulation thread...");
    thread::Builder::new().name("simulation".into()).spawn(move || {
        info!("Simulation thread started.");
        let sleeper = SpinSleeper::new(100_000);
        loop {
            let pair = robot.next_pair();
            if tx.blocking_send(pair).is_err() {
                warn!("Localization loop has stopped. Ending simulation.");
                return;
            }
            debug!(position = %robot.position(), "Simulated robot moved");
            sleeper.sleep(period);
        }
    })
}
