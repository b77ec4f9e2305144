mod blackboard; // shared localization status
mod bus; // broadcast topics
mod config;
mod localization;
mod render;
mod simulation;
mod transport;

use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{self, EnvFilter};
use zumo_geometry::SceneBoundary;
use zumo_localization::{LocalizationCycle, ParticleFilter};
use zumo_map::{OccupancyMap, OccupancyMapBuilder};

use blackboard::{Blackboard, FAULT_STALLED, clear_fault, raise_fault, snapshot};
use bus::Topic;
use config::{MapSettings, Settings, TransportMode, WatchdogSettings, load_settings};
use localization::LocalizationLoop;
use render::RenderFrame;
use simulation::SimulatedRobot;
use transport::WirePair;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    info!("Zumo localization starting.");
    let settings = load_settings().context("loading configuration")?;
    run(settings).await
}

fn build_map(settings: &MapSettings) -> anyhow::Result<OccupancyMap> {
    let boundary = SceneBoundary::from_metres(&settings.scene_vertices(), settings.resolution)
        .context("converting scene to cells")?;
    OccupancyMapBuilder::new(settings.margin, settings.resolution)
        .build(&boundary)
        .context("building occupancy map")
}

async fn run(settings: Settings) -> anyhow::Result<()> {
    let map = Arc::new(build_map(&settings.map)?);

    let mut filter = ParticleFilter::new(Arc::clone(&map), settings.filter.filter_config())
        .context("creating particle filter")?;
    if let Some(hint) = settings.filter.initial_pose {
        let position = map.metres_to_grid(hint.x, hint.y);
        filter.initialize_around(
            position,
            hint.heading,
            hint.spread * map.resolution(),
            hint.heading_spread,
        );
        info!(pose = ?hint.pose(), %position, "Particles seeded around configured pose");
    }
    let cycle = LocalizationCycle::new(filter, settings.cycle.skip_idle);

    let bb: Blackboard = Arc::default();
    let frames: Topic<RenderFrame> = Topic::new(settings.render.topic_capacity);
    let frame_rx = frames.subscribe();
    let (tx, rx) = mpsc::channel::<WirePair>(settings.transport.queue.max(1));

    info!("Spawning localization thread...");
    let lp = LocalizationLoop::new(cycle, frames, Arc::clone(&bb), settings.render.opacity_floor);
    std::thread::Builder::new()
        .name("localization".into())
        .spawn(move || lp.run(rx))?;

    let source = async {
        match settings.transport.mode {
            TransportMode::Tcp => transport::serve(settings.transport.bind, tx).await,
            TransportMode::Simulated => {
                let robot = SimulatedRobot::new(
                    Arc::clone(&map),
                    &settings.simulation,
                    &settings.filter.motion,
                    &settings.filter.sensor,
                )?;
                let period = Duration::from_millis(settings.simulation.period_ms);
                simulation::spawn(robot, period, tx)?;
                Ok(())
            }
        }
    };

    info!("Starting async tasks (source, render, watchdog)...");
    tokio::try_join!(
        source,
        render::render_task(frame_rx),
        watchdog(bb, settings.watchdog.clone()),
    )?;
    info!("Async tasks finished.");
    Ok(())
}

/// Raises a fault while no cycle has completed within the stall timeout.
async fn watchdog(bb: Blackboard, settings: WatchdogSettings) -> anyhow::Result<()> {
    info!("Watchdog task started.");
    let stall_timeout = Duration::from_millis(settings.stall_timeout_ms);
    let mut tick = tokio::time::interval(Duration::from_millis(settings.period_ms.max(1)));
    let mut stalled = false;
    loop {
        tick.tick().await;
        let state = snapshot(&bb);
        let age = Instant::now().saturating_duration_since(state.last_cycle_ts);
        if age > stall_timeout {
            if !stalled {
                warn!(
                    ?age,
                    cycles = state.cycles,
                    rejected = state.rejected_readings,
                    estimate = ?state.estimate,
                    "No localization cycle within the stall timeout"
                );
                raise_fault(&bb, FAULT_STALLED);
                stalled = true;
            }
        } else if stalled {
            info!(cycles = state.cycles, metres = ?state.estimate_metres, "Localization cycles resumed");
            clear_fault(&bb, FAULT_STALLED);
            stalled = false;
        }
    }
}
