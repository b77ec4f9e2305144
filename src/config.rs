use std::net::SocketAddr;

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;
use tracing::{error, info};
use zumo_localization::{FilterConfig, MotionConfig, SensorConfig};

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";
const ENV_PREFIX: &str = "ZUMO";

/// Top-level application settings.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub map: MapSettings,
    #[serde(default)]
    pub filter: FilterSettings,
    #[serde(default)]
    pub cycle: CycleSettings,
    #[serde(default)]
    pub transport: TransportSettings,
    #[serde(default)]
    pub simulation: SimulationSettings,
    #[serde(default)]
    pub render: RenderSettings,
    #[serde(default)]
    pub watchdog: WatchdogSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MapSettings {
    #[serde(default = "default_margin")]
    pub margin: u32,
    /// Cells per metre
    #[serde(default = "default_resolution")]
    pub resolution: f64,
    /// Closed polygon, metres
    pub scene: Vec<[f64; 2]>,
}

fn default_margin() -> u32 {
    3
}

fn default_resolution() -> f64 {
    100.0
}

impl MapSettings {
    pub fn scene_vertices(&self) -> Vec<(f64, f64)> {
        self.scene.iter().map(|[x, y]| (*x, *y)).collect()
    }
}

/// A pose in scene metres.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PoseSettings {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub heading: f64,
}

/// Where to spread the particles instead of uniformly over the map.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct InitialPose {
    pub x: f64,
    pub y: f64,
    #[serde(default)]
    pub heading: f64,
    /// Positional standard deviation, metres
    #[serde(default = "default_spread")]
    pub spread: f64,
    #[serde(default = "default_heading_spread")]
    pub heading_spread: f64,
}

fn default_spread() -> f64 {
    0.05
}

fn default_heading_spread() -> f64 {
    0.1
}

impl InitialPose {
    pub fn pose(&self) -> PoseSettings {
        PoseSettings {
            x: self.x,
            y: self.y,
            heading: self.heading,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FilterSettings {
    pub particles: usize,
    pub seed: u64,
    pub parallel: bool,
    pub initial_pose: Option<InitialPose>,
    pub motion: MotionConfig,
    pub sensor: SensorConfig,
}

impl Default for FilterSettings {
    fn default() -> Self {
        let base = FilterConfig::default();
        FilterSettings {
            particles: base.particles,
            seed: base.seed,
            parallel: base.parallel,
            initial_pose: None,
            motion: base.motion,
            sensor: base.sensor,
        }
    }
}

impl FilterSettings {
    pub fn filter_config(&self) -> FilterConfig {
        FilterConfig {
            particles: self.particles,
            seed: self.seed,
            parallel: self.parallel,
            motion: self.motion.clone(),
            sensor: self.sensor.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CycleSettings {
    /// Skip the whole cycle on an idle command
    pub skip_idle: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportMode {
    #[default]
    Tcp,
    Simulated,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TransportSettings {
    pub mode: TransportMode,
    pub bind: SocketAddr,
    /// Pending (command, reading) pairs before the reader waits
    pub queue: usize,
}

impl Default for TransportSettings {
    fn default() -> Self {
        TransportSettings {
            mode: TransportMode::Tcp,
            bind: SocketAddr::from(([0, 0, 0, 0], 5555)),
            queue: 64,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimulationSettings {
    pub start: PoseSettings,
    pub period_ms: u64,
    /// Command symbols, replayed in a loop
    pub script: Vec<String>,
    /// Reading noise standard deviation, metres
    pub reading_noise: f64,
    pub seed: u64,
}

impl Default for SimulationSettings {
    fn default() -> Self {
        SimulationSettings {
            start: PoseSettings::default(),
            period_ms: 50,
            script: vec!["1".to_string()],
            reading_noise: 0.01,
            seed: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RenderSettings {
    pub opacity_floor: u8,
    pub topic_capacity: usize,
}

impl Default for RenderSettings {
    fn default() -> Self {
        RenderSettings {
            opacity_floor: 100,
            topic_capacity: 4,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WatchdogSettings {
    pub period_ms: u64,
    /// Longest gap between cycles before a fault is raised
    pub stall_timeout_ms: u64,
}

impl Default for WatchdogSettings {
    fn default() -> Self {
        WatchdogSettings {
            period_ms: 250,
            stall_timeout_ms: 2000,
        }
    }
}

/// Loads `config/default.toml`, then applies `ZUMO__SECTION__KEY` overrides.
pub fn load_settings() -> Result<Settings, ConfigError> {
    info!("Attempting to load configuration from {}", DEFAULT_CONFIG_PATH);

    let settings = Config::builder()
        .add_source(File::new(DEFAULT_CONFIG_PATH, FileFormat::Toml).required(true))
        .add_source(Environment::with_prefix(ENV_PREFIX).prefix_separator("__").separator("__"))
        .build()
        .and_then(|c| c.try_deserialize::<Settings>());

    match settings {
        Ok(settings) => {
            info!(mode = ?settings.transport.mode, particles = settings.filter.particles, "Configuration loaded");
            Ok(settings)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            Err(e)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOML: &str = r#"
        [map]
        margin = 4
        scene = [[0.0, 0.0], [1.0, 0.0], [1.0, 0.5], [0.0, 0.5]]

        [filter]
        particles = 250

        [filter.initial_pose]
        x = 0.25
        y = 0.25

        [filter.sensor]
        max_range = 1.5

        [transport]
        mode = "simulated"
    "#;

    fn parse(toml: &str) -> Settings {
        Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_parse_with_defaults() {
        let s = parse(TOML);
        assert_eq!(s.map.margin, 4);
        assert_eq!(s.map.resolution, 100.0);
        assert_eq!(s.map.scene_vertices()[2], (1.0, 0.5));

        let filter = s.filter.filter_config();
        assert_eq!(filter.particles, 250);
        assert_eq!(filter.sensor.max_range, 1.5);
        assert_eq!(filter.sensor.min_range, SensorConfig::default().min_range);
        assert_eq!(filter.motion, MotionConfig::default());

        let pose = s.filter.initial_pose.unwrap();
        assert_eq!(pose.pose().x, 0.25);
        assert_eq!(pose.spread, 0.05);

        assert_eq!(s.transport.mode, TransportMode::Simulated);
        assert_eq!(s.transport.bind.port(), 5555);
        assert_eq!(s.render.opacity_floor, 100);
        assert!(!s.cycle.skip_idle);
    }

    #[test]
    fn test_missing_scene_is_error() {
        let result = Config::builder()
            .add_source(File::from_str("[map]\nmargin = 3\n", FileFormat::Toml))
            .build()
            .unwrap()
            .try_deserialize::<Settings>();
        assert!(result.is_err());
    }
}
