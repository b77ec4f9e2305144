//! Monte Carlo localization over an [`OccupancyMap`](zumo_map::OccupancyMap).
//!
//! A [`ParticleFilter`] holds a fixed number of pose hypotheses. Each cycle,
//! driven by one [`Action`] and one optional range reading, runs
//! `predict -> reweight -> resample`. [`LocalizationCycle`] wires the
//! [`ReadingGate`] in front of the filter and reports what happened.

#![warn(missing_docs)]

pub mod action;
pub mod config;
pub mod cycle;
pub mod error;
pub mod filter;
pub mod ingest;
pub mod motion;
pub mod noise;
pub mod particle;
pub mod resample;
pub mod sensor;

pub use action::Action;
pub use config::{FilterConfig, MotionConfig, NoisePair, SensorConfig};
pub use cycle::{CycleReport, LocalizationCycle, ReadingStatus};
pub use error::{FilterError, IngestError};
pub use filter::ParticleFilter;
pub use ingest::{parse_reading_mm, ReadingGate};
pub use particle::{Particle, PoseEstimate};
pub use resample::ResampleOutcome;
