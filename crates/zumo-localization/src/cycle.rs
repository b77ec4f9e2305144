//! One localization step per delivered `(command, reading)` pair.

use std::fmt;

use tracing::{debug, warn};

use crate::action::Action;
use crate::error::IngestError;
use crate::filter::ParticleFilter;
use crate::ingest::{ReadingGate, parse_reading_mm};
use crate::particle::PoseEstimate;
use crate::resample::ResampleOutcome;

/// What became of the cycle's range reading.
#[derive(Debug, Clone, PartialEq)]
pub enum ReadingStatus {
    /// Used for the likelihood update (metres).
    Accepted(f64),
    /// No reading was delivered, or it could not be parsed.
    Absent,
    /// Delivered but failed the gate, so the likelihood update only zeroed
    /// particles off the free space.
    Rejected(IngestError),
}

/// Summary of one cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Zero-based cycle counter, skipped cycles included.
    pub index: u64,
    /// Command that drove the motion update.
    pub action: Action,
    /// Whether the reading was used.
    pub reading: ReadingStatus,
    /// Result of resampling, `None` for a skipped cycle.
    pub outcome: Option<ResampleOutcome>,
    /// Pose estimate after the cycle.
    pub estimate: Option<PoseEstimate>,
}

impl CycleReport {
    /// `true` if the filter did not run this cycle.
    pub fn skipped(&self) -> bool {
        self.outcome.is_none()
    }

    /// `true` if resampling found every weight at zero.
    pub fn degenerate(&self) -> bool {
        self.outcome.is_some_and(|o| o.is_degenerate())
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cycle {} {}", self.index, self.action)?;
        match &self.reading {
            ReadingStatus::Accepted(r) => write!(f, " reading {:.3} m", r)?,
            ReadingStatus::Absent => write!(f, " no reading")?,
            ReadingStatus::Rejected(_) => write!(f, " reading rejected")?,
        }
        if let Some(est) = &self.estimate {
            write!(f, " -> {}", est)?;
        }
        Ok(())
    }
}

/// Drives a [`ParticleFilter`] through `predict -> reweight -> resample`,
/// with a [`ReadingGate`] in front of the reweight step.
pub struct LocalizationCycle {
    filter: ParticleFilter,
    gate: ReadingGate,
    /// Skip the whole cycle, gate included, on `Action::None`
    skip_idle: bool,
    cycles: u64,
}

impl LocalizationCycle {
    /// Wraps `filter` with a fresh gate.
    pub fn new(filter: ParticleFilter, skip_idle: bool) -> Self {
        LocalizationCycle {
            filter,
            gate: ReadingGate::new(),
            skip_idle,
            cycles: 0,
        }
    }

    /// Runs one cycle for `action` and an optional reading in metres.
    pub fn run(&mut self, action: Action, reading: Option<f64>) -> CycleReport {
        let index = self.cycles;
        self.cycles += 1;

        if self.skip_idle && action == Action::None {
            debug!(index, "Idle command, cycle skipped");
            return CycleReport {
                index,
                action,
                reading: ReadingStatus::Absent,
                outcome: None,
                estimate: self.filter.estimate(),
            };
        }

        let status = match reading.map(|r| self.gate.admit(r)) {
            Some(Ok(r)) => ReadingStatus::Accepted(r),
            Some(Err(e)) => ReadingStatus::Rejected(e),
            None => ReadingStatus::Absent,
        };
        let used = match status {
            ReadingStatus::Accepted(r) => Some(r),
            _ => None,
        };

        self.filter.predict(action);
        self.filter.reweight(used);
        let outcome = self.filter.resample();
        if outcome.is_degenerate() {
            warn!(index, %action, "All particle weights are zero after reweight");
        }

        let estimate = self.filter.estimate();
        debug!(index, %action, reading = ?used, ?outcome, "Cycle complete");

        CycleReport {
            index,
            action,
            reading: status,
            outcome: Some(outcome),
            estimate,
        }
    }

    /// Runs one cycle from the raw wire messages: a command symbol and a
    /// reading in millimetres.
    ///
    /// An unknown command is an error and nothing runs. A malformed reading is
    /// logged and the cycle runs without it.
    pub fn run_wire(&mut self, command: &str, reading_mm: &str) -> Result<CycleReport, IngestError> {
        let action: Action = command.parse()?;
        let reading = match parse_reading_mm(reading_mm) {
            Ok(r) => Some(r),
            Err(e) => {
                warn!(error = %e, "Dropping unparsable reading");
                None
            }
        };
        Ok(self.run(action, reading))
    }

    /// The wrapped filter.
    pub fn filter(&self) -> &ParticleFilter {
        &self.filter
    }

    /// Mutable access to the wrapped filter, e.g. to re-initialize it.
    pub fn filter_mut(&mut self) -> &mut ParticleFilter {
        &mut self.filter
    }

    /// The reading gate.
    pub fn gate(&self) -> &ReadingGate {
        &self.gate
    }

    /// Cycles run so far, skipped ones included.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }
}
