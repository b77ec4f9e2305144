//! The CPU-bound cycle loop, run on a dedicated thread.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use zumo_localization::{CycleReport, LocalizationCycle, ReadingStatus};

use crate::blackboard::{
    Blackboard, FAULT_DEGENERATE, clear_fault, count_rejected, raise_fault, touch_cycle,
};
use crate::bus::Topic;
use crate::render::RenderFrame;
use crate::transport::WirePair;

pub struct LocalizationLoop {
    cycle: LocalizationCycle,
    /// Map cells as bytes, shared by every frame
    grid: Arc<Vec<u8>>,
    frames: Topic<RenderFrame>,
    bb: Blackboard,
    opacity_floor: u8,
}

impl LocalizationLoop {
    pub fn new(
        cycle: LocalizationCycle,
        frames: Topic<RenderFrame>,
        bb: Blackboard,
        opacity_floor: u8,
    ) -> Self {
        let grid = Arc::new(cycle.filter().map().grid().to_bytes());
        LocalizationLoop {
            cycle,
            grid,
            frames,
            bb,
            opacity_floor,
        }
    }

    /// Runs one cycle for `pair` and publishes the result.
    ///
    /// Returns `None` if the command could not be parsed; nothing ran.
    pub fn handle(&mut self, pair: &WirePair) -> Option<CycleReport> {
        let report = match self.cycle.run_wire(&pair.command, &pair.reading) {
            Ok(report) => report,
            Err(e) => {
                warn!(error = %e, ?pair, "Dropping message");
                return None;
            }
        };

        if matches!(report.reading, ReadingStatus::Rejected(_)) {
            count_rejected(&self.bb);
        }
        if report.degenerate() {
            raise_fault(&self.bb, FAULT_DEGENERATE);
        } else if !report.skipped() {
            clear_fault(&self.bb, FAULT_DEGENERATE);
        }

        let filter = self.cycle.filter();
        let metres = report.estimate.map(|e| filter.map().grid_to_metres(e.position));
        touch_cycle(&self.bb, report.estimate, metres);

        let snapshot = filter.snapshot();
        self.frames.publish(RenderFrame::new(
            report.index,
            filter.map(),
            Arc::clone(&self.grid),
            &snapshot,
            report.estimate,
            self.opacity_floor,
        ));
        debug!(%report, ?metres, "Cycle published");
        Some(report)
    }

    /// Blocks on `rx` and runs a cycle per pair until every sender is gone.
    pub fn run(mut self, mut rx: mpsc::Receiver<WirePair>) {
        info!("Localization thread started.");
        while let Some(pair) = rx.blocking_recv() {
            self.handle(&pair);
        }
        info!(cycles = self.cycle.cycles(), "Input closed. Localization thread exiting.");
    }
}
