use parking_lot::RwLock;
use std::{sync::Arc, time::Instant};

use zumo_localization::PoseEstimate;

/// Latest localization status, shared between the cycle thread and the async tasks.
#[derive(Clone)]
pub struct State {
    /// Estimate after the most recent cycle
    pub estimate: Option<PoseEstimate>,
    /// Same estimate in scene metres
    pub estimate_metres: Option<(f64, f64)>,
    pub cycles: u64,
    pub rejected_readings: u64,
    pub last_cycle_ts: Instant,
    pub faults: Vec<String>,
}

impl Default for State {
    fn default() -> Self {
        State {
            estimate: None,
            estimate_metres: None,
            cycles: 0,
            rejected_readings: 0,
            last_cycle_ts: Instant::now(),
            faults: Vec::new(),
        }
    }
}

pub const FAULT_DEGENERATE: &str = "particle weights degenerate";
pub const FAULT_STALLED: &str = "localization stalled";

pub type Blackboard = Arc<RwLock<State>>;

pub fn snapshot(bb: &Blackboard) -> State {
    (*bb.read()).clone()
}

/// Records a finished cycle and resets the stall clock.
pub fn touch_cycle(bb: &Blackboard, estimate: Option<PoseEstimate>, metres: Option<(f64, f64)>) {
    let mut g = bb.write();
    g.estimate = estimate;
    g.estimate_metres = metres;
    g.cycles += 1;
    g.last_cycle_ts = Instant::now();
}

pub fn count_rejected(bb: &Blackboard) {
    bb.write().rejected_readings += 1;
}

pub fn raise_fault(bb: &Blackboard, msg: &str) {
    let mut g = bb.write();
    if !g.faults.iter().any(|s| s == msg) {
        g.faults.push(msg.to_string());
    }
}

pub fn clear_fault(bb: &Blackboard, msg: &str) {
    bb.write().faults.retain(|s| s != msg);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_faults_dedupe_and_clear() {
        let bb: Blackboard = Arc::default();
        raise_fault(&bb, "stalled");
        raise_fault(&bb, "stalled");
        raise_fault(&bb, "degenerate");
        assert_eq!(snapshot(&bb).faults, vec!["stalled", "degenerate"]);

        clear_fault(&bb, "stalled");
        assert_eq!(snapshot(&bb).faults, vec!["degenerate"]);
    }

    #[test]
    fn test_touch_cycle() {
        let bb: Blackboard = Arc::default();
        let before = snapshot(&bb).last_cycle_ts;
        touch_cycle(&bb, None, Some((1.0, 2.0)));
        count_rejected(&bb);
        let s = snapshot(&bb);
        assert_eq!(s.cycles, 1);
        assert_eq!(s.rejected_readings, 1);
        assert_eq!(s.estimate_metres, Some((1.0, 2.0)));
        assert!(s.last_cycle_ts >= before);
    }
}
