//! [`EmergencyStop`] – cancel every motion the robot is executing.
//!
//! The handle is `Clone + Send + Sync` so a signal handler can hold one while
//! the sequencer runs on the main thread.  [`EmergencyStop::trigger`] never
//! fails: driver errors are logged and the remaining cancellations are still
//! attempted.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{info, warn};

use crate::arm::ArmDriver;
use crate::base::BaseDriver;

#[derive(Clone)]
pub struct EmergencyStop {
    base: Arc<dyn BaseDriver>,
    arm: Arc<dyn ArmDriver>,
    triggered: Arc<AtomicUsize>,
}

impl EmergencyStop {
    pub fn new(base: Arc<dyn BaseDriver>, arm: Arc<dyn ArmDriver>) -> Self {
        Self {
            base,
            arm,
            triggered: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Stop the base and cancel the current and all queued arm goals.
    ///
    /// Safe to call at any time, from any thread, any number of times.
    pub fn trigger(&self) {
        info!("canceling all goals");
        if let Err(e) = self.base.stop() {
            warn!(error = %e, "base stop failed");
        }
        if let Err(e) = self.arm.cancel_goal() {
            warn!(error = %e, "arm cancel_goal failed");
        }
        if let Err(e) = self.arm.cancel_all_goals() {
            warn!(error = %e, "arm cancel_all_goals failed");
        }
        self.triggered.fetch_add(1, Ordering::SeqCst);
    }

    /// How many times [`trigger`][Self::trigger] has run on this handle or
    /// any of its clones.
    pub fn trigger_count(&self) -> usize {
        self.triggered.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::{SimCall, SimRobot};

    #[test]
    fn trigger_cancels_base_and_arm() {
        let sim = SimRobot::new();
        let stop = sim.robot().emergency_stop();
        stop.trigger();
        assert_eq!(
            sim.calls(),
            vec![SimCall::BaseStop, SimCall::CancelGoal, SimCall::CancelAllGoals]
        );
        assert_eq!(stop.trigger_count(), 1);
    }

    #[test]
    fn trigger_twice_without_motion_is_safe() {
        let sim = SimRobot::new();
        let stop = sim.robot().emergency_stop();
        stop.trigger();
        stop.trigger();
        assert_eq!(stop.trigger_count(), 2);
        assert_eq!(sim.calls().len(), 6);
    }

    #[test]
    fn trigger_continues_when_base_stop_fails() {
        let sim = SimRobot::new();
        sim.base.fail_stop(true);
        let stop = sim.robot().emergency_stop();
        stop.trigger();
        let calls = sim.calls();
        assert!(calls.contains(&SimCall::CancelGoal));
        assert!(calls.contains(&SimCall::CancelAllGoals));
    }

    #[test]
    fn clones_share_the_trigger_count() {
        let sim = SimRobot::new();
        let stop = sim.robot().emergency_stop();
        let from_handler = stop.clone();
        std::thread::spawn(move || from_handler.trigger())
            .join()
            .unwrap();
        assert_eq!(stop.trigger_count(), 1);
    }
}
