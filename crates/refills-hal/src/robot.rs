//! [`Robot`] – the set of drivers the sequencer orchestrates.

use std::sync::Arc;

use crate::arm::ArmDriver;
use crate::base::BaseDriver;
use crate::emergency::EmergencyStop;
use crate::frames::FrameLookup;
use crate::perception::PerceptionDriver;

/// Shared handles to every external subsystem.
///
/// Cloning is cheap; all clones drive the same hardware.
#[derive(Clone)]
pub struct Robot {
    pub base: Arc<dyn BaseDriver>,
    pub arm: Arc<dyn ArmDriver>,
    pub perception: Arc<dyn PerceptionDriver>,
    pub frames: Arc<dyn FrameLookup>,
}

impl Robot {
    pub fn new(
        base: Arc<dyn BaseDriver>,
        arm: Arc<dyn ArmDriver>,
        perception: Arc<dyn PerceptionDriver>,
        frames: Arc<dyn FrameLookup>,
    ) -> Self {
        Self {
            base,
            arm,
            perception,
            frames,
        }
    }

    /// A cancellation handle bound to this robot's base and arm.
    pub fn emergency_stop(&self) -> EmergencyStop {
        EmergencyStop::new(Arc::clone(&self.base), Arc::clone(&self.arm))
    }
}
