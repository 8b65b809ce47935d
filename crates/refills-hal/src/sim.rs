//! In-process simulated drivers for headless runs and tests.
//!
//! [`SimRobot`] bundles a simulated base, arm, perception pipeline and
//! transform buffer that share one command log.  Every facade call is
//! appended to the log as a [`SimCall`], so tests can assert on the exact
//! command sequence the sequencer produced.
//!
//! # Example
//!
//! ```rust
//! use refills_hal::sim::{SimCall, SimRobot};
//!
//! let sim = SimRobot::new();
//! let robot = sim.robot();
//! robot.arm.drive_pose().expect("sim arm must succeed");
//! assert_eq!(sim.calls(), vec![SimCall::DrivePose]);
//! ```

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use refills_types::{
    DetectedFloor, PointStamped, PoseStamped, QuaternionStamped, RefillsError,
};

use crate::arm::ArmDriver;
use crate::base::BaseDriver;
use crate::frames::FrameLookup;
use crate::motion::MotionOutcome;
use crate::perception::PerceptionDriver;
use crate::robot::Robot;

// ────────────────────────────────────────────────────────────────────────────
// Command log
// ────────────────────────────────────────────────────────────────────────────

/// One command received by a simulated driver.
#[derive(Debug, Clone, PartialEq)]
pub enum SimCall {
    MoveAbsolute {
        frame_id: String,
        x: f64,
        y: f64,
        yaw: f64,
    },
    MoveRelative {
        dx: f64,
        dy: f64,
        dyaw: f64,
    },
    BaseStop,
    OrientationGoal(QuaternionStamped),
    TranslationGoal(PointStamped),
    SendCartesianGoal,
    DrivePose,
    FloorDetectionPose,
    PreBaseboardPose,
    CancelGoal,
    CancelAllGoals,
    DetectFloors(String),
    StartBaseboardDetection,
    StopBaseboardDetection,
    DetectFakeShelves(String),
    StartSeparatorDetection { shelf_id: String, floor_id: String },
    StopSeparatorDetection,
    StartBarcodeDetection { shelf_id: String, floor_id: String },
    StopBarcodeDetection,
    Count,
}

/// Command log shared by the drivers of one [`SimRobot`].
pub type SimLog = Arc<Mutex<Vec<SimCall>>>;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

fn record(log: &SimLog, call: SimCall) {
    lock(log).push(call);
}

// ────────────────────────────────────────────────────────────────────────────
// Base
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct BaseState {
    relative_timeouts: bool,
    relative_failures: bool,
    stuff_close: bool,
    fail_stop: bool,
}

/// A simulated base.  Motions succeed unless configured to time out.
pub struct SimBase {
    log: SimLog,
    state: Mutex<BaseState>,
}

impl SimBase {
    fn new(log: SimLog) -> Self {
        Self {
            log,
            state: Mutex::new(BaseState::default()),
        }
    }

    /// Make every relative motion report [`MotionOutcome::TimedOut`].
    pub fn time_out_relative_moves(&self, enabled: bool) {
        lock(&self.state).relative_timeouts = enabled;
    }

    /// Make every relative motion fail with a base fault (after recording
    /// the call).
    pub fn fail_relative_moves(&self, fail: bool) {
        lock(&self.state).relative_failures = fail;
    }

    /// Set the proximity-check result.
    pub fn set_stuff_close(&self, close: bool) {
        lock(&self.state).stuff_close = close;
    }

    /// Make [`BaseDriver::stop`] return an error (after recording the call).
    pub fn fail_stop(&self, fail: bool) {
        lock(&self.state).fail_stop = fail;
    }
}

impl BaseDriver for SimBase {
    fn move_absolute(
        &self,
        frame_id: &str,
        x: f64,
        y: f64,
        yaw: f64,
    ) -> Result<MotionOutcome, RefillsError> {
        record(
            &self.log,
            SimCall::MoveAbsolute {
                frame_id: frame_id.to_string(),
                x,
                y,
                yaw,
            },
        );
        Ok(MotionOutcome::Reached)
    }

    fn move_relative(&self, dx: f64, dy: f64, dyaw: f64) -> Result<MotionOutcome, RefillsError> {
        record(&self.log, SimCall::MoveRelative { dx, dy, dyaw });
        let state = lock(&self.state);
        if state.relative_failures {
            return Err(RefillsError::Hardware {
                component: "base".to_string(),
                details: "simulated motion failure".to_string(),
            });
        }
        if state.relative_timeouts {
            Ok(MotionOutcome::TimedOut)
        } else {
            Ok(MotionOutcome::Reached)
        }
    }

    fn stop(&self) -> Result<(), RefillsError> {
        record(&self.log, SimCall::BaseStop);
        if lock(&self.state).fail_stop {
            return Err(RefillsError::Hardware {
                component: "base".to_string(),
                details: "simulated stop failure".to_string(),
            });
        }
        Ok(())
    }

    fn is_stuff_close(&self) -> Result<bool, RefillsError> {
        Ok(lock(&self.state).stuff_close)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Arm
// ────────────────────────────────────────────────────────────────────────────

/// A simulated arm.  Every goal is reached.
pub struct SimArm {
    log: SimLog,
    root: String,
    tip: String,
}

impl SimArm {
    fn new(log: SimLog) -> Self {
        Self {
            log,
            root: "base_footprint".to_string(),
            tip: "camera_link".to_string(),
        }
    }
}

impl ArmDriver for SimArm {
    fn root_frame(&self) -> &str {
        &self.root
    }

    fn tip_frame(&self) -> &str {
        &self.tip
    }

    fn set_orientation_goal(&self, goal: QuaternionStamped) -> Result<(), RefillsError> {
        record(&self.log, SimCall::OrientationGoal(goal));
        Ok(())
    }

    fn set_translation_goal(&self, goal: PointStamped) -> Result<(), RefillsError> {
        record(&self.log, SimCall::TranslationGoal(goal));
        Ok(())
    }

    fn send_cartesian_goal(&self) -> Result<MotionOutcome, RefillsError> {
        record(&self.log, SimCall::SendCartesianGoal);
        Ok(MotionOutcome::Reached)
    }

    fn drive_pose(&self) -> Result<MotionOutcome, RefillsError> {
        record(&self.log, SimCall::DrivePose);
        Ok(MotionOutcome::Reached)
    }

    fn floor_detection_pose(&self) -> Result<MotionOutcome, RefillsError> {
        record(&self.log, SimCall::FloorDetectionPose);
        Ok(MotionOutcome::Reached)
    }

    fn pre_baseboard_pose(&self) -> Result<MotionOutcome, RefillsError> {
        record(&self.log, SimCall::PreBaseboardPose);
        Ok(MotionOutcome::Reached)
    }

    fn cancel_goal(&self) -> Result<(), RefillsError> {
        record(&self.log, SimCall::CancelGoal);
        Ok(())
    }

    fn cancel_all_goals(&self) -> Result<(), RefillsError> {
        record(&self.log, SimCall::CancelAllGoals);
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Perception
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct PerceptionState {
    floors: HashMap<String, Vec<DetectedFloor>>,
    baseboards: BTreeMap<String, PoseStamped>,
    fixtures: HashMap<String, BTreeMap<String, PoseStamped>>,
    active_fixture: Option<BTreeMap<String, PoseStamped>>,
    separators: Vec<PoseStamped>,
    barcodes: BTreeMap<String, PoseStamped>,
    count: u32,
}

/// A simulated perception pipeline that replays configured observations.
pub struct SimPerception {
    log: SimLog,
    state: Mutex<PerceptionState>,
}

impl SimPerception {
    fn new(log: SimLog) -> Self {
        Self {
            log,
            state: Mutex::new(PerceptionState::default()),
        }
    }

    /// Floors reported by [`PerceptionDriver::detect_floors`] for `shelf_id`.
    pub fn set_floors(&self, shelf_id: impl Into<String>, floors: Vec<DetectedFloor>) {
        lock(&self.state).floors.insert(shelf_id.into(), floors);
    }

    /// Shelves reported by a live baseboard session.
    pub fn set_baseboards(&self, shelves: BTreeMap<String, PoseStamped>) {
        lock(&self.state).baseboards = shelves;
    }

    /// Register a fallback shelf fixture under `token`.
    pub fn add_fixture(&self, token: impl Into<String>, shelves: BTreeMap<String, PoseStamped>) {
        lock(&self.state).fixtures.insert(token.into(), shelves);
    }

    /// Separators reported by every separator session.
    pub fn set_separators(&self, separators: Vec<PoseStamped>) {
        lock(&self.state).separators = separators;
    }

    /// Barcodes reported by every barcode session.
    pub fn set_barcodes(&self, barcodes: BTreeMap<String, PoseStamped>) {
        lock(&self.state).barcodes = barcodes;
    }

    /// Value returned by [`PerceptionDriver::count`].
    pub fn set_count(&self, count: u32) {
        lock(&self.state).count = count;
    }
}

impl PerceptionDriver for SimPerception {
    fn detect_floors(&self, shelf_id: &str) -> Result<Vec<DetectedFloor>, RefillsError> {
        record(&self.log, SimCall::DetectFloors(shelf_id.to_string()));
        Ok(lock(&self.state)
            .floors
            .get(shelf_id)
            .cloned()
            .unwrap_or_default())
    }

    fn start_baseboard_detection(&self) -> Result<(), RefillsError> {
        record(&self.log, SimCall::StartBaseboardDetection);
        Ok(())
    }

    fn stop_baseboard_detection(&self) -> Result<BTreeMap<String, PoseStamped>, RefillsError> {
        record(&self.log, SimCall::StopBaseboardDetection);
        let mut state = lock(&self.state);
        match state.active_fixture.take() {
            Some(fixture) => Ok(fixture),
            None => Ok(state.baseboards.clone()),
        }
    }

    fn detect_fake_shelves(&self, token: &str) -> Result<(), RefillsError> {
        record(&self.log, SimCall::DetectFakeShelves(token.to_string()));
        let mut state = lock(&self.state);
        match state.fixtures.get(token).cloned() {
            Some(fixture) => {
                state.active_fixture = Some(fixture);
                Ok(())
            }
            None => Err(RefillsError::Hardware {
                component: "perception".to_string(),
                details: format!("no shelf fixture registered for token '{token}'"),
            }),
        }
    }

    fn start_separator_detection(&self, shelf_id: &str, floor_id: &str) -> Result<(), RefillsError> {
        record(
            &self.log,
            SimCall::StartSeparatorDetection {
                shelf_id: shelf_id.to_string(),
                floor_id: floor_id.to_string(),
            },
        );
        Ok(())
    }

    fn stop_separator_detection(&self) -> Result<Vec<PoseStamped>, RefillsError> {
        record(&self.log, SimCall::StopSeparatorDetection);
        Ok(lock(&self.state).separators.clone())
    }

    fn start_barcode_detection(&self, shelf_id: &str, floor_id: &str) -> Result<(), RefillsError> {
        record(
            &self.log,
            SimCall::StartBarcodeDetection {
                shelf_id: shelf_id.to_string(),
                floor_id: floor_id.to_string(),
            },
        );
        Ok(())
    }

    fn stop_barcode_detection(&self) -> Result<BTreeMap<String, PoseStamped>, RefillsError> {
        record(&self.log, SimCall::StopBarcodeDetection);
        Ok(lock(&self.state).barcodes.clone())
    }

    fn count(&self) -> Result<u32, RefillsError> {
        record(&self.log, SimCall::Count);
        Ok(lock(&self.state).count)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Frames
// ────────────────────────────────────────────────────────────────────────────

/// A static transform table keyed by `(target_frame, source_frame)`.
#[derive(Default)]
pub struct SimFrames {
    transforms: Mutex<HashMap<(String, String), PoseStamped>>,
}

impl SimFrames {
    /// Register the pose of `source_frame` in `target_frame`.
    pub fn set_transform(
        &self,
        target_frame: impl Into<String>,
        source_frame: impl Into<String>,
        pose: PoseStamped,
    ) {
        lock(&self.transforms).insert((target_frame.into(), source_frame.into()), pose);
    }
}

impl FrameLookup for SimFrames {
    fn lookup_transform(
        &self,
        target_frame: &str,
        source_frame: &str,
    ) -> Result<PoseStamped, RefillsError> {
        lock(&self.transforms)
            .get(&(target_frame.to_string(), source_frame.to_string()))
            .cloned()
            .ok_or_else(|| RefillsError::Hardware {
                component: "tf".to_string(),
                details: format!("no transform from '{source_frame}' to '{target_frame}'"),
            })
    }
}

// ────────────────────────────────────────────────────────────────────────────
// SimRobot
// ────────────────────────────────────────────────────────────────────────────

/// A complete simulated robot whose drivers share one [`SimLog`].
pub struct SimRobot {
    pub base: Arc<SimBase>,
    pub arm: Arc<SimArm>,
    pub perception: Arc<SimPerception>,
    pub frames: Arc<SimFrames>,
    log: SimLog,
}

impl SimRobot {
    pub fn new() -> Self {
        let log: SimLog = Arc::new(Mutex::new(Vec::new()));
        Self {
            base: Arc::new(SimBase::new(Arc::clone(&log))),
            arm: Arc::new(SimArm::new(Arc::clone(&log))),
            perception: Arc::new(SimPerception::new(Arc::clone(&log))),
            frames: Arc::new(SimFrames::default()),
            log,
        }
    }

    /// A [`Robot`] whose drivers are this simulator's drivers.
    pub fn robot(&self) -> Robot {
        Robot::new(
            Arc::clone(&self.base) as Arc<dyn BaseDriver>,
            Arc::clone(&self.arm) as Arc<dyn ArmDriver>,
            Arc::clone(&self.perception) as Arc<dyn PerceptionDriver>,
            Arc::clone(&self.frames) as Arc<dyn FrameLookup>,
        )
    }

    /// Snapshot of every command received so far.
    pub fn calls(&self) -> Vec<SimCall> {
        lock(&self.log).clone()
    }

    pub fn clear_calls(&self) {
        lock(&self.log).clear();
    }
}

impl Default for SimRobot {
    fn default() -> Self {
        Self::new()
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Tests
// ────────────────────────────────────────────────────────────────────────────
