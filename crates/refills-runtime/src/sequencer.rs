//! [`Cram`] – the shop-scanning state machine.
//!
//! ```text
//! Idle ─► BaseboardDetection ─► for each shelf:
//!                                 FloorDetection ─► for each floor:
//!                                                     Scan ─► (Count)
//!      ◄──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every step opens a node in the [`ActionLog`] under the step that invoked
//! it, and closes it when the step returns, whether it succeeded or not.
//! Operator checkpoints go through the [`SafetyGate`].
//!
//! # Failure semantics
//!
//! - A traversal that times out stops the base and the floor scan carries
//!   on with what was detected.
//! - Every detection session that was started is stopped again.  When a
//!   scan is abandoned, its detections are discarded.
//! - An operator answer other than the expected one aborts the run with
//!   [`RefillsError::AbortedByOperator`].
//! - Everything else propagates.  [`Cram::scan_shop`] stops the robot before
//!   returning an error, and [`Cram::run_demo`] stops it unconditionally.
//!
//! # Example
//!
//! ```rust
//! use refills_hal::sim::SimRobot;
//! use refills_kernel::{SafetyGate, ScriptedOperator};
//! use refills_knowledge::{KnowRob, sim::SimStore};
//! use refills_runtime::{Cram, ScanConfig};
//!
//! let sim = SimRobot::new();
//! let kb = KnowRob::new(Box::new(SimStore::new()), sim.frames.clone());
//! let gate = SafetyGate::new(Box::new(ScriptedOperator::new(["n"])));
//! let mut cram = Cram::new(sim.robot(), kb, gate, ScanConfig::default()).unwrap();
//!
//! // The operator declines to start, so the run only stops the robot.
//! cram.run_demo().unwrap();
//! ```

use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use refills_hal::{EmergencyStop, MotionOutcome, Robot};
use refills_kernel::{Checkpoint, OperatorDecision, SafetyGate};
use refills_knowledge::{ActionHandle, ActionKind, ActionLog, BarcodeMeshMap, KnowRob};
use refills_types::{PoseStamped, RefillsError, ShelfFloor};
use tracing::{debug, error, info, warn};

use crate::config::ScanConfig;
use crate::scan_poses::{
    BaseOffset, COUNTING_OFFSET, FLOOR_DETECTION_OFFSET, FLOOR_SCANNING_OFFSET,
    floor_scan_preset, shelf_baseboard_pose,
};

pub const BELIEF_STATE_FILE: &str = "beliefstate.owl";
pub const ACTION_GRAPH_FILE: &str = "action_graph.owl";

pub struct Cram {
    robot: Robot,
    kb: KnowRob,
    gate: SafetyGate,
    log: ActionLog,
    estop: EmergencyStop,
    config: ScanConfig,
    meshes: BarcodeMeshMap,
    counts: BTreeMap<String, u32>,
}

impl Cram {
    /// # Errors
    ///
    /// [`RefillsError::Config`] when `config` does not validate.
    pub fn new(
        robot: Robot,
        kb: KnowRob,
        gate: SafetyGate,
        config: ScanConfig,
    ) -> Result<Self, RefillsError> {
        config.validate()?;
        let estop = robot.emergency_stop();
        Ok(Self {
            kb: kb.with_floor_width(config.floor_width),
            robot,
            gate,
            log: ActionLog::new(),
            estop,
            config,
            meshes: BarcodeMeshMap::default(),
            counts: BTreeMap::new(),
        })
    }

    pub fn with_barcode_meshes(mut self, meshes: BarcodeMeshMap) -> Self {
        self.meshes = meshes;
        self
    }

    /// A clone of the cancellation handle, for use from another thread.
    pub fn emergency_stop(&self) -> EmergencyStop {
        self.estop.clone()
    }

    pub fn action_log(&self) -> &ActionLog {
        &self.log
    }

    pub fn knowledge(&mut self) -> &mut KnowRob {
        &mut self.kb
    }

    /// Last count per facing id.
    pub fn counts(&self) -> &BTreeMap<String, u32> {
        &self.counts
    }

    // ── Top level ────────────────────────────────────────────────────────────

    /// Ask the operator to start, scan the shop on `y`, then stop the robot.
    pub fn run_demo(&mut self) -> Result<(), RefillsError> {
        let result = match self.gate.ask(Checkpoint::StartDemo) {
            Ok(OperatorDecision::Proceed) => self.scan_shop(),
            Ok(decision) => {
                info!(?decision, "demo not started");
                Ok(())
            }
            Err(e) => Err(e),
        };
        self.stop();
        result
    }

    /// Map the shelves and scan every one of them.
    pub fn scan_shop(&mut self) -> Result<(), RefillsError> {
        let result = self.logged(ActionKind::Experiment, None, |cram, node| {
            cram.scan_all_shelves(node)
        });
        if let Err(e) = &result {
            error!(error = %e, "shop scan failed");
            self.stop();
        }
        result
    }

    fn scan_all_shelves(&mut self, node: Option<ActionHandle>) -> Result<(), RefillsError> {
        self.robot.arm.drive_pose()?.require("arm")?;
        self.detect_baseboards(node)?;
        self.robot.arm.drive_pose()?.require("arm")?;

        let shelves = self.kb.get_shelves()?;
        info!(count = shelves.len(), "shelves to scan");
        for (shelf, pose) in shelves {
            info!(%shelf, frame = %pose.frame_id, "scanning shelf");
            let started = Instant::now();
            self.scan_shelf(&shelf, node)?;
            info!(%shelf, seconds = started.elapsed().as_secs_f64(), "shelf scanned");
        }
        Ok(())
    }

    /// Cancel base motion and every arm goal.  Never fails.
    pub fn stop(&self) {
        self.estop.trigger();
    }

    // ── Baseboards ───────────────────────────────────────────────────────────

    /// Find the shelves of the shop and persist them under a new shelf
    /// system.
    ///
    /// The operator either scans the baseboards by hand (`y`), or names a
    /// prepared shelf fixture by number.
    pub fn detect_baseboards(&mut self, parent: Option<ActionHandle>) -> Result<(), RefillsError> {
        self.logged(ActionKind::ShelfSystemMapping, parent, |cram, _| {
            match cram.gate.ask(Checkpoint::ClearArea)? {
                OperatorDecision::SkipWithFallback(token) => {
                    info!(%token, "using prepared shelf fixture");
                    cram.robot.perception.detect_fake_shelves(&token)?;
                    cram.robot.perception.start_baseboard_detection()?;
                }
                OperatorDecision::Proceed => {
                    cram.robot.arm.pre_baseboard_pose()?.require("arm")?;
                    cram.robot
                        .arm
                        .set_and_send_cartesian_goal(&shelf_baseboard_pose())?
                        .require("arm")?;
                    cram.robot.perception.start_baseboard_detection()?;
                    if let Err(e) = cram.confirm_baseboard_scan() {
                        if let Err(stop) = cram.robot.perception.stop_baseboard_detection() {
                            warn!(error = %stop, "failed to stop baseboard detection");
                        }
                        warn!("baseboard scan abandoned, detections discarded");
                        return Err(e);
                    }
                }
                OperatorDecision::Abort(_) => {
                    return Err(RefillsError::AbortedByOperator(
                        Checkpoint::ClearArea.name().to_string(),
                    ));
                }
            }

            let baseboards = cram.robot.perception.stop_baseboard_detection()?;
            info!(count = baseboards.len(), "baseboards detected");
            let shelf_system = cram.kb.add_shelf_system()?;
            cram.kb.add_shelves(&shelf_system, &baseboards)?;
            Ok(())
        })
    }

    fn confirm_baseboard_scan(&mut self) -> Result<(), RefillsError> {
        self.gate.require_proceed(Checkpoint::BaseboardsScanned)?;
        self.gate.require_proceed(Checkpoint::NothingClose)?;
        if self.robot.base.is_stuff_close()? {
            warn!("proximity check failed after baseboard scan");
            return Err(RefillsError::AbortedByOperator(
                Checkpoint::NothingClose.name().to_string(),
            ));
        }
        Ok(())
    }

    // ── Shelves ──────────────────────────────────────────────────────────────

    /// Detect the floors of `shelf`, scan each one and count its facings.
    ///
    /// The arm is sent back to the drive pose on the way out even when a
    /// floor fails; the floor's error is the one returned.
    pub fn scan_shelf(&mut self, shelf: &str, parent: Option<ActionHandle>) -> Result<(), RefillsError> {
        self.logged(ActionKind::ShelfFrameMapping, parent, |cram, node| {
            let scanned = cram.scan_shelf_floors(shelf, node);
            let parked = cram.robot.arm.drive_pose().and_then(|o| o.require("arm"));
            match (scanned, parked) {
                (Err(e), Err(park)) => {
                    warn!(error = %park, "arm did not return to drive pose");
                    Err(e)
                }
                (Err(e), Ok(())) => Err(e),
                (Ok(()), parked) => parked,
            }
        })
    }

    fn scan_shelf_floors(&mut self, shelf: &str, node: Option<ActionHandle>) -> Result<(), RefillsError> {
        self.detect_shelf_floors(shelf, node)?;
        let floors = self.kb.get_floor_ids(shelf)?;
        for floor in &floors {
            if floor.is_too_high() {
                info!(floor = %floor.id, height = floor.height(), "floor out of reach, skipped");
                continue;
            }
            self.scan_floor(shelf, floor, node)?;
            if self.config.counting_enabled && !self.kb.is_hanging_floor(&floor.id)? {
                self.count_floor(shelf, floor, node)?;
            }
        }
        Ok(())
    }

    /// Drive to the floor detection spot, detect the floors of `shelf` and
    /// persist them.
    pub fn detect_shelf_floors(
        &mut self,
        shelf: &str,
        parent: Option<ActionHandle>,
    ) -> Result<(), RefillsError> {
        self.logged(ActionKind::FindingShelfLayer, parent, |cram, node| {
            cram.logged(ActionKind::MoveToShelfFrame, node, |cram, node| {
                let frame = cram.kb.get_perceived_frame_id(shelf)?;
                cram.move_base(&frame, FLOOR_DETECTION_OFFSET, 0.0, node)?
                    .require("base")?;
                cram.robot.arm.floor_detection_pose()?.require("arm")
            })?;
            let floors = cram.robot.perception.detect_floors(shelf)?;
            info!(shelf, count = floors.len(), "floors detected");
            cram.kb.add_shelf_floors(shelf, &floors)?;
            Ok(())
        })
    }

    // ── Floors ───────────────────────────────────────────────────────────────

    /// Sweep along one floor and persist its separators and barcodes.
    pub fn scan_floor(
        &mut self,
        shelf: &str,
        floor: &ShelfFloor,
        parent: Option<ActionHandle>,
    ) -> Result<(), RefillsError> {
        self.logged(ActionKind::ShelfLayerMapping, parent, |cram, node| {
            info!(shelf, floor = %floor.id, index = floor.index, height = floor.height(), "scanning floor");
            let hanging = cram.kb.is_hanging_floor(&floor.id)?;

            cram.logged(ActionKind::MoveToShelfLayer, node, |cram, _| {
                cram.set_floor_scan_pose(floor)
            })?;

            // Odd floors are swept in the opposite direction unless counting
            // brings the base back to the start anyway.
            let from_start = floor.index % 2 == 0 || cram.config.counting_enabled;
            if from_start {
                cram.move_in_front_of_shelf(shelf, 0.0, node)?.require("base")?;
            }

            cram.logged(ActionKind::FindingShelfLayerParts, node, |cram, node| {
                if !hanging {
                    cram.robot.perception.start_separator_detection(shelf, &floor.id)?;
                }
                if let Err(e) = cram.robot.perception.start_barcode_detection(shelf, &floor.id) {
                    cram.discard_detections(floor, !hanging, false);
                    return Err(e);
                }

                let traversal = if from_start {
                    let width = cram.kb.floor_width();
                    cram.move_base_relative(-width, node)
                } else {
                    cram.move_in_front_of_shelf(shelf, 0.0, node)
                };
                match traversal {
                    Ok(outcome) if outcome.is_timed_out() => {
                        warn!(floor = %floor.id, "traversal timed out, stopping base");
                        if let Err(e) = cram.robot.base.stop() {
                            warn!(floor = %floor.id, error = %e, "failed to stop base after traversal timeout");
                        }
                        Ok(())
                    }
                    Ok(_) => Ok(()),
                    Err(e) => {
                        cram.discard_detections(floor, !hanging, true);
                        Err(e)
                    }
                }
            })?;

            cram.logged(ActionKind::ShelfLayerPerception, node, |cram, _| {
                // Both sessions are closed before either result is used.
                let separators = (!hanging).then(|| cram.robot.perception.stop_separator_detection());
                let barcodes = cram.robot.perception.stop_barcode_detection();
                if let Some(separators) = separators {
                    let separators = separators?;
                    info!(floor = %floor.id, count = separators.len(), "separators detected");
                    cram.kb.add_separators(&floor.id, &separators)?;
                }
                let barcodes = barcodes?;
                info!(floor = %floor.id, count = barcodes.len(), "barcodes detected");
                cram.report_unknown_products(&barcodes);
                cram.kb.add_barcodes(&floor.id, &barcodes)?;
                Ok(())
            })
        })
    }

    /// Close detection sessions of an abandoned floor scan without
    /// persisting what they found.
    fn discard_detections(&self, floor: &ShelfFloor, separators: bool, barcodes: bool) {
        if separators && let Err(e) = self.robot.perception.stop_separator_detection() {
            warn!(floor = %floor.id, error = %e, "failed to stop separator detection");
        }
        if barcodes && let Err(e) = self.robot.perception.stop_barcode_detection() {
            warn!(floor = %floor.id, error = %e, "failed to stop barcode detection");
        }
        warn!(floor = %floor.id, "floor scan abandoned, detections discarded");
    }

    fn set_floor_scan_pose(&mut self, floor: &ShelfFloor) -> Result<(), RefillsError> {
        let category = self.kb.floor_category(floor)?;
        debug!(floor = %floor.id, ?category, "floor scan preset");
        let preset = floor_scan_preset(category);
        let arm = Arc::clone(&self.robot.arm);
        arm.set_orientation_goal(preset.orientation_goal(arm.root_frame()))?;
        arm.set_translation_goal(preset.translation_goal(arm.root_frame(), floor.height()))?;
        arm.send_cartesian_goal()?.require("arm")
    }

    fn report_unknown_products(&self, barcodes: &BTreeMap<String, PoseStamped>) {
        if self.meshes.is_empty() {
            return;
        }
        for code in barcodes.keys() {
            if self.meshes.mesh_for(code).is_none() {
                warn!(barcode = %code, "no product mesh for barcode");
            }
        }
    }

    /// Look at every facing of `floor` and count the products in it.
    pub fn count_floor(
        &mut self,
        shelf: &str,
        floor: &ShelfFloor,
        parent: Option<ActionHandle>,
    ) -> Result<(), RefillsError> {
        self.logged(ActionKind::Counting, parent, |cram, node| {
            let mut facings = cram.kb.get_facings(&floor.id)?;

            let arm = Arc::clone(&cram.robot.arm);
            arm.set_orientation_goal(COUNTING_OFFSET.orientation_goal(arm.root_frame()))?;
            arm.set_translation_goal(COUNTING_OFFSET.translation_goal(arm.tip_frame(), 0.0))?;
            arm.send_cartesian_goal()?.require("arm")?;

            if facings.is_empty() {
                info!(floor = %floor.id, "no facings, moving past floor");
                let width = cram.kb.floor_width();
                return cram.move_base_relative(width, node)?.require("base");
            }

            facings.sort_by(|a, b| b.lateral_offset().total_cmp(&a.lateral_offset()));
            for facing in &facings {
                cram.logged(ActionKind::LookingAtLocation, node, |cram, node| {
                    cram.move_in_front_of_shelf(shelf, facing.lateral_offset(), node)?
                        .require("base")?;
                    let count = cram.robot.perception.count()?;
                    info!(floor = %floor.id, facing = %facing.id, count, "facing counted");
                    cram.counts.insert(facing.id.clone(), count);
                    Ok(())
                })?;
            }
            Ok(())
        })
    }

    // ── Base motions ─────────────────────────────────────────────────────────

    /// Move to the floor scanning spot of `shelf`, shifted sideways by
    /// `y_shift`.  The outcome is returned as-is.
    fn move_in_front_of_shelf(
        &mut self,
        shelf: &str,
        y_shift: f64,
        parent: Option<ActionHandle>,
    ) -> Result<MotionOutcome, RefillsError> {
        let frame = self.kb.get_perceived_frame_id(shelf)?;
        self.move_base(&frame, FLOOR_SCANNING_OFFSET, y_shift, parent)
    }

    fn move_base(
        &mut self,
        frame: &str,
        offset: BaseOffset,
        y_shift: f64,
        parent: Option<ActionHandle>,
    ) -> Result<MotionOutcome, RefillsError> {
        self.logged(ActionKind::BaseMovement, parent, |cram, _| {
            cram.robot
                .base
                .move_absolute(frame, offset.x, offset.y + y_shift, offset.yaw)
        })
    }

    fn move_base_relative(
        &mut self,
        dx: f64,
        parent: Option<ActionHandle>,
    ) -> Result<MotionOutcome, RefillsError> {
        self.logged(ActionKind::BaseMovement, parent, |cram, _| {
            cram.robot.base.move_relative(dx, 0.0, 0.0)
        })
    }

    // ── Persistence ──────────────────────────────────────────────────────────

    /// Save the belief state and the action graph into `dir`.
    pub fn save_results(&mut self, dir: &Path) -> Result<(), RefillsError> {
        self.kb.save_beliefstate(&dir.join(BELIEF_STATE_FILE))?;
        self.kb.save_action_graph(&dir.join(ACTION_GRAPH_FILE))?;
        Ok(())
    }

    // ── Action log plumbing ──────────────────────────────────────────────────

    /// Run `body` inside a new action node of `kind` under `parent`.
    ///
    /// The node is finished however `body` returns.  If the log refuses the
    /// node, `body` runs under `parent` instead.
    fn logged<T, F>(
        &mut self,
        kind: ActionKind,
        parent: Option<ActionHandle>,
        body: F,
    ) -> Result<T, RefillsError>
    where
        F: FnOnce(&mut Self, Option<ActionHandle>) -> Result<T, RefillsError>,
    {
        let node = match self.log.start(&mut self.kb, kind, parent) {
            Ok(handle) => Some(handle),
            Err(e) => {
                warn!(?kind, error = %e, "action not logged");
                None
            }
        };
        let result = body(self, node.or(parent));
        if let Some(handle) = node
            && let Err(e) = self.log.finish(&mut self.kb, handle)
        {
            warn!(?kind, error = %e, "action not closed");
        }
        result
    }
}
