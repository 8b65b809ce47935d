//! Manipulator facade.
//!
//! Cartesian goals are built incrementally (orientation, then translation)
//! and executed with [`ArmDriver::send_cartesian_goal`], matching how the
//! motion planner receives a goal constraint set.

use refills_types::{PointStamped, PoseStamped, QuaternionStamped, RefillsError};

use crate::motion::MotionOutcome;

/// A manipulator driven by a cartesian motion planner.
pub trait ArmDriver: Send + Sync {
    /// Root frame of the kinematic chain (e.g. `"base_footprint"`).
    fn root_frame(&self) -> &str;

    /// Tip frame of the kinematic chain (e.g. `"camera_link"`).
    fn tip_frame(&self) -> &str;

    /// Set the orientation part of the next cartesian goal.
    fn set_orientation_goal(&self, goal: QuaternionStamped) -> Result<(), RefillsError>;

    /// Set the translation part of the next cartesian goal.
    fn set_translation_goal(&self, goal: PointStamped) -> Result<(), RefillsError>;

    /// Execute the goal assembled so far and block until it finishes.
    fn send_cartesian_goal(&self) -> Result<MotionOutcome, RefillsError>;

    /// Set both goal parts from `goal` and execute.
    fn set_and_send_cartesian_goal(&self, goal: &PoseStamped) -> Result<MotionOutcome, RefillsError> {
        self.set_orientation_goal(QuaternionStamped::new(
            goal.frame_id.clone(),
            goal.pose.orientation,
        ))?;
        self.set_translation_goal(PointStamped::new(goal.frame_id.clone(), goal.pose.position))?;
        self.send_cartesian_goal()
    }

    /// Tucked pose that is safe while the base is driving.
    fn drive_pose(&self) -> Result<MotionOutcome, RefillsError>;

    /// Pose that lets the camera see a full shelf meter.
    fn floor_detection_pose(&self) -> Result<MotionOutcome, RefillsError>;

    /// Intermediate pose before the baseboard scanning pose.
    fn pre_baseboard_pose(&self) -> Result<MotionOutcome, RefillsError>;

    /// Cancel the currently executing goal.
    fn cancel_goal(&self) -> Result<(), RefillsError>;

    /// Cancel every goal queued on the motion server.
    fn cancel_all_goals(&self) -> Result<(), RefillsError>;
}
