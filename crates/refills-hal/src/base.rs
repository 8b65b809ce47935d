//! Mobile base facade.

use refills_types::RefillsError;

use crate::motion::MotionOutcome;

/// A mobile base that can be driven to poses in named frames.
///
/// Every motion call blocks until the navigation stack reports success or its
/// time bound elapses.
pub trait BaseDriver: Send + Sync {
    /// Drive to `(x, y, yaw)` expressed in `frame_id`.
    fn move_absolute(
        &self,
        frame_id: &str,
        x: f64,
        y: f64,
        yaw: f64,
    ) -> Result<MotionOutcome, RefillsError>;

    /// Drive by `(dx, dy, dyaw)` relative to the current base pose.
    fn move_relative(&self, dx: f64, dy: f64, dyaw: f64) -> Result<MotionOutcome, RefillsError>;

    /// Cancel the active base goal and halt.  Must be safe to call when no
    /// goal is active.
    fn stop(&self) -> Result<(), RefillsError>;

    /// `true` when the base's proximity sensing reports obstacles too close
    /// to start autonomous motion.
    fn is_stuff_close(&self) -> Result<bool, RefillsError>;
}
