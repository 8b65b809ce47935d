//! Perception pipeline facade.
//!
//! Detection of separators, barcodes and baseboards is session-bounded:
//! between `start_*` and `stop_*` the pipeline accumulates observations in
//! the background while the robot moves.  Results are only read from the
//! matching `stop_*` call, which establishes the happens-before edge between
//! the background accumulation and the caller.

use std::collections::BTreeMap;

use refills_types::{DetectedFloor, PoseStamped, RefillsError};

/// A perception pipeline that turns camera data into shelf observations.
pub trait PerceptionDriver: Send + Sync {
    /// Detect the floors of `shelf_id` from the current viewpoint.
    fn detect_floors(&self, shelf_id: &str) -> Result<Vec<DetectedFloor>, RefillsError>;

    /// Begin accumulating baseboard observations.
    fn start_baseboard_detection(&self) -> Result<(), RefillsError>;

    /// End the baseboard session and return one pose per detected shelf,
    /// keyed by the pipeline's shelf name.
    fn stop_baseboard_detection(&self) -> Result<BTreeMap<String, PoseStamped>, RefillsError>;

    /// Load the fallback shelf fixture registered under `token` so the next
    /// baseboard session reports it instead of live detections.
    fn detect_fake_shelves(&self, token: &str) -> Result<(), RefillsError>;

    fn start_separator_detection(&self, shelf_id: &str, floor_id: &str) -> Result<(), RefillsError>;

    /// End the separator session and return the detected separator poses.
    fn stop_separator_detection(&self) -> Result<Vec<PoseStamped>, RefillsError>;

    fn start_barcode_detection(&self, shelf_id: &str, floor_id: &str) -> Result<(), RefillsError>;

    /// End the barcode session and return decoded payload → pose.
    fn stop_barcode_detection(&self) -> Result<BTreeMap<String, PoseStamped>, RefillsError>;

    /// Count the objects in the current camera view.
    fn count(&self) -> Result<u32, RefillsError>;
}
