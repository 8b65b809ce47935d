//! `refills-types` – shared geometry values, shelf-domain records and the
//! workspace-wide error type.
//!
//! Geometry mirrors the ROS message layout (`geometry_msgs`) so that values can
//! cross the knowledge-store boundary without reordering: quaternions are
//! stored `x, y, z, w`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// Thresholds
// ─────────────────────────────────────────────────────────────────────────────

/// Floors whose z in the shelf frame is above this value are never scanned.
pub const FLOOR_HEIGHT_CEILING: f64 = 1.2;

/// Floors whose z in the shelf frame is below this value are bottom floors.
pub const BOTTOM_FLOOR_THRESHOLD: f64 = 0.16;

/// Detected floors with a height band below this value are standing layers.
pub const STANDING_BAND_THRESHOLD: f64 = 0.13;

/// Standing layers lower than this are ground (5-tile) layers.
pub const STANDING_GROUND_HEIGHT: f64 = 0.2;

// ─────────────────────────────────────────────────────────────────────────────
// Geometry
// ─────────────────────────────────────────────────────────────────────────────

/// A 3-D vector / point in metres.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vec3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }
}

/// A rotation quaternion in ROS order (`x, y, z, w`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quaternion {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub w: f64,
}

impl Quaternion {
    pub fn new(x: f64, y: f64, z: f64, w: f64) -> Self {
        Self { x, y, z, w }
    }

    /// The identity rotation.
    pub fn identity() -> Self {
        Self::new(0.0, 0.0, 0.0, 1.0)
    }
}

impl Default for Quaternion {
    fn default() -> Self {
        Self::identity()
    }
}

/// Position plus orientation.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub position: Vec3,
    pub orientation: Quaternion,
}

impl Pose {
    pub fn new(position: Vec3, orientation: Quaternion) -> Self {
        Self {
            position,
            orientation,
        }
    }

    /// `false` if any component is NaN or infinite.
    pub fn is_finite(&self) -> bool {
        let p = self.position;
        let q = self.orientation;
        [p.x, p.y, p.z, q.x, q.y, q.z, q.w]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// A [`Pose`] expressed in a named coordinate frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseStamped {
    pub frame_id: String,
    pub pose: Pose,
}

impl PoseStamped {
    pub fn new(frame_id: impl Into<String>, pose: Pose) -> Self {
        Self {
            frame_id: frame_id.into(),
            pose,
        }
    }
}

/// A point expressed in a named coordinate frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointStamped {
    pub frame_id: String,
    pub point: Vec3,
}

impl PointStamped {
    pub fn new(frame_id: impl Into<String>, point: Vec3) -> Self {
        Self {
            frame_id: frame_id.into(),
            point,
        }
    }
}

/// An orientation expressed in a named coordinate frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuaternionStamped {
    pub frame_id: String,
    pub quaternion: Quaternion,
}

impl QuaternionStamped {
    pub fn new(frame_id: impl Into<String>, quaternion: Quaternion) -> Self {
        Self {
            frame_id: frame_id.into(),
            quaternion,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Shelf domain
// ─────────────────────────────────────────────────────────────────────────────

/// A raw floor detection as reported by the perception pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedFloor {
    /// Perception-local identifier of the detection.
    pub local_id: String,
    /// Vertical extent of the detected board.
    pub height_band: f64,
    /// Height of the board above the shelf origin.
    pub height: f64,
}

/// Knowledge-base layer class chosen once from detected geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LayerType {
    /// Low standing layer with five tiles.
    StandingGround,
    /// Regular standing layer with four tiles.
    Standing,
    /// Hanging layer on a mounting bar.
    Mounting,
}

impl LayerType {
    /// Classify a detected floor.
    ///
    /// | height band | height | result |
    /// |---|---|---|
    /// | `< 0.13` | `< 0.2` | [`LayerType::StandingGround`] |
    /// | `< 0.13` | `>= 0.2` | [`LayerType::Standing`] |
    /// | `>= 0.13` | any | [`LayerType::Mounting`] |
    pub fn classify(height_band: f64, height: f64) -> Self {
        if height_band < STANDING_BAND_THRESHOLD {
            if height < STANDING_GROUND_HEIGHT {
                LayerType::StandingGround
            } else {
                LayerType::Standing
            }
        } else {
            LayerType::Mounting
        }
    }
}

/// Scanning policy class of a floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FloorCategory {
    Bottom,
    Hanging,
    Standing,
}

/// A floor of a shelf as known to the knowledge base, located in the shelf's
/// perceived frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShelfFloor {
    /// Knowledge-base object id.
    pub id: String,
    /// Position in the ascending-height ordering of the shelf's floors.
    pub index: usize,
    /// Pose of the floor's perception frame relative to the shelf frame.
    pub pose: PoseStamped,
}

impl ShelfFloor {
    /// Height of the floor above the shelf origin.
    pub fn height(&self) -> f64 {
        self.pose.pose.position.z
    }

    pub fn is_too_high(&self) -> bool {
        self.height() > FLOOR_HEIGHT_CEILING
    }

    pub fn is_bottom(&self) -> bool {
        self.height() < BOTTOM_FLOOR_THRESHOLD
    }
}

/// A product slot on a floor, bounded by two separators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Facing {
    pub id: String,
    /// Pose of the facing relative to the floor's perceived frame.
    pub pose: PoseStamped,
    pub left_separator: String,
    pub right_separator: String,
}

impl Facing {
    /// Lateral offset used to order the counting sweep.
    pub fn lateral_offset(&self) -> f64 {
        self.pose.pose.position.y
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Global error type spanning operator aborts, motion failures and store
/// access.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RefillsError {
    #[error("Aborted by operator at checkpoint '{0}'")]
    AbortedByOperator(String),

    #[error("Motion timeout on {component}")]
    MotionTimeout { component: String },

    #[error("Hardware fault on {component}: {details}")]
    Hardware { component: String, details: String },

    #[error("Knowledge store error: {0}")]
    Knowledge(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_standing_ground_below_both_thresholds() {
        assert_eq!(LayerType::classify(0.05, 0.1), LayerType::StandingGround);
    }

    #[test]
    fn classify_band_boundary_at_0_13() {
        let just_below = 0.13 - 1e-9;
        assert_eq!(LayerType::classify(just_below, 0.1), LayerType::StandingGround);
        assert_eq!(LayerType::classify(0.13, 0.1), LayerType::Mounting);
        assert_eq!(LayerType::classify(0.13 + 1e-9, 0.5), LayerType::Mounting);
    }

    #[test]
    fn classify_height_boundary_at_0_2() {
        let just_below = 0.2 - 1e-9;
        assert_eq!(LayerType::classify(0.1, just_below), LayerType::StandingGround);
        assert_eq!(LayerType::classify(0.1, 0.2), LayerType::Standing);
        assert_eq!(LayerType::classify(0.1, 0.2 + 1e-9), LayerType::Standing);
    }

    #[test]
    fn pose_with_nan_is_not_finite() {
        let mut pose = Pose::new(Vec3::new(1.0, 2.0, 3.0), Quaternion::identity());
        assert!(pose.is_finite());
        pose.orientation.w = f64::NAN;
        assert!(!pose.is_finite());
        pose.orientation.w = 1.0;
        pose.position.y = f64::NEG_INFINITY;
        assert!(!pose.is_finite());
    }

    fn floor_at(z: f64) -> ShelfFloor {
        ShelfFloor {
            id: "floor".to_string(),
            index: 0,
            pose: PoseStamped::new(
                "shelf_frame",
                Pose::new(Vec3::new(0.0, 0.0, z), Quaternion::identity()),
            ),
        }
    }

    #[test]
    fn too_high_is_strictly_above_ceiling() {
        assert!(!floor_at(1.2).is_too_high());
        assert!(floor_at(1.2 + 1e-9).is_too_high());
        assert!(!floor_at(0.8).is_too_high());
    }

    #[test]
    fn bottom_is_strictly_below_threshold() {
        assert!(floor_at(0.1).is_bottom());
        assert!(!floor_at(0.16).is_bottom());
    }

    #[test]
    fn quaternion_default_is_identity() {
        let q = Quaternion::default();
        assert_eq!(q, Quaternion::new(0.0, 0.0, 0.0, 1.0));
    }

    #[test]
    fn pose_stamped_serialization_roundtrip() {
        let pose = PoseStamped::new(
            "map",
            Pose::new(Vec3::new(1.0, -2.5, 0.3), Quaternion::new(0.0, 0.7071, -0.7071, 0.0)),
        );
        let json = serde_json::to_string(&pose).unwrap();
        let back: PoseStamped = serde_json::from_str(&json).unwrap();
        assert_eq!(pose, back);
    }

    #[test]
    fn refills_error_display() {
        let err = RefillsError::AbortedByOperator("clear_area".to_string());
        assert!(err.to_string().contains("clear_area"));

        let err = RefillsError::MotionTimeout {
            component: "base".to_string(),
        };
        assert!(err.to_string().contains("base"));
    }
}
