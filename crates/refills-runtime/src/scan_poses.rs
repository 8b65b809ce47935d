//! Fixed base offsets and arm presets used while scanning.
//!
//! Base offsets are expressed in a shelf's perceived frame.  Arm preset
//! translations are relative to the floor: the floor height is added to `z`
//! when the goal is built.

use std::f64::consts::FRAC_PI_2;

use refills_types::{
    FloorCategory, PointStamped, Pose, PoseStamped, Quaternion, QuaternionStamped, Vec3,
};

/// Planar base target in a shelf frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BaseOffset {
    pub x: f64,
    pub y: f64,
    pub yaw: f64,
}

/// Where the base stands while the arm sweeps along a floor.
pub const FLOOR_SCANNING_OFFSET: BaseOffset = BaseOffset {
    x: 0.95,
    y: -0.15,
    yaw: -FRAC_PI_2,
};

/// Where the base stands while the floors of a shelf are detected.
pub const FLOOR_DETECTION_OFFSET: BaseOffset = BaseOffset {
    x: 1.3,
    y: 0.5,
    yaw: -FRAC_PI_2,
};

/// Cartesian arm goal split into its translation and orientation parts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArmPreset {
    pub translation: Vec3,
    pub rotation: Quaternion,
}

impl ArmPreset {
    pub fn orientation_goal(&self, frame_id: &str) -> QuaternionStamped {
        QuaternionStamped::new(frame_id, self.rotation)
    }

    pub fn translation_goal(&self, frame_id: &str, z_offset: f64) -> PointStamped {
        let mut point = self.translation;
        point.z += z_offset;
        PointStamped::new(frame_id, point)
    }
}

pub const BOTTOM_FLOOR_PRESET: ArmPreset = ArmPreset {
    translation: Vec3 {
        x: -0.15,
        y: -0.646,
        z: 0.177,
    },
    rotation: Quaternion {
        x: 0.0,
        y: 0.858,
        z: -0.514,
        w: 0.0,
    },
};

pub const STANDING_FLOOR_PRESET: ArmPreset = ArmPreset {
    translation: Vec3 {
        x: -0.15,
        y: -0.7,
        z: 0.0,
    },
    rotation: Quaternion {
        x: 0.0,
        y: 0.7071,
        z: -0.7071,
        w: 0.0,
    },
};

pub const HANGING_FLOOR_PRESET: ArmPreset = ArmPreset {
    translation: Vec3 {
        x: -0.15,
        y: -0.82,
        z: 0.0,
    },
    rotation: STANDING_FLOOR_PRESET.rotation,
};

/// Camera pose while counting.  The orientation goes to the arm root frame,
/// the translation to the tip frame.
pub const COUNTING_OFFSET: ArmPreset = ArmPreset {
    translation: Vec3 {
        x: 0.0,
        y: -0.1,
        z: -0.1,
    },
    rotation: Quaternion {
        x: 0.0,
        y: 0.7071,
        z: -0.7071,
        w: 0.0,
    },
};

pub fn floor_scan_preset(category: FloorCategory) -> ArmPreset {
    match category {
        FloorCategory::Bottom => BOTTOM_FLOOR_PRESET,
        FloorCategory::Hanging => HANGING_FLOOR_PRESET,
        FloorCategory::Standing => STANDING_FLOOR_PRESET,
    }
}

/// Arm pose for scanning shelf baseboards by hand.
pub fn shelf_baseboard_pose() -> PoseStamped {
    PoseStamped::new(
        "base_footprint",
        Pose::new(
            Vec3::new(-0.137, -0.68, 0.223),
            Quaternion::new(-0.0, 0.841, -0.541, 0.0),
        ),
    )
}
