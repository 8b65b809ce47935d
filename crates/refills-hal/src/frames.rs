//! Transform lookups between named frames.

use refills_types::{PoseStamped, RefillsError};

/// Resolves the pose of one frame relative to another.
///
/// Implementations are backed by a transform buffer; the sequencer only needs
/// the result, never the transform math.
pub trait FrameLookup: Send + Sync {
    /// Pose of `source_frame` expressed in `target_frame`.
    fn lookup_transform(
        &self,
        target_frame: &str,
        source_frame: &str,
    ) -> Result<PoseStamped, RefillsError>;
}
