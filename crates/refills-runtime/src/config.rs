//! Run-level switches for [`Cram`][crate::sequencer::Cram].

use refills_types::RefillsError;
use serde::{Deserialize, Serialize};

/// Configuration bundle for one scan run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Count products in every facing of non-hanging floors after scanning.
    pub counting_enabled: bool,
    /// Lateral extent of one shelf floor in metres.
    pub floor_width: f64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            counting_enabled: true,
            floor_width: 1.0,
        }
    }
}

impl ScanConfig {
    pub fn validate(&self) -> Result<(), RefillsError> {
        if !self.floor_width.is_finite() || self.floor_width <= 0.0 {
            return Err(RefillsError::Config(format!(
                "floor_width must be a positive length, got {}",
                self.floor_width
            )));
        }
        Ok(())
    }
}
