//! Result type for blocking motions.

use refills_types::RefillsError;

/// How a blocking motion request ended.
///
/// A timeout is an expected outcome on a busy shop floor, so it is a value
/// rather than an error.  Callers that cannot recover from it convert it with
/// [`MotionOutcome::require`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionOutcome {
    /// The goal was reached.
    Reached,
    /// The goal was not reached within the driver's time bound.
    TimedOut,
}

impl MotionOutcome {
    pub fn is_timed_out(self) -> bool {
        matches!(self, MotionOutcome::TimedOut)
    }

    /// Turn a [`MotionOutcome::TimedOut`] into
    /// [`RefillsError::MotionTimeout`] for `component`.
    pub fn require(self, component: &str) -> Result<(), RefillsError> {
        match self {
            MotionOutcome::Reached => Ok(()),
            MotionOutcome::TimedOut => Err(RefillsError::MotionTimeout {
                component: component.to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reached_requires_ok() {
        assert!(MotionOutcome::Reached.require("base").is_ok());
        assert!(!MotionOutcome::Reached.is_timed_out());
    }

    #[test]
    fn timed_out_requires_motion_timeout() {
        let err = MotionOutcome::TimedOut.require("arm").unwrap_err();
        assert_eq!(
            err,
            RefillsError::MotionTimeout {
                component: "arm".to_string()
            }
        );
    }
}
