//! [`SafetyGate`] – single interception point between the sequencer and the
//! operator.
//!
//! Every checkpoint goes through [`SafetyGate::ask`]: the instructions are
//! shown, the prompt is answered, and the answer is parsed into an
//! [`OperatorDecision`].  Steps that only continue on an explicit proceed use
//! [`SafetyGate::require_proceed`], which turns every other answer into
//! [`RefillsError::AbortedByOperator`].
//!
//! # Example
//!
//! ```
//! use refills_kernel::{Checkpoint, OperatorDecision, SafetyGate, ScriptedOperator};
//!
//! let mut gate = SafetyGate::new(Box::new(ScriptedOperator::new(["3", "n"])));
//!
//! let decision = gate.ask(Checkpoint::ClearArea).unwrap();
//! assert_eq!(decision, OperatorDecision::SkipWithFallback("3".into()));
//!
//! assert!(gate.require_proceed(Checkpoint::NothingClose).is_err());
//! ```

use refills_types::RefillsError;
use tracing::{info, warn};

use crate::checkpoint::Checkpoint;
use crate::operator::{OperatorDecision, OperatorPort};

/// Owns the operator port used for every checkpoint of a run.
pub struct SafetyGate {
    operator: Box<dyn OperatorPort>,
}

impl SafetyGate {
    pub fn new(operator: Box<dyn OperatorPort>) -> Self {
        Self { operator }
    }

    /// Show the checkpoint's instructions and wait for a decision.
    ///
    /// # Errors
    ///
    /// Only failures of the operator port itself (e.g. a closed console).
    pub fn ask(&mut self, checkpoint: Checkpoint) -> Result<OperatorDecision, RefillsError> {
        for line in checkpoint.instructions() {
            info!(checkpoint = checkpoint.name(), "{line}");
            self.operator.inform(line);
        }
        let answer = self.operator.ask(checkpoint.prompt())?;
        let decision = OperatorDecision::parse(&answer);
        match &decision {
            OperatorDecision::Proceed => info!(checkpoint = checkpoint.name(), "operator confirmed"),
            OperatorDecision::SkipWithFallback(token) => {
                warn!(checkpoint = checkpoint.name(), token, "operator chose fallback")
            }
            OperatorDecision::Abort(answer) => {
                warn!(checkpoint = checkpoint.name(), answer, "operator declined")
            }
        }
        Ok(decision)
    }

    /// Like [`ask`](Self::ask) but anything other than `Proceed` aborts.
    ///
    /// # Errors
    ///
    /// [`RefillsError::AbortedByOperator`] carrying the checkpoint name.
    pub fn require_proceed(&mut self, checkpoint: Checkpoint) -> Result<(), RefillsError> {
        match self.ask(checkpoint)? {
            OperatorDecision::Proceed => Ok(()),
            _ => Err(RefillsError::AbortedByOperator(checkpoint.name().to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::operator::ScriptedOperator;

    #[test]
    fn proceed_passes() {
        let mut gate = SafetyGate::new(Box::new(ScriptedOperator::new(["y"])));
        assert!(gate.require_proceed(Checkpoint::BaseboardsScanned).is_ok());
    }

    #[test]
    fn digits_do_not_satisfy_require_proceed() {
        let mut gate = SafetyGate::new(Box::new(ScriptedOperator::new(["5"])));
        let err = gate.require_proceed(Checkpoint::NothingClose).unwrap_err();
        assert_eq!(err, RefillsError::AbortedByOperator("nothing_close".to_string()));
    }

    #[test]
    fn ask_shows_the_checkpoint_prompt() {
        let handle = ScriptedOperator::new(["y"]);
        let mut gate = SafetyGate::new(Box::new(handle.clone()));
        gate.ask(Checkpoint::StartDemo).unwrap();
        assert_eq!(handle.prompts(), vec!["start demo? [y]"]);
    }

    #[test]
    fn ask_returns_abort_without_error() {
        let mut gate = SafetyGate::new(Box::new(ScriptedOperator::new(["nope"])));
        assert_eq!(
            gate.ask(Checkpoint::ClearArea).unwrap(),
            OperatorDecision::Abort("nope".to_string())
        );
    }

    struct BrokenConsole;

    impl OperatorPort for BrokenConsole {
        fn ask(&mut self, _prompt: &str) -> Result<String, RefillsError> {
            Err(RefillsError::Hardware {
                component: "console".to_string(),
                details: "stdin closed".to_string(),
            })
        }
    }

    #[test]
    fn port_failure_propagates() {
        let mut gate = SafetyGate::new(Box::new(BrokenConsole));
        assert!(matches!(
            gate.require_proceed(Checkpoint::ClearArea),
            Err(RefillsError::Hardware { .. })
        ));
    }
}
