//! Operator answers and where they come from.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, PoisonError};

use refills_types::RefillsError;
use tracing::warn;

/// What an operator answer means for the run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OperatorDecision {
    /// The operator typed `y`.
    Proceed,
    /// The operator typed a number: skip the live step and load the fallback
    /// fixture identified by the token.
    SkipWithFallback(String),
    /// Anything else.  Carries the raw answer for the log.
    Abort(String),
}

impl OperatorDecision {
    /// Interpret one line of operator input.
    ///
    /// Only the line terminator is stripped, so `" y"` is not a proceed.
    pub fn parse(answer: &str) -> Self {
        let answer = answer.trim_end_matches(['\r', '\n']);
        if answer == "y" {
            OperatorDecision::Proceed
        } else if !answer.is_empty() && answer.chars().all(|c| c.is_ascii_digit()) {
            OperatorDecision::SkipWithFallback(answer.to_string())
        } else {
            OperatorDecision::Abort(answer.to_string())
        }
    }

    pub fn is_proceed(&self) -> bool {
        matches!(self, OperatorDecision::Proceed)
    }
}

/// A source of operator answers.
pub trait OperatorPort: Send {
    /// Show `prompt` and block until the operator answers with one line.
    fn ask(&mut self, prompt: &str) -> Result<String, RefillsError>;

    /// Show an instruction that needs no answer.
    fn inform(&mut self, message: &str) {
        let _ = message;
    }
}

// ────────────────────────────────────────────────────────────────────────────
// ScriptedOperator
// ────────────────────────────────────────────────────────────────────────────

#[derive(Default)]
struct Script {
    answers: VecDeque<String>,
    prompts: Vec<String>,
}

/// An operator that replays a fixed list of answers.
///
/// Clones share the script, so a test can keep one handle and hand another to
/// the sequencer.  Once the script runs dry every further answer is empty,
/// which parses as an abort.
#[derive(Clone, Default)]
pub struct ScriptedOperator {
    script: Arc<Mutex<Script>>,
}

impl ScriptedOperator {
    pub fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            script: Arc::new(Mutex::new(Script {
                answers: answers.into_iter().map(Into::into).collect(),
                prompts: Vec::new(),
            })),
        }
    }

    /// Every prompt shown so far, in order.
    pub fn prompts(&self) -> Vec<String> {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .prompts
            .clone()
    }

    /// Answers not consumed yet.
    pub fn remaining(&self) -> usize {
        self.script
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .answers
            .len()
    }
}

impl OperatorPort for ScriptedOperator {
    fn ask(&mut self, prompt: &str) -> Result<String, RefillsError> {
        let mut script = self.script.lock().unwrap_or_else(PoisonError::into_inner);
        script.prompts.push(prompt.to_string());
        match script.answers.pop_front() {
            Some(answer) => Ok(answer),
            None => {
                warn!(prompt, "operator script exhausted");
                Ok(String::new())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn y_proceeds() {
        assert_eq!(OperatorDecision::parse("y"), OperatorDecision::Proceed);
        assert_eq!(OperatorDecision::parse("y\n"), OperatorDecision::Proceed);
        assert_eq!(OperatorDecision::parse("y\r\n"), OperatorDecision::Proceed);
    }

    #[test]
    fn digits_skip_with_token() {
        assert_eq!(
            OperatorDecision::parse("3"),
            OperatorDecision::SkipWithFallback("3".to_string())
        );
        assert_eq!(
            OperatorDecision::parse("0042\n"),
            OperatorDecision::SkipWithFallback("0042".to_string())
        );
    }

    #[test]
    fn everything_else_aborts() {
        for answer in ["", "n", "Y", "yes", " y", "3a", "-1", "1.5"] {
            assert!(
                matches!(OperatorDecision::parse(answer), OperatorDecision::Abort(_)),
                "{answer:?} should abort"
            );
        }
    }

    #[test]
    fn scripted_operator_replays_in_order_and_records_prompts() {
        let handle = ScriptedOperator::new(["y", "7"]);
        let mut op = handle.clone();
        assert_eq!(op.ask("first").unwrap(), "y");
        assert_eq!(op.ask("second").unwrap(), "7");
        assert_eq!(handle.prompts(), vec!["first", "second"]);
        assert_eq!(handle.remaining(), 0);
    }

    #[test]
    fn exhausted_script_answers_empty() {
        let mut op = ScriptedOperator::new(Vec::<String>::new());
        let answer = op.ask("anything").unwrap();
        assert!(matches!(OperatorDecision::parse(&answer), OperatorDecision::Abort(_)));
    }
}
