//! `refills-kernel` – Safety Checkpoints
//!
//! The robot never leaves manual supervision on its own.  Before anything
//! that moves close to people or shelves, the sequencer stops at a
//! [`Checkpoint`][checkpoint::Checkpoint] and waits for the operator.
//!
//! # Modules
//!
//! - [`operator`] – [`OperatorPort`][operator::OperatorPort]: where answers
//!   come from (console, test script), and
//!   [`OperatorDecision`][operator::OperatorDecision]: what an answer means.
//! - [`checkpoint`] – [`Checkpoint`][checkpoint::Checkpoint]: the fixed set
//!   of points where the run waits for confirmation, with their instructions.
//! - [`safety_gate`] – [`SafetyGate`][safety_gate::SafetyGate]: the single
//!   interception point the sequencer passes through at every checkpoint.
//!   Anything but an explicit proceed becomes
//!   [`RefillsError::AbortedByOperator`][refills_types::RefillsError].

pub mod checkpoint;
pub mod operator;
pub mod safety_gate;

pub use checkpoint::Checkpoint;
pub use operator::{OperatorDecision, OperatorPort, ScriptedOperator};
pub use safety_gate::SafetyGate;
