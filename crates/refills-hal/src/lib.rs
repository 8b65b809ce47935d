//! `refills-hal` – Robot Facades
//!
//! The sequencer never talks to a motion planner, a navigation stack or a
//! perception pipeline directly.  It talks to the traits in this crate, and
//! concrete drivers (ROS bridges, simulators, test doubles) implement them.
//!
//! # Modules
//!
//! - [`motion`] – [`MotionOutcome`][motion::MotionOutcome]: the result of a
//!   blocking motion, with an explicit `TimedOut` variant.
//! - [`base`] – [`BaseDriver`][base::BaseDriver]: absolute/relative base
//!   motion, hard stop and proximity check.
//! - [`arm`] – [`ArmDriver`][arm::ArmDriver]: cartesian goal builder and the
//!   fixed named arm poses.
//! - [`perception`] – [`PerceptionDriver`][perception::PerceptionDriver]:
//!   floor detection, session-bounded separator/barcode/baseboard detection
//!   and object counting.
//! - [`frames`] – [`FrameLookup`][frames::FrameLookup]: transform lookups
//!   between named frames.
//! - [`robot`] – [`Robot`][robot::Robot]: the bundle of drivers handed to the
//!   sequencer.
//! - [`emergency`] – [`EmergencyStop`][emergency::EmergencyStop]: the single
//!   cancellation entry point, shareable with signal handlers.
//! - [`sim`] – in-process simulated drivers that record every command.
//!
//! All driver traits take `&self` and are `Send + Sync`: the only object that
//! leaves the control thread is the [`EmergencyStop`] handle, and it holds the
//! same drivers the sequencer uses.

pub mod arm;
pub mod base;
pub mod emergency;
pub mod frames;
pub mod motion;
pub mod perception;
pub mod robot;
pub mod sim;

pub use arm::ArmDriver;
pub use base::BaseDriver;
pub use emergency::EmergencyStop;
pub use frames::FrameLookup;
pub use motion::MotionOutcome;
pub use perception::PerceptionDriver;
pub use robot::Robot;
