//! `refills-runtime` – The Task Sequencer
//!
//! The execution engine that drives the robot through a shop: find the
//! shelves, find their floors, scan every floor for separators and barcodes,
//! and count the products in every facing.
//!
//! # Modules
//!
//! - [`sequencer`] – [`Cram`][sequencer::Cram]: the scan state machine.  Every
//!   step is recorded in the action log, every checkpoint goes through the
//!   [`SafetyGate`], and any failure stops the robot before it propagates.
//! - [`scan_poses`] – fixed base offsets and arm presets used while scanning.
//! - [`config`] – [`ScanConfig`][config::ScanConfig]: run-level switches.
//! - [`telemetry`] – [`init_tracing`][telemetry::init_tracing]: initialises
//!   the global `tracing` subscriber with an optional OTLP span exporter.
//!
//! # Safety gating
//!
//! [`SafetyGate`] is re-exported here so that callers assembling a
//! [`Cram`][sequencer::Cram] need no direct dependency on `refills-kernel`.

pub mod config;
pub mod scan_poses;
pub mod sequencer;
pub mod telemetry;

pub use config::ScanConfig;
pub use sequencer::Cram;
pub use telemetry::{TracerProviderGuard, init_tracing};

pub use refills_kernel::SafetyGate;
