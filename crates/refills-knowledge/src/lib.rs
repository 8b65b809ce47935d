//! `refills-knowledge` – The Knowledge Base client.
//!
//! Persists what the robot perceives (shelf systems, shelves, floors,
//! separators, barcodes) into an external symbolic store and reads derived
//! facts (floor categories, facings, frame names) back.  The store is reached
//! through a Prolog query interface; this crate is the only place in the
//! workspace that knows the query language.
//!
//! # Modules
//!
//! - [`service`] – [`QueryService`][service::QueryService]: the open / next /
//!   finish contract of the store, and
//!   [`QuerySession`][service::QuerySession]: a guard that always releases an
//!   open query.
//! - [`query`] – [`Query`][query::Query]: one variant per fact kind, rendered
//!   to Prolog text by `Display`.
//! - [`pose_codec`] – conversion between `PoseStamped` and the store's
//!   `[frame, _, [x,y,z], [qx,qy,qz,qw]]` pose term.
//! - [`client`] – [`KnowRob`][client::KnowRob]: typed reads and writes on top
//!   of a query service.
//! - [`action_log`] – [`ActionLog`][action_log::ActionLog]: the hierarchical
//!   record of what the robot did, mirrored into the store's logging graph.
//! - [`fixture`] – [`BarcodeMeshMap`][fixture::BarcodeMeshMap]: barcode to
//!   product mesh lookup loaded from JSON.
//! - [`sim`] – [`SimStore`][sim::SimStore]: an in-process query service that
//!   answers from canned solutions and records every query.

pub mod action_log;
pub mod client;
pub mod fixture;
pub mod pose_codec;
pub mod query;
pub mod service;
pub mod sim;

pub use action_log::{ActionHandle, ActionKind, ActionLog, ActionLogError, Relation};
pub use client::KnowRob;
pub use fixture::BarcodeMeshMap;
pub use query::Query;
pub use service::{KnowledgeError, QueryId, QueryService, QuerySession, Solution};
