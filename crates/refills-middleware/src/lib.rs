//! `refills-middleware` – The Nervous System
//!
//! Moves requests between the robot and the outside ROS world without caring
//! about their meaning.
//!
//! # Modules
//!
//! - [`rosbridge`] – [`RosbridgeClient`][rosbridge::RosbridgeClient]: a
//!   rosbridge v2 WebSocket client that calls ROS services and matches each
//!   response to its request id.
//! - [`json_prolog`] – [`JsonPrologService`][json_prolog::JsonPrologService]:
//!   the knowledge store's `QueryService` implemented on top of the
//!   `json_prolog` ROS services.

pub mod json_prolog;
pub mod rosbridge;

pub use json_prolog::JsonPrologService;
pub use rosbridge::{BridgeError, RosbridgeClient, ServiceTransport};
