//! Synthetic telemetry for a fleet of simulated field devices on MQTT.
//!
//! A [`scheduler::Scheduler`] replays history from a configured year and
//! then publishes live readings at a fixed cadence, while a
//! [`responder::CommandResponder`] acknowledges device commands.

pub mod config;
pub mod environment;
pub mod errors;
pub mod location;
pub mod metrics;
pub mod mqtt;
pub mod noise;
pub mod payload;
pub mod publisher;
pub mod responder;
pub mod scheduler;
pub mod topics;
