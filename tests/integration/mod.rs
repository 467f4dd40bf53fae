//! Integration test modules for Cadenza
//!
//! - engine: construction, loop thread, shutdown
//! - transport: state machine driven through the request queue
//! - scheduling: what reaches the driver, and when
//! - routing: live-event thru, recording, filtering

pub mod engine;
pub mod routing;
pub mod scheduling;
pub mod transport;
