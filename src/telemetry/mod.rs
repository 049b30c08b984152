//! Outbound side of the station
//!
//! This module handles:
//! - The one-shot device-info announcement
//! - Per-cycle telemetry encoding and hand-off
//! - Pumping the transport until its send queue drains

mod announcement;
mod station;

pub use station::Station;
