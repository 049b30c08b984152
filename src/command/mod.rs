//! Command handling for the station
//!
//! This module handles:
//! - Decoding inbound command messages
//! - Dispatching named commands to registered handlers
//! - Mapping command outcomes to transport dispositions

mod adapter;
pub mod handlers;
mod registry;

pub use adapter::CommandAdapter;
pub use registry::{CommandOutcome, CommandRegistry};
