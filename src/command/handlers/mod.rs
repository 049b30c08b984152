//! Command handlers for the station's named commands

mod air;

pub use air::{handle_turn_off_air, handle_turn_on_air};

use stream_station_shared::DeviceFlags;

pub const TURN_ON_AIR: &str = "TurnOnAir";
pub const TURN_OFF_AIR: &str = "TurnOffAir";

/// Context passed to command handlers
#[derive(Debug, Clone, Copy)]
pub struct HandlerContext<'a> {
    pub device_id: &'a str,
    pub flags: &'a DeviceFlags,
}
