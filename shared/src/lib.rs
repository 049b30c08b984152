//! Stream Station shared types
//!
//! This crate provides the device model, event payload encoding and the hub
//! link frame codec used by the station binary.

pub mod codec;
pub mod frame;
pub mod model;
pub mod payload;

pub use frame::{Frame, FrameKind};
pub use model::{DeviceFlags, DeviceProperties, SensorReading, StaticSnapshot, WaterSensorRecord};
pub use payload::{encode_announcement, encode_telemetry, EncodingError, TelemetryPayload};

/// Station identity defaults, matching the field unit this firmware shipped on
pub mod defaults {
    pub const DEVICE_ID: &str = "lyons_creek_1";
    pub const DEVICE_STATE: &str = "normal";
    pub const MANUFACTURER: &str = "SparkFun";
    pub const MODEL_NUMBER: &str = "Thing Dev";
    pub const FIRMWARE_VERSION: &str = "2.1.1";
    pub const SCHEMA_VERSION: &str = "1.0";

    /// Sampling cadence of the telemetry loop
    pub const SAMPLE_INTERVAL_MS: u64 = 10_000;

    /// How often the transport is pumped while sends are outstanding
    pub const DRAIN_POLL_MS: u64 = 1000;
}
