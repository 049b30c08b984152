//! Device model
//!
//! Static identity of the station plus the latest sampled readings, and the
//! behavior flags shared between the command path and the telemetry path.

use std::sync::atomic::{AtomicBool, Ordering};

/// Static properties advertised in the device-info announcement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceProperties {
    pub identifier: String,
    pub hub_enabled: bool,
    pub state: String,
    pub manufacturer: String,
    pub model_number: String,
    pub firmware_version: String,
    pub latitude: i32,
    pub longitude: i32,
}

/// One sample handed to the model by the controlling loop
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorReading {
    pub air_temp: i32,
    pub water_temp: i32,
    /// Caller-formatted sample time, never parsed
    pub timestamp: String,
}

impl SensorReading {
    pub fn new(air_temp: i32, water_temp: i32, timestamp: impl Into<String>) -> Self {
        Self {
            air_temp,
            water_temp,
            timestamp: timestamp.into(),
        }
    }
}

/// Borrowed view of everything the announcement carries
#[derive(Debug, Clone, Copy)]
pub struct StaticSnapshot<'a> {
    pub version: &'a str,
    pub is_simulated: bool,
    pub properties: &'a DeviceProperties,
    pub supported_commands: Option<&'a str>,
}

/// The water sensor record: static identity plus the latest sample
#[derive(Debug, Clone)]
pub struct WaterSensorRecord {
    device_id: String,
    version: String,
    is_simulated: bool,
    properties: DeviceProperties,
    supported_commands: Option<String>,
    air_temp: Option<i32>,
    water_temp: Option<i32>,
    timestamp: Option<String>,
}

impl WaterSensorRecord {
    /// Create a record; the device id is always taken from the properties
    pub fn new(
        properties: DeviceProperties,
        version: impl Into<String>,
        is_simulated: bool,
        supported_commands: Option<String>,
    ) -> Self {
        Self {
            device_id: properties.identifier.clone(),
            version: version.into(),
            is_simulated,
            properties,
            supported_commands,
            air_temp: None,
            water_temp: None,
            timestamp: None,
        }
    }

    /// Overwrite the sampled fields. Values are not validated.
    pub fn update(&mut self, air_temp: i32, water_temp: i32, timestamp: impl Into<String>) {
        self.air_temp = Some(air_temp);
        self.water_temp = Some(water_temp);
        self.timestamp = Some(timestamp.into());
    }

    pub fn apply(&mut self, reading: &SensorReading) {
        self.update(reading.air_temp, reading.water_temp, reading.timestamp.clone());
    }

    pub fn static_snapshot(&self) -> StaticSnapshot<'_> {
        StaticSnapshot {
            version: &self.version,
            is_simulated: self.is_simulated,
            properties: &self.properties,
            supported_commands: self.supported_commands.as_deref(),
        }
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn properties(&self) -> &DeviceProperties {
        &self.properties
    }

    pub fn air_temp(&self) -> Option<i32> {
        self.air_temp
    }

    pub fn water_temp(&self) -> Option<i32> {
        self.water_temp
    }

    pub fn timestamp(&self) -> Option<&str> {
        self.timestamp.as_deref()
    }
}

/// Behavior flags mutated by command handlers and read by the encoder.
///
/// Shared across execution contexts behind an `Arc`; the single scalar is
/// an atomic so no lock is needed.
#[derive(Debug)]
pub struct DeviceFlags {
    air_temp_enabled: AtomicBool,
}

impl DeviceFlags {
    pub fn new() -> Self {
        Self {
            air_temp_enabled: AtomicBool::new(true),
        }
    }

    pub fn air_temp_enabled(&self) -> bool {
        self.air_temp_enabled.load(Ordering::SeqCst)
    }

    pub fn set_air_temp_enabled(&self, enabled: bool) {
        self.air_temp_enabled.store(enabled, Ordering::SeqCst);
    }
}

impl Default for DeviceFlags {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
pub(crate) fn test_properties() -> DeviceProperties {
    DeviceProperties {
        identifier: "lyons_creek_1".into(),
        hub_enabled: true,
        state: "normal".into(),
        manufacturer: "SparkFun".into(),
        model_number: "Thing Dev".into(),
        firmware_version: "2.1.1".into(),
        latitude: 0,
        longitude: 0,
    }
}
