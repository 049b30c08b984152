//! Station configuration
//!
//! Read once at startup from an optional TOML file. Every field has a
//! default, so an empty file (or no file) yields the stock field unit.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use stream_station_shared::{defaults, DeviceProperties, WaterSensorRecord};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StationConfig {
    #[serde(default)]
    pub device: DeviceConfig,
    #[serde(default)]
    pub transport: TransportConfig,
    #[serde(default)]
    pub sampling: SamplingConfig,
}

/// Static identity advertised in the announcement
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceConfig {
    #[serde(default = "default_identifier")]
    pub identifier: String,
    #[serde(default = "default_true")]
    pub hub_enabled: bool,
    #[serde(default = "default_state")]
    pub state: String,
    #[serde(default = "default_manufacturer")]
    pub manufacturer: String,
    #[serde(default = "default_model_number")]
    pub model_number: String,
    #[serde(default = "default_firmware_version")]
    pub firmware_version: String,
    #[serde(default)]
    pub latitude: i32,
    #[serde(default)]
    pub longitude: i32,
    /// Payload schema version
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub simulated: bool,
    /// Raw JSON embedded as `Commands` in the announcement
    #[serde(default)]
    pub supported_commands: Option<String>,
    /// Advertise the registered command names when `supported_commands` is unset
    #[serde(default)]
    pub advertise_commands: bool,
}

fn default_identifier() -> String {
    defaults::DEVICE_ID.into()
}

fn default_true() -> bool {
    true
}

fn default_state() -> String {
    defaults::DEVICE_STATE.into()
}

fn default_manufacturer() -> String {
    defaults::MANUFACTURER.into()
}

fn default_model_number() -> String {
    defaults::MODEL_NUMBER.into()
}

fn default_firmware_version() -> String {
    defaults::FIRMWARE_VERSION.into()
}

fn default_version() -> String {
    defaults::SCHEMA_VERSION.into()
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            identifier: default_identifier(),
            hub_enabled: true,
            state: default_state(),
            manufacturer: default_manufacturer(),
            model_number: default_model_number(),
            firmware_version: default_firmware_version(),
            latitude: 0,
            longitude: 0,
            version: default_version(),
            simulated: false,
            supported_commands: None,
            advertise_commands: false,
        }
    }
}

impl DeviceConfig {
    pub fn properties(&self) -> DeviceProperties {
        DeviceProperties {
            identifier: self.identifier.clone(),
            hub_enabled: self.hub_enabled,
            state: self.state.clone(),
            manufacturer: self.manufacturer.clone(),
            model_number: self.model_number.clone(),
            firmware_version: self.firmware_version.clone(),
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }

    /// Build the device record. `registered_commands` is the metadata used
    /// when advertising is on and no explicit metadata was configured.
    pub fn to_record(&self, registered_commands: impl FnOnce() -> String) -> WaterSensorRecord {
        let supported_commands = match (&self.supported_commands, self.advertise_commands) {
            (Some(raw), _) => Some(raw.clone()),
            (None, true) => Some(registered_commands()),
            (None, false) => None,
        };
        WaterSensorRecord::new(
            self.properties(),
            self.version.clone(),
            self.simulated,
            supported_commands,
        )
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// In-memory transport, for bench runs without a hub
    #[default]
    Loopback,
    Tcp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransportConfig {
    #[serde(default)]
    pub kind: TransportKind,
    /// Hub address for the TCP transport
    #[serde(default = "default_address")]
    pub address: String,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    /// How long the TCP transport waits for a delivery confirmation
    #[serde(default = "default_confirm_timeout_ms")]
    pub confirm_timeout_ms: u64,
}

fn default_address() -> String {
    "127.0.0.1:8883".into()
}

fn default_connect_timeout_ms() -> u64 {
    5000
}

fn default_confirm_timeout_ms() -> u64 {
    30_000
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            kind: TransportKind::default(),
            address: default_address(),
            connect_timeout_ms: default_connect_timeout_ms(),
            confirm_timeout_ms: default_confirm_timeout_ms(),
        }
    }
}

impl TransportConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_millis(self.confirm_timeout_ms)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SamplingConfig {
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,
    #[serde(default = "default_drain_poll_ms")]
    pub drain_poll_ms: u64,
    /// Centre values for the simulated sensor
    #[serde(default = "default_air_baseline")]
    pub air_baseline: i32,
    #[serde(default = "default_water_baseline")]
    pub water_baseline: i32,
}

fn default_interval_ms() -> u64 {
    defaults::SAMPLE_INTERVAL_MS
}

fn default_drain_poll_ms() -> u64 {
    defaults::DRAIN_POLL_MS
}

fn default_air_baseline() -> i32 {
    72
}

fn default_water_baseline() -> i32 {
    55
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            drain_poll_ms: default_drain_poll_ms(),
            air_baseline: default_air_baseline(),
            water_baseline: default_water_baseline(),
        }
    }
}

impl SamplingConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn drain_poll(&self) -> Duration {
        Duration::from_millis(self.drain_poll_ms)
    }
}

/// Load configuration from a TOML file
pub fn load_config(path: &Path) -> Result<StationConfig> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config {}", path.display()))?;
    let config: StationConfig = toml::from_str(&contents)
        .with_context(|| format!("Invalid config {}", path.display()))?;
    Ok(config)
}
