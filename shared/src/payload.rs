//! Event payload encoding
//!
//! Payloads are JSON objects with PascalCase field names, in the order the
//! hub expects them:
//! ```text
//! announcement: { ObjectType, Version, IsSimulatedDevice, DeviceProperties [, Commands] }
//! telemetry:    { DeviceId, [AirTemp,] WaterTemp, TimeStamp }
//! ```
//!
//! Field order follows struct declaration order, so each payload shape is
//! its own struct.

use bytes::Bytes;
use serde::Serialize;
use serde_json::value::RawValue;
use thiserror::Error;

use crate::model::{DeviceProperties, WaterSensorRecord};

/// Object type tag carried only by the announcement
pub const DEVICE_INFO_OBJECT_TYPE: &str = "DeviceInfo";

/// Errors that can occur while producing a payload
#[derive(Error, Debug)]
pub enum EncodingError {
    #[error("Required field {0} is not set")]
    MissingField(&'static str),

    #[error("Command metadata is not valid JSON: {0}")]
    InvalidCommandMetadata(#[source] serde_json::Error),

    #[error("JSON encode error: {0}")]
    Json(#[from] serde_json::Error),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct PropertiesPayload<'a> {
    #[serde(rename = "DeviceID")]
    device_id: &'a str,
    hub_enabled_state: bool,
    device_state: &'a str,
    manufacturer: &'a str,
    model_number: &'a str,
    firmware_version: &'a str,
    latitude: i32,
    longitude: i32,
}

impl<'a> From<&'a DeviceProperties> for PropertiesPayload<'a> {
    fn from(props: &'a DeviceProperties) -> Self {
        Self {
            device_id: &props.identifier,
            hub_enabled_state: props.hub_enabled,
            device_state: &props.state,
            manufacturer: &props.manufacturer,
            model_number: &props.model_number,
            firmware_version: &props.firmware_version,
            latitude: props.latitude,
            longitude: props.longitude,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
struct AnnouncementPayload<'a> {
    object_type: &'static str,
    version: &'a str,
    is_simulated_device: bool,
    device_properties: PropertiesPayload<'a>,
    /// Embedded without quoting
    #[serde(skip_serializing_if = "Option::is_none")]
    commands: Option<Box<RawValue>>,
}

/// Telemetry including the air temperature reading
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TelemetryWithAir<'a> {
    pub device_id: &'a str,
    pub air_temp: i32,
    pub water_temp: i32,
    #[serde(rename = "TimeStamp")]
    pub timestamp: &'a str,
}

/// Telemetry with the air temperature left out entirely
#[derive(Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TelemetryWaterOnly<'a> {
    pub device_id: &'a str,
    pub water_temp: i32,
    #[serde(rename = "TimeStamp")]
    pub timestamp: &'a str,
}

/// The two periodic telemetry shapes
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum TelemetryPayload<'a> {
    WithAir(TelemetryWithAir<'a>),
    WaterOnly(TelemetryWaterOnly<'a>),
}

impl<'a> TelemetryPayload<'a> {
    /// Pick the payload shape for the current record and air toggle
    pub fn from_record(
        record: &'a WaterSensorRecord,
        air_temp_enabled: bool,
    ) -> Result<Self, EncodingError> {
        let device_id = record.device_id();
        if device_id.is_empty() {
            return Err(EncodingError::MissingField("DeviceId"));
        }
        let water_temp = record
            .water_temp()
            .ok_or(EncodingError::MissingField("WaterTemp"))?;
        let timestamp = record
            .timestamp()
            .ok_or(EncodingError::MissingField("TimeStamp"))?;

        if air_temp_enabled {
            let air_temp = record
                .air_temp()
                .ok_or(EncodingError::MissingField("AirTemp"))?;
            Ok(Self::WithAir(TelemetryWithAir {
                device_id,
                air_temp,
                water_temp,
                timestamp,
            }))
        } else {
            Ok(Self::WaterOnly(TelemetryWaterOnly {
                device_id,
                water_temp,
                timestamp,
            }))
        }
    }
}

/// Encode the one-shot device-info announcement
pub fn encode_announcement(record: &WaterSensorRecord) -> Result<Bytes, EncodingError> {
    let snapshot = record.static_snapshot();
    if snapshot.properties.identifier.is_empty() {
        return Err(EncodingError::MissingField("DeviceID"));
    }
    if snapshot.version.is_empty() {
        return Err(EncodingError::MissingField("Version"));
    }

    let commands = match snapshot.supported_commands {
        Some(raw) => Some(
            RawValue::from_string(raw.to_owned())
                .map_err(EncodingError::InvalidCommandMetadata)?,
        ),
        None => None,
    };

    let payload = AnnouncementPayload {
        object_type: DEVICE_INFO_OBJECT_TYPE,
        version: snapshot.version,
        is_simulated_device: snapshot.is_simulated,
        device_properties: snapshot.properties.into(),
        commands,
    };

    Ok(Bytes::from(serde_json::to_vec(&payload)?))
}

/// Encode periodic telemetry, including `AirTemp` only when enabled
pub fn encode_telemetry(
    record: &WaterSensorRecord,
    air_temp_enabled: bool,
) -> Result<Bytes, EncodingError> {
    let payload = TelemetryPayload::from_record(record, air_temp_enabled)?;
    Ok(Bytes::from(serde_json::to_vec(&payload)?))
}
