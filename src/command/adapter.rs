//! Inbound message adapter - turns raw transport messages into commands
//! and command outcomes into transport dispositions

use super::handlers::HandlerContext;
use super::registry::{CommandOutcome, CommandRegistry};
use crate::transport::{Disposition, MessageHandler};
use serde::Deserialize;
use std::sync::Arc;
use stream_station_shared::DeviceFlags;
use thiserror::Error;
use tracing::{info, warn};

/// Inbound buffer could not be read as a command name
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Command is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::str::Utf8Error),

    #[error("Command name is empty")]
    Empty,
}

/// Hub command object, e.g. `{"Name":"TurnOffAir","Parameters":{}}`.
/// None of the station's commands take parameters.
#[derive(Deserialize)]
struct CommandEnvelope {
    #[serde(rename = "Name")]
    name: String,
}

/// Extract the command name from a buffer that may or may not be
/// NUL-terminated. The buffer holds either a hub command object or a bare
/// command name.
pub fn decode_command_name(buffer: &[u8]) -> Result<String, DecodeError> {
    let end = buffer.iter().position(|&b| b == 0).unwrap_or(buffer.len());
    let text = std::str::from_utf8(&buffer[..end])?.trim();

    let name = match serde_json::from_str::<CommandEnvelope>(text) {
        Ok(envelope) => envelope.name.trim().to_owned(),
        Err(_) => text.to_owned(),
    };
    if name.is_empty() {
        return Err(DecodeError::Empty);
    }
    Ok(name)
}

/// Map a command outcome to the transport disposition
pub fn disposition_for(outcome: &CommandOutcome) -> Disposition {
    match outcome {
        CommandOutcome::Error { .. } => Disposition::Abandoned,
        CommandOutcome::Success => Disposition::Accepted,
        CommandOutcome::Unsupported => Disposition::Rejected,
    }
}

/// Routes inbound messages through the command registry
pub struct CommandAdapter {
    device_id: String,
    registry: Arc<CommandRegistry>,
    flags: Arc<DeviceFlags>,
}

impl CommandAdapter {
    pub fn new(
        device_id: impl Into<String>,
        registry: Arc<CommandRegistry>,
        flags: Arc<DeviceFlags>,
    ) -> Self {
        Self {
            device_id: device_id.into(),
            registry,
            flags,
        }
    }

    /// Decode and execute one inbound message
    pub fn execute(&self, buffer: &[u8]) -> CommandOutcome {
        let name = match decode_command_name(buffer) {
            Ok(name) => name,
            Err(e) => {
                warn!("[CMD] Unable to decode inbound message: {}", e);
                return CommandOutcome::Error {
                    message: e.to_string(),
                };
            }
        };

        let ctx = HandlerContext {
            device_id: &self.device_id,
            flags: &self.flags,
        };

        let outcome = self.registry.invoke(&name, &ctx);
        match &outcome {
            CommandOutcome::Success => {}
            CommandOutcome::Error { message } => {
                warn!("[CMD] {} failed: {}", name, message);
            }
            CommandOutcome::Unsupported => {
                warn!("[CMD] Unsupported command: {}", name);
            }
        }
        outcome
    }

    /// Handle one inbound message and return its disposition
    pub fn handle(&self, buffer: &[u8]) -> Disposition {
        let disposition = disposition_for(&self.execute(buffer));
        info!("[CMD] Inbound message disposition: {}", disposition);
        disposition
    }

    /// Wrap the adapter as a transport message handler
    pub fn into_handler(self) -> MessageHandler {
        let adapter = Arc::new(self);
        Arc::new(move |buffer: &[u8]| adapter.handle(buffer))
    }
}
