//! Transport abstraction the station core submits to and receives from

use async_trait::async_trait;
use bytes::Bytes;
use std::fmt;
use std::sync::Arc;
use stream_station_shared::codec::CodecError;
use thiserror::Error;

/// Opaque value chosen at submit time and echoed back in the ack callback
pub type CorrelationToken = u64;

/// Called once per submitted message with the delivery result
pub type AckCallback = Arc<dyn Fn(Confirmation, CorrelationToken) + Send + Sync>;

/// Called with the raw bytes of every inbound message
pub type MessageHandler = Arc<dyn Fn(&[u8]) -> Disposition + Send + Sync>;

/// Transport-level acknowledgement for an inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Accepted,
    Rejected,
    Abandoned,
}

impl Disposition {
    /// Wire code used in disposition frames
    pub fn code(self) -> i32 {
        match self {
            Disposition::Accepted => 0,
            Disposition::Rejected => 1,
            Disposition::Abandoned => 2,
        }
    }
}

impl fmt::Display for Disposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Disposition::Accepted => write!(f, "ACCEPTED"),
            Disposition::Rejected => write!(f, "REJECTED"),
            Disposition::Abandoned => write!(f, "ABANDONED"),
        }
    }
}

/// Delivery result reported for an outbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Ok,
    BecauseDestroy,
    MessageTimeout,
    Error,
}

impl Confirmation {
    /// Map a confirmation frame status code; unknown codes are errors
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => Confirmation::Ok,
            1 => Confirmation::BecauseDestroy,
            2 => Confirmation::MessageTimeout,
            _ => Confirmation::Error,
        }
    }
}

impl fmt::Display for Confirmation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confirmation::Ok => write!(f, "OK"),
            Confirmation::BecauseDestroy => write!(f, "BECAUSE_DESTROY"),
            Confirmation::MessageTimeout => write!(f, "MESSAGE_TIMEOUT"),
            Confirmation::Error => write!(f, "ERROR"),
        }
    }
}

/// Whether the transport still has outbound work in flight
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendStatus {
    Idle,
    Busy,
}

/// Hand-off to the transport failed; nothing was queued
#[derive(Error, Debug)]
pub enum SubmitError {
    #[error("Transport is closed")]
    Closed,

    #[error("Frame encode error: {0}")]
    Codec(#[from] CodecError),
}

/// A message transport driven cooperatively by the station loop
#[async_trait]
pub trait Transport: Send + Sync {
    /// Queue a payload for delivery. `ack` is invoked once the transport
    /// learns the delivery result.
    async fn submit(
        &self,
        payload: Bytes,
        ack: AckCallback,
        token: CorrelationToken,
    ) -> Result<(), SubmitError>;

    /// Register the handler for inbound messages, replacing any previous one
    fn on_message(&self, handler: MessageHandler);

    fn send_status(&self) -> SendStatus;

    /// Pump the transport: flush outbound work and deliver inbound messages
    async fn do_work(&self);

    /// Human-readable name for this transport
    fn name(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirmation_codes() {
        assert_eq!(Confirmation::from_code(0), Confirmation::Ok);
        assert_eq!(Confirmation::from_code(2), Confirmation::MessageTimeout);
        assert_eq!(Confirmation::from_code(99), Confirmation::Error);
        assert_eq!(Confirmation::BecauseDestroy.to_string(), "BECAUSE_DESTROY");
    }

    #[test]
    fn test_disposition_codes() {
        assert_eq!(Disposition::Accepted.code(), 0);
        assert_eq!(Disposition::Rejected.code(), 1);
        assert_eq!(Disposition::Abandoned.code(), 2);
        assert_eq!(Disposition::Abandoned.to_string(), "ABANDONED");
    }
}
