//! Hub link frames
//!
//! Protobuf messages exchanged with a hub over the reference TCP link.

use bytes::Bytes;
use prost::{Enumeration, Message};

/// What a frame carries
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Enumeration)]
#[repr(i32)]
pub enum FrameKind {
    Unknown = 0,
    /// Device -> hub event payload (announcement or telemetry)
    Event = 1,
    /// Hub -> device command message
    Command = 2,
    /// Device -> hub disposition for a command
    Disposition = 3,
    /// Hub -> device delivery confirmation for an event
    Confirmation = 4,
}

#[derive(Clone, PartialEq, Message)]
pub struct Frame {
    #[prost(enumeration = "FrameKind", tag = "1")]
    pub kind: i32,

    /// Event correlation token, or the hub's message id for commands
    #[prost(uint64, tag = "2")]
    pub correlation_id: u64,

    #[prost(bytes = "bytes", tag = "3")]
    pub body: Bytes,

    /// Disposition or confirmation code, depending on `kind`
    #[prost(int32, tag = "4")]
    pub status: i32,
}

impl Frame {
    pub fn event(correlation_id: u64, body: Bytes) -> Self {
        Self {
            kind: FrameKind::Event.into(),
            correlation_id,
            body,
            status: 0,
        }
    }

    pub fn command(message_id: u64, body: impl Into<Bytes>) -> Self {
        Self {
            kind: FrameKind::Command.into(),
            correlation_id: message_id,
            body: body.into(),
            status: 0,
        }
    }

    pub fn disposition(message_id: u64, status: i32) -> Self {
        Self {
            kind: FrameKind::Disposition.into(),
            correlation_id: message_id,
            body: Bytes::new(),
            status,
        }
    }

    pub fn confirmation(correlation_id: u64, status: i32) -> Self {
        Self {
            kind: FrameKind::Confirmation.into(),
            correlation_id,
            body: Bytes::new(),
            status,
        }
    }

    /// Frame kind, mapping unrecognized values to `Unknown`
    pub fn frame_kind(&self) -> FrameKind {
        FrameKind::try_from(self.kind).unwrap_or(FrameKind::Unknown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_builders() {
        let event = Frame::event(7, Bytes::from_static(b"{}"));
        assert_eq!(event.frame_kind(), FrameKind::Event);
        assert_eq!(event.correlation_id, 7);

        let disposition = Frame::disposition(3, 2);
        assert_eq!(disposition.frame_kind(), FrameKind::Disposition);
        assert_eq!(disposition.status, 2);
        assert!(disposition.body.is_empty());
    }

    #[test]
    fn test_unknown_kind() {
        let mut frame = Frame::confirmation(1, 0);
        frame.kind = 42;
        assert_eq!(frame.frame_kind(), FrameKind::Unknown);
    }
}
