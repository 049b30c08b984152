//! Length-prefixed codec for the hub link
//!
//! Every frame on the wire is:
//! ```text
//! [ 4 bytes: length (u32, big-endian) ][ N bytes: protobuf Frame ]
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};
use prost::Message;
use thiserror::Error;

use crate::frame::Frame;

/// Size of the big-endian length prefix
const PREFIX_LEN: usize = 4;

/// Maximum frame size (1 MiB); station payloads are tiny
pub const MAX_FRAME_SIZE: u32 = 1024 * 1024;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("Frame too large: {0} bytes (max: {MAX_FRAME_SIZE})")]
    FrameTooLarge(usize),

    #[error("Invalid frame length prefix: {0}")]
    InvalidLength(u32),

    #[error("Protobuf decode error: {0}")]
    DecodeError(#[from] prost::DecodeError),

    #[error("Protobuf encode error: {0}")]
    EncodeError(#[from] prost::EncodeError),
}

/// Encode a frame with its length prefix
pub fn encode(frame: &Frame) -> Result<Bytes, CodecError> {
    let body_len = frame.encoded_len();
    let prefix = u32::try_from(body_len)
        .ok()
        .filter(|len| *len <= MAX_FRAME_SIZE)
        .ok_or(CodecError::FrameTooLarge(body_len))?;

    let mut buf = BytesMut::with_capacity(PREFIX_LEN + body_len);
    buf.put_u32(prefix);
    frame.encode(&mut buf)?;
    Ok(buf.freeze())
}

/// Pop one complete frame off the front of `buf`.
///
/// Returns `Ok(None)` and leaves `buf` untouched while the frame is still
/// incomplete.
pub fn decode(buf: &mut BytesMut) -> Result<Option<Frame>, CodecError> {
    if buf.len() < PREFIX_LEN {
        return Ok(None);
    }

    let body_len = (&buf[..PREFIX_LEN]).get_u32();
    if body_len > MAX_FRAME_SIZE {
        return Err(CodecError::InvalidLength(body_len));
    }
    if buf.len() < PREFIX_LEN + body_len as usize {
        return Ok(None);
    }

    buf.advance(PREFIX_LEN);
    let body = buf.split_to(body_len as usize).freeze();
    Ok(Some(Frame::decode(body)?))
}

/// Reassembles frames from socket reads that split or coalesce them
#[derive(Debug, Default)]
pub struct FrameDecoder {
    pending: BytesMut,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self {
            pending: BytesMut::with_capacity(4096),
        }
    }

    /// Append bytes read from the socket
    pub fn feed(&mut self, data: &[u8]) {
        self.pending.extend_from_slice(data);
    }

    /// Next complete frame, if one has fully arrived
    pub fn next_frame(&mut self) -> Result<Option<Frame>, CodecError> {
        decode(&mut self.pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::FrameKind;

    const ANNOUNCEMENT: &[u8] = br#"{"ObjectType":"DeviceInfo","Version":"1.0","IsSimulatedDevice":false,"DeviceProperties":{"DeviceID":"lyons_creek_1"}}"#;

    #[test]
    fn test_announcement_event_on_the_wire() {
        let frame = Frame::event(1, Bytes::from_static(ANNOUNCEMENT));
        let wire = encode(&frame).expect("encode failed");

        let prefix = u32::from_be_bytes([wire[0], wire[1], wire[2], wire[3]]);
        assert_eq!(prefix as usize, wire.len() - PREFIX_LEN);

        let mut buf = BytesMut::from(&wire[..]);
        let decoded = decode(&mut buf).expect("decode failed").expect("no frame");
        assert_eq!(decoded.frame_kind(), FrameKind::Event);
        assert_eq!(decoded.correlation_id, 1);
        assert_eq!(&decoded.body[..], ANNOUNCEMENT);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_incomplete_frame_is_left_in_place() {
        let wire = encode(&Frame::command(41, "TurnOffAir")).expect("encode failed");

        let mut buf = BytesMut::from(&wire[..2]);
        assert!(decode(&mut buf).expect("short prefix").is_none());
        assert_eq!(buf.len(), 2);

        let mut buf = BytesMut::from(&wire[..wire.len() - 1]);
        assert!(decode(&mut buf).expect("short body").is_none());
        assert_eq!(buf.len(), wire.len() - 1);
    }

    #[test]
    fn test_command_split_across_reads() {
        let wire = encode(&Frame::command(41, r#"{"Name":"TurnOffAir","Parameters":{}}"#))
            .expect("encode failed");

        let mut decoder = FrameDecoder::new();
        for chunk in wire.chunks(3) {
            decoder.feed(chunk);
            if decoder.pending.len() < wire.len() {
                assert!(decoder.next_frame().expect("decode error").is_none());
            }
        }

        let command = decoder
            .next_frame()
            .expect("decode error")
            .expect("command should be complete");
        assert_eq!(command.frame_kind(), FrameKind::Command);
        assert_eq!(command.correlation_id, 41);
        assert!(decoder.next_frame().expect("decode error").is_none());
    }

    #[test]
    fn test_confirmation_and_command_in_one_read() {
        let mut read = BytesMut::new();
        read.extend_from_slice(&encode(&Frame::confirmation(1, 0)).expect("encode failed"));
        read.extend_from_slice(&encode(&Frame::command(9, "TurnOnAir")).expect("encode failed"));

        let mut decoder = FrameDecoder::new();
        decoder.feed(&read);

        let confirmation = decoder.next_frame().unwrap().unwrap();
        assert_eq!(confirmation.frame_kind(), FrameKind::Confirmation);
        assert_eq!(confirmation.correlation_id, 1);

        let command = decoder.next_frame().unwrap().unwrap();
        assert_eq!(command.frame_kind(), FrameKind::Command);
        assert_eq!(&command.body[..], b"TurnOnAir");

        assert!(decoder.next_frame().unwrap().is_none());
    }

    #[test]
    fn test_oversized_frames() {
        let body = Bytes::from(vec![b'x'; MAX_FRAME_SIZE as usize + 1]);
        assert!(matches!(
            encode(&Frame::event(1, body)),
            Err(CodecError::FrameTooLarge(_))
        ));

        let mut buf = BytesMut::new();
        buf.put_u32(MAX_FRAME_SIZE + 1);
        buf.put_bytes(0, 16);
        assert!(matches!(decode(&mut buf), Err(CodecError::InvalidLength(_))));
    }

    #[test]
    fn test_garbage_body() {
        let mut buf = BytesMut::new();
        buf.put_u32(2);
        buf.put_slice(&[0xff, 0xff]);
        assert!(matches!(decode(&mut buf), Err(CodecError::DecodeError(_))));
    }
}
