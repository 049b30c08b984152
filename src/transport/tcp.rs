//! TCP transport to a hub speaking length-prefixed protobuf frames
//!
//! One connection per process; there is no reconnection. A reader task
//! decodes inbound frames into a channel, and `do_work` drains that channel,
//! answers commands with disposition frames, completes pending acks and
//! flushes queued outbound frames.

use super::traits::{
    AckCallback, Confirmation, CorrelationToken, MessageHandler, SendStatus, SubmitError,
    Transport,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use stream_station_shared::codec::{self, FrameDecoder};
use stream_station_shared::{Frame, FrameKind};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::{timeout, Instant};
use tracing::{debug, error, info, warn};

struct PendingAck {
    ack: AckCallback,
    submitted_at: Instant,
}

#[derive(Default)]
struct LinkState {
    outbound: VecDeque<Bytes>,
    pending: HashMap<CorrelationToken, PendingAck>,
    handler: Option<MessageHandler>,
}

pub struct TcpTransport {
    address: String,
    confirm_timeout: Duration,
    writer: tokio::sync::Mutex<OwnedWriteHalf>,
    inbound_rx: Mutex<mpsc::UnboundedReceiver<Frame>>,
    state: Mutex<LinkState>,
    closed: Arc<AtomicBool>,
}

impl TcpTransport {
    /// Connect to the hub and start the frame reader
    pub async fn connect(
        address: &str,
        connect_timeout: Duration,
        confirm_timeout: Duration,
    ) -> Result<Self> {
        let stream = timeout(connect_timeout, TcpStream::connect(address))
            .await
            .with_context(|| format!("Timed out connecting to {}", address))?
            .with_context(|| format!("Failed to connect to {}", address))?;

        info!("[TRANSPORT] Connected to hub at {}", address);

        let (reader, writer) = stream.into_split();
        let (inbound_tx, inbound_rx) = mpsc::unbounded_channel();
        let closed = Arc::new(AtomicBool::new(false));

        let closed_clone = closed.clone();
        tokio::spawn(async move {
            read_frames(reader, inbound_tx).await;
            closed_clone.store(true, Ordering::SeqCst);
        });

        Ok(Self {
            address: address.to_owned(),
            confirm_timeout,
            writer: tokio::sync::Mutex::new(writer),
            inbound_rx: Mutex::new(inbound_rx),
            state: Mutex::new(LinkState::default()),
            closed,
        })
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn handle_frame(&self, frame: Frame) {
        match frame.frame_kind() {
            FrameKind::Command => {
                let handler = self.state.lock().handler.clone();
                let Some(handler) = handler else {
                    warn!("[TRANSPORT] Command {} dropped, no handler", frame.correlation_id);
                    return;
                };
                let disposition = handler(&frame.body[..]);
                self.queue(&Frame::disposition(frame.correlation_id, disposition.code()));
            }
            FrameKind::Confirmation => {
                let pending = self.state.lock().pending.remove(&frame.correlation_id);
                match pending {
                    Some(pending) => {
                        (pending.ack)(Confirmation::from_code(frame.status), frame.correlation_id)
                    }
                    None => debug!(
                        "[TRANSPORT] Confirmation for unknown message {}",
                        frame.correlation_id
                    ),
                }
            }
            other => debug!("[TRANSPORT] Ignoring {:?} frame", other),
        }
    }

    fn queue(&self, frame: &Frame) {
        match codec::encode(frame) {
            Ok(encoded) => self.state.lock().outbound.push_back(encoded),
            Err(e) => error!("[TRANSPORT] Failed to encode frame: {}", e),
        }
    }

    /// Resolve every outstanding ack with `result`
    fn fail_pending(&self, result: Confirmation) {
        let pending: Vec<_> = {
            let mut state = self.state.lock();
            state.outbound.clear();
            state.pending.drain().collect()
        };
        for (token, pending) in pending {
            (pending.ack)(result, token);
        }
    }

    fn expire_pending(&self) {
        let expired: Vec<_> = {
            let mut state = self.state.lock();
            let tokens: Vec<CorrelationToken> = state
                .pending
                .iter()
                .filter(|(_, p)| p.submitted_at.elapsed() > self.confirm_timeout)
                .map(|(token, _)| *token)
                .collect();
            tokens
                .into_iter()
                .filter_map(|token| state.pending.remove(&token).map(|p| (token, p)))
                .collect()
        };
        for (token, pending) in expired {
            (pending.ack)(Confirmation::MessageTimeout, token);
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn submit(
        &self,
        payload: Bytes,
        ack: AckCallback,
        token: CorrelationToken,
    ) -> Result<(), SubmitError> {
        if self.is_closed() {
            return Err(SubmitError::Closed);
        }

        let encoded = codec::encode(&Frame::event(token, payload))?;

        let mut state = self.state.lock();
        state.outbound.push_back(encoded);
        state.pending.insert(
            token,
            PendingAck {
                ack,
                submitted_at: Instant::now(),
            },
        );
        Ok(())
    }

    fn on_message(&self, handler: MessageHandler) {
        self.state.lock().handler = Some(handler);
    }

    fn send_status(&self) -> SendStatus {
        let state = self.state.lock();
        if state.outbound.is_empty() && state.pending.is_empty() {
            SendStatus::Idle
        } else {
            SendStatus::Busy
        }
    }

    async fn do_work(&self) {
        let frames: Vec<Frame> = {
            let mut rx = self.inbound_rx.lock();
            std::iter::from_fn(|| rx.try_recv().ok()).collect()
        };
        for frame in frames {
            self.handle_frame(frame);
        }

        if self.is_closed() {
            self.fail_pending(Confirmation::BecauseDestroy);
            return;
        }

        let outbound: Vec<Bytes> = self.state.lock().outbound.drain(..).collect();
        if !outbound.is_empty() {
            let mut writer = self.writer.lock().await;
            for bytes in outbound {
                if let Err(e) = writer.write_all(&bytes).await {
                    error!("[TRANSPORT] Write to {} failed: {}", self.address, e);
                    self.closed.store(true, Ordering::SeqCst);
                    drop(writer);
                    self.fail_pending(Confirmation::Error);
                    return;
                }
            }
        }

        self.expire_pending();
    }

    fn name(&self) -> &'static str {
        "TCP"
    }
}

/// Decode frames from the hub until the connection closes
async fn read_frames(mut reader: OwnedReadHalf, inbound_tx: mpsc::UnboundedSender<Frame>) {
    let mut decoder = FrameDecoder::new();
    let mut read_buf = vec![0u8; 4096];

    loop {
        match reader.read(&mut read_buf).await {
            Ok(0) => {
                warn!("[TRANSPORT] Hub closed connection");
                return;
            }
            Ok(n) => {
                decoder.feed(&read_buf[..n]);
                loop {
                    match decoder.next_frame() {
                        Ok(Some(frame)) => {
                            if inbound_tx.send(frame).is_err() {
                                return;
                            }
                        }
                        Ok(None) => break,
                        Err(e) => {
                            error!("[TRANSPORT] Undecodable frame from hub: {}", e);
                            return;
                        }
                    }
                }
            }
            Err(e) => {
                warn!("[TRANSPORT] Read error: {}", e);
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::Disposition;
    use bytes::BytesMut;
    use tokio::net::TcpListener;

    async fn read_frame(stream: &mut TcpStream, buf: &mut BytesMut) -> Frame {
        loop {
            if let Some(frame) = codec::decode(buf).expect("bad frame") {
                return frame;
            }
            let n = stream.read_buf(buf).await.expect("hub read failed");
            assert!(n > 0, "device closed connection");
        }
    }

    #[tokio::test]
    async fn test_event_command_round_trip() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        // Hub: confirm the first event, send one command, report its disposition
        let hub = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = BytesMut::new();

            let event = read_frame(&mut stream, &mut buf).await;
            assert_eq!(event.frame_kind(), FrameKind::Event);

            let confirmation = codec::encode(&Frame::confirmation(event.correlation_id, 0)).unwrap();
            let command = codec::encode(&Frame::command(41, "TurnOffAir")).unwrap();
            let mut out = BytesMut::new();
            out.extend_from_slice(&confirmation);
            out.extend_from_slice(&command);
            stream.write_all(&out).await.unwrap();

            let disposition = read_frame(&mut stream, &mut buf).await;
            (event, disposition)
        });

        let transport = TcpTransport::connect(
            &address,
            Duration::from_secs(2),
            Duration::from_secs(5),
        )
        .await
        .expect("connect failed");

        let acks = Arc::new(Mutex::new(Vec::new()));
        let acks_clone = acks.clone();
        transport
            .submit(
                Bytes::from_static(b"{\"WaterTemp\":55}"),
                Arc::new(move |result: Confirmation, token: CorrelationToken| {
                    acks_clone.lock().push((result, token))
                }),
                3,
            )
            .await
            .expect("submit failed");
        transport.on_message(Arc::new(|body: &[u8]| {
            if body == b"TurnOffAir" {
                Disposition::Accepted
            } else {
                Disposition::Rejected
            }
        }));

        for _ in 0..200 {
            transport.do_work().await;
            if transport.send_status() == SendStatus::Idle && !acks.lock().is_empty() {
                // Flush the queued disposition
                transport.do_work().await;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let (event, disposition) = timeout(Duration::from_secs(5), hub)
            .await
            .expect("hub timed out")
            .expect("hub panicked");

        assert_eq!(event.correlation_id, 3);
        assert_eq!(&event.body[..], b"{\"WaterTemp\":55}");
        assert_eq!(*acks.lock(), vec![(Confirmation::Ok, 3)]);
        assert_eq!(disposition.frame_kind(), FrameKind::Disposition);
        assert_eq!(disposition.correlation_id, 41);
        assert_eq!(disposition.status, Disposition::Accepted.code());
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        let result =
            TcpTransport::connect(&address, Duration::from_secs(2), Duration::from_secs(5)).await;
        assert!(result.is_err());
    }
}
