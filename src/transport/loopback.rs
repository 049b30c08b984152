//! In-memory transport
//!
//! Confirms every submitted payload on the next `do_work` and delivers
//! injected inbound messages to the registered handler. Used for bench runs
//! without a hub and throughout the tests.

use super::traits::{
    AckCallback, Confirmation, CorrelationToken, Disposition, MessageHandler, SendStatus,
    SubmitError, Transport,
};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::VecDeque;
use tracing::debug;

/// A payload accepted by the loopback transport
#[cfg(test)]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub token: CorrelationToken,
    pub payload: Bytes,
}

#[derive(Default)]
struct LoopbackState {
    unconfirmed: VecDeque<(CorrelationToken, AckCallback)>,
    inbound: VecDeque<Bytes>,
    handler: Option<MessageHandler>,
    #[cfg(test)]
    hooks: TestHooks,
}

/// Failure injection and delivery records for tests
#[cfg(test)]
#[derive(Default)]
struct TestHooks {
    sent: Vec<SentMessage>,
    dispositions: Vec<Disposition>,
    failing_submits: usize,
}

#[derive(Default)]
pub struct LoopbackTransport {
    state: Mutex<LoopbackState>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
impl LoopbackTransport {
    /// Refuse the next `count` submits
    pub fn fail_next_submits(&self, count: usize) {
        self.state.lock().hooks.failing_submits = count;
    }

    /// Queue an inbound message for delivery on the next `do_work`
    pub fn inject(&self, message: impl Into<Bytes>) {
        self.state.lock().inbound.push_back(message.into());
    }

    /// Every payload accepted so far, in submit order
    pub fn sent(&self) -> Vec<SentMessage> {
        self.state.lock().hooks.sent.clone()
    }

    /// Dispositions returned by the handler, in delivery order
    pub fn dispositions(&self) -> Vec<Disposition> {
        self.state.lock().hooks.dispositions.clone()
    }
}

#[async_trait]
impl Transport for LoopbackTransport {
    async fn submit(
        &self,
        payload: Bytes,
        ack: AckCallback,
        token: CorrelationToken,
    ) -> Result<(), SubmitError> {
        let mut state = self.state.lock();
        #[cfg(test)]
        {
            if state.hooks.failing_submits > 0 {
                state.hooks.failing_submits -= 1;
                return Err(SubmitError::Closed);
            }
            state.hooks.sent.push(SentMessage {
                token,
                payload: payload.clone(),
            });
        }
        debug!("[TRANSPORT] Loopback accepted {} bytes (id={})", payload.len(), token);
        state.unconfirmed.push_back((token, ack));
        Ok(())
    }

    fn on_message(&self, handler: MessageHandler) {
        self.state.lock().handler = Some(handler);
    }

    fn send_status(&self) -> SendStatus {
        let state = self.state.lock();
        if state.unconfirmed.is_empty() && state.inbound.is_empty() {
            SendStatus::Idle
        } else {
            SendStatus::Busy
        }
    }

    async fn do_work(&self) {
        // Callbacks run outside the lock so they may call back into us
        let (unconfirmed, inbound, handler) = {
            let mut state = self.state.lock();
            let unconfirmed: Vec<_> = state.unconfirmed.drain(..).collect();
            let inbound: Vec<_> = state.inbound.drain(..).collect();
            (unconfirmed, inbound, state.handler.clone())
        };

        for (token, ack) in unconfirmed {
            ack(Confirmation::Ok, token);
        }

        for message in inbound {
            let disposition = match &handler {
                Some(handler) => handler(&message[..]),
                None => {
                    debug!("[TRANSPORT] No message handler registered, abandoning");
                    Disposition::Abandoned
                }
            };
            debug!("[TRANSPORT] Loopback inbound disposition: {}", disposition);
            #[cfg(test)]
            self.state.lock().hooks.dispositions.push(disposition);
        }
    }

    fn name(&self) -> &'static str {
        "Loopback"
    }
}
