//! One-shot device-info announcement
//!
//! The announcement moves `NotSent -> Sent` only once the transport has
//! accepted the payload. Encode or submit failures leave it `NotSent` so the
//! next cycle tries again. `Sent` is terminal.

use crate::transport::{AckCallback, CorrelationToken, Transport};
use stream_station_shared::{encode_announcement, WaterSensorRecord};
use tracing::{error, info};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnouncementState {
    NotSent,
    Sent,
}

/// Result of one announcement attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnnounceOutcome {
    /// Handed to the transport under this token
    Sent(CorrelationToken),
    /// Nothing to do; announced in an earlier cycle
    AlreadySent,
    EncodeFailed,
    SubmitFailed,
}

#[derive(Debug)]
pub struct AnnouncementController {
    state: AnnouncementState,
}

impl Default for AnnouncementController {
    fn default() -> Self {
        Self::new()
    }
}

impl AnnouncementController {
    pub fn new() -> Self {
        Self {
            state: AnnouncementState::NotSent,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> AnnouncementState {
        self.state
    }

    pub fn is_sent(&self) -> bool {
        self.state == AnnouncementState::Sent
    }

    /// Encode and submit the announcement unless it already went out
    pub async fn try_announce<T: Transport + ?Sized>(
        &mut self,
        record: &WaterSensorRecord,
        transport: &T,
        ack: AckCallback,
        token: CorrelationToken,
    ) -> AnnounceOutcome {
        if self.is_sent() {
            return AnnounceOutcome::AlreadySent;
        }

        let payload = match encode_announcement(record) {
            Ok(payload) => payload,
            Err(e) => {
                error!("[ANNOUNCE] Failed to serialize device info: {}", e);
                return AnnounceOutcome::EncodeFailed;
            }
        };

        match transport.submit(payload, ack, token).await {
            Ok(()) => {
                info!(
                    "[ANNOUNCE] {} accepted device info for delivery (id={})",
                    transport.name(),
                    token
                );
                self.state = AnnouncementState::Sent;
                AnnounceOutcome::Sent(token)
            }
            Err(e) => {
                error!("[ANNOUNCE] Failed to hand over device info: {}", e);
                AnnounceOutcome::SubmitFailed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::{ack, LoopbackTransport};
    use stream_station_shared::DeviceProperties;

    fn record(identifier: &str) -> WaterSensorRecord {
        let props = DeviceProperties {
            identifier: identifier.into(),
            hub_enabled: true,
            state: "normal".into(),
            manufacturer: "SparkFun".into(),
            model_number: "Thing Dev".into(),
            firmware_version: "2.1.1".into(),
            latitude: 0,
            longitude: 0,
        };
        WaterSensorRecord::new(props, "1.0", false, None)
    }

    #[test]
    fn test_initial_state() {
        let controller = AnnouncementController::new();
        assert_eq!(controller.state(), AnnouncementState::NotSent);
    }

    #[tokio::test]
    async fn test_sent_after_successful_submit() {
        let transport = LoopbackTransport::new();
        let mut controller = AnnouncementController::new();

        let outcome = controller
            .try_announce(&record("lyons_creek_1"), &transport, ack::sink(), 1)
            .await;
        assert_eq!(outcome, AnnounceOutcome::Sent(1));
        assert!(controller.is_sent());
        assert_eq!(transport.sent().len(), 1);
    }

    #[tokio::test]
    async fn test_submit_failure_retries_next_cycle() {
        let transport = LoopbackTransport::new();
        transport.fail_next_submits(1);
        let mut controller = AnnouncementController::new();
        let record = record("lyons_creek_1");

        let outcome = controller
            .try_announce(&record, &transport, ack::sink(), 1)
            .await;
        assert_eq!(outcome, AnnounceOutcome::SubmitFailed);
        assert_eq!(controller.state(), AnnouncementState::NotSent);

        let outcome = controller
            .try_announce(&record, &transport, ack::sink(), 2)
            .await;
        assert_eq!(outcome, AnnounceOutcome::Sent(2));
        assert_eq!(controller.state(), AnnouncementState::Sent);
    }

    #[tokio::test]
    async fn test_encode_failure_does_not_advance() {
        let transport = LoopbackTransport::new();
        let mut controller = AnnouncementController::new();

        let outcome = controller
            .try_announce(&record(""), &transport, ack::sink(), 1)
            .await;
        assert_eq!(outcome, AnnounceOutcome::EncodeFailed);
        assert_eq!(controller.state(), AnnouncementState::NotSent);
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn test_never_announces_twice() {
        let transport = LoopbackTransport::new();
        let mut controller = AnnouncementController::new();
        let record = record("lyons_creek_1");

        controller
            .try_announce(&record, &transport, ack::sink(), 1)
            .await;
        for token in 2..5 {
            let outcome = controller
                .try_announce(&record, &transport, ack::sink(), token)
                .await;
            assert_eq!(outcome, AnnounceOutcome::AlreadySent);
        }
        assert_eq!(transport.sent().len(), 1);
    }
}
