//! Station runtime - one announcement, then telemetry every cycle

use super::announcement::{AnnounceOutcome, AnnouncementController};
use crate::command::{CommandAdapter, CommandRegistry};
use crate::transport::{ack, CorrelationToken, SendStatus, Transport};
use bytes::Bytes;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use stream_station_shared::{encode_telemetry, DeviceFlags, SensorReading, WaterSensorRecord};
use tracing::{debug, error, info};

/// What happened during one sampling cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CycleReport {
    pub announcement: AnnounceOutcome,
    /// Token of the telemetry message, if it was handed to the transport
    pub telemetry: Option<CorrelationToken>,
}

pub struct Station<T: Transport> {
    record: WaterSensorRecord,
    flags: Arc<DeviceFlags>,
    announcement: AnnouncementController,
    transport: Arc<T>,
    next_token: AtomicU64,
    drain_poll: Duration,
}

impl<T: Transport> Station<T> {
    /// Create the station and register the command adapter with the transport
    pub fn new(
        record: WaterSensorRecord,
        flags: Arc<DeviceFlags>,
        registry: Arc<CommandRegistry>,
        transport: Arc<T>,
        drain_poll: Duration,
    ) -> Self {
        let adapter = CommandAdapter::new(record.device_id(), registry, flags.clone());
        transport.on_message(adapter.into_handler());

        Self {
            record,
            flags,
            announcement: AnnouncementController::new(),
            transport,
            next_token: AtomicU64::new(0),
            drain_poll,
        }
    }

    pub fn record(&self) -> &WaterSensorRecord {
        &self.record
    }

    pub fn announcement(&self) -> &AnnouncementController {
        &self.announcement
    }

    fn next_token(&self) -> CorrelationToken {
        self.next_token.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Run one sampling cycle. Failures are logged and never propagate.
    pub async fn run_cycle(&mut self, reading: &SensorReading) -> CycleReport {
        let token = self.next_token();
        let announcement = self
            .announcement
            .try_announce(&self.record, self.transport.as_ref(), ack::sink(), token)
            .await;

        self.record.apply(reading);
        let telemetry = self.send_telemetry().await;

        self.drain().await;

        CycleReport {
            announcement,
            telemetry,
        }
    }

    async fn send_telemetry(&self) -> Option<CorrelationToken> {
        let air_temp_enabled = self.flags.air_temp_enabled();
        let payload: Bytes = match encode_telemetry(&self.record, air_temp_enabled) {
            Ok(payload) => payload,
            Err(e) => {
                error!("[TELEMETRY] Failed to serialize: {}", e);
                return None;
            }
        };

        let token = self.next_token();
        match self.transport.submit(payload, ack::sink(), token).await {
            Ok(()) => {
                info!(
                    "[TELEMETRY] {} accepted the message for delivery (id={}, air={})",
                    self.transport.name(),
                    token,
                    air_temp_enabled
                );
                Some(token)
            }
            Err(e) => {
                error!("[TELEMETRY] Failed to hand over the message: {}", e);
                None
            }
        }
    }

    /// Pump the transport until its send queue has drained
    async fn drain(&self) {
        while self.transport.send_status() == SendStatus::Busy {
            self.transport.do_work().await;
            tokio::time::sleep(self.drain_poll).await;
        }
        debug!("[TELEMETRY] {} send queue drained", self.transport.name());
    }
}
