//! Send acknowledgement sink
//!
//! Delivery confirmations are logged and nothing else: the station never
//! retries or changes state based on them.

use super::traits::{AckCallback, Confirmation, CorrelationToken};
use std::sync::Arc;
use tracing::{info, warn};

/// Log the delivery result for one submitted message
pub fn log_confirmation(result: Confirmation, token: CorrelationToken) {
    match result {
        Confirmation::Ok => info!("[ACK] Message Id: {} Received. Result: {}", token, result),
        _ => warn!("[ACK] Message Id: {} Received. Result: {}", token, result),
    }
}

/// The ack callback handed to the transport with every submit
pub fn sink() -> AckCallback {
    Arc::new(log_confirmation)
}
