use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::buffer::DEFAULT_CAPACITY;

/// Datasheet 1-sigma horizontal accuracy of the receiver, in meters
pub const HORIZONTAL_ACCURACY_M: f64 = 2.5;
/// 1-sigma vertical accuracy, in meters. Some receiver revisions are closer to 5.0.
pub const VERTICAL_ACCURACY_M: f64 = 2.5;
/// Scale from a combined 1-sigma 3D error to roughly 95 % confidence
pub const CONFIDENCE_SCALE_3D: f64 = 2.45;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
/// Calibration constants turning dilution of precision into meters.
pub struct ErrorModel {
    /// Multiplier applied to HDOP
    pub horizontal_accuracy: f64,
    /// Multiplier applied to VDOP
    pub vertical_accuracy: f64,
    /// Multiplier applied to the quadrature sum of both errors
    pub confidence_scale: f64,
}

impl Default for ErrorModel {
    fn default() -> Self {
        Self {
            horizontal_accuracy: HORIZONTAL_ACCURACY_M,
            vertical_accuracy: VERTICAL_ACCURACY_M,
            confidence_scale: CONFIDENCE_SCALE_3D,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
/// Tunables of a [`ReceiverSession`](crate::ReceiverSession)
pub struct SessionConfig {
    /// Sliding window size for NMEA bytes
    pub buffer_capacity: usize,
    /// Valid records to collect per refresh
    pub sentences_per_update: usize,
    /// Give up a refresh after this many milliseconds
    pub read_timeout_ms: u64,
    /// Wait this long for an ACK/NAK after each command
    pub ack_timeout_ms: u64,
    /// Sleep between empty transport polls
    pub poll_interval_ms: u64,
    /// Send attempts per configuration command
    pub max_attempts: u32,
    /// Delay between two attempts of the same command
    pub backoff_ms: u64,
    /// DOP to meters conversion
    pub error_model: ErrorModel,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: DEFAULT_CAPACITY,
            sentences_per_update: 5,
            read_timeout_ms: 1000,
            ack_timeout_ms: 1000,
            poll_interval_ms: 10,
            max_attempts: 5,
            backoff_ms: 500,
            error_model: ErrorModel::default(),
        }
    }
}

impl SessionConfig {
    /// Deadline for one refresh of the sentence cache
    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Deadline for one acknowledgment wait
    pub fn ack_timeout(&self) -> Duration {
        Duration::from_millis(self.ack_timeout_ms)
    }

    /// Pause between polls that returned no bytes
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Pause between retries
    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}
