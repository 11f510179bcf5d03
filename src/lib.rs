#![warn(missing_docs)]
//! # NEO GPS
//! Driver for u-blox NEO-M8 class receivers on a serial link.
//!
//! Reads NMEA GLL, RMC, GGA and GSA sentences into position, velocity and
//! altitude readings with error estimates, and configures the receiver with
//! acknowledged UBX-CFG commands.
mod ack;
mod buffer;
mod checksum;
mod config;
mod error;
mod nmea;
mod session;
mod transport;
pub mod ubx;
mod uncertain;

pub use ack::{AckOutcome, AckWaiter};
pub use buffer::{RawRecord, SentenceBuffer, DEFAULT_CAPACITY};
pub use checksum::{nmea_checksum_valid, ubx_checksum};
pub use config::{
    ErrorModel, SessionConfig, CONFIDENCE_SCALE_3D, HORIZONTAL_ACCURACY_M, VERTICAL_ACCURACY_M,
};
pub use error::{DecodeError, GpsError};
pub use nmea::{Altitude, Fix, Position, Sentence, SentenceCache, SentenceKind, TimeOfDay, Velocity};
pub use session::{ModuleSetup, ReceiverSession, RetryPolicy, SetupOutcome, SetupStep, MAX_RATE_HZ};
pub use transport::{SerialTransport, Transport, DEFAULT_BAUD_RATE};
pub use ubx::{CommandPacket, UbxCommand};
pub use uncertain::Uncertain;
