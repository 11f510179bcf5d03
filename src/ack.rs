use std::{
    thread,
    time::{Duration, Instant},
};

use crate::{checksum::ubx_checksum, error::GpsError, transport::Transport, ubx::SYNC};

/// Acknowledgment class
pub const CLASS_ACK: u8 = 0x05;
/// UBX-ACK-ACK id
pub const ACK_ACK: u8 = 0x01;
/// UBX-ACK-NAK id
pub const ACK_NAK: u8 = 0x00;

const ACK_MARKER: [u8; 3] = [SYNC[0], SYNC[1], CLASS_ACK];
// sync, class, id, length, clsID, msgID, checksum
const ACK_FRAME_LEN: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Reply to one command send
pub enum AckOutcome {
    /// UBX-ACK-ACK received
    Acknowledged,
    /// UBX-ACK-NAK received
    NegativeAcknowledged,
    /// Nothing recognizable before the deadline
    Unknown,
}

impl AckOutcome {
    /// Whether the receiver accepted the command
    pub fn is_ack(&self) -> bool {
        matches!(self, AckOutcome::Acknowledged)
    }
}

#[derive(Debug, Clone, Copy)]
/// Scans inbound bytes for an ACK/NAK after a command was written.
pub struct AckWaiter {
    timeout: Duration,
    poll_interval: Duration,
}

impl Default for AckWaiter {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_millis(10))
    }
}

impl AckWaiter {
    /// Waiter with a deadline and a pause between empty polls
    pub fn new(timeout: Duration, poll_interval: Duration) -> Self {
        Self {
            timeout,
            poll_interval,
        }
    }

    /// Deadline of one wait
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Poll the transport until the ACK or NAK for `class`/`id` shows up or
    /// the deadline passes.
    ///
    /// Bytes read here belong to this call only; NMEA text mixed into them is
    /// not handed to the sentence buffer. Replies naming another command are
    /// skipped.
    pub fn wait<T: Transport + ?Sized>(
        &self,
        transport: &mut T,
        class: u8,
        id: u8,
    ) -> Result<AckOutcome, GpsError> {
        let start = Instant::now();
        let mut scratch = Vec::new();
        while start.elapsed() < self.timeout {
            let data = transport.read_available()?;
            if data.is_empty() {
                thread::sleep(self.poll_interval);
                continue;
            }
            scratch.extend_from_slice(&data);
            if let Some(outcome) = scan(&mut scratch, class, id) {
                return Ok(outcome);
            }
        }
        Ok(AckOutcome::Unknown)
    }
}

/// Look for an acknowledgment of `class`/`id`, dropping bytes that cannot be
/// part of one.
fn scan(scratch: &mut Vec<u8>, class: u8, id: u8) -> Option<AckOutcome> {
    loop {
        let Some(pos) = scratch
            .windows(ACK_MARKER.len())
            .position(|w| w == ACK_MARKER)
        else {
            // keep a possible partial marker at the tail
            let keep = scratch.len().min(ACK_MARKER.len() - 1);
            scratch.drain(..scratch.len() - keep);
            return None;
        };
        scratch.drain(..pos);
        if scratch.len() < ACK_FRAME_LEN {
            return None;
        }
        let mut frame = [0; ACK_FRAME_LEN];
        frame.copy_from_slice(&scratch[..ACK_FRAME_LEN]);
        let outcome = match frame[3] {
            ACK_ACK => AckOutcome::Acknowledged,
            ACK_NAK => AckOutcome::NegativeAcknowledged,
            _ => {
                scratch.drain(..ACK_MARKER.len());
                continue;
            }
        };
        if ubx_checksum(&frame[2..8]) != (frame[8], frame[9]) {
            log::debug!("Dropping acknowledgment with bad checksum");
            scratch.drain(..ACK_MARKER.len());
            continue;
        }
        if (frame[6], frame[7]) == (class, id) {
            return Some(outcome);
        }
        log::debug!(
            "Skipping {outcome:?} for {:02X}-{:02X}, waiting on {class:02X}-{id:02X}",
            frame[6],
            frame[7]
        );
        scratch.drain(..ACK_FRAME_LEN);
    }
}
