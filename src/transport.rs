use serialport::SerialPort;
use std::{
    io::{Read, Write},
    time::Duration,
};

use crate::error::GpsError;

/// Byte pipe to the receiver.
///
/// Reads never block; all waiting is done by the caller's own polling.
pub trait Transport {
    /// Write all bytes
    fn write(&mut self, bytes: &[u8]) -> Result<(), GpsError>;
    /// Bytes received since the last call, possibly none
    fn read_available(&mut self) -> Result<Vec<u8>, GpsError>;
    /// Reopen the link at a new baud rate
    fn reopen(&mut self, baud_rate: u32) -> Result<(), GpsError>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn write(&mut self, bytes: &[u8]) -> Result<(), GpsError> {
        (**self).write(bytes)
    }

    fn read_available(&mut self) -> Result<Vec<u8>, GpsError> {
        (**self).read_available()
    }

    fn reopen(&mut self, baud_rate: u32) -> Result<(), GpsError> {
        (**self).reopen(baud_rate)
    }
}

/// Factory setting of NEO-M8 UART1
pub const DEFAULT_BAUD_RATE: u32 = 9600;

/// A serial TTY opened through `serialport`
pub struct SerialTransport {
    path: String,
    port: Box<dyn SerialPort>,
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("path", &self.path)
            .field("baud_rate", &self.port.baud_rate().ok())
            .finish()
    }
}

impl SerialTransport {
    /// Open `path` at `baud_rate`
    pub fn open(path: &str, baud_rate: u32, timeout: Duration) -> Result<Self, GpsError> {
        let port = serialport::new(path, baud_rate).timeout(timeout).open()?;
        log::info!("Opened {path} at {baud_rate} baud");
        Ok(Self {
            path: path.to_string(),
            port,
        })
    }

    /// Device path
    pub fn path(&self) -> &str {
        &self.path
    }
}

impl Transport for SerialTransport {
    fn write(&mut self, bytes: &[u8]) -> Result<(), GpsError> {
        self.port.write_all(bytes)?;
        self.port.flush()?;
        Ok(())
    }

    fn read_available(&mut self) -> Result<Vec<u8>, GpsError> {
        let n = self.port.bytes_to_read()? as usize;
        if n == 0 {
            return Ok(Vec::new());
        }
        let mut buf = vec![0; n];
        let n = self.port.read(&mut buf)?;
        buf.truncate(n);
        Ok(buf)
    }

    fn reopen(&mut self, baud_rate: u32) -> Result<(), GpsError> {
        // the port is opened exclusively, so switch the open handle in place
        self.port.set_baud_rate(baud_rate)?;
        self.port.clear(serialport::ClearBuffer::Input)?;
        log::info!("Switched {} to {baud_rate} baud", self.path);
        Ok(())
    }
}

#[cfg(test)]
pub(crate) use mock::{ack_frame, MockTransport};
