use thiserror::Error;

#[derive(Error, Debug)]
/// Errors surfaced by the receiver driver
pub enum GpsError {
    /// Serial port could not be opened or configured
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),
    /// Read or write on the transport failed
    #[error("Transport I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Output rate outside of what the receiver accepts
    #[error("Invalid output rate {0} Hz, must be in (0, 10]")]
    InvalidRate(f64),
    /// A field did not match its expected pattern
    #[error("Pattern not found")]
    PatternNotFound,
    /// A field matched but could not be converted
    #[error("Failed to parse {0}")]
    ParseError(String),
}

#[derive(Error, Clone, Debug, PartialEq, Eq)]
/// Reasons a framed record is dropped instead of cached
pub enum DecodeError {
    /// XOR checksum did not match the trailer
    #[error("Checksum mismatch")]
    ChecksumMismatch,
    /// Record bytes are not valid UTF-8
    #[error("Record is not valid text: {0}")]
    TextDecode(#[from] std::str::Utf8Error),
    /// Record too short to carry an address field
    #[error("Record truncated")]
    Truncated,
}
