//! Error types for the range sensor.

use std::time::Duration;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Range sensor error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Serial port error
    #[cfg(feature = "serial")]
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// No complete response arrived before the deadline
    #[error("Timed out after {0:?} waiting for the sensor")]
    Timeout(Duration),

    /// A command packet's trailing XOR does not match its contents
    #[error("Checksum error: expected {expected:#04x}, got {actual:#04x}")]
    ChecksumMismatch {
        /// Checksum computed over the packet
        expected: u8,
        /// Checksum carried by the packet
        actual: u8,
    },

    /// Bytes that cannot be a valid packet or record
    #[error("Invalid data: {0}")]
    InvalidData(&'static str),

    /// Measurements were requested before a scan was started
    #[error("Scan stream is not open")]
    NotOpen,

    /// A well-formed response of the wrong type or size
    #[error("Unexpected response: type {kind:#04x}, {size} bytes")]
    UnexpectedResponse {
        /// Response type byte received
        kind: u8,
        /// Payload size received
        size: u32,
    },
}
