//! Solarman Error Types
//!
//! Errors are split by origin: socket-level [`ConnectionError`], frame-level
//! [`ProtocolError`], and the [`SolarmanError`] umbrella returned by
//! register reads.

use std::fmt;
use thiserror::Error;

/// Result type for solarman operations
pub type Result<T> = std::result::Result<T, SolarmanError>;

/// Classification of a Modbus exception code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExceptionKind {
    IllegalFunction,
    IllegalDataAddress,
    IllegalDataValue,
    SlaveDeviceFailure,
    Unknown,
}

impl ExceptionKind {
    pub fn from_code(code: u8) -> Self {
        match code {
            0x01 => ExceptionKind::IllegalFunction,
            0x02 => ExceptionKind::IllegalDataAddress,
            0x03 => ExceptionKind::IllegalDataValue,
            0x04 => ExceptionKind::SlaveDeviceFailure,
            _ => ExceptionKind::Unknown,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            ExceptionKind::IllegalFunction => "Illegal Function",
            ExceptionKind::IllegalDataAddress => "Illegal Data Address",
            ExceptionKind::IllegalDataValue => "Illegal Data Value",
            ExceptionKind::SlaveDeviceFailure => "Slave Device Failure",
            ExceptionKind::Unknown => "Unknown Exception",
        }
    }
}

impl fmt::Display for ExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Frame-level errors raised while building or validating frames
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("No response frame")]
    NoResponse,

    #[error("Response frame too short: expected at least {expected} bytes, got {actual}")]
    FrameTooShort { expected: usize, actual: usize },

    #[error("Invalid start byte: expected 0x{expected:02X}, got 0x{actual:02X}")]
    InvalidStartByte { expected: u8, actual: u8 },

    #[error("Invalid end byte: expected 0x{expected:02X}, got 0x{actual:02X}")]
    InvalidEndByte { expected: u8, actual: u8 },

    #[error("CRC mismatch: expected 0x{expected:04X}, got 0x{actual:04X}")]
    CrcMismatch { expected: u16, actual: u16 },

    #[error("Envelope checksum mismatch: expected 0x{expected:02X}, got 0x{actual:02X}")]
    ChecksumMismatch { expected: u8, actual: u8 },

    #[error("Modbus exception 0x{code:02X} ({kind}), check the requested register range")]
    ModbusException { code: u8, kind: ExceptionKind },

    #[error(
        "Logger serial mismatch: configured {expected}, response carries {actual}; \
         check the configured logger serial number"
    )]
    SerialMismatch { expected: u32, actual: u32 },

    #[error("Invalid register range: last register 0x{last:04X} precedes first 0x{first:04X}")]
    InvalidRange { first: u16, last: u16 },

    #[error("Too many registers requested: {count} (max {max})")]
    TooManyRegisters { count: usize, max: usize },
}

impl ProtocolError {
    pub fn exception(code: u8) -> Self {
        ProtocolError::ModbusException {
            code,
            kind: ExceptionKind::from_code(code),
        }
    }
}

/// Socket-level errors raised by the connector
#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Connection to {endpoint} timed out after {timeout_ms}ms")]
    ConnectTimeout { endpoint: String, timeout_ms: u128 },

    #[error("Not connected to {0}")]
    NotConnected(String),

    #[error("Failed to send request to {endpoint}: {source}")]
    Write {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read response from {endpoint}: {source}")]
    Read {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },

    #[error("No response from {endpoint} after {attempts} read attempts")]
    NoData { endpoint: String, attempts: u32 },
}

/// Errors returned by register reads
#[derive(Debug, Error)]
pub enum SolarmanError {
    #[error("Connection error: {0}")]
    Connection(#[from] ConnectionError),

    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SolarmanError {
    pub fn config(msg: impl Into<String>) -> Self {
        SolarmanError::Config(msg.into())
    }

    /// Whether the failure may clear on the next poll cycle
    pub fn is_transient(&self) -> bool {
        match self {
            SolarmanError::Connection(_) => true,
            SolarmanError::Protocol(ProtocolError::SerialMismatch { .. }) => false,
            SolarmanError::Protocol(ProtocolError::InvalidRange { .. })
            | SolarmanError::Protocol(ProtocolError::TooManyRegisters { .. }) => false,
            SolarmanError::Protocol(_) => true,
            SolarmanError::Config(_) => false,
        }
    }

    /// Whether the operator has to fix the configuration
    pub fn is_configuration_issue(&self) -> bool {
        matches!(
            self,
            SolarmanError::Config(_)
                | SolarmanError::Protocol(ProtocolError::SerialMismatch { .. })
                | SolarmanError::Protocol(ProtocolError::InvalidRange { .. })
                | SolarmanError::Protocol(ProtocolError::TooManyRegisters { .. })
        )
    }

    /// Check if this error indicates the socket should be reopened
    pub fn needs_reconnect(&self) -> bool {
        matches!(self, SolarmanError::Connection(_))
    }
}
