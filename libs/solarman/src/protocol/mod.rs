//! Logger protocol variants
//!
//! Two incompatible wire formats carry the same capability: read a contiguous
//! register range. The variant is chosen once per logger and never changes for
//! the lifetime of a connection.
//!
//! ```text
//! LoggerProtocol
//!     ├── V5   (vendor envelope bound to the logger serial number)
//!     └── Raw  (length-prefixed Modbus sub-frame)
//! ```

pub mod raw;
pub mod registers;
pub mod v5;

use crate::config::LoggerConfig;
use crate::connection::LoggerConnection;
use crate::error::{ProtocolError, Result, SolarmanError};
use crate::request::{RegisterRange, RegisterRequest};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, warn};

pub use raw::RawProtocol;
pub use registers::RegisterMap;
pub use v5::V5Protocol;

/// Framing mode of a logger
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggerMode {
    #[default]
    #[serde(alias = "V5")]
    V5,
    #[serde(alias = "RAW")]
    Raw,
}

impl fmt::Display for LoggerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoggerMode::V5 => f.write_str("v5"),
            LoggerMode::Raw => f.write_str("raw"),
        }
    }
}

impl FromStr for LoggerMode {
    type Err = SolarmanError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "v5" => Ok(LoggerMode::V5),
            "raw" => Ok(LoggerMode::Raw),
            other => Err(SolarmanError::config(format!(
                "Unknown logger mode '{other}', expected 'v5' or 'raw'"
            ))),
        }
    }
}

/// Protocol codec selected for one logger
#[derive(Debug, Clone)]
pub enum LoggerProtocol {
    V5(V5Protocol),
    Raw(RawProtocol),
}

impl LoggerProtocol {
    pub fn v5(serial: u32) -> Self {
        LoggerProtocol::V5(V5Protocol::new(serial))
    }

    pub fn raw() -> Self {
        LoggerProtocol::Raw(RawProtocol::new())
    }

    /// Select the codec for a configured logger
    pub fn from_config(config: &LoggerConfig) -> Result<Self> {
        match config.mode {
            LoggerMode::V5 => {
                let serial = config.serial_number.ok_or_else(|| {
                    SolarmanError::config("V5 mode requires the logger serial number")
                })?;
                Ok(Self::v5(serial))
            },
            LoggerMode::Raw => Ok(Self::raw()),
        }
    }

    pub fn mode(&self) -> LoggerMode {
        match self {
            LoggerProtocol::V5(_) => LoggerMode::V5,
            LoggerProtocol::Raw(_) => LoggerMode::Raw,
        }
    }

    pub fn build_request(&self, function_code: u8, range: RegisterRange) -> Vec<u8> {
        match self {
            LoggerProtocol::V5(protocol) => protocol.build_request(function_code, range),
            LoggerProtocol::Raw(protocol) => protocol.build_request(function_code, range),
        }
    }

    /// Validate a response against the request that produced it
    pub fn parse_response(
        &self,
        response: &[u8],
        request: &[u8],
        range: RegisterRange,
    ) -> std::result::Result<RegisterMap, ProtocolError> {
        match self {
            LoggerProtocol::V5(protocol) => protocol.parse_response(response, request, range),
            LoggerProtocol::Raw(protocol) => protocol.parse_response(response, range),
        }
    }

    /// Read `first..=last` with one request/response exchange
    ///
    /// The range is validated before any network I/O.
    pub async fn read_registers(
        &self,
        connection: &mut LoggerConnection,
        function_code: u8,
        first: u16,
        last: u16,
    ) -> Result<RegisterMap> {
        let range = RegisterRange::new(first, last)?;
        self.read_request(connection, RegisterRequest::new(function_code, range))
            .await
    }

    /// Execute one validated request
    pub async fn read_request(
        &self,
        connection: &mut LoggerConnection,
        request: RegisterRequest,
    ) -> Result<RegisterMap> {
        let frame = self.build_request(request.function_code, request.range);
        let response = connection.send_request(&frame).await?;

        self.parse_response(&response, &frame, request.range)
            .map_err(|e| {
                warn!("{} read {} failed: {}", self.mode(), request, e);
                SolarmanError::from(e)
            })
    }

    /// Run every request in order on one connection and merge the results
    ///
    /// The first failure aborts the cycle.
    pub async fn read_all(
        &self,
        connection: &mut LoggerConnection,
        requests: &[RegisterRequest],
    ) -> Result<RegisterMap> {
        let mut registers = RegisterMap::new();
        for request in requests {
            let map = self.read_request(connection, *request).await?;
            debug!("{}: {} registers", request, map.len());
            registers.merge(map);
        }
        Ok(registers)
    }
}
