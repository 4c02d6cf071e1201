//! Solarman data-logger protocol client
//!
//! Reads Modbus holding/input registers from solar inverters through a
//! Solarman Wi-Fi/LAN logging stick. Two framings are supported:
//!
//! - **V5**: the vendor envelope bound to the logger serial number
//! - **Raw**: the Modbus request behind a fixed length-prefix header
//!
//! ```text
//! LoggerConfig ──> LoggerProtocol::from_config ──┐
//!              └─> ConnectionParams ──> LoggerConnection
//!                                                │
//!            read_registers(fc, first, last) ────┴──> RegisterMap
//! ```

pub mod config;
pub mod connection;
pub mod constants;
pub mod crc;
pub mod error;
pub mod protocol;
pub mod request;

pub use config::LoggerConfig;
pub use connection::{ConnectionParams, LoggerConnection};
pub use crc::crc16;
pub use error::{ConnectionError, ExceptionKind, ProtocolError, Result, SolarmanError};
pub use protocol::{LoggerMode, LoggerProtocol, RawProtocol, RegisterMap, V5Protocol};
pub use request::{parse_requests, RegisterRange, RegisterRequest};
