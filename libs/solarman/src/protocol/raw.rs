//! Raw framing: the Modbus sub-frame behind a thin length-prefix header
//!
//! ```text
//! Request:  [TID 0x03E8(2)][Proto 0x0000(2)][Len(2)][Modbus request + CRC(8)]
//! Response: [TID(2)][Proto(2)][Len(2)][Slave(1)][FC(1)][ByteCount(1)][Data(N x 2)]...
//! ```
//!
//! Header fields are big-endian. Response data is not CRC-checked: raw-mode
//! loggers may omit the trailing CRC entirely.

use crate::constants::{
    MODBUS_REQUEST_FRAME_LEN, RAW_HEADER_LEN, RAW_MIN_RESPONSE_LEN, RAW_PROTOCOL_ID, RAW_START,
    RAW_TRANSACTION_ID,
};
use crate::error::ProtocolError;
use crate::protocol::registers::{
    build_modbus_request, parse_modbus_response_unchecked, RegisterMap,
};
use crate::request::RegisterRange;
use tracing::debug;

/// Raw codec, no per-logger state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RawProtocol;

impl RawProtocol {
    pub fn new() -> Self {
        Self
    }

    /// Build header + Modbus request frame
    pub fn build_request(&self, function_code: u8, range: RegisterRange) -> Vec<u8> {
        let payload = build_modbus_request(function_code, range);

        let mut frame = Vec::with_capacity(RAW_HEADER_LEN + MODBUS_REQUEST_FRAME_LEN);
        frame.extend_from_slice(&RAW_TRANSACTION_ID.to_be_bytes());
        frame.extend_from_slice(&RAW_PROTOCOL_ID.to_be_bytes());
        frame.extend_from_slice(&(payload.len() as u16).to_be_bytes());
        frame.extend_from_slice(&payload);

        debug!(
            "Raw request: FC={:02X}, range={}, len={}",
            function_code,
            range,
            frame.len()
        );

        frame
    }

    /// Strip the header and decode the register data
    pub fn parse_response(
        &self,
        response: &[u8],
        range: RegisterRange,
    ) -> Result<RegisterMap, ProtocolError> {
        debug!("Parsing raw response: {} bytes", response.len());

        if response.is_empty() {
            return Err(ProtocolError::NoResponse);
        }
        if response.len() < RAW_MIN_RESPONSE_LEN {
            return Err(ProtocolError::FrameTooShort {
                expected: RAW_MIN_RESPONSE_LEN,
                actual: response.len(),
            });
        }
        if response[0] != RAW_START {
            return Err(ProtocolError::InvalidStartByte {
                expected: RAW_START,
                actual: response[0],
            });
        }

        let registers = parse_modbus_response_unchecked(&response[RAW_HEADER_LEN..], range)?;
        debug!("Raw response decoded: {} registers", registers.len());
        Ok(registers)
    }
}
