//! Embedded Modbus sub-frame handling shared by both framing variants
//!
//! Request sub-frame: `[Slave(1)][FC(1)][First(2, BE)][Count(2, BE)][CRC(2, LE)]`
//! Response sub-frame: `[Slave(1)][FC(1)][ByteCount(1)][Data(N x 2)][CRC(2, LE)]`

use crate::constants::{
    MODBUS_DATA_OFFSET, MODBUS_REQUEST_FRAME_LEN, MODBUS_REQUEST_LEN, MODBUS_SLAVE_ID,
};
use crate::crc::crc16;
use crate::error::ProtocolError;
use crate::request::RegisterRange;
use std::collections::btree_map::{self, BTreeMap};

/// Decoded register words keyed by register address
///
/// Values are the two raw bytes as received (big-endian word order).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RegisterMap {
    registers: BTreeMap<u16, [u8; 2]>,
}

impl RegisterMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, address: u16, value: [u8; 2]) {
        self.registers.insert(address, value);
    }

    pub fn get(&self, address: u16) -> Option<[u8; 2]> {
        self.registers.get(&address).copied()
    }

    /// Register value interpreted as an unsigned big-endian word
    pub fn word(&self, address: u16) -> Option<u16> {
        self.get(address).map(u16::from_be_bytes)
    }

    pub fn contains(&self, address: u16) -> bool {
        self.registers.contains_key(&address)
    }

    pub fn len(&self) -> usize {
        self.registers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }

    /// Iterate in ascending address order
    pub fn iter(&self) -> impl Iterator<Item = (u16, [u8; 2])> + '_ {
        self.registers.iter().map(|(&addr, &value)| (addr, value))
    }

    /// Merge another map into this one; later values win on overlap
    pub fn merge(&mut self, other: RegisterMap) {
        self.registers.extend(other.registers);
    }
}

impl IntoIterator for RegisterMap {
    type Item = (u16, [u8; 2]);
    type IntoIter = btree_map::IntoIter<u16, [u8; 2]>;

    fn into_iter(self) -> Self::IntoIter {
        self.registers.into_iter()
    }
}

impl FromIterator<(u16, [u8; 2])> for RegisterMap {
    fn from_iter<I: IntoIterator<Item = (u16, [u8; 2])>>(iter: I) -> Self {
        Self {
            registers: iter.into_iter().collect(),
        }
    }
}

/// Build the 8-byte Modbus read request, CRC appended little-endian
pub fn build_modbus_request(
    function_code: u8,
    range: RegisterRange,
) -> [u8; MODBUS_REQUEST_FRAME_LEN] {
    let mut frame = [0u8; MODBUS_REQUEST_FRAME_LEN];
    frame[0] = MODBUS_SLAVE_ID;
    frame[1] = function_code;
    frame[2..4].copy_from_slice(&range.first().to_be_bytes());
    frame[4..6].copy_from_slice(&range.count().to_be_bytes());

    let crc = crc16(&frame[..MODBUS_REQUEST_LEN]);
    frame[MODBUS_REQUEST_LEN..].copy_from_slice(&crc.to_le_bytes());
    frame
}

/// Echo + byte count + register data, CRC excluded
pub fn expected_data_len(range: RegisterRange) -> usize {
    MODBUS_DATA_OFFSET + 2 * usize::from(range.count())
}

/// Validate a CRC-protected Modbus response and decode its registers
pub fn parse_modbus_response(
    frame: &[u8],
    range: RegisterRange,
) -> Result<RegisterMap, ProtocolError> {
    let data_len = expected_data_len(range);
    if frame.len() < data_len + 2 {
        return Err(ProtocolError::FrameTooShort {
            expected: data_len + 2,
            actual: frame.len(),
        });
    }

    let received_crc = u16::from_le_bytes([frame[data_len], frame[data_len + 1]]);
    let calculated_crc = crc16(&frame[..data_len]);
    if received_crc != calculated_crc {
        return Err(ProtocolError::CrcMismatch {
            expected: calculated_crc,
            actual: received_crc,
        });
    }

    Ok(decode_registers(frame, range))
}

/// Decode registers without CRC verification
pub fn parse_modbus_response_unchecked(
    frame: &[u8],
    range: RegisterRange,
) -> Result<RegisterMap, ProtocolError> {
    let data_len = expected_data_len(range);
    if frame.len() < data_len {
        return Err(ProtocolError::FrameTooShort {
            expected: data_len,
            actual: frame.len(),
        });
    }

    Ok(decode_registers(frame, range))
}

// Caller guarantees frame.len() >= expected_data_len(range)
fn decode_registers(frame: &[u8], range: RegisterRange) -> RegisterMap {
    range
        .addresses()
        .enumerate()
        .map(|(i, address)| {
            let offset = MODBUS_DATA_OFFSET + 2 * i;
            (address, [frame[offset], frame[offset + 1]])
        })
        .collect()
}
