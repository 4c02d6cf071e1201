//! Solarman V5 envelope
//!
//! ```text
//! Request (36 bytes):
//!   [A5][Len(2)][Control 0x4510(2)][Seq(1)][00][Serial(4)]      header, 11 bytes
//!   [02][Sensor(2)][TotalTime(4)][PowerOnTime(4)][OffsetTime(4)] payload prefix
//!   [Modbus request(8)]
//!   [Checksum(1)][15]                                            trailer
//!
//! Response:
//!   [A5][Len(2)][Control(2)][Seq(2)][Serial(4)]
//!   [FrameType(1)][Status(1)][TotalTime(4)][PowerOnTime(4)][OffsetTime(4)]
//!   [Modbus response(N)]
//!   [Checksum(1)][15]
//! ```
//!
//! Multi-byte envelope fields are little-endian; the checksum is the low byte
//! of the sum of every byte between the start marker and the checksum.

use crate::constants::{
    MODBUS_REQUEST_FRAME_LEN, V5_CONTROL_OFFSET, V5_CONTROL_REQUEST, V5_CONTROL_RESPONSE, V5_END,
    V5_ERROR_CODE_OFFSET, V5_ERROR_FRAME_LEN, V5_ERROR_PAYLOAD_LEN, V5_FRAME_TYPE, V5_HEADER_LEN,
    V5_LENGTH_OFFSET, V5_MIN_RESPONSE_LEN, V5_REQUEST_LEN, V5_REQUEST_PAYLOAD_PREFIX_LEN,
    V5_RESPONSE_MODBUS_OFFSET, V5_SENSOR_TYPE, V5_SEQUENCE_OFFSET, V5_SERIAL_OFFSET, V5_START,
    V5_TRAILER_LEN,
};
use crate::crc::envelope_checksum;
use crate::error::ProtocolError;
use crate::protocol::registers::{build_modbus_request, parse_modbus_response, RegisterMap};
use crate::request::RegisterRange;
use std::sync::atomic::{AtomicU8, Ordering};
use tracing::debug;

/// V5 codec bound to one logger serial number
#[derive(Debug)]
pub struct V5Protocol {
    serial: u32,
    sequence: AtomicU8,
}

impl Clone for V5Protocol {
    fn clone(&self) -> Self {
        Self {
            serial: self.serial,
            sequence: AtomicU8::new(self.sequence.load(Ordering::Relaxed)),
        }
    }
}

impl V5Protocol {
    pub fn new(serial: u32) -> Self {
        Self {
            serial,
            sequence: AtomicU8::new(0),
        }
    }

    pub fn serial(&self) -> u32 {
        self.serial
    }

    /// Next request sequence byte; wraps from 0xFF to 0x00
    fn next_sequence(&self) -> u8 {
        self.sequence.fetch_add(1, Ordering::Relaxed)
    }

    /// Build a complete V5 request frame
    pub fn build_request(&self, function_code: u8, range: RegisterRange) -> Vec<u8> {
        let payload_len = (V5_REQUEST_PAYLOAD_PREFIX_LEN + MODBUS_REQUEST_FRAME_LEN) as u16;
        let sequence = self.next_sequence();

        let mut frame = Vec::with_capacity(V5_REQUEST_LEN);

        // Header
        frame.push(V5_START);
        frame.extend_from_slice(&payload_len.to_le_bytes());
        frame.extend_from_slice(&V5_CONTROL_REQUEST.to_le_bytes());
        // Second sequence byte is assigned by the logger
        frame.extend_from_slice(&[sequence, 0x00]);
        frame.extend_from_slice(&self.serial.to_le_bytes());

        // Payload
        frame.push(V5_FRAME_TYPE);
        frame.extend_from_slice(&V5_SENSOR_TYPE.to_le_bytes());
        frame.extend_from_slice(&[0u8; 12]); // total working, power on, offset time
        frame.extend_from_slice(&build_modbus_request(function_code, range));

        // Trailer
        let checksum = envelope_checksum(&frame[1..]);
        frame.push(checksum);
        frame.push(V5_END);

        debug!(
            "V5 request: serial={}, seq={:02X}, FC={:02X}, range={}, checksum={:02X}",
            self.serial, sequence, function_code, range, checksum
        );

        frame
    }

    /// Validate a V5 response and decode its registers
    ///
    /// `request` is the frame that produced this response; its serial field is
    /// compared against error frames to tell a wrong serial from a bad range.
    /// A 29-byte frame is treated as an error frame only when its header
    /// declares the 16-byte error payload (see `is_error_frame_header`).
    pub fn parse_response(
        &self,
        response: &[u8],
        request: &[u8],
        range: RegisterRange,
    ) -> Result<RegisterMap, ProtocolError> {
        debug!("Parsing V5 response: {} bytes", response.len());

        if response.is_empty() {
            return Err(ProtocolError::NoResponse);
        }

        if response.len() == V5_ERROR_FRAME_LEN && is_error_frame_header(response) {
            return Err(self.classify_error_frame(response, request));
        }

        if response.len() < V5_MIN_RESPONSE_LEN {
            return Err(ProtocolError::FrameTooShort {
                expected: V5_MIN_RESPONSE_LEN,
                actual: response.len(),
            });
        }

        let last = response[response.len() - 1];
        if response[0] != V5_START {
            return Err(ProtocolError::InvalidStartByte {
                expected: V5_START,
                actual: response[0],
            });
        }
        if last != V5_END {
            return Err(ProtocolError::InvalidEndByte {
                expected: V5_END,
                actual: last,
            });
        }

        let checksum_pos = response.len() - V5_TRAILER_LEN;
        let modbus = &response[V5_RESPONSE_MODBUS_OFFSET..checksum_pos];
        let registers = parse_modbus_response(modbus, range)?;

        // Checked after the Modbus CRC so payload corruption reports as a CRC error
        let calculated = envelope_checksum(&response[1..checksum_pos]);
        if calculated != response[checksum_pos] {
            return Err(ProtocolError::ChecksumMismatch {
                expected: calculated,
                actual: response[checksum_pos],
            });
        }

        debug!("V5 response decoded: {} registers", registers.len());
        Ok(registers)
    }

    fn classify_error_frame(&self, response: &[u8], request: &[u8]) -> ProtocolError {
        let expected = read_serial(request).unwrap_or(self.serial);
        let actual = read_serial(response).unwrap_or_default();

        if expected != actual {
            debug!(
                "V5 error frame from logger {} while requesting {}",
                actual, expected
            );
            return ProtocolError::SerialMismatch { expected, actual };
        }

        let code = response[V5_ERROR_CODE_OFFSET];
        debug!("V5 error frame: exception code {:02X}", code);
        ProtocolError::exception(code)
    }
}

/// Header check for a 29-byte error frame
///
/// Requires the start marker, a request or response control code, and a
/// declared payload length of exactly 16 bytes. The length check keeps a data
/// frame cut off at 29 bytes from being read as a Modbus exception; such a
/// frame reports `FrameTooShort` instead.
fn is_error_frame_header(frame: &[u8]) -> bool {
    if frame.len() < V5_HEADER_LEN || frame[0] != V5_START {
        return false;
    }
    let length = u16::from_le_bytes([frame[V5_LENGTH_OFFSET], frame[V5_LENGTH_OFFSET + 1]]);
    let control = u16::from_le_bytes([frame[V5_CONTROL_OFFSET], frame[V5_CONTROL_OFFSET + 1]]);
    length == V5_ERROR_PAYLOAD_LEN
        && (control == V5_CONTROL_RESPONSE || control == V5_CONTROL_REQUEST)
}

/// Logger serial number embedded in a V5 header
pub fn read_serial(frame: &[u8]) -> Option<u32> {
    let bytes = frame.get(V5_SERIAL_OFFSET..V5_SERIAL_OFFSET + 4)?;
    Some(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Sequence byte of a V5 header
pub fn read_sequence(frame: &[u8]) -> Option<u8> {
    frame.get(V5_SEQUENCE_OFFSET).copied()
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;
    use crate::constants::RESPONSE_BUFFER_SIZE;
    use crate::crc::crc16;
    use crate::error::ExceptionKind;

    const SERIAL: u32 = 2_712_345_678;

    /// Build a well-formed logger response carrying `words`
    fn v5_response(serial: u32, words: &[u16]) -> Vec<u8> {
        let mut modbus = vec![0x01, 0x03, (words.len() * 2) as u8];
        for word in words {
            modbus.extend_from_slice(&word.to_be_bytes());
        }
        let crc = crc16(&modbus);
        modbus.extend_from_slice(&crc.to_le_bytes());

        let payload_len = (14 + modbus.len()) as u16;
        let mut frame = vec![V5_START];
        frame.extend_from_slice(&payload_len.to_le_bytes());
        frame.extend_from_slice(&V5_CONTROL_RESPONSE.to_le_bytes());
        frame.extend_from_slice(&[0x01, 0x07]);
        frame.extend_from_slice(&serial.to_le_bytes());
        frame.push(0x02); // frame type
        frame.push(0x01); // status
        frame.extend_from_slice(&[0u8; 12]);
        frame.extend_from_slice(&modbus);
        let checksum = envelope_checksum(&frame[1..]);
        frame.push(checksum);
        frame.push(V5_END);
        frame
    }

    fn error_frame(serial: u32, code: u8) -> Vec<u8> {
        let mut frame = vec![V5_START, 0x10, 0x00];
        frame.extend_from_slice(&V5_CONTROL_RESPONSE.to_le_bytes());
        frame.extend_from_slice(&[0x01, 0x07]);
        frame.extend_from_slice(&serial.to_le_bytes());
        frame.extend_from_slice(&[0x02, 0x01]);
        frame.extend_from_slice(&[0u8; 12]);
        frame.push(code);
        frame.push(0x00);
        let checksum = envelope_checksum(&frame[1..]);
        frame.push(checksum);
        frame.push(V5_END);
        assert_eq!(frame.len(), V5_ERROR_FRAME_LEN);
        frame
    }

    // ========================================================================
    // Request Frame Tests
    // ========================================================================

    #[test]
    fn test_build_request_layout() {
        let protocol = V5Protocol::new(0x1234_5678);
        let range = RegisterRange::new(3, 3 + 0x6E - 1).unwrap();
        let frame = protocol.build_request(0x03, range);

        assert_eq!(frame.len(), V5_REQUEST_LEN);
        assert_eq!(frame[0], 0xA5);
        assert_eq!(&frame[1..3], &[0x17, 0x00]); // payload length 23
        assert_eq!(&frame[3..5], &[0x10, 0x45]);
        assert_eq!(&frame[5..7], &[0x00, 0x00]);
        assert_eq!(&frame[7..11], &[0x78, 0x56, 0x34, 0x12]);
        assert_eq!(frame[11], 0x02);
        assert_eq!(&frame[12..26], &[0u8; 14]);
        assert_eq!(
            &frame[26..34],
            &[0x01, 0x03, 0x00, 0x03, 0x00, 0x6E, 0x34, 0x26]
        );
        assert_eq!(frame[35], 0x15);
    }

    #[test]
    fn test_build_request_checksum_property() {
        let protocol = V5Protocol::new(SERIAL);
        for (first, last) in [(0, 0), (3, 112), (0x1000, 0x107C), (0xFFFF, 0xFFFF)] {
            let frame = protocol.build_request(0x03, RegisterRange::new(first, last).unwrap());
            let sum = frame[1..frame.len() - 2]
                .iter()
                .fold(0u32, |acc, &b| acc + u32::from(b));
            assert_eq!(frame[frame.len() - 2], (sum & 0xFF) as u8);
        }
    }

    #[test]
    fn test_build_request_sequence_increments_and_wraps() {
        let protocol = V5Protocol::new(SERIAL);
        let range = RegisterRange::single(0);

        let first = protocol.build_request(0x03, range);
        let second = protocol.build_request(0x03, range);
        assert_eq!(read_sequence(&first), Some(0x00));
        assert_eq!(read_sequence(&second), Some(0x01));
        assert_eq!(second[6], 0x00);

        for _ in 2..=0xFF {
            protocol.build_request(0x03, range);
        }
        let wrapped = protocol.build_request(0x03, range);
        assert_eq!(read_sequence(&wrapped), Some(0x00));
    }

    #[test]
    fn test_read_serial() {
        let protocol = V5Protocol::new(SERIAL);
        let frame = protocol.build_request(0x03, RegisterRange::single(1));
        assert_eq!(read_serial(&frame), Some(SERIAL));
        assert_eq!(read_serial(&frame[..10]), None);
    }

    // ========================================================================
    // Response Parsing Tests
    // ========================================================================

    #[test]
    fn test_round_trip_full_range() {
        let protocol = V5Protocol::new(SERIAL);
        let range = RegisterRange::new(3, 3 + 0x6E - 1).unwrap();
        let request = protocol.build_request(0x03, range);
        let words: Vec<u16> = (0..0x6E).map(|i| i * 3).collect();
        let response = v5_response(SERIAL, &words);

        let map = protocol.parse_response(&response, &request, range).unwrap();
        assert_eq!(map.len(), 0x6E);
        for (i, address) in (3u16..3 + 0x6E).enumerate() {
            assert_eq!(map.word(address), Some(words[i]));
        }
        assert!(!map.contains(2));
        assert!(!map.contains(3 + 0x6E));
    }

    #[test]
    fn test_round_trip_max_registers() {
        let protocol = V5Protocol::new(SERIAL);
        let range = RegisterRange::new(0, 124).unwrap();
        let request = protocol.build_request(0x03, range);
        assert_eq!(request.len(), V5_REQUEST_LEN);
        assert_eq!(&request[26..32], &[0x01, 0x03, 0x00, 0x00, 0x00, 0x7D]);

        let words: Vec<u16> = (0..125).map(|i| 0xA000 | i).collect();
        let response = v5_response(SERIAL, &words);
        assert_eq!(response[V5_RESPONSE_MODBUS_OFFSET + 2], 250);
        assert_eq!(response.len(), 282);
        assert!(response.len() <= RESPONSE_BUFFER_SIZE);

        let map = protocol.parse_response(&response, &request, range).unwrap();
        assert_eq!(map.len(), 125);
        assert_eq!(map.word(0), Some(0xA000));
        assert_eq!(map.word(124), Some(0xA07C));
        assert!(!map.contains(125));
    }

    #[test]
    fn test_single_register_response() {
        let protocol = V5Protocol::new(SERIAL);
        let range = RegisterRange::single(0x0021);
        let request = protocol.build_request(0x03, range);
        let response = v5_response(SERIAL, &[0xBEEF]);
        assert_eq!(response.len(), V5_MIN_RESPONSE_LEN + 1);

        let map = protocol.parse_response(&response, &request, range).unwrap();
        assert_eq!(map.get(0x21), Some([0xBE, 0xEF]));
    }

    #[test]
    fn test_empty_response() {
        let protocol = V5Protocol::new(SERIAL);
        let range = RegisterRange::single(0);
        let request = protocol.build_request(0x03, range);
        assert_eq!(
            protocol.parse_response(&[], &request, range),
            Err(ProtocolError::NoResponse)
        );
    }

    #[test]
    fn test_truncated_responses_never_decode() {
        let protocol = V5Protocol::new(SERIAL);
        let range = RegisterRange::new(0, 9).unwrap();
        let request = protocol.build_request(0x03, range);
        let response = v5_response(SERIAL, &[7; 10]);

        assert_eq!(
            protocol.parse_response(&response[..0], &request, range),
            Err(ProtocolError::NoResponse)
        );
        for len in 1..V5_MIN_RESPONSE_LEN {
            let result = protocol.parse_response(&response[..len], &request, range);
            assert_eq!(
                result,
                Err(ProtocolError::FrameTooShort {
                    expected: V5_MIN_RESPONSE_LEN,
                    actual: len
                }),
                "length {len}"
            );
        }
        // Past the minimum the truncation eats the end marker or the Modbus data
        for len in V5_MIN_RESPONSE_LEN..response.len() {
            assert!(protocol.parse_response(&response[..len], &request, range).is_err());
        }
    }

    #[test]
    fn test_invalid_start_and_end_bytes() {
        let protocol = V5Protocol::new(SERIAL);
        let range = RegisterRange::new(0, 4).unwrap();
        let request = protocol.build_request(0x03, range);
        let response = v5_response(SERIAL, &[1, 2, 3, 4, 5]);

        let mut bad_start = response.clone();
        bad_start[0] = 0xA4;
        assert_eq!(
            protocol.parse_response(&bad_start, &request, range),
            Err(ProtocolError::InvalidStartByte {
                expected: 0xA5,
                actual: 0xA4
            })
        );

        let mut bad_end = response.clone();
        let last = bad_end.len() - 1;
        bad_end[last] = 0x16;
        assert_eq!(
            protocol.parse_response(&bad_end, &request, range),
            Err(ProtocolError::InvalidEndByte {
                expected: 0x15,
                actual: 0x16
            })
        );
    }

    #[test]
    fn test_corrupted_modbus_bytes_report_crc_mismatch() {
        let protocol = V5Protocol::new(SERIAL);
        let range = RegisterRange::new(0x10, 0x14).unwrap();
        let request = protocol.build_request(0x03, range);
        let response = v5_response(SERIAL, &[0x0101, 0x0202, 0x0303, 0x0404, 0x0505]);
        let data_end = V5_RESPONSE_MODBUS_OFFSET + 3 + 2 * 5;

        for i in V5_RESPONSE_MODBUS_OFFSET..data_end {
            let mut corrupted = response.clone();
            corrupted[i] = corrupted[i].wrapping_add(1);
            assert!(
                matches!(
                    protocol.parse_response(&corrupted, &request, range),
                    Err(ProtocolError::CrcMismatch { .. })
                ),
                "byte {i}"
            );
        }
    }

    #[test]
    fn test_corrupted_envelope_reports_checksum_mismatch() {
        let protocol = V5Protocol::new(SERIAL);
        let range = RegisterRange::new(0, 1).unwrap();
        let request = protocol.build_request(0x03, range);
        let response = v5_response(SERIAL, &[1, 2]);

        for i in 1..V5_RESPONSE_MODBUS_OFFSET {
            let mut corrupted = response.clone();
            corrupted[i] ^= 0x01;
            assert!(
                matches!(
                    protocol.parse_response(&corrupted, &request, range),
                    Err(ProtocolError::ChecksumMismatch { .. })
                ),
                "byte {i}"
            );
        }
    }

    // ========================================================================
    // Error Frame Tests
    // ========================================================================

    #[test]
    fn test_error_frame_illegal_address() {
        let protocol = V5Protocol::new(SERIAL);
        let range = RegisterRange::new(0x2000, 0x2010).unwrap();
        let request = protocol.build_request(0x03, range);

        assert_eq!(
            protocol.parse_response(&error_frame(SERIAL, 0x02), &request, range),
            Err(ProtocolError::ModbusException {
                code: 0x02,
                kind: ExceptionKind::IllegalDataAddress
            })
        );
    }

    #[test]
    fn test_error_frame_exception_codes() {
        let protocol = V5Protocol::new(SERIAL);
        let range = RegisterRange::single(0);
        let request = protocol.build_request(0x03, range);

        for (code, kind) in [
            (0x01, ExceptionKind::IllegalFunction),
            (0x03, ExceptionKind::IllegalDataValue),
            (0x04, ExceptionKind::SlaveDeviceFailure),
            (0x05, ExceptionKind::Unknown),
        ] {
            assert_eq!(
                protocol.parse_response(&error_frame(SERIAL, code), &request, range),
                Err(ProtocolError::ModbusException { code, kind })
            );
        }
    }

    #[test]
    fn test_error_frame_serial_mismatch_wins_over_exception() {
        let protocol = V5Protocol::new(SERIAL);
        let range = RegisterRange::single(0);
        let request = protocol.build_request(0x03, range);

        assert_eq!(
            protocol.parse_response(&error_frame(1_234_567_890, 0x02), &request, range),
            Err(ProtocolError::SerialMismatch {
                expected: SERIAL,
                actual: 1_234_567_890
            })
        );
    }

    #[test]
    fn test_error_frame_with_request_control_code() {
        let protocol = V5Protocol::new(SERIAL);
        let range = RegisterRange::single(0);
        let request = protocol.build_request(0x03, range);
        let mut frame = error_frame(SERIAL, 0x02);
        frame[3..5].copy_from_slice(&V5_CONTROL_REQUEST.to_le_bytes());

        assert_eq!(
            protocol.parse_response(&frame, &request, range),
            Err(ProtocolError::exception(0x02))
        );
    }

    #[test]
    fn test_29_byte_frame_without_envelope_is_too_short() {
        let protocol = V5Protocol::new(SERIAL);
        let range = RegisterRange::single(0);
        let request = protocol.build_request(0x03, range);
        let mut frame = error_frame(SERIAL, 0x02);
        frame[0] = 0x00;

        assert_eq!(
            protocol.parse_response(&frame, &request, range),
            Err(ProtocolError::FrameTooShort {
                expected: V5_MIN_RESPONSE_LEN,
                actual: V5_ERROR_FRAME_LEN
            })
        );
    }

    #[test]
    fn test_29_byte_frame_with_other_declared_length_is_too_short() {
        let protocol = V5Protocol::new(SERIAL);
        let range = RegisterRange::single(0);
        let request = protocol.build_request(0x03, range);
        let mut frame = error_frame(SERIAL, 0x02);
        frame[1..3].copy_from_slice(&[0x0F, 0x00]);
        frame[3..5].copy_from_slice(&V5_CONTROL_REQUEST.to_le_bytes());

        assert_eq!(
            protocol.parse_response(&frame, &request, range),
            Err(ProtocolError::FrameTooShort {
                expected: V5_MIN_RESPONSE_LEN,
                actual: V5_ERROR_FRAME_LEN
            })
        );
    }
}
