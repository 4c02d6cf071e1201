//! Solarman logger protocol constants
//!
//! Byte offsets and fixed field values for both framing variants. Offsets are
//! zero-based positions within a complete frame.

use std::time::Duration;

// ============================================================================
// Modbus sub-frame
// ============================================================================

/// Slave id used inside every embedded Modbus request
pub const MODBUS_SLAVE_ID: u8 = 0x01;

/// Read Holding Registers
pub const FC_READ_HOLDING_REGISTERS: u8 = 0x03;

/// Read Input Registers
pub const FC_READ_INPUT_REGISTERS: u8 = 0x04;

/// Slave id + function code + first register + register count
pub const MODBUS_REQUEST_LEN: usize = 6;

/// Request sub-frame including its trailing CRC16
pub const MODBUS_REQUEST_FRAME_LEN: usize = MODBUS_REQUEST_LEN + 2;

/// Slave id + function code echoed at the start of every response
pub const MODBUS_ECHO_LEN: usize = 2;

/// Offset of the first data byte in a Modbus read response
/// Format: Slave(1) + FC(1) + ByteCount(1) + Data(N x 2)
pub const MODBUS_DATA_OFFSET: usize = MODBUS_ECHO_LEN + 1;

/// Maximum number of registers for one FC03/FC04 read
///
/// Response PDU: FC(1) + ByteCount(1) + N x 2 <= 253, so N <= 125
pub const MAX_READ_REGISTERS: usize = 125;

// ============================================================================
// V5 envelope
// ============================================================================

/// First byte of every V5 frame
pub const V5_START: u8 = 0xA5;

/// Last byte of every V5 frame
pub const V5_END: u8 = 0x15;

/// Control code carried by requests (little-endian on the wire: 10 45)
pub const V5_CONTROL_REQUEST: u16 = 0x4510;

/// Control code carried by logger responses (little-endian on the wire: 10 15)
pub const V5_CONTROL_RESPONSE: u16 = 0x1510;

/// Start(1) + Length(2) + Control(2) + Sequence(2) + Serial(4)
pub const V5_HEADER_LEN: usize = 11;

/// Checksum(1) + End(1)
pub const V5_TRAILER_LEN: usize = 2;

/// Offset of the little-endian payload length field
pub const V5_LENGTH_OFFSET: usize = 1;

/// Offset of the little-endian control code
pub const V5_CONTROL_OFFSET: usize = 3;

/// Offset of the sequence field
pub const V5_SEQUENCE_OFFSET: usize = 5;

/// Offset of the little-endian logger serial number
pub const V5_SERIAL_OFFSET: usize = 7;

/// Frame type for inverter data requests
pub const V5_FRAME_TYPE: u8 = 0x02;

/// Sensor type sent with requests
pub const V5_SENSOR_TYPE: u16 = 0x0000;

/// FrameType(1) + SensorType(2) + TotalWorkingTime(4) + PowerOnTime(4) + OffsetTime(4)
pub const V5_REQUEST_PAYLOAD_PREFIX_LEN: usize = 15;

/// Complete V5 request length
pub const V5_REQUEST_LEN: usize =
    V5_HEADER_LEN + V5_REQUEST_PAYLOAD_PREFIX_LEN + MODBUS_REQUEST_FRAME_LEN + V5_TRAILER_LEN;

/// Offset of the embedded Modbus response in a V5 response
/// Header(11) + FrameType(1) + Status(1) + TotalWorkingTime(4) + PowerOnTime(4) + OffsetTime(4)
pub const V5_RESPONSE_MODBUS_OFFSET: usize = 25;

/// Length of a structured V5 error frame
pub const V5_ERROR_FRAME_LEN: usize = 29;

/// Payload length declared by a V5 error frame
pub const V5_ERROR_PAYLOAD_LEN: u16 = (V5_ERROR_FRAME_LEN - V5_HEADER_LEN - V5_TRAILER_LEN) as u16;

/// Offset of the Modbus exception code inside a V5 error frame
pub const V5_ERROR_CODE_OFFSET: usize = 25;

/// Shortest V5 response that can carry register data
pub const V5_MIN_RESPONSE_LEN: usize = 33;

// ============================================================================
// Raw framing
// ============================================================================

/// Fixed transaction id of the raw header
pub const RAW_TRANSACTION_ID: u16 = 0x03E8;

/// Fixed protocol id of the raw header
pub const RAW_PROTOCOL_ID: u16 = 0x0000;

/// TransactionId(2) + ProtocolId(2) + Length(2)
pub const RAW_HEADER_LEN: usize = 6;

/// Expected first byte of a raw response (high byte of the transaction id)
pub const RAW_START: u8 = 0x03;

/// Shortest raw response that can carry register data
pub const RAW_MIN_RESPONSE_LEN: usize = 11;

// ============================================================================
// Transport
// ============================================================================

/// Default TCP port of Solarman logging sticks
pub const DEFAULT_PORT: u16 = 8899;

/// Default TCP connect timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default per-attempt read timeout
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Total read attempts per request, including the first
pub const DEFAULT_READ_ATTEMPTS: u32 = 5;

/// Size of the single-read response buffer
pub const RESPONSE_BUFFER_SIZE: usize = 1024;
