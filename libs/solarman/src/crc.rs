//! Checksums used by the logger protocol
//!
//! - CRC16/Modbus (reflected polynomial 0xA001, seed 0xFFFF) protects the
//!   embedded Modbus sub-frame in both framing variants.
//! - The V5 envelope checksum is the low byte of a plain byte sum.

const CRC16_POLY: u16 = 0xA001;
const CRC16_SEED: u16 = 0xFFFF;

/// 256-entry lookup table, built at compile time
static CRC16_TABLE: [u16; 256] = build_crc16_table();

const fn build_crc16_table() -> [u16; 256] {
    let mut table = [0u16; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u16;
        let mut bit = 0;
        while bit < 8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ CRC16_POLY;
            } else {
                crc >>= 1;
            }
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

/// Calculate CRC16 checksum (Modbus RTU standard)
///
/// Empty input yields the seed value `0xFFFF`. On the wire the result is
/// appended little-endian.
pub fn crc16(data: &[u8]) -> u16 {
    data.iter().fold(CRC16_SEED, |crc, &byte| {
        (crc >> 8) ^ CRC16_TABLE[usize::from((crc ^ u16::from(byte)) & 0xFF)]
    })
}

/// Low byte of the sum of all bytes
pub fn envelope_checksum(data: &[u8]) -> u8 {
    data.iter().fold(0u8, |sum, &byte| sum.wrapping_add(byte))
}
