//! Hex encoding utility
//! Spaced uppercase encoding for frame logs and lenient decoding of captured frames

use crate::error::{Error, Result};
use std::fmt::Write;

/// Encode bytes as space separated uppercase pairs
/// Example: [0xA5, 0x17, 0x00] -> "A5 17 00"
pub fn encode_spaced(data: &[u8]) -> String {
    let mut result = String::with_capacity(data.len() * 3);
    for (i, byte) in data.iter().enumerate() {
        if i > 0 {
            result.push(' ');
        }
        let _ = write!(&mut result, "{:02X}", byte);
    }
    result
}

/// Decode a hex string, ignoring whitespace, `,`/`:`/`-` separators and `0x` prefixes
/// Example: "A5 17 00", "a51700", "0xA5,0x17,0x00" -> [0xA5, 0x17, 0x00]
pub fn decode(input: &str) -> Result<Vec<u8>> {
    let digits: String = input
        .split(|c: char| c.is_whitespace() || matches!(c, ',' | ':' | '-'))
        .map(|token| {
            token
                .strip_prefix("0x")
                .or_else(|| token.strip_prefix("0X"))
                .unwrap_or(token)
        })
        .collect();

    ::hex::decode(&digits).map_err(|e| Error::Parse(format!("invalid hex frame: {e}")))
}
