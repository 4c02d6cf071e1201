//! Register ranges and request lists
//!
//! A request list is written as comma separated `<fc>:<first>-<last>` entries,
//! numbers in decimal or `0x` hex, e.g. `0x03:0x0003-0x0070, 0x03:150-248`.

use crate::constants::{FC_READ_HOLDING_REGISTERS, MAX_READ_REGISTERS};
use crate::error::{ProtocolError, SolarmanError};
use std::fmt;
use std::str::FromStr;

/// Inclusive, validated register range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterRange {
    first: u16,
    last: u16,
}

impl RegisterRange {
    /// Create a range, rejecting `last < first` and counts above one Modbus read
    pub fn new(first: u16, last: u16) -> Result<Self, ProtocolError> {
        if last < first {
            return Err(ProtocolError::InvalidRange { first, last });
        }
        let count = usize::from(last - first) + 1;
        if count > MAX_READ_REGISTERS {
            return Err(ProtocolError::TooManyRegisters {
                count,
                max: MAX_READ_REGISTERS,
            });
        }
        Ok(Self { first, last })
    }

    pub fn single(address: u16) -> Self {
        Self {
            first: address,
            last: address,
        }
    }

    pub fn first(&self) -> u16 {
        self.first
    }

    pub fn last(&self) -> u16 {
        self.last
    }

    /// Number of registers, always within `1..=MAX_READ_REGISTERS`
    pub fn count(&self) -> u16 {
        self.last - self.first + 1
    }

    pub fn addresses(&self) -> impl Iterator<Item = u16> {
        self.first..=self.last
    }
}

impl fmt::Display for RegisterRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:04X}-0x{:04X}", self.first, self.last)
    }
}

/// One read operation: function code plus register range
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegisterRequest {
    pub function_code: u8,
    pub range: RegisterRange,
}

impl RegisterRequest {
    pub fn new(function_code: u8, range: RegisterRange) -> Self {
        Self {
            function_code,
            range,
        }
    }

    pub fn holding(range: RegisterRange) -> Self {
        Self::new(FC_READ_HOLDING_REGISTERS, range)
    }
}

impl fmt::Display for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:02X}:{}", self.function_code, self.range)
    }
}

impl FromStr for RegisterRequest {
    type Err = SolarmanError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let entry = s.trim();
        let invalid =
            |reason: &str| SolarmanError::config(format!("Invalid request '{entry}': {reason}"));

        let (fc, range) = entry
            .split_once(':')
            .ok_or_else(|| invalid("expected <fc>:<first>-<last>"))?;
        let (first, last) = range
            .split_once('-')
            .ok_or_else(|| invalid("expected <first>-<last>"))?;

        let fc = parse_number(fc).ok_or_else(|| invalid("bad function code"))?;
        let first = parse_number(first).ok_or_else(|| invalid("bad first register"))?;
        let last = parse_number(last).ok_or_else(|| invalid("bad last register"))?;

        let function_code = u8::try_from(fc).map_err(|_| invalid("function code out of range"))?;
        let first = u16::try_from(first).map_err(|_| invalid("first register out of range"))?;
        let last = u16::try_from(last).map_err(|_| invalid("last register out of range"))?;

        let range = RegisterRange::new(first, last).map_err(|e| invalid(&e.to_string()))?;
        Ok(RegisterRequest::new(function_code, range))
    }
}

fn parse_number(s: &str) -> Option<u32> {
    let s = s.trim();
    match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u32::from_str_radix(hex, 16).ok(),
        None => s.parse().ok(),
    }
}

/// Parse a comma separated request list; blank entries are skipped
pub fn parse_requests(list: &str) -> Result<Vec<RegisterRequest>, SolarmanError> {
    list.split(',')
        .filter(|entry| !entry.trim().is_empty())
        .map(|entry| entry.parse::<RegisterRequest>())
        .collect()
}
