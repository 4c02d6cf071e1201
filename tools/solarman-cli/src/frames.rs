//! Offline frame tools: `decode` and `frame`

use crate::output::{print_frame, print_registers};
use anyhow::{Context, Result};
use solarman::protocol::v5::{read_sequence, read_serial};
use solarman::{
    LoggerConfig, LoggerMode, LoggerProtocol, RegisterMap, RegisterRange, RegisterRequest,
};

/// Codec for offline use; a V5 capture without a configured serial uses its own
fn offline_protocol(config: &LoggerConfig, capture: &[u8]) -> Result<LoggerProtocol> {
    match (config.mode, config.serial_number) {
        (LoggerMode::V5, Some(serial)) => Ok(LoggerProtocol::v5(serial)),
        (LoggerMode::V5, None) => {
            let serial = read_serial(capture).context("Frame too short to carry a serial")?;
            Ok(LoggerProtocol::v5(serial))
        },
        (LoggerMode::Raw, _) => Ok(LoggerProtocol::raw()),
    }
}

fn decode_frame(
    config: &LoggerConfig,
    capture: &[u8],
    range: RegisterRange,
) -> Result<RegisterMap> {
    let protocol = offline_protocol(config, capture)?;
    let request = RegisterRequest::holding(range);
    let frame = protocol.build_request(request.function_code, request.range);
    let registers = protocol.parse_response(capture, &frame, request.range)?;
    Ok(registers)
}

pub fn decode(config: &LoggerConfig, frame: &str, first: u16, last: u16) -> Result<()> {
    let capture = common::hex::decode(frame).context("Invalid hex frame")?;
    let range = RegisterRange::new(first, last)?;

    if config.mode == LoggerMode::V5 {
        if let (Some(serial), Some(sequence)) = (read_serial(&capture), read_sequence(&capture)) {
            println!("Logger serial {serial}, sequence 0x{sequence:02X}");
        }
    }

    let registers = decode_frame(config, &capture, range)
        .with_context(|| format!("Failed to decode {} frame for {}", config.mode, range))?;
    print_registers(&registers);
    Ok(())
}

pub fn print_request(config: &LoggerConfig, request: &str) -> Result<()> {
    let request: RegisterRequest = request.parse()?;
    let protocol = LoggerProtocol::from_config(config)?;
    let frame = protocol.build_request(request.function_code, request.range);
    print_frame(&format!("{} request {}", protocol.mode(), request), &frame);
    Ok(())
}
