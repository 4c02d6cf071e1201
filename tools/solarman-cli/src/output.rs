//! Terminal output helpers

use colored::*;
use common::hex::encode_spaced;
use solarman::RegisterMap;

/// One `address  hex  u16` line per register, in address order
pub fn register_rows(registers: &RegisterMap) -> Vec<String> {
    registers
        .iter()
        .map(|(address, value)| {
            format!(
                "0x{:04X}  {}  {:>5}",
                address,
                encode_spaced(&value),
                u16::from_be_bytes(value)
            )
        })
        .collect()
}

pub fn print_registers(registers: &RegisterMap) {
    println!("{}", "Address  Hex    Value".bold());
    for row in register_rows(registers) {
        println!("{row}");
    }
    println!("{}", format!("{} registers", registers.len()).dimmed());
}

pub fn print_frame(label: &str, frame: &[u8]) {
    println!("{} ({} bytes)", label.bold(), frame.len());
    println!("{}", encode_spaced(frame).cyan());
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_register_rows() {
        let mut registers = RegisterMap::new();
        registers.insert(0x0070, [0x00, 0x2A]);
        registers.insert(0x0003, [0x12, 0x34]);

        assert_eq!(
            register_rows(&registers),
            vec!["0x0003  12 34   4660", "0x0070  00 2A     42"]
        );
    }
}
