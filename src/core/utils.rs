use anyhow::{bail, Context, Result};

use crate::core::session::EfId;

/// Parse a hex string into bytes
/// Supports various formats:
/// - "0002" (pure hex)
/// - "00 02" (space-separated)
/// - "0x00,0x02" (0x prefix with commas)
/// - "00:02" (colon-separated)
pub fn parse_hex(hex_str: &str) -> Result<Vec<u8>> {
    let cleaned = clean_hex_string(hex_str);

    if cleaned.len() % 2 != 0 {
        bail!("Hex string must have even number of characters: '{hex_str}'");
    }

    hex::decode(&cleaned).with_context(|| format!("Invalid hex string: '{hex_str}'"))
}

/// Clean a hex string by removing common separators and prefixes
fn clean_hex_string(hex_str: &str) -> String {
    hex_str
        .trim()
        .replace("0x", "")
        .replace("0X", "")
        .chars()
        .filter(|c| !matches!(c, ' ' | ',' | ':' | '-' | '\t' | '\n' | '\r'))
        .collect::<String>()
        .to_uppercase()
}

/// Parse a two byte EF identifier such as "0002" or "00 02"
pub fn parse_ef_id(hex_str: &str) -> Result<EfId> {
    let bytes = parse_hex(hex_str)?;
    let id: [u8; 2] = bytes
        .as_slice()
        .try_into()
        .with_context(|| format!("EF identifier must be 2 bytes, got {}", bytes.len()))?;
    Ok(EfId(id))
}

/// Format bytes as a hex string
pub fn format_hex(bytes: &[u8]) -> String {
    hex::encode_upper(bytes)
}

/// Format bytes as a hex string with spaces
pub fn format_hex_spaced(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| format!("{b:02X}"))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Format bytes in a hex dump style (offset, hex and printable ASCII)
pub fn format_hex_dump(bytes: &[u8]) -> String {
    const BYTES_PER_LINE: usize = 16;

    if bytes.is_empty() {
        return String::from("(empty)");
    }

    bytes
        .chunks(BYTES_PER_LINE)
        .enumerate()
        .map(|(i, chunk)| {
            let ascii: String = chunk
                .iter()
                .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
                .collect();
            format!(
                "{:08X}: {:<width$} |{ascii}|",
                i * BYTES_PER_LINE,
                format_hex_spaced(chunk),
                width = BYTES_PER_LINE * 3 - 1
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Get a human-readable description of SW1/SW2 status words
pub fn describe_status_word(sw1: u8, sw2: u8) -> String {
    match (sw1, sw2) {
        (0x90, 0x00) => "Success".to_string(),
        (0x61, n) => format!("Success, {n} bytes available"),
        (0x62, 0x00) => "Warning: No information given".to_string(),
        (0x62, 0x81) => "Warning: Part of returned data may be corrupted".to_string(),
        (0x62, 0x82) => "Warning: End of file reached".to_string(),
        (0x62, 0x83) => "Warning: Selected file invalidated".to_string(),
        (0x62, 0x84) => "Warning: FCI not formatted".to_string(),
        (0x63, 0x00) => "Warning: No information given".to_string(),
        (0x63, n) if n & 0xF0 == 0xC0 => format!("Warning: Counter = {}", n & 0x0F),
        (0x64, 0x00) => "Error: Execution error".to_string(),
        (0x65, 0x00) => "Error: No precise diagnosis".to_string(),
        (0x65, 0x81) => "Error: Memory failure".to_string(),
        (0x66, 0x00) => "Error: Reserved".to_string(),
        (0x67, 0x00) => "Error: Wrong length".to_string(),
        (0x68, 0x00) => "Error: Functions in CLA not supported".to_string(),
        (0x68, 0x81) => "Error: Logical channel not supported".to_string(),
        (0x68, 0x82) => "Error: Secure messaging not supported".to_string(),
        (0x69, 0x00) => "Error: Command not allowed".to_string(),
        (0x69, 0x81) => "Error: Command incompatible with file structure".to_string(),
        (0x69, 0x82) => "Error: Security status not satisfied".to_string(),
        (0x69, 0x83) => "Error: Authentication method blocked".to_string(),
        (0x69, 0x84) => "Error: Referenced data invalidated".to_string(),
        (0x69, 0x85) => "Error: Conditions of use not satisfied".to_string(),
        (0x69, 0x86) => "Error: Command not allowed (no current EF)".to_string(),
        (0x69, 0x87) => "Error: Expected SM data objects missing".to_string(),
        (0x69, 0x88) => "Error: SM data objects incorrect".to_string(),
        (0x6A, 0x00) => "Error: Wrong parameter(s) P1-P2".to_string(),
        (0x6A, 0x80) => "Error: Incorrect parameters in data field".to_string(),
        (0x6A, 0x81) => "Error: Function not supported".to_string(),
        (0x6A, 0x82) => "Error: File not found".to_string(),
        (0x6A, 0x83) => "Error: Record not found".to_string(),
        (0x6A, 0x84) => "Error: Not enough memory space in file".to_string(),
        (0x6A, 0x85) => "Error: Lc inconsistent with TLV structure".to_string(),
        (0x6A, 0x86) => "Error: Incorrect parameters P1-P2".to_string(),
        (0x6A, 0x87) => "Error: Lc inconsistent with P1-P2".to_string(),
        (0x6A, 0x88) => "Error: Referenced data not found".to_string(),
        (0x6B, 0x00) => "Error: Wrong parameter(s) P1-P2".to_string(),
        (0x6C, n) => format!("Error: Wrong Le field, exact length: {n}"),
        (0x6D, 0x00) => "Error: Instruction code not supported or invalid".to_string(),
        (0x6E, 0x00) => "Error: Class not supported".to_string(),
        (0x6F, 0x00) => "Error: No precise diagnosis".to_string(),
        _ => format!("Unknown status: {sw1:02X} {sw2:02X}"),
    }
}
