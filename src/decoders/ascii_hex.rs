//! ASCIIHexDecode implementation.
//!
//! Decodes hexadecimal-encoded data (e.g., "48656C6C6F>" -> "Hello").
//! Whitespace and other non-hex characters are skipped, `>` ends the data,
//! and an odd trailing digit is completed with an implicit '0'.
//!
//! PDF Spec: ISO 32000-1:2008, Section 7.4.2 - ASCIIHexDecode Filter

use crate::decoders::{DecodeOutput, StreamDecoder};
use crate::error::Result;

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// ASCIIHexDecode filter implementation.
pub struct AsciiHexDecoder;

impl StreamDecoder for AsciiHexDecoder {
    fn decode(&self, input: &[u8]) -> Result<DecodeOutput> {
        hex_decode(input)
    }

    fn name(&self) -> &str {
        "ASCIIHexDecode"
    }
}

/// Decode ASCII hex data.
///
/// The `>` end marker counts as consumed. Without an end marker the whole
/// input is consumed.
pub fn hex_decode(input: &[u8]) -> Result<DecodeOutput> {
    if input.is_empty() {
        return Ok(DecodeOutput::empty());
    }

    let end = input.iter().position(|&c| c == b'>').unwrap_or(input.len());
    let mut output = Vec::with_capacity(end / 2 + 1);
    let mut high: Option<u8> = None;
    let mut i = 0;
    while i < input.len() {
        let ch = input[i];
        i += 1;
        if ch == b'>' {
            break;
        }
        let Some(digit) = hex_digit_to_value(ch) else {
            continue;
        };
        match high.take() {
            Some(h) => output.push((h << 4) | digit),
            None => high = Some(digit),
        }
    }
    if let Some(h) = high {
        output.push(h << 4);
    }

    Ok(DecodeOutput::new(output, i))
}

/// Encode data as uppercase hex digit pairs, terminated by `>`.
pub fn hex_encode(input: &[u8]) -> Vec<u8> {
    let mut output = Vec::with_capacity(input.len() * 2 + 1);
    for &byte in input {
        output.push(HEX_DIGITS[usize::from(byte >> 4)]);
        output.push(HEX_DIGITS[usize::from(byte & 0x0F)]);
    }
    output.push(b'>');
    output
}

/// Convert a hexadecimal ASCII character to its numeric value.
fn hex_digit_to_value(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        _ => None,
    }
}
