//! ASCII85Decode (Base85) implementation.
//!
//! Every 4 bytes of binary data are represented as 5 ASCII characters in the
//! range '!' to 'u'. The special character 'z' stands for 4 zero bytes, and
//! the data ends with the `~>` marker.
//!
//! PDF Spec: ISO 32000-1:2008, Section 7.4.3 - ASCII85Decode Filter

use crate::decoders::{DecodeOutput, StreamDecoder};
use crate::error::{Error, Result};

/// Characters per output line written by [`ascii85_encode`].
const MAX_LINE_LENGTH: usize = 80;

/// ASCII85Decode filter implementation.
pub struct Ascii85Decoder;

impl StreamDecoder for Ascii85Decoder {
    fn decode(&self, input: &[u8]) -> Result<DecodeOutput> {
        ascii85_decode(input)
    }

    fn name(&self) -> &str {
        "ASCII85Decode"
    }
}

fn is_ascii85_whitespace(ch: u8) -> bool {
    matches!(ch, b'\r' | b'\n' | b' ' | b'\t')
}

/// Decode ASCII85 data.
///
/// Decoding stops at the `~` of the end marker or at the first character
/// that is neither a base-85 digit, `z`, nor whitespace. A trailing `>` after
/// the stop character is consumed as well. A final partial group of `k`
/// characters is padded with `u` and yields `k - 1` bytes.
pub fn ascii85_decode(input: &[u8]) -> Result<DecodeOutput> {
    if input.is_empty() {
        return Ok(DecodeOutput::empty());
    }

    // Count legal characters and zeros to size the output.
    let mut zcount = 0usize;
    let mut pos = 0usize;
    while pos < input.len() {
        let ch = input[pos];
        if ch == b'z' {
            zcount += 1;
        } else if !(b'!'..=b'u').contains(&ch) && !is_ascii85_whitespace(ch) {
            break;
        }
        pos += 1;
    }
    if pos == 0 {
        return Ok(DecodeOutput::empty());
    }

    let capacity = zcount
        .checked_mul(4)
        .and_then(|zeros| ((pos - zcount) / 5).checked_mul(4).and_then(|n| n.checked_add(zeros)))
        .and_then(|n| n.checked_add(4))
        .ok_or_else(|| Error::limit("ASCII85 output size", usize::MAX))?;

    let mut output = Vec::with_capacity(capacity);
    let mut state = 0usize;
    let mut res: u32 = 0;
    pos = 0;
    while pos < input.len() {
        let ch = input[pos];
        pos += 1;
        if is_ascii85_whitespace(ch) {
            continue;
        }

        if ch == b'z' {
            output.extend_from_slice(&[0, 0, 0, 0]);
            state = 0;
            res = 0;
            continue;
        }

        // End marker or illegal character
        if !(b'!'..=b'u').contains(&ch) {
            break;
        }

        res = res.wrapping_mul(85).wrapping_add(u32::from(ch - b'!'));
        if state < 4 {
            state += 1;
            continue;
        }

        output.extend_from_slice(&res.to_be_bytes());
        state = 0;
        res = 0;
    }

    // Partial group: pad with 'u'
    if state > 0 {
        for _ in state..5 {
            res = res.wrapping_mul(85).wrapping_add(84);
        }
        output.extend_from_slice(&res.to_be_bytes()[..state - 1]);
    }

    if pos < input.len() && input[pos] == b'>' {
        pos += 1;
    }

    Ok(DecodeOutput::new(output, pos))
}

/// Encode data as ASCII85, terminated by `~>`.
///
/// An all-zero full group is written as `z`; a final partial group of `n`
/// bytes is written as `n + 1` characters. A line break is inserted after
/// every 80 output characters.
pub fn ascii85_encode(input: &[u8]) -> Vec<u8> {
    let mut output = Vec::with_capacity(input.len() / 4 * 5 + input.len() / MAX_LINE_LENGTH + 8);
    let mut line_length = 0usize;
    let mut push = |output: &mut Vec<u8>, ch: u8| {
        output.push(ch);
        line_length += 1;
        if line_length >= MAX_LINE_LENGTH {
            output.push(b'\n');
            line_length = 0;
        }
    };

    let mut chunks = input.chunks_exact(4);
    for chunk in &mut chunks {
        let value = u32::from_be_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
        if value == 0 {
            push(&mut output, b'z');
            continue;
        }
        for digit in encode_group(value) {
            push(&mut output, digit);
        }
    }

    let rest = chunks.remainder();
    if !rest.is_empty() {
        let mut padded = [0u8; 4];
        padded[..rest.len()].copy_from_slice(rest);
        let digits = encode_group(u32::from_be_bytes(padded));
        for &digit in &digits[..rest.len() + 1] {
            push(&mut output, digit);
        }
    }

    output.extend_from_slice(b"~>");
    output
}

fn encode_group(mut value: u32) -> [u8; 5] {
    let mut digits = [0u8; 5];
    for digit in digits.iter_mut().rev() {
        *digit = (value % 85) as u8 + b'!';
        value /= 85;
    }
    digits
}
