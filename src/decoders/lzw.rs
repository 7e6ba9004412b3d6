//! LZWDecode implementation for PDF.
//!
//! Decompresses data using the Lempel-Ziv-Welch (LZW) algorithm as specified
//! in the PDF Reference (Section 7.4.4).
//!
//! PDF's LZW implementation:
//! - Uses MSB-first bit ordering
//! - Starts with 9-bit codes, growing to at most 12 bits
//! - With EarlyChange=1 (the default) the code width grows one code earlier
//!   than in GIF/TIFF
//! - Clear code is 256, EOD code is 257
//! - First available code is 258
//!
//! Strings are rebuilt by walking the prefix chain into a bounded stack.
//! Chains longer than the stack are truncated rather than rejected.

use crate::decoder_config::DecoderOptions;
use crate::decoders::flate::apply_predictor;
use crate::decoders::predictor::PredictorParams;
use crate::decoders::{DecodeOutput, StreamDecoder};
use crate::error::{Error, Result};
use weezl::{encode::Encoder as WeezlEncoder, BitOrder};

const CLEAR_CODE: u32 = 256;
const EOD_CODE: u32 = 257;
const FIRST_CODE: u32 = 258;

/// Table entries stop being added once `entries + early_change` hits this.
const MAX_ENTRIES: u32 = 4094;

/// LZWDecode filter implementation.
#[derive(Debug, Clone)]
pub struct LzwDecoder {
    early_change: bool,
    predictor: PredictorParams,
    options: DecoderOptions,
}

impl Default for LzwDecoder {
    fn default() -> Self {
        Self {
            early_change: true,
            predictor: PredictorParams::default(),
            options: DecoderOptions::default(),
        }
    }
}

impl LzwDecoder {
    /// Create a decoder with `EarlyChange` on, no predictor and default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `EarlyChange` parameter.
    pub fn with_early_change(mut self, early_change: bool) -> Self {
        self.early_change = early_change;
        self
    }

    /// Reverse this predictor after decompression.
    pub fn with_predictor(mut self, predictor: PredictorParams) -> Self {
        self.predictor = predictor;
        self
    }

    /// Use custom limits.
    pub fn with_options(mut self, options: DecoderOptions) -> Self {
        self.options = options;
        self
    }
}

impl StreamDecoder for LzwDecoder {
    fn decode(&self, input: &[u8]) -> Result<DecodeOutput> {
        let output = lzw_decode(input, self.early_change, &self.options)?;
        apply_predictor(output, &self.predictor)
    }

    fn name(&self) -> &str {
        "LZWDecode"
    }
}

/// Decoder state for one LZW stream.
struct LzwState<'a> {
    src: &'a [u8],
    bit_pos: usize,
    early_change: u32,
    code_len: usize,
    /// Entry `i` is code `258 + i`: prefix code in the high half, appended
    /// byte in the low byte
    codes: Vec<u32>,
    stack: Vec<u8>,
    stack_size: usize,
    truncated: bool,
}

impl<'a> LzwState<'a> {
    fn new(src: &'a [u8], early_change: bool, stack_size: usize) -> Self {
        Self {
            src,
            bit_pos: 0,
            early_change: u32::from(early_change),
            code_len: 9,
            codes: Vec::with_capacity(MAX_ENTRIES as usize),
            stack: Vec::with_capacity(stack_size),
            stack_size: stack_size.max(1),
            truncated: false,
        }
    }

    fn current_code(&self) -> u32 {
        self.codes.len() as u32
    }

    /// Read the next MSB-first code, or `None` if not enough bits remain.
    fn next_code(&mut self) -> Option<u32> {
        if self.bit_pos + self.code_len > self.src.len() * 8 {
            return None;
        }
        let byte = self.bit_pos / 8;
        let window = (0..3).fold(0u32, |acc, k| {
            (acc << 8) | u32::from(self.src.get(byte + k).copied().unwrap_or(0))
        });
        let shift = 24 - self.bit_pos % 8 - self.code_len;
        self.bit_pos += self.code_len;
        Some((window >> shift) & ((1 << self.code_len) - 1))
    }

    fn add_code(&mut self, prefix: u32, append: u8) {
        if self.current_code() + self.early_change == MAX_ENTRIES {
            return;
        }
        self.codes.push((prefix << 16) | u32::from(append));
        match self.current_code() + self.early_change {
            254 => self.code_len = 10,
            766 => self.code_len = 11,
            1790 => self.code_len = 12,
            _ => {},
        }
    }

    fn reset(&mut self) {
        self.code_len = 9;
        self.codes.clear();
    }

    fn push(&mut self, byte: u8) -> bool {
        if self.stack.len() >= self.stack_size {
            self.truncated = true;
            return false;
        }
        self.stack.push(byte);
        true
    }

    /// Push the string for `code` onto the stack, last byte first.
    fn decode_string(&mut self, mut code: u32) {
        while code >= FIRST_CODE {
            let index = (code - FIRST_CODE) as usize;
            let Some(&entry) = self.codes.get(index) else {
                break;
            };
            if !self.push(entry as u8) {
                return;
            }
            code = entry >> 16;
        }
        self.push(code as u8);
    }

    fn decode(&mut self, max_output: usize) -> Result<Vec<u8>> {
        let mut output = Vec::with_capacity(512);
        let mut old_code: Option<u32> = None;
        let mut last_char = 0u8;

        while let Some(code) = self.next_code() {
            if code < CLEAR_CODE {
                output.push(code as u8);
                last_char = code as u8;
                if let Some(old) = old_code {
                    self.add_code(old, last_char);
                }
                old_code = Some(code);
                continue;
            }
            if code == CLEAR_CODE {
                self.reset();
                old_code = None;
                continue;
            }
            if code == EOD_CODE {
                break;
            }

            let Some(old) = old_code else {
                return Err(Error::Decode(format!(
                    "LZWDecode: code {} before any literal at bit {}",
                    code,
                    self.bit_pos - self.code_len
                )));
            };

            self.stack.clear();
            if code - FIRST_CODE >= self.current_code() {
                // Code not yet in the table: previous string plus its first byte
                self.push(last_char);
                self.decode_string(old);
            } else {
                self.decode_string(code);
            }

            if output.len() + self.stack.len() > max_output {
                return Err(Error::limit("LZWDecode output", max_output));
            }
            output.extend(self.stack.iter().rev());
            if let Some(&first) = self.stack.last() {
                last_char = first;
            }

            if old >= FIRST_CODE && old - FIRST_CODE >= self.current_code() {
                break;
            }
            self.add_code(old, last_char);
            old_code = Some(code);
        }

        Ok(output)
    }

    /// Whole bytes consumed, rounding a partial trailing byte up.
    fn consumed(&self) -> usize {
        self.bit_pos.div_ceil(8)
    }
}

/// Decode PDF LZW data.
///
/// Decoding stops at the EOD code or when fewer bits remain than the
/// current code width, so a stream cut off mid-code returns what was
/// decoded before the cut. A stream that yields no data at all, or that
/// references a table entry before any literal, is an error.
pub fn lzw_decode(input: &[u8], early_change: bool, options: &DecoderOptions) -> Result<DecodeOutput> {
    if input.is_empty() {
        return Ok(DecodeOutput::empty());
    }

    let mut state = LzwState::new(input, early_change, options.lzw_stack_size);
    let output = state.decode(options.max_flate_output)?;
    if state.truncated {
        log::warn!(
            "LZWDecode: string longer than the {}-byte decode stack was truncated",
            options.lzw_stack_size
        );
    }
    if output.is_empty() {
        return Err(Error::Decode("LZWDecode: no data decoded".to_string()));
    }

    log::debug!("LZWDecode: {} -> {} bytes", state.consumed(), output.len());
    Ok(DecodeOutput::new(output, state.consumed()))
}

/// Encode data with PDF LZW (MSB-first, 8-bit literals).
///
/// With `early_change` the code width grows one code early, matching the
/// PDF default; the output starts with a clear code and ends with EOD.
/// Empty input encodes to nothing.
pub fn lzw_encode(data: &[u8], early_change: bool) -> Result<Vec<u8>> {
    if data.is_empty() {
        return Ok(Vec::new());
    }
    let mut encoder = if early_change {
        WeezlEncoder::with_tiff_size_switch(BitOrder::Msb, 8)
    } else {
        WeezlEncoder::new(BitOrder::Msb, 8)
    };
    encoder
        .encode(data)
        .map_err(|e| Error::Decode(format!("LZW encode error: {:?}", e)))
}
