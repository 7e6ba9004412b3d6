//! CCITTFaxDecode implementation.
//!
//! CCITT Group 3 and Group 4 fax compression for monochrome images
//! (ITU-T T.4 and T.6):
//! - `K < 0`: pure two-dimensional Group 4 (Modified READ)
//! - `K = 0`: one-dimensional Group 3 (Modified Huffman)
//! - `K > 0`: mixed Group 3, a tag bit before each row selects 1D or 2D
//!
//! Rows are packed one bit per pixel, most significant bit first. A set bit
//! is white unless `BlackIs1` is true. Corrupt or truncated data ends the
//! current row early; the rest of the row stays white.
//!
//! PDF Spec: ISO 32000-1:2008, Section 7.4.6 - CCITTFaxDecode Filter

mod bits;
mod encoder;
mod tables;

pub use encoder::FaxEncoder;

use self::bits::{fill_bits, find_b1_b2, next_bit};
use crate::decoder_config::DecoderOptions;
use crate::decoders::scanline::{pitch_32, pitch_8, ScanlineDecoder, ScanlineGeometry, ScanlineState};
use crate::decoders::{DecodeOutput, StreamDecoder};
use crate::error::{Error, Result};
use crate::object::{flag_for, integer_for, Dictionary};

/// Default `Columns` value.
const DEFAULT_COLUMNS: i64 = 1728;

/// Decode parameters of a CCITTFaxDecode stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FaxParams {
    /// Coding scheme selector (`K`)
    pub k: i64,
    /// Rows may be preceded by EOL codes (`EndOfLine`)
    pub end_of_line: bool,
    /// Each row starts on a byte boundary (`EncodedByteAlign`)
    pub encoded_byte_align: bool,
    /// Set bits are black (`BlackIs1`)
    pub black_is_1: bool,
    /// Image width in pixels (`Columns`)
    pub columns: i64,
    /// Image height in rows, 0 when unknown (`Rows`)
    pub rows: i64,
}

impl Default for FaxParams {
    fn default() -> Self {
        Self {
            k: 0,
            end_of_line: false,
            encoded_byte_align: false,
            black_is_1: false,
            columns: DEFAULT_COLUMNS,
            rows: 0,
        }
    }
}

impl FaxParams {
    /// Read the parameters from a `DecodeParms` dictionary.
    ///
    /// A `Rows` value above 65535 is ignored as if it were absent.
    pub fn from_dict(params: Option<&Dictionary>) -> Self {
        let rows = integer_for(params, "Rows", 0);
        Self {
            k: integer_for(params, "K", 0),
            end_of_line: flag_for(params, "EndOfLine"),
            encoded_byte_align: flag_for(params, "EncodedByteAlign"),
            black_is_1: flag_for(params, "BlackIs1"),
            columns: integer_for(params, "Columns", DEFAULT_COLUMNS),
            rows: if rows > i64::from(u16::MAX) { 0 } else { rows },
        }
    }
}

/// Read one Modified Huffman code of the given colour.
fn read_code(src: &[u8], bitsize: usize, bitpos: &mut usize, white: bool) -> Option<u16> {
    let table = tables::run_table(white);
    let mut code = 0u16;
    for length in 1..=table.max_length() {
        let bit = next_bit(src, bitsize, bitpos)?;
        code = (code << 1) | u16::from(bit);
        if let Some(run) = table.lookup(length, code) {
            return Some(run);
        }
    }
    None
}

/// Read makeup codes up to and including a terminating code.
///
/// A missing or invalid code contributes -1, so a run that fails on its
/// first code comes back negative.
fn read_run_length(src: &[u8], bitsize: usize, bitpos: &mut usize, white: bool) -> i64 {
    let mut total = 0i64;
    loop {
        let run = read_code(src, bitsize, bitpos, white).map_or(-1, i64::from);
        total += run;
        if run < 64 {
            return total;
        }
    }
}

/// Consume an EOL code (at least 11 zero bits then a one) if present.
fn skip_eol(src: &[u8], bitsize: usize, bitpos: &mut usize) {
    let start = *bitpos;
    while let Some(bit) = next_bit(src, bitsize, bitpos) {
        if bit {
            if *bitpos - start <= 11 {
                *bitpos = start;
            }
            return;
        }
    }
}

/// Two-dimensional coding modes (T.6 table 1).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Pass,
    Horizontal,
    Vertical(i64),
    /// Extension code; `resume` is false when the row ends with it
    Extension { resume: bool },
}

fn read_mode(src: &[u8], bitsize: usize, bitpos: &mut usize) -> Option<Mode> {
    let mut bit = || next_bit(src, bitsize, bitpos);
    if bit()? {
        return Some(Mode::Vertical(0));
    }
    let (bit1, bit2) = (bit()?, bit()?);
    if bit1 {
        return Some(Mode::Vertical(if bit2 { 1 } else { -1 }));
    }
    if bit2 {
        return Some(Mode::Horizontal);
    }
    if bit()? {
        return Some(Mode::Pass);
    }
    let (bit1, bit2) = (bit()?, bit()?);
    if bit1 {
        return Some(Mode::Vertical(if bit2 { 2 } else { -2 }));
    }
    if bit2 {
        return Some(Mode::Vertical(if bit()? { 3 } else { -3 }));
    }
    Some(Mode::Extension { resume: bit()? })
}

/// Decode one two-dimensional row into `dest` (pre-filled white) against
/// `reference`.
fn decode_2d_row(src: &[u8], bitsize: usize, bitpos: &mut usize, dest: &mut [u8], reference: &[u8], columns: i64) {
    let mut a0: i64 = -1;
    let mut a0_white = true;
    loop {
        if *bitpos >= bitsize {
            return;
        }
        let (b1, b2) = find_b1_b2(reference, columns, a0, a0_white);
        let Some(mode) = read_mode(src, bitsize, bitpos) else {
            return;
        };

        let delta = match mode {
            Mode::Vertical(delta) => delta,
            Mode::Pass => {
                if !a0_white {
                    fill_bits(dest, columns, a0, b2);
                }
                if b2 >= columns {
                    return;
                }
                a0 = b2;
                continue;
            },
            Mode::Horizontal => {
                let mut run1 = read_run_length(src, bitsize, bitpos, a0_white);
                if a0 < 0 {
                    run1 += 1;
                }
                if run1 < 0 {
                    return;
                }
                let a1 = a0 + run1;
                if !a0_white {
                    fill_bits(dest, columns, a0, a1);
                }

                let run2 = read_run_length(src, bitsize, bitpos, !a0_white);
                if run2 < 0 {
                    return;
                }
                let a2 = a1 + run2;
                if a0_white {
                    fill_bits(dest, columns, a1, a2);
                }

                a0 = a2;
                if a0 < columns {
                    continue;
                }
                return;
            },
            Mode::Extension { resume: true } => {
                *bitpos += 3;
                continue;
            },
            Mode::Extension { resume: false } => {
                *bitpos += 5;
                return;
            },
        };

        let a1 = b1 + delta;
        if !a0_white {
            fill_bits(dest, columns, a0, a1);
        }
        // Changing elements only move right
        if a1 >= columns || a0 >= a1 {
            return;
        }
        a0 = a1;
        a0_white = !a0_white;
    }
}

/// Decode one Modified Huffman row into `dest` (pre-filled white).
fn decode_1d_row(src: &[u8], bitsize: usize, bitpos: &mut usize, dest: &mut [u8], columns: i64) {
    let mut white = true;
    let mut start = 0i64;
    loop {
        if *bitpos >= bitsize {
            return;
        }

        let mut run_length = 0i64;
        loop {
            let Some(run) = read_code(src, bitsize, bitpos, white) else {
                // Resynchronise after the next set bit
                while let Some(bit) = next_bit(src, bitsize, bitpos) {
                    if bit {
                        break;
                    }
                }
                return;
            };
            run_length += i64::from(run);
            if run < 64 {
                break;
            }
        }

        if !white {
            fill_bits(dest, columns, start, start + run_length);
        }
        start += run_length;
        if start >= columns {
            return;
        }
        white = !white;
    }
}

/// Decode `height` Group 4 rows starting at `starting_bitpos` into `dest`,
/// `pitch` bytes per row.
///
/// Returns the bit position after the last row, so callers embedding G4
/// data in a larger bitstream can continue from there.
pub fn fax_g4_decode(
    src: &[u8],
    starting_bitpos: usize,
    width: u32,
    height: u32,
    pitch: usize,
    dest: &mut [u8],
) -> Result<usize> {
    let row_bytes = pitch_8(1, 1, width).unwrap_or(usize::MAX);
    if pitch == 0 || pitch < row_bytes {
        return Err(Error::InvalidParameter(format!(
            "G4 pitch {} too small for width {}",
            pitch, width
        )));
    }
    let needed = pitch
        .checked_mul(height as usize)
        .ok_or_else(|| Error::limit("G4 output", usize::MAX))?;
    if dest.len() < needed {
        return Err(Error::InvalidParameter(format!(
            "G4 output buffer has {} bytes, {} rows need {}",
            dest.len(),
            height,
            needed
        )));
    }

    let bitsize = src.len().saturating_mul(8);
    let mut bitpos = starting_bitpos;
    let mut reference = vec![0xffu8; pitch];
    for row in dest.chunks_exact_mut(pitch).take(height as usize) {
        row.fill(0xff);
        decode_2d_row(src, bitsize, &mut bitpos, row, &reference, i64::from(width));
        reference.copy_from_slice(row);
    }
    Ok(bitpos)
}

/// Scanline decoder over CCITT fax data.
///
/// Rows are [`ScanlineDecoder::pitch`] bytes (32-bit aligned); pixels past
/// the image width are padding.
pub struct FaxDecoder<'a> {
    state: ScanlineState,
    src: &'a [u8],
    k: i64,
    end_of_line: bool,
    encoded_byte_align: bool,
    byte_align: bool,
    black_is_1: bool,
    bitpos: usize,
    scanline: Vec<u8>,
    reference: Vec<u8>,
}

/// Create a fax scanline decoder.
///
/// `Columns` and `Rows` from `params` win over the hints when non-zero. The
/// resulting width and height must be in `1..=options.max_image_dimension`.
pub fn create_fax_decoder<'a>(
    src: &'a [u8],
    width_hint: i64,
    height_hint: i64,
    params: &FaxParams,
    options: &DecoderOptions,
) -> Result<FaxDecoder<'a>> {
    let width = if params.columns != 0 { params.columns } else { width_hint };
    let height = if params.rows != 0 { params.rows } else { height_hint };

    let max = i64::from(options.max_image_dimension);
    if width <= 0 || height <= 0 || width > max || height > max {
        return Err(Error::InvalidParameter(format!(
            "fax image dimensions {}x{} outside 1..={}",
            width, height, max
        )));
    }
    FaxDecoder::new(src, width as u32, height as u32, params)
}

impl<'a> FaxDecoder<'a> {
    fn new(src: &'a [u8], width: u32, height: u32, params: &FaxParams) -> Result<Self> {
        let pitch = pitch_32(1, 1, width).ok_or_else(|| Error::limit("fax row pitch", usize::MAX))?;
        log::debug!(
            "CCITTFaxDecode: {}x{} K={} EndOfLine={} EncodedByteAlign={} BlackIs1={}",
            width,
            height,
            params.k,
            params.end_of_line,
            params.encoded_byte_align,
            params.black_is_1
        );
        Ok(Self {
            state: ScanlineState::new(ScanlineGeometry::new(width, height, 1, 1, pitch)),
            src,
            k: params.k,
            end_of_line: params.end_of_line,
            encoded_byte_align: params.encoded_byte_align,
            byte_align: params.encoded_byte_align,
            black_is_1: params.black_is_1,
            bitpos: 0,
            scanline: vec![0xff; pitch],
            reference: vec![0xff; pitch],
        })
    }

    /// Skip to the next byte boundary, unless the padding holds a set bit;
    /// then the data is not really byte aligned and alignment is dropped.
    fn align_to_byte(&mut self, bitsize: usize) {
        let boundary = self.bitpos.next_multiple_of(8);
        let mut probe = self.bitpos;
        while probe < boundary {
            if next_bit(self.src, bitsize, &mut probe) == Some(true) {
                log::warn!(
                    "CCITTFaxDecode: set bit in row padding at bit {}, ignoring EncodedByteAlign",
                    probe - 1
                );
                self.byte_align = false;
                return;
            }
        }
        self.bitpos = boundary;
    }
}

impl ScanlineDecoder for FaxDecoder<'_> {
    fn state(&self) -> &ScanlineState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ScanlineState {
        &mut self.state
    }

    fn rewind_source(&mut self) -> bool {
        self.reference.fill(0xff);
        self.bitpos = 0;
        self.byte_align = self.encoded_byte_align;
        true
    }

    fn read_next_line(&mut self) -> bool {
        let bitsize = self.src.len().saturating_mul(8);
        skip_eol(self.src, bitsize, &mut self.bitpos);
        if self.bitpos >= bitsize {
            return false;
        }

        let start = self.bitpos;
        let columns = i64::from(self.state.geometry().orig_width);
        self.scanline.fill(0xff);
        let one_dimensional = match self.k {
            k if k < 0 => false,
            0 => true,
            _ => next_bit(self.src, bitsize, &mut self.bitpos) == Some(true),
        };
        if one_dimensional {
            decode_1d_row(self.src, bitsize, &mut self.bitpos, &mut self.scanline, columns);
        } else {
            decode_2d_row(
                self.src,
                bitsize,
                &mut self.bitpos,
                &mut self.scanline,
                &self.reference,
                columns,
            );
        }
        if self.k != 0 {
            self.reference.copy_from_slice(&self.scanline);
        }

        if self.end_of_line {
            skip_eol(self.src, bitsize, &mut self.bitpos);
        }
        if self.byte_align && self.bitpos < bitsize {
            self.align_to_byte(bitsize);
        }
        if self.black_is_1 {
            for byte in &mut self.scanline {
                *byte = !*byte;
            }
        }
        log::trace!(
            "CCITTFaxDecode: {} row from bit {} to {}",
            if one_dimensional { "1D" } else { "2D" },
            start,
            self.bitpos
        );
        true
    }

    fn current_line(&self) -> &[u8] {
        &self.scanline
    }

    fn src_offset(&self) -> usize {
        self.bitpos.div_ceil(8).min(self.src.len())
    }
}

/// CCITTFaxDecode filter implementation.
///
/// Decodes every row into packed `ceil(Columns / 8)`-byte rows. When `Rows`
/// is unknown, rows are decoded until the data runs out.
#[derive(Debug, Clone, Default)]
pub struct CcittFaxDecoder {
    params: FaxParams,
    options: DecoderOptions,
}

impl CcittFaxDecoder {
    /// Create a decoder for the given parameters.
    pub fn new(params: FaxParams) -> Self {
        Self {
            params,
            options: DecoderOptions::default(),
        }
    }

    /// Create a decoder with custom limits.
    pub fn with_options(params: FaxParams, options: DecoderOptions) -> Self {
        Self { params, options }
    }
}

impl StreamDecoder for CcittFaxDecoder {
    fn decode(&self, input: &[u8]) -> Result<DecodeOutput> {
        if input.is_empty() {
            return Ok(DecodeOutput::empty());
        }

        let max_rows = i64::from(self.options.max_image_dimension);
        let mut decoder = create_fax_decoder(input, 0, max_rows, &self.params, &self.options)?;
        let row_bytes = pitch_8(1, 1, decoder.width()).unwrap_or(0);
        let rows = decoder.height() as usize;

        let mut output = Vec::new();
        for row in 0..rows {
            match decoder.get_scanline(row) {
                Some(line) => output.extend_from_slice(&line[..row_bytes]),
                None => break,
            }
        }

        log::debug!(
            "CCITTFaxDecode: {} bytes -> {} rows of {} bytes",
            input.len(),
            output.len() / row_bytes.max(1),
            row_bytes
        );
        Ok(DecodeOutput::new(output, decoder.src_offset()))
    }

    fn name(&self) -> &str {
        "CCITTFaxDecode"
    }
}
