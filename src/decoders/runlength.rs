//! RunLengthDecode implementation.
//!
//! Decodes run-length encoded data according to PDF specification:
//! - Length byte 0-127: Copy next N+1 bytes literally
//! - Length byte 128: EOD marker
//! - Length byte 129-255: Repeat next byte 257-N times
//!
//! Truncated data is tolerated: a literal run cut short by the end of input
//! is zero-filled and a repeat run without its fill byte repeats zero.
//!
//! PDF Spec: ISO 32000-1:2008, Section 7.4.5 - RunLengthDecode Filter

use crate::decoder_config::DecoderOptions;
use crate::decoders::scanline::{pitch_32, pitch_8, ScanlineDecoder, ScanlineGeometry, ScanlineState};
use crate::decoders::{DecodeOutput, StreamDecoder};
use crate::error::{Error, Result};

const EOD: u8 = 128;

/// Longest run a single length byte can describe.
const MAX_RUN: usize = 128;

/// RunLengthDecode filter implementation.
#[derive(Debug, Clone, Default)]
pub struct RunLengthDecoder {
    options: DecoderOptions,
}

impl RunLengthDecoder {
    /// Create a decoder with default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a decoder with custom limits.
    pub fn with_options(options: DecoderOptions) -> Self {
        Self { options }
    }
}

impl StreamDecoder for RunLengthDecoder {
    fn decode(&self, input: &[u8]) -> Result<DecodeOutput> {
        run_length_decode(input, &self.options)
    }

    fn name(&self) -> &str {
        "RunLengthDecode"
    }
}

/// Size of the decoded data, computed without decoding.
///
/// Stops at the EOD marker; runs cut off by the end of input still count
/// at full length.
fn decoded_size(input: &[u8]) -> Option<usize> {
    let mut size = 0usize;
    let mut i = 0;
    while i < input.len() {
        let op = input[i];
        if op == EOD {
            break;
        }
        if op < EOD {
            size = size.checked_add(usize::from(op) + 1)?;
            i += usize::from(op) + 2;
        } else {
            size = size.checked_add(257 - usize::from(op))?;
            i += 2;
        }
    }
    Some(size)
}

/// Decode run-length data.
///
/// The decoded size is computed up front and must stay below
/// `options.max_run_length_output`. `bytes_consumed` includes the EOD
/// marker when one is present.
pub fn run_length_decode(input: &[u8], options: &DecoderOptions) -> Result<DecodeOutput> {
    if input.is_empty() {
        return Ok(DecodeOutput::empty());
    }

    let limit = options.max_run_length_output;
    let size = decoded_size(input).ok_or_else(|| Error::limit("RunLength output size", limit))?;
    if size >= limit {
        return Err(Error::limit("RunLength output", limit));
    }

    let mut output = vec![0u8; size];
    let mut count = 0usize;
    let mut i = 0usize;
    while i < input.len() {
        let op = input[i];
        if op == EOD {
            break;
        }
        if op < EOD {
            let run = usize::from(op) + 1;
            let available = run.min(input.len() - i - 1);
            if available < run {
                log::warn!(
                    "RunLengthDecode: literal run truncated ({} of {} bytes), zero-filling",
                    available,
                    run
                );
            }
            output[count..count + available].copy_from_slice(&input[i + 1..i + 1 + available]);
            count += run;
            i += run + 1;
        } else {
            let run = 257 - usize::from(op);
            let fill = input.get(i + 1).copied().unwrap_or(0);
            output[count..count + run].fill(fill);
            count += run;
            i += 2;
        }
    }

    Ok(DecodeOutput::new(output, (i + 1).min(input.len())))
}

/// Encode data with run-length (PackBits) encoding, terminated by EOD.
///
/// Runs of two or more equal bytes become repeat runs; everything else is
/// grouped into literal runs of at most 128 bytes.
pub fn run_length_encode(input: &[u8]) -> Vec<u8> {
    let mut output = Vec::with_capacity(input.len() + input.len() / MAX_RUN + 2);
    let mut i = 0;
    while i < input.len() {
        let byte = input[i];
        let mut run = 1;
        while i + run < input.len() && run < MAX_RUN && input[i + run] == byte {
            run += 1;
        }
        if run >= 2 {
            output.push((257 - run) as u8);
            output.push(byte);
            i += run;
            continue;
        }

        let start = i;
        i += 1;
        while i < input.len() && i - start < MAX_RUN {
            if i + 1 < input.len() && input[i] == input[i + 1] {
                break;
            }
            i += 1;
        }
        output.push((i - start - 1) as u8);
        output.extend_from_slice(&input[start..i]);
    }
    output.push(EOD);
    output
}

/// Scanline decoder over run-length encoded image data.
///
/// Runs may span rows: a run that does not fit the current row continues at
/// the start of the next one.
pub struct RunLengthScanlineDecoder<'a> {
    state: ScanlineState,
    src: &'a [u8],
    scanline: Vec<u8>,
    line_bytes: usize,
    src_offset: usize,
    eod: bool,
    operator: u8,
}

impl<'a> RunLengthScanlineDecoder<'a> {
    /// Create a decoder for a `width` x `height` image.
    ///
    /// Fails if the geometry is empty or overflows, or if the encoded data
    /// cannot cover the whole image.
    pub fn create(src: &'a [u8], width: u32, height: u32, components: u32, bits_per_component: u32) -> Result<Self> {
        if width == 0 || height == 0 || components == 0 || bits_per_component == 0 {
            return Err(Error::InvalidParameter(format!(
                "RunLength image geometry {}x{}x{}@{}bpc",
                width, height, components, bits_per_component
            )));
        }
        let pitch = pitch_32(bits_per_component, components, width)
            .ok_or_else(|| Error::limit("RunLength image pitch", usize::MAX))?;
        let line_bytes = pitch_8(bits_per_component, components, width)
            .ok_or_else(|| Error::limit("RunLength image row", usize::MAX))?;
        check_dest_size(src, width, height, components, bits_per_component)?;

        Ok(Self {
            state: ScanlineState::new(ScanlineGeometry::new(width, height, components, bits_per_component, pitch)),
            src,
            scanline: vec![0; pitch],
            line_bytes,
            src_offset: 0,
            eod: false,
            operator: 0,
        })
    }

    fn next_operator(&mut self) {
        match self.src.get(self.src_offset) {
            Some(&op) => {
                self.operator = op;
                self.src_offset += 1;
            },
            None => self.operator = EOD,
        }
    }

    /// Account for `used` output bytes produced from the current run.
    fn update_operator(&mut self, used: usize) {
        if used == 0 {
            return;
        }
        if self.operator < EOD {
            let run = usize::from(self.operator) + 1;
            if used == run {
                self.src_offset += used;
                self.next_operator();
                return;
            }
            // A literal run never exceeds 128 bytes, so the remainder fits
            self.operator -= used as u8;
            self.src_offset += used;
            if self.src_offset >= self.src.len() {
                self.operator = EOD;
            }
            return;
        }

        let run = 257 - usize::from(self.operator);
        if used == run {
            self.src_offset += 1;
            self.next_operator();
            return;
        }
        self.operator = (257 - (run - used)) as u8;
    }
}

/// Check that the encoded data decodes to at least one full image.
fn check_dest_size(src: &[u8], width: u32, height: u32, components: u32, bits_per_component: u32) -> Result<()> {
    let size = decoded_size(src).ok_or_else(|| Error::limit("RunLength output size", usize::MAX))?;
    let needed_bits = (width as u128) * (height as u128) * (components as u128) * (bits_per_component as u128);
    let needed = (needed_bits + 7) / 8;
    if needed > size as u128 {
        return Err(Error::Decode(format!(
            "RunLength data decodes to {} bytes, image needs {}",
            size, needed
        )));
    }
    Ok(())
}

impl ScanlineDecoder for RunLengthScanlineDecoder<'_> {
    fn state(&self) -> &ScanlineState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ScanlineState {
        &mut self.state
    }

    fn rewind_source(&mut self) -> bool {
        self.scanline.fill(0);
        self.src_offset = 0;
        self.eod = false;
        self.operator = 0;
        true
    }

    fn read_next_line(&mut self) -> bool {
        if self.src_offset == 0 {
            self.next_operator();
        } else if self.eod {
            return false;
        }

        self.scanline.fill(0);
        let mut col = 0usize;
        let mut eol = false;
        while self.src_offset < self.src.len() && !eol {
            if self.operator < EOD {
                let mut copy_len = usize::from(self.operator) + 1;
                if col + copy_len >= self.line_bytes {
                    copy_len = self.line_bytes - col;
                    eol = true;
                }
                let remaining = self.src.len() - self.src_offset;
                if copy_len >= remaining {
                    copy_len = remaining;
                    self.eod = true;
                }
                self.scanline[col..col + copy_len]
                    .copy_from_slice(&self.src[self.src_offset..self.src_offset + copy_len]);
                col += copy_len;
                self.update_operator(copy_len);
            } else if self.operator > EOD {
                let fill = self.src.get(self.src_offset).copied().unwrap_or(0);
                let mut dup_len = 257 - usize::from(self.operator);
                if col + dup_len >= self.line_bytes {
                    dup_len = self.line_bytes - col;
                    eol = true;
                }
                self.scanline[col..col + dup_len].fill(fill);
                col += dup_len;
                self.update_operator(dup_len);
            } else {
                self.eod = true;
                break;
            }
        }
        true
    }

    fn current_line(&self) -> &[u8] {
        &self.scanline
    }

    fn src_offset(&self) -> usize {
        self.src_offset
    }
}
