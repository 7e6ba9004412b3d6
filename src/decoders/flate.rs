//! FlateDecode (zlib/deflate) implementation.
//!
//! This is the most common PDF compression filter. Uses the flate2 crate
//! for zlib decompression, one bounded output chunk at a time so the total
//! output can be capped.
//!
//! PDF Spec: ISO 32000-1:2008, Section 7.4.4 - LZWDecode and FlateDecode Filters

use crate::decoder_config::DecoderOptions;
use crate::decoders::lzw::lzw_decode;
use crate::decoders::predictor::{png_predict_line, tiff_predict_line, PredictorKind, PredictorParams};
use crate::decoders::scanline::{pitch_8, ScanlineDecoder, ScanlineGeometry, ScanlineState};
use crate::decoders::{DecodeOutput, StreamDecoder};
use crate::error::{Error, Result};
use crate::object::{integer_for, Dictionary};
use flate2::write::ZlibEncoder;
use flate2::{Compression, Decompress, FlushDecompress, Status};
use std::io::Write;

/// Smallest output chunk handed to the inflater.
const MIN_CHUNK_SIZE: usize = 1024;

/// FlateDecode filter implementation.
///
/// Decompresses data using the zlib/deflate algorithm, then reverses the
/// predictor if one is configured.
#[derive(Debug, Clone, Default)]
pub struct FlateDecoder {
    predictor: PredictorParams,
    estimated_size: usize,
    options: DecoderOptions,
}

impl FlateDecoder {
    /// Create a decoder without predictor and with default limits.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reverse this predictor after decompression.
    pub fn with_predictor(mut self, predictor: PredictorParams) -> Self {
        self.predictor = predictor;
        self
    }

    /// Size hint for the decompressed data (0 = unknown).
    pub fn with_estimated_size(mut self, estimated_size: usize) -> Self {
        self.estimated_size = estimated_size;
        self
    }

    /// Use custom limits and recovery mode.
    pub fn with_options(mut self, options: DecoderOptions) -> Self {
        self.options = options;
        self
    }
}

impl StreamDecoder for FlateDecoder {
    fn decode(&self, input: &[u8]) -> Result<DecodeOutput> {
        let output = flate_decode(input, self.estimated_size, &self.options)?;
        apply_predictor(output, &self.predictor)
    }

    fn name(&self) -> &str {
        "FlateDecode"
    }
}

/// Reverse `predictor` on decoded output, keeping the consumed count.
pub(crate) fn apply_predictor(output: DecodeOutput, predictor: &PredictorParams) -> Result<DecodeOutput> {
    if !predictor.is_active() || output.data.is_empty() {
        return Ok(output);
    }
    let data = predictor.apply(output.data)?;
    Ok(DecodeOutput::new(data, output.bytes_consumed))
}

/// Inflate `input` into `output`, returning the number of input bytes used.
fn inflate(
    input: &[u8],
    zlib_header: bool,
    chunk_size: usize,
    options: &DecoderOptions,
    output: &mut Vec<u8>,
) -> std::result::Result<usize, (usize, flate2::DecompressError)> {
    let mut stream = Decompress::new(zlib_header);
    let mut chunk = vec![0u8; chunk_size];
    loop {
        let in_before = stream.total_in();
        let out_before = stream.total_out();
        let offset = (in_before as usize).min(input.len());
        let status = stream.decompress(&input[offset..], &mut chunk, FlushDecompress::None);
        let written = (stream.total_out() - out_before) as usize;
        output.extend_from_slice(&chunk[..written]);
        let consumed = stream.total_in() as usize;

        match status {
            Ok(Status::StreamEnd) => return Ok(consumed),
            Ok(_) => {
                let stalled = written == 0 && stream.total_in() == in_before;
                let drained = written < chunk.len() && consumed >= input.len();
                if stalled || drained {
                    return Ok(consumed);
                }
            },
            Err(e) => return Err((consumed, e)),
        }

        if output.len() > options.max_flate_output {
            // Reported by the caller
            return Ok(consumed);
        }
    }
}

/// Decompress zlib data.
///
/// `estimated_size` only sizes the first output chunk (0 = unknown). If the
/// zlib stream fails before producing anything, the data is retried as raw
/// deflate. Corruption after some output is kept in lenient mode and is an
/// error in strict mode.
pub fn flate_decode(input: &[u8], estimated_size: usize, options: &DecoderOptions) -> Result<DecodeOutput> {
    if input.is_empty() {
        return Ok(DecodeOutput::empty());
    }

    let guess = if estimated_size > 0 {
        estimated_size
    } else {
        input.len().saturating_mul(2)
    };
    let chunk_size = guess.min(options.max_initial_alloc).max(MIN_CHUNK_SIZE);

    let mut output = Vec::new();
    let consumed = match inflate(input, true, chunk_size, options, &mut output) {
        Ok(consumed) => consumed,
        Err((_, zlib_err)) if output.is_empty() => {
            // Some producers write raw deflate data without the zlib wrapper
            log::info!("Zlib decode failed ({}), trying raw deflate", zlib_err);
            match inflate(input, false, chunk_size, options, &mut output) {
                Ok(consumed) if !output.is_empty() => consumed,
                Ok(_) => return Err(Error::Decode(format!("FlateDecode failed: {}", zlib_err))),
                Err((consumed, deflate_err)) => {
                    if output.is_empty() {
                        return Err(Error::Decode(format!(
                            "FlateDecode failed: zlib error: {}, deflate error: {}",
                            zlib_err, deflate_err
                        )));
                    }
                    recover(&output, deflate_err, options)?;
                    consumed
                },
            }
        },
        Err((consumed, e)) => {
            recover(&output, e, options)?;
            consumed
        },
    };

    if output.len() > options.max_flate_output {
        return Err(Error::limit("FlateDecode output", options.max_flate_output));
    }
    log::debug!("FlateDecode: {} -> {} bytes", consumed, output.len());
    Ok(DecodeOutput::new(output, consumed))
}

fn recover(output: &[u8], err: flate2::DecompressError, options: &DecoderOptions) -> Result<()> {
    if options.strict {
        return Err(Error::Decode(format!(
            "FlateDecode error after {} bytes: {}",
            output.len(),
            err
        )));
    }
    log::warn!(
        "FlateDecode partial recovery: extracted {} bytes before corruption: {}",
        output.len(),
        err
    );
    Ok(())
}

/// Decode Flate or LZW data and reverse the predictor named in `params`.
///
/// `params` is the filter's `DecodeParms` dictionary. Predictor geometry is
/// validated before any decoding starts; `EarlyChange` (default 1) only
/// matters for LZW.
pub fn flate_or_lzw_decode(
    use_lzw: bool,
    input: &[u8],
    params: Option<&Dictionary>,
    estimated_size: usize,
    options: &DecoderOptions,
) -> Result<DecodeOutput> {
    let predictor = PredictorParams::from_dict(params)?;
    let output = if use_lzw {
        let early_change = integer_for(params, "EarlyChange", 1) != 0;
        lzw_decode(input, early_change, options)?
    } else {
        flate_decode(input, estimated_size, options)?
    };
    apply_predictor(output, &predictor)
}

/// Compress data with zlib at the default compression level.
pub fn flate_encode(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::with_capacity(data.len() / 2 + 16), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

/// Inflate into `dest` until it is full or the stream cannot continue; the
/// unfilled tail is zeroed.
fn inflate_line(stream: &mut Decompress, src: &[u8], dest: &mut [u8]) {
    let mut written = 0;
    while written < dest.len() {
        let in_before = stream.total_in();
        let out_before = stream.total_out();
        let offset = (in_before as usize).min(src.len());
        let status = stream.decompress(&src[offset..], &mut dest[written..], FlushDecompress::Sync);
        let n = (stream.total_out() - out_before) as usize;
        written += n;
        match status {
            Ok(Status::StreamEnd) | Err(_) => break,
            Ok(_) if n == 0 && stream.total_in() == in_before => break,
            Ok(_) => {},
        }
    }
    dest[written..].fill(0);
}

/// Predictor state of a [`FlateScanlineDecoder`].
struct LinePredictor {
    kind: PredictorKind,
    colors: u32,
    bits_per_component: u32,
    columns: u32,
    /// Bytes per predicted row (without the PNG tag)
    pitch: usize,
    last_line: Vec<u8>,
    buffer: Vec<u8>,
    raw: Vec<u8>,
    left_over: usize,
}

impl LinePredictor {
    fn bytes_per_pixel(&self) -> usize {
        (self.colors as usize * self.bits_per_component as usize).div_ceil(8)
    }

    /// Inflate and reconstruct the next predicted row into `buffer`.
    fn predict_next(&mut self, stream: &mut Decompress, src: &[u8]) {
        match self.kind {
            PredictorKind::Png => {
                inflate_line(stream, src, &mut self.raw);
                let bpp = self.bytes_per_pixel();
                png_predict_line(&mut self.buffer, &self.raw, Some(&self.last_line), bpp);
                self.last_line.copy_from_slice(&self.buffer);
            },
            _ => {
                inflate_line(stream, src, &mut self.buffer);
                tiff_predict_line(&mut self.buffer, self.bits_per_component, self.colors, self.columns);
            },
        }
    }
}

/// Scanline decoder over Flate-compressed image samples.
///
/// Inflates one `ceil(width * components * bpc / 8)`-byte row per call,
/// reversing a PNG or TIFF predictor when one is configured. Rows that the
/// stream cannot fill are zero-padded.
pub struct FlateScanlineDecoder<'a> {
    state: ScanlineState,
    src: &'a [u8],
    stream: Decompress,
    scanline: Vec<u8>,
    predictor: Option<LinePredictor>,
}

impl<'a> FlateScanlineDecoder<'a> {
    /// Create a decoder for a `width` x `height` image.
    ///
    /// A predictor whose geometry multiplies out to zero takes the image
    /// geometry instead.
    pub fn create(
        src: &'a [u8],
        width: u32,
        height: u32,
        components: u32,
        bits_per_component: u32,
        predictor: &PredictorParams,
    ) -> Result<Self> {
        if width == 0 || height == 0 || components == 0 || bits_per_component == 0 {
            return Err(Error::InvalidParameter(format!(
                "Flate image geometry {}x{}x{}@{}bpc",
                width, height, components, bits_per_component
            )));
        }
        let pitch = pitch_8(bits_per_component, components, width)
            .ok_or_else(|| Error::limit("Flate image pitch", usize::MAX))?;

        let predictor = if predictor.is_active() {
            let (colors, bpc, columns) =
                if predictor.colors == 0 || predictor.bits_per_component == 0 || predictor.columns == 0 {
                    (components, bits_per_component, width)
                } else {
                    (predictor.colors, predictor.bits_per_component, predictor.columns)
                };
            let predict_pitch = pitch_8(bpc, colors, columns)
                .ok_or_else(|| Error::limit("Flate predictor pitch", usize::MAX))?;
            Some(LinePredictor {
                kind: predictor.kind,
                colors,
                bits_per_component: bpc,
                columns,
                pitch: predict_pitch,
                last_line: vec![0; predict_pitch],
                buffer: vec![0; predict_pitch],
                raw: vec![0; predict_pitch + 1],
                left_over: 0,
            })
        } else {
            None
        };

        Ok(Self {
            state: ScanlineState::new(ScanlineGeometry::new(width, height, components, bits_per_component, pitch)),
            src,
            stream: Decompress::new(true),
            scanline: vec![0; pitch],
            predictor,
        })
    }
}

impl ScanlineDecoder for FlateScanlineDecoder<'_> {
    fn state(&self) -> &ScanlineState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ScanlineState {
        &mut self.state
    }

    fn rewind_source(&mut self) -> bool {
        self.stream.reset(true);
        self.scanline.fill(0);
        if let Some(predictor) = self.predictor.as_mut() {
            predictor.left_over = 0;
            predictor.last_line.fill(0);
        }
        true
    }

    fn read_next_line(&mut self) -> bool {
        let geometry = *self.state.geometry();
        let pitch = self.scanline.len();
        let Some(predictor) = self.predictor.as_mut() else {
            inflate_line(&mut self.stream, self.src, &mut self.scanline);
            return true;
        };

        if predictor.pitch == pitch {
            match predictor.kind {
                PredictorKind::Png => {
                    inflate_line(&mut self.stream, self.src, &mut predictor.raw);
                    png_predict_line(
                        &mut self.scanline,
                        &predictor.raw,
                        Some(&predictor.last_line),
                        predictor.bytes_per_pixel(),
                    );
                    predictor.last_line.copy_from_slice(&self.scanline);
                },
                _ => {
                    inflate_line(&mut self.stream, self.src, &mut self.scanline);
                    tiff_predict_line(
                        &mut self.scanline,
                        geometry.bits_per_component,
                        geometry.components,
                        geometry.orig_width,
                    );
                },
            }
            return true;
        }

        // Predicted rows and image rows differ in width: carry leftovers
        let mut filled = predictor.left_over.min(pitch);
        if filled > 0 {
            let start = predictor.pitch - predictor.left_over;
            self.scanline[..filled].copy_from_slice(&predictor.buffer[start..start + filled]);
            predictor.left_over -= filled;
        }
        while filled < pitch {
            predictor.predict_next(&mut self.stream, self.src);
            let n = predictor.pitch.min(pitch - filled);
            self.scanline[filled..filled + n].copy_from_slice(&predictor.buffer[..n]);
            predictor.left_over += predictor.pitch - n;
            filled += n;
        }
        true
    }

    fn current_line(&self) -> &[u8] {
        &self.scanline
    }

    fn src_offset(&self) -> usize {
        (self.stream.total_in() as usize).min(self.src.len())
    }
}
