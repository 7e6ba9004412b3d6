//! Stream filter codecs.
//!
//! This module provides the codecs behind the PDF stream filters:
//! - FlateDecode (zlib/deflate) - most common
//! - LZWDecode - PDF-flavoured LZW with the `EarlyChange` switch
//! - ASCIIHexDecode / ASCII85Decode - text encodings
//! - RunLengthDecode - PackBits-style run-length encoding
//! - CCITTFaxDecode - Group 3 / Group 4 fax, decode and G4 encode
//! - DCTDecode / JPXDecode - adapters over external JPEG / JPEG 2000 codecs
//! - PNG and TIFF predictors applied after Flate/LZW
//!
//! Byte-oriented filters are chained by the [`pipeline`] driver; image
//! codecs are handed back to the caller and decoded line by line through
//! the [`scanline`] framework.
//!
//! PDF Spec: ISO 32000-1:2008, Section 7.4 - Filters

use crate::error::Result;

mod ascii85;
mod ascii_hex;
pub mod ccitt;
pub mod dct;
mod flate;
pub mod jpx;
mod lzw;
pub mod pipeline;
mod predictor;
mod runlength;
pub mod scanline;

pub use ascii85::{ascii85_decode, ascii85_encode, Ascii85Decoder};
pub use ascii_hex::{hex_decode, hex_encode, AsciiHexDecoder};
pub use ccitt::{create_fax_decoder, fax_g4_decode, CcittFaxDecoder, FaxDecoder, FaxEncoder, FaxParams};
pub use dct::JpegScanlineDecoder;
pub use flate::{flate_decode, flate_encode, flate_or_lzw_decode, FlateDecoder, FlateScanlineDecoder};
pub use lzw::{lzw_decode, lzw_encode, LzwDecoder};
pub use pipeline::{
    create_image_decoder, decode_data, decode_data_with_options, DecoderArray, DecoderEntry,
    DeferredImage, PipelineResult,
};
pub use predictor::{
    decode_png_predictor, decode_tiff_predictor, png_filter_rows, png_predict_line,
    tiff_predict_line, PngFilter, PredictorKind, PredictorParams,
};
pub use runlength::{run_length_decode, run_length_encode, RunLengthDecoder, RunLengthScanlineDecoder};
pub use scanline::{PauseIndicator, ScanlineDecoder, ScanlineGeometry, ScanlineState, SkipStatus};

/// Output of a byte-oriented decode primitive.
///
/// `bytes_consumed` is how much of the input the decoder actually used,
/// which can be less than the input length when the encoded data carries
/// its own end marker (`~>`, `>`, RunLength `128`, LZW code 257).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DecodeOutput {
    /// Decoded bytes
    pub data: Vec<u8>,
    /// Number of input bytes consumed
    pub bytes_consumed: usize,
}

impl DecodeOutput {
    /// Create a decode output.
    pub fn new(data: Vec<u8>, bytes_consumed: usize) -> Self {
        Self {
            data,
            bytes_consumed,
        }
    }

    /// The result of decoding an empty input: no data, nothing consumed.
    pub fn empty() -> Self {
        Self::default()
    }
}

/// PDF stream filter types.
///
/// Only the names this crate treats specially are listed. Any other filter
/// name (JPXDecode, JBIG2Decode, ...) is an opaque image codec identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Filter {
    /// FlateDecode (deflate/zlib compression), abbreviated `Fl`
    FlateDecode,
    /// LZWDecode (Lempel-Ziv-Welch compression), abbreviated `LZW`
    LZWDecode,
    /// ASCII85Decode (base-85 encoding), abbreviated `A85`
    ASCII85Decode,
    /// ASCIIHexDecode (hexadecimal encoding), abbreviated `AHx`
    ASCIIHexDecode,
    /// RunLengthDecode (run-length encoding), abbreviated `RL`
    RunLengthDecode,
    /// CCITTFaxDecode (CCITT Group 3/4 fax), abbreviated `CCF`
    CCITTFaxDecode,
    /// DCTDecode (JPEG compression), abbreviated `DCT`
    DCTDecode,
    /// Crypt (decryption happens before the filter chain)
    Crypt,
}

impl Filter {
    /// Look up a filter by its long or abbreviated name (case-sensitive).
    pub fn from_name(name: &str) -> Option<Filter> {
        match name {
            "FlateDecode" | "Fl" => Some(Filter::FlateDecode),
            "LZWDecode" | "LZW" => Some(Filter::LZWDecode),
            "ASCII85Decode" | "A85" => Some(Filter::ASCII85Decode),
            "ASCIIHexDecode" | "AHx" => Some(Filter::ASCIIHexDecode),
            "RunLengthDecode" | "RL" => Some(Filter::RunLengthDecode),
            "CCITTFaxDecode" | "CCF" => Some(Filter::CCITTFaxDecode),
            "DCTDecode" | "DCT" => Some(Filter::DCTDecode),
            "Crypt" => Some(Filter::Crypt),
            _ => None,
        }
    }

    /// Canonical (long) filter name.
    pub fn name(self) -> &'static str {
        match self {
            Filter::FlateDecode => "FlateDecode",
            Filter::LZWDecode => "LZWDecode",
            Filter::ASCII85Decode => "ASCII85Decode",
            Filter::ASCIIHexDecode => "ASCIIHexDecode",
            Filter::RunLengthDecode => "RunLengthDecode",
            Filter::CCITTFaxDecode => "CCITTFaxDecode",
            Filter::DCTDecode => "DCTDecode",
            Filter::Crypt => "Crypt",
        }
    }

    /// Whether the filter produces bytes for a following filter, so it may
    /// appear anywhere in a chain.
    pub fn is_byte_oriented(self) -> bool {
        matches!(
            self,
            Filter::FlateDecode
                | Filter::LZWDecode
                | Filter::ASCII85Decode
                | Filter::ASCIIHexDecode
                | Filter::RunLengthDecode
        )
    }
}

/// Trait for byte-oriented stream decoders.
///
/// Each decoder implements one PDF filter algorithm. Malformed input is
/// reported through `Err`, never by panicking.
pub trait StreamDecoder {
    /// Decode the input data.
    ///
    /// # Returns
    ///
    /// The decoded bytes and how many input bytes were consumed, or an
    /// error if the input cannot be decoded.
    fn decode(&self, input: &[u8]) -> Result<DecodeOutput>;

    /// Get the name of this decoder (e.g., "FlateDecode").
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_abbreviations() {
        assert_eq!(Filter::from_name("Fl"), Some(Filter::FlateDecode));
        assert_eq!(Filter::from_name("LZW"), Some(Filter::LZWDecode));
        assert_eq!(Filter::from_name("A85"), Some(Filter::ASCII85Decode));
        assert_eq!(Filter::from_name("AHx"), Some(Filter::ASCIIHexDecode));
        assert_eq!(Filter::from_name("RL"), Some(Filter::RunLengthDecode));
        assert_eq!(Filter::from_name("CCF"), Some(Filter::CCITTFaxDecode));
        assert_eq!(Filter::from_name("DCT"), Some(Filter::DCTDecode));
        assert_eq!(Filter::from_name("Crypt"), Some(Filter::Crypt));
    }

    #[test]
    fn test_filter_names_are_case_sensitive() {
        assert_eq!(Filter::from_name("flatedecode"), None);
        assert_eq!(Filter::from_name("ahx"), None);
        assert_eq!(Filter::from_name("JPXDecode"), None);
    }

    #[test]
    fn test_filter_byte_oriented() {
        assert!(Filter::FlateDecode.is_byte_oriented());
        assert!(Filter::RunLengthDecode.is_byte_oriented());
        assert!(!Filter::DCTDecode.is_byte_oriented());
        assert!(!Filter::CCITTFaxDecode.is_byte_oriented());
        assert!(!Filter::Crypt.is_byte_oriented());
    }

    #[test]
    fn test_filter_canonical_name_round_trip() {
        for filter in [
            Filter::FlateDecode,
            Filter::LZWDecode,
            Filter::ASCII85Decode,
            Filter::ASCIIHexDecode,
            Filter::RunLengthDecode,
            Filter::CCITTFaxDecode,
            Filter::DCTDecode,
            Filter::Crypt,
        ] {
            assert_eq!(Filter::from_name(filter.name()), Some(filter));
        }
    }

    #[test]
    fn test_decode_output_empty() {
        let out = DecodeOutput::empty();
        assert!(out.data.is_empty());
        assert_eq!(out.bytes_consumed, 0);
    }
}
