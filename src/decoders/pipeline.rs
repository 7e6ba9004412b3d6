//! Filter chain driver.
//!
//! A stream's `Filter` entry names the filters to apply in order, each with
//! an optional `DecodeParms` dictionary. Byte-oriented filters are run here
//! one after another. An image codec ends the chain: its still-encoded
//! bytes go back to the caller, who decodes them line by line through
//! [`create_image_decoder`] or an external codec.
//!
//! PDF Spec: ISO 32000-1:2008, Section 7.3.8.2 - Stream Extent

use crate::decoder_config::DecoderOptions;
use crate::decoders::ccitt::{create_fax_decoder, FaxParams};
use crate::decoders::dct::JpegScanlineDecoder;
use crate::decoders::flate::{flate_or_lzw_decode, FlateScanlineDecoder};
use crate::decoders::predictor::PredictorParams;
use crate::decoders::runlength::{run_length_decode, RunLengthScanlineDecoder};
use crate::decoders::scanline::ScanlineDecoder;
use crate::decoders::{ascii85_decode, hex_decode, Filter};
use crate::error::{Error, Result};
use crate::object::{integer_for, Dictionary, Object};

/// One filter of a chain: its name as written and its decode parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct DecoderEntry {
    /// Filter name, long or abbreviated
    pub name: String,
    /// `DecodeParms` dictionary for this filter
    pub params: Option<Dictionary>,
}

impl DecoderEntry {
    /// Create an entry.
    pub fn new(name: impl Into<String>, params: Option<Dictionary>) -> Self {
        Self {
            name: name.into(),
            params,
        }
    }
}

/// Validated filter chain of a stream.
///
/// Every entry except the last is a byte-oriented filter; only the last may
/// be an image codec or `Crypt`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecoderArray {
    entries: Vec<DecoderEntry>,
}

impl DecoderArray {
    /// Build a chain from entries, rejecting an image codec or unknown
    /// filter anywhere but at the end.
    pub fn new(entries: Vec<DecoderEntry>) -> Result<Self> {
        if let Some((_, init)) = entries.split_last() {
            if let Some(entry) = init
                .iter()
                .find(|entry| !Filter::from_name(&entry.name).is_some_and(Filter::is_byte_oriented))
            {
                return Err(Error::MalformedFilterChain(format!(
                    "{} can only be the last filter",
                    entry.name
                )));
            }
        }
        Ok(Self { entries })
    }

    /// Read the `Filter` and `DecodeParms` entries of a stream dictionary.
    ///
    /// `Filter` is a name or an array of names; with an array, `DecodeParms`
    /// is an array of the same length whose elements may be `null`. A
    /// missing `Filter` gives an empty chain.
    pub fn from_stream_dict(dict: &Dictionary) -> Result<Self> {
        let params = dict.get("DecodeParms");
        match dict.get("Filter") {
            None => Ok(Self::default()),
            Some(Object::Name(name)) => {
                let params = params.and_then(as_params);
                Ok(Self {
                    entries: vec![DecoderEntry::new(name.clone(), params)],
                })
            },
            Some(Object::Array(filters)) => {
                let params = params.and_then(Object::as_array);
                let entries = filters
                    .iter()
                    .enumerate()
                    .map(|(i, filter)| {
                        let name = filter.as_name().ok_or_else(|| {
                            Error::MalformedFilterChain(format!(
                                "filter {} is a {}, not a name",
                                i,
                                filter.type_name()
                            ))
                        })?;
                        let params = params.and_then(|params| params.get(i)).and_then(as_params);
                        Ok(DecoderEntry::new(name, params))
                    })
                    .collect::<Result<Vec<_>>>()?;
                Self::new(entries)
            },
            Some(other) => Err(Error::MalformedFilterChain(format!(
                "Filter is a {}, not a name or array",
                other.type_name()
            ))),
        }
    }

    /// The filters in application order.
    pub fn entries(&self) -> &[DecoderEntry] {
        &self.entries
    }

    /// Number of filters.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the chain has no filters.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn as_params(object: &Object) -> Option<Dictionary> {
    match object {
        Object::Dictionary(dict) => Some(dict.clone()),
        _ => None,
    }
}

/// Still-encoded image data at the end of a filter chain.
#[derive(Debug, Clone, PartialEq)]
pub struct DeferredImage {
    /// Output of the byte-oriented filters before the image codec
    pub data: Vec<u8>,
    /// Canonical name of the codec that has to finish decoding
    pub image_encoding: String,
    /// `DecodeParms` of that codec
    pub image_params: Option<Dictionary>,
}

/// Result of running a filter chain.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineResult {
    /// Every filter ran; the data is fully decoded
    Decoded(Vec<u8>),
    /// The chain ends in an image codec that has not run yet
    Deferred(DeferredImage),
}

impl PipelineResult {
    /// The decoded data, or the encoded data of a deferred image.
    pub fn data(&self) -> &[u8] {
        match self {
            PipelineResult::Decoded(data) => data,
            PipelineResult::Deferred(image) => &image.data,
        }
    }

    /// Consume the result and return its bytes.
    pub fn into_data(self) -> Vec<u8> {
        match self {
            PipelineResult::Decoded(data) => data,
            PipelineResult::Deferred(image) => image.data,
        }
    }
}

/// Run a filter chain with default [`DecoderOptions`].
///
/// See [`decode_data_with_options`].
///
/// # Examples
///
/// ```
/// use pdf_filters::decoders::{decode_data, DecoderArray, DecoderEntry, PipelineResult};
///
/// let chain = DecoderArray::new(vec![
///     DecoderEntry::new("AHx", None),
///     DecoderEntry::new("RL", None),
/// ])
/// .unwrap();
///
/// // "00 41 FF 42 80" in hex
/// let result = decode_data(b"0041FF4280>", 0, false, &chain).unwrap();
/// assert_eq!(result, PipelineResult::Decoded(b"ABB".to_vec()));
/// ```
pub fn decode_data(
    data: &[u8],
    estimated_size: usize,
    image_acc: bool,
    decoders: &DecoderArray,
) -> Result<PipelineResult> {
    decode_data_with_options(data, estimated_size, image_acc, decoders, &DecoderOptions::default())
}

/// Run a filter chain.
///
/// `estimated_size` is a sizing hint for the output of the last filter.
/// With `image_acc` set, a trailing FlateDecode or RunLengthDecode is not
/// run but returned as a [`DeferredImage`] so the caller can decode it row
/// by row. Any image codec at the end of the chain is always deferred.
/// `Crypt` entries are skipped; decryption happens before this point.
///
/// A failing filter fails the whole chain.
pub fn decode_data_with_options(
    data: &[u8],
    estimated_size: usize,
    image_acc: bool,
    decoders: &DecoderArray,
    options: &DecoderOptions,
) -> Result<PipelineResult> {
    let mut current = data.to_vec();
    let count = decoders.len();
    for (i, entry) in decoders.entries().iter().enumerate() {
        let is_last = i + 1 == count;
        let estimated = if is_last { estimated_size } else { 0 };
        let params = entry.params.as_ref();

        let filter = Filter::from_name(&entry.name);
        let output = match filter {
            Some(Filter::Crypt) => continue,
            Some(Filter::FlateDecode) if !(image_acc && is_last) => {
                flate_or_lzw_decode(false, &current, params, estimated, options)?
            },
            Some(Filter::LZWDecode) => flate_or_lzw_decode(true, &current, params, estimated, options)?,
            Some(Filter::ASCII85Decode) => ascii85_decode(&current)?,
            Some(Filter::ASCIIHexDecode) => hex_decode(&current)?,
            Some(Filter::RunLengthDecode) if !(image_acc && is_last) => run_length_decode(&current, options)?,
            _ => {
                let image_encoding = filter.map_or(entry.name.as_str(), |filter| filter.name()).to_string();
                log::debug!(
                    "Filter chain: deferring {} ({} bytes) to the image decoder",
                    image_encoding,
                    current.len()
                );
                return Ok(PipelineResult::Deferred(DeferredImage {
                    data: current,
                    image_encoding,
                    image_params: entry.params.clone(),
                }));
            },
        };

        log::debug!(
            "Filter chain: {} decoded {} of {} bytes into {}",
            entry.name,
            output.bytes_consumed,
            current.len(),
            output.data.len()
        );
        current = output.data;
    }
    Ok(PipelineResult::Decoded(current))
}

/// Create a scanline decoder for a deferred image.
///
/// `width`, `height`, `components` and `bits_per_component` come from the
/// image dictionary. Handles FlateDecode (with its predictor),
/// RunLengthDecode, CCITTFaxDecode and DCTDecode; other codecs fail with
/// [`Error::UnsupportedFilter`].
pub fn create_image_decoder<'a>(
    image: &'a DeferredImage,
    width: u32,
    height: u32,
    components: u32,
    bits_per_component: u32,
    options: &DecoderOptions,
) -> Result<Box<dyn ScanlineDecoder + 'a>> {
    let params = image.image_params.as_ref();
    let data = image.data.as_slice();
    match Filter::from_name(&image.image_encoding) {
        Some(Filter::FlateDecode) => {
            let predictor = PredictorParams::from_dict(params)?;
            Ok(Box::new(FlateScanlineDecoder::create(
                data,
                width,
                height,
                components,
                bits_per_component,
                &predictor,
            )?))
        },
        Some(Filter::RunLengthDecode) => Ok(Box::new(RunLengthScanlineDecoder::create(
            data,
            width,
            height,
            components,
            bits_per_component,
        )?)),
        Some(Filter::CCITTFaxDecode) => {
            let fax = FaxParams::from_dict(params);
            Ok(Box::new(create_fax_decoder(
                data,
                i64::from(width),
                i64::from(height),
                &fax,
                options,
            )?))
        },
        Some(Filter::DCTDecode) => {
            let color_transform = params.is_some() && integer_for(params, "ColorTransform", 1) != 0;
            Ok(Box::new(JpegScanlineDecoder::create(
                data,
                width,
                height,
                components,
                color_transform,
            )?))
        },
        _ => Err(Error::UnsupportedFilter(image.image_encoding.clone())),
    }
}
