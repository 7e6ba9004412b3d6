//! Integration tests for the filter chain driver.
//!
//! Covers chain parsing from stream dictionaries, deferral of image codecs,
//! failure propagation, and scanline decoders created from deferred images.

use bytes::Bytes;
use pdf_filters::decoder_config::DecoderOptions;
use pdf_filters::decoders::{
    ascii85_encode, create_image_decoder, decode_data, decode_data_with_options, flate_encode, hex_encode,
    lzw_encode, png_filter_rows, run_length_encode, DecoderArray, DecoderEntry, FaxEncoder, PngFilter,
    PipelineResult, PredictorParams, ScanlineDecoder,
};
use pdf_filters::object::{Dictionary, Object};
use pdf_filters::Error;

fn name(name: &str) -> Object {
    Object::Name(name.to_string())
}

fn stream(filter: Object, params: Option<Object>, data: Vec<u8>) -> Object {
    let mut dict = Dictionary::new();
    dict.insert("Length".to_string(), Object::Integer(data.len() as i64));
    dict.insert("Filter".to_string(), filter);
    if let Some(params) = params {
        dict.insert("DecodeParms".to_string(), params);
    }
    Object::Stream {
        dict,
        data: Bytes::from(data),
    }
}

fn ints(entries: &[(&str, i64)]) -> Dictionary {
    entries
        .iter()
        .map(|(key, value)| (key.to_string(), Object::Integer(*value)))
        .collect()
}

#[test]
fn test_ascii85_flate_chain_decodes_or_defers() {
    let original = b"Deferred image samples, or fully decoded bytes.".repeat(10);
    let encoded = ascii85_encode(&flate_encode(&original).unwrap());
    let decoders = DecoderArray::new(vec![
        DecoderEntry::new("ASCII85Decode", None),
        DecoderEntry::new("FlateDecode", None),
    ])
    .unwrap();

    let result = decode_data(&encoded, 0, false, &decoders).unwrap();
    assert_eq!(result, PipelineResult::Decoded(original.clone()));

    match decode_data(&encoded, original.len(), true, &decoders).unwrap() {
        PipelineResult::Deferred(image) => {
            assert_eq!(image.image_encoding, "FlateDecode");
            assert_eq!(image.data, flate_encode(&original).unwrap());
            assert!(image.image_params.is_none());
        },
        other => panic!("expected deferred Flate, got {:?}", other),
    }
}

#[test]
fn test_flate_not_last_is_never_deferred() {
    let original = b"inner".to_vec();
    let encoded = flate_encode(&hex_encode(&original)).unwrap();
    let decoders = DecoderArray::new(vec![
        DecoderEntry::new("Fl", None),
        DecoderEntry::new("AHx", None),
    ])
    .unwrap();
    let result = decode_data(&encoded, 0, true, &decoders).unwrap();
    assert_eq!(result, PipelineResult::Decoded(original));
}

#[test]
fn test_degenerate_predictor_rejects_stream() {
    let params = ints(&[("Predictor", 15), ("Colors", 3), ("BitsPerComponent", 8), ("Columns", 0)]);
    let stream = stream(
        name("FlateDecode"),
        Some(Object::Dictionary(params)),
        flate_encode(b"anything").unwrap(),
    );
    assert!(matches!(stream.decode_stream_data(), Err(Error::InvalidParameter(_))));
}

#[test]
fn test_stream_with_predictor_params_array() {
    let rows: Vec<u8> = (0..48u8).collect();
    let predictor = PredictorParams::new(12, 1, 8, 8).unwrap();
    let predicted = png_filter_rows(&rows, &predictor, PngFilter::Up).unwrap();
    let encoded = hex_encode(&lzw_encode(&predicted, true).unwrap());

    let params = Object::Array(vec![
        Object::Null,
        Object::Dictionary(ints(&[("Predictor", 12), ("Columns", 8)])),
    ]);
    let stream = stream(Object::Array(vec![name("AHx"), name("LZW")]), Some(params), encoded);
    assert_eq!(stream.decode_stream_data().unwrap(), PipelineResult::Decoded(rows));
}

#[test]
fn test_image_codec_must_be_last() {
    let stream = stream(Object::Array(vec![name("DCTDecode"), name("FlateDecode")]), None, vec![1, 2, 3]);
    assert!(matches!(stream.decode_stream_data(), Err(Error::MalformedFilterChain(_))));
}

#[test]
fn test_broken_stage_fails_chain() {
    // Hex stage succeeds, the bytes it yields are neither zlib nor deflate
    let stream = stream(
        Object::Array(vec![name("AHx"), name("FlateDecode")]),
        None,
        b"FFFFFFFFFFFFFFFF>".to_vec(),
    );
    assert!(stream.decode_stream_data().is_err());

    let options = DecoderOptions {
        max_run_length_output: 16,
        ..DecoderOptions::default()
    };
    let decoders = DecoderArray::new(vec![DecoderEntry::new("RL", None)]).unwrap();
    let encoded = run_length_encode(&[7u8; 64]);
    assert!(decode_data_with_options(&encoded, 0, false, &decoders, &options).is_err());
    assert!(decode_data(&encoded, 0, false, &decoders).is_ok());
}

#[test]
fn test_deferred_fax_to_scanlines() {
    // 16x3 bitmap, rows alternate between white and a centred black bar
    let bitmap = [
        0xff, 0xff, 0xff, 0xff, //
        0xf0, 0x0f, 0xff, 0xff, //
        0xff, 0xff, 0xff, 0xff,
    ];
    let encoded = FaxEncoder::new(&bitmap, 16, 3).unwrap().encode();
    let params = ints(&[("K", -1), ("Columns", 16), ("Rows", 3)]);
    let stream = stream(
        Object::Array(vec![name("A85"), name("CCF")]),
        Some(Object::Array(vec![Object::Null, Object::Dictionary(params)])),
        ascii85_encode(&encoded),
    );

    let image = match stream.decode_stream_data().unwrap() {
        PipelineResult::Deferred(image) => image,
        other => panic!("expected deferred fax image, got {:?}", other),
    };
    assert_eq!(image.image_encoding, "CCITTFaxDecode");
    assert_eq!(image.data, encoded);

    let mut decoder = create_image_decoder(&image, 16, 3, 1, 1, &DecoderOptions::default()).unwrap();
    assert_eq!((decoder.width(), decoder.height(), decoder.pitch()), (16, 3, 4));
    for row in 0..3 {
        let line = decoder.get_scanline(row).unwrap();
        assert_eq!(&line[..2], &bitmap[row * 4..row * 4 + 2], "row {}", row);
    }
    assert!(decoder.get_scanline(3).is_none());
}

#[test]
fn test_deferred_flate_to_scanlines() {
    // 4x2 RGB image with a PNG predictor
    let pixels: Vec<u8> = (0..24u8).map(|i| i.wrapping_mul(37)).collect();
    let predictor = PredictorParams::new(15, 3, 8, 4).unwrap();
    let encoded = flate_encode(&png_filter_rows(&pixels, &predictor, PngFilter::Sub).unwrap()).unwrap();
    let params = ints(&[("Predictor", 15), ("Colors", 3), ("Columns", 4)]);
    let stream = stream(name("FlateDecode"), Some(Object::Dictionary(params)), encoded);

    let Object::Stream { dict, data } = &stream else {
        unreachable!()
    };
    let decoders = DecoderArray::from_stream_dict(dict).unwrap();
    let image = match decode_data(data, 24, true, &decoders).unwrap() {
        PipelineResult::Deferred(image) => image,
        other => panic!("expected deferred Flate image, got {:?}", other),
    };

    let mut decoder = create_image_decoder(&image, 4, 2, 3, 8, &DecoderOptions::default()).unwrap();
    assert_eq!(decoder.pitch(), 12);
    assert_eq!(decoder.get_scanline(0).unwrap(), &pixels[..12]);
    assert_eq!(decoder.get_scanline(1).unwrap(), &pixels[12..]);
}

#[test]
fn test_unknown_codec_is_passed_through() {
    let stream = stream(name("JBIG2Decode"), None, vec![0x97, 0x4a, 0x42]);
    match stream.decode_stream_data().unwrap() {
        PipelineResult::Deferred(image) => {
            assert_eq!(image.image_encoding, "JBIG2Decode");
            assert_eq!(image.data, vec![0x97, 0x4a, 0x42]);
            assert!(matches!(
                create_image_decoder(&image, 8, 8, 1, 1, &DecoderOptions::default()),
                Err(Error::UnsupportedFilter(_))
            ));
        },
        other => panic!("expected deferred image, got {:?}", other),
    }
}
