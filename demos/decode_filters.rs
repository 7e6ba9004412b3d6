#!/usr/bin/env cargo run --release --example

//! Walk a few encoded streams through the filter chain.
//!
//! Run with `RUST_LOG=debug` to see every stage of the chain.

use bytes::Bytes;
use pdf_filters::decoder_config::DecoderOptions;
use pdf_filters::decoders::{
    ascii85_encode, create_image_decoder, flate_encode, lzw_encode, png_filter_rows, FaxEncoder, PipelineResult,
    PngFilter, PredictorParams, ScanlineDecoder,
};
use pdf_filters::object::{Dictionary, Object};
use pdf_filters::text::decode_text;

fn stream(filters: &[&str], params: Option<Object>, data: Vec<u8>) -> Object {
    let mut dict = Dictionary::new();
    let filter = filters.iter().map(|name| Object::Name(name.to_string())).collect();
    dict.insert("Filter".to_string(), Object::Array(filter));
    if let Some(params) = params {
        dict.insert("DecodeParms".to_string(), params);
    }
    Object::Stream {
        dict,
        data: Bytes::from(data),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    println!("{}", "=".repeat(60));
    println!("BYTE FILTERS");
    println!("{}", "=".repeat(60));

    let content = b"BT /F1 12 Tf 72 712 Td (Hello, filters) Tj ET".repeat(4);
    let encoded = ascii85_encode(&flate_encode(&content)?);
    let text_stream = stream(&["A85", "Fl"], None, encoded.clone());
    let decoded = text_stream.decode_stream_data()?;
    println!(
        "A85 + Flate: {} encoded bytes -> {} decoded bytes",
        encoded.len(),
        decoded.data().len()
    );
    println!("  {}", String::from_utf8_lossy(&decoded.data()[..45]));

    // Gray 8x4 ramp behind LZW with the PNG Up predictor
    let ramp: Vec<u8> = (0..32u8).map(|i| i * 8).collect();
    let predictor = PredictorParams::new(12, 1, 8, 8)?;
    let lzw = lzw_encode(&png_filter_rows(&ramp, &predictor, PngFilter::Up)?, true)?;
    let mut params = Dictionary::new();
    params.insert("Predictor".to_string(), Object::Integer(12));
    params.insert("Columns".to_string(), Object::Integer(8));
    let ramp_stream = stream(&["LZWDecode"], Some(Object::Dictionary(params)), lzw);
    let decoded = ramp_stream.decode_stream_data()?;
    println!("LZW + PNG predictor: ramp restored = {}", decoded.data() == ramp.as_slice());

    println!();
    println!("{}", "=".repeat(60));
    println!("IMAGE CODECS");
    println!("{}", "=".repeat(60));

    // 16x4 fax image with a black staircase
    let mut bitmap = vec![0xffu8; 16];
    for row in 0..4 {
        let x = row * 4;
        bitmap[row * 4 + x / 8] &= !(0xf0 >> (x % 8));
    }
    let fax = FaxEncoder::new(&bitmap, 16, 4)?.encode();
    let mut fax_params = Dictionary::new();
    fax_params.insert("K".to_string(), Object::Integer(-1));
    fax_params.insert("Columns".to_string(), Object::Integer(16));
    fax_params.insert("Rows".to_string(), Object::Integer(4));
    let fax_stream = stream(&["CCF"], Some(Object::Dictionary(fax_params)), fax);

    match fax_stream.decode_stream_data()? {
        PipelineResult::Deferred(image) => {
            println!("Deferred to {} ({} bytes)", image.image_encoding, image.data.len());
            let mut decoder = create_image_decoder(&image, 16, 4, 1, 1, &DecoderOptions::default())?;
            for row in 0..decoder.height() as usize {
                if let Some(line) = decoder.get_scanline(row) {
                    let pixels: String = (0..16)
                        .map(|x| if line[x / 8] & (0x80 >> (x % 8)) == 0 { '#' } else { '.' })
                        .collect();
                    println!("  {}", pixels);
                }
            }
        },
        PipelineResult::Decoded(data) => println!("Unexpected full decode: {} bytes", data.len()),
    }

    println!();
    println!("Text string: {}", decode_text(b"\xfe\xff\x00F\x00i\x00l\x00t\x00e\x00r\x00s"));
    Ok(())
}
