//! Integration tests for CCITT fax decoding and Group 4 encoding.

use pdf_filters::decoder_config::DecoderOptions;
use pdf_filters::decoders::{
    create_fax_decoder, fax_g4_decode, CcittFaxDecoder, FaxEncoder, FaxParams, ScanlineDecoder, StreamDecoder,
};
use pdf_filters::object::{Dictionary, Object};

fn g4_params(columns: i64, rows: i64) -> FaxParams {
    FaxParams {
        k: -1,
        columns,
        rows,
        ..FaxParams::default()
    }
}

/// A `columns` x `rows` bitmap of diagonal stripes and a solid block, rows
/// padded to 32 bits with white.
fn test_bitmap(columns: usize, rows: usize) -> (Vec<u8>, usize) {
    let pitch = columns.div_ceil(32) * 4;
    let mut bitmap = vec![0xffu8; pitch * rows];
    for y in 0..rows {
        for x in 0..columns {
            let black = (x + y) % 7 < 2 || (y > rows / 3 && y < rows / 2 && x > 4 && x < columns - 4);
            if black {
                bitmap[y * pitch + x / 8] &= !(0x80 >> (x % 8));
            }
        }
    }
    (bitmap, pitch)
}

#[test]
fn test_blank_page_from_dictionary() {
    let mut dict = Dictionary::new();
    dict.insert("K".to_string(), Object::Integer(-1));
    dict.insert("Columns".to_string(), Object::Integer(2));
    dict.insert("Rows".to_string(), Object::Integer(2));
    let params = FaxParams::from_dict(Some(&dict));
    assert_eq!(params, g4_params(2, 2));

    // Two V0 codes
    let encoded = FaxEncoder::new(&[0xff; 8], 2, 2).unwrap().encode();
    assert_eq!(encoded, vec![0b1100_0000]);

    let mut decoder = create_fax_decoder(&encoded, 0, 0, &params, &DecoderOptions::default()).unwrap();
    assert_eq!((decoder.width(), decoder.height()), (2, 2));
    for row in 0..2 {
        let line = decoder.get_scanline(row).unwrap();
        assert!(line.iter().all(|&byte| byte == 0xff), "row {}", row);
    }
}

#[test]
fn test_g4_encode_decode_symmetry() {
    for (columns, rows) in [(1usize, 1usize), (37, 20), (64, 9), (200, 33)] {
        let (bitmap, pitch) = test_bitmap(columns, rows);
        let encoded = FaxEncoder::new(&bitmap, columns as u32, rows as u32).unwrap().encode();

        let mut decoded = vec![0u8; bitmap.len()];
        fax_g4_decode(&encoded, 0, columns as u32, rows as u32, pitch, &mut decoded).unwrap();
        assert_eq!(decoded, bitmap, "{}x{}", columns, rows);

        let params = g4_params(columns as i64, rows as i64);
        let mut decoder = create_fax_decoder(&encoded, 0, 0, &params, &DecoderOptions::default()).unwrap();
        assert_eq!(decoder.pitch(), pitch);
        for row in 0..rows {
            assert_eq!(
                decoder.get_scanline(row).unwrap(),
                &bitmap[row * pitch..(row + 1) * pitch],
                "{}x{} row {}",
                columns,
                rows,
                row
            );
        }
    }
}

#[test]
fn test_stream_decoder_packs_rows() {
    let (bitmap, pitch) = test_bitmap(12, 6);
    let encoded = FaxEncoder::new(&bitmap, 12, 6).unwrap().encode();

    // Rows unknown: decode until the data runs out
    let output = CcittFaxDecoder::new(g4_params(12, 0)).decode(&encoded).unwrap();
    let expected: Vec<u8> = bitmap.chunks(pitch).flat_map(|row| row[..2].to_vec()).collect();
    assert_eq!(output.data, expected);
    assert_eq!(output.bytes_consumed, encoded.len());

    let inverted = FaxParams {
        black_is_1: true,
        ..g4_params(12, 6)
    };
    let output = CcittFaxDecoder::new(inverted).decode(&encoded).unwrap();
    let expected: Vec<u8> = expected.iter().map(|byte| !byte).collect();
    assert_eq!(output.data, expected);
}

#[test]
fn test_random_access_and_rewind() {
    let (bitmap, pitch) = test_bitmap(40, 12);
    let encoded = FaxEncoder::new(&bitmap, 40, 12).unwrap().encode();
    let mut decoder = create_fax_decoder(&encoded, 40, 12, &g4_params(0, 0), &DecoderOptions::default()).unwrap();

    // Hints apply when Columns and Rows are zero
    assert_eq!((decoder.width(), decoder.height()), (40, 12));
    for row in [11, 3, 3, 0, 7] {
        assert_eq!(decoder.get_scanline(row).unwrap(), &bitmap[row * pitch..(row + 1) * pitch]);
    }
    assert!(decoder.get_scanline(12).is_none());
}

#[test]
fn test_invalid_dimensions_rejected() {
    let options = DecoderOptions::default();
    assert!(create_fax_decoder(&[0xC0], 0, 0, &g4_params(0, 0), &options).is_err());
    assert!(create_fax_decoder(&[0xC0], 0, 2, &g4_params(-5, 0), &options).is_err());
    let too_wide = g4_params(i64::from(options.max_image_dimension) + 1, 1);
    assert!(create_fax_decoder(&[0xC0], 0, 0, &too_wide, &options).is_err());

    // Encoding side: a zero-width bitmap is refused rather than encoded
    assert!(FaxEncoder::new(&[], 0, 3).is_err());
}

#[test]
fn test_truncated_data_never_panics() {
    let (bitmap, _) = test_bitmap(64, 16);
    let encoded = FaxEncoder::new(&bitmap, 64, 16).unwrap().encode();
    for cut in 0..encoded.len() {
        let output = CcittFaxDecoder::new(g4_params(64, 16)).decode(&encoded[..cut]);
        assert!(output.is_ok());
    }
    // Garbage input decodes to something or nothing, but returns
    let garbage: Vec<u8> = (0..64u32).map(|i| (i * 73 + 11) as u8).collect();
    for k in [-1, 0, 1, 4] {
        let params = FaxParams {
            k,
            ..g4_params(32, 8)
        };
        assert!(CcittFaxDecoder::new(params).decode(&garbage).is_ok());
    }
}
