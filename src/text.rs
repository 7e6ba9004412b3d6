//! PDF text strings and string literals.
//!
//! Text strings are either PDFDocEncoding bytes or Unicode marked by a byte
//! order mark (UTF-16BE, UTF-16LE or UTF-8).
//!
//! PDF Spec: ISO 32000-1:2008, Section 7.9.2.2 - Text String Type, Annex D

/// Unicode code point for each PDFDocEncoding byte; `0` where the byte is
/// undefined.
pub const PDF_DOC_ENCODING: [u16; 256] = [
    0x0000, 0x0001, 0x0002, 0x0003, 0x0004, 0x0005, 0x0006, 0x0007, 0x0008, 0x0009, 0x000a, 0x000b, 0x000c,
    0x000d, 0x000e, 0x000f, 0x0010, 0x0011, 0x0012, 0x0013, 0x0014, 0x0015, 0x0016, 0x0017, 0x02d8, 0x02c7,
    0x02c6, 0x02d9, 0x02dd, 0x02db, 0x02da, 0x02dc, 0x0020, 0x0021, 0x0022, 0x0023, 0x0024, 0x0025, 0x0026,
    0x0027, 0x0028, 0x0029, 0x002a, 0x002b, 0x002c, 0x002d, 0x002e, 0x002f, 0x0030, 0x0031, 0x0032, 0x0033,
    0x0034, 0x0035, 0x0036, 0x0037, 0x0038, 0x0039, 0x003a, 0x003b, 0x003c, 0x003d, 0x003e, 0x003f, 0x0040,
    0x0041, 0x0042, 0x0043, 0x0044, 0x0045, 0x0046, 0x0047, 0x0048, 0x0049, 0x004a, 0x004b, 0x004c, 0x004d,
    0x004e, 0x004f, 0x0050, 0x0051, 0x0052, 0x0053, 0x0054, 0x0055, 0x0056, 0x0057, 0x0058, 0x0059, 0x005a,
    0x005b, 0x005c, 0x005d, 0x005e, 0x005f, 0x0060, 0x0061, 0x0062, 0x0063, 0x0064, 0x0065, 0x0066, 0x0067,
    0x0068, 0x0069, 0x006a, 0x006b, 0x006c, 0x006d, 0x006e, 0x006f, 0x0070, 0x0071, 0x0072, 0x0073, 0x0074,
    0x0075, 0x0076, 0x0077, 0x0078, 0x0079, 0x007a, 0x007b, 0x007c, 0x007d, 0x007e, 0x0000, 0x2022, 0x2020,
    0x2021, 0x2026, 0x2014, 0x2013, 0x0192, 0x2044, 0x2039, 0x203a, 0x2212, 0x2030, 0x201e, 0x201c, 0x201d,
    0x2018, 0x2019, 0x201a, 0x2122, 0xfb01, 0xfb02, 0x0141, 0x0152, 0x0160, 0x0178, 0x017d, 0x0131, 0x0142,
    0x0153, 0x0161, 0x017e, 0x0000, 0x20ac, 0x00a1, 0x00a2, 0x00a3, 0x00a4, 0x00a5, 0x00a6, 0x00a7, 0x00a8,
    0x00a9, 0x00aa, 0x00ab, 0x00ac, 0x0000, 0x00ae, 0x00af, 0x00b0, 0x00b1, 0x00b2, 0x00b3, 0x00b4, 0x00b5,
    0x00b6, 0x00b7, 0x00b8, 0x00b9, 0x00ba, 0x00bb, 0x00bc, 0x00bd, 0x00be, 0x00bf, 0x00c0, 0x00c1, 0x00c2,
    0x00c3, 0x00c4, 0x00c5, 0x00c6, 0x00c7, 0x00c8, 0x00c9, 0x00ca, 0x00cb, 0x00cc, 0x00cd, 0x00ce, 0x00cf,
    0x00d0, 0x00d1, 0x00d2, 0x00d3, 0x00d4, 0x00d5, 0x00d6, 0x00d7, 0x00d8, 0x00d9, 0x00da, 0x00db, 0x00dc,
    0x00dd, 0x00de, 0x00df, 0x00e0, 0x00e1, 0x00e2, 0x00e3, 0x00e4, 0x00e5, 0x00e6, 0x00e7, 0x00e8, 0x00e9,
    0x00ea, 0x00eb, 0x00ec, 0x00ed, 0x00ee, 0x00ef, 0x00f0, 0x00f1, 0x00f2, 0x00f3, 0x00f4, 0x00f5, 0x00f6,
    0x00f7, 0x00f8, 0x00f9, 0x00fa, 0x00fb, 0x00fc, 0x00fd, 0x00fe, 0x00ff,
];

/// Marks the start and end of a language code inside Unicode text.
const LANGUAGE_ESCAPE: char = '\u{1b}';

/// Drop the language-code regions delimited by `ESC` pairs. An unpaired
/// `ESC` drops the rest of the text.
fn strip_language_codes(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut in_escape = false;
    for ch in text.chars() {
        if ch == LANGUAGE_ESCAPE {
            in_escape = !in_escape;
        } else if !in_escape {
            result.push(ch);
        }
    }
    result
}

/// Decode a PDF text string.
///
/// # Examples
///
/// ```
/// use pdf_filters::text::decode_text;
///
/// assert_eq!(decode_text(b"\x80 item"), "\u{2022} item");
/// assert_eq!(decode_text(b"\xfe\xff\x00H\x00i"), "Hi");
/// ```
pub fn decode_text(bytes: &[u8]) -> String {
    let utf16 = |units: &[u8], big_endian: bool| -> String {
        let units = units.chunks_exact(2).map(|pair| {
            if big_endian {
                u16::from_be_bytes([pair[0], pair[1]])
            } else {
                u16::from_le_bytes([pair[0], pair[1]])
            }
        });
        char::decode_utf16(units)
            .map(|unit| unit.unwrap_or(char::REPLACEMENT_CHARACTER))
            .collect()
    };

    match bytes {
        [0xfe, 0xff, rest @ ..] => strip_language_codes(&utf16(rest, true)),
        [0xff, 0xfe, rest @ ..] => strip_language_codes(&utf16(rest, false)),
        [0xef, 0xbb, 0xbf, rest @ ..] => strip_language_codes(&String::from_utf8_lossy(rest)),
        _ => bytes
            .iter()
            .map(|&byte| char::from_u32(u32::from(PDF_DOC_ENCODING[usize::from(byte)])).unwrap_or('\0'))
            .collect(),
    }
}

/// PDFDocEncoding byte for a character, if it has one.
fn pdf_doc_byte(ch: char) -> Option<u8> {
    let code = u16::try_from(u32::from(ch)).ok()?;
    PDF_DOC_ENCODING
        .iter()
        .position(|&mapped| mapped == code)
        .map(|byte| byte as u8)
}

/// Encode text as a PDF text string.
///
/// Uses PDFDocEncoding when every character has a code there, otherwise
/// UTF-16BE with a byte order mark.
pub fn encode_text(text: &str) -> Vec<u8> {
    if let Some(bytes) = text.chars().map(pdf_doc_byte).collect::<Option<Vec<u8>>>() {
        return bytes;
    }
    let mut bytes = Vec::with_capacity(2 + text.len() * 2);
    bytes.extend_from_slice(&[0xfe, 0xff]);
    for unit in text.encode_utf16() {
        bytes.extend_from_slice(&unit.to_be_bytes());
    }
    bytes
}

/// Write bytes as a literal string `( ... )`.
///
/// Line feed and carriage return become `\n` and `\r`; parentheses and
/// backslashes are escaped.
pub fn encode_string(bytes: &[u8]) -> Vec<u8> {
    let mut result = Vec::with_capacity(bytes.len() + 2);
    result.push(b'(');
    for &byte in bytes {
        match byte {
            b'\n' => result.extend_from_slice(b"\\n"),
            b'\r' => result.extend_from_slice(b"\\r"),
            b'(' | b')' | b'\\' => result.extend_from_slice(&[b'\\', byte]),
            _ => result.push(byte),
        }
    }
    result.push(b')');
    result
}

/// Write bytes as a hexadecimal string `< ... >` with uppercase digits.
pub fn hex_encode_string(bytes: &[u8]) -> Vec<u8> {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";
    let mut result = Vec::with_capacity(bytes.len() * 2 + 2);
    result.push(b'<');
    for &byte in bytes {
        result.push(HEX[usize::from(byte >> 4)]);
        result.push(HEX[usize::from(byte & 0x0f)]);
    }
    result.push(b'>');
    result
}
