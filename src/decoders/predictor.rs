//! PNG and TIFF predictor implementations for PDF stream decoding.
//!
//! Flate and LZW streams can use predictors to improve compression. These
//! encode differences between adjacent samples, which are then reversed
//! after decompression.
//!
//! - Predictor 2: TIFF horizontal differencing
//! - Predictor >= 10: PNG row filters, with a tag byte in front of every row
//! - Anything else: no prediction
//!
//! PDF Spec: ISO 32000-1:2008, Section 7.4.4.4 - LZW and Flate Predictor Functions

use crate::error::{Error, Result};
use crate::object::{integer_for, Dictionary};

/// Predictor family selected by the `Predictor` parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PredictorKind {
    /// No prediction (`Predictor` absent, 0, 1, or any other unknown value)
    #[default]
    None,
    /// TIFF Predictor 2
    Tiff,
    /// PNG predictors (10-15); the per-row tag selects the filter
    Png,
}

impl PredictorKind {
    /// Map a `Predictor` value to its family.
    pub fn from_predictor(predictor: i64) -> Self {
        if predictor >= 10 {
            PredictorKind::Png
        } else if predictor == 2 {
            PredictorKind::Tiff
        } else {
            PredictorKind::None
        }
    }
}

/// PNG row filter types, stored as the tag byte in front of each row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PngFilter {
    /// No prediction
    None = 0,
    /// Difference from the byte one pixel to the left
    Sub = 1,
    /// Difference from the byte above
    Up = 2,
    /// Difference from the average of left and above
    Average = 3,
    /// Difference from the Paeth predictor of left, above and upper-left
    Paeth = 4,
}

impl PngFilter {
    /// All five filters, in tag order.
    pub const ALL: [PngFilter; 5] = [
        PngFilter::None,
        PngFilter::Sub,
        PngFilter::Up,
        PngFilter::Average,
        PngFilter::Paeth,
    ];

    /// Tag byte written in front of a filtered row.
    pub fn tag(self) -> u8 {
        self as u8
    }
}

/// Predictor parameters derived from `DecodeParms`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictorParams {
    /// Predictor family
    pub kind: PredictorKind,
    /// Color components per sample (default 1)
    pub colors: u32,
    /// Bits per component (default 8)
    pub bits_per_component: u32,
    /// Samples per row (default 1)
    pub columns: u32,
}

impl Default for PredictorParams {
    fn default() -> Self {
        Self {
            kind: PredictorKind::None,
            colors: 1,
            bits_per_component: 8,
            columns: 1,
        }
    }
}

impl PredictorParams {
    /// Validate raw parameter values.
    ///
    /// `colors`, `bits_per_component` and `columns` must be non-negative and
    /// their product must fit comfortably in an `i32`. When a predictor is
    /// selected the row must also be at least one byte wide. Nothing is
    /// allocated before these checks pass.
    pub fn new(predictor: i64, colors: i64, bits_per_component: i64, columns: i64) -> Result<Self> {
        let in_range = |v: i64| (0..=i64::from(i32::MAX)).contains(&v);
        if !in_range(colors) || !in_range(bits_per_component) || !in_range(columns) {
            return Err(Error::InvalidParameter(format!(
                "predictor geometry out of range: Colors={} BitsPerComponent={} Columns={}",
                colors, bits_per_component, columns
            )));
        }

        let bits = colors
            .checked_mul(bits_per_component)
            .and_then(|n| n.checked_mul(columns))
            .filter(|&n| n <= i64::from(i32::MAX) - 7)
            .ok_or_else(|| {
                Error::InvalidParameter(format!(
                    "predictor row size overflows: Colors={} BitsPerComponent={} Columns={}",
                    colors, bits_per_component, columns
                ))
            })?;

        let kind = PredictorKind::from_predictor(predictor);
        if kind != PredictorKind::None && bits == 0 {
            return Err(Error::InvalidParameter(format!(
                "predictor {} with zero row width (Colors={} BitsPerComponent={} Columns={})",
                predictor, colors, bits_per_component, columns
            )));
        }

        Ok(Self {
            kind,
            colors: colors as u32,
            bits_per_component: bits_per_component as u32,
            columns: columns as u32,
        })
    }

    /// Read `Predictor`, `Colors`, `BitsPerComponent` and `Columns` from a
    /// decode parameter dictionary.
    pub fn from_dict(params: Option<&Dictionary>) -> Result<Self> {
        if params.is_none() {
            return Ok(Self::default());
        }
        Self::new(
            integer_for(params, "Predictor", 0),
            integer_for(params, "Colors", 1),
            integer_for(params, "BitsPerComponent", 8),
            integer_for(params, "Columns", 1),
        )
    }

    /// Whether any predictor has to be reversed.
    pub fn is_active(&self) -> bool {
        self.kind != PredictorKind::None
    }

    /// Bytes of sample data per row, without the PNG tag byte.
    pub fn row_bytes(&self) -> usize {
        (self.colors as usize * self.bits_per_component as usize * self.columns as usize + 7) / 8
    }

    /// PNG stride between a byte and its left neighbour (at least 1).
    pub fn bytes_per_pixel(&self) -> usize {
        (self.colors as usize * self.bits_per_component as usize + 7) / 8
    }

    /// Reverse the predictor on fully decompressed data.
    pub fn apply(&self, data: Vec<u8>) -> Result<Vec<u8>> {
        match self.kind {
            PredictorKind::None => Ok(data),
            PredictorKind::Png => decode_png_predictor(&data, self),
            PredictorKind::Tiff => decode_tiff_predictor(data, self),
        }
    }
}

fn paeth(left: u8, up: u8, upper_left: u8) -> u8 {
    let (a, b, c) = (i16::from(left), i16::from(up), i16::from(upper_left));
    let p = a + b - c;
    let pa = (p - a).abs();
    let pb = (p - b).abs();
    let pc = (p - c).abs();
    if pa <= pb && pa <= pc {
        left
    } else if pb <= pc {
        up
    } else {
        upper_left
    }
}

/// Reconstruct one PNG-filtered row.
///
/// `src` is the encoded row including its leading tag byte; it may be
/// shorter than `dest` for a truncated last row, in which case only the
/// available bytes are written. `last_line` is the previously reconstructed
/// row, or `None` for the first row. Unknown tags copy the bytes through.
pub fn png_predict_line(dest: &mut [u8], src: &[u8], last_line: Option<&[u8]>, bytes_per_pixel: usize) {
    let Some((&tag, raw)) = src.split_first() else {
        return;
    };
    let len = raw.len().min(dest.len());
    let up_at = |i: usize| last_line.and_then(|l| l.get(i).copied()).unwrap_or(0);

    for i in 0..len {
        let raw_byte = raw[i];
        let left = if i >= bytes_per_pixel { dest[i - bytes_per_pixel] } else { 0 };
        dest[i] = match tag {
            0 => raw_byte,
            1 => raw_byte.wrapping_add(left),
            2 => raw_byte.wrapping_add(up_at(i)),
            3 => {
                let avg = (u16::from(left) + u16::from(up_at(i))) / 2;
                raw_byte.wrapping_add(avg as u8)
            },
            4 => {
                let upper_left = if i >= bytes_per_pixel { up_at(i - bytes_per_pixel) } else { 0 };
                raw_byte.wrapping_add(paeth(left, up_at(i), upper_left))
            },
            _ => raw_byte,
        };
    }
}

/// Reverse PNG predictors over a whole buffer.
///
/// Each input row is one tag byte plus `row_bytes` of data. A trailing
/// partial row is reconstructed as far as it goes, so the output is
/// `row_count * row_bytes` minus whatever the last row was missing.
pub fn decode_png_predictor(data: &[u8], params: &PredictorParams) -> Result<Vec<u8>> {
    let row_size = params.row_bytes();
    if row_size == 0 {
        return Err(Error::InvalidParameter("PNG predictor with zero row width".to_string()));
    }
    if data.is_empty() {
        return Ok(Vec::new());
    }

    let bpp = params.bytes_per_pixel();
    let row_count = (data.len() + row_size) / (row_size + 1);
    let last_row_size = data.len() % (row_size + 1);
    let mut output = vec![0u8; row_size * row_count];

    for (row, src) in data.chunks(row_size + 1).enumerate() {
        let (done, rest) = output.split_at_mut(row * row_size);
        let last_line = row.checked_sub(1).map(|prev| &done[prev * row_size..]);
        png_predict_line(&mut rest[..row_size], src, last_line, bpp);
    }

    if last_row_size > 0 {
        output.truncate(row_size * row_count - (row_size + 1 - last_row_size));
    }
    Ok(output)
}

/// Reverse TIFF Predictor 2 on one row in place.
///
/// 1-bit data is differenced bit by bit, 16-bit components as big-endian
/// words, anything else byte by byte with a stride of one pixel.
pub fn tiff_predict_line(row: &mut [u8], bits_per_component: u32, colors: u32, columns: u32) {
    if bits_per_component == 1 {
        let row_bits = (bits_per_component as usize * colors as usize * columns as usize).min(row.len() * 8);
        let bit_at = |row: &[u8], i: usize| (row[i / 8] >> (7 - i % 8)) & 1;
        for i in 1..row_bits {
            let mask = 1u8 << (7 - i % 8);
            if bit_at(row, i) ^ bit_at(row, i - 1) != 0 {
                row[i / 8] |= mask;
            } else {
                row[i / 8] &= !mask;
            }
        }
        return;
    }

    // Sub-byte pixels still difference against the previous byte
    let bpp = (bits_per_component as usize * colors as usize / 8).max(1);
    if bits_per_component == 16 {
        let mut i = bpp;
        while i + 1 < row.len() {
            let prev = u16::from_be_bytes([row[i - bpp], row[i - bpp + 1]]);
            let cur = u16::from_be_bytes([row[i], row[i + 1]]);
            row[i..i + 2].copy_from_slice(&prev.wrapping_add(cur).to_be_bytes());
            i += 2;
        }
    } else {
        for i in bpp..row.len() {
            row[i] = row[i].wrapping_add(row[i - bpp]);
        }
    }
}

/// Reverse TIFF Predictor 2 over a whole buffer.
///
/// A trailing partial row is processed as far as it goes.
pub fn decode_tiff_predictor(mut data: Vec<u8>, params: &PredictorParams) -> Result<Vec<u8>> {
    let row_size = params.row_bytes();
    if row_size == 0 {
        return Err(Error::InvalidParameter("TIFF predictor with zero row width".to_string()));
    }
    for row in data.chunks_mut(row_size) {
        tiff_predict_line(row, params.bits_per_component, params.colors, params.columns);
    }
    Ok(data)
}

/// Apply a PNG filter to every row, prefixing each with its tag byte.
///
/// This is the forward direction of [`decode_png_predictor`]; a trailing
/// partial row is filtered as far as it goes.
pub fn png_filter_rows(data: &[u8], params: &PredictorParams, filter: PngFilter) -> Result<Vec<u8>> {
    let row_size = params.row_bytes();
    if row_size == 0 {
        return Err(Error::InvalidParameter("PNG filter with zero row width".to_string()));
    }
    let bpp = params.bytes_per_pixel();
    let mut output = Vec::with_capacity(data.len() + data.len() / row_size + 1);

    let mut previous: Option<&[u8]> = None;
    for row in data.chunks(row_size) {
        output.push(filter.tag());
        for (i, &raw) in row.iter().enumerate() {
            let left = if i >= bpp { row[i - bpp] } else { 0 };
            let up = previous.map_or(0, |p| p[i]);
            let upper_left = match previous {
                Some(p) if i >= bpp => p[i - bpp],
                _ => 0,
            };
            let predicted = match filter {
                PngFilter::None => 0,
                PngFilter::Sub => left,
                PngFilter::Up => up,
                PngFilter::Average => ((u16::from(left) + u16::from(up)) / 2) as u8,
                PngFilter::Paeth => paeth(left, up, upper_left),
            };
            output.push(raw.wrapping_sub(predicted));
        }
        previous = Some(row);
    }
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::Object;

    fn png(columns: u32) -> PredictorParams {
        PredictorParams::new(15, 1, 8, i64::from(columns)).unwrap()
    }

    fn tiff(colors: i64, bpc: i64, columns: i64) -> PredictorParams {
        PredictorParams::new(2, colors, bpc, columns).unwrap()
    }

    #[test]
    fn test_predictor_kind_mapping() {
        assert_eq!(PredictorKind::from_predictor(0), PredictorKind::None);
        assert_eq!(PredictorKind::from_predictor(1), PredictorKind::None);
        assert_eq!(PredictorKind::from_predictor(2), PredictorKind::Tiff);
        assert_eq!(PredictorKind::from_predictor(3), PredictorKind::None);
        assert_eq!(PredictorKind::from_predictor(10), PredictorKind::Png);
        assert_eq!(PredictorKind::from_predictor(15), PredictorKind::Png);
    }

    #[test]
    fn test_params_from_dict_defaults() {
        let params = PredictorParams::from_dict(None).unwrap();
        assert_eq!(params, PredictorParams::default());

        let mut dict = Dictionary::new();
        dict.insert("Predictor".to_string(), Object::Integer(12));
        dict.insert("Columns".to_string(), Object::Integer(5));
        let params = PredictorParams::from_dict(Some(&dict)).unwrap();
        assert_eq!(params.kind, PredictorKind::Png);
        assert_eq!(params.colors, 1);
        assert_eq!(params.bits_per_component, 8);
        assert_eq!(params.row_bytes(), 5);
    }

    #[test]
    fn test_params_reject_zero_columns_with_predictor() {
        let mut dict = Dictionary::new();
        dict.insert("Predictor".to_string(), Object::Integer(15));
        dict.insert("Colors".to_string(), Object::Integer(3));
        dict.insert("BitsPerComponent".to_string(), Object::Integer(8));
        dict.insert("Columns".to_string(), Object::Integer(0));
        assert!(matches!(PredictorParams::from_dict(Some(&dict)), Err(Error::InvalidParameter(_))));

        // Without a predictor the degenerate geometry is harmless
        assert!(PredictorParams::new(1, 3, 8, 0).is_ok());
    }

    #[test]
    fn test_params_reject_negative_and_overflow() {
        assert!(PredictorParams::new(1, -1, 8, 1).is_err());
        assert!(PredictorParams::new(12, 4, 8, 1 << 30).is_err());
        assert!(PredictorParams::new(12, 1, 8, (i64::from(i32::MAX) - 7) / 8).is_ok());
    }

    #[test]
    fn test_png_sub() {
        let out = decode_png_predictor(&[1, 10, 5, 5], &png(3)).unwrap();
        assert_eq!(out, vec![10, 15, 20]);
    }

    #[test]
    fn test_png_up() {
        let out = decode_png_predictor(&[0, 1, 2, 3, 2, 1, 1, 1], &png(3)).unwrap();
        assert_eq!(out, vec![1, 2, 3, 2, 3, 4]);
    }

    #[test]
    fn test_png_up_first_row_uses_zero() {
        let out = decode_png_predictor(&[2, 7, 8], &png(2)).unwrap();
        assert_eq!(out, vec![7, 8]);
    }

    #[test]
    fn test_png_average() {
        let out = decode_png_predictor(&[3, 10, 4, 6], &png(3)).unwrap();
        assert_eq!(out, vec![10, 9, 10]);
    }

    #[test]
    fn test_png_paeth() {
        let out = decode_png_predictor(&[0, 10, 20, 30, 4, 1, 1, 1], &png(3)).unwrap();
        assert_eq!(out, vec![10, 20, 30, 11, 21, 31]);
    }

    #[test]
    fn test_png_unknown_tag_copies() {
        let out = decode_png_predictor(&[7, 5, 6, 7], &png(3)).unwrap();
        assert_eq!(out, vec![5, 6, 7]);
    }

    #[test]
    fn test_png_partial_last_row() {
        let out = decode_png_predictor(&[0, 1, 2, 3, 0, 4], &png(3)).unwrap();
        assert_eq!(out, vec![1, 2, 3, 4]);

        let out = decode_png_predictor(&[0, 1, 2, 3, 1], &png(3)).unwrap();
        assert_eq!(out, vec![1, 2, 3]);
    }

    #[test]
    fn test_png_multibyte_pixels() {
        // RGB, Sub: stride of 3 bytes
        let params = PredictorParams::new(11, 3, 8, 2).unwrap();
        let out = decode_png_predictor(&[1, 10, 20, 30, 1, 2, 3], &params).unwrap();
        assert_eq!(out, vec![10, 20, 30, 11, 22, 33]);
    }

    #[test]
    fn test_png_empty() {
        assert!(decode_png_predictor(&[], &png(3)).unwrap().is_empty());
    }

    #[test]
    fn test_png_predict_line_with_last_line() {
        let mut dest = [0u8; 3];
        png_predict_line(&mut dest, &[2, 1, 1, 1], Some(&[5, 6, 7]), 1);
        assert_eq!(dest, [6, 7, 8]);
    }

    #[test]
    fn test_png_filter_round_trip_all_tags() {
        let params = PredictorParams::new(15, 3, 8, 4).unwrap();
        let data: Vec<u8> = (0..40u32).map(|i| (i * 53 % 256) as u8).collect();
        for filter in PngFilter::ALL {
            let filtered = png_filter_rows(&data, &params, filter).unwrap();
            assert_eq!(filtered[0], filter.tag());
            let restored = decode_png_predictor(&filtered, &params).unwrap();
            assert_eq!(restored, data, "filter {:?}", filter);
        }
    }

    #[test]
    fn test_tiff_8bit() {
        let out = decode_tiff_predictor(vec![1, 1, 1, 1, 5, 1, 1, 1], &tiff(1, 8, 4)).unwrap();
        assert_eq!(out, vec![1, 2, 3, 4, 5, 6, 7, 8]);
    }

    #[test]
    fn test_tiff_rgb() {
        let out = decode_tiff_predictor(vec![10, 20, 30, 1, 2, 3], &tiff(3, 8, 2)).unwrap();
        assert_eq!(out, vec![10, 20, 30, 11, 22, 33]);
    }

    #[test]
    fn test_tiff_16bit() {
        let out = decode_tiff_predictor(vec![0x01, 0xFF, 0x00, 0x02], &tiff(1, 16, 2)).unwrap();
        assert_eq!(out, vec![0x01, 0xFF, 0x02, 0x01]);
    }

    #[test]
    fn test_tiff_1bit() {
        let out = decode_tiff_predictor(vec![0b0100_0000], &tiff(1, 1, 8)).unwrap();
        assert_eq!(out, vec![0b0111_1111]);
    }

    #[test]
    fn test_tiff_partial_last_row() {
        let out = decode_tiff_predictor(vec![1, 1, 1, 2, 2], &tiff(1, 8, 3)).unwrap();
        assert_eq!(out, vec![1, 2, 3, 2, 4]);
    }

    #[test]
    fn test_apply_dispatch() {
        assert_eq!(PredictorParams::default().apply(vec![1, 2]).unwrap(), vec![1, 2]);
        assert_eq!(tiff(1, 8, 2).apply(vec![1, 1]).unwrap(), vec![1, 2]);
        assert_eq!(png(2).apply(vec![1, 1, 1]).unwrap(), vec![1, 2]);
    }
}
