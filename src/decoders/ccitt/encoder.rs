//! CCITT Group 4 (T.6) encoder for 1-bpp bitmaps.

use super::bits::{find_b1_b2, find_bit};
use super::tables::{makeup_code, terminating_code, MAX_MAKEUP_RUN};
use crate::decoders::scanline::{pitch_32, pitch_8};
use crate::error::{Error, Result};

/// Mode codes as `(code, length)`.
const PASS: (u16, u8) = (0b0001, 4);
const HORIZONTAL: (u16, u8) = (0b001, 3);
const VERTICAL: [(u16, u8); 7] = [
    (0b0000010, 7), // VL3
    (0b000010, 6),  // VL2
    (0b010, 3),     // VL1
    (0b1, 1),       // V0
    (0b011, 3),     // VR1
    (0b000011, 6),  // VR2
    (0b0000011, 7), // VR3
];

/// MSB-first bit sink.
#[derive(Debug, Default)]
struct BitWriter {
    bytes: Vec<u8>,
    bitpos: usize,
}

impl BitWriter {
    fn push(&mut self, (code, length): (u16, u8)) {
        for i in (0..length).rev() {
            if self.bitpos % 8 == 0 {
                self.bytes.push(0);
            }
            if code & (1 << i) != 0 {
                if let Some(last) = self.bytes.last_mut() {
                    *last |= 0x80 >> (self.bitpos % 8);
                }
            }
            self.bitpos += 1;
        }
    }

    fn push_run(&mut self, mut run: usize, white: bool) {
        while run >= MAX_MAKEUP_RUN {
            self.push(makeup_code(MAX_MAKEUP_RUN, white));
            run -= MAX_MAKEUP_RUN;
        }
        if run >= 64 {
            self.push(makeup_code(run - run % 64, white));
        }
        self.push(terminating_code(run % 64, white));
    }
}

/// Group 4 encoder over a packed 1-bpp bitmap where set bits are white.
///
/// # Example
///
/// ```
/// use pdf_filters::decoders::{fax_g4_decode, FaxEncoder};
///
/// // 16x2 bitmap with a black bar in the middle of each row
/// let bitmap = [0xF0, 0x0F, 0xFF, 0xFF, 0xF0, 0x0F, 0xFF, 0xFF];
/// let encoded = FaxEncoder::new(&bitmap, 16, 2).unwrap().encode();
///
/// let mut decoded = vec![0u8; 8];
/// fax_g4_decode(&encoded, 0, 16, 2, 4, &mut decoded).unwrap();
/// assert_eq!(decoded, bitmap);
/// ```
#[derive(Debug, Clone)]
pub struct FaxEncoder<'a> {
    src: &'a [u8],
    columns: u32,
    rows: u32,
    pitch: usize,
}

impl<'a> FaxEncoder<'a> {
    /// Encoder for rows padded to a multiple of 32 bits.
    pub fn new(src: &'a [u8], columns: u32, rows: u32) -> Result<Self> {
        let pitch = pitch_32(1, 1, columns).ok_or_else(|| Error::limit("fax row pitch", usize::MAX))?;
        Self::with_pitch(src, columns, rows, pitch)
    }

    /// Encoder for rows `pitch` bytes apart.
    pub fn with_pitch(src: &'a [u8], columns: u32, rows: u32, pitch: usize) -> Result<Self> {
        if columns == 0 || pitch == 0 {
            return Err(Error::InvalidParameter(format!(
                "fax bitmap needs at least one column, got {} columns at pitch {}",
                columns, pitch
            )));
        }
        let row_bytes = pitch_8(1, 1, columns).unwrap_or(usize::MAX);
        if pitch < row_bytes {
            return Err(Error::InvalidParameter(format!(
                "fax pitch {} too small for {} columns",
                pitch, columns
            )));
        }
        let needed = pitch
            .checked_mul(rows as usize)
            .ok_or_else(|| Error::limit("fax bitmap size", usize::MAX))?;
        if src.len() < needed {
            return Err(Error::InvalidParameter(format!(
                "fax bitmap has {} bytes, {}x{} at pitch {} needs {}",
                src.len(),
                columns,
                rows,
                pitch,
                needed
            )));
        }
        Ok(Self {
            src,
            columns,
            rows,
            pitch,
        })
    }

    /// Encode every row as pure two-dimensional G4 data.
    ///
    /// The output carries no EOL codes or end-of-block marker; the final
    /// partial byte is zero-padded.
    pub fn encode(&self) -> Vec<u8> {
        let mut writer = BitWriter::default();
        let initial_reference = vec![0xffu8; self.pitch];
        let mut reference: &[u8] = &initial_reference;
        for row in self.src.chunks(self.pitch).take(self.rows as usize) {
            encode_row(&mut writer, row, reference, i64::from(self.columns));
            reference = row;
        }
        log::debug!(
            "CCITTFaxDecode: encoded {}x{} bitmap into {} bytes",
            self.columns,
            self.rows,
            writer.bytes.len()
        );
        writer.bytes
    }
}

fn encode_row(writer: &mut BitWriter, row: &[u8], reference: &[u8], columns: i64) {
    let mut a0: i64 = -1;
    let mut a0_white = true;
    loop {
        let a1 = find_bit(row, columns, a0 + 1, !a0_white);
        let (b1, b2) = find_b1_b2(reference, columns, a0, a0_white);
        if b2 < a1 {
            writer.push(PASS);
            a0 = b2;
        } else if (a1 - b1).abs() <= 3 {
            writer.push(VERTICAL[(a1 - b1 + 3) as usize]);
            a0 = a1;
            a0_white = !a0_white;
        } else {
            let a2 = find_bit(row, columns, a1 + 1, a0_white);
            writer.push(HORIZONTAL);
            let start = a0.max(0);
            writer.push_run((a1 - start) as usize, a0_white);
            writer.push_run((a2 - a1) as usize, !a0_white);
            a0 = a2;
        }
        if a0 >= columns {
            return;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_rows_are_vertical_zero() {
        let bitmap = [0xffu8; 8];
        let encoded = FaxEncoder::new(&bitmap, 2, 2).unwrap().encode();
        assert_eq!(encoded, vec![0b1100_0000]);
    }

    #[test]
    fn test_bit_writer_packs_msb_first() {
        let mut writer = BitWriter::default();
        writer.push((0b101, 3));
        writer.push((0b11111, 5));
        writer.push((0b1, 1));
        assert_eq!(writer.bytes, vec![0b1011_1111, 0b1000_0000]);
        assert_eq!(writer.bitpos, 9);
    }

    #[test]
    fn test_long_runs_chain_makeup_codes() {
        let mut writer = BitWriter::default();
        writer.push_run(2560 + 2560 + 70, true);
        // 12 + 12 (two 2560 makeups) + 5 (64 makeup) + 4 (6 terminating)
        assert_eq!(writer.bitpos, 33);
    }

    #[test]
    fn test_rejects_short_bitmap() {
        assert!(FaxEncoder::new(&[0xff; 4], 8, 2).is_err());
        assert!(FaxEncoder::with_pitch(&[0xff; 4], 20, 2, 2).is_err());
        assert!(FaxEncoder::with_pitch(&[0xff; 4], 16, 2, 2).is_ok());
    }

    #[test]
    fn test_rejects_empty_width() {
        assert!(matches!(FaxEncoder::new(&[], 0, 3), Err(Error::InvalidParameter(_))));
        assert!(FaxEncoder::with_pitch(&[0xff; 8], 0, 2, 4).is_err());
        assert!(FaxEncoder::with_pitch(&[0xff; 8], 8, 2, 0).is_err());
    }
}
