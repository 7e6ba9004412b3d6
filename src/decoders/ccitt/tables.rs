//! Modified Huffman run-length codes (ITU-T T.4, tables 2 and 3).
//!
//! Each entry is `(code, length)`: the code occupies the low `length` bits,
//! most significant bit first. Terminating codes cover runs 0..=63, makeup
//! codes runs 64..=2560 in steps of 64; the makeup codes from 1792 upward
//! are shared by both colours.

use lazy_static::lazy_static;
use std::collections::HashMap;

/// Longest run a single makeup code describes.
pub(super) const MAX_MAKEUP_RUN: usize = 2560;

pub(super) const WHITE_TERMINATING: [(u16, u8); 64] = [
    (0x35, 8), (0x07, 6), (0x07, 4), (0x08, 4), (0x0b, 4), (0x0c, 4), (0x0e, 4), (0x0f, 4),
    (0x13, 5), (0x14, 5), (0x07, 5), (0x08, 5), (0x08, 6), (0x03, 6), (0x34, 6), (0x35, 6),
    (0x2a, 6), (0x2b, 6), (0x27, 7), (0x0c, 7), (0x08, 7), (0x17, 7), (0x03, 7), (0x04, 7),
    (0x28, 7), (0x2b, 7), (0x13, 7), (0x24, 7), (0x18, 7), (0x02, 8), (0x03, 8), (0x1a, 8),
    (0x1b, 8), (0x12, 8), (0x13, 8), (0x14, 8), (0x15, 8), (0x16, 8), (0x17, 8), (0x28, 8),
    (0x29, 8), (0x2a, 8), (0x2b, 8), (0x2c, 8), (0x2d, 8), (0x04, 8), (0x05, 8), (0x0a, 8),
    (0x0b, 8), (0x52, 8), (0x53, 8), (0x54, 8), (0x55, 8), (0x24, 8), (0x25, 8), (0x58, 8),
    (0x59, 8), (0x5a, 8), (0x5b, 8), (0x4a, 8), (0x4b, 8), (0x32, 8), (0x33, 8), (0x34, 8),
];

pub(super) const BLACK_TERMINATING: [(u16, u8); 64] = [
    (0x37, 10), (0x02, 3), (0x03, 2), (0x02, 2), (0x03, 3), (0x03, 4), (0x02, 4), (0x03, 5),
    (0x05, 6), (0x04, 6), (0x04, 7), (0x05, 7), (0x07, 7), (0x04, 8), (0x07, 8), (0x18, 9),
    (0x17, 10), (0x18, 10), (0x08, 10), (0x67, 11), (0x68, 11), (0x6c, 11), (0x37, 11), (0x28, 11),
    (0x17, 11), (0x18, 11), (0xca, 12), (0xcb, 12), (0xcc, 12), (0xcd, 12), (0x68, 12), (0x69, 12),
    (0x6a, 12), (0x6b, 12), (0xd2, 12), (0xd3, 12), (0xd4, 12), (0xd5, 12), (0xd6, 12), (0xd7, 12),
    (0x6c, 12), (0x6d, 12), (0xda, 12), (0xdb, 12), (0x54, 12), (0x55, 12), (0x56, 12), (0x57, 12),
    (0x64, 12), (0x65, 12), (0x52, 12), (0x53, 12), (0x24, 12), (0x37, 12), (0x38, 12), (0x27, 12),
    (0x28, 12), (0x58, 12), (0x59, 12), (0x2b, 12), (0x2c, 12), (0x5a, 12), (0x66, 12), (0x67, 12),
];

/// Makeup codes for 64..=1728.
pub(super) const WHITE_MAKEUP: [(u16, u8); 27] = [
    (0x1b, 5), (0x12, 5), (0x17, 6), (0x37, 7), (0x36, 8), (0x37, 8), (0x64, 8), (0x65, 8),
    (0x68, 8), (0x67, 8), (0xcc, 9), (0xcd, 9), (0xd2, 9), (0xd3, 9), (0xd4, 9), (0xd5, 9),
    (0xd6, 9), (0xd7, 9), (0xd8, 9), (0xd9, 9), (0xda, 9), (0xdb, 9), (0x98, 9), (0x99, 9),
    (0x9a, 9), (0x18, 6), (0x9b, 9),
];

/// Makeup codes for 64..=1728.
pub(super) const BLACK_MAKEUP: [(u16, u8); 27] = [
    (0x0f, 10), (0xc8, 12), (0xc9, 12), (0x5b, 12), (0x33, 12), (0x34, 12), (0x35, 12), (0x6c, 13),
    (0x6d, 13), (0x4a, 13), (0x4b, 13), (0x4c, 13), (0x4d, 13), (0x72, 13), (0x73, 13), (0x74, 13),
    (0x75, 13), (0x76, 13), (0x77, 13), (0x52, 13), (0x53, 13), (0x54, 13), (0x55, 13), (0x5a, 13),
    (0x5b, 13), (0x64, 13), (0x65, 13),
];

/// Makeup codes for 1792..=2560, shared by both colours.
pub(super) const EXTENDED_MAKEUP: [(u16, u8); 13] = [
    (0x08, 11), (0x0c, 11), (0x0d, 11), (0x12, 12), (0x13, 12), (0x14, 12), (0x15, 12),
    (0x16, 12), (0x17, 12), (0x1c, 12), (0x1d, 12), (0x1e, 12), (0x1f, 12),
];

/// Code for a run in `0..64` of the given colour.
pub(super) fn terminating_code(run: usize, white: bool) -> (u16, u8) {
    if white {
        WHITE_TERMINATING[run]
    } else {
        BLACK_TERMINATING[run]
    }
}

/// Code for a makeup run, a multiple of 64 in `64..=2560`.
pub(super) fn makeup_code(run: usize, white: bool) -> (u16, u8) {
    let index = run / 64 - 1;
    if index >= 27 {
        EXTENDED_MAKEUP[index - 27]
    } else if white {
        WHITE_MAKEUP[index]
    } else {
        BLACK_MAKEUP[index]
    }
}

/// Decode lookup for one colour.
pub(super) struct RunTable {
    codes: HashMap<(u8, u16), u16>,
    max_length: u8,
}

impl RunTable {
    fn build(terminating: &[(u16, u8)], makeup: &[(u16, u8)]) -> Self {
        let mut codes = HashMap::new();
        let mut max_length = 0;
        let runs = terminating
            .iter()
            .enumerate()
            .map(|(run, &code)| (run as u16, code))
            .chain(
                makeup
                    .iter()
                    .chain(EXTENDED_MAKEUP.iter())
                    .enumerate()
                    .map(|(i, &code)| ((i as u16 + 1) * 64, code)),
            );
        for (run, (code, length)) in runs {
            codes.insert((length, code), run);
            max_length = max_length.max(length);
        }
        Self { codes, max_length }
    }

    /// Run length for a `length`-bit code, if it is one.
    pub(super) fn lookup(&self, length: u8, code: u16) -> Option<u16> {
        self.codes.get(&(length, code)).copied()
    }

    /// Length of the longest code in the table.
    pub(super) fn max_length(&self) -> u8 {
        self.max_length
    }
}

lazy_static! {
    pub(super) static ref WHITE_RUNS: RunTable = RunTable::build(&WHITE_TERMINATING, &WHITE_MAKEUP);
    pub(super) static ref BLACK_RUNS: RunTable = RunTable::build(&BLACK_TERMINATING, &BLACK_MAKEUP);
}

/// Decode lookup for the colour (`true` = white).
pub(super) fn run_table(white: bool) -> &'static RunTable {
    if white {
        &WHITE_RUNS
    } else {
        &BLACK_RUNS
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tables_are_prefix_free() {
        for table in [&*WHITE_RUNS, &*BLACK_RUNS] {
            assert_eq!(table.codes.len(), 104);
            for &(len_a, code_a) in table.codes.keys() {
                for &(len_b, code_b) in table.codes.keys() {
                    if len_a < len_b {
                        assert_ne!(code_b >> (len_b - len_a), code_a, "code is a prefix of another");
                    }
                }
            }
        }
    }

    #[test]
    fn test_max_code_lengths() {
        assert_eq!(WHITE_RUNS.max_length(), 12);
        assert_eq!(BLACK_RUNS.max_length(), 13);
    }

    #[test]
    fn test_makeup_lookup() {
        assert_eq!(makeup_code(64, true), (0x1b, 5));
        assert_eq!(makeup_code(1728, false), (0x65, 13));
        assert_eq!(makeup_code(1792, true), makeup_code(1792, false));
        assert_eq!(makeup_code(MAX_MAKEUP_RUN, true), (0x1f, 12));
        assert_eq!(WHITE_RUNS.lookup(12, 0x1f), Some(2560));
        assert_eq!(BLACK_RUNS.lookup(2, 0x03), Some(2));
        assert_eq!(WHITE_RUNS.lookup(4, 0x0e), Some(6));
    }
}
