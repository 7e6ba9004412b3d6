//! Bit-level helpers over packed 1-bpp rows (MSB first, 1 = white).
//!
//! Positions are signed because the coding cursor starts at the imaginary
//! pixel `-1` in front of each row.

/// Read the bit at `bitpos` and advance, or `None` past `bitsize`.
pub(super) fn next_bit(src: &[u8], bitsize: usize, bitpos: &mut usize) -> Option<bool> {
    if *bitpos >= bitsize {
        return None;
    }
    let bit = src.get(*bitpos / 8).is_some_and(|byte| byte & (0x80 >> (*bitpos % 8)) != 0);
    *bitpos += 1;
    Some(bit)
}

/// Value of pixel `pos` in a packed row.
pub(super) fn pixel(row: &[u8], pos: i64) -> bool {
    usize::try_from(pos)
        .ok()
        .and_then(|pos| row.get(pos / 8).map(|byte| byte & (0x80 >> (pos % 8)) != 0))
        .unwrap_or(false)
}

/// Position of the first pixel at or after `start_pos` whose value is
/// `bit`, or `max_pos` if there is none before it.
pub(super) fn find_bit(row: &[u8], max_pos: i64, start_pos: i64, bit: bool) -> i64 {
    if start_pos >= max_pos {
        return max_pos;
    }
    let start_pos = start_pos.max(0);
    let flip: u8 = if bit { 0x00 } else { 0xff };
    let byte_at = |index: i64| -> Option<u8> { row.get(index as usize).map(|byte| byte ^ flip) };

    let mut start = start_pos;
    let offset = start % 8;
    if offset != 0 {
        let byte_pos = start / 8;
        let Some(data) = byte_at(byte_pos) else {
            return max_pos;
        };
        let data = data & (0xff >> offset);
        if data != 0 {
            return (byte_pos * 8 + i64::from(data.leading_zeros())).min(max_pos);
        }
        start += 7;
    }

    let max_byte = (max_pos + 7) / 8;
    let mut byte_pos = start / 8;

    // Skip 8-byte blocks that cannot contain the bit
    const BLOCK: i64 = 8;
    let skip = if bit { [0x00u8; 8] } else { [0xffu8; 8] };
    while byte_pos < max_byte - BLOCK {
        let (from, to) = (byte_pos as usize, (byte_pos + BLOCK) as usize);
        match row.get(from..to) {
            Some(block) if block == skip.as_slice() => byte_pos += BLOCK,
            _ => break,
        }
    }

    while byte_pos < max_byte {
        let Some(data) = byte_at(byte_pos) else {
            return max_pos;
        };
        if data != 0 {
            return (byte_pos * 8 + i64::from(data.leading_zeros())).min(max_pos);
        }
        byte_pos += 1;
    }
    max_pos
}

/// Paint pixels `start..end` black (clear them), clipped to `0..columns`.
pub(super) fn fill_bits(dest: &mut [u8], columns: i64, start: i64, end: i64) {
    let start = start.max(0);
    let end = end.clamp(0, columns);
    if start >= end {
        return;
    }
    let (start, end) = (start as usize, end as usize);

    let first_byte = start / 8;
    let last_byte = (end - 1) / 8;
    if last_byte >= dest.len() {
        return;
    }
    if first_byte == last_byte {
        let mask = (0xffu8 >> (start % 8)) & (0xffu8 << (7 - (end - 1) % 8));
        dest[first_byte] &= !mask;
        return;
    }
    dest[first_byte] &= !(0xffu8 >> (start % 8));
    dest[first_byte + 1..last_byte].fill(0);
    dest[last_byte] &= !(0xffu8 << (7 - (end - 1) % 8));
}

/// Changing elements `b1` and `b2` on the reference row for a cursor at
/// `a0` with colour `a0_white`.
///
/// `b1` is the first change right of `a0` to the colour opposite
/// `a0_white`; `b2` is the change after it. Both are `columns` when the
/// reference row has no such change.
pub(super) fn find_b1_b2(reference: &[u8], columns: i64, a0: i64, a0_white: bool) -> (i64, i64) {
    let mut first_bit = a0 < 0 || pixel(reference, a0);
    let mut b1 = find_bit(reference, columns, a0 + 1, !first_bit);
    if b1 >= columns {
        return (columns, columns);
    }
    if first_bit == !a0_white {
        b1 = find_bit(reference, columns, b1 + 1, first_bit);
        first_bit = !first_bit;
    }
    if b1 >= columns {
        return (columns, columns);
    }
    (b1, find_bit(reference, columns, b1 + 1, first_bit))
}
