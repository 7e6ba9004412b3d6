//! Random access to scanlines over a sequential decoder.
//!
//! Image codecs (fax, run-length, streaming inflate, JPEG) produce rows one
//! after another. [`ScanlineDecoder`] layers random access on top: asking
//! for row `n` replays the underlying decoder from the start when `n` is
//! behind the current position, skips forward otherwise, and serves the
//! previous row again without recomputation.
//!
//! The returned row borrows the decoder's reusable line buffer, so the
//! borrow checker forbids holding it across the next call.

/// Cooperative pause point for long skips.
pub trait PauseIndicator {
    /// Return `true` to make [`ScanlineDecoder::skip_to_scanline`] stop after
    /// the current row.
    fn need_to_pause_now(&mut self) -> bool;
}

impl<F: FnMut() -> bool> PauseIndicator for F {
    fn need_to_pause_now(&mut self) -> bool {
        self()
    }
}

/// Dimensions and row layout of a scanline decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScanlineGeometry {
    /// Width declared by the encoded data or the caller
    pub orig_width: u32,
    /// Height declared by the encoded data or the caller
    pub orig_height: u32,
    /// Width of the rows actually produced
    pub output_width: u32,
    /// Number of rows actually produced
    pub output_height: u32,
    /// Components per pixel
    pub components: u32,
    /// Bits per component
    pub bits_per_component: u32,
    /// Bytes per produced row
    pub pitch: usize,
}

impl ScanlineGeometry {
    /// Geometry whose output size equals the declared size.
    pub fn new(width: u32, height: u32, components: u32, bits_per_component: u32, pitch: usize) -> Self {
        Self {
            orig_width: width,
            orig_height: height,
            output_width: width,
            output_height: height,
            components,
            bits_per_component,
            pitch,
        }
    }
}

/// Row pitch rounded up to a multiple of 4 bytes.
pub fn pitch_32(bits_per_component: u32, components: u32, width: u32) -> Option<usize> {
    let bits = (bits_per_component as usize)
        .checked_mul(components as usize)?
        .checked_mul(width as usize)?;
    Some(bits.checked_add(31)? / 32 * 4)
}

/// Row pitch rounded up to a whole byte.
pub fn pitch_8(bits_per_component: u32, components: u32, width: u32) -> Option<usize> {
    let bits = (bits_per_component as usize)
        .checked_mul(components as usize)?
        .checked_mul(width as usize)?;
    Some(bits.checked_add(7)? / 8)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Position {
    /// Nothing decoded yet
    Unstarted,
    /// `next_line` rows have been read since the last rewind; `cached` means
    /// the line buffer still holds row `next_line - 1`
    Positioned { next_line: usize, cached: bool },
    /// The source ran out while reading row `next_line`
    Exhausted { next_line: usize },
}

/// Position bookkeeping shared by every scanline decoder.
#[derive(Debug, Clone)]
pub struct ScanlineState {
    geometry: ScanlineGeometry,
    position: Position,
}

impl ScanlineState {
    /// Fresh state for a decoder that has not read anything.
    pub fn new(geometry: ScanlineGeometry) -> Self {
        Self {
            geometry,
            position: Position::Unstarted,
        }
    }

    /// Row layout of the decoder.
    pub fn geometry(&self) -> &ScanlineGeometry {
        &self.geometry
    }

    /// Index of the next row the sequential source will produce, if started.
    pub fn next_line(&self) -> Option<usize> {
        match self.position {
            Position::Unstarted => None,
            Position::Positioned { next_line, .. } | Position::Exhausted { next_line } => Some(next_line),
        }
    }

    /// Whether the source ran out of data.
    pub fn is_exhausted(&self) -> bool {
        matches!(self.position, Position::Exhausted { .. })
    }
}

/// Outcome of [`ScanlineDecoder::skip_to_scanline`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipStatus {
    /// The decoder is positioned so the requested row is read next (or is
    /// already cached)
    Reached,
    /// The pause indicator asked to stop; call again to continue
    Paused,
    /// The source ran out before the requested row
    Exhausted,
}

/// A sequential row decoder with random access on top.
///
/// Implementors provide the sequential part (`rewind_source`,
/// `read_next_line`, `current_line`); the provided methods implement the
/// positioning logic.
pub trait ScanlineDecoder {
    /// Shared position state.
    fn state(&self) -> &ScanlineState;

    /// Shared position state, mutably.
    fn state_mut(&mut self) -> &mut ScanlineState;

    /// Reset the sequential source to row 0. Returns `false` if it cannot
    /// be restarted.
    fn rewind_source(&mut self) -> bool;

    /// Decode the next row into the line buffer. Returns `false` at end of
    /// data.
    fn read_next_line(&mut self) -> bool;

    /// The line buffer holding the most recently read row.
    fn current_line(&self) -> &[u8];

    /// Number of encoded bytes consumed so far.
    fn src_offset(&self) -> usize;

    /// Row layout of the decoder.
    fn geometry(&self) -> ScanlineGeometry {
        *self.state().geometry()
    }

    /// Width of the produced rows in pixels.
    fn width(&self) -> u32 {
        self.state().geometry().output_width
    }

    /// Number of rows produced.
    fn height(&self) -> u32 {
        self.state().geometry().output_height
    }

    /// Components per pixel.
    fn components(&self) -> u32 {
        self.state().geometry().components
    }

    /// Bits per component.
    fn bits_per_component(&self) -> u32 {
        self.state().geometry().bits_per_component
    }

    /// Bytes per produced row.
    fn pitch(&self) -> usize {
        self.state().geometry().pitch
    }

    /// Restart decoding at row 0.
    fn rewind(&mut self) -> bool {
        if !self.rewind_source() {
            self.state_mut().position = Position::Unstarted;
            return false;
        }
        self.state_mut().position = Position::Positioned {
            next_line: 0,
            cached: false,
        };
        true
    }

    /// Decode and return row `line`.
    ///
    /// Returns `None` for rows past the image height and once the source
    /// runs out of data.
    fn get_scanline(&mut self, line: usize) -> Option<&[u8]> {
        if line >= self.height() as usize {
            return None;
        }
        let position = self.state().position;
        if position
            == (Position::Positioned {
                next_line: line + 1,
                cached: true,
            })
        {
            return Some(self.current_line());
        }

        let mut next_line = match position {
            Position::Positioned { next_line, .. } if next_line <= line => next_line,
            Position::Exhausted { next_line } if next_line <= line => return None,
            _ => {
                if !self.rewind() {
                    return None;
                }
                0
            },
        };

        while next_line < line {
            if !self.read_next_line() {
                self.state_mut().position = Position::Exhausted { next_line };
                return None;
            }
            next_line += 1;
        }
        if !self.read_next_line() {
            self.state_mut().position = Position::Exhausted { next_line };
            return None;
        }
        self.state_mut().position = Position::Positioned {
            next_line: line + 1,
            cached: true,
        };
        Some(self.current_line())
    }

    /// Advance so that row `line` is the next one read, consulting `pause`
    /// after every skipped row.
    fn skip_to_scanline(&mut self, line: usize, mut pause: Option<&mut dyn PauseIndicator>) -> SkipStatus {
        if line > self.height() as usize {
            return SkipStatus::Exhausted;
        }
        let mut next_line = match self.state().position {
            Position::Positioned { next_line, .. } if next_line == line || next_line == line + 1 => {
                return SkipStatus::Reached;
            },
            Position::Positioned { next_line, .. } if next_line < line => next_line,
            Position::Exhausted { next_line } if next_line <= line => return SkipStatus::Exhausted,
            _ => {
                if !self.rewind() {
                    return SkipStatus::Exhausted;
                }
                0
            },
        };

        while next_line < line {
            if !self.read_next_line() {
                self.state_mut().position = Position::Exhausted { next_line };
                return SkipStatus::Exhausted;
            }
            next_line += 1;
            // The line buffer holds the row just skipped
            self.state_mut().position = Position::Positioned {
                next_line,
                cached: true,
            };
            if let Some(pause) = pause.as_deref_mut() {
                if pause.need_to_pause_now() {
                    return SkipStatus::Paused;
                }
            }
        }
        SkipStatus::Reached
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Produces `rows` rows where every byte equals the row index.
    struct CountingDecoder {
        state: ScanlineState,
        rows: usize,
        produced: usize,
        line: Vec<u8>,
        rewinds: usize,
        reads: usize,
    }

    impl CountingDecoder {
        fn new(rows: usize) -> Self {
            Self {
                // Declared height is larger than the data so exhaustion is observable
                state: ScanlineState::new(ScanlineGeometry::new(4, 100, 1, 8, 4)),
                rows,
                produced: 0,
                line: vec![0; 4],
                rewinds: 0,
                reads: 0,
            }
        }
    }

    impl ScanlineDecoder for CountingDecoder {
        fn state(&self) -> &ScanlineState {
            &self.state
        }

        fn state_mut(&mut self) -> &mut ScanlineState {
            &mut self.state
        }

        fn rewind_source(&mut self) -> bool {
            self.produced = 0;
            self.rewinds += 1;
            true
        }

        fn read_next_line(&mut self) -> bool {
            if self.produced >= self.rows {
                return false;
            }
            self.reads += 1;
            self.line.fill(self.produced as u8);
            self.produced += 1;
            true
        }

        fn current_line(&self) -> &[u8] {
            &self.line
        }

        fn src_offset(&self) -> usize {
            self.produced * 4
        }
    }

    #[test]
    fn test_first_access_rewinds() {
        let mut dec = CountingDecoder::new(5);
        assert_eq!(dec.state().next_line(), None);
        assert_eq!(dec.get_scanline(2).unwrap(), &[2, 2, 2, 2]);
        assert_eq!(dec.rewinds, 1);
        assert_eq!(dec.reads, 3);
        assert_eq!(dec.state().next_line(), Some(3));
    }

    #[test]
    fn test_repeated_line_is_cached() {
        let mut dec = CountingDecoder::new(5);
        dec.get_scanline(1).unwrap();
        let reads = dec.reads;
        assert_eq!(dec.get_scanline(1).unwrap(), &[1, 1, 1, 1]);
        assert_eq!(dec.reads, reads);
    }

    #[test]
    fn test_sequential_access_does_not_rewind() {
        let mut dec = CountingDecoder::new(5);
        for row in 0..5 {
            assert_eq!(dec.get_scanline(row).unwrap()[0], row as u8);
        }
        assert_eq!(dec.rewinds, 1);
        assert_eq!(dec.reads, 5);
    }

    #[test]
    fn test_backward_access_rewinds() {
        let mut dec = CountingDecoder::new(5);
        dec.get_scanline(3).unwrap();
        assert_eq!(dec.get_scanline(1).unwrap(), &[1, 1, 1, 1]);
        assert_eq!(dec.rewinds, 2);
    }

    #[test]
    fn test_past_end_is_exhausted() {
        let mut dec = CountingDecoder::new(2);
        assert!(dec.get_scanline(5).is_none());
        assert!(dec.state().is_exhausted());
        let reads = dec.reads;
        assert!(dec.get_scanline(6).is_none());
        assert_eq!(dec.reads, reads);
        // Going back still works
        assert_eq!(dec.get_scanline(0).unwrap(), &[0, 0, 0, 0]);
    }

    #[test]
    fn test_skip_to_scanline_pauses() {
        let mut dec = CountingDecoder::new(10);
        let mut budget = 2;
        let mut pause = || {
            budget -= 1;
            budget == 0
        };
        assert_eq!(dec.skip_to_scanline(6, Some(&mut pause)), SkipStatus::Paused);
        assert_eq!(dec.state().next_line(), Some(2));

        assert_eq!(dec.skip_to_scanline(6, None), SkipStatus::Reached);
        assert_eq!(dec.state().next_line(), Some(6));
        assert_eq!(dec.get_scanline(6).unwrap(), &[6, 6, 6, 6]);
        assert_eq!(dec.rewinds, 1);
    }

    #[test]
    fn test_get_after_skip_reuses_decoded_rows() {
        let mut dec = CountingDecoder::new(10);
        assert_eq!(dec.skip_to_scanline(5, None), SkipStatus::Reached);
        assert_eq!(dec.reads, 5);

        // Last skipped row is served from the line buffer
        assert_eq!(dec.get_scanline(4).unwrap(), &[4, 4, 4, 4]);
        assert_eq!(dec.reads, 5);

        // The target row costs exactly one more read
        assert_eq!(dec.get_scanline(5).unwrap(), &[5, 5, 5, 5]);
        assert_eq!(dec.reads, 6);
        assert_eq!(dec.rewinds, 1);
    }

    #[test]
    fn test_skip_to_current_position_is_noop() {
        let mut dec = CountingDecoder::new(10);
        dec.get_scanline(3).unwrap();
        let reads = dec.reads;
        assert_eq!(dec.skip_to_scanline(3, None), SkipStatus::Reached);
        assert_eq!(dec.skip_to_scanline(4, None), SkipStatus::Reached);
        assert_eq!(dec.reads, reads);
    }

    #[test]
    fn test_rows_past_height_are_rejected() {
        let mut dec = CountingDecoder::new(200);
        assert!(dec.get_scanline(100).is_none());
        assert_eq!(dec.reads, 0);
        assert!(dec.get_scanline(99).is_some());
        assert_eq!(dec.skip_to_scanline(101, None), SkipStatus::Exhausted);
    }

    #[test]
    fn test_skip_past_end() {
        let mut dec = CountingDecoder::new(3);
        assert_eq!(dec.skip_to_scanline(8, None), SkipStatus::Exhausted);
    }

    #[test]
    fn test_pitch_helpers() {
        assert_eq!(pitch_32(1, 1, 2), Some(4));
        assert_eq!(pitch_32(1, 1, 33), Some(8));
        assert_eq!(pitch_32(8, 3, 5), Some(16));
        assert_eq!(pitch_8(8, 3, 5), Some(15));
        assert_eq!(pitch_8(1, 1, 9), Some(2));
    }
}
