//! Decoder configuration: resource limits and lenient/strict recovery.

/// Options controlling resource limits and error recovery of the codecs.
///
/// The defaults bound memory use on hostile input while still accepting the
/// slightly broken streams that real-world producers emit.
///
/// # Example
///
/// ```
/// use pdf_filters::decoder_config::DecoderOptions;
///
/// // Lenient mode - keep whatever a corrupt deflate stream produced (default)
/// let lenient = DecoderOptions::lenient();
///
/// // Strict mode - corrupt deflate data is an error
/// let strict = DecoderOptions::strict();
///
/// // Custom configuration
/// let custom = DecoderOptions {
///     max_flate_output: 64 * 1024 * 1024,
///     ..DecoderOptions::default()
/// };
/// assert!(custom.max_flate_output < lenient.max_flate_output);
/// # let _ = strict;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecoderOptions {
    /// Fail on corrupt deflate data (true) or return the output produced
    /// before the corruption (false)
    pub strict: bool,

    /// Maximum total output of a Flate or LZW decode, in bytes
    ///
    /// Default: 1 GiB.
    pub max_flate_output: usize,

    /// Maximum output of a RunLength decode, in bytes
    ///
    /// The dry-run size must stay strictly below this value. Default: 20 MiB.
    pub max_run_length_output: usize,

    /// Largest accepted fax image width or height, in pixels
    pub max_image_dimension: u32,

    /// Capacity of the LZW prefix-chain stack
    ///
    /// Strings longer than this are truncated rather than rejected.
    pub lzw_stack_size: usize,

    /// Cap on the first Flate output chunk, in bytes
    ///
    /// The chunk is sized from the caller's estimate (or twice the input
    /// length) but never above this value.
    pub max_initial_alloc: usize,
}

impl Default for DecoderOptions {
    /// Default configuration: lenient mode
    fn default() -> Self {
        Self::lenient()
    }
}

impl DecoderOptions {
    /// Strict mode: corrupt deflate data fails the decode
    pub fn strict() -> Self {
        Self {
            strict: true,
            ..Self::lenient()
        }
    }

    /// Lenient mode: recover as much data as possible
    pub fn lenient() -> Self {
        Self {
            strict: false,
            max_flate_output: 1024 * 1024 * 1024,   // 1 GiB
            max_run_length_output: 20 * 1024 * 1024, // 20 MiB
            max_image_dimension: 65535,
            lzw_stack_size: 4000,
            max_initial_alloc: 10_000_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_lenient() {
        let opts = DecoderOptions::default();
        assert!(!opts.strict);
        assert_eq!(opts, DecoderOptions::lenient());
    }

    #[test]
    fn test_strict_keeps_limits() {
        let strict = DecoderOptions::strict();
        let lenient = DecoderOptions::lenient();
        assert!(strict.strict);
        assert_eq!(strict.max_flate_output, lenient.max_flate_output);
        assert_eq!(strict.max_run_length_output, 20 * 1024 * 1024);
        assert_eq!(strict.max_image_dimension, 65535);
        assert_eq!(strict.lzw_stack_size, 4000);
    }
}
