//! Error types for the filter codecs.
//!
//! Every decode primitive reports failure through [`Error`] instead of a
//! magic "invalid offset" value, so each call site has to handle it.

/// Result type alias for codec operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error types that can occur while decoding or encoding stream data.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Filter chain is structurally unusable (checked before any decoding)
    #[error("Malformed filter chain: {0}")]
    MalformedFilterChain(String),

    /// A decode parameter is out of range or inconsistent
    #[error("Invalid decode parameter: {0}")]
    InvalidParameter(String),

    /// Stream decoding error
    #[error("Stream decoding error: {0}")]
    Decode(String),

    /// A size cap was hit or a size computation overflowed
    #[error("{what} exceeds limit of {limit} bytes")]
    LimitExceeded {
        /// What was being sized
        what: String,
        /// The limit that applied
        limit: usize,
    },

    /// Filter name that the byte-oriented decoders cannot handle
    #[error("Unsupported filter: {0}")]
    UnsupportedFilter(String),

    /// Error reported by an external image codec
    #[error("Image error: {0}")]
    Image(String),

    /// Object has wrong type
    #[error("Invalid object type: expected {expected}, found {found}")]
    InvalidObjectType {
        /// Expected object type
        expected: String,
        /// Actual object type found
        found: String,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Shorthand for a [`Error::LimitExceeded`] with a static description.
    pub(crate) fn limit(what: &str, limit: usize) -> Self {
        Error::LimitExceeded {
            what: what.to_string(),
            limit,
        }
    }
}
