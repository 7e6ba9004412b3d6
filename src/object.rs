//! PDF object types, reduced to what the stream filters read.
//!
//! The full object model (parsing, indirect references, cross-reference
//! tables) lives in the surrounding PDF library; filters only need typed
//! access to a stream's dictionary and data.

use crate::decoders::{decode_data, DecoderArray, PipelineResult};
use crate::error::{Error, Result};
use std::collections::HashMap;

/// Dictionary of PDF objects keyed by name (without the leading `/`).
pub type Dictionary = HashMap<String, Object>;

/// PDF object representation.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// Null object
    Null,
    /// Boolean value
    Boolean(bool),
    /// Integer value
    Integer(i64),
    /// Real (floating-point) value
    Real(f64),
    /// String (byte array)
    String(Vec<u8>),
    /// Name (starting with /)
    Name(String),
    /// Array of objects
    Array(Vec<Object>),
    /// Dictionary (key-value pairs)
    Dictionary(Dictionary),
    /// Stream (dictionary + data)
    Stream {
        /// Stream dictionary
        dict: Dictionary,
        /// Stream data
        data: bytes::Bytes,
    },
}

impl Object {
    /// Get the type name of this object (without data).
    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Null => "Null",
            Object::Boolean(_) => "Boolean",
            Object::Integer(_) => "Integer",
            Object::Real(_) => "Real",
            Object::String(_) => "String",
            Object::Name(_) => "Name",
            Object::Array(_) => "Array",
            Object::Dictionary(_) => "Dictionary",
            Object::Stream { .. } => "Stream",
        }
    }

    /// Try to cast to integer.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Object::Integer(i) => Some(*i),
            _ => None,
        }
    }

    /// Try to cast to name.
    pub fn as_name(&self) -> Option<&str> {
        match self {
            Object::Name(s) => Some(s),
            _ => None,
        }
    }

    /// Try to cast to dictionary. Works for both Dictionary and Stream objects.
    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            Object::Dictionary(d) => Some(d),
            Object::Stream { dict, .. } => Some(dict),
            _ => None,
        }
    }

    /// Try to cast to array.
    pub fn as_array(&self) -> Option<&Vec<Object>> {
        match self {
            Object::Array(arr) => Some(arr),
            _ => None,
        }
    }

    /// Check if object is null.
    pub fn is_null(&self) -> bool {
        matches!(self, Object::Null)
    }

    /// Numeric value as an integer, the way decode parameters are read.
    ///
    /// Reals are truncated toward zero and booleans count as `0`/`1`, so
    /// `/BlackIs1 true` and `/BlackIs1 1` mean the same thing.
    pub fn integer_value(&self) -> Option<i64> {
        match self {
            Object::Integer(i) => Some(*i),
            Object::Real(r) => Some(*r as i64),
            Object::Boolean(b) => Some(i64::from(*b)),
            _ => None,
        }
    }

    /// Run the stream's filter chain over its data.
    ///
    /// Byte-oriented filters are applied in order. If the chain ends in an
    /// image codec (DCTDecode, CCITTFaxDecode, JPXDecode, ...), the result is
    /// [`PipelineResult::Deferred`] holding the still-encoded bytes.
    ///
    /// # Examples
    ///
    /// ```
    /// use pdf_filters::decoders::PipelineResult;
    /// use pdf_filters::object::{Dictionary, Object};
    ///
    /// let mut dict = Dictionary::new();
    /// dict.insert("Filter".to_string(), Object::Name("AHx".to_string()));
    /// let stream = Object::Stream {
    ///     dict,
    ///     data: bytes::Bytes::from_static(b"48656C6C6F>"),
    /// };
    ///
    /// match stream.decode_stream_data().unwrap() {
    ///     PipelineResult::Decoded(data) => assert_eq!(data, b"Hello"),
    ///     PipelineResult::Deferred(_) => unreachable!(),
    /// }
    /// ```
    pub fn decode_stream_data(&self) -> Result<PipelineResult> {
        match self {
            Object::Stream { dict, data } => {
                let decoders = DecoderArray::from_stream_dict(dict)?;
                decode_data(data, 0, false, &decoders)
            },
            _ => Err(Error::InvalidObjectType {
                expected: "Stream".to_string(),
                found: self.type_name().to_string(),
            }),
        }
    }
}

/// Read an integer entry from an optional parameter dictionary.
///
/// Absent dictionaries, absent keys and non-numeric values all yield
/// `default`.
pub fn integer_for(dict: Option<&Dictionary>, key: &str, default: i64) -> i64 {
    dict.and_then(|d| d.get(key))
        .and_then(Object::integer_value)
        .unwrap_or(default)
}

/// Read a boolean flag (`true`, or any non-zero number) from an optional
/// parameter dictionary.
pub fn flag_for(dict: Option<&Dictionary>, key: &str) -> bool {
    integer_for(dict, key, 0) != 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_integer() {
        let obj = Object::Integer(42);
        assert_eq!(obj.as_integer(), Some(42));
        assert!(obj.as_name().is_none());
        assert!(!obj.is_null());
    }

    #[test]
    fn test_object_name() {
        let obj = Object::Name("Predictor".to_string());
        assert_eq!(obj.as_name(), Some("Predictor"));
        assert!(obj.as_integer().is_none());
    }

    #[test]
    fn test_object_stream_dict_access() {
        let mut dict = Dictionary::new();
        dict.insert("Length".to_string(), Object::Integer(100));
        let obj = Object::Stream {
            dict,
            data: bytes::Bytes::from_static(b"stream data"),
        };

        let d = obj.as_dict().unwrap();
        assert_eq!(d.get("Length").unwrap().as_integer(), Some(100));
    }

    #[test]
    fn test_integer_value_coercions() {
        assert_eq!(Object::Integer(-1).integer_value(), Some(-1));
        assert_eq!(Object::Real(15.9).integer_value(), Some(15));
        assert_eq!(Object::Boolean(true).integer_value(), Some(1));
        assert_eq!(Object::Boolean(false).integer_value(), Some(0));
        assert_eq!(Object::Name("K".to_string()).integer_value(), None);
    }

    #[test]
    fn test_integer_for_defaults() {
        let mut dict = Dictionary::new();
        dict.insert("Columns".to_string(), Object::Integer(4));
        dict.insert("Colors".to_string(), Object::Name("Three".to_string()));

        assert_eq!(integer_for(Some(&dict), "Columns", 1), 4);
        assert_eq!(integer_for(Some(&dict), "Colors", 1), 1);
        assert_eq!(integer_for(Some(&dict), "BitsPerComponent", 8), 8);
        assert_eq!(integer_for(None, "EarlyChange", 1), 1);
    }

    #[test]
    fn test_flag_for() {
        let mut dict = Dictionary::new();
        dict.insert("BlackIs1".to_string(), Object::Boolean(true));
        dict.insert("EndOfLine".to_string(), Object::Integer(0));

        assert!(flag_for(Some(&dict), "BlackIs1"));
        assert!(!flag_for(Some(&dict), "EndOfLine"));
        assert!(!flag_for(Some(&dict), "EncodedByteAlign"));
    }

    #[test]
    fn test_decode_stream_no_filter() {
        let mut dict = Dictionary::new();
        dict.insert("Length".to_string(), Object::Integer(5));
        let obj = Object::Stream {
            dict,
            data: bytes::Bytes::from_static(b"Hello"),
        };

        match obj.decode_stream_data().unwrap() {
            PipelineResult::Decoded(data) => assert_eq!(data, b"Hello"),
            other => panic!("Expected decoded data, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_stream_filter_array() {
        let mut dict = Dictionary::new();
        dict.insert(
            "Filter".to_string(),
            Object::Array(vec![Object::Name("ASCIIHexDecode".to_string())]),
        );
        let obj = Object::Stream {
            dict,
            data: bytes::Bytes::from_static(b"48656C6C6F"),
        };

        match obj.decode_stream_data().unwrap() {
            PipelineResult::Decoded(data) => assert_eq!(data, b"Hello"),
            other => panic!("Expected decoded data, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_stream_not_a_stream() {
        let obj = Object::Integer(42);
        match obj.decode_stream_data() {
            Err(Error::InvalidObjectType { expected, found }) => {
                assert_eq!(expected, "Stream");
                assert_eq!(found, "Integer");
            },
            _ => panic!("Expected InvalidObjectType error"),
        }
    }
}
