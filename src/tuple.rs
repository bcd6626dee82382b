//! Tuple codec
//!
//! A [`Tuple`] is a bounded, ordered sequence of scalar samples stored in the
//! coordination store as a single comma-delimited string. The same codec is
//! used for the `value` and `timestamp` series of every catalog entry.
//!
//! The empty tuple encodes to the empty string. It is the sentinel for "no
//! prior data" and is never a valid merge result.
//!
//! # Example
//!
//! ```rust
//! use kuba_stats::tuple::Tuple;
//!
//! let tuple = Tuple::decode("1,2.5,3").unwrap();
//! assert_eq!(tuple.len(), 3);
//! assert_eq!(tuple.encode(), "1,2.5,3");
//!
//! assert!(Tuple::decode("").unwrap().is_empty());
//! assert!(Tuple::decode("1,,3").is_err());
//! ```

use std::fmt;

use crate::error::{Error, Result};

/// Element delimiter in the encoded form
pub const ELEMENT_SEPARATOR: char = ',';

/// Encoded form of the empty (sentinel) tuple
pub const EMPTY_TUPLE: &str = "";

/// Ordered sequence of string-encoded scalars
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tuple {
    elements: Vec<String>,
}

impl Tuple {
    /// Create the empty sentinel tuple
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a tuple from numeric samples
    pub fn from_f64s<I>(values: I) -> Self
    where
        I: IntoIterator<Item = f64>,
    {
        Self {
            elements: values.into_iter().map(format_scalar).collect(),
        }
    }

    /// Encode into the delimited wire form
    pub fn encode(&self) -> String {
        encode(&self.elements)
    }

    /// Decode from the delimited wire form
    ///
    /// Fails with [`Error::Format`] when an element is empty or not a finite
    /// number.
    pub fn decode(encoded: &str) -> Result<Self> {
        decode(encoded).map(|elements| Self { elements })
    }

    /// Decode an optional field, treating a missing field as the sentinel
    pub fn decode_field(field: Option<&String>) -> Result<Self> {
        match field {
            Some(encoded) => Self::decode(encoded),
            None => Ok(Self::new()),
        }
    }

    /// Number of elements
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// True for the sentinel tuple
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Raw elements
    pub fn elements(&self) -> &[String] {
        &self.elements
    }

    /// Append a raw element
    pub fn push(&mut self, element: impl Into<String>) {
        self.elements.push(element.into());
    }

    /// Last element as a number
    pub fn last_f64(&self) -> Option<f64> {
        self.elements.last().and_then(|e| e.parse().ok())
    }

    /// Drop the oldest elements so at most `max_len` remain
    pub fn truncate_front(&mut self, max_len: usize) {
        if self.elements.len() > max_len {
            let excess = self.elements.len() - max_len;
            self.elements.drain(..excess);
        }
    }

    /// Parse every element as a number
    pub fn to_f64s(&self) -> Result<Vec<f64>> {
        self.elements
            .iter()
            .map(|e| parse_scalar(e))
            .collect()
    }
}

impl fmt::Display for Tuple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

impl From<Vec<String>> for Tuple {
    fn from(elements: Vec<String>) -> Self {
        Self { elements }
    }
}

/// Encode a sequence of scalar strings
pub fn encode<S: AsRef<str>>(elements: &[S]) -> String {
    let mut out = String::new();
    for (i, element) in elements.iter().enumerate() {
        if i > 0 {
            out.push(ELEMENT_SEPARATOR);
        }
        out.push_str(element.as_ref());
    }
    out
}

/// Decode a delimited string into scalar strings
pub fn decode(encoded: &str) -> Result<Vec<String>> {
    if encoded == EMPTY_TUPLE {
        return Ok(Vec::new());
    }

    encoded
        .split(ELEMENT_SEPARATOR)
        .enumerate()
        .map(|(position, element)| {
            if element.is_empty() {
                return Err(Error::Format(format!(
                    "empty element at position {} in '{}'",
                    position, encoded
                )));
            }
            parse_scalar(element)?;
            Ok(element.to_string())
        })
        .collect()
}

fn parse_scalar(element: &str) -> Result<f64> {
    match element.parse::<f64>() {
        Ok(v) if v.is_finite() => Ok(v),
        _ => Err(Error::Format(format!("'{}' is not a finite scalar", element))),
    }
}

/// Render a number the way merged samples are stored
pub fn format_scalar(value: f64) -> String {
    format!("{}", value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_roundtrip() {
        assert_eq!(Tuple::new().encode(), EMPTY_TUPLE);
        assert!(Tuple::decode(EMPTY_TUPLE).unwrap().is_empty());
    }

    #[test]
    fn test_decode_preserves_text() {
        let tuple = Tuple::decode("1.50,-2,1e3").unwrap();
        assert_eq!(tuple.elements(), &["1.50", "-2", "1e3"]);
        assert_eq!(tuple.encode(), "1.50,-2,1e3");
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(Tuple::decode("1,,2"), Err(Error::Format(_))));
        assert!(matches!(Tuple::decode(","), Err(Error::Format(_))));
        assert!(matches!(Tuple::decode("abc"), Err(Error::Format(_))));
        assert!(matches!(Tuple::decode("1, 2"), Err(Error::Format(_))));
        assert!(matches!(Tuple::decode("NaN"), Err(Error::Format(_))));
    }

    #[test]
    fn test_missing_field_is_sentinel() {
        assert!(Tuple::decode_field(None).unwrap().is_empty());
        let field = "7".to_string();
        assert_eq!(Tuple::decode_field(Some(&field)).unwrap().len(), 1);
    }

    #[test]
    fn test_truncate_front() {
        let mut tuple = Tuple::from_f64s([1.0, 2.0, 3.0, 4.0]);
        tuple.truncate_front(2);
        assert_eq!(tuple.encode(), "3,4");
        tuple.truncate_front(5);
        assert_eq!(tuple.len(), 2);
    }

    #[test]
    fn test_format_scalar() {
        assert_eq!(format_scalar(3.0), "3");
        assert_eq!(format_scalar(0.25), "0.25");
    }
}
