//! Property value types for records
//!
//! This module defines `Value`, the closed type universe for record
//! properties. A property is one of exactly six types:
//! - Str: UTF-8 string (backends may box long strings into a wider type)
//! - Int: 64-bit signed integer
//! - Double: 64-bit floating point (IEEE-754)
//! - Bool: boolean
//! - Date: UTC timestamp with millisecond precision
//! - Blob: opaque binary
//!
//! ## Type Rules
//!
//! - Different types are NEVER equal: `Int(1) != Double(1.0)`
//! - There is no null and no nesting; absence of a property is expressed
//!   by the property not being present in the record at all
//! - Float equality follows IEEE-754: `NaN != NaN`, `-0.0 == 0.0`
//!
//! Filter comparison across different types is a type violation surfaced
//! by the query path, not a silent coercion.

use chrono::{DateTime, Utc};

/// Canonical property value for all repository surfaces
///
/// The enum is closed by design: backends map each variant to their native
/// storage representation and reject anything else at the codec boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// UTF-8 string
    Str(String),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point (IEEE-754)
    Double(f64),
    /// Boolean value
    Bool(bool),
    /// UTC timestamp
    Date(DateTime<Utc>),
    /// Raw bytes
    Blob(Vec<u8>),
}

impl Value {
    /// Get the type name as a string
    ///
    /// Used in error messages for type violations.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Str(_) => "string",
            Value::Int(_) => "int",
            Value::Double(_) => "double",
            Value::Bool(_) => "bool",
            Value::Date(_) => "date",
            Value::Blob(_) => "blob",
        }
    }

    /// Check if this is a string value
    pub fn is_str(&self) -> bool {
        matches!(self, Value::Str(_))
    }

    /// Get as &str if this is a Str value
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Get as i64 if this is an Int value
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Get as f64 if this is a Double value
    pub fn as_double(&self) -> Option<f64> {
        match self {
            Value::Double(f) => Some(*f),
            _ => None,
        }
    }

    /// Get as bool if this is a Bool value
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Get as DateTime if this is a Date value
    pub fn as_date(&self) -> Option<DateTime<Utc>> {
        match self {
            Value::Date(d) => Some(*d),
            _ => None,
        }
    }

    /// Get as &[u8] if this is a Blob value
    pub fn as_blob(&self) -> Option<&[u8]> {
        match self {
            Value::Blob(b) => Some(b),
            _ => None,
        }
    }
}

// ============================================================================
// From implementations for ergonomic API usage
// ============================================================================

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i as i64)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Double(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(d: DateTime<Utc>) -> Self {
        Value::Date(d)
    }
}

impl From<Vec<u8>> for Value {
    fn from(b: Vec<u8>) -> Self {
        Value::Blob(b)
    }
}

impl From<&[u8]> for Value {
    fn from(b: &[u8]) -> Self {
        Value::Blob(b.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_type_names() {
        assert_eq!(Value::Str("a".into()).type_name(), "string");
        assert_eq!(Value::Int(1).type_name(), "int");
        assert_eq!(Value::Double(1.0).type_name(), "double");
        assert_eq!(Value::Bool(true).type_name(), "bool");
        assert_eq!(Value::Date(Utc::now()).type_name(), "date");
        assert_eq!(Value::Blob(vec![1]).type_name(), "blob");
    }

    #[test]
    fn test_int_not_equal_double() {
        assert_ne!(Value::Int(1), Value::Double(1.0));
    }

    #[test]
    fn test_str_not_equal_blob() {
        assert_ne!(Value::Str("hi".into()), Value::Blob(b"hi".to_vec()));
    }

    #[test]
    fn test_nan_not_equal_nan() {
        assert_ne!(Value::Double(f64::NAN), Value::Double(f64::NAN));
    }

    #[test]
    fn test_negative_zero_equals_zero() {
        assert_eq!(Value::Double(-0.0), Value::Double(0.0));
    }

    #[test]
    fn test_accessors() {
        assert_eq!(Value::Str("x".into()).as_str(), Some("x"));
        assert_eq!(Value::Int(7).as_int(), Some(7));
        assert_eq!(Value::Double(2.5).as_double(), Some(2.5));
        assert_eq!(Value::Bool(true).as_bool(), Some(true));
        assert_eq!(Value::Blob(vec![1, 2]).as_blob(), Some([1u8, 2].as_slice()));

        let d = Utc.with_ymd_and_hms(2020, 1, 2, 3, 4, 5).unwrap();
        assert_eq!(Value::Date(d).as_date(), Some(d));
    }

    #[test]
    fn test_accessor_wrong_type_returns_none() {
        let v = Value::Int(42);
        assert!(v.as_str().is_none());
        assert!(v.as_double().is_none());
        assert!(v.as_bool().is_none());
        assert!(v.as_date().is_none());
        assert!(v.as_blob().is_none());
    }

    #[test]
    fn test_from_conversions() {
        assert_eq!(Value::from("a"), Value::Str("a".into()));
        assert_eq!(Value::from(String::from("b")), Value::Str("b".into()));
        assert_eq!(Value::from(5i64), Value::Int(5));
        assert_eq!(Value::from(5i32), Value::Int(5));
        assert_eq!(Value::from(1.5f64), Value::Double(1.5));
        assert_eq!(Value::from(false), Value::Bool(false));
        assert_eq!(Value::from(vec![9u8]), Value::Blob(vec![9]));
        let bytes: &[u8] = &[3, 4];
        assert_eq!(Value::from(bytes), Value::Blob(vec![3, 4]));
    }
}
