//! Hierarchical entities and their property model
//!
//! The engine stores entities addressed by hierarchical keys
//! `(parent, kind, name)`. Every record of a repository lives under one
//! shared parent sentinel, which makes the repository one entity group
//! and therefore transactionally groupable under the ancestor model.
//!
//! Properties are a closed type system mirroring the record model, with
//! two storage-driven wrappers: strings over the length threshold are
//! boxed as `Text`, and binary payloads ride in `Blob`.

use crate::engine::EngineError;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use polystore_core::FilterOp;
use std::cmp::Ordering;
use std::collections::HashMap;

/// The shared ancestor under which all repository entities live
pub static PARENT_SENTINEL: Lazy<EntityKey> = Lazy::new(|| EntityKey {
    parent: None,
    kind: "parent".to_string(),
    name: "root".to_string(),
});

/// Hierarchical entity key: `(parent, kind, name)`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityKey {
    /// Ancestor key; `None` only for group roots
    pub parent: Option<Box<EntityKey>>,
    /// Entity kind (the repository name)
    pub kind: String,
    /// Key name (the object id)
    pub name: String,
}

impl EntityKey {
    /// Key for a record: `(sentinel, kind, id)`
    pub fn for_record(kind: impl Into<String>, id: impl Into<String>) -> Self {
        EntityKey {
            parent: Some(Box::new(PARENT_SENTINEL.clone())),
            kind: kind.into(),
            name: id.into(),
        }
    }

    /// Topmost ancestor, identifying the entity group
    pub fn group_root(&self) -> &EntityKey {
        let mut cur = self;
        while let Some(parent) = &cur.parent {
            cur = parent;
        }
        cur
    }
}

/// Native property value
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    /// Short string
    Str(String),
    /// Long-text wrapper for strings over the storage threshold
    Text(String),
    /// 64-bit integer
    Int(i64),
    /// 64-bit float
    Double(f64),
    /// Boolean
    Bool(bool),
    /// UTC timestamp
    Date(DateTime<Utc>),
    /// Binary wrapper
    Blob(Vec<u8>),
}

impl PropertyValue {
    /// Native type name for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            PropertyValue::Str(_) => "string",
            PropertyValue::Text(_) => "text",
            PropertyValue::Int(_) => "int",
            PropertyValue::Double(_) => "double",
            PropertyValue::Bool(_) => "bool",
            PropertyValue::Date(_) => "date",
            PropertyValue::Blob(_) => "blob",
        }
    }

    /// String payload, unifying `Str` and `Text`
    fn as_text(&self) -> Option<&str> {
        match self {
            PropertyValue::Str(s) | PropertyValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Ordering comparison between same-typed values
    ///
    /// `Str` and `Text` compare interchangeably as strings (the boxing
    /// threshold must not change comparison results). Blobs have no
    /// order; cross-type comparison is a type violation.
    pub fn compare(&self, property: &str, other: &PropertyValue) -> Result<Ordering, EngineError> {
        if let (Some(a), Some(b)) = (self.as_text(), other.as_text()) {
            return Ok(a.cmp(b));
        }
        match (self, other) {
            (PropertyValue::Int(a), PropertyValue::Int(b)) => Ok(a.cmp(b)),
            (PropertyValue::Double(a), PropertyValue::Double(b)) => Ok(a.total_cmp(b)),
            (PropertyValue::Bool(a), PropertyValue::Bool(b)) => Ok(a.cmp(b)),
            (PropertyValue::Date(a), PropertyValue::Date(b)) => Ok(a.cmp(b)),
            (PropertyValue::Blob(_), PropertyValue::Blob(_)) => Err(EngineError::NotOrdered {
                property: property.to_string(),
            }),
            _ => Err(EngineError::Comparison {
                property: property.to_string(),
                expected: self.type_name(),
                actual: other.type_name(),
            }),
        }
    }

    /// Apply a filter operator against this (stored) value
    ///
    /// Equality works for every type including blobs; ordering operators
    /// require an ordered type.
    pub fn matches(
        &self,
        property: &str,
        op: FilterOp,
        filter_value: &PropertyValue,
    ) -> Result<bool, EngineError> {
        match op {
            FilterOp::Equal | FilterOp::NotEqual => {
                let same_type = self.type_name() == filter_value.type_name()
                    || (self.as_text().is_some() && filter_value.as_text().is_some());
                if !same_type {
                    return Err(EngineError::Comparison {
                        property: property.to_string(),
                        expected: self.type_name(),
                        actual: filter_value.type_name(),
                    });
                }
                let eq = match (self.as_text(), filter_value.as_text()) {
                    (Some(a), Some(b)) => a == b,
                    _ => self == filter_value,
                };
                Ok(if op == FilterOp::Equal { eq } else { !eq })
            }
            FilterOp::GreaterThan => Ok(self.compare(property, filter_value)? == Ordering::Greater),
            FilterOp::GreaterThanOrEqual => {
                Ok(self.compare(property, filter_value)? != Ordering::Less)
            }
            FilterOp::LessThan => Ok(self.compare(property, filter_value)? == Ordering::Less),
            FilterOp::LessThanOrEqual => {
                Ok(self.compare(property, filter_value)? != Ordering::Greater)
            }
        }
    }
}

/// A stored entity: key plus property map
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    /// Full hierarchical key
    pub key: EntityKey,
    /// Property map
    pub properties: HashMap<String, PropertyValue>,
}

impl Entity {
    /// Create an entity with an empty property map
    pub fn new(key: EntityKey) -> Self {
        Entity {
            key,
            properties: HashMap::new(),
        }
    }
}
