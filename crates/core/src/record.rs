//! Generic structured records
//!
//! A `Record` is a flat mapping from string property names to [`Value`]s.
//! Records carry no schema beyond the mandatory object id property
//! [`OBJECT_ID`]; property sets may vary freely between records of the
//! same repository.

use crate::value::Value;
use std::collections::HashMap;

/// Name of the mandatory object id property
///
/// The object id is a string, unique within its repository, either
/// caller-supplied or generated by [`crate::id::time_millis_id`].
pub const OBJECT_ID: &str = "oId";

/// A flat property map, the unit of storage for every backend
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Record {
    properties: HashMap<String, Value>,
}

impl Record {
    /// Create an empty record
    pub fn new() -> Self {
        Record {
            properties: HashMap::new(),
        }
    }

    /// Set a property, returning the previous value if any
    pub fn put(&mut self, key: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.properties.insert(key.into(), value.into())
    }

    /// Builder-style property setter
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.put(key, value);
        self
    }

    /// Get a property value
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Remove a property, returning it if present
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.properties.remove(key)
    }

    /// Check whether a property is present
    pub fn contains_key(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    /// The object id, if set
    pub fn id(&self) -> Option<&str> {
        match self.properties.get(OBJECT_ID) {
            Some(Value::Str(s)) => Some(s),
            _ => None,
        }
    }

    /// Set the object id
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.properties
            .insert(OBJECT_ID.to_string(), Value::Str(id.into()));
    }

    /// Number of properties
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// True if the record has no properties
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Iterate over properties (iteration order is unspecified)
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.properties.iter()
    }

    /// Borrow the underlying property map
    pub fn properties(&self) -> &HashMap<String, Value> {
        &self.properties
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Record {
            properties: iter.into_iter().collect(),
        }
    }
}
