//! Record <-> entity codec
//!
//! Maps the backend-neutral record model onto native entity properties.
//! The only interesting rule is string boxing: strings over
//! [`LONG_TEXT_THRESHOLD`] characters go into the `Text` wrapper to
//! satisfy the backend's storage-size constraint on indexed strings.
//! Unboxing on the way out restores a plain string, so callers never see
//! the wrapper.

use crate::entity::{Entity, EntityKey, PropertyValue};
use crate::engine::PropertyFilter;
use polystore_core::{Filter, Record, Value};

/// Maximum character count for an unboxed string property
pub const LONG_TEXT_THRESHOLD: usize = 500;

/// Convert one value into its native property representation
pub fn value_to_property(value: &Value) -> PropertyValue {
    match value {
        Value::Str(s) if s.chars().count() > LONG_TEXT_THRESHOLD => PropertyValue::Text(s.clone()),
        Value::Str(s) => PropertyValue::Str(s.clone()),
        Value::Int(i) => PropertyValue::Int(*i),
        Value::Double(f) => PropertyValue::Double(*f),
        Value::Bool(b) => PropertyValue::Bool(*b),
        Value::Date(d) => PropertyValue::Date(*d),
        Value::Blob(b) => PropertyValue::Blob(b.clone()),
    }
}

/// Convert a native property back into a value, unboxing wrappers
pub fn property_to_value(property: &PropertyValue) -> Value {
    match property {
        PropertyValue::Str(s) | PropertyValue::Text(s) => Value::Str(s.clone()),
        PropertyValue::Int(i) => Value::Int(*i),
        PropertyValue::Double(f) => Value::Double(*f),
        PropertyValue::Bool(b) => Value::Bool(*b),
        PropertyValue::Date(d) => Value::Date(*d),
        PropertyValue::Blob(b) => Value::Blob(b.clone()),
    }
}

/// Build the entity for a record under `(sentinel, kind, id)`
pub fn record_to_entity(kind: &str, id: &str, record: &Record) -> Entity {
    let mut entity = Entity::new(EntityKey::for_record(kind, id));
    for (name, value) in record.iter() {
        entity
            .properties
            .insert(name.clone(), value_to_property(value));
    }
    entity
}

/// Rebuild the record from a stored entity
pub fn entity_to_record(entity: &Entity) -> Record {
    entity
        .properties
        .iter()
        .map(|(k, v)| (k.clone(), property_to_value(v)))
        .collect()
}

/// Translate a neutral filter into engine value space
pub fn filter_to_native(filter: &Filter) -> PropertyFilter {
    PropertyFilter {
        property: filter.property.clone(),
        op: filter.op,
        value: value_to_property(&filter.value),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polystore_core::FilterOp;

    #[test]
    fn test_short_string_stays_str() {
        assert!(matches!(
            value_to_property(&Value::Str("short".into())),
            PropertyValue::Str(_)
        ));
    }

    #[test]
    fn test_long_string_boxes_to_text() {
        let long = "x".repeat(LONG_TEXT_THRESHOLD + 1);
        assert!(matches!(
            value_to_property(&Value::Str(long)),
            PropertyValue::Text(_)
        ));
        // exactly at the threshold stays unboxed
        let edge = "x".repeat(LONG_TEXT_THRESHOLD);
        assert!(matches!(
            value_to_property(&Value::Str(edge)),
            PropertyValue::Str(_)
        ));
    }

    #[test]
    fn test_record_roundtrip_unboxes_text() {
        let long = "y".repeat(LONG_TEXT_THRESHOLD * 2);
        let record = Record::new()
            .with("oId", "1")
            .with("body", long.as_str())
            .with("views", 3i64)
            .with("score", 1.5f64)
            .with("published", true)
            .with("payload", vec![1u8, 2, 3]);

        let entity = record_to_entity("article", "1", &record);
        assert!(matches!(entity.properties["body"], PropertyValue::Text(_)));
        assert_eq!(entity.key.kind, "article");

        let back = entity_to_record(&entity);
        assert_eq!(back, record);
    }

    #[test]
    fn test_filter_translation() {
        let f = Filter::new("views", FilterOp::GreaterThan, 5i64);
        let native = filter_to_native(&f);
        assert_eq!(native.property, "views");
        assert_eq!(native.op, FilterOp::GreaterThan);
        assert_eq!(native.value, PropertyValue::Int(5));
    }
}
