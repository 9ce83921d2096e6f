//! In-memory query evaluation over scanned records
//!
//! The embedded store has no native query engine, so a query runs as a
//! pipeline over the full committed scan: filter every record, validate
//! and apply the sort keys, then cut the requested page window. The
//! semantics mirror the hierarchical backend's native evaluation so a
//! query answers identically on either backend:
//!
//! - a filter on a property a record lacks never matches that record
//! - filter comparison is strict on runtime type; a mismatch fails the
//!   whole query rather than silently dropping records
//! - records missing a sort property order after all records that have
//!   it; ties keep object-id order
//! - blobs support equality filters only

use polystore_core::{
    Filter, FilterOp, PageRequest, Pagination, Query, QueryResults, Record, RepositoryError,
    Result, SortDirection, Value,
};
use std::cmp::Ordering;

/// Run `query` over the committed scan, which must arrive in id order
pub fn execute(mut records: Vec<Record>, query: &Query) -> Result<QueryResults> {
    let mut matched = Vec::with_capacity(records.len());
    for record in records.drain(..) {
        if matches_all(&record, query.filters())? {
            matched.push(record);
        }
    }

    sort_records(&mut matched, query.sorts())?;

    let record_count = matched.len() as u64;
    let pagination = Pagination::compute(record_count, query.page());
    let records = match query.page() {
        Some(page) => page_window(matched, page),
        None => matched,
    };

    Ok(QueryResults {
        pagination,
        records,
    })
}

fn matches_all(record: &Record, filters: &[Filter]) -> Result<bool> {
    for filter in filters {
        let Some(actual) = record.get(&filter.property) else {
            return Ok(false);
        };
        if !matches_one(&filter.property, actual, filter.op, &filter.value)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn matches_one(property: &str, actual: &Value, op: FilterOp, expected: &Value) -> Result<bool> {
    match op {
        // Equality is defined for every type, blobs included
        FilterOp::Equal | FilterOp::NotEqual => {
            if !same_type(actual, expected) {
                return Err(type_mismatch(property, expected, actual));
            }
            let eq = actual == expected;
            Ok(if op == FilterOp::Equal { eq } else { !eq })
        }
        _ => {
            let ord = compare(property, actual, expected)?;
            Ok(match op {
                FilterOp::GreaterThan => ord == Ordering::Greater,
                FilterOp::GreaterThanOrEqual => ord != Ordering::Less,
                FilterOp::LessThan => ord == Ordering::Less,
                FilterOp::LessThanOrEqual => ord != Ordering::Greater,
                FilterOp::Equal | FilterOp::NotEqual => unreachable!(),
            })
        }
    }
}

/// Ordered comparison of two values of the same runtime type
fn compare(property: &str, a: &Value, b: &Value) -> Result<Ordering> {
    match (a, b) {
        (Value::Str(x), Value::Str(y)) => Ok(x.cmp(y)),
        (Value::Int(x), Value::Int(y)) => Ok(x.cmp(y)),
        (Value::Double(x), Value::Double(y)) => Ok(x.total_cmp(y)),
        (Value::Bool(x), Value::Bool(y)) => Ok(x.cmp(y)),
        (Value::Date(x), Value::Date(y)) => Ok(x.cmp(y)),
        (Value::Blob(_), Value::Blob(_)) => Err(RepositoryError::Unsupported(format!(
            "blob property '{property}' has no ordering"
        ))),
        _ => Err(type_mismatch(property, b, a)),
    }
}

/// Sort in place, validating every sort key up front
///
/// Validation first, ordering second: a type conflict anywhere in the
/// matched set aborts the query before any reordering, so the sort
/// comparator itself never fails.
fn sort_records(records: &mut [Record], sorts: &[(String, SortDirection)]) -> Result<()> {
    if sorts.is_empty() {
        return Ok(());
    }

    for (property, _) in sorts {
        let mut seen: Option<&Value> = None;
        for record in records.iter() {
            let Some(value) = record.get(property) else {
                continue;
            };
            if matches!(value, Value::Blob(_)) {
                return Err(RepositoryError::Unsupported(format!(
                    "blob property '{property}' has no ordering"
                )));
            }
            match seen {
                Some(prev) if !same_type(prev, value) => {
                    return Err(type_mismatch(property, prev, value));
                }
                Some(_) => {}
                None => seen = Some(value),
            }
        }
    }

    records.sort_by(|a, b| {
        for (property, direction) in sorts {
            let ord = match (a.get(property), b.get(property)) {
                (Some(x), Some(y)) => {
                    // validated above, same type and ordered
                    compare(property, x, y).unwrap_or(Ordering::Equal)
                }
                // absent sort properties order last
                (Some(_), None) => Ordering::Less,
                (None, Some(_)) => Ordering::Greater,
                (None, None) => Ordering::Equal,
            };
            let ord = match direction {
                SortDirection::Ascending => ord,
                SortDirection::Descending => ord.reverse(),
            };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });
    Ok(())
}

fn page_window(records: Vec<Record>, page: PageRequest) -> Vec<Record> {
    records
        .into_iter()
        .skip(page.offset())
        .take(page.page_size)
        .collect()
}

fn same_type(a: &Value, b: &Value) -> bool {
    std::mem::discriminant(a) == std::mem::discriminant(b)
}

fn type_mismatch(property: &str, expected: &Value, actual: &Value) -> RepositoryError {
    RepositoryError::FilterTypeMismatch {
        property: property.to_string(),
        expected: expected.type_name(),
        actual: actual.type_name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polystore_core::Query;

    fn article(id: &str, views: i64, status: &str) -> Record {
        Record::new()
            .with("oId", id)
            .with("views", views)
            .with("status", status)
    }

    fn ids(results: &QueryResults) -> Vec<&str> {
        results.records.iter().map(|r| r.id().unwrap()).collect()
    }

    #[test]
    fn test_filter_sort_paginate_pipeline() {
        let records = vec![
            article("a", 10, "published"),
            article("b", 30, "published"),
            article("c", 20, "draft"),
            article("d", 20, "published"),
            article("e", 5, "published"),
        ];
        let query = Query::builder()
            .filter("status", FilterOp::Equal, "published")
            .sort("views", SortDirection::Descending)
            .page(1, 2)
            .build();

        let results = execute(records, &query).unwrap();
        assert_eq!(ids(&results), vec!["b", "d"]);
        assert_eq!(results.pagination.record_count, 4);
        assert_eq!(results.pagination.page_count, 2);
    }

    #[test]
    fn test_page_past_end_is_empty_with_real_counts() {
        let records = vec![article("a", 1, "x"), article("b", 2, "x")];
        let query = Query::builder().page(5, 10).build();
        let results = execute(records, &query).unwrap();
        assert!(results.records.is_empty());
        assert_eq!(results.pagination.record_count, 2);
        assert_eq!(results.pagination.page_count, 1);
    }

    #[test]
    fn test_missing_filter_property_never_matches() {
        let records = vec![
            article("a", 1, "x"),
            Record::new().with("oId", "b").with("status", "x"),
        ];
        let query = Query::builder()
            .filter("views", FilterOp::GreaterThanOrEqual, 0i64)
            .build();
        let results = execute(records, &query).unwrap();
        assert_eq!(ids(&results), vec!["a"]);
    }

    #[test]
    fn test_filter_type_mismatch_fails_query() {
        let records = vec![article("a", 1, "x")];
        let query = Query::builder()
            .filter("views", FilterOp::GreaterThan, "10")
            .build();
        let err = execute(records, &query).unwrap_err();
        match err {
            RepositoryError::FilterTypeMismatch {
                property,
                expected,
                actual,
            } => {
                assert_eq!(property, "views");
                assert_eq!(expected, "string");
                assert_eq!(actual, "int");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_not_equal_on_blobs_allowed() {
        let records = vec![
            Record::new().with("oId", "a").with("sig", vec![1u8]),
            Record::new().with("oId", "b").with("sig", vec![2u8]),
        ];
        let query = Query::builder()
            .filter("sig", FilterOp::NotEqual, vec![1u8])
            .build();
        let results = execute(records, &query).unwrap();
        assert_eq!(ids(&results), vec!["b"]);
    }

    #[test]
    fn test_ordered_op_on_blob_unsupported() {
        let records = vec![Record::new().with("oId", "a").with("sig", vec![1u8])];
        let query = Query::builder()
            .filter("sig", FilterOp::LessThan, vec![9u8])
            .build();
        assert!(matches!(
            execute(records, &query),
            Err(RepositoryError::Unsupported(_))
        ));
    }

    #[test]
    fn test_records_missing_sort_property_order_last() {
        let records = vec![
            Record::new().with("oId", "a"),
            article("b", 2, "x"),
            article("c", 1, "x"),
        ];
        let query = Query::builder()
            .sort("views", SortDirection::Ascending)
            .build();
        let results = execute(records, &query).unwrap();
        assert_eq!(ids(&results), vec!["c", "b", "a"]);
    }

    #[test]
    fn test_mixed_sort_types_abort_before_reordering() {
        let records = vec![
            Record::new().with("oId", "a").with("k", 1i64),
            Record::new().with("oId", "b").with("k", "one"),
        ];
        let query = Query::builder().sort("k", SortDirection::Ascending).build();
        assert!(matches!(
            execute(records, &query),
            Err(RepositoryError::FilterTypeMismatch { .. })
        ));
    }

    #[test]
    fn test_secondary_sort_breaks_ties() {
        let records = vec![
            article("a", 1, "beta"),
            article("b", 1, "alpha"),
            article("c", 0, "zeta"),
        ];
        let query = Query::builder()
            .sort("views", SortDirection::Descending)
            .sort("status", SortDirection::Ascending)
            .build();
        let results = execute(records, &query).unwrap();
        assert_eq!(ids(&results), vec!["b", "a", "c"]);
    }
}
