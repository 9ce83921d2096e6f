//! Backend-neutral query descriptors
//!
//! A [`Query`] describes filters (AND-combined), sort orders (insertion
//! order is the tie-break precedence), pagination, and an optional cache
//! key. Queries are built once via [`QueryBuilder`] and immutable after
//! `build()`.
//!
//! Backends evaluate queries natively where they can (the hierarchical
//! datastore pushes filters, sorts, and offset+limit down) and by full
//! scan + in-memory evaluation otherwise (the embedded KV adapter).

use crate::record::Record;
use crate::value::Value;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use xxhash_rust::xxh3::xxh3_64;

/// Filter comparison operator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOp {
    /// `==`
    Equal,
    /// `!=`
    NotEqual,
    /// `>`
    GreaterThan,
    /// `>=`
    GreaterThanOrEqual,
    /// `<`
    LessThan,
    /// `<=`
    LessThanOrEqual,
}

impl FilterOp {
    /// Stable token used in cache keys and log output
    pub fn token(&self) -> &'static str {
        match self {
            FilterOp::Equal => "==",
            FilterOp::NotEqual => "!=",
            FilterOp::GreaterThan => ">",
            FilterOp::GreaterThanOrEqual => ">=",
            FilterOp::LessThan => "<",
            FilterOp::LessThanOrEqual => "<=",
        }
    }
}

/// Sort direction for one sort key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    /// Smallest first
    Ascending,
    /// Largest first
    Descending,
}

/// One filter term: property, operator, comparison value
///
/// Comparison is type-checked at evaluation time: the filter value's
/// runtime type must match the property's runtime type or the whole
/// query fails with a type violation.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    /// Property name to compare
    pub property: String,
    /// Comparison operator
    pub op: FilterOp,
    /// Comparison value
    pub value: Value,
}

impl Filter {
    /// Create a filter term
    pub fn new(property: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        Filter {
            property: property.into(),
            op,
            value: value.into(),
        }
    }
}

/// Requested page window (1-based page number)
///
/// Absence of a `PageRequest` on a query means "no pagination, return
/// all matching records".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    /// 1-based page number
    pub current_page: usize,
    /// Records per page (must be >= 1)
    pub page_size: usize,
}

impl PageRequest {
    /// Zero-based offset of the first record in the window
    pub fn offset(&self) -> usize {
        self.page_size.saturating_mul(self.current_page.saturating_sub(1))
    }
}

/// Pagination info attached to query results
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    /// Total pages: `ceil(record_count / page_size)`, 1 when unpaginated
    pub page_count: u64,
    /// Total matching records, before the page window is applied
    pub record_count: u64,
}

impl Pagination {
    /// Compute pagination info for a matching-record count
    pub fn compute(record_count: u64, page: Option<PageRequest>) -> Self {
        let page_count = match page {
            Some(p) if p.page_size > 0 => {
                let size = p.page_size as u64;
                (record_count + size - 1) / size
            }
            _ => 1,
        };
        Pagination {
            page_count,
            record_count,
        }
    }
}

/// Query results: pagination info plus the ordered page of records
#[derive(Debug, Clone, PartialEq)]
pub struct QueryResults {
    /// Pagination info over the full matching set
    pub pagination: Pagination,
    /// Records in the requested window, in sort order
    pub records: Vec<Record>,
}

/// Immutable-once-built query descriptor
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    filters: Vec<Filter>,
    sorts: Vec<(String, SortDirection)>,
    page: Option<PageRequest>,
    cache_key: Option<String>,
}

impl Query {
    /// Start building a query
    pub fn builder() -> QueryBuilder {
        QueryBuilder::default()
    }

    /// AND-combined filter terms
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Sort keys in precedence order
    pub fn sorts(&self) -> &[(String, SortDirection)] {
        &self.sorts
    }

    /// Requested page window, if any
    pub fn page(&self) -> Option<PageRequest> {
        self.page
    }

    /// Cache key set by the caller, if any
    ///
    /// When set, adapters memoize the whole result under
    /// [`Query::cache_token`].
    pub fn cache_key(&self) -> Option<&str> {
        self.cache_key.as_deref()
    }

    /// Stable hash of the full descriptor, used as the cache suffix
    pub fn cache_token(&self) -> u64 {
        xxh3_64(self.canonical().as_bytes())
    }

    /// Canonical text form of the descriptor
    ///
    /// Deterministic for equal queries; feeds the cache token.
    fn canonical(&self) -> String {
        let mut out = String::new();
        for f in &self.filters {
            out.push_str(&format!(
                "f:{}{}{};",
                f.property,
                f.op.token(),
                value_token(&f.value)
            ));
        }
        for (prop, dir) in &self.sorts {
            let d = match dir {
                SortDirection::Ascending => "asc",
                SortDirection::Descending => "desc",
            };
            out.push_str(&format!("s:{prop}:{d};"));
        }
        if let Some(p) = self.page {
            out.push_str(&format!("p:{}/{};", p.current_page, p.page_size));
        }
        if let Some(k) = &self.cache_key {
            out.push_str(&format!("k:{k};"));
        }
        out
    }
}

/// Builder for [`Query`]
#[derive(Debug, Default, Clone)]
pub struct QueryBuilder {
    filters: Vec<Filter>,
    sorts: Vec<(String, SortDirection)>,
    page: Option<PageRequest>,
    cache_key: Option<String>,
}

impl QueryBuilder {
    /// Add a filter term (terms are AND-combined)
    pub fn filter(mut self, property: impl Into<String>, op: FilterOp, value: impl Into<Value>) -> Self {
        self.filters.push(Filter::new(property, op, value));
        self
    }

    /// Add a sort key; earlier keys take precedence
    pub fn sort(mut self, property: impl Into<String>, direction: SortDirection) -> Self {
        self.sorts.push((property.into(), direction));
        self
    }

    /// Request a page window (1-based page number, page size >= 1)
    pub fn page(mut self, current_page: usize, page_size: usize) -> Self {
        self.page = Some(PageRequest {
            current_page: current_page.max(1),
            page_size: page_size.max(1),
        });
        self
    }

    /// Set a cache key, enabling result memoization
    pub fn cache_key(mut self, key: impl Into<String>) -> Self {
        self.cache_key = Some(key.into());
        self
    }

    /// Finish building
    pub fn build(self) -> Query {
        Query {
            filters: self.filters,
            sorts: self.sorts,
            page: self.page,
            cache_key: self.cache_key,
        }
    }
}

/// Stable token for a value inside a canonical query string
fn value_token(value: &Value) -> String {
    match value {
        Value::Str(s) => format!("s\"{s}\""),
        Value::Int(i) => format!("i{i}"),
        Value::Double(f) => format!("d{f}"),
        Value::Bool(b) => format!("b{b}"),
        Value::Date(d) => format!("t{}.{:09}", d.timestamp(), d.timestamp_subsec_nanos()),
        Value::Blob(b) => format!("x{}", BASE64.encode(b)),
    }
}
