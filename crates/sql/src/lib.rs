//! Relational backend placeholder for polystore
//!
//! The relational adapter exists so configuration can select the
//! backend and the registry can hand out repositories for it, but no
//! storage is wired up yet: every data operation fails with
//! [`RepositoryError::Unsupported`] naming the repository and call.
//! Identity and cache-flag plumbing behave normally so callers can
//! probe a repository without touching storage.

use polystore_core::{
    Query, QueryResults, Record, Repository, RepositoryError, Result, Transaction,
};
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

/// Backend name the relational adapter will carry once implemented
pub const BACKEND_SQL: &str = "relational";

/// Placeholder repository for the relational backend
pub struct SqlRepository {
    name: String,
    url: String,
    cache_enabled: AtomicBool,
}

impl SqlRepository {
    /// Create the placeholder for one named repository
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        SqlRepository {
            name: name.into(),
            url: url.into(),
            cache_enabled: AtomicBool::new(true),
        }
    }

    /// Connection URL the adapter was configured with
    pub fn url(&self) -> &str {
        &self.url
    }

    fn unsupported(&self, operation: &str) -> RepositoryError {
        warn!(repository = %self.name, operation, "relational backend is not implemented");
        RepositoryError::Unsupported(format!(
            "relational backend is not implemented: {operation} on '{}'",
            self.name
        ))
    }
}

impl Repository for SqlRepository {
    fn add(&self, _txn: &mut Transaction, _record: Record) -> Result<String> {
        Err(self.unsupported("add"))
    }

    fn update(&self, _txn: &mut Transaction, _id: &str, _record: Record) -> Result<()> {
        Err(self.unsupported("update"))
    }

    fn remove(&self, _txn: &mut Transaction, _id: &str) -> Result<()> {
        Err(self.unsupported("remove"))
    }

    fn get(&self, _txn: Option<&Transaction>, _id: &str) -> Result<Option<Record>> {
        Err(self.unsupported("get"))
    }

    fn has(&self, _txn: Option<&Transaction>, _id: &str) -> Result<bool> {
        Err(self.unsupported("has"))
    }

    fn query(&self, _query: &Query) -> Result<QueryResults> {
        Err(self.unsupported("query"))
    }

    fn count(&self) -> Result<u64> {
        Err(self.unsupported("count"))
    }

    fn get_randomly(&self, _fetch_size: usize) -> Result<Vec<Record>> {
        Err(self.unsupported("get_randomly"))
    }

    fn begin_transaction(&self) -> Result<Transaction> {
        Err(self.unsupported("begin_transaction"))
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_cache_enabled(&self) -> bool {
        self.cache_enabled.load(Ordering::Relaxed)
    }

    fn set_cache_enabled(&self, enabled: bool) {
        self.cache_enabled.store(enabled, Ordering::Relaxed);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_and_cache_flag_work() {
        let repo = SqlRepository::new("article", "postgres://localhost/blog");
        assert_eq!(repo.name(), "article");
        assert_eq!(repo.url(), "postgres://localhost/blog");
        assert!(repo.is_cache_enabled());
        repo.set_cache_enabled(false);
        assert!(!repo.is_cache_enabled());
    }

    #[test]
    fn test_every_data_operation_is_unsupported() {
        let repo = SqlRepository::new("article", "postgres://localhost/blog");

        assert!(matches!(
            repo.get(None, "1"),
            Err(RepositoryError::Unsupported(_))
        ));
        assert!(matches!(repo.has(None, "1"), Err(RepositoryError::Unsupported(_))));
        assert!(matches!(repo.count(), Err(RepositoryError::Unsupported(_))));
        assert!(matches!(
            repo.get_randomly(3),
            Err(RepositoryError::Unsupported(_))
        ));
        assert!(matches!(
            repo.query(&Query::builder().build()),
            Err(RepositoryError::Unsupported(_))
        ));
        assert!(matches!(
            repo.begin_transaction(),
            Err(RepositoryError::Unsupported(_))
        ));

        let err = repo.count().unwrap_err();
        assert!(err.to_string().contains("article"));
    }
}
