//! Error types for the repository layer
//!
//! One `thiserror`-derived error enum crosses the `Repository` interface.
//! Backend-native failures (store I/O, serialization, engine conflicts)
//! are wrapped into it at the adapter boundary; no backend-specific error
//! type leaks past the trait.
//!
//! Not-found is deliberately not an error: `get` returns `Ok(None)` and
//! `remove` of an absent id is a logged no-op.

use std::io;
use thiserror::Error;

/// Result type alias for repository operations
pub type Result<T> = std::result::Result<T, RepositoryError>;

/// Error type for all repository operations
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Operation on a transaction that already committed or rolled back
    #[error("transaction is not active (state: {state})")]
    InactiveTransaction {
        /// Lifecycle state the transaction was found in
        state: String,
    },

    /// Transaction handle passed to a repository of a different backend
    #[error("transaction belongs to backend '{actual}', expected '{expected}'")]
    BackendMismatch {
        /// Backend the repository runs on
        expected: &'static str,
        /// Backend the transaction was opened on
        actual: &'static str,
    },

    /// A property value the backend cannot represent
    #[error("unsupported value type '{type_name}' for property '{key}'")]
    UnsupportedType {
        /// Offending property name
        key: String,
        /// Runtime type of the offending value
        type_name: String,
    },

    /// Filter value type does not match the property type
    #[error("filter on '{property}' compares {expected} against {actual}")]
    FilterTypeMismatch {
        /// Filtered property name
        property: String,
        /// Type of the stored property
        expected: &'static str,
        /// Type of the filter comparison value
        actual: &'static str,
    },

    /// `add` with an id that already exists (never silently overwrites)
    #[error("record '{id}' already exists in repository '{repository}'")]
    DuplicateId {
        /// Repository name
        repository: String,
        /// Duplicated object id
        id: String,
    },

    /// Concurrent-modification conflict survived the commit retry budget
    #[error("commit conflict persisted after {attempts} attempts")]
    CommitConflict {
        /// Number of commit attempts made
        attempts: u32,
    },

    /// Record encode/decode failure
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the backing store
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Any other backend-native failure, carrying the original message
    #[error("backend error: {0}")]
    Backend(String),

    /// Configuration error at startup
    #[error("configuration error: {0}")]
    Config(String),

    /// Operation not supported by this backend
    #[error("unsupported operation: {0}")]
    Unsupported(String),
}

impl RepositoryError {
    /// Wrap a backend-native error, preserving its message
    pub fn backend(err: impl std::fmt::Display) -> Self {
        RepositoryError::Backend(err.to_string())
    }
}
