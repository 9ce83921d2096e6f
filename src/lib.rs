//! # polystore
//!
//! A polymorphic repository layer: one backend-agnostic CRUD + query +
//! pagination contract ([`Repository`]) served by interchangeable
//! storage adapters, with explicit per-backend transactions and a
//! shared read-through cache.
//!
//! Backends:
//!
//! - **datastore** ([`DatastoreRepository`]): an in-process
//!   hierarchical entity store with entity-group optimistic
//!   transactions and native query push-down
//! - **embedded** ([`KvRepository`]): a `redb` file, one table per
//!   repository, canonical-JSON records, scan-evaluated queries
//! - **relational** ([`SqlRepository`]): a placeholder that fails every
//!   storage call until the adapter is written
//!
//! The backend is chosen once from [`Config`] by [`RepositoryFactory`],
//! which hands out `Arc<dyn Repository>` instances through a
//! [`RepositoryRegistry`]. Writes are staged on an explicit
//! [`Transaction`] handle and become visible to other readers only at
//! commit; reads inside the transaction see the staged overlay.
//!
//! ```no_run
//! use polystore::{Config, Record, Repository, RepositoryFactory};
//!
//! # fn main() -> polystore::Result<()> {
//! let config = Config::from_toml_str("env = \"datastore\"")?;
//! let factory = RepositoryFactory::from_config(&config)?;
//! let articles = factory.open("article")?;
//!
//! let mut txn = articles.begin_transaction()?;
//! let id = articles.add(&mut txn, Record::new().with("title", "Hello"))?;
//! txn.commit()?;
//!
//! assert!(articles.get(None, &id)?.is_some());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod factory;
pub mod registry;

pub use config::{CacheConfig, Config, EmbeddedConfig, RelationalConfig, RuntimeEnv};
pub use factory::{BackendRuntime, RepositoryFactory};
pub use registry::RepositoryRegistry;

pub use polystore_cache::{
    CacheStats, NoopPageCache, PageCache, RepositoryCache, DEFAULT_CAPACITY,
};
pub use polystore_core::{
    id::time_millis_id, Filter, FilterOp, Overlay, PageRequest, Pagination, Query, QueryBuilder,
    QueryResults, Record, Repository, RepositoryError, Result, SortDirection, StagedOp,
    Transaction, TransactionBackend, TxnState, Value, OBJECT_ID,
};
pub use polystore_datastore::{DatastoreEngine, DatastoreRepository, BACKEND_DATASTORE};
pub use polystore_kv::{KvRepository, BACKEND_KV};
pub use polystore_sql::{SqlRepository, BACKEND_SQL};
