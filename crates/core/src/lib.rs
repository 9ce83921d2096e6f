//! Core model for the polystore repository layer
//!
//! This crate defines everything the backend adapters share:
//!
//! - [`Value`] / [`Record`]: the flat, schema-less property model
//! - [`id::time_millis_id`]: timestamp-based object id generation
//! - [`Query`] and friends: backend-neutral filter/sort/pagination
//!   descriptors
//! - [`Transaction`]: the explicit, non-`Send` unit of work with an
//!   uncommitted-writes overlay
//! - [`Repository`]: the CRUD + query + pagination contract every
//!   backend adapter implements
//! - [`RepositoryError`]: the single error type crossing the contract
//!
//! Backend adapters live in sibling crates (`polystore-datastore`,
//! `polystore-kv`, `polystore-sql`); the shared cache lives in
//! `polystore-cache`.

pub mod error;
pub mod id;
pub mod query;
pub mod record;
pub mod repository;
pub mod transaction;
pub mod value;

pub use error::{RepositoryError, Result};
pub use query::{Filter, FilterOp, PageRequest, Pagination, Query, QueryBuilder, QueryResults, SortDirection};
pub use record::{Record, OBJECT_ID};
pub use repository::Repository;
pub use transaction::{Overlay, StagedOp, Transaction, TransactionBackend, TxnState};
pub use value::Value;
