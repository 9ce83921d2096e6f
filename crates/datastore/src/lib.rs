//! Hierarchical-datastore backend for polystore
//!
//! Two layers live here:
//!
//! - [`engine`]: an in-process hierarchical entity store with entity-group
//!   optimistic transactions and native query push-down, standing in for
//!   the remote datastore behind the adapter boundary
//! - [`adapter`]: the [`polystore_core::Repository`] implementation that
//!   maps records onto entities and repositories onto entity groups
//!
//! The codec between the two worlds (string boxing into `Text`, blob
//! wrapping) is in [`codec`].

pub mod adapter;
pub mod codec;
pub mod engine;
pub mod entity;

pub use adapter::{DatastoreRepository, BACKEND_DATASTORE, COMMIT_RETRIES};
pub use codec::LONG_TEXT_THRESHOLD;
pub use engine::{DatastoreEngine, EngineError, EngineQuery, EngineTransaction, Mutation};
pub use entity::{Entity, EntityKey, PropertyValue, PARENT_SENTINEL};
