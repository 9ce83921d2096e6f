//! Embedded key-value backend for polystore
//!
//! Stores each repository as one `redb` table keyed by object id, with
//! records serialized to canonical JSON ([`codec`]). Queries run as a
//! full scan through the in-memory evaluator ([`eval`]); the adapter in
//! [`adapter`] wires both under the [`polystore_core::Repository`]
//! contract with single-writer native transactions.

pub mod adapter;
pub mod codec;
pub mod eval;

pub use adapter::{KvRepository, BACKEND_KV};
