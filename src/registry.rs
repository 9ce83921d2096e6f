//! Process-wide repository registry
//!
//! Repositories are constructed once (by the factory) and shared as
//! `Arc<dyn Repository>`; the registry is the lookup point the rest of
//! the application resolves them through by name.

use dashmap::DashMap;
use polystore_core::Repository;
use std::sync::Arc;
use tracing::{debug, warn};

/// Name-indexed map of live repositories
#[derive(Default)]
pub struct RepositoryRegistry {
    repos: DashMap<String, Arc<dyn Repository>>,
}

impl RepositoryRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        RepositoryRegistry::default()
    }

    /// Register a repository under its own name
    ///
    /// Returns the previously registered repository if the name was
    /// already taken.
    pub fn register(&self, repo: Arc<dyn Repository>) -> Option<Arc<dyn Repository>> {
        let name = repo.name().to_string();
        let replaced = self.repos.insert(name.clone(), repo);
        if replaced.is_some() {
            warn!(repository = %name, "replaced an already registered repository");
        } else {
            debug!(repository = %name, "registered repository");
        }
        replaced
    }

    /// Look up a repository by name
    pub fn lookup(&self, name: &str) -> Option<Arc<dyn Repository>> {
        self.repos.get(name).map(|entry| Arc::clone(entry.value()))
    }

    /// Remove a repository, returning it if it was registered
    pub fn unregister(&self, name: &str) -> Option<Arc<dyn Repository>> {
        self.repos.remove(name).map(|(_, repo)| repo)
    }

    /// Names of every registered repository, in no particular order
    pub fn names(&self) -> Vec<String> {
        self.repos.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Number of registered repositories
    pub fn len(&self) -> usize {
        self.repos.len()
    }

    /// True when nothing is registered
    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }
}
