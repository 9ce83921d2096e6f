//! Backend selection and repository construction
//!
//! The factory replaces runtime class lookup with a closed selector:
//! [`Config`] names a [`RuntimeEnv`], `RepositoryFactory::from_config`
//! opens the backend handle for it once, and [`RepositoryFactory::open`]
//! constructs (and registers) one adapter per repository name against
//! that shared handle. All repositories from one factory share one
//! [`RepositoryCache`] and one [`PageCache`].

use crate::config::{Config, RuntimeEnv};
use crate::registry::RepositoryRegistry;
use polystore_cache::{NoopPageCache, PageCache, RepositoryCache};
use polystore_core::{Repository, RepositoryError, Result};
use polystore_datastore::{DatastoreEngine, DatastoreRepository};
use polystore_kv::KvRepository;
use polystore_sql::SqlRepository;
use redb::Database;
use std::sync::Arc;
use tracing::info;

/// The opened backend handle repositories are constructed against
pub enum BackendRuntime {
    /// In-process hierarchical datastore
    Datastore {
        /// Shared engine instance
        engine: Arc<DatastoreEngine>,
    },
    /// Embedded key-value database file
    Embedded {
        /// Shared database handle
        db: Arc<Database>,
    },
    /// Relational placeholder; holds only the configured URL
    Relational {
        /// Connection URL
        url: String,
    },
}

impl BackendRuntime {
    /// The environment this runtime serves
    pub fn env(&self) -> RuntimeEnv {
        match self {
            BackendRuntime::Datastore { .. } => RuntimeEnv::Datastore,
            BackendRuntime::Embedded { .. } => RuntimeEnv::Embedded,
            BackendRuntime::Relational { .. } => RuntimeEnv::Relational,
        }
    }
}

/// Constructs and registers repositories for one configured backend
pub struct RepositoryFactory {
    runtime: BackendRuntime,
    cache: Arc<RepositoryCache>,
    page_cache: Arc<dyn PageCache>,
    registry: Arc<RepositoryRegistry>,
}

impl std::fmt::Debug for RepositoryFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RepositoryFactory")
            .field("env", &self.runtime.env())
            .finish_non_exhaustive()
    }
}

impl RepositoryFactory {
    /// Open the configured backend with no page-level cache attached
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::with_page_cache(config, Arc::new(NoopPageCache))
    }

    /// Open the configured backend, wiring the given page cache into
    /// commit invalidation
    pub fn with_page_cache(config: &Config, page_cache: Arc<dyn PageCache>) -> Result<Self> {
        let runtime = match config.env {
            RuntimeEnv::Datastore => BackendRuntime::Datastore {
                engine: Arc::new(DatastoreEngine::new()),
            },
            RuntimeEnv::Embedded => {
                let db = Database::create(&config.embedded.path)
                    .map_err(RepositoryError::backend)?;
                BackendRuntime::Embedded { db: Arc::new(db) }
            }
            RuntimeEnv::Relational => {
                let url = config.relational.url.clone().ok_or_else(|| {
                    RepositoryError::Config(
                        "relational.url is required when env = \"relational\"".to_string(),
                    )
                })?;
                BackendRuntime::Relational { url }
            }
        };
        info!(env = ?config.env, capacity = config.cache.capacity, "opened backend runtime");
        Ok(RepositoryFactory {
            runtime,
            cache: Arc::new(RepositoryCache::new(config.cache.capacity)),
            page_cache,
            registry: Arc::new(RepositoryRegistry::new()),
        })
    }

    /// Get or construct the repository for `name`
    ///
    /// Idempotent: a second call with the same name returns the already
    /// registered instance.
    pub fn open(&self, name: &str) -> Result<Arc<dyn Repository>> {
        if let Some(existing) = self.registry.lookup(name) {
            return Ok(existing);
        }
        let repo: Arc<dyn Repository> = match &self.runtime {
            BackendRuntime::Datastore { engine } => Arc::new(DatastoreRepository::new(
                name,
                Arc::clone(engine),
                Arc::clone(&self.cache),
                Arc::clone(&self.page_cache),
            )),
            BackendRuntime::Embedded { db } => Arc::new(KvRepository::new(
                name,
                Arc::clone(db),
                Arc::clone(&self.cache),
            )?),
            BackendRuntime::Relational { url } => Arc::new(SqlRepository::new(name, url)),
        };
        self.registry.register(Arc::clone(&repo));
        Ok(repo)
    }

    /// The opened backend runtime
    pub fn runtime(&self) -> &BackendRuntime {
        &self.runtime
    }

    /// The shared repository cache
    pub fn cache(&self) -> &Arc<RepositoryCache> {
        &self.cache
    }

    /// The registry all opened repositories land in
    pub fn registry(&self) -> &Arc<RepositoryRegistry> {
        &self.registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use polystore_core::Record;

    fn embedded_config(dir: &tempfile::TempDir) -> Config {
        Config::from_toml_str(&format!(
            "env = \"embedded\"\n[embedded]\npath = \"{}\"\n",
            dir.path().join("store.redb").display()
        ))
        .unwrap()
    }

    #[test]
    fn test_open_is_idempotent_and_registers() {
        let config = Config::from_toml_str("env = \"datastore\"").unwrap();
        let factory = RepositoryFactory::from_config(&config).unwrap();

        let a = factory.open("article").unwrap();
        let b = factory.open("article").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(factory.registry().len(), 1);
        assert!(factory.registry().lookup("article").is_some());
    }

    #[test]
    fn test_datastore_repositories_share_one_engine() {
        let config = Config::from_toml_str("env = \"datastore\"").unwrap();
        let factory = RepositoryFactory::from_config(&config).unwrap();

        let articles = factory.open("article").unwrap();
        let users = factory.open("user").unwrap();

        let mut txn = articles.begin_transaction().unwrap();
        let id = articles.add(&mut txn, Record::new().with("t", "x")).unwrap();
        txn.commit().unwrap();

        // distinct namespaces on the shared engine
        assert!(users.get(None, &id).unwrap().is_none());
        assert!(articles.get(None, &id).unwrap().is_some());
    }

    #[test]
    fn test_embedded_runtime_end_to_end() {
        let dir = tempfile::TempDir::new().unwrap();
        let factory = RepositoryFactory::from_config(&embedded_config(&dir)).unwrap();
        assert_eq!(factory.runtime().env(), RuntimeEnv::Embedded);

        let repo = factory.open("article").unwrap();
        let mut txn = repo.begin_transaction().unwrap();
        let id = repo.add(&mut txn, Record::new().with("t", "x")).unwrap();
        txn.commit().unwrap();
        assert!(repo.get(None, &id).unwrap().is_some());
    }

    #[test]
    fn test_relational_requires_url() {
        let config = Config::from_toml_str("env = \"relational\"").unwrap();
        let err = RepositoryFactory::from_config(&config).unwrap_err();
        assert!(matches!(err, RepositoryError::Config(_)));

        let config = Config::from_toml_str(
            "env = \"relational\"\n[relational]\nurl = \"postgres://localhost/blog\"\n",
        )
        .unwrap();
        let factory = RepositoryFactory::from_config(&config).unwrap();
        let repo = factory.open("article").unwrap();
        assert!(matches!(
            repo.count(),
            Err(RepositoryError::Unsupported(_))
        ));
    }
}
