//! Repository adapter over the hierarchical entity store
//!
//! Each record maps to one entity of kind = repository name under the
//! shared parent sentinel, so a repository is one entity group and its
//! writes commit under the ancestor-transaction model. Filters, sorts,
//! and offset+limit pagination are pushed down to the engine's native
//! query API; counts are exact and native.
//!
//! Commit retries up to [`COMMIT_RETRIES`] times on concurrent-
//! modification conflicts, then invalidates the repository's query and
//! count cache entries and wholesale-invalidates the page-level response
//! cache.

use crate::codec;
use crate::engine::{DatastoreEngine, EngineQuery, EngineTransaction, Mutation};
use crate::entity::EntityKey;
use polystore_cache::{PageCache, RepositoryCache};
use polystore_core::{
    id, Overlay, Pagination, Query, QueryResults, Record, Repository, RepositoryError, Result,
    StagedOp, Transaction, TransactionBackend,
};
use rand::Rng;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, warn};

/// Backend name carried by transactions opened on this adapter
pub const BACKEND_DATASTORE: &str = "datastore";

/// Commit attempts before a conflict is surfaced to the caller
pub const COMMIT_RETRIES: u32 = 3;

/// Repository over the hierarchical datastore
pub struct DatastoreRepository {
    name: String,
    engine: Arc<DatastoreEngine>,
    cache: Arc<RepositoryCache>,
    page_cache: Arc<dyn PageCache>,
    cache_enabled: AtomicBool,
}

impl DatastoreRepository {
    /// Create the adapter for one named repository
    pub fn new(
        name: impl Into<String>,
        engine: Arc<DatastoreEngine>,
        cache: Arc<RepositoryCache>,
        page_cache: Arc<dyn PageCache>,
    ) -> Self {
        DatastoreRepository {
            name: name.into(),
            engine,
            cache,
            page_cache,
            cache_enabled: AtomicBool::new(true),
        }
    }

    fn key_for(&self, id: &str) -> EntityKey {
        EntityKey::for_record(&self.name, id)
    }

    fn to_engine_query(&self, query: &Query) -> EngineQuery {
        EngineQuery {
            kind: self.name.clone(),
            filters: query.filters().iter().map(codec::filter_to_native).collect(),
            sorts: query.sorts().to_vec(),
            offset: query.page().map(|p| p.offset()),
            limit: query.page().map(|p| p.page_size),
        }
    }

    /// Overlay lookup plus backend fallthrough, shared by `get`/`has`
    fn staged_for(&self, txn: Option<&Transaction>, id: &str) -> Result<Option<Option<Record>>> {
        let Some(txn) = txn else { return Ok(None) };
        txn.expect_backend(BACKEND_DATASTORE)?;
        Ok(txn.staged(&self.name, id).map(|op| match op {
            StagedOp::Put(record) => Some(record.clone()),
            StagedOp::Delete => None,
        }))
    }
}

impl Repository for DatastoreRepository {
    fn add(&self, txn: &mut Transaction, mut record: Record) -> Result<String> {
        txn.expect_backend(BACKEND_DATASTORE)?;
        let id = match record.id() {
            Some(id) => id.to_string(),
            None => id::time_millis_id(),
        };
        record.set_id(&id);
        txn.stage_put(&self.name, id.clone(), record.clone())?;
        if self.is_cache_enabled() {
            self.cache.put_record(&self.name, &id, &record);
        }
        debug!(repository = %self.name, id = %id, "staged add");
        Ok(id)
    }

    fn update(&self, txn: &mut Transaction, id: &str, mut record: Record) -> Result<()> {
        txn.expect_backend(BACKEND_DATASTORE)?;
        record.set_id(id);
        txn.stage_put(&self.name, id.to_string(), record.clone())?;
        if self.is_cache_enabled() {
            self.cache.put_record(&self.name, id, &record);
        }
        debug!(repository = %self.name, id = %id, "staged update");
        Ok(())
    }

    fn remove(&self, txn: &mut Transaction, id: &str) -> Result<()> {
        txn.expect_backend(BACKEND_DATASTORE)?;
        if txn.staged(&self.name, id).is_none() && !self.engine.contains(&self.key_for(id)) {
            debug!(repository = %self.name, id = %id, "remove of absent id is a no-op");
        }
        txn.stage_delete(&self.name, id.to_string())?;
        self.cache.evict_record(&self.name, id);
        debug!(repository = %self.name, id = %id, "staged remove");
        Ok(())
    }

    fn get(&self, txn: Option<&Transaction>, id: &str) -> Result<Option<Record>> {
        if let Some(staged) = self.staged_for(txn, id)? {
            return Ok(staged);
        }
        if self.is_cache_enabled() {
            if let Some(record) = self.cache.get_record(&self.name, id) {
                return Ok(Some(record));
            }
        }
        match self.engine.get(&self.key_for(id)) {
            Some(entity) => {
                let record = codec::entity_to_record(&entity);
                if self.is_cache_enabled() {
                    self.cache.put_record(&self.name, id, &record);
                }
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn get_batch(
        &self,
        txn: Option<&Transaction>,
        ids: &[String],
    ) -> Result<HashMap<String, Record>> {
        let mut out = HashMap::with_capacity(ids.len());
        let mut fetch = Vec::new();
        for id in ids {
            match self.staged_for(txn, id)? {
                Some(Some(record)) => {
                    out.insert(id.clone(), record);
                }
                Some(None) => {} // tombstoned in this transaction
                None => fetch.push(self.key_for(id)),
            }
        }
        for entity in self.engine.get_many(&fetch) {
            let record = codec::entity_to_record(&entity);
            if self.is_cache_enabled() {
                self.cache.put_record(&self.name, &entity.key.name, &record);
            }
            out.insert(entity.key.name.clone(), record);
        }
        Ok(out)
    }

    fn has(&self, txn: Option<&Transaction>, id: &str) -> Result<bool> {
        if let Some(staged) = self.staged_for(txn, id)? {
            return Ok(staged.is_some());
        }
        if self.is_cache_enabled() && self.cache.contains_record(&self.name, id) {
            return Ok(true);
        }
        Ok(self.engine.contains(&self.key_for(id)))
    }

    fn query(&self, query: &Query) -> Result<QueryResults> {
        let use_cache = self.is_cache_enabled() && query.cache_key().is_some();
        let token = query.cache_token();
        if use_cache {
            if let Some(results) = self.cache.get_results(&self.name, token) {
                return Ok(results);
            }
        }

        let native = self.to_engine_query(query);
        let record_count = self.engine.count_matching(&self.name, &native.filters)?;
        let entities = self.engine.run_query(&native)?;
        let results = QueryResults {
            pagination: Pagination::compute(record_count, query.page()),
            records: entities.iter().map(codec::entity_to_record).collect(),
        };

        if use_cache {
            self.cache.put_results(&self.name, token, &results);
        }
        Ok(results)
    }

    fn count(&self) -> Result<u64> {
        if self.is_cache_enabled() {
            if let Some(count) = self.cache.get_count(&self.name) {
                return Ok(count);
            }
        }
        let count = self.engine.count_matching(&self.name, &[])?;
        if self.is_cache_enabled() {
            self.cache.put_count(&self.name, count);
        }
        Ok(count)
    }

    fn get_randomly(&self, fetch_size: usize) -> Result<Vec<Record>> {
        let entities = self.engine.run_query(&EngineQuery::scan(&self.name))?;
        let mut rng = rand::thread_rng();
        let mut reservoir: Vec<Record> = Vec::with_capacity(fetch_size);
        for (i, entity) in entities.iter().enumerate() {
            if i < fetch_size {
                reservoir.push(codec::entity_to_record(entity));
            } else {
                let j = rng.gen_range(0..=i);
                if j < fetch_size {
                    reservoir[j] = codec::entity_to_record(entity);
                }
            }
        }
        Ok(reservoir)
    }

    fn begin_transaction(&self) -> Result<Transaction> {
        let native = self.engine.begin();
        Ok(Transaction::new(Box::new(DatastoreTxnBackend {
            engine: Arc::clone(&self.engine),
            native,
            cache: Arc::clone(&self.cache),
            page_cache: Arc::clone(&self.page_cache),
        })))
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

/// Backend half of a datastore transaction
struct DatastoreTxnBackend {
    engine: Arc<DatastoreEngine>,
    native: EngineTransaction,
    cache: Arc<RepositoryCache>,
    page_cache: Arc<dyn PageCache>,
}

impl TransactionBackend for DatastoreTxnBackend {
    fn backend(&self) -> &'static str {
        BACKEND_DATASTORE
    }

    fn commit(&mut self, overlay: &Overlay) -> Result<()> {
        let mut mutations = Vec::new();
        for (repository, writes) in overlay {
            for (id, op) in writes {
                mutations.push(match op {
                    StagedOp::Put(record) => {
                        Mutation::Put(codec::record_to_entity(repository, id, record))
                    }
                    StagedOp::Delete => Mutation::Delete(EntityKey::for_record(repository, id)),
                });
            }
        }

        let mut attempts = 0;
        loop {
            attempts += 1;
            match self.engine.commit(&self.native, &mutations) {
                Ok(()) => break,
                Err(crate::engine::EngineError::Conflict { group }) => {
                    if attempts >= COMMIT_RETRIES {
                        warn!(attempts, %group, "commit conflict budget exhausted");
                        return Err(RepositoryError::CommitConflict { attempts });
                    }
                    warn!(attempts, %group, "commit conflict, retrying");
                    self.engine.refresh(&mut self.native);
                }
                Err(e) => return Err(e.into()),
            }
        }

        for repository in overlay.keys() {
            self.cache.invalidate_repository(repository);
        }
        // A commit may have changed content on arbitrarily many rendered
        // pages; the page cache offers nothing finer than everything.
        self.page_cache.invalidate_all();
        debug!(mutations = mutations.len(), attempts, "datastore commit applied");
        Ok(())
    }

    fn rollback(&mut self, overlay: &Overlay) -> Result<()> {
        // Staged writes were mirrored into the record cache; undo that.
        for (repository, writes) in overlay {
            for id in writes.keys() {
                self.cache.evict_record(repository, id);
            }
        }
        debug!(repositories = overlay.len(), "datastore rollback");
        Ok(())
    }
}
