//! Repository adapter over an embedded key-value store
//!
//! Each repository is one `redb` table named after the repository; the
//! key is the object id and the value is the record's canonical JSON
//! text (see [`crate::codec`]). Reads go through snapshot read
//! transactions against committed state; the uncommitted overlay lives
//! in the portable [`Transaction`] handle and is flushed into a native
//! write transaction on commit.
//!
//! The store allows a single writer at a time: `begin_transaction`
//! acquires the native write lock and holds it until commit or
//! rollback, so overlapping write transactions on this backend
//! serialize instead of conflicting. Dropping a transaction without
//! finishing it aborts the native writer.
//!
//! Queries have no native engine here; they run as a full table scan
//! through [`crate::eval`]. Counts are native (`len` on the table).

use crate::codec;
use crate::eval;
use polystore_cache::RepositoryCache;
use polystore_core::{
    id, Overlay, Query, QueryResults, Record, Repository, RepositoryError, Result, StagedOp,
    Transaction, TransactionBackend,
};
use rand::Rng;
use redb::{
    Database, ReadableTable, ReadableTableMetadata, TableDefinition, TableError, WriteTransaction,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// Backend name carried by transactions opened on this adapter
pub const BACKEND_KV: &str = "embedded-kv";

fn table_def(name: &str) -> TableDefinition<'_, &'static str, &'static str> {
    TableDefinition::new(name)
}

/// Repository over an embedded `redb` database
pub struct KvRepository {
    name: String,
    db: Arc<Database>,
    cache: Arc<RepositoryCache>,
    cache_enabled: AtomicBool,
}

impl KvRepository {
    /// Create the adapter for one named repository, creating its table
    ///
    /// Blocks if another write transaction is open on the database.
    pub fn new(
        name: impl Into<String>,
        db: Arc<Database>,
        cache: Arc<RepositoryCache>,
    ) -> Result<Self> {
        let repo = KvRepository {
            name: name.into(),
            db,
            cache,
            cache_enabled: AtomicBool::new(true),
        };
        let txn = repo.db.begin_write().map_err(RepositoryError::backend)?;
        txn.open_table(table_def(&repo.name))
            .map_err(RepositoryError::backend)?;
        txn.commit().map_err(RepositoryError::backend)?;
        Ok(repo)
    }

    /// Fetch one committed record, bypassing overlay and cache
    fn read_committed(&self, id: &str) -> Result<Option<Record>> {
        let txn = self.db.begin_read().map_err(RepositoryError::backend)?;
        let table = match txn.open_table(table_def(&self.name)) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(None),
            Err(e) => return Err(RepositoryError::backend(e)),
        };
        match table.get(id).map_err(RepositoryError::backend)? {
            Some(guard) => Ok(Some(codec::decode(guard.value())?)),
            None => Ok(None),
        }
    }

    fn exists_committed(&self, id: &str) -> Result<bool> {
        let txn = self.db.begin_read().map_err(RepositoryError::backend)?;
        let table = match txn.open_table(table_def(&self.name)) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(false),
            Err(e) => return Err(RepositoryError::backend(e)),
        };
        Ok(table.get(id).map_err(RepositoryError::backend)?.is_some())
    }

    /// Scan all committed records in id order
    fn scan_committed(&self) -> Result<Vec<Record>> {
        let txn = self.db.begin_read().map_err(RepositoryError::backend)?;
        let table = match txn.open_table(table_def(&self.name)) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(RepositoryError::backend(e)),
        };
        let mut records = Vec::new();
        for item in table.iter().map_err(RepositoryError::backend)? {
            let (_, value) = item.map_err(RepositoryError::backend)?;
            records.push(codec::decode(value.value())?);
        }
        Ok(records)
    }

    /// Overlay lookup plus backend fallthrough, shared by `get`/`has`
    fn staged_for(&self, txn: Option<&Transaction>, id: &str) -> Result<Option<Option<Record>>> {
        let Some(txn) = txn else { return Ok(None) };
        txn.expect_backend(BACKEND_KV)?;
        Ok(txn.staged(&self.name, id).map(|op| match op {
            StagedOp::Put(record) => Some(record.clone()),
            StagedOp::Delete => None,
        }))
    }
}

impl Repository for KvRepository {
    fn add(&self, txn: &mut Transaction, mut record: Record) -> Result<String> {
        txn.expect_backend(BACKEND_KV)?;
        let id = match record.id() {
            Some(id) => id.to_string(),
            None => id::time_millis_id(),
        };
        // The native write lock is held, so committed state is frozen
        // for the life of this transaction and the check cannot race.
        let taken = match txn.staged(&self.name, &id) {
            Some(StagedOp::Put(_)) => true,
            Some(StagedOp::Delete) => false,
            None => self.exists_committed(&id)?,
        };
        if taken {
            return Err(RepositoryError::DuplicateId {
                repository: self.name.clone(),
                id,
            });
        }
        record.set_id(&id);
        txn.stage_put(&self.name, id.clone(), record.clone())?;
        if self.is_cache_enabled() {
            self.cache.put_record(&self.name, &id, &record);
        }
        debug!(repository = %self.name, id = %id, "staged add");
        Ok(id)
    }

    fn update(&self, txn: &mut Transaction, id: &str, mut record: Record) -> Result<()> {
        txn.expect_backend(BACKEND_KV)?;
        record.set_id(id);
        txn.stage_put(&self.name, id.to_string(), record.clone())?;
        if self.is_cache_enabled() {
            self.cache.put_record(&self.name, id, &record);
        }
        debug!(repository = %self.name, id = %id, "staged update");
        Ok(())
    }

    fn remove(&self, txn: &mut Transaction, id: &str) -> Result<()> {
        txn.expect_backend(BACKEND_KV)?;
        if txn.staged(&self.name, id).is_none() && !self.exists_committed(id)? {
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
        match self.read_committed(id)? {
            Some(record) => {
                if self.is_cache_enabled() {
                    self.cache.put_record(&self.name, id, &record);
                }
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    fn has(&self, txn: Option<&Transaction>, id: &str) -> Result<bool> {
        if let Some(staged) = self.staged_for(txn, id)? {
            return Ok(staged.is_some());
        }
        if self.is_cache_enabled() && self.cache.contains_record(&self.name, id) {
            return Ok(true);
        }
        self.exists_committed(id)
    }

    fn query(&self, query: &Query) -> Result<QueryResults> {
        let use_cache = self.is_cache_enabled() && query.cache_key().is_some();
        let token = query.cache_token();
        if use_cache {
            if let Some(results) = self.cache.get_results(&self.name, token) {
                return Ok(results);
            }
        }

        let results = eval::execute(self.scan_committed()?, query)?;

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
        let txn = self.db.begin_read().map_err(RepositoryError::backend)?;
        let count = match txn.open_table(table_def(&self.name)) {
            Ok(table) => table.len().map_err(RepositoryError::backend)?,
            Err(TableError::TableDoesNotExist(_)) => 0,
            Err(e) => return Err(RepositoryError::backend(e)),
        };
        if self.is_cache_enabled() {
            self.cache.put_count(&self.name, count);
        }
        Ok(count)
    }

    fn get_randomly(&self, fetch_size: usize) -> Result<Vec<Record>> {
        let records = self.scan_committed()?;
        let mut rng = rand::thread_rng();
        let mut reservoir: Vec<Record> = Vec::with_capacity(fetch_size);
        for (i, record) in records.into_iter().enumerate() {
            if i < fetch_size {
                reservoir.push(record);
            } else {
                let j = rng.gen_range(0..=i);
                if j < fetch_size {
                    reservoir[j] = record;
                }
            }
        }
        Ok(reservoir)
    }

    fn begin_transaction(&self) -> Result<Transaction> {
        let native = self.db.begin_write().map_err(RepositoryError::backend)?;
        Ok(Transaction::new(Box::new(KvTxnBackend {
            native: Some(native),
            cache: Arc::clone(&self.cache),
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

/// Backend half of an embedded-store transaction
///
/// Holds the native write transaction (and with it the single-writer
/// lock) for the life of the portable handle.
struct KvTxnBackend {
    native: Option<WriteTransaction>,
    cache: Arc<RepositoryCache>,
}

impl TransactionBackend for KvTxnBackend {
    fn backend(&self) -> &'static str {
        BACKEND_KV
    }

    fn commit(&mut self, overlay: &Overlay) -> Result<()> {
        // Encode before touching the native writer so a codec failure
        // leaves the transaction intact and retryable.
        let mut by_repo: HashMap<&str, Vec<(&str, Option<String>)>> = HashMap::new();
        for (repository, writes) in overlay {
            let encoded = by_repo.entry(repository.as_str()).or_default();
            for (id, op) in writes {
                encoded.push((
                    id.as_str(),
                    match op {
                        StagedOp::Put(record) => Some(codec::encode(record)?),
                        StagedOp::Delete => None,
                    },
                ));
            }
        }

        let native = self.native.take().ok_or_else(|| {
            RepositoryError::backend("embedded write transaction already consumed")
        })?;
        for (repository, writes) in &by_repo {
            let mut table = native
                .open_table(table_def(repository))
                .map_err(RepositoryError::backend)?;
            for (id, encoded) in writes {
                match encoded {
                    Some(text) => {
                        table
                            .insert(*id, text.as_str())
                            .map_err(RepositoryError::backend)?;
                    }
                    None => {
                        table.remove(*id).map_err(RepositoryError::backend)?;
                    }
                }
            }
        }
        native.commit().map_err(RepositoryError::backend)?;

        for repository in overlay.keys() {
            self.cache.invalidate_repository(repository);
        }
        debug!(repositories = overlay.len(), "embedded-kv commit applied");
        Ok(())
    }

    fn rollback(&mut self, overlay: &Overlay) -> Result<()> {
        if let Some(native) = self.native.take() {
            native.abort().map_err(RepositoryError::backend)?;
        }
        // Staged writes were mirrored into the record cache; undo that.
        for (repository, writes) in overlay {
            for id in writes.keys() {
                self.cache.evict_record(repository, id);
            }
        }
        debug!(repositories = overlay.len(), "embedded-kv rollback");
        Ok(())
    }
}
