//! Backend-agnostic transaction handle
//!
//! A [`Transaction`] is the unit of work for every write. It carries:
//!
//! - an **uncommitted overlay**: repository and object id -> staged
//!   record or tombstone, giving read-your-writes inside the
//!   transaction before commit
//! - a lifecycle state: `Active` -> `Committed` | `RolledBack` (terminal)
//! - a boxed backend half ([`TransactionBackend`]) that flushes the
//!   overlay into native storage on commit and cleans up on rollback
//!
//! Transactions are passed explicitly into repository calls instead of
//! being bound to a thread. The handle is deliberately not `Send` (raw
//! pointer marker) and not `Clone`: one transaction belongs to one unit
//! of work on one thread, full stop. Sharing a transaction across
//! threads is undefined behavior in this design and the type system
//! forbids it.

use crate::error::{RepositoryError, Result};
use crate::record::Record;
use std::collections::HashMap;
use std::marker::PhantomData;
use tracing::debug;

/// A staged write: the to-be-written record or an explicit tombstone
#[derive(Debug, Clone, PartialEq)]
pub enum StagedOp {
    /// Whole-record write (add or update)
    Put(Record),
    /// Removal tombstone
    Delete,
}

/// The uncommitted-writes overlay: repository -> object id -> staged op
///
/// Keyed by repository first because object ids are only unique within
/// a repository: callers may supply their own ids, so the same id can
/// legitimately be staged in two repositories inside one transaction.
pub type Overlay = HashMap<String, HashMap<String, StagedOp>>;

/// Transaction lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnState {
    /// Open; writes may be staged
    Active,
    /// Commit succeeded (terminal)
    Committed,
    /// Rolled back (terminal)
    RolledBack,
}

impl TxnState {
    /// Human-readable state name for error messages
    pub fn as_str(&self) -> &'static str {
        match self {
            TxnState::Active => "active",
            TxnState::Committed => "committed",
            TxnState::RolledBack => "rolled-back",
        }
    }
}

/// Backend half of a transaction
///
/// Implemented per adapter. `commit` flushes the overlay into native
/// storage (retrying on concurrent-modification conflicts where the
/// backend signals them) and performs cache invalidation; `rollback`
/// discards native state and repairs any cache entries mirrored from
/// staged writes.
pub trait TransactionBackend {
    /// Name of the backend this transaction was opened on
    fn backend(&self) -> &'static str;

    /// Flush the overlay into native storage
    fn commit(&mut self, overlay: &Overlay) -> Result<()>;

    /// Discard native transaction state
    fn rollback(&mut self, overlay: &Overlay) -> Result<()>;
}

/// A unit of work bound to exactly one backend transaction
pub struct Transaction {
    state: TxnState,
    overlay: Overlay,
    backend: Box<dyn TransactionBackend>,
    // Keep the handle on the thread that opened it.
    _not_send: PhantomData<*const ()>,
}

impl Transaction {
    /// Wrap a native backend transaction
    pub fn new(backend: Box<dyn TransactionBackend>) -> Self {
        Transaction {
            state: TxnState::Active,
            overlay: Overlay::new(),
            backend,
            _not_send: PhantomData,
        }
    }

    /// Current lifecycle state
    pub fn state(&self) -> TxnState {
        self.state
    }

    /// True while the transaction can stage writes and commit
    pub fn is_active(&self) -> bool {
        self.state == TxnState::Active
    }

    /// Name of the backend this transaction belongs to
    pub fn backend_name(&self) -> &'static str {
        self.backend.backend()
    }

    /// Verify this transaction was opened on the expected backend
    pub fn expect_backend(&self, expected: &'static str) -> Result<()> {
        let actual = self.backend.backend();
        if actual != expected {
            return Err(RepositoryError::BackendMismatch { expected, actual });
        }
        Ok(())
    }

    fn ensure_active(&self) -> Result<()> {
        if !self.is_active() {
            return Err(RepositoryError::InactiveTransaction {
                state: self.state.as_str().to_string(),
            });
        }
        Ok(())
    }

    /// Stage a whole-record write
    pub fn stage_put(&mut self, repository: &str, id: String, record: Record) -> Result<()> {
        self.ensure_active()?;
        self.overlay
            .entry(repository.to_string())
            .or_default()
            .insert(id, StagedOp::Put(record));
        Ok(())
    }

    /// Stage a removal tombstone
    pub fn stage_delete(&mut self, repository: &str, id: String) -> Result<()> {
        self.ensure_active()?;
        self.overlay
            .entry(repository.to_string())
            .or_default()
            .insert(id, StagedOp::Delete);
        Ok(())
    }

    /// Look up the staged operation for an id in one repository
    ///
    /// `Some(StagedOp::Delete)` means the id was removed in this
    /// transaction; readers must surface that as absent without
    /// consulting the backend.
    pub fn staged(&self, repository: &str, id: &str) -> Option<&StagedOp> {
        self.overlay.get(repository)?.get(id)
    }

    /// Number of staged writes across all repositories
    pub fn staged_len(&self) -> usize {
        self.overlay.values().map(|writes| writes.len()).sum()
    }

    /// Flush staged writes to the backend
    ///
    /// On success the transaction becomes `Committed` and the overlay is
    /// discarded. On failure the transaction stays `Active` so the
    /// caller can roll back.
    pub fn commit(&mut self) -> Result<()> {
        self.ensure_active()?;
        debug!(staged = self.staged_len(), backend = self.backend.backend(), "committing transaction");
        self.backend.commit(&self.overlay)?;
        self.state = TxnState::Committed;
        self.overlay.clear();
        Ok(())
    }

    /// Discard staged writes
    pub fn rollback(&mut self) -> Result<()> {
        self.ensure_active()?;
        debug!(staged = self.staged_len(), backend = self.backend.backend(), "rolling back transaction");
        self.backend.rollback(&self.overlay)?;
        self.state = TxnState::RolledBack;
        self.overlay.clear();
        Ok(())
    }
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("backend", &self.backend.backend())
            .field("state", &self.state)
            .field("staged", &self.staged_len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Calls {
        commits: usize,
        rollbacks: usize,
        last_overlay: usize,
    }

    struct MockBackend {
        calls: Rc<RefCell<Calls>>,
        fail_commit: bool,
    }

    impl TransactionBackend for MockBackend {
        fn backend(&self) -> &'static str {
            "mock"
        }

        fn commit(&mut self, overlay: &Overlay) -> Result<()> {
            let mut c = self.calls.borrow_mut();
            c.commits += 1;
            c.last_overlay = overlay.values().map(|w| w.len()).sum();
            if self.fail_commit {
                return Err(RepositoryError::Backend("boom".into()));
            }
            Ok(())
        }

        fn rollback(&mut self, overlay: &Overlay) -> Result<()> {
            let mut c = self.calls.borrow_mut();
            c.rollbacks += 1;
            c.last_overlay = overlay.values().map(|w| w.len()).sum();
            Ok(())
        }
    }

    fn mock_txn(fail_commit: bool) -> (Transaction, Rc<RefCell<Calls>>) {
        let calls = Rc::new(RefCell::new(Calls::default()));
        let txn = Transaction::new(Box::new(MockBackend {
            calls: Rc::clone(&calls),
            fail_commit,
        }));
        (txn, calls)
    }

    #[test]
    fn test_stage_and_read_back() {
        let (mut txn, _) = mock_txn(false);
        let r = Record::new().with("title", "A");
        txn.stage_put("article", "1".into(), r.clone()).unwrap();

        assert_eq!(txn.staged("article", "1"), Some(&StagedOp::Put(r)));
        // same id, different repository: not visible
        assert!(txn.staged("user", "1").is_none());
        assert!(txn.staged("article", "2").is_none());
    }

    #[test]
    fn test_same_id_staged_in_two_repositories_keeps_both() {
        let (mut txn, calls) = mock_txn(false);
        let article = Record::new().with("title", "A");
        let user = Record::new().with("login", "b");
        txn.stage_put("article", "x1".into(), article.clone()).unwrap();
        txn.stage_put("user", "x1".into(), user.clone()).unwrap();

        // ids are only unique per repository; neither write may shadow
        // the other
        assert_eq!(txn.staged("article", "x1"), Some(&StagedOp::Put(article)));
        assert_eq!(txn.staged("user", "x1"), Some(&StagedOp::Put(user)));
        assert_eq!(txn.staged_len(), 2);

        txn.commit().unwrap();
        assert_eq!(calls.borrow().last_overlay, 2);
    }

    #[test]
    fn test_tombstone_shadows_put() {
        let (mut txn, _) = mock_txn(false);
        txn.stage_put("article", "1".into(), Record::new()).unwrap();
        txn.stage_delete("article", "1".into()).unwrap();
        assert_eq!(txn.staged("article", "1"), Some(&StagedOp::Delete));
        assert_eq!(txn.staged_len(), 1);
    }

    #[test]
    fn test_commit_flushes_and_terminates() {
        let (mut txn, calls) = mock_txn(false);
        txn.stage_put("a", "1".into(), Record::new()).unwrap();
        txn.commit().unwrap();

        assert_eq!(txn.state(), TxnState::Committed);
        assert!(!txn.is_active());
        assert_eq!(calls.borrow().commits, 1);
        assert_eq!(calls.borrow().last_overlay, 1);

        // terminal: further staging and commits fail
        let err = txn.stage_put("a", "2".into(), Record::new()).unwrap_err();
        assert!(matches!(err, RepositoryError::InactiveTransaction { .. }));
        assert!(matches!(
            txn.commit(),
            Err(RepositoryError::InactiveTransaction { .. })
        ));
    }

    #[test]
    fn test_failed_commit_stays_active() {
        let (mut txn, calls) = mock_txn(true);
        txn.stage_put("a", "1".into(), Record::new()).unwrap();
        assert!(txn.commit().is_err());
        assert!(txn.is_active());

        txn.rollback().unwrap();
        assert_eq!(txn.state(), TxnState::RolledBack);
        assert_eq!(calls.borrow().rollbacks, 1);
    }

    #[test]
    fn test_rollback_is_terminal() {
        let (mut txn, _) = mock_txn(false);
        txn.rollback().unwrap();
        assert!(matches!(
            txn.rollback(),
            Err(RepositoryError::InactiveTransaction { .. })
        ));
    }

    #[test]
    fn test_expect_backend() {
        let (txn, _) = mock_txn(false);
        assert!(txn.expect_backend("mock").is_ok());
        let err = txn.expect_backend("datastore").unwrap_err();
        assert!(matches!(
            err,
            RepositoryError::BackendMismatch {
                expected: "datastore",
                actual: "mock"
            }
        ));
    }

    #[test]
    fn test_txn_state_names() {
        assert_eq!(TxnState::Active.as_str(), "active");
        assert_eq!(TxnState::Committed.as_str(), "committed");
        assert_eq!(TxnState::RolledBack.as_str(), "rolled-back");
    }
}
