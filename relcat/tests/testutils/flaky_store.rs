//! Store wrapper for failure injection

use parking_lot::Mutex;
use relcat::store::{CatalogState, SnapshotPin, StoreError, StoreResult, Transaction};
use relcat::{CatalogId, MetadataStore, MvccStore, ReadPoint, SnapshotId};
use std::collections::HashSet;
use std::sync::Arc;

/// Delegates to an `MvccStore`, failing or interleaving on demand
pub struct FlakyStore {
    inner: Arc<MvccStore>,
    /// Commits on these catalogs fail with a timeout
    timeout_catalogs: Mutex<HashSet<CatalogId>>,
    /// Reads of these catalogs fail with a timeout
    unreadable_catalogs: Mutex<HashSet<CatalogId>>,
    /// Committed right after the next read of its catalog
    interleaved: Mutex<Option<Transaction>>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(MvccStore::in_memory()),
            timeout_catalogs: Mutex::new(HashSet::new()),
            unreadable_catalogs: Mutex::new(HashSet::new()),
            interleaved: Mutex::new(None),
        }
    }

    pub fn inner(&self) -> &Arc<MvccStore> {
        &self.inner
    }

    pub fn fail_commits_on(&self, catalog: &CatalogId) {
        self.timeout_catalogs.lock().insert(catalog.clone());
    }

    pub fn fail_reads_on(&self, catalog: &CatalogId) {
        self.unreadable_catalogs.lock().insert(catalog.clone());
    }

    pub fn heal(&self) {
        self.timeout_catalogs.lock().clear();
        self.unreadable_catalogs.lock().clear();
    }

    pub fn interleave_after_next_read(&self, txn: Transaction) {
        *self.interleaved.lock() = Some(txn);
    }
}

impl MetadataStore for FlakyStore {
    fn list_catalogs(&self) -> StoreResult<Vec<CatalogId>> {
        self.inner.list_catalogs()
    }

    fn create_catalog(&self, catalog: &CatalogId) -> StoreResult<SnapshotId> {
        self.inner.create_catalog(catalog)
    }

    fn drop_catalog(&self, catalog: &CatalogId) -> StoreResult<()> {
        self.inner.drop_catalog(catalog)
    }

    fn read(&self, catalog: &CatalogId, at: ReadPoint) -> StoreResult<CatalogState> {
        if self.unreadable_catalogs.lock().contains(catalog) {
            return Err(StoreError::Timeout(format!(
                "read of catalog {} timed out",
                catalog
            )));
        }
        let state = self.inner.read(catalog, at)?;
        let pending = {
            let mut slot = self.interleaved.lock();
            match slot.as_ref() {
                Some(txn) if &txn.catalog == catalog => slot.take(),
                _ => None,
            }
        };
        if let Some(txn) = pending {
            self.inner.execute(txn)?;
        }
        Ok(state)
    }

    fn execute(&self, txn: Transaction) -> StoreResult<SnapshotId> {
        if self.timeout_catalogs.lock().contains(&txn.catalog) {
            return Err(StoreError::Timeout(format!(
                "commit on catalog {} timed out",
                txn.catalog
            )));
        }
        self.inner.execute(txn)
    }

    fn current_xmin(&self) -> StoreResult<SnapshotId> {
        self.inner.current_xmin()
    }

    fn pin(&self) -> StoreResult<SnapshotPin> {
        self.inner.pin()
    }
}
