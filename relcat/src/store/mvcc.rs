// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Multi-version metadata store
//!
//! `MvccStore` is the bundled `MetadataStore` implementation. Every commit
//! takes the next snapshot id from a store-wide counter and publishes a new
//! immutable copy of the catalog's rows. Older copies stay readable while a
//! pin can still see them; the rest are pruned. Committed state is written
//! through to a key-value driver before it becomes visible.

use super::error::{StoreError, StoreResult};
use super::kv::{create_kv_driver, KvDriver, KvOp, KvTree};
use super::pin::{PinTable, SnapshotPin};
use super::rows::CatalogRows;
use super::statement::{Statement, Transaction};
use super::{CatalogState, MetadataStore, ReadPoint};
use crate::config::StorageConfig;
use crate::model::{CatalogId, SnapshotId};
use parking_lot::{Mutex, MutexGuard};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

const STATE_TREE: &str = "relcat_catalogs";
const CATALOG_PREFIX: &[u8] = b"catalog/";
const NEXT_TXID_KEY: &[u8] = b"meta/next_txid";

pub struct MvccStore {
    inner: Mutex<StoreInner>,
    pins: Arc<PinTable>,
    tree: Option<Arc<dyn KvTree>>,
    _driver: Option<Arc<dyn KvDriver>>,
    lock_timeout: Duration,
}

struct StoreInner {
    next_txid: SnapshotId,
    catalogs: BTreeMap<CatalogId, CatalogHistory>,
}

/// Committed states of one catalog, ascending by commit snapshot
///
/// A `None` entry marks a pruned range: snapshots from its id up to the next
/// entry can no longer be read.
struct CatalogHistory {
    created: SnapshotId,
    versions: Vec<(SnapshotId, Option<Arc<CatalogRows>>)>,
}

impl CatalogHistory {
    fn latest(&self) -> Option<Arc<CatalogRows>> {
        self.versions.last().and_then(|(_, rows)| rows.clone())
    }

    fn at(&self, catalog: &CatalogId, snapshot: SnapshotId) -> StoreResult<Arc<CatalogRows>> {
        if snapshot < self.created {
            return Err(StoreError::UnknownCatalog(catalog.clone()));
        }
        match self.versions.iter().rev().find(|(id, _)| *id <= snapshot) {
            Some((_, Some(rows))) => Ok(rows.clone()),
            _ => Err(StoreError::SnapshotExpired(snapshot)),
        }
    }

    /// Drop states no reader can reach: keep the latest plus, for each pin,
    /// the newest state at or before it
    fn prune(&mut self, pinned: &[SnapshotId]) {
        let last = self.versions.len().saturating_sub(1);
        let keep: Vec<bool> = (0..self.versions.len())
            .map(|i| {
                i == last
                    || pinned.iter().any(|p| {
                        self.versions[i].0 <= *p
                            && self.versions.get(i + 1).map_or(true, |(next, _)| next > p)
                    })
            })
            .collect();
        for (i, (_, rows)) in self.versions.iter_mut().enumerate() {
            if !keep[i] {
                *rows = None;
            }
        }
        let mut previous_pruned = false;
        self.versions.retain(|(_, rows)| {
            let pruned = rows.is_none();
            let retain = !(pruned && previous_pruned);
            previous_pruned = pruned;
            retain
        });
    }
}

impl MvccStore {
    /// Volatile store without write-through
    pub fn in_memory() -> Self {
        Self {
            inner: Mutex::new(StoreInner {
                next_txid: SnapshotId::new(1),
                catalogs: BTreeMap::new(),
            }),
            pins: PinTable::new(),
            tree: None,
            _driver: None,
            lock_timeout: Duration::from_millis(StorageConfig::DEFAULT_LOCK_TIMEOUT_MS),
        }
    }

    /// Open a store persisted through the configured driver
    pub fn open(config: &StorageConfig) -> StoreResult<Self> {
        let driver = create_kv_driver(config.storage_type, &config.path)?;
        let tree = driver.open_tree(STATE_TREE)?;

        let next_txid = match tree.get(NEXT_TXID_KEY)? {
            Some(bytes) => SnapshotId::new(bincode::deserialize::<u64>(&bytes)?),
            None => SnapshotId::new(1),
        };
        let loaded_at = SnapshotId::new(next_txid.id().saturating_sub(1));
        let mut catalogs = BTreeMap::new();
        for (key, value) in tree.scan_prefix(CATALOG_PREFIX)? {
            let id = String::from_utf8_lossy(&key[CATALOG_PREFIX.len()..]).to_string();
            let rows: CatalogRows = bincode::deserialize(&value)?;
            catalogs.insert(
                CatalogId::from(id),
                CatalogHistory {
                    created: SnapshotId::ZERO,
                    versions: vec![(loaded_at, Some(Arc::new(rows)))],
                },
            );
        }
        log::info!(
            "Opened {} metadata store at {} with {} catalogs",
            config.storage_type,
            config.path.display(),
            catalogs.len()
        );

        Ok(Self {
            inner: Mutex::new(StoreInner {
                next_txid,
                catalogs,
            }),
            pins: PinTable::new(),
            tree: Some(tree),
            _driver: Some(driver),
            lock_timeout: Duration::from_millis(config.lock_timeout_ms),
        })
    }

    pub fn with_lock_timeout(mut self, timeout: Duration) -> Self {
        self.lock_timeout = timeout;
        self
    }

    /// Snapshots whose state is still held for `catalog`
    pub fn retained_snapshots(&self, catalog: &CatalogId) -> StoreResult<Vec<SnapshotId>> {
        let inner = self.lock()?;
        let history = inner
            .catalogs
            .get(catalog)
            .ok_or_else(|| StoreError::UnknownCatalog(catalog.clone()))?;
        Ok(history
            .versions
            .iter()
            .filter(|(_, rows)| rows.is_some())
            .map(|(id, _)| *id)
            .collect())
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, StoreInner>> {
        self.inner.try_lock_for(self.lock_timeout).ok_or_else(|| {
            StoreError::Timeout(format!(
                "metadata store busy for more than {:?}",
                self.lock_timeout
            ))
        })
    }

    fn persist(
        &self,
        catalog: &CatalogId,
        rows: Option<&CatalogRows>,
        next_txid: SnapshotId,
    ) -> StoreResult<()> {
        let Some(tree) = &self.tree else {
            return Ok(());
        };
        let mut key = CATALOG_PREFIX.to_vec();
        key.extend_from_slice(catalog.as_str().as_bytes());
        let mut ops = vec![KvOp::Put(
            NEXT_TXID_KEY.to_vec(),
            bincode::serialize(&next_txid.id())?,
        )];
        match rows {
            Some(rows) => ops.push(KvOp::Put(key, bincode::serialize(rows)?)),
            None => ops.push(KvOp::Delete(key)),
        }
        tree.apply_batch(&ops)?;
        Ok(())
    }

    fn last_committed(inner: &StoreInner) -> SnapshotId {
        SnapshotId::new(inner.next_txid.id().saturating_sub(1))
    }
}

impl MetadataStore for MvccStore {
    fn list_catalogs(&self) -> StoreResult<Vec<CatalogId>> {
        Ok(self.lock()?.catalogs.keys().cloned().collect())
    }

    fn create_catalog(&self, catalog: &CatalogId) -> StoreResult<SnapshotId> {
        let mut inner = self.lock()?;
        if inner.catalogs.contains_key(catalog) {
            return Err(StoreError::CatalogExists(catalog.clone()));
        }
        let txid = inner.next_txid;
        let mut rows = CatalogRows::default();
        Statement::RecordModelChange.apply(&mut rows, txid)?;
        rows.schema_stamp = txid;
        self.persist(catalog, Some(&rows), txid.next())?;

        inner.next_txid = txid.next();
        inner.catalogs.insert(
            catalog.clone(),
            CatalogHistory {
                created: txid,
                versions: vec![(txid, Some(Arc::new(rows)))],
            },
        );
        log::info!("Created catalog {} at snapshot {}", catalog, txid);
        Ok(txid)
    }

    fn drop_catalog(&self, catalog: &CatalogId) -> StoreResult<()> {
        let mut inner = self.lock()?;
        if !inner.catalogs.contains_key(catalog) {
            return Err(StoreError::UnknownCatalog(catalog.clone()));
        }
        let next_txid = inner.next_txid;
        self.persist(catalog, None, next_txid)?;
        inner.catalogs.remove(catalog);
        log::info!("Dropped catalog {}", catalog);
        Ok(())
    }

    fn read(&self, catalog: &CatalogId, at: ReadPoint) -> StoreResult<CatalogState> {
        let inner = self.lock()?;
        let history = inner
            .catalogs
            .get(catalog)
            .ok_or_else(|| StoreError::UnknownCatalog(catalog.clone()))?;
        let last = Self::last_committed(&inner);
        let snapshot = match at {
            ReadPoint::Latest => last,
            ReadPoint::At(s) if s > last => return Err(StoreError::UnknownSnapshot(s)),
            ReadPoint::At(s) => s,
        };
        let rows = history.at(catalog, snapshot)?;
        Ok(CatalogState { snapshot, rows })
    }

    fn execute(&self, txn: Transaction) -> StoreResult<SnapshotId> {
        let mut inner = self.lock()?;
        let txid = inner.next_txid;
        let current = inner
            .catalogs
            .get(&txn.catalog)
            .and_then(CatalogHistory::latest)
            .ok_or_else(|| StoreError::UnknownCatalog(txn.catalog.clone()))?;

        if let Some(base) = txn.base {
            if current.schema_stamp > base {
                return Err(StoreError::SerializationConflict(format!(
                    "catalog {} changed at snapshot {}, after read snapshot {}",
                    txn.catalog, current.schema_stamp, base
                )));
            }
        }

        let mut rows = (*current).clone();
        for statement in &txn.statements {
            statement.apply(&mut rows, txid)?;
        }
        if txn.statements.iter().any(Statement::changes_model) {
            rows.schema_stamp = txid;
        }
        self.persist(&txn.catalog, Some(&rows), txid.next())?;

        inner.next_txid = txid.next();
        let pinned = self.pins.pinned();
        if let Some(history) = inner.catalogs.get_mut(&txn.catalog) {
            history.versions.push((txid, Some(Arc::new(rows))));
            history.prune(&pinned);
        }
        log::debug!(
            "Committed {} statements on catalog {} at snapshot {}",
            txn.statements.len(),
            txn.catalog,
            txid
        );
        Ok(txid)
    }

    fn current_xmin(&self) -> StoreResult<SnapshotId> {
        let inner = self.lock()?;
        Ok(self
            .pins
            .oldest()
            .map(|oldest| oldest.next())
            .unwrap_or(inner.next_txid))
    }

    fn pin(&self) -> StoreResult<SnapshotPin> {
        let inner = self.lock()?;
        Ok(self.pins.acquire(Self::last_committed(&inner)))
    }
}
