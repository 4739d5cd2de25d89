// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Version tracker
//!
//! Model and data versions are snapshot ids stamped on rows by the
//! transaction that made the change, so "current version" is always read
//! back from committed state and never computed ahead of a commit.

use crate::error::{CatalogError, CatalogResult};
use crate::model::{CatalogId, SnapshotId, TableName};
use crate::store::{
    MetadataStore, ReadPoint, SnapshotPin, Statement, StoreError, Transaction,
};
use serde::Serialize;
use std::collections::BTreeSet;
use std::sync::Arc;

/// What changed in a catalog after some snapshot
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ChangeSet {
    pub model_changed: bool,
    /// Tables whose data changed
    pub tables: BTreeSet<TableName>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        !self.model_changed && self.tables.is_empty()
    }
}

pub struct VersionTracker {
    store: Arc<dyn MetadataStore>,
}

impl VersionTracker {
    pub fn new(store: Arc<dyn MetadataStore>) -> Self {
        Self { store }
    }

    /// Newest model version of `catalog`
    pub fn current_version(&self, catalog: &CatalogId) -> CatalogResult<SnapshotId> {
        Ok(self.store.model_version(catalog, ReadPoint::Latest)?)
    }

    /// Model version visible to a reader at `snapshot`
    pub fn current_version_at(
        &self,
        catalog: &CatalogId,
        snapshot: SnapshotId,
    ) -> CatalogResult<SnapshotId> {
        Ok(self.store.model_version(catalog, ReadPoint::At(snapshot))?)
    }

    /// Newest data version of `table`
    ///
    /// A table without data version rows reports the model version that
    /// introduced it.
    pub fn current_data_version(
        &self,
        catalog: &CatalogId,
        table: &TableName,
    ) -> CatalogResult<SnapshotId> {
        let state = self.store.read(catalog, ReadPoint::Latest)?;
        if state.rows.table(table).is_none() {
            return Err(CatalogError::NotFound(format!("table {}", table)));
        }
        Ok(state
            .rows
            .data_version(table)
            .unwrap_or_else(|| state.rows.model_version()))
    }

    /// Changes committed after `since`
    pub fn changes_since(
        &self,
        catalog: &CatalogId,
        since: SnapshotId,
    ) -> CatalogResult<ChangeSet> {
        let state = self.store.read(catalog, ReadPoint::Latest)?;
        let rows = &state.rows;
        let tables = rows
            .data_versions
            .iter()
            .filter(|v| v.snapshot > since)
            .map(|v| v.table.clone())
            .collect();
        Ok(ChangeSet {
            model_changed: rows.model_version() > since,
            tables,
        })
    }

    /// Record that the rows of `table` changed; returns the new data version
    pub fn record_data_change(
        &self,
        catalog: &CatalogId,
        table: &TableName,
    ) -> CatalogResult<SnapshotId> {
        let state = self.store.read(catalog, ReadPoint::Latest)?;
        if state.rows.table(table).is_none() {
            return Err(CatalogError::NotFound(format!("table {}", table)));
        }
        let txn = Transaction::new(
            catalog.clone(),
            vec![Statement::RecordDataChange {
                table: table.clone(),
            }],
        );
        let version = self.store.execute(txn).map_err(|e| match e {
            // dropped after the check above
            StoreError::ConstraintViolation(_) => {
                CatalogError::NotFound(format!("table {}", table))
            }
            other => CatalogError::from(other),
        })?;
        log::debug!("Data of {} in catalog {} changed at {}", table, catalog, version);
        Ok(version)
    }

    /// Pin the latest snapshot for a multi-read operation on `catalog`
    ///
    /// Reads made with `ReadPoint::At(pin.snapshot())` see one consistent
    /// state until the pin is dropped.
    pub fn pin(&self, catalog: &CatalogId) -> CatalogResult<SnapshotPin> {
        // fail early for unknown catalogs
        self.store.model_version(catalog, ReadPoint::Latest)?;
        Ok(self.store.pin()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TableKind;
    use crate::store::{MvccStore, NativeColumn, NativeTable};

    fn setup() -> (Arc<MvccStore>, CatalogId) {
        let store = Arc::new(MvccStore::in_memory());
        let catalog = CatalogId::from("1");
        store.create_catalog(&catalog).unwrap();
        store
            .execute(Transaction::new(
                catalog.clone(),
                vec![
                    Statement::CreateSchema {
                        schema: "s".to_string(),
                    },
                    Statement::CreateTable {
                        schema: "s".to_string(),
                        table: NativeTable {
                            name: "t".to_string(),
                            kind: TableKind::Table,
                            columns: vec![NativeColumn {
                                name: "id".to_string(),
                                type_name: "int4".to_string(),
                                nullok: false,
                            }],
                            keys: Vec::new(),
                            foreign_keys: Vec::new(),
                        },
                    },
                    Statement::RecordModelChange,
                ],
            ))
            .unwrap();
        (store, catalog)
    }

    #[test]
    fn test_data_changes_tracked_per_table() {
        let (store, catalog) = setup();
        let tracker = VersionTracker::new(store);
        let table = TableName::new("s", "t");

        let model = tracker.current_version(&catalog).unwrap();
        assert_eq!(tracker.current_data_version(&catalog, &table).unwrap(), model);

        let v1 = tracker.record_data_change(&catalog, &table).unwrap();
        assert!(v1 > model);
        assert_eq!(tracker.current_data_version(&catalog, &table).unwrap(), v1);
        // data changes leave the model version alone
        assert_eq!(tracker.current_version(&catalog).unwrap(), model);

        let changes = tracker.changes_since(&catalog, model).unwrap();
        assert!(!changes.model_changed);
        assert!(changes.tables.contains(&table));
        assert!(tracker.changes_since(&catalog, v1).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_table_and_catalog() {
        let (store, catalog) = setup();
        let tracker = VersionTracker::new(store);
        let err = tracker
            .record_data_change(&catalog, &TableName::new("s", "missing"))
            .unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
        let err = tracker.pin(&CatalogId::from("2")).unwrap_err();
        assert!(matches!(err, CatalogError::NotFound(_)));
    }
}
