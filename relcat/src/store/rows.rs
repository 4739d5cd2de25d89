// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Stored catalog rows
//!
//! `CatalogRows` is the complete committed state of one catalog: the native
//! relational catalog (what the store itself enforces) and the auxiliary
//! metadata tables (versions, comments, annotations and pseudo-constraints).
//! Annotation documents are kept as JSON text so the rows stay encodable with
//! bincode.

use crate::model::{MetadataTarget, SnapshotId, TableKind, TableName};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogRows {
    pub schemas: BTreeMap<String, NativeSchema>,
    /// Ascending by snapshot
    pub model_versions: Vec<ModelVersionRow>,
    /// Ascending by snapshot
    pub data_versions: Vec<DataVersionRow>,
    pub comments: BTreeMap<MetadataTarget, String>,
    pub annotations: BTreeMap<MetadataTarget, BTreeMap<String, String>>,
    pub pseudo_keys: Vec<PseudoKeyRow>,
    pub pseudo_foreign_keys: Vec<PseudoForeignKeyRow>,
    /// Snapshot of the last transaction that changed anything besides version rows
    pub schema_stamp: SnapshotId,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NativeSchema {
    pub name: String,
    pub tables: BTreeMap<String, NativeTable>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeTable {
    pub name: String,
    pub kind: TableKind,
    pub columns: Vec<NativeColumn>,
    pub keys: Vec<NativeKey>,
    pub foreign_keys: Vec<NativeForeignKey>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeColumn {
    pub name: String,
    pub type_name: String,
    pub nullok: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeKey {
    pub name: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NativeForeignKey {
    pub name: String,
    pub columns: Vec<String>,
    pub referenced: TableName,
    pub referenced_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PseudoKeyRow {
    pub table: TableName,
    pub columns: Vec<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PseudoForeignKeyRow {
    pub table: TableName,
    pub columns: Vec<String>,
    pub referenced: TableName,
    pub referenced_columns: Vec<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelVersionRow {
    pub snapshot: SnapshotId,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataVersionRow {
    pub table: TableName,
    pub snapshot: SnapshotId,
}

impl CatalogRows {
    pub fn table(&self, name: &TableName) -> Option<&NativeTable> {
        self.schemas
            .get(&name.schema)
            .and_then(|s| s.tables.get(&name.table))
    }

    pub(crate) fn table_mut(&mut self, name: &TableName) -> Option<&mut NativeTable> {
        self.schemas
            .get_mut(&name.schema)
            .and_then(|s| s.tables.get_mut(&name.table))
    }

    /// Newest model version row, the catalog's current version
    pub fn model_version(&self) -> SnapshotId {
        self.model_versions
            .iter()
            .map(|row| row.snapshot)
            .max()
            .unwrap_or(SnapshotId::ZERO)
    }

    /// Newest data version row of `table`
    pub fn data_version(&self, table: &TableName) -> Option<SnapshotId> {
        self.data_versions
            .iter()
            .filter(|row| &row.table == table)
            .map(|row| row.snapshot)
            .max()
    }

    pub fn annotation_row_count(&self) -> usize {
        self.annotations.values().map(BTreeMap::len).sum()
    }
}

impl NativeTable {
    pub fn column(&self, name: &str) -> Option<&NativeColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_columns(&self, names: &[String]) -> bool {
        !names.is_empty() && names.iter().all(|n| self.column(n).is_some())
    }
}

impl NativeForeignKey {
    pub fn pairs(&self) -> Vec<(String, String)> {
        self.columns
            .iter()
            .cloned()
            .zip(self.referenced_columns.iter().cloned())
            .collect()
    }
}

impl PseudoForeignKeyRow {
    pub fn pairs(&self) -> Vec<(String, String)> {
        self.columns
            .iter()
            .cloned()
            .zip(self.referenced_columns.iter().cloned())
            .collect()
    }
}
