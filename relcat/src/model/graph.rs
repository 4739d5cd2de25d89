// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Catalog model graph
//!
//! A `ModelGraph` is an immutable picture of one catalog at one snapshot. It
//! is produced by introspection in the store adapter and never mutated once
//! it has been handed out.

use super::ids::{CatalogId, SnapshotId, TableName};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Annotation documents of one object, keyed by annotation key
pub type Annotations = BTreeMap<String, serde_json::Value>;

/// Kind of a relation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    #[default]
    Table,
    View,
    MaterializedView,
}

impl TableKind {
    /// Only plain tables can carry store-enforced constraints
    pub fn enforces_constraints(&self) -> bool {
        matches!(self, TableKind::Table)
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TableKind::Table => "table",
            TableKind::View => "view",
            TableKind::MaterializedView => "materialized_view",
        };
        write!(f, "{}", name)
    }
}

/// Enforcement kind of a key or foreign key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstraintKind {
    /// Enforced by the store
    Real,
    /// Asserted by a client, never enforced or validated
    Pseudo,
}

impl fmt::Display for ConstraintKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstraintKind::Real => write!(f, "real"),
            ConstraintKind::Pseudo => write!(f, "pseudo"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ModelGraph {
    pub catalog: CatalogId,
    /// Read point this graph was introspected at
    pub snapshot: SnapshotId,
    /// Newest model version visible at `snapshot`
    pub version: SnapshotId,
    pub annotations: Annotations,
    pub schemas: BTreeMap<String, Schema>,
}

#[derive(Debug, Clone)]
pub struct Schema {
    pub name: String,
    pub comment: Option<String>,
    pub annotations: Annotations,
    pub tables: BTreeMap<String, Table>,
}

#[derive(Debug, Clone)]
pub struct Table {
    pub name: TableName,
    pub kind: TableKind,
    pub comment: Option<String>,
    pub annotations: Annotations,
    pub columns: Vec<Column>,
    pub keys: Vec<Key>,
    pub foreign_keys: Vec<ForeignKey>,
}

#[derive(Debug, Clone)]
pub struct Column {
    pub name: String,
    pub type_name: String,
    pub nullok: bool,
    pub comment: Option<String>,
    pub annotations: Annotations,
}

#[derive(Debug, Clone)]
pub struct Key {
    /// Columns in declaration order
    pub columns: Vec<String>,
    pub kind: ConstraintKind,
    pub name: Option<String>,
    pub comment: Option<String>,
    pub annotations: Annotations,
}

#[derive(Debug, Clone)]
pub struct ForeignKey {
    /// Referencing columns, paired positionally with `referenced_columns`
    pub columns: Vec<String>,
    pub referenced: TableName,
    pub referenced_columns: Vec<String>,
    pub kind: ConstraintKind,
    pub name: Option<String>,
    pub comment: Option<String>,
    pub annotations: Annotations,
}

/// Order-insensitive comparison of two column lists
pub fn same_column_set(a: &[String], b: &[String]) -> bool {
    a.len() == b.len() && {
        let a: BTreeSet<&String> = a.iter().collect();
        let b: BTreeSet<&String> = b.iter().collect();
        a == b
    }
}

/// Order-insensitive comparison of two column pairings
pub fn same_column_pairs(a: &[(String, String)], b: &[(String, String)]) -> bool {
    a.len() == b.len() && {
        let a: BTreeSet<&(String, String)> = a.iter().collect();
        let b: BTreeSet<&(String, String)> = b.iter().collect();
        a == b
    }
}

impl ModelGraph {
    pub fn schema(&self, name: &str) -> Option<&Schema> {
        self.schemas.get(name)
    }

    pub fn table(&self, name: &TableName) -> Option<&Table> {
        self.schemas
            .get(&name.schema)
            .and_then(|schema| schema.tables.get(&name.table))
    }

    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.schemas.values().flat_map(|schema| schema.tables.values())
    }

    /// Foreign keys anywhere in the catalog that reference `table`
    pub fn referencing(&self, table: &TableName) -> Vec<(&Table, &ForeignKey)> {
        self.tables()
            .flat_map(|t| t.foreign_keys.iter().map(move |fk| (t, fk)))
            .filter(|(_, fk)| &fk.referenced == table)
            .collect()
    }
}

impl Table {
    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn has_columns(&self, names: &[String]) -> bool {
        names.iter().all(|n| self.column(n).is_some())
    }

    pub fn key(&self, columns: &[String]) -> Option<&Key> {
        self.keys.iter().find(|k| k.covers(columns))
    }

    pub fn foreign_key(
        &self,
        pairs: &[(String, String)],
        referenced: &TableName,
    ) -> Option<&ForeignKey> {
        self.foreign_keys
            .iter()
            .find(|fk| &fk.referenced == referenced && fk.matches_pairs(pairs))
    }
}

impl Key {
    pub fn covers(&self, columns: &[String]) -> bool {
        same_column_set(&self.columns, columns)
    }

    pub fn contains_column(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }
}

impl ForeignKey {
    pub fn pairs(&self) -> Vec<(String, String)> {
        self.columns
            .iter()
            .cloned()
            .zip(self.referenced_columns.iter().cloned())
            .collect()
    }

    pub fn matches_pairs(&self, pairs: &[(String, String)]) -> bool {
        same_column_pairs(&self.pairs(), pairs)
    }

    /// Pairs reordered to follow `columns`, if the column sets agree
    pub fn pairs_in_order(&self, columns: &[String]) -> Option<Vec<(String, String)>> {
        if !same_column_set(&self.columns, columns) {
            return None;
        }
        let pairs = self.pairs();
        columns
            .iter()
            .map(|c| pairs.iter().find(|(from, _)| from == c).cloned())
            .collect()
    }
}
