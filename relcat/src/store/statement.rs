// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Store statements
//!
//! The store-agnostic equivalent of the DDL and metadata-table writes a
//! relational backend would run. Statements are applied in order to a private
//! copy of the catalog rows; the first failure aborts the whole transaction.

use super::error::{violation, StoreResult};
use super::liveness::find_orphans;
use super::rows::{
    CatalogRows, DataVersionRow, ModelVersionRow, NativeColumn, NativeForeignKey, NativeKey,
    NativeSchema, NativeTable, PseudoForeignKeyRow, PseudoKeyRow,
};
use crate::model::graph::{same_column_pairs, same_column_set};
use crate::model::{CatalogId, MetadataTarget, SnapshotId, TableName};
use chrono::Utc;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Statement {
    CreateSchema {
        schema: String,
    },
    /// Drops the schema with its tables and any foreign keys referencing them
    DropSchema {
        schema: String,
    },
    CreateTable {
        schema: String,
        table: NativeTable,
    },
    /// Drops the table and any foreign keys referencing it
    DropTable {
        table: TableName,
    },
    AddColumn {
        table: TableName,
        column: NativeColumn,
    },
    /// Drops the column with every constraint that uses it
    DropColumn {
        table: TableName,
        column: String,
    },
    AddKey {
        table: TableName,
        key: NativeKey,
    },
    DropKey {
        table: TableName,
        columns: Vec<String>,
    },
    AddForeignKey {
        table: TableName,
        foreign_key: NativeForeignKey,
    },
    DropForeignKey {
        table: TableName,
        pairs: Vec<(String, String)>,
        referenced: TableName,
    },
    InsertPseudoKey(PseudoKeyRow),
    DeletePseudoKey {
        table: TableName,
        columns: Vec<String>,
    },
    InsertPseudoForeignKey(PseudoForeignKeyRow),
    DeletePseudoForeignKey {
        table: TableName,
        pairs: Vec<(String, String)>,
        referenced: TableName,
    },
    SetComment {
        target: MetadataTarget,
        comment: Option<String>,
    },
    SetAnnotation {
        target: MetadataTarget,
        key: String,
        document: String,
    },
    DeleteAnnotation {
        target: MetadataTarget,
        key: String,
    },
    /// Delete every comment, annotation and pseudo-constraint whose target is gone
    PurgeOrphans,
    RecordModelChange,
    RecordDataChange {
        table: TableName,
    },
    DeleteModelVersions {
        snapshots: Vec<SnapshotId>,
    },
    DeleteDataVersions {
        table: TableName,
        snapshots: Vec<SnapshotId>,
    },
}

/// A batch of statements committed atomically against one catalog
#[derive(Debug, Clone)]
pub struct Transaction {
    pub catalog: CatalogId,
    /// Read point the statements were planned against; the commit fails with
    /// a serialization conflict if the catalog's model changed after it
    pub base: Option<SnapshotId>,
    pub statements: Vec<Statement>,
}

impl Transaction {
    pub fn new(catalog: CatalogId, statements: Vec<Statement>) -> Self {
        Self {
            catalog,
            base: None,
            statements,
        }
    }

    pub fn based_on(mut self, snapshot: SnapshotId) -> Self {
        self.base = Some(snapshot);
        self
    }
}

impl Statement {
    /// Statements that only touch version rows do not move the schema stamp
    pub fn changes_model(&self) -> bool {
        !matches!(
            self,
            Statement::RecordDataChange { .. }
                | Statement::DeleteModelVersions { .. }
                | Statement::DeleteDataVersions { .. }
        )
    }

    pub(crate) fn apply(&self, rows: &mut CatalogRows, txid: SnapshotId) -> StoreResult<()> {
        match self {
            Statement::CreateSchema { schema } => {
                if rows.schemas.contains_key(schema) {
                    return Err(violation(format!("schema {} already exists", schema)));
                }
                rows.schemas.insert(
                    schema.clone(),
                    NativeSchema {
                        name: schema.clone(),
                        ..Default::default()
                    },
                );
            }
            Statement::DropSchema { schema } => {
                let dropped = rows
                    .schemas
                    .remove(schema)
                    .ok_or_else(|| violation(format!("schema {} does not exist", schema)))?;
                for table in dropped.tables.keys() {
                    drop_references_to(rows, &TableName::new(schema.as_str(), table.as_str()));
                }
            }
            Statement::CreateTable { schema, table } => {
                let name = TableName::new(schema.as_str(), table.name.as_str());
                let target = rows
                    .schemas
                    .get(schema)
                    .ok_or_else(|| violation(format!("schema {} does not exist", schema)))?;
                if target.tables.contains_key(&table.name) {
                    return Err(violation(format!("table {} already exists", name)));
                }
                let mut created = NativeTable {
                    foreign_keys: Vec::new(),
                    keys: Vec::new(),
                    ..table.clone()
                };
                if created.columns.is_empty() {
                    return Err(violation(format!("table {} has no columns", name)));
                }
                for (i, column) in created.columns.iter().enumerate() {
                    if created.columns[..i].iter().any(|c| c.name == column.name) {
                        return Err(violation(format!(
                            "column {} declared twice in {}",
                            column.name, name
                        )));
                    }
                }
                for key in &table.keys {
                    check_key(&created, &name, key)?;
                    created.keys.push(key.clone());
                }
                if let Some(s) = rows.schemas.get_mut(schema) {
                    s.tables.insert(table.name.clone(), created);
                }
                // foreign keys may reference the new table itself
                for fk in &table.foreign_keys {
                    add_foreign_key(rows, &name, fk)?;
                }
            }
            Statement::DropTable { table } => {
                let schema = rows
                    .schemas
                    .get_mut(&table.schema)
                    .ok_or_else(|| violation(format!("schema {} does not exist", table.schema)))?;
                schema
                    .tables
                    .remove(&table.table)
                    .ok_or_else(|| violation(format!("table {} does not exist", table)))?;
                drop_references_to(rows, table);
            }
            Statement::AddColumn { table, column } => {
                let t = native_table_mut(rows, table)?;
                if t.column(&column.name).is_some() {
                    return Err(violation(format!(
                        "column {} already exists in {}",
                        column.name, table
                    )));
                }
                t.columns.push(column.clone());
            }
            Statement::DropColumn { table, column } => {
                let t = native_table_mut(rows, table)?;
                if t.column(column).is_none() {
                    return Err(violation(format!(
                        "column {} does not exist in {}",
                        column, table
                    )));
                }
                t.columns.retain(|c| &c.name != column);
                let (dropped, kept): (Vec<NativeKey>, Vec<NativeKey>) = t
                    .keys
                    .drain(..)
                    .partition(|k| k.columns.iter().any(|c| c == column));
                t.keys = kept;
                t.foreign_keys.retain(|fk| !fk.columns.iter().any(|c| c == column));
                for key in dropped {
                    drop_foreign_keys_where(rows, |fk| {
                        &fk.referenced == table
                            && same_column_set(&fk.referenced_columns, &key.columns)
                    });
                }
                drop_foreign_keys_where(rows, |fk| {
                    &fk.referenced == table && fk.referenced_columns.iter().any(|c| c == column)
                });
            }
            Statement::AddKey { table, key } => {
                let t = native_table_mut(rows, table)?;
                check_key(t, table, key)?;
                t.keys.push(key.clone());
            }
            Statement::DropKey { table, columns } => {
                let referenced = rows.schemas.values().flat_map(|s| s.tables.values()).any(|t| {
                    t.foreign_keys.iter().any(|fk| {
                        &fk.referenced == table && same_column_set(&fk.referenced_columns, columns)
                    })
                });
                if referenced {
                    return Err(violation(format!(
                        "key ({}) on {} is referenced by a foreign key",
                        columns.join(","),
                        table
                    )));
                }
                let t = native_table_mut(rows, table)?;
                let before = t.keys.len();
                t.keys.retain(|k| !same_column_set(&k.columns, columns));
                if t.keys.len() == before {
                    return Err(violation(format!(
                        "no key ({}) on {}",
                        columns.join(","),
                        table
                    )));
                }
            }
            Statement::AddForeignKey { table, foreign_key } => {
                add_foreign_key(rows, table, foreign_key)?;
            }
            Statement::DropForeignKey {
                table,
                pairs,
                referenced,
            } => {
                let t = native_table_mut(rows, table)?;
                let before = t.foreign_keys.len();
                t.foreign_keys.retain(|fk| {
                    !(&fk.referenced == referenced && same_column_pairs(&fk.pairs(), pairs))
                });
                if t.foreign_keys.len() == before {
                    return Err(violation(format!(
                        "no foreign key on {} referencing {}",
                        table, referenced
                    )));
                }
            }
            Statement::InsertPseudoKey(row) => {
                if rows
                    .pseudo_keys
                    .iter()
                    .any(|k| k.table == row.table && same_column_set(&k.columns, &row.columns))
                {
                    return Err(violation(format!(
                        "pseudo key ({}) on {} already exists",
                        row.columns.join(","),
                        row.table
                    )));
                }
                rows.pseudo_keys.push(row.clone());
            }
            Statement::DeletePseudoKey { table, columns } => {
                rows.pseudo_keys
                    .retain(|k| !(&k.table == table && same_column_set(&k.columns, columns)));
            }
            Statement::InsertPseudoForeignKey(row) => {
                let pairs = row.pairs();
                if rows.pseudo_foreign_keys.iter().any(|fk| {
                    fk.table == row.table
                        && fk.referenced == row.referenced
                        && same_column_pairs(&fk.pairs(), &pairs)
                }) {
                    return Err(violation(format!(
                        "pseudo foreign key on {} referencing {} already exists",
                        row.table, row.referenced
                    )));
                }
                rows.pseudo_foreign_keys.push(row.clone());
            }
            Statement::DeletePseudoForeignKey {
                table,
                pairs,
                referenced,
            } => {
                rows.pseudo_foreign_keys.retain(|fk| {
                    !(&fk.table == table
                        && &fk.referenced == referenced
                        && same_column_pairs(&fk.pairs(), pairs))
                });
            }
            Statement::SetComment { target, comment } => match comment {
                Some(text) => {
                    rows.comments.insert(target.clone(), text.clone());
                }
                None => {
                    rows.comments.remove(target);
                }
            },
            Statement::SetAnnotation {
                target,
                key,
                document,
            } => {
                rows.annotations
                    .entry(target.clone())
                    .or_default()
                    .insert(key.clone(), document.clone());
            }
            Statement::DeleteAnnotation { target, key } => {
                if let Some(docs) = rows.annotations.get_mut(target) {
                    docs.remove(key);
                    if docs.is_empty() {
                        rows.annotations.remove(target);
                    }
                }
            }
            Statement::PurgeOrphans => {
                let orphans = find_orphans(rows);
                for row in &orphans.pseudo_keys {
                    rows.pseudo_keys.retain(|k| k != row);
                }
                for row in &orphans.pseudo_foreign_keys {
                    rows.pseudo_foreign_keys.retain(|fk| fk != row);
                }
                for target in &orphans.comments {
                    rows.comments.remove(target);
                }
                for (target, _) in &orphans.annotations {
                    rows.annotations.remove(target);
                }
            }
            Statement::RecordModelChange => {
                rows.model_versions.push(ModelVersionRow {
                    snapshot: txid,
                    timestamp: Utc::now(),
                });
            }
            Statement::RecordDataChange { table } => {
                if rows.table(table).is_none() {
                    return Err(violation(format!("table {} does not exist", table)));
                }
                rows.data_versions.push(DataVersionRow {
                    table: table.clone(),
                    snapshot: txid,
                });
            }
            Statement::DeleteModelVersions { snapshots } => {
                rows.model_versions
                    .retain(|row| !snapshots.contains(&row.snapshot));
            }
            Statement::DeleteDataVersions { table, snapshots } => {
                rows.data_versions
                    .retain(|row| !(&row.table == table && snapshots.contains(&row.snapshot)));
            }
        }
        Ok(())
    }
}

fn native_table_mut<'a>(
    rows: &'a mut CatalogRows,
    table: &TableName,
) -> StoreResult<&'a mut NativeTable> {
    rows.table_mut(table)
        .ok_or_else(|| violation(format!("table {} does not exist", table)))
}

fn check_key(table: &NativeTable, name: &TableName, key: &NativeKey) -> StoreResult<()> {
    if !table.has_columns(&key.columns) {
        return Err(violation(format!(
            "key ({}) names columns missing from {}",
            key.columns.join(","),
            name
        )));
    }
    if table
        .keys
        .iter()
        .any(|k| same_column_set(&k.columns, &key.columns))
    {
        return Err(violation(format!(
            "key ({}) already exists on {}",
            key.columns.join(","),
            name
        )));
    }
    Ok(())
}

fn add_foreign_key(
    rows: &mut CatalogRows,
    table: &TableName,
    fk: &NativeForeignKey,
) -> StoreResult<()> {
    if fk.columns.is_empty() || fk.columns.len() != fk.referenced_columns.len() {
        return Err(violation(format!(
            "foreign key on {} must map a non-empty column list one to one",
            table
        )));
    }
    let referenced = rows
        .table(&fk.referenced)
        .ok_or_else(|| violation(format!("referenced table {} does not exist", fk.referenced)))?;
    if !referenced
        .keys
        .iter()
        .any(|k| same_column_set(&k.columns, &fk.referenced_columns))
    {
        return Err(violation(format!(
            "no key ({}) on {}",
            fk.referenced_columns.join(","),
            fk.referenced
        )));
    }
    let t = native_table_mut(rows, table)?;
    if !t.has_columns(&fk.columns) {
        return Err(violation(format!(
            "foreign key ({}) names columns missing from {}",
            fk.columns.join(","),
            table
        )));
    }
    let pairs = fk.pairs();
    if t.foreign_keys.iter().any(|existing| {
        existing.referenced == fk.referenced && same_column_pairs(&existing.pairs(), &pairs)
    }) {
        return Err(violation(format!(
            "foreign key ({}) on {} already exists",
            fk.columns.join(","),
            table
        )));
    }
    t.foreign_keys.push(fk.clone());
    Ok(())
}

fn drop_references_to(rows: &mut CatalogRows, table: &TableName) {
    drop_foreign_keys_where(rows, |fk| &fk.referenced == table);
}

fn drop_foreign_keys_where<F>(rows: &mut CatalogRows, predicate: F)
where
    F: Fn(&NativeForeignKey) -> bool,
{
    for schema in rows.schemas.values_mut() {
        for t in schema.tables.values_mut() {
            t.foreign_keys.retain(|fk| !predicate(fk));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TableKind;

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn column(name: &str) -> NativeColumn {
        NativeColumn {
            name: name.into(),
            type_name: "int4".into(),
            nullok: false,
        }
    }

    fn base_rows() -> CatalogRows {
        let mut rows = CatalogRows::default();
        let txid = SnapshotId::new(1);
        let statements = vec![
            Statement::CreateSchema { schema: "s".into() },
            Statement::CreateTable {
                schema: "s".into(),
                table: NativeTable {
                    name: "parent".into(),
                    kind: TableKind::Table,
                    columns: vec![column("id"), column("code")],
                    keys: vec![NativeKey {
                        name: "parent_id_key".into(),
                        columns: strings(&["id"]),
                    }],
                    foreign_keys: Vec::new(),
                },
            },
            Statement::CreateTable {
                schema: "s".into(),
                table: NativeTable {
                    name: "child".into(),
                    kind: TableKind::Table,
                    columns: vec![column("id"), column("parent")],
                    keys: Vec::new(),
                    foreign_keys: vec![NativeForeignKey {
                        name: "child_parent_fkey".into(),
                        columns: strings(&["parent"]),
                        referenced: TableName::new("s", "parent"),
                        referenced_columns: strings(&["id"]),
                    }],
                },
            },
        ];
        for stmt in &statements {
            stmt.apply(&mut rows, txid).unwrap();
        }
        rows
    }

    #[test]
    fn test_drop_column_cascades_to_constraints() {
        let mut rows = base_rows();
        let parent = TableName::new("s", "parent");
        Statement::DropColumn {
            table: parent.clone(),
            column: "id".into(),
        }
        .apply(&mut rows, SnapshotId::new(2))
        .unwrap();
        assert!(rows.table(&parent).unwrap().keys.is_empty());
        assert!(rows
            .table(&TableName::new("s", "child"))
            .unwrap()
            .foreign_keys
            .is_empty());
    }

    #[test]
    fn test_referenced_key_cannot_be_dropped() {
        let mut rows = base_rows();
        let err = Statement::DropKey {
            table: TableName::new("s", "parent"),
            columns: strings(&["id"]),
        }
        .apply(&mut rows, SnapshotId::new(2));
        assert!(err.is_err());
    }

    #[test]
    fn test_foreign_key_requires_referenced_key() {
        let mut rows = base_rows();
        let err = Statement::AddForeignKey {
            table: TableName::new("s", "child"),
            foreign_key: NativeForeignKey {
                name: "child_id_fkey".into(),
                columns: strings(&["id"]),
                referenced: TableName::new("s", "parent"),
                referenced_columns: strings(&["code"]),
            },
        }
        .apply(&mut rows, SnapshotId::new(2));
        assert!(err.is_err());
    }

    #[test]
    fn test_version_rows_carry_transaction_snapshot() {
        let mut rows = base_rows();
        let child = TableName::new("s", "child");
        Statement::RecordModelChange
            .apply(&mut rows, SnapshotId::new(5))
            .unwrap();
        Statement::RecordDataChange {
            table: child.clone(),
        }
        .apply(&mut rows, SnapshotId::new(5))
        .unwrap();
        assert_eq!(rows.model_version(), SnapshotId::new(5));
        assert_eq!(rows.data_version(&child), Some(SnapshotId::new(5)));
        assert!(!Statement::RecordDataChange { table: child }.changes_model());
    }
}
