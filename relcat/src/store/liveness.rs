// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Orphan detection over stored catalog rows
//!
//! A metadata row is live when the object it names exists in the native
//! catalog. Pseudo-constraints are live when their table and every asserted
//! column exist; a pseudo foreign key additionally needs its referenced
//! column set to be a live key of the referenced table. Constraint targets
//! are matched as sets (column pairs for foreign keys).

use super::rows::{CatalogRows, PseudoForeignKeyRow, PseudoKeyRow};
use crate::model::graph::{same_column_pairs, same_column_set};
use crate::model::{MetadataTarget, TableName};

pub struct Liveness<'a> {
    rows: &'a CatalogRows,
    pseudo_keys: Vec<bool>,
    pseudo_foreign_keys: Vec<bool>,
}

impl<'a> Liveness<'a> {
    pub fn evaluate(rows: &'a CatalogRows) -> Self {
        let pseudo_keys = rows
            .pseudo_keys
            .iter()
            .map(|row| {
                rows.table(&row.table)
                    .map_or(false, |t| t.has_columns(&row.columns))
            })
            .collect();
        let mut liveness = Self {
            rows,
            pseudo_keys,
            pseudo_foreign_keys: Vec::new(),
        };
        // keys are settled first; foreign keys depend on them
        liveness.pseudo_foreign_keys = rows
            .pseudo_foreign_keys
            .iter()
            .map(|row| liveness.pseudo_foreign_key_ok(row))
            .collect();
        liveness
    }

    fn pseudo_foreign_key_ok(&self, row: &PseudoForeignKeyRow) -> bool {
        let Some(table) = self.rows.table(&row.table) else {
            return false;
        };
        let Some(referenced) = self.rows.table(&row.referenced) else {
            return false;
        };
        row.columns.len() == row.referenced_columns.len()
            && table.has_columns(&row.columns)
            && referenced.has_columns(&row.referenced_columns)
            && self.key_exists(&row.referenced, &row.referenced_columns)
    }

    pub fn pseudo_key_live(&self, index: usize) -> bool {
        self.pseudo_keys.get(index).copied().unwrap_or(false)
    }

    pub fn pseudo_foreign_key_live(&self, index: usize) -> bool {
        self.pseudo_foreign_keys.get(index).copied().unwrap_or(false)
    }

    /// A real key or a live pseudo key covers exactly `columns`
    pub fn key_exists(&self, table: &TableName, columns: &[String]) -> bool {
        let real = self.rows.table(table).map_or(false, |t| {
            t.keys.iter().any(|k| same_column_set(&k.columns, columns))
        });
        real || self.rows.pseudo_keys.iter().enumerate().any(|(i, row)| {
            &row.table == table && self.pseudo_key_live(i) && same_column_set(&row.columns, columns)
        })
    }

    pub fn foreign_key_exists(
        &self,
        table: &TableName,
        pairs: &[(String, String)],
        referenced: &TableName,
    ) -> bool {
        let real = self.rows.table(table).map_or(false, |t| {
            t.foreign_keys
                .iter()
                .any(|fk| &fk.referenced == referenced && same_column_pairs(&fk.pairs(), pairs))
        });
        real || self
            .rows
            .pseudo_foreign_keys
            .iter()
            .enumerate()
            .any(|(i, row)| {
                &row.table == table
                    && &row.referenced == referenced
                    && self.pseudo_foreign_key_live(i)
                    && same_column_pairs(&row.pairs(), pairs)
            })
    }

    pub fn target_live(&self, target: &MetadataTarget) -> bool {
        match target {
            MetadataTarget::Catalog => true,
            MetadataTarget::Schema { schema } => self.rows.schemas.contains_key(schema),
            MetadataTarget::Table { table } => self.rows.table(table).is_some(),
            MetadataTarget::Column { table, column } => self
                .rows
                .table(table)
                .map_or(false, |t| t.column(column).is_some()),
            MetadataTarget::Key { table, columns } => self.key_exists(table, columns),
            MetadataTarget::ForeignKey {
                table,
                pairs,
                referenced,
            } => self.foreign_key_exists(table, pairs, referenced),
        }
    }
}

/// Metadata rows whose target no longer exists
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Orphans {
    pub pseudo_keys: Vec<PseudoKeyRow>,
    pub pseudo_foreign_keys: Vec<PseudoForeignKeyRow>,
    pub comments: Vec<MetadataTarget>,
    pub annotations: Vec<(MetadataTarget, String)>,
}

impl Orphans {
    pub fn is_empty(&self) -> bool {
        self.total() == 0
    }

    pub fn total(&self) -> usize {
        self.pseudo_keys.len()
            + self.pseudo_foreign_keys.len()
            + self.comments.len()
            + self.annotations.len()
    }
}

pub fn find_orphans(rows: &CatalogRows) -> Orphans {
    let liveness = Liveness::evaluate(rows);
    let pseudo_keys = rows
        .pseudo_keys
        .iter()
        .enumerate()
        .filter(|(i, _)| !liveness.pseudo_key_live(*i))
        .map(|(_, row)| row.clone())
        .collect();
    let pseudo_foreign_keys = rows
        .pseudo_foreign_keys
        .iter()
        .enumerate()
        .filter(|(i, _)| !liveness.pseudo_foreign_key_live(*i))
        .map(|(_, row)| row.clone())
        .collect();
    let comments = rows
        .comments
        .keys()
        .filter(|target| !liveness.target_live(target))
        .cloned()
        .collect();
    let annotations = rows
        .annotations
        .iter()
        .filter(|(target, _)| !liveness.target_live(target))
        .flat_map(|(target, docs)| docs.keys().map(move |key| (target.clone(), key.clone())))
        .collect();
    Orphans {
        pseudo_keys,
        pseudo_foreign_keys,
        comments,
        annotations,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::TableKind;
    use crate::store::rows::{NativeColumn, NativeKey, NativeSchema, NativeTable};

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn rows_with_view() -> CatalogRows {
        let mut rows = CatalogRows::default();
        let mut schema = NativeSchema {
            name: "s".into(),
            ..Default::default()
        };
        let column = |name: &str| NativeColumn {
            name: name.into(),
            type_name: "text".into(),
            nullok: true,
        };
        schema.tables.insert(
            "t".into(),
            NativeTable {
                name: "t".into(),
                kind: TableKind::Table,
                columns: vec![column("id"), column("name")],
                keys: vec![NativeKey {
                    name: "t_id_key".into(),
                    columns: strings(&["id"]),
                }],
                foreign_keys: Vec::new(),
            },
        );
        schema.tables.insert(
            "v".into(),
            NativeTable {
                name: "v".into(),
                kind: TableKind::View,
                columns: vec![column("id"), column("label")],
                keys: Vec::new(),
                foreign_keys: Vec::new(),
            },
        );
        rows.schemas.insert("s".into(), schema);
        rows
    }

    #[test]
    fn test_live_rows_are_not_orphans() {
        let mut rows = rows_with_view();
        let v = TableName::new("s", "v");
        rows.pseudo_keys.push(PseudoKeyRow {
            table: v.clone(),
            columns: strings(&["id"]),
            name: None,
        });
        rows.comments
            .insert(MetadataTarget::column(v.clone(), "label"), "a label".into());
        assert!(find_orphans(&rows).is_empty());
    }

    #[test]
    fn test_pseudo_key_orphan_cascades_to_dependents() {
        let mut rows = rows_with_view();
        let v = TableName::new("s", "v");
        let t = TableName::new("s", "t");
        rows.pseudo_keys.push(PseudoKeyRow {
            table: v.clone(),
            columns: strings(&["label"]),
            name: None,
        });
        rows.pseudo_foreign_keys.push(PseudoForeignKeyRow {
            table: t.clone(),
            columns: strings(&["name"]),
            referenced: v.clone(),
            referenced_columns: strings(&["label"]),
            name: None,
        });
        let key_target = MetadataTarget::key(v.clone(), &strings(&["label"]));
        rows.annotations
            .entry(key_target.clone())
            .or_default()
            .insert("tag:example".into(), "{}".into());
        assert!(find_orphans(&rows).is_empty());

        // the view loses the asserted column
        let view = rows.table_mut(&v).unwrap();
        view.columns.retain(|c| c.name != "label");

        let orphans = find_orphans(&rows);
        assert_eq!(orphans.pseudo_keys.len(), 1);
        assert_eq!(orphans.pseudo_foreign_keys.len(), 1);
        assert_eq!(orphans.annotations, vec![(key_target, "tag:example".to_string())]);
    }

    #[test]
    fn test_foreign_key_targets_match_pairs_in_any_order() {
        let mut rows = rows_with_view();
        let v = TableName::new("s", "v");
        let t = TableName::new("s", "t");
        rows.pseudo_keys.push(PseudoKeyRow {
            table: t.clone(),
            columns: strings(&["id", "name"]),
            name: None,
        });
        rows.pseudo_foreign_keys.push(PseudoForeignKeyRow {
            table: v.clone(),
            columns: strings(&["id", "label"]),
            referenced: t.clone(),
            referenced_columns: strings(&["id", "name"]),
            name: None,
        });
        let target = MetadataTarget::foreign_key(
            v,
            &[
                ("label".to_string(), "name".to_string()),
                ("id".to_string(), "id".to_string()),
            ],
            t,
        );
        rows.comments.insert(target, "reordered".into());
        assert!(find_orphans(&rows).is_empty());
    }
}
