// Copyright (c) 2024-2025 DeepGraph Inc.
// SPDX-License-Identifier: Apache-2.0
//
//! Introspection: building a model graph from stored rows
//!
//! Constraint kinds are fixed here: native constraints load as `Real`,
//! pseudo-constraint rows load as `Pseudo`. Metadata rows whose target no
//! longer exists are skipped; purging them is the garbage collector's job.

use super::liveness::Liveness;
use super::rows::CatalogRows;
use crate::model::{
    Annotations, CatalogId, Column, ConstraintKind, ForeignKey, Key, MetadataTarget, ModelGraph,
    Schema, SnapshotId, Table, TableName,
};
use std::collections::BTreeMap;

pub fn build_graph(catalog: &CatalogId, snapshot: SnapshotId, rows: &CatalogRows) -> ModelGraph {
    let liveness = Liveness::evaluate(rows);
    let meta = MetadataIndex { rows };

    let mut schemas = BTreeMap::new();
    for native_schema in rows.schemas.values() {
        let mut tables = BTreeMap::new();
        for native in native_schema.tables.values() {
            let name = TableName::new(native_schema.name.as_str(), native.name.as_str());
            let columns = native
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    type_name: c.type_name.clone(),
                    nullok: c.nullok,
                    comment: meta.comment(&MetadataTarget::column(name.clone(), c.name.as_str())),
                    annotations: meta
                        .annotations(&MetadataTarget::column(name.clone(), c.name.as_str())),
                })
                .collect();

            let mut keys: Vec<Key> = native
                .keys
                .iter()
                .map(|k| {
                    let target = MetadataTarget::key(name.clone(), &k.columns);
                    Key {
                        columns: k.columns.clone(),
                        kind: ConstraintKind::Real,
                        name: Some(k.name.clone()),
                        comment: meta.comment(&target),
                        annotations: meta.annotations(&target),
                    }
                })
                .collect();
            for (i, row) in rows.pseudo_keys.iter().enumerate() {
                if row.table != name || !liveness.pseudo_key_live(i) {
                    continue;
                }
                if keys.iter().any(|k| k.covers(&row.columns)) {
                    log::debug!(
                        "Skipping pseudo key ({}) on {}: duplicates an existing key",
                        row.columns.join(","),
                        name
                    );
                    continue;
                }
                let target = MetadataTarget::key(name.clone(), &row.columns);
                keys.push(Key {
                    columns: row.columns.clone(),
                    kind: ConstraintKind::Pseudo,
                    name: row.name.clone(),
                    comment: meta.comment(&target),
                    annotations: meta.annotations(&target),
                });
            }

            let mut foreign_keys: Vec<ForeignKey> = native
                .foreign_keys
                .iter()
                .map(|fk| {
                    let target = MetadataTarget::foreign_key(
                        name.clone(),
                        &fk.pairs(),
                        fk.referenced.clone(),
                    );
                    ForeignKey {
                        columns: fk.columns.clone(),
                        referenced: fk.referenced.clone(),
                        referenced_columns: fk.referenced_columns.clone(),
                        kind: ConstraintKind::Real,
                        name: Some(fk.name.clone()),
                        comment: meta.comment(&target),
                        annotations: meta.annotations(&target),
                    }
                })
                .collect();
            for (i, row) in rows.pseudo_foreign_keys.iter().enumerate() {
                if row.table != name || !liveness.pseudo_foreign_key_live(i) {
                    continue;
                }
                let pairs = row.pairs();
                if foreign_keys
                    .iter()
                    .any(|fk| fk.referenced == row.referenced && fk.matches_pairs(&pairs))
                {
                    continue;
                }
                let target =
                    MetadataTarget::foreign_key(name.clone(), &pairs, row.referenced.clone());
                foreign_keys.push(ForeignKey {
                    columns: row.columns.clone(),
                    referenced: row.referenced.clone(),
                    referenced_columns: row.referenced_columns.clone(),
                    kind: ConstraintKind::Pseudo,
                    name: row.name.clone(),
                    comment: meta.comment(&target),
                    annotations: meta.annotations(&target),
                });
            }

            let target = MetadataTarget::table(name.clone());
            tables.insert(
                native.name.clone(),
                Table {
                    kind: native.kind,
                    comment: meta.comment(&target),
                    annotations: meta.annotations(&target),
                    columns,
                    keys,
                    foreign_keys,
                    name,
                },
            );
        }
        let target = MetadataTarget::schema(native_schema.name.as_str());
        schemas.insert(
            native_schema.name.clone(),
            Schema {
                name: native_schema.name.clone(),
                comment: meta.comment(&target),
                annotations: meta.annotations(&target),
                tables,
            },
        );
    }

    ModelGraph {
        catalog: catalog.clone(),
        snapshot,
        version: rows.model_version(),
        annotations: meta.annotations(&MetadataTarget::Catalog),
        schemas,
    }
}

struct MetadataIndex<'a> {
    rows: &'a CatalogRows,
}

impl MetadataIndex<'_> {
    fn comment(&self, target: &MetadataTarget) -> Option<String> {
        self.rows.comments.get(target).cloned()
    }

    fn annotations(&self, target: &MetadataTarget) -> Annotations {
        let Some(docs) = self.rows.annotations.get(target) else {
            return Annotations::new();
        };
        docs.iter()
            .filter_map(|(key, text)| match serde_json::from_str(text) {
                Ok(value) => Some((key.clone(), value)),
                Err(e) => {
                    log::warn!("Ignoring unreadable annotation {} on {}: {}", key, target, e);
                    None
                }
            })
            .collect()
    }
}
